use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    gordon::run().await
}
