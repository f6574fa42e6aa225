use tracing::debug;

use super::{Completer, CompletionFuture, CompletionRequest};

/// Canned reply returned in mock mode. Carries both markers.
pub const MOCK_RESPONSE: &str = "THOUGHTS: Mock response. The seasoning and the heat control are clearly off, the fundamentals need work.\n\n\
GORDON: This is a disaster! You handle that pan like you picked up a spatula yesterday. Back to basics, now!";

#[derive(Debug, Clone, Copy, Default)]
pub struct MockCompleter;

impl Completer for MockCompleter {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(async move {
            debug!(model = %request.model(), "returning mock completion");
            Ok(MOCK_RESPONSE.to_string())
        })
    }
}
