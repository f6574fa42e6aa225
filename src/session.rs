use std::sync::Arc;

use crate::completion::{Completer, CompletionError, CompletionRequest};
use crate::config::Config;
use crate::model::Prompt;
use crate::prompt::PromptBuilder;
use crate::response::{self, ParsedResponse};

/// One conversation: owns the history and runs turns against a completer.
pub struct ChatSession<'a> {
    cfg: &'a Config,
    completer: Arc<dyn Completer>,
    builder: PromptBuilder,
    history: Vec<String>,
}

impl<'a> ChatSession<'a> {
    pub fn new(cfg: &'a Config, completer: Arc<dyn Completer>) -> Self {
        Self {
            cfg,
            completer,
            builder: PromptBuilder::new(cfg),
            history: Vec::new(),
        }
    }

    /// Ends the current conversation and starts an empty one.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn prompt_for(&self, user_input: &str) -> Prompt {
        self.builder.build(user_input, &self.history)
    }

    /// History is only extended when the completion succeeds.
    pub async fn run_turn(&mut self, user_input: &str) -> Result<ParsedResponse, CompletionError> {
        let request = CompletionRequest::new(self.prompt_for(user_input), self.cfg);
        let raw = self.completer.complete(&request).await?;
        let parsed = response::parse(&raw);

        self.history.push(format!("USER: {user_input}"));
        self.history.push(format!("MODEL: {raw}"));
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::ChatSession;
    use crate::completion::{
        Completer, CompletionError, CompletionFuture, CompletionRequest, MOCK_RESPONSE,
        MockCompleter,
    };
    use crate::config::test_config;
    use crate::model::Prompt;

    #[derive(Default)]
    struct ScriptedCompleter {
        prompts: Mutex<Vec<Prompt>>,
        replies: Mutex<Vec<Result<String, CompletionError>>>,
    }

    impl ScriptedCompleter {
        fn with_replies(replies: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                replies: Mutex::new(replies),
            }
        }
    }

    impl Completer for ScriptedCompleter {
        fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
            self.prompts
                .lock()
                .expect("prompts lock")
                .push(request.prompt().clone());
            let reply = self.replies.lock().expect("replies lock").remove(0);
            Box::pin(async move { reply })
        }
    }

    #[tokio::test]
    async fn run_turn_parses_reply_and_records_history() {
        let cfg = test_config();
        let mut session = ChatSession::new(&cfg, Arc::new(MockCompleter));

        let parsed = session.run_turn("Is my soup good?").await.expect("turn succeeds");

        assert_eq!(parsed.raw, MOCK_RESPONSE);
        assert!(parsed.is_split());
        assert_eq!(
            session.history(),
            &[
                "USER: Is my soup good?".to_string(),
                format!("MODEL: {MOCK_RESPONSE}"),
            ]
        );
    }

    #[tokio::test]
    async fn later_turns_carry_earlier_history_in_the_prompt() {
        let cfg = test_config();
        let completer = Arc::new(ScriptedCompleter::with_replies(vec![
            Ok("first reply".to_string()),
            Ok("second reply".to_string()),
        ]));
        let mut session = ChatSession::new(&cfg, completer.clone());

        session.run_turn("one").await.expect("first turn");
        session.run_turn("two").await.expect("second turn");

        let prompts = completer.prompts.lock().expect("prompts lock");
        let Prompt::Text(second) = &prompts[1] else {
            panic!("completion wire format builds text prompts");
        };
        assert!(second.contains("CONTEXT:\nUSER: one\n\nMODEL: first reply\n\nUSER: two"));
    }

    #[tokio::test]
    async fn failed_turn_leaves_history_untouched() {
        let cfg = test_config();
        let completer = Arc::new(ScriptedCompleter::with_replies(vec![Err(
            CompletionError::Api {
                status: 500,
                body: "boom".to_string(),
            },
        )]));
        let mut session = ChatSession::new(&cfg, completer);

        let err = session.run_turn("hello").await.expect_err("turn fails");
        assert!(matches!(err, CompletionError::Api { status: 500, .. }));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn reset_clears_history() {
        let cfg = test_config();
        let mut session = ChatSession::new(&cfg, Arc::new(MockCompleter));
        session.run_turn("hello").await.expect("turn succeeds");

        session.reset();

        assert!(session.history().is_empty());
    }
}
