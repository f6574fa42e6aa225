use crate::config::{Config, WireFormat};
use crate::model::{Message, Prompt};

/// Persona and output contract sent with every request.
pub const PERSONA_TEMPLATE: &str = "You are Gordon, a judge in the style of a notoriously harsh celebrity chef. \
You are blunt, severe and sometimes profane, but you never target protected groups and never encourage violence.
Response format:
First write a paragraph labelled \"THOUGHTS:\" with your internal reasoning (you may describe evaluation details and judging criteria).
Then, in a new paragraph, write a paragraph labelled \"GORDON:\" with the final reply to the user, in Gordon's voice, which may carry strong criticism and profanity.

Example output:
THOUGHTS: The heat was wrong, the whites and yolks separated and the texture went watery.
GORDON: What are you doing? You haven't even got the basics down and you dare serve this? Get back in there and do it again!

While responding, follow platform rules: no hate speech and no unlawful content.

Now read the user's input and respond in the format above.";

const CONTEXT_LABEL: &str = "CONTEXT:";

/// Builds prompts from the persona, the conversation so far and the new input.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
    wire_format: WireFormat,
    style_directive: Option<String>,
}

impl PromptBuilder {
    pub fn new(cfg: &Config) -> Self {
        Self {
            persona: PERSONA_TEMPLATE.to_string(),
            wire_format: cfg.wire_format,
            style_directive: cfg.style_directive.clone(),
        }
    }

    pub fn build(&self, user_input: &str, history: &[String]) -> Prompt {
        match self.wire_format {
            WireFormat::Completion => Prompt::Text(self.build_text(user_input, history)),
            WireFormat::Chat => Prompt::Messages(self.build_messages(user_input, history)),
        }
    }

    pub fn build_text(&self, user_input: &str, history: &[String]) -> String {
        let convo = history.join("\n\n");
        format!(
            "{}\n\n{CONTEXT_LABEL}\n{convo}\n\nUSER: {user_input}\n\nRESPONSE:",
            self.persona
        )
    }

    /// Always two messages; prior turns ride along in the system message.
    pub fn build_messages(&self, user_input: &str, history: &[String]) -> Vec<Message> {
        let system = if history.is_empty() {
            self.persona.clone()
        } else {
            format!(
                "{}\n\n{CONTEXT_LABEL}\n{}",
                self.persona,
                history.join("\n\n")
            )
        };

        let user = match self.style_directive.as_deref() {
            Some(directive) => format!("{user_input}\n\n{directive}"),
            None => user_input.to_string(),
        };

        vec![Message::system(system), Message::user(user)]
    }
}
