use serde_json::Value;

use crate::config::ResponseShape;

const CHOICE_TEXT_KEYS: [&str; 4] = ["text", "output", "message", "content"];

/// Pulls the reply text out of a completion response body.
///
/// `Auto` tries the chat, choice and output layouts in that order.
pub fn extract_text(body: &Value, shape: ResponseShape) -> Option<String> {
    match shape {
        ResponseShape::Auto => chat_content(body)
            .or_else(|| choice_text(body))
            .or_else(|| output_text(body)),
        ResponseShape::Chat => chat_content(body),
        ResponseShape::Choice => choice_text(body),
        ResponseShape::Output => output_text(body),
    }
}

fn first_choice(body: &Value) -> Option<&Value> {
    body.get("choices")?.as_array()?.first()
}

// {"choices":[{"message":{"content":"..."}}]}
fn chat_content(body: &Value) -> Option<String> {
    first_choice(body)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

// {"choices":[{"text":"..."}]} and friends
fn choice_text(body: &Value) -> Option<String> {
    let first = first_choice(body)?;
    CHOICE_TEXT_KEYS
        .iter()
        .find_map(|key| first.get(*key)?.as_str().map(str::to_string))
}

// {"output":[{"content":"..."}, "..."]}
fn output_text(body: &Value) -> Option<String> {
    let parts: Vec<String> = body
        .get("output")?
        .as_array()?
        .iter()
        .filter_map(output_item_text)
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

fn output_item_text(item: &Value) -> Option<String> {
    match item {
        Value::String(text) => Some(text.clone()),
        Value::Object(_) => match item.get("content")? {
            Value::String(text) => Some(text.clone()),
            // Content blocks: [{"type":"output_text","text":"..."}]
            Value::Array(blocks) => {
                let texts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|block| block.get("text")?.as_str())
                    .collect();
                (!texts.is_empty()).then(|| texts.join("\n"))
            }
            _ => None,
        },
        _ => None,
    }
}
