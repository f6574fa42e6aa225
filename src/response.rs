use regex::Regex;
use std::sync::LazyLock;

// Group 1 is the run of `-` or `*` decorating the label; the label follows it.
// The boundary before the label is ASCII-only so CJK text may touch it.
fn marker(label: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)(?:^|[^a-z0-9_])([-*]*){label}[ \t]*[:\-]+\**"
    ))
    .expect("marker pattern is valid")
}

static THOUGHTS_MARKER: LazyLock<Regex> = LazyLock::new(|| marker("thoughts"));

static GORDON_MARKER: LazyLock<Regex> = LazyLock::new(|| marker("gordon"));

struct Marker {
    start: usize,
    label: usize,
    end: usize,
}

fn find_marker(pattern: &Regex, raw: &str) -> Option<Marker> {
    let caps = pattern.captures(raw)?;
    let decoration = caps.get(1)?;
    Some(Marker {
        start: decoration.start(),
        label: decoration.end(),
        end: caps.get(0)?.end(),
    })
}

/// Model output split into its two labelled sections.
///
/// `raw` is always the untouched model output. When the markers are missing
/// or out of order both sections are `None` and `raw` is what callers show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub thoughts: Option<String>,
    pub gordon: Option<String>,
    pub raw: String,
}

impl ParsedResponse {
    pub fn is_split(&self) -> bool {
        self.thoughts.is_some() && self.gordon.is_some()
    }

    /// Text for terminal output.
    pub fn render(&self) -> String {
        match (&self.thoughts, &self.gordon) {
            (Some(thoughts), Some(gordon)) => {
                format!("---THOUGHTS---\n{thoughts}\n---GORDON---\n{gordon}")
            }
            _ if self.raw.trim().is_empty() => "(no response)".to_string(),
            _ => self.raw.clone(),
        }
    }
}

pub fn parse(raw: &str) -> ParsedResponse {
    let unparsed = || ParsedResponse {
        thoughts: None,
        gordon: None,
        raw: raw.to_string(),
    };

    let (Some(thoughts), Some(gordon)) = (
        find_marker(&THOUGHTS_MARKER, raw),
        find_marker(&GORDON_MARKER, raw),
    ) else {
        return unparsed();
    };
    if thoughts.end > gordon.label {
        return unparsed();
    }

    // Decoration in front of GORDON may overlap the THOUGHTS separator.
    let cut = gordon.start.max(thoughts.end);
    let (Some(thoughts_text), Some(gordon_text)) =
        (raw.get(thoughts.end..cut), raw.get(gordon.end..))
    else {
        return unparsed();
    };

    ParsedResponse {
        thoughts: Some(thoughts_text.trim().to_string()),
        gordon: Some(gordon_text.trim().to_string()),
        raw: raw.to_string(),
    }
}
