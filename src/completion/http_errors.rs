use std::error::Error as StdError;
use std::io::ErrorKind;

use super::CompletionError;

fn error_chain_matches(
    err: &(dyn StdError + 'static),
    kind: ErrorKind,
    needle: &str,
) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == kind
        {
            return true;
        }

        if source.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }

        current = source.source();
    }

    false
}

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::ConnectionRefused, "connection refused")
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::TimedOut, "timed out")
}

/// Turns a transport failure into a `CompletionError::Network` that says what to check.
pub(crate) fn network_error(
    err: reqwest::Error,
    api_url: &str,
    timeout_secs: u64,
) -> CompletionError {
    if err.is_timeout() || error_chain_has_timeout(&err) {
        return CompletionError::Network(format!(
            "completion request timed out after {}s while calling '{}'. \
             Raise GROQ_TIMEOUT_SECS (30-60) or check the endpoint's responsiveness.",
            timeout_secs, api_url
        ));
    }

    if err.is_connect() {
        if error_chain_has_connection_refused(&err) {
            return CompletionError::Network(format!(
                "connection refused by completion endpoint at '{}'. \
                 Check GROQ_API_URL.",
                api_url
            ));
        }

        return CompletionError::Network(format!(
            "failed to connect to completion endpoint at '{}'. \
             Check GROQ_API_URL and network connectivity.",
            api_url
        ));
    }

    CompletionError::Network(format!(
        "failed to call completion endpoint at '{}': {}",
        api_url, err
    ))
}
