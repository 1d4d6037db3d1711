use crate::error::GenError;
use std::error::Error as StdError;
use std::io::ErrorKind;

fn error_chain_has_kind(err: &(dyn StdError + 'static), kind: ErrorKind, text: &str) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>() {
            if io_err.kind() == kind {
                return true;
            }
        }

        if source.to_string().to_ascii_lowercase().contains(text) {
            return true;
        }

        current = source.source();
    }

    false
}

/// Maps a transport failure to a `ProviderRequest` error the user can act on.
pub(crate) fn provider_request_error(
    provider: &'static str,
    err: reqwest::Error,
    api_url: &str,
) -> GenError {
    if err.is_timeout() || error_chain_has_kind(&err, ErrorKind::TimedOut, "timed out") {
        return GenError::request(
            provider,
            format!("request to '{api_url}' timed out. Check your network connection and try again."),
        );
    }

    if err.is_connect() {
        if error_chain_has_kind(&err, ErrorKind::ConnectionRefused, "connection refused") {
            return GenError::request(
                provider,
                format!("connection refused by '{api_url}'."),
            );
        }

        return GenError::request(
            provider,
            format!("failed to connect to '{api_url}'. Check your network connection."),
        );
    }

    GenError::request(provider, format!("failed to call '{api_url}': {err}"))
}

/// Error for a non-success HTTP status, keeping the body the API sent back.
pub(crate) fn provider_status_error(
    provider: &'static str,
    status: reqwest::StatusCode,
    body: &str,
) -> GenError {
    let body = body.trim();
    if body.is_empty() {
        GenError::request(provider, format!("API returned status {status}"))
    } else {
        GenError::request(provider, format!("API returned status {status}: {body}"))
    }
}
