//! Conversion of reqwest failures into transport errors.

use std::error::Error as StdError;

use crate::transport::{TransportError, TransportErrorKind};

/// Maps a reqwest error onto a [`TransportError`].
///
/// Connection failures are reported as network errors and carry the full
/// source chain, so DNS and reset causes stay visible to classification.
pub fn transport_error(error: &reqwest::Error) -> TransportError {
    let chain = error_chain(error);

    if error.is_timeout() {
        TransportError::new(TransportErrorKind::Timeout, format!("request timed out: {chain}"))
    } else if error.is_connect() {
        TransportError::new(TransportErrorKind::Connect, format!("network error: {chain}"))
    } else if error.is_body() || error.is_decode() {
        TransportError::new(TransportErrorKind::Body, chain)
    } else {
        TransportError::new(TransportErrorKind::Request, chain)
    }
}

/// Joins an error and all of its sources with `": "`.
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();

    while let Some(cause) = source {
        let cause_message = cause.to_string();
        if !message.contains(&cause_message) {
            message.push_str(": ");
            message.push_str(&cause_message);
        }
        source = cause.source();
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_error_chain_includes_sources() {
        let error = Outer(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ));
        assert_eq!(error_chain(&error), "outer: connection reset by peer");
    }
}
