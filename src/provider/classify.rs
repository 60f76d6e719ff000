// src/provider/classify.rs — Error classification
//
// The service reports most failures as HTTP status plus free-form message
// text, and the exact phrasing is not stable. All of the fragile
// substring matching lives here, behind one function, with the marker
// lists taken from configuration so they can be adjusted without a
// rebuild.

use crate::infra::config::ClassifierConfig;
use crate::provider::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rotate to the next credential, or back off if the pool is spent.
    RateLimited,
    /// Token rejected. Never retried with the same token.
    Auth,
    /// Content-policy block. Never retried at all.
    ContentRejected,
    /// Timeout / connect failure / 5xx. Bounded retry, no rotation.
    Transient,
    /// Anything else. Terminal for the call.
    Fatal,
}

pub struct ErrorClassifier {
    config: ClassifierConfig,
}

impl ErrorClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, error: &BackendError) -> ErrorKind {
        let message = error.message.to_lowercase();

        // An explicit policy block wins over everything: the response
        // arrived and the service refused the content.
        if matches(&message, &self.config.content_block_markers) {
            return ErrorKind::ContentRejected;
        }

        if error.status == Some(429) || matches(&message, &self.config.rate_limit_markers) {
            return ErrorKind::RateLimited;
        }

        if matches!(error.status, Some(401) | Some(403))
            || matches(&message, &self.config.auth_markers)
        {
            return ErrorKind::Auth;
        }

        match error.status {
            Some(code) if code >= 500 => ErrorKind::Transient,
            // No HTTP status at all: the request never completed
            // (timeout, connection reset, DNS).
            None => ErrorKind::Transient,
            _ => ErrorKind::Fatal,
        }
    }
}

fn matches(message: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|m| message.contains(m.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ErrorClassifier {
        ErrorClassifier::new(ClassifierConfig::default())
    }

    fn err(status: Option<u16>, message: &str) -> BackendError {
        BackendError {
            status,
            message: message.into(),
        }
    }

    #[test]
    fn status_429_is_rate_limited() {
        assert_eq!(
            classifier().classify(&err(Some(429), "too many requests")),
            ErrorKind::RateLimited
        );
    }

    #[test]
    fn textual_quota_markers_are_rate_limited() {
        for msg in [
            "RESOURCE_EXHAUSTED: try again later",
            "You exceeded your current quota",
            "Rate limit reached for this key",
        ] {
            assert_eq!(
                classifier().classify(&err(Some(400), msg)),
                ErrorKind::RateLimited,
                "{msg}"
            );
        }
    }

    #[test]
    fn auth_failures() {
        assert_eq!(classifier().classify(&err(Some(401), "")), ErrorKind::Auth);
        assert_eq!(
            classifier().classify(&err(Some(400), "API key not valid. Please pass a valid key.")),
            ErrorKind::Auth
        );
    }

    #[test]
    fn content_block_wins_over_status() {
        assert_eq!(
            classifier().classify(&err(Some(400), "Response blocked: SAFETY")),
            ErrorKind::ContentRejected
        );
        // Even alongside quota-looking text
        assert_eq!(
            classifier().classify(&err(Some(429), "blocked due to prohibited content")),
            ErrorKind::ContentRejected
        );
    }

    #[test]
    fn server_and_network_errors_are_transient() {
        assert_eq!(
            classifier().classify(&err(Some(503), "overloaded")),
            ErrorKind::Transient
        );
        assert_eq!(
            classifier().classify(&err(None, "connection timed out")),
            ErrorKind::Transient
        );
    }

    #[test]
    fn unknown_4xx_is_fatal() {
        assert_eq!(
            classifier().classify(&err(Some(400), "invalid argument")),
            ErrorKind::Fatal
        );
    }

    #[test]
    fn markers_are_configurable() {
        let mut config = ClassifierConfig::default();
        config.rate_limit_markers.push("slow down please".into());
        let classifier = ErrorClassifier::new(config);
        assert_eq!(
            classifier.classify(&err(Some(400), "SLOW DOWN PLEASE")),
            ErrorKind::RateLimited
        );
    }
}
