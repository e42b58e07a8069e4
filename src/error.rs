//! Error types for the harness core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the harness core
#[derive(Error, Debug)]
pub enum Error {
    /// Missing required field, zero timeout, `use_*` called twice, or a
    /// production-environment build invoked without acknowledging it.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A second hosting strategy was registered on the same builder.
    #[error("a hosting strategy has already been registered: {0}")]
    DuplicateStrategy(String),

    /// The child process exited before becoming ready, or port reclaim
    /// failed irrecoverably.
    #[error("startup failed: {0}")]
    StartupFailed(String),

    /// `startup_timeout` elapsed without any health-check endpoint
    /// returning a 2xx response.
    #[error("readiness timeout after {elapsed_secs}s probing {endpoint}")]
    ReadinessTimeout { endpoint: String, elapsed_secs: u64 },

    /// An assertion in the verification engine did not hold within its
    /// deadline. Never nested inside another `VerificationFailure`.
    #[error("verification failed: {0}")]
    VerificationFailure(String),

    /// A driver primitive failed outside of a verification context.
    #[error("driver error: {0}")]
    DriverError(String),

    /// A driver wait primitive (`wait_for_element*`, a fluent wait strategy
    /// poll loop) did not settle within its bound. Distinct from
    /// `DriverError` so timeout and non-timeout driver failures are never
    /// conflated by callers choosing a failure-message tag.
    #[error("driver timed out: {0}")]
    DriverTimeout(String),

    /// Generic error for conditions not covered by a more specific variant.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a `VerificationFailure` carrying the failing description, the
    /// configured timeout, and — if present — the last transient error
    /// observed while polling, as its cause text.
    pub(crate) fn verification_timeout(
        message: &str,
        timeout: std::time::Duration,
        last_error: Option<&str>,
    ) -> Self {
        let mut text = format!("{message} (timed out after {:.3}s)", timeout.as_secs_f64());
        if let Some(cause) = last_error {
            text.push_str(&format!(" caused by: {cause}"));
        }
        Error::VerificationFailure(text)
    }

    /// Wrap a non-`VerificationFailure` error raised inside an assertion
    /// body, per the exception-wrapping policy in the verification engine.
    pub(crate) fn wrap_for_verification(source_type: &str, message: &str) -> Self {
        Error::VerificationFailure(format!("{message} ({source_type})"))
    }
}
