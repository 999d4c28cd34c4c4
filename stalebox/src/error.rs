use std::any::Any;

use thiserror::Error;

/// Boxed source failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by `TimedCache` reads.
///
/// Reads only fail while the cache is cold: once a value has been computed,
/// later failures of the source are logged and the previous value is served.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The source failed while computing the first value.
    #[error("source computation failed: {0}")]
    Computation(#[source] BoxError),

    /// The source panicked while computing the first value.
    #[error("source computation panicked: {0}")]
    Panic(String),
}

impl CacheError {
    pub(crate) fn computation<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Computation(Box::new(error))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_owned()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_owned()
        };
        Self::Panic(message)
    }

    /// Returns `true` if the source panicked rather than returning an error.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panic(_))
    }

    /// Attempts to downcast the underlying source error.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Computation(error) => error.downcast_ref::<E>(),
            Self::Panic(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_stringified() {
        let error = CacheError::from_panic(Box::new("boom"));
        assert!(error.is_panic());
        assert_eq!(error.to_string(), "source computation panicked: boom");

        let error = CacheError::from_panic(Box::new(String::from("owned boom")));
        assert_eq!(error.to_string(), "source computation panicked: owned boom");

        let error = CacheError::from_panic(Box::new(7u8));
        assert_eq!(error.to_string(), "source computation panicked: unknown panic payload");
    }

    #[test]
    fn computation_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timed out");
        let error = CacheError::computation(io);

        assert!(!error.is_panic());
        assert_eq!(
            error.downcast_ref::<std::io::Error>().map(|e| e.kind()),
            Some(std::io::ErrorKind::TimedOut)
        );
        let source = std::error::Error::source(&error).map(|e| e.to_string());
        assert_eq!(source.as_deref(), Some("upstream timed out"));
    }
}
