use derive_more::Display;
use thiserror::Error as ThisError;

///
/// Error
///
/// Crate-level error with a stable classification.
/// Module errors (`PathError`, `QueryOptionError`, ...) convert into this type
/// at the engine boundary; `kind` decides the client-facing response.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// True for errors caused by the request or topic itself.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self.kind, ErrorKind::Service)
    }

    #[must_use]
    pub fn display_with_kind(&self) -> String {
        format!("{}:{}: {}", self.origin, self.kind, self.message)
    }
}

///
/// ErrorKind
///
/// Terminal failure classes. None of them are retried inside the engine.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    InvalidPathSyntax,
    InvalidPathSemantics,
    InvalidQueryOption,
    UnknownEntityType,
    SubscriptionRejected,
    NotFound,
    Service,
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ErrorOrigin {
    Model,
    Path,
    Query,
    Service,
    Subscription,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_kind_prefixes_origin_and_kind() {
        let err = Error::new(
            ErrorKind::InvalidPathSyntax,
            ErrorOrigin::Path,
            "expected '/'",
        );

        assert_eq!(err.to_string(), "expected '/'");
        assert_eq!(
            err.display_with_kind(),
            "Path:InvalidPathSyntax: expected '/'"
        );
    }

    #[test]
    fn only_service_failures_are_server_errors() {
        assert!(Error::new(ErrorKind::NotFound, ErrorOrigin::Service, "gone").is_client_error());
        assert!(!Error::new(ErrorKind::Service, ErrorOrigin::Service, "down").is_client_error());
    }
}
