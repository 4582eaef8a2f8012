//! Proxy errors
//!
//! Every failure the proxy surfaces to a caller is a [`ProxyError`]. The
//! [`ProxyErrorCode`] decides the HTTP status; the optional message carries
//! which operation and resource failed; the optional source keeps the
//! original backend error for logging.

use std::borrow::Cow;
use std::fmt;

use http::StatusCode;

pub type StdError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type ProxyResult<T = (), E = ProxyError> = std::result::Result<T, E>;

/// The kind of a [`ProxyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ProxyErrorCode {
    /// The request carried no API key.
    MissingCredential,
    /// The prefix or filename cannot form a resource identifier.
    InvalidAddress,
    /// The caller's groups are not allowed to perform the request.
    Forbidden,
    /// The source has no such object, or no successor to the given name.
    NotFound,
    /// The source failed while reading.
    StorageReadFailed,
    /// The source, or the upload spool, failed while writing.
    StorageWriteFailed,
}

impl ProxyErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingCredential => "MissingCredential",
            Self::InvalidAddress => "InvalidAddress",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "NotFound",
            Self::StorageReadFailed => "StorageReadFailed",
            Self::StorageWriteFailed => "StorageWriteFailed",
        }
    }

    /// Returns the HTTP status for this kind.
    ///
    /// Only [`Forbidden`](Self::Forbidden) maps to `401`; validation and
    /// storage failures all map to `400`.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ProxyErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request-scoped proxy failure.
pub struct ProxyError(Box<Inner>);

struct Inner {
    code: ProxyErrorCode,
    message: Option<Cow<'static, str>>,
    source: Option<StdError>,
}

impl ProxyError {
    #[must_use]
    pub fn new(code: ProxyErrorCode) -> Self {
        Self(Box::new(Inner {
            code,
            message: None,
            source: None,
        }))
    }

    #[must_use]
    pub fn with_message(code: ProxyErrorCode, msg: impl Into<Cow<'static, str>>) -> Self {
        let mut this = Self::new(code);
        this.0.message = Some(msg.into());
        this
    }

    #[must_use]
    pub fn with_source(code: ProxyErrorCode, source: StdError) -> Self {
        let mut this = Self::new(code);
        this.0.source = Some(source);
        this
    }

    pub fn set_message(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.0.message = Some(msg.into());
    }

    pub fn set_source(&mut self, source: StdError) {
        self.0.source = Some(source);
    }

    #[must_use]
    pub fn code(&self) -> ProxyErrorCode {
        self.0.code
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.0.message.as_deref()
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.0.code.status_code()
    }
}

impl From<ProxyErrorCode> for ProxyError {
    fn from(code: ProxyErrorCode) -> Self {
        Self::new(code)
    }
}

impl fmt::Debug for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ProxyError");
        d.field("code", &self.0.code);
        if let Some(ref message) = self.0.message {
            d.field("message", message);
        }
        if let Some(ref source) = self.0.source {
            d.field("source", source);
        }
        d.finish()
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.message {
            Some(ref message) => write!(f, "{}: {message}", self.0.code),
            None => write!(f, "{}", self.0.code),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let source = self.0.source.as_deref()?;
        Some(source as _)
    }
}

/// Creates a [`ProxyError`].
///
/// ```
/// use source_proxy::{proxy_error, ProxyErrorCode};
///
/// let err = proxy_error!(NotFound, "no object after {:?}", "a.csv");
/// assert_eq!(err.code(), ProxyErrorCode::NotFound);
///
/// let io = std::io::Error::other("disk gone");
/// let err = proxy_error!(io, StorageWriteFailed, "error exporting");
/// assert!(std::error::Error::source(&err).is_some());
/// ```
#[macro_export]
macro_rules! proxy_error {
    ($source:expr, $code:ident) => {{
        let mut err = $crate::ProxyError::new($crate::ProxyErrorCode::$code);
        err.set_source(Box::new($source));
        err
    }};
    ($source:expr, $code:ident, $($arg:tt)+) => {{
        let mut err = $crate::ProxyError::with_message($crate::ProxyErrorCode::$code, format!($($arg)+));
        err.set_source(Box::new($source));
        err
    }};
    ($code:ident) => {
        $crate::ProxyError::new($crate::ProxyErrorCode::$code)
    };
    ($code:ident, $($arg:tt)+) => {
        $crate::ProxyError::with_message($crate::ProxyErrorCode::$code, format!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ProxyErrorCode::Forbidden.status_code(), StatusCode::UNAUTHORIZED);

        let bad_request = [
            ProxyErrorCode::MissingCredential,
            ProxyErrorCode::InvalidAddress,
            ProxyErrorCode::NotFound,
            ProxyErrorCode::StorageReadFailed,
            ProxyErrorCode::StorageWriteFailed,
        ];
        for code in bad_request {
            assert_eq!(code.status_code(), StatusCode::BAD_REQUEST, "{code}");
        }
    }

    #[test]
    fn display_includes_message() {
        let err = proxy_error!(InvalidAddress, "prefix is required");
        assert_eq!(err.to_string(), "InvalidAddress: prefix is required");

        let err = proxy_error!(Forbidden);
        assert_eq!(err.to_string(), "Forbidden");
        assert!(err.message().is_none());
    }

    #[test]
    fn source_is_preserved() {
        use std::error::Error as _;

        let io = std::io::Error::other("connection reset");
        let err = proxy_error!(io, StorageReadFailed, "error getting {}", "a/b");
        assert_eq!(err.code(), ProxyErrorCode::StorageReadFailed);
        assert_eq!(err.message(), Some("error getting a/b"));
        assert_eq!(err.source().unwrap().to_string(), "connection reset");
    }
}
