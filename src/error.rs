use std::fmt;
use std::sync::Arc;

/// Errors produced by this crate.
///
/// `NoData` and `InvalidSink` are conceptually "invalid argument" errors;
/// [`Error::is_invalid_argument`] plays the role `errors.Is(err, ErrInvalid)`
/// plays in the Go module this crate is modelled on.
///
/// `Clone` is derived (backed by `Arc` rather than `Box` for the wrapped
/// source errors) so [`SingleFlight`](crate::SingleFlight) can hand the
/// same upstream failure back to every waiter coalesced onto a single
/// in-flight load.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// A generic invalid argument was supplied.
    #[error("invalid argument")]
    Invalid,

    /// A [`Sink`](crate::Sink) was asked to store an empty byte slice.
    #[error("no data")]
    NoData,

    /// A typed sink was used before a [`SinkCodec`](crate::SinkCodec) was attached to it.
    #[error("sink has no codec attached")]
    NilReceiver,

    /// A typed sink's codec could not be used (e.g. it has no decoder).
    #[error("invalid sink")]
    InvalidSink,

    /// Decoding bytes into a value failed.
    #[error("decode: {0}")]
    Decode(BoxError),

    /// Encoding a value into bytes failed.
    #[error("encode: {0}")]
    Encode(BoxError),

    /// The upstream [`Getter`](crate::Getter) failed to produce a value.
    #[error("upstream: {0}")]
    Upstream(BoxError),
}

impl Error {
    /// True for the "invalid argument" family: [`Error::Invalid`],
    /// [`Error::NoData`], [`Error::InvalidSink`].
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::Invalid | Error::NoData | Error::InvalidSink)
    }

    /// Wraps an upstream loader error.
    pub fn upstream<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Upstream(Arc::new(err))
    }

    /// Wraps a decode failure with context, mirroring the Go source's
    /// `core.Wrap(err, "decode")`.
    pub fn decode<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Decode(Arc::new(err))
    }

    /// Wraps an encode failure with context, mirroring the Go source's
    /// `core.Wrap(err, "encode")`.
    pub fn encode<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Encode(Arc::new(err))
    }
}

/// A shared source error kept in [`Error::Decode`], [`Error::Encode`] and
/// [`Error::Upstream`]. `Arc`, not `Box`, so `Error` itself stays `Clone`.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Minimal string-backed error, used where a call site needs an
/// `std::error::Error` to box but has nothing richer to report.
#[derive(Debug)]
pub struct Message(pub String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}
