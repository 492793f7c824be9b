//! A [`Sink`] that decodes/encodes a concrete value type around a
//! [`ByteSink`], grounded in `original_source/sink_fn.go` (the generic
//! `SinkFn[T]` wrapper) with the self-describing and schema-based presets
//! from `original_source/gob.go` and `original_source/x/protosink/protosink.go`.

use crate::error::Error;
use crate::sink::{ByteSink, Sink};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

type DecodeFn<T> = Arc<dyn Fn(&[u8]) -> Result<T, Error> + Send + Sync>;
type EncodeFn<T> = Arc<dyn Fn(&T) -> Result<Vec<u8>, Error> + Send + Sync>;

/// A pair of decode/encode functions bound to a concrete type `T`.
///
/// Stands in for the Go original's reflection-based `SinkType` dispatch:
/// each preset here is chosen at compile time instead of discovered by
/// inspecting a `reflect.Type` at call time.
#[derive(Clone)]
pub struct SinkCodec<T> {
    decode: DecodeFn<T>,
    encode: EncodeFn<T>,
}

impl<T> fmt::Debug for SinkCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkCodec").finish_non_exhaustive()
    }
}

impl<T> SinkCodec<T> {
    /// Builds a codec from raw decode/encode closures.
    pub fn new<D, E>(decode: D, encode: E) -> Self
    where
        D: Fn(&[u8]) -> Result<T, Error> + Send + Sync + 'static,
        E: Fn(&T) -> Result<Vec<u8>, Error> + Send + Sync + 'static,
    {
        SinkCodec {
            decode: Arc::new(decode),
            encode: Arc::new(encode),
        }
    }
}

#[cfg(feature = "json")]
impl<T> SinkCodec<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    /// A self-describing JSON codec, the nearest idiomatic analogue of
    /// `original_source/gob.go`'s `gob.Encoder`/`gob.Decoder` pair: the
    /// payload carries its own field names and needs no schema shared out
    /// of band.
    pub fn json() -> Self {
        SinkCodec::new(
            |bytes| serde_json::from_slice(bytes).map_err(Error::decode),
            |value| serde_json::to_vec(value).map_err(Error::encode),
        )
    }
}

#[cfg(feature = "msgpack")]
impl<T> SinkCodec<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    /// A compact MessagePack codec, the nearest idiomatic analogue of
    /// `original_source/x/protosink/protosink.go`'s schema-based Protobuf
    /// sink: the reader must already know `T` at compile time, there is no
    /// field-name reflection once built.
    pub fn msgpack() -> Self {
        SinkCodec::new(
            |bytes| rmp_serde::from_slice(bytes).map_err(Error::decode),
            |value| rmp_serde::to_vec(value).map_err(Error::encode),
        )
    }
}

/// A [`Sink`] that stores `T` by encoding it into an inner [`ByteSink`],
/// and can hand back a decoded `T` on demand.
///
/// `T: Clone` is this crate's trait-bound equivalent of the Go original's
/// `SinkType.Clone`/`DefaultClone` reflection dance (spec.md Design
/// Notes): a caller who needs a genuine copy of a cached value gets one
/// enforced at compile time instead of relying on a reflection-based
/// default that silently shallow-copies.
pub struct TypedSink<T: Clone> {
    inner: ByteSink,
    codec: Option<SinkCodec<T>>,
    value: Option<T>,
}

impl<T: Clone> fmt::Debug for TypedSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSink")
            .field("inner", &self.inner)
            .field("has_codec", &self.codec.is_some())
            .field("has_value", &self.value.is_some())
            .finish()
    }
}

impl<T: Clone> TypedSink<T> {
    /// An empty typed sink with no codec attached yet.
    pub fn new() -> Self {
        TypedSink {
            inner: ByteSink::new(),
            codec: None,
            value: None,
        }
    }

    /// A typed sink backed by `codec`.
    pub fn with_codec(codec: SinkCodec<T>) -> Self {
        TypedSink {
            inner: ByteSink::new(),
            codec: Some(codec),
            value: None,
        }
    }

    /// Attaches (or replaces) this sink's codec.
    pub fn set_codec(&mut self, codec: SinkCodec<T>) {
        self.codec = Some(codec);
    }

    /// Encodes `value` via the attached codec and adopts the freshly
    /// allocated result, storing a clone of `value` alongside it.
    pub fn set_value(&mut self, value: &T, expire: Option<Instant>) -> Result<(), Error> {
        let codec = self.codec.as_ref().ok_or(Error::NilReceiver)?;
        let bytes = (codec.encode)(value)?;
        self.inner.set_owned_bytes(bytes, expire);
        self.value = Some(value.clone());
        Ok(())
    }

    /// Returns a fresh clone of the cached value, decoding the sink's
    /// current bytes if none is cached yet. Decode failures are swallowed
    /// (returns `None`) rather than surfaced, matching `value()`'s "fails
    /// silently" contract.
    pub fn value(&self) -> Option<T> {
        if let Some(value) = &self.value {
            return Some(value.clone());
        }
        let codec = self.codec.as_ref()?;
        let bytes = self.inner.bytes()?;
        (codec.decode)(bytes).ok()
    }

    /// The raw inner byte sink, for composing with a [`Cache::get`](crate::Cache::get).
    pub fn byte_sink(&mut self) -> &mut ByteSink {
        &mut self.inner
    }
}

impl<T: Clone> Default for TypedSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Sink for TypedSink<T> {
    /// Decodes `bytes` into a fresh `T` via the attached codec and, on
    /// success, stores both a copy of `bytes` and the decoded value. This
    /// is the path a loader or a cache hit actually drives — the `Getter`
    /// writes raw bytes in, and this sink must turn them back into `T`
    /// itself rather than trusting them blind.
    fn set_bytes(&mut self, bytes: &[u8], expire: Option<Instant>) -> Result<(), Error> {
        if bytes.is_empty() {
            return Err(Error::NoData);
        }
        let codec = self.codec.as_ref().ok_or(Error::NilReceiver)?;
        let value = (codec.decode)(bytes)?;
        self.inner.set_bytes(bytes, expire)?;
        self.value = Some(value);
        Ok(())
    }

    fn bytes(&self) -> Option<&[u8]> {
        self.inner.bytes()
    }

    fn expire(&self) -> Option<Instant> {
        self.inner.expire()
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    #[cfg(feature = "json")]
    fn json_round_trips() {
        let mut sink: TypedSink<Widget> = TypedSink::with_codec(SinkCodec::json());
        let w = Widget {
            name: "bolt".into(),
            count: 3,
        };
        sink.set_value(&w, None).unwrap();
        assert_eq!(sink.value(), Some(w));
    }

    #[test]
    #[cfg(feature = "msgpack")]
    fn msgpack_round_trips() {
        let mut sink: TypedSink<Widget> = TypedSink::with_codec(SinkCodec::msgpack());
        let w = Widget {
            name: "nut".into(),
            count: 9,
        };
        sink.set_value(&w, None).unwrap();
        assert_eq!(sink.value(), Some(w));
    }

    #[test]
    fn missing_codec_yields_nil_receiver() {
        let mut sink: TypedSink<Widget> = TypedSink::new();
        let w = Widget {
            name: "x".into(),
            count: 1,
        };
        assert!(matches!(
            sink.set_value(&w, None),
            Err(Error::NilReceiver)
        ));
        assert_eq!(sink.value(), None);
    }

    #[test]
    #[cfg(feature = "json")]
    fn empty_sink_yields_none() {
        let sink: TypedSink<Widget> = TypedSink::with_codec(SinkCodec::json());
        assert_eq!(sink.value(), None);
    }

    #[test]
    #[cfg(feature = "json")]
    fn set_bytes_decodes_and_caches_the_value() {
        let payload = serde_json::to_vec(&Widget {
            name: "screw".into(),
            count: 5,
        })
        .unwrap();
        let mut sink: TypedSink<Widget> = TypedSink::with_codec(SinkCodec::json());
        sink.set_bytes(&payload, None).unwrap();
        assert_eq!(sink.bytes(), Some(payload.as_slice()));
        assert_eq!(
            sink.value(),
            Some(Widget {
                name: "screw".into(),
                count: 5
            })
        );
    }

    #[test]
    #[cfg(feature = "json")]
    fn set_bytes_rejects_empty_input() {
        let mut sink: TypedSink<Widget> = TypedSink::with_codec(SinkCodec::json());
        assert!(matches!(sink.set_bytes(b"", None), Err(Error::NoData)));
    }

    #[test]
    fn set_bytes_without_codec_yields_nil_receiver() {
        let mut sink: TypedSink<Widget> = TypedSink::new();
        assert!(matches!(
            sink.set_bytes(b"{}", None),
            Err(Error::NilReceiver)
        ));
    }

    #[test]
    #[cfg(feature = "json")]
    fn set_bytes_surfaces_decode_errors_and_leaves_no_cached_value() {
        let mut sink: TypedSink<Widget> = TypedSink::with_codec(SinkCodec::json());
        assert!(matches!(sink.set_bytes(b"not json", None), Err(Error::Decode(_))));
        assert_eq!(sink.value(), None);
    }
}
