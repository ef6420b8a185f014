//! Entry serialization is an application concern; the journal only knows
//! how to call through these two traits.

use std::convert::Infallible;

/// Serializes entries of type `V` into the bytes the journal frames.
pub trait EntryEncoder<V>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append the encoded bytes of `entry` to `out`. Must not keep state
    /// across calls.
    fn encode(&self, entry: &V, out: &mut Vec<u8>) -> Result<(), Self::Error>;
}

/// Reconstructs entries of type `V` from framed bytes during replay.
pub trait EntryDecoder<V>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn decode(&self, bytes: &[u8], type_tag: u8) -> Result<V, Self::Error>;
}

/// Reference codec for entries that are already raw bytes. Mostly useful for
/// tests and for applications happy to own their own framing inside the
/// payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct BytesCodec;

impl EntryEncoder<Vec<u8>> for BytesCodec {
    type Error = Infallible;

    fn encode(&self, entry: &Vec<u8>, out: &mut Vec<u8>) -> Result<(), Self::Error> {
        out.extend_from_slice(entry);
        Ok(())
    }
}

impl EntryDecoder<Vec<u8>> for BytesCodec {
    type Error = Infallible;

    fn decode(&self, bytes: &[u8], _type_tag: u8) -> Result<Vec<u8>, Self::Error> {
        Ok(bytes.to_vec())
    }
}
