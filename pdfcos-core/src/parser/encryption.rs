//! Decryption hooks
//!
//! Key derivation and cipher selection live outside the parser. When a
//! document is encrypted, the caller passes a [`Decryptor`] for the object
//! being parsed and the parser applies it to every string and to stream
//! data before the filter chain.

use super::source::ByteSource;

/// Per-object decryption, e.g. with keys derived for `num gen obj`.
pub trait Decryptor {
    fn decrypt_string(&self, data: &[u8]) -> Vec<u8>;

    /// Wrap the raw payload of a stream of `length` bytes.
    fn create_stream(&self, source: Box<dyn ByteSource>, length: usize) -> Box<dyn ByteSource>;
}
