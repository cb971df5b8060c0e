//! Payload codecs for byte-oriented stores.
//!
//! Process-local stores keep object references; distributed and hybrid stores
//! only hold bytes, so every value crosses a [`PayloadCodec`] on the way in and
//! out.

use crate::{CacheError, CacheResult};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::io::{Read, Write};

/// Payloads at or below this size are stored uncompressed.
pub const COMPRESSION_THRESHOLD: usize = 64;

/// Leading byte of compressed payloads. MessagePack never emits it.
const COMPRESSED_MARKER: u8 = 0xC1;

/// Turns values into bytes and back.
pub trait PayloadCodec: Send + Sync + 'static {
    /// Short codec name used in logs.
    fn name(&self) -> &'static str;

    /// Encodes a value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Serialization`] if the value cannot be encoded.
    fn serialize<T: Serialize>(&self, value: &T) -> CacheResult<Vec<u8>>;

    /// Decodes a value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Serialization`] if the bytes do not hold a `T`.
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> CacheResult<T>;
}

/// Codec settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecOptions {
    /// Store every payload uncompressed.
    #[serde(default)]
    pub disable_compression: bool,

    /// Write positional arrays instead of field-named maps.
    ///
    /// Smaller and faster, but readers and writers must share the exact field
    /// layout of every cached type.
    #[serde(default)]
    pub require_annotated_types: bool,
}

impl CodecOptions {
    /// Options with compression turned off.
    #[must_use]
    pub const fn uncompressed() -> Self {
        Self {
            disable_compression: true,
            require_annotated_types: false,
        }
    }
}

/// MessagePack codec with optional deflate compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackCodec {
    options: CodecOptions,
}

impl MessagePackCodec {
    /// Creates a codec.
    #[must_use]
    pub const fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    /// Returns the codec options.
    #[must_use]
    pub const fn options(&self) -> &CodecOptions {
        &self.options
    }
}

impl PayloadCodec for MessagePackCodec {
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> CacheResult<Vec<u8>> {
        let encoded = if self.options.require_annotated_types {
            rmp_serde::to_vec(value)?
        } else {
            rmp_serde::to_vec_named(value)?
        };

        if self.options.disable_compression || encoded.len() <= COMPRESSION_THRESHOLD {
            return Ok(encoded);
        }

        compress(&encoded)
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> CacheResult<T> {
        match bytes.split_first() {
            Some((&COMPRESSED_MARKER, compressed)) => {
                let decoded = decompress(compressed)?;
                Ok(rmp_serde::from_slice(&decoded)?)
            }
            _ => Ok(rmp_serde::from_slice(bytes)?),
        }
    }
}

/// JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> CacheResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> CacheResult<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

fn compress(payload: &[u8]) -> CacheResult<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len() / 2 + 1);
    out.push(COMPRESSED_MARKER);

    let mut encoder = DeflateEncoder::new(out, Compression::fast());
    encoder
        .write_all(payload)
        .map_err(|e| CacheError::serialization(format!("Compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| CacheError::serialization(format!("Compression failed: {}", e)))
}

fn decompress(payload: &[u8]) -> CacheResult<Vec<u8>> {
    let mut out = Vec::new();
    DeflateDecoder::new(payload)
        .read_to_end(&mut out)
        .map_err(|e| CacheError::serialization(format!("Decompression failed: {}", e)))?;
    Ok(out)
}
