//! Compression codec for configurations, results and snapshots.
//!
//! Frame layout: the 4-byte magic `DYZ1` followed by a gzip stream of the
//! value's JSON encoding. Every call is independent; a [`Codec`] holds only
//! its compression level and can be shared freely between threads.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{EngineError, Result};

pub const MAGIC: &[u8; 4] = b"DYZ1";

pub const DEFAULT_LEVEL: u32 = 6;

/// Sizes observed by one compression call.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompressionReport {
    pub original_bytes: usize,
    pub compressed_bytes: usize,
    /// `compressed_bytes / original_bytes`; may exceed 1.0 for tiny inputs.
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    level: u32,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

impl Codec {
    /// Levels above 9 are clamped.
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }

    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    pub fn compress<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        self.compress_with_report(value).map(|(bytes, _)| bytes)
    }

    pub fn compress_with_report<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<(Vec<u8>, CompressionReport)> {
        let encoded = serde_json::to_vec(value)?;

        let mut frame = Vec::with_capacity(encoded.len() / 2 + MAGIC.len());
        frame.extend_from_slice(MAGIC);
        let mut encoder = GzEncoder::new(frame, Compression::new(self.level));
        encoder
            .write_all(&encoded)
            .map_err(|err| EngineError::Codec(format!("compress: {err}")))?;
        let frame = encoder
            .finish()
            .map_err(|err| EngineError::Codec(format!("compress: {err}")))?;

        #[allow(clippy::cast_precision_loss)]
        let ratio = if encoded.is_empty() {
            0.0
        } else {
            frame.len() as f64 / encoded.len() as f64
        };
        let report = CompressionReport {
            original_bytes: encoded.len(),
            compressed_bytes: frame.len(),
            ratio,
        };
        Ok((frame, report))
    }

    /// Decode a frame produced by [`Codec::compress`].
    ///
    /// Nothing is returned unless the whole frame decodes cleanly.
    pub fn decompress<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let body = bytes
            .strip_prefix(MAGIC.as_slice())
            .ok_or_else(|| EngineError::Codec("missing frame header".to_string()))?;

        let mut decoded = Vec::new();
        GzDecoder::new(body)
            .read_to_end(&mut decoded)
            .map_err(|err| EngineError::Codec(format!("decompress: {err}")))?;

        serde_json::from_slice(&decoded)
            .map_err(|err| EngineError::Codec(format!("decode payload: {err}")))
    }
}

/// Compress with the default level.
pub fn compress<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Codec::default().compress(value)
}

/// Decompress a frame; the level does not matter for decoding.
pub fn decompress<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Codec::default().decompress(bytes)
}
