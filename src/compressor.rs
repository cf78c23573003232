//! Compression codec adapters.
//!
//! Every codec is exposed through the same contract: a deterministic
//! `compress(bytes) -> bytes` parameterized by an integer level. The engine
//! only ever looks at compressed *lengths*; the byte output is treated as
//! opaque.

use std::io::Write;
use std::ops::RangeInclusive;

use crate::error::{CompressionError, ConfigError};

/// The set of supported compression codecs.
///
/// Codec selection happens once at configuration time; unknown codec names
/// are rejected by [`Codec::from_name`] before any similarity computation
/// begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Bzip2,
    Gzip,
    Zlib,
    Zstd,
}

impl Codec {
    /// Resolves a codec by its registry name.
    pub fn from_name(name: &str) -> Result<Codec, ConfigError> {
        match name {
            "bzip2" => Ok(Codec::Bzip2),
            "gzip" => Ok(Codec::Gzip),
            "zlib" => Ok(Codec::Zlib),
            "zstd" => Ok(Codec::Zstd),
            other => Err(ConfigError::UnknownCodec(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Codec::Bzip2 => "bzip2",
            Codec::Gzip => "gzip",
            Codec::Zlib => "zlib",
            Codec::Zstd => "zstd",
        }
    }

    /// The range of compression levels the codec accepts.
    pub fn level_range(&self) -> RangeInclusive<u32> {
        match self {
            Codec::Zstd => 1..=22,
            Codec::Bzip2 | Codec::Gzip | Codec::Zlib => 1..=9,
        }
    }

    pub fn default_level(&self) -> u32 {
        match self {
            Codec::Zstd => 3,
            Codec::Bzip2 | Codec::Gzip | Codec::Zlib => 9,
        }
    }
}

/// A codec bound to a validated compression level.
///
/// Stateless: compression is a pure function of the input bytes for a fixed
/// codec and level, so a `Compressor` can be shared freely across worker
/// threads.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    codec: Codec,
    level: u32,
}

impl Compressor {
    /// Binds `codec` to `level`, validating the level against the codec's
    /// supported range before any compression is attempted.
    pub fn new(codec: Codec, level: u32) -> Result<Compressor, ConfigError> {
        let range = codec.level_range();
        if !range.contains(&level) {
            return Err(ConfigError::CompressionLevel {
                codec: codec.name(),
                level,
                range,
            });
        }
        Ok(Compressor { codec, level })
    }

    /// Binds `codec` to its default level, which is always in range.
    pub fn with_default_level(codec: Codec) -> Compressor {
        Compressor {
            codec,
            level: codec.default_level(),
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Compresses `data`, returning the full compressed byte stream.
    ///
    /// Failures propagate to the caller and abort the enclosing matrix or
    /// classification run; they are never retried.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let compressed = match self.codec {
            Codec::Bzip2 => {
                let mut encoder =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::new(self.level));
                encoder.write_all(data).and_then(|()| encoder.finish())
            }
            Codec::Gzip => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::new(self.level));
                encoder.write_all(data).and_then(|()| encoder.finish())
            }
            Codec::Zlib => {
                let mut encoder = flate2::write::ZlibEncoder::new(
                    Vec::new(),
                    flate2::Compression::new(self.level),
                );
                encoder.write_all(data).and_then(|()| encoder.finish())
            }
            Codec::Zstd => zstd::stream::encode_all(data, self.level as i32),
        };
        compressed.map_err(|source| CompressionError::Codec {
            codec: self.codec.name(),
            len: data.len(),
            source,
        })
    }

    /// The compressed length of `data`, the only quantity the distance
    /// formulas consume.
    pub fn compressed_len(&self, data: &[u8]) -> Result<usize, CompressionError> {
        Ok(self.compress(data)?.len())
    }
}
