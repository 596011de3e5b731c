//! FlateDecode (zlib/deflate) implementation.
//!
//! Uses the flate2 crate. Streams with a damaged zlib wrapper are retried as
//! raw deflate, and a stream that breaks partway keeps the bytes decoded so
//! far.

use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::io::Read;

/// Decompress a FlateDecode stream.
pub fn decode(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let zlib_err = match ZlibDecoder::new(input).read_to_end(&mut output) {
        Ok(_) => return Ok(output),
        Err(e) if !output.is_empty() => {
            log::warn!(
                "FlateDecode partial recovery: extracted {} bytes before corruption: {}",
                output.len(),
                e
            );
            return Ok(output);
        },
        Err(e) => e,
    };

    log::info!("Zlib decode failed ({}), trying raw deflate", zlib_err);
    output.clear();
    match DeflateDecoder::new(input).read_to_end(&mut output) {
        Ok(_) => Ok(output),
        Err(_) if !output.is_empty() => {
            log::warn!("Raw deflate partial recovery: {} bytes", output.len());
            Ok(output)
        },
        Err(e) => Err(Error::Decode(format!("FlateDecode failed: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_zlib_round_trip() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"Hello, FlateDecode!").unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(decode(&compressed).unwrap(), b"Hello, FlateDecode!");
    }

    #[test]
    fn test_raw_deflate_fallback() {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"no zlib header").unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(decode(&compressed).unwrap(), b"no zlib header");
    }

    #[test]
    fn test_garbage_fails() {
        assert!(decode(&[0xFF, 0xFF, 0xFF, 0xFF]).is_err());
    }
}
