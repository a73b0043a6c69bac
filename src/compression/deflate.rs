//! Deflate/ZIP decompression

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::{Error, Result};

/// Inflates a zlib stream. A corrupt stream is malformed data, not an I/O failure.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::malformed(format!("Deflate stream: {}", e)))?;
    Ok(decompressed)
}
