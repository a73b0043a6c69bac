//! Decompression of TIFF chunks

pub mod deflate;

use crate::error::{Error, Result};

/// Compression schemes understood by the TIFF reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    /// Deflate/ZIP (zlib stream)
    Deflate,
}

impl Compression {
    /// Maps the TIFF Compression tag value
    pub fn from_tag(value: u64) -> Result<Self> {
        match value {
            1 => Ok(Compression::None),
            8 | 32946 => Ok(Compression::Deflate),
            5 => Err(Error::Unsupported("LZW compressed TIFF".to_string())),
            7 => Err(Error::Unsupported("JPEG compressed TIFF".to_string())),
            32773 => Err(Error::Unsupported("PackBits compressed TIFF".to_string())),
            other => Err(Error::Unsupported(format!("TIFF compression type {}", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Deflate => "Deflate/ZIP",
        }
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Deflate => deflate::decompress(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_from_tag() {
        assert_eq!(Compression::from_tag(1).unwrap(), Compression::None);
        assert_eq!(Compression::from_tag(8).unwrap(), Compression::Deflate);
        assert_eq!(Compression::from_tag(32946).unwrap(), Compression::Deflate);
        assert!(matches!(Compression::from_tag(5), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_compression_name() {
        assert_eq!(Compression::None.name(), "None");
        assert_eq!(Compression::Deflate.name(), "Deflate/ZIP");
    }

    #[test]
    fn test_no_compression() {
        let data = vec![1u8, 2, 3, 4];
        assert_eq!(Compression::None.decompress(&data).unwrap(), data);
    }
}
