//! Byte order (endianness) handling
//!
//! Serialized rasters and TIFF files both carry their own byte order. The
//! storage form is always host order, WKB declares it in its first byte and
//! TIFF in its two-byte magic.

use crate::error::{Error, Result};

/// Represents the byte order (endianness) of binary data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (least significant byte first)
    LittleEndian,
    /// Big-endian byte order (most significant byte first)
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the running machine
    pub fn host() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }

    /// Returns true when values in this order must be swapped to be read natively
    pub fn needs_swap(self) -> bool {
        self != Self::host()
    }

    /// Detects byte order from TIFF magic bytes
    ///
    /// TIFF files start with either "II" (0x4949) for little-endian
    /// or "MM" (0x4D4D) for big-endian.
    pub fn from_tiff_magic(magic: [u8; 2]) -> Option<Self> {
        match &magic {
            b"II" => Some(ByteOrder::LittleEndian),
            b"MM" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    /// Decodes the WKB endianness byte (0 = XDR/big, 1 = NDR/little)
    pub fn from_wkb_flag(flag: u8) -> Result<Self> {
        match flag {
            0 => Ok(ByteOrder::BigEndian),
            1 => Ok(ByteOrder::LittleEndian),
            other => Err(Error::malformed(format!("Invalid WKB endianness byte {}", other))),
        }
    }

    /// Encodes this order as the WKB endianness byte
    pub fn wkb_flag(self) -> u8 {
        match self {
            ByteOrder::BigEndian => 0,
            ByteOrder::LittleEndian => 1,
        }
    }

    /// Reverses every `width`-byte word of `data` in place
    pub fn swap_words(data: &mut [u8], width: usize) {
        if width > 1 {
            for word in data.chunks_exact_mut(width) {
                word.reverse();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tiff_magic() {
        assert_eq!(ByteOrder::from_tiff_magic(*b"II"), Some(ByteOrder::LittleEndian));
        assert_eq!(ByteOrder::from_tiff_magic(*b"MM"), Some(ByteOrder::BigEndian));
        assert_eq!(ByteOrder::from_tiff_magic(*b"XX"), None);
    }

    #[test]
    fn test_wkb_flag() {
        assert_eq!(ByteOrder::from_wkb_flag(1).unwrap(), ByteOrder::LittleEndian);
        assert_eq!(ByteOrder::from_wkb_flag(0).unwrap(), ByteOrder::BigEndian);
        assert!(matches!(ByteOrder::from_wkb_flag(2), Err(Error::MalformedData(_))));
        assert_eq!(ByteOrder::BigEndian.wkb_flag(), 0);
    }

    #[test]
    fn test_host_never_swaps() {
        assert!(!ByteOrder::host().needs_swap());
    }

    #[test]
    fn test_swap_words() {
        let mut data = vec![1u8, 2, 3, 4, 5, 6];
        ByteOrder::swap_words(&mut data, 2);
        assert_eq!(data, vec![2, 1, 4, 3, 6, 5]);

        let mut single = vec![1u8, 2];
        ByteOrder::swap_words(&mut single, 1);
        assert_eq!(single, vec![1, 2]);
    }
}
