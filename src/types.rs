//! Core data types for georaster
//!
//! [`PixelType`] is the registry of the eleven cell encodings a band can
//! hold. Every conversion between an `f64` and stored bytes goes through
//! [`PixelType::clamp`], so values saturate instead of wrapping.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};

/// Tolerance used for every floating point equality test on pixel values
pub const FLT_TOLERANCE: f64 = f32::EPSILON as f64;

/// Float equality within [`FLT_TOLERANCE`]; NaN never compares equal
#[inline]
pub fn flt_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= FLT_TOLERANCE
}

/// Pixel encodings, ordered by their serialized ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum PixelType {
    /// 1-bit boolean (`1BB`)
    Bool1,
    /// 2-bit unsigned (`2BUI`)
    UInt2,
    /// 4-bit unsigned (`4BUI`)
    UInt4,
    /// 8-bit signed (`8BSI`)
    Int8,
    /// 8-bit unsigned (`8BUI`)
    UInt8,
    /// 16-bit signed (`16BSI`)
    Int16,
    /// 16-bit unsigned (`16BUI`)
    UInt16,
    /// 32-bit signed (`32BSI`)
    Int32,
    /// 32-bit unsigned (`32BUI`)
    UInt32,
    /// 32-bit float (`32BF`)
    Float32,
    /// 64-bit float (`64BF`)
    Float64,
}

/// How a requested value differs from what a pixel type can store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionLoss {
    /// Saturated to the type's range
    Clamped,
    /// Fractional part dropped
    Truncated,
    /// Rounded to float precision
    Converted,
}

impl PixelType {
    /// All pixel types in ordinal order
    pub const ALL: [PixelType; 11] = [
        PixelType::Bool1,
        PixelType::UInt2,
        PixelType::UInt4,
        PixelType::Int8,
        PixelType::UInt8,
        PixelType::Int16,
        PixelType::UInt16,
        PixelType::Int32,
        PixelType::UInt32,
        PixelType::Float32,
        PixelType::Float64,
    ];

    /// Ordinal stored in the low nibble of a serialized band type byte
    pub fn ordinal(self) -> u8 {
        match self {
            PixelType::Bool1 => 0,
            PixelType::UInt2 => 1,
            PixelType::UInt4 => 2,
            PixelType::Int8 => 3,
            PixelType::UInt8 => 4,
            PixelType::Int16 => 5,
            PixelType::UInt16 => 6,
            PixelType::Int32 => 7,
            PixelType::UInt32 => 8,
            PixelType::Float32 => 10,
            PixelType::Float64 => 11,
        }
    }

    /// Resolves a serialized ordinal; 9, 12 and above are unassigned
    pub fn from_ordinal(ordinal: u8) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|pt| pt.ordinal() == ordinal)
            .ok_or_else(|| Error::malformed(format!("Unknown pixel type ordinal {}", ordinal)))
    }

    /// Returns the size in bytes of one stored pixel
    pub fn size(self) -> usize {
        match self {
            PixelType::Bool1
            | PixelType::UInt2
            | PixelType::UInt4
            | PixelType::Int8
            | PixelType::UInt8 => 1,
            PixelType::Int16 | PixelType::UInt16 => 2,
            PixelType::Int32 | PixelType::UInt32 | PixelType::Float32 => 4,
            PixelType::Float64 => 8,
        }
    }

    /// Alignment requirement of stored pixel data
    pub fn alignment(self) -> usize {
        self.size()
    }

    /// Number of significant bits
    pub fn bits(self) -> u32 {
        match self {
            PixelType::Bool1 => 1,
            PixelType::UInt2 => 2,
            PixelType::UInt4 => 4,
            _ => self.size() as u32 * 8,
        }
    }

    /// Returns the canonical name of this pixel type
    pub fn name(self) -> &'static str {
        match self {
            PixelType::Bool1 => "1BB",
            PixelType::UInt2 => "2BUI",
            PixelType::UInt4 => "4BUI",
            PixelType::Int8 => "8BSI",
            PixelType::UInt8 => "8BUI",
            PixelType::Int16 => "16BSI",
            PixelType::UInt16 => "16BUI",
            PixelType::Int32 => "32BSI",
            PixelType::UInt32 => "32BUI",
            PixelType::Float32 => "32BF",
            PixelType::Float64 => "64BF",
        }
    }

    /// Looks up a pixel type by its canonical name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|pt| pt.name() == name)
    }

    pub fn is_float(self) -> bool {
        matches!(self, PixelType::Float32 | PixelType::Float64)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PixelType::Int8 | PixelType::Int16 | PixelType::Int32 | PixelType::Float32 | PixelType::Float64
        )
    }

    /// Most negative representable value, zero for unsigned types
    pub fn min_value(self) -> f64 {
        match self {
            PixelType::Int8 => i8::MIN as f64,
            PixelType::Int16 => i16::MIN as f64,
            PixelType::Int32 => i32::MIN as f64,
            PixelType::Float32 => -(f32::MAX as f64),
            PixelType::Float64 => -f64::MAX,
            _ => 0.0,
        }
    }

    /// Largest representable value
    pub fn max_value(self) -> f64 {
        match self {
            PixelType::Bool1 => 1.0,
            PixelType::UInt2 => 3.0,
            PixelType::UInt4 => 15.0,
            PixelType::Int8 => i8::MAX as f64,
            PixelType::UInt8 => u8::MAX as f64,
            PixelType::Int16 => i16::MAX as f64,
            PixelType::UInt16 => u16::MAX as f64,
            PixelType::Int32 => i32::MAX as f64,
            PixelType::UInt32 => u32::MAX as f64,
            PixelType::Float32 => f32::MAX as f64,
            PixelType::Float64 => f64::MAX,
        }
    }

    /// Saturates `value` into this type's range and drops what the type
    /// cannot represent. NaN saturates to the lower bound for every type
    /// except 64BF, which stores values unchanged.
    pub fn clamp(self, value: f64) -> f64 {
        match self {
            PixelType::Float64 => value,
            PixelType::Float32 => value.max(self.min_value()).min(self.max_value()) as f32 as f64,
            _ => value.max(self.min_value()).min(self.max_value()).trunc(),
        }
    }

    /// Compares two values after both are clamped to this type
    pub fn clamped_equal(self, a: f64, b: f64) -> bool {
        match self {
            PixelType::Float64 => flt_eq(a, b),
            PixelType::Float32 => flt_eq(self.clamp(a), self.clamp(b)),
            _ => self.clamp(a) == self.clamp(b),
        }
    }

    /// Classifies the difference between a requested value and the value
    /// that was actually stored.
    pub fn conversion_loss(self, requested: f64, stored: f64) -> Option<ConversionLoss> {
        if self.is_float() {
            return (!flt_eq(stored, requested)).then_some(ConversionLoss::Converted);
        }
        if (stored - requested).abs() >= 1.0 {
            Some(ConversionLoss::Clamped)
        } else if !flt_eq(stored, requested) {
            Some(ConversionLoss::Truncated)
        } else {
            None
        }
    }

    /// Logs a lossy conversion and reports whether one happened
    pub(crate) fn report_conversion(self, requested: f64, stored: f64) -> bool {
        match self.conversion_loss(requested, stored) {
            Some(loss) => {
                let verb = match loss {
                    ConversionLoss::Clamped => "clamped",
                    ConversionLoss::Truncated => "truncated",
                    ConversionLoss::Converted => "converted",
                };
                log::debug!(
                    "Value set for {} band got {} from {} to {}",
                    self.name(),
                    verb,
                    requested,
                    stored
                );
                true
            }
            None => false,
        }
    }

    /// Decodes one native-endian pixel from the start of `bytes`.
    ///
    /// `bytes` must hold at least [`size`](Self::size) bytes.
    pub fn decode(self, bytes: &[u8]) -> f64 {
        match self {
            PixelType::Bool1 | PixelType::UInt2 | PixelType::UInt4 | PixelType::UInt8 => bytes[0] as f64,
            PixelType::Int8 => bytes[0] as i8 as f64,
            PixelType::Int16 => i16::from_ne_bytes(take(bytes)) as f64,
            PixelType::UInt16 => u16::from_ne_bytes(take(bytes)) as f64,
            PixelType::Int32 => i32::from_ne_bytes(take(bytes)) as f64,
            PixelType::UInt32 => u32::from_ne_bytes(take(bytes)) as f64,
            PixelType::Float32 => f32::from_ne_bytes(take(bytes)) as f64,
            PixelType::Float64 => f64::from_ne_bytes(take(bytes)),
        }
    }

    /// Clamps `value` and encodes it native-endian into the start of `out`
    pub fn encode(self, value: f64, out: &mut [u8]) {
        let v = self.clamp(value);
        match self {
            PixelType::Bool1 | PixelType::UInt2 | PixelType::UInt4 | PixelType::UInt8 => out[0] = v as u8,
            PixelType::Int8 => out[0] = (v as i8) as u8,
            PixelType::Int16 => out[..2].copy_from_slice(&(v as i16).to_ne_bytes()),
            PixelType::UInt16 => out[..2].copy_from_slice(&(v as u16).to_ne_bytes()),
            PixelType::Int32 => out[..4].copy_from_slice(&(v as i32).to_ne_bytes()),
            PixelType::UInt32 => out[..4].copy_from_slice(&(v as u32).to_ne_bytes()),
            PixelType::Float32 => out[..4].copy_from_slice(&(v as f32).to_ne_bytes()),
            PixelType::Float64 => out[..8].copy_from_slice(&v.to_ne_bytes()),
        }
    }

    /// Encodes a clamped value into a fresh buffer of [`size`](Self::size) bytes
    pub fn encode_to_vec(self, value: f64) -> Vec<u8> {
        let mut out = vec![0u8; self.size()];
        self.encode(value, &mut out);
        out
    }

    /// Mask applied to NODATA values read back from the storage form
    pub(crate) fn sub_byte_mask(self) -> Option<u8> {
        match self {
            PixelType::Bool1 => Some(0x01),
            PixelType::UInt2 => Some(0x03),
            PixelType::UInt4 => Some(0x0F),
            _ => None,
        }
    }
}

fn take<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[..N]);
    buf
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::invalid(format!("Unknown pixel type name '{}'", s)))
    }
}

impl From<PixelType> for &'static str {
    fn from(pt: PixelType) -> Self {
        pt.name()
    }
}

/// Represents image dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u64,
    /// Height in pixels
    pub height: u64,
}

impl Dimensions {
    /// Creates new dimensions
    pub fn new(width: u64, height: u64) -> Self {
        Self { width, height }
    }

    /// Returns the total number of pixels
    pub fn pixel_count(&self) -> u64 {
        self.width * self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_and_alignment() {
        let sizes: Vec<usize> = PixelType::ALL.iter().map(|pt| pt.size()).collect();
        assert_eq!(sizes, vec![1, 1, 1, 1, 1, 2, 2, 4, 4, 4, 8]);
        for pt in PixelType::ALL {
            assert_eq!(pt.alignment(), pt.size());
        }
    }

    #[test]
    fn test_name_round_trip() {
        for pt in PixelType::ALL {
            assert_eq!(PixelType::from_name(pt.name()), Some(pt));
        }
        assert_eq!(PixelType::from_name("16BSI").map(|pt| pt.name()), Some("16BSI"));
        assert_eq!(PixelType::from_name("16bsi"), None);
        assert!("128BF".parse::<PixelType>().is_err());
    }

    #[test]
    fn test_ordinals_skip_unassigned() {
        assert_eq!(PixelType::from_ordinal(8).unwrap(), PixelType::UInt32);
        assert_eq!(PixelType::from_ordinal(10).unwrap(), PixelType::Float32);
        assert_eq!(PixelType::from_ordinal(11).unwrap(), PixelType::Float64);
        assert!(matches!(PixelType::from_ordinal(9), Err(Error::MalformedData(_))));
        assert!(matches!(PixelType::from_ordinal(12), Err(Error::MalformedData(_))));
        assert!(PixelType::from_ordinal(15).is_err());
    }

    #[test]
    fn test_clamp_saturates() {
        assert_eq!(PixelType::Bool1.clamp(5.0), 1.0);
        assert_eq!(PixelType::UInt2.clamp(7.0), 3.0);
        assert_eq!(PixelType::UInt4.clamp(-3.0), 0.0);
        assert_eq!(PixelType::Int8.clamp(-200.0), -128.0);
        assert_eq!(PixelType::UInt8.clamp(300.0), 255.0);
        assert_eq!(PixelType::Int16.clamp(40000.0), 32767.0);
        assert_eq!(PixelType::UInt32.clamp(-1.0), 0.0);
        assert_eq!(PixelType::UInt8.clamp(12.9), 12.0);
        assert_eq!(PixelType::Int8.clamp(-12.9), -12.0);
        assert_eq!(PixelType::Float32.clamp(1e300), f32::MAX as f64);
        assert_eq!(PixelType::Float64.clamp(1e300), 1e300);
        assert_eq!(PixelType::UInt8.clamp(f64::NAN), 0.0);
    }

    #[test]
    fn test_clamp_idempotent() {
        let samples = [-1e12, -70000.5, -129.0, -1.5, 0.0, 0.25, 1.0, 2.7, 254.9, 65536.0, 3e9, 1e40];
        for pt in PixelType::ALL {
            for v in samples {
                let once = pt.clamp(v);
                assert_eq!(pt.clamp(once), once, "{} {}", pt, v);
            }
        }
    }

    #[test]
    fn test_clamped_equal() {
        assert!(PixelType::UInt8.clamped_equal(255.0, 300.0));
        assert!(!PixelType::UInt8.clamped_equal(254.0, 255.0));
        assert!(PixelType::Float32.clamped_equal(0.1, 0.1f32 as f64));
        assert!(!PixelType::Float64.clamped_equal(0.1, 0.2));
    }

    #[test]
    fn test_min_value() {
        assert_eq!(PixelType::UInt16.min_value(), 0.0);
        assert_eq!(PixelType::Int8.min_value(), -128.0);
        assert_eq!(PixelType::Int32.min_value(), i32::MIN as f64);
        assert_eq!(PixelType::Float32.min_value(), -(f32::MAX as f64));
    }

    #[test]
    fn test_encode_decode() {
        let mut buf = [0u8; 8];
        PixelType::Int16.encode(-1234.0, &mut buf);
        assert_eq!(PixelType::Int16.decode(&buf), -1234.0);

        PixelType::Int8.encode(-5.0, &mut buf);
        assert_eq!(buf[0], 0xFB);
        assert_eq!(PixelType::Int8.decode(&buf), -5.0);

        PixelType::UInt32.encode(1e12, &mut buf);
        assert_eq!(PixelType::UInt32.decode(&buf), u32::MAX as f64);

        assert_eq!(PixelType::Float64.encode_to_vec(2.5), 2.5f64.to_ne_bytes().to_vec());
    }

    #[test]
    fn test_conversion_loss() {
        assert_eq!(PixelType::UInt8.conversion_loss(300.0, 255.0), Some(ConversionLoss::Clamped));
        assert_eq!(PixelType::UInt8.conversion_loss(3.5, 3.0), Some(ConversionLoss::Truncated));
        assert_eq!(PixelType::UInt8.conversion_loss(3.0, 3.0), None);
        assert_eq!(
            PixelType::Float32.conversion_loss(0.1, 0.1f32 as f64),
            None
        );
        assert_eq!(PixelType::Float32.conversion_loss(1e300, f32::MAX as f64), Some(ConversionLoss::Converted));
    }

    #[test]
    fn test_serialize_as_name() {
        assert_eq!(serde_json::to_string(&PixelType::Float32).unwrap(), "\"32BF\"");
    }

    #[test]
    fn test_dimensions() {
        let dims = Dimensions::new(100, 200);
        assert_eq!(dims.pixel_count(), 20000);
    }
}
