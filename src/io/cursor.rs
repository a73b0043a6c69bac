//! Bounds-checked reading over a byte slice
//!
//! Every read checks the remaining length first and fails with
//! [`Error::MalformedData`] instead of reading past the slice.

use crate::error::{Error, Result};
use crate::io::ByteOrder;
use crate::types::PixelType;

/// Fail-closed cursor over borrowed bytes
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

macro_rules! read_number {
    ($name:ident, $ty:ty) => {
        #[doc = concat!("Reads a `", stringify!($ty), "` in the cursor's byte order")]
        pub fn $name(&mut self) -> Result<$ty> {
            const N: usize = std::mem::size_of::<$ty>();
            let mut buf = [0u8; N];
            buf.copy_from_slice(self.take(N)?);
            Ok(match self.order {
                ByteOrder::LittleEndian => <$ty>::from_le_bytes(buf),
                ByteOrder::BigEndian => <$ty>::from_be_bytes(buf),
            })
        }
    };
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8], order: ByteOrder) -> Self {
        Self { data, pos: 0, order }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Current offset from the start of the slice
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Moves to an absolute offset, which may equal the slice length
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::malformed(format!(
                "Offset {} beyond end of {} byte buffer",
                pos,
                self.data.len()
            )));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Skips forward so the position becomes a multiple of `align`
    pub fn align_to(&mut self, align: usize) -> Result<()> {
        let rem = self.pos % align;
        if rem != 0 {
            self.skip(align - rem)?;
        }
        Ok(())
    }

    /// Borrows the next `n` bytes
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::malformed(format!(
                "Unexpected end of data: need {} bytes at offset {}, {} available",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Returns `n` bytes at an absolute offset without moving the cursor
    pub fn slice_at(&self, offset: usize, n: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .map(|end| &self.data[offset..end])
            .ok_or_else(|| {
                Error::malformed(format!(
                    "Range {}+{} beyond end of {} byte buffer",
                    offset,
                    n,
                    self.data.len()
                ))
            })
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    read_number!(read_u16, u16);
    read_number!(read_u32, u32);
    read_number!(read_u64, u64);
    read_number!(read_i32, i32);
    read_number!(read_f32, f32);
    read_number!(read_f64, f64);

    /// Reads a NUL-terminated string and consumes the terminator
    pub fn read_cstr(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::malformed(format!("Unterminated string at offset {}", self.pos)))?;
        let text = std::str::from_utf8(&rest[..len])
            .map_err(|e| Error::malformed(format!("String at offset {} is not UTF-8: {}", self.pos, e)))?
            .to_string();
        self.pos += len + 1;
        Ok(text)
    }

    /// Reads one pixel of `pixtype` and returns its value
    pub fn read_pixel(&mut self, pixtype: PixelType) -> Result<f64> {
        let mut raw = self.take(pixtype.size())?.to_vec();
        if self.order.needs_swap() {
            ByteOrder::swap_words(&mut raw, pixtype.size());
        }
        Ok(pixtype.decode(&raw))
    }

    /// Copies `count` pixels of `pixtype`, converted to host byte order
    pub fn read_pixels(&mut self, pixtype: PixelType, count: usize) -> Result<Vec<u8>> {
        let len = count
            .checked_mul(pixtype.size())
            .ok_or_else(|| Error::malformed("Pixel run length overflows"))?;
        let mut raw = self.take(len)?.to_vec();
        if self.order.needs_swap() {
            ByteOrder::swap_words(&mut raw, pixtype.size());
        }
        Ok(raw)
    }
}
