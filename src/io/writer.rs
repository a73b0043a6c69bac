//! Growable byte sink with explicit byte order

use crate::io::ByteOrder;
use crate::types::PixelType;

/// Appends numbers, strings and pixel runs to an owned buffer
#[derive(Debug)]
pub struct ByteWriter {
    buf: Vec<u8>,
    order: ByteOrder,
}

macro_rules! write_number {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, value: $ty) {
            match self.order {
                ByteOrder::LittleEndian => self.buf.extend_from_slice(&value.to_le_bytes()),
                ByteOrder::BigEndian => self.buf.extend_from_slice(&value.to_be_bytes()),
            }
        }
    };
}

impl ByteWriter {
    pub fn with_capacity(capacity: usize, order: ByteOrder) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            order,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    write_number!(write_u16, u16);
    write_number!(write_u32, u32);
    write_number!(write_i32, i32);
    write_number!(write_f64, f64);

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    /// Writes the string followed by a NUL terminator
    pub fn write_cstr(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.push(0);
    }

    /// Writes one clamped pixel value in the writer's byte order
    pub fn write_pixel(&mut self, pixtype: PixelType, value: f64) {
        let mut raw = pixtype.encode_to_vec(value);
        if self.order.needs_swap() {
            ByteOrder::swap_words(&mut raw, pixtype.size());
        }
        self.buf.extend_from_slice(&raw);
    }

    /// Writes host-order pixel data in the writer's byte order
    pub fn write_pixels(&mut self, pixtype: PixelType, data: &[u8]) {
        let start = self.buf.len();
        self.buf.extend_from_slice(data);
        if self.order.needs_swap() {
            ByteOrder::swap_words(&mut self.buf[start..], pixtype.size());
        }
    }

    /// Zero-pads until the length is a multiple of `align`
    pub fn pad_to(&mut self, align: usize) {
        let rem = self.buf.len() % align;
        if rem != 0 {
            self.write_zeros(align - rem);
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
