//! I/O utilities for georaster
//!
//! Byte-order handling plus a bounds-checked read cursor and a growable
//! writer used by the storage, WKB and TIFF codecs.

pub mod byte_order;
pub mod cursor;
pub mod writer;

pub use byte_order::ByteOrder;
pub use cursor::ByteCursor;
pub use writer::ByteWriter;
