//! GeoTIFF fixtures written to temporary files

#![allow(dead_code)]

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;

const ASCII: u16 = 2;
const SHORT: u16 = 3;
const LONG: u16 = 4;
const DOUBLE: u16 = 12;
const LONG8: u16 = 16;

/// Typed tag value, encoded once the byte order is known
enum Value {
    Ascii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Long8(Vec<u64>),
    Double(Vec<f64>),
}

impl Value {
    fn field_type(&self) -> u16 {
        match self {
            Value::Ascii(_) => ASCII,
            Value::Short(_) => SHORT,
            Value::Long(_) => LONG,
            Value::Long8(_) => LONG8,
            Value::Double(_) => DOUBLE,
        }
    }

    fn count(&self) -> usize {
        match self {
            Value::Ascii(v) => v.len(),
            Value::Short(v) => v.len(),
            Value::Long(v) => v.len(),
            Value::Long8(v) => v.len(),
            Value::Double(v) => v.len(),
        }
    }

    fn encode(&self, be: bool) -> Vec<u8> {
        macro_rules! words {
            ($values:expr, $be:expr) => {
                $values
                    .iter()
                    .flat_map(|v| if $be { v.to_be_bytes().to_vec() } else { v.to_le_bytes().to_vec() })
                    .collect()
            };
        }
        match self {
            Value::Ascii(v) => v.clone(),
            Value::Short(v) => words!(v, be),
            Value::Long(v) => words!(v, be),
            Value::Long8(v) => words!(v, be),
            Value::Double(v) => words!(v, be),
        }
    }
}

/// GeoTIFF description: strips or tiles, classic or BigTIFF, either byte
/// order, chunky or planar samples
pub struct GeoTiff {
    pub width: u32,
    pub height: u32,
    pub bits: u16,
    /// TIFF SampleFormat: 1 unsigned, 2 signed, 3 float
    pub sample_format: u16,
    pub samples: u16,
    pub deflate: bool,
    pub origin: (f64, f64),
    pub scale: (f64, f64),
    pub epsg: Option<u16>,
    pub nodata: Option<&'static str>,
    /// Tile width and height; a single strip when unset
    pub tile: Option<(u32, u32)>,
    pub big_tiff: bool,
    pub big_endian: bool,
    pub planar: bool,
    /// Horizontal differencing (integer samples only)
    pub predictor: bool,
}

impl GeoTiff {
    pub fn u8(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: 8,
            sample_format: 1,
            samples: 1,
            deflate: false,
            origin: (0.0, 0.0),
            scale: (1.0, 1.0),
            epsg: None,
            nodata: None,
            tile: None,
            big_tiff: false,
            big_endian: false,
            planar: false,
            predictor: false,
        }
    }

    fn sample_size(&self) -> usize {
        self.bits as usize / 8
    }

    /// Splits little-endian, pixel-interleaved sample bytes into encoded
    /// strips or tiles, padding tiles past the image edge with zeros
    fn chunks(&self, pixels: &[u8]) -> Vec<Vec<u8>> {
        let size = self.sample_size();
        let samples = self.samples as usize;
        let (w, h) = (self.width as usize, self.height as usize);
        let values: Vec<u64> = pixels
            .chunks_exact(size)
            .map(|word| {
                let mut le = [0u8; 8];
                le[..size].copy_from_slice(word);
                u64::from_le_bytes(le)
            })
            .collect();
        assert_eq!(values.len(), w * h * samples, "pixel buffer does not match the image");

        let mask = if size == 8 { u64::MAX } else { (1u64 << (size * 8)) - 1 };
        let (cw, ch) = self
            .tile
            .map(|(tw, th)| (tw as usize, th as usize))
            .unwrap_or((w, h));
        let planes = if self.planar { samples } else { 1 };
        let stride = if self.planar { 1 } else { samples };

        let mut chunks = Vec::new();
        for plane in 0..planes {
            for cy in 0..h.div_ceil(ch) {
                for cx in 0..w.div_ceil(cw) {
                    let mut words = Vec::new();
                    for r in 0..ch {
                        let mut row = Vec::with_capacity(cw * stride);
                        for c in 0..cw {
                            for k in 0..stride {
                                let (x, y) = (cx * cw + c, cy * ch + r);
                                let s = if self.planar { plane } else { k };
                                let inside = x < w && y < h;
                                row.push(if inside { values[(y * w + x) * samples + s] } else { 0 });
                            }
                        }
                        if self.predictor {
                            for i in (stride..row.len()).rev() {
                                row[i] = row[i].wrapping_sub(row[i - stride]) & mask;
                            }
                        }
                        words.extend(row);
                    }

                    let mut raw = Vec::with_capacity(words.len() * size);
                    for v in words {
                        if self.big_endian {
                            raw.extend_from_slice(&v.to_be_bytes()[8 - size..]);
                        } else {
                            raw.extend_from_slice(&v.to_le_bytes()[..size]);
                        }
                    }
                    chunks.push(if self.deflate {
                        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                        encoder.write_all(&raw).unwrap();
                        encoder.finish().unwrap()
                    } else {
                        raw
                    });
                }
            }
        }
        chunks
    }

    fn offsets_value(&self, offsets: Vec<u64>) -> Value {
        if self.big_tiff {
            Value::Long8(offsets)
        } else {
            Value::Long(offsets.into_iter().map(|o| o as u32).collect())
        }
    }

    /// Encodes the file around little-endian, pixel-interleaved sample bytes
    pub fn encode(&self, pixels: &[u8]) -> Vec<u8> {
        let chunks = self.chunks(pixels);
        let counts: Vec<u64> = chunks.iter().map(|c| c.len() as u64).collect();
        let samples = self.samples as usize;
        let (offsets_tag, counts_tag) = if self.tile.is_some() { (324, 325) } else { (273, 279) };

        let mut entries: Vec<(u16, Value)> = vec![
            (256, Value::Long(vec![self.width])),
            (257, Value::Long(vec![self.height])),
            (258, Value::Short(vec![self.bits; samples])),
            (259, Value::Short(vec![if self.deflate { 8 } else { 1 }])),
            (277, Value::Short(vec![self.samples])),
            (284, Value::Short(vec![if self.planar { 2 } else { 1 }])),
            (339, Value::Short(vec![self.sample_format; samples])),
            (33550, Value::Double(vec![self.scale.0, self.scale.1, 0.0])),
            (33922, Value::Double(vec![0.0, 0.0, 0.0, self.origin.0, self.origin.1, 0.0])),
            (offsets_tag, self.offsets_value(vec![0; chunks.len()])),
            (counts_tag, self.offsets_value(counts)),
        ];
        match self.tile {
            Some((tw, th)) => {
                entries.push((322, Value::Long(vec![tw])));
                entries.push((323, Value::Long(vec![th])));
            }
            None => entries.push((278, Value::Long(vec![self.height]))),
        }
        if self.predictor {
            entries.push((317, Value::Short(vec![2])));
        }
        if let Some(epsg) = self.epsg {
            entries.push((34735, Value::Short(vec![1, 1, 0, 1, 3072, 0, 1, epsg])));
        }
        if let Some(nodata) = self.nodata {
            let mut text = nodata.as_bytes().to_vec();
            text.push(0);
            entries.push((42113, Value::Ascii(text)));
        }
        entries.sort_by_key(|e| e.0);

        // the offsets array keeps its length, so the layout is stable
        let (_, extra) = self.layout(&entries);
        let data_start = self.extra_start(entries.len()) + extra.len();
        let mut position = data_start as u64;
        let offsets: Vec<u64> = chunks
            .iter()
            .map(|c| {
                let at = position;
                position += c.len() as u64;
                at
            })
            .collect();
        if let Some(entry) = entries.iter_mut().find(|e| e.0 == offsets_tag) {
            entry.1 = self.offsets_value(offsets);
        }
        let (fields, extra) = self.layout(&entries);

        let be = self.big_endian;
        let mut out = Vec::new();
        out.extend_from_slice(if be { b"MM" } else { b"II" });
        if self.big_tiff {
            out.extend_from_slice(&Value::Short(vec![43, 8, 0]).encode(be));
            out.extend_from_slice(&Value::Long8(vec![16]).encode(be));
            out.extend_from_slice(&Value::Long8(vec![entries.len() as u64]).encode(be));
        } else {
            out.extend_from_slice(&Value::Short(vec![42]).encode(be));
            out.extend_from_slice(&Value::Long(vec![8]).encode(be));
            out.extend_from_slice(&Value::Short(vec![entries.len() as u16]).encode(be));
        }
        for ((tag, value), field) in entries.iter().zip(&fields) {
            out.extend_from_slice(&Value::Short(vec![*tag, value.field_type()]).encode(be));
            if self.big_tiff {
                out.extend_from_slice(&Value::Long8(vec![value.count() as u64]).encode(be));
            } else {
                out.extend_from_slice(&Value::Long(vec![value.count() as u32]).encode(be));
            }
            out.extend_from_slice(field);
        }
        out.extend_from_slice(&vec![0; self.field_size()]);
        out.extend_from_slice(&extra);
        assert_eq!(out.len(), data_start);
        for chunk in &chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    fn field_size(&self) -> usize {
        if self.big_tiff {
            8
        } else {
            4
        }
    }

    fn extra_start(&self, entry_count: usize) -> usize {
        if self.big_tiff {
            16 + 8 + entry_count * 20 + 8
        } else {
            8 + 2 + entry_count * 12 + 4
        }
    }

    /// Value fields of every entry plus the out-of-line value area
    fn layout(&self, entries: &[(u16, Value)]) -> (Vec<Vec<u8>>, Vec<u8>) {
        let field_size = self.field_size();
        let extra_start = self.extra_start(entries.len());
        let mut fields = Vec::new();
        let mut extra = Vec::new();
        for (_, value) in entries {
            let bytes = value.encode(self.big_endian);
            if bytes.len() <= field_size {
                let mut inline = bytes;
                inline.resize(field_size, 0);
                fields.push(inline);
            } else {
                let offset = (extra_start + extra.len()) as u64;
                let field = if self.big_tiff {
                    Value::Long8(vec![offset]).encode(self.big_endian)
                } else {
                    Value::Long(vec![offset as u32]).encode(self.big_endian)
                };
                fields.push(field);
                extra.extend_from_slice(&bytes);
                if extra.len() % 2 == 1 {
                    extra.push(0);
                }
            }
        }
        (fields, extra)
    }

    pub fn write(&self, pixels: &[u8]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".tif").tempfile().unwrap();
        file.write_all(&self.encode(pixels)).unwrap();
        file.flush().unwrap();
        file
    }
}
