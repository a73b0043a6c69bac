//! Sample extraction from decoded chunks

use super::{ChunkLayout, TiffReader};
use crate::error::{Error, Result};

impl TiffReader {
    /// Reads one image row of a single sample as `f64` values
    pub fn read_row(&self, layout: &ChunkLayout, sample: usize, row: usize) -> Result<Vec<f64>> {
        if sample >= layout.samples {
            return Err(Error::out_of_range(format!(
                "Sample {} requested from an image with {} samples",
                sample, layout.samples
            )));
        }
        if row >= layout.height {
            return Err(Error::out_of_range(format!(
                "Row {} outside image height {}",
                row, layout.height
            )));
        }

        let size = layout.sample.size();
        let stride = layout.chunk_stride();
        let component = if layout.planar { 0 } else { sample };
        let chunk_row = row % layout.chunk_height;

        let mut values = Vec::with_capacity(layout.width);
        for chunk_col in 0..layout.chunks_across {
            let first_col = chunk_col * layout.chunk_width;
            let chunk = self.read_chunk(layout, layout.chunk_index(sample, first_col, row))?;
            let cols = layout.chunk_width.min(layout.width - first_col);
            for cx in 0..cols {
                let offset = ((chunk_row * layout.chunk_width + cx) * stride + component) * size;
                values.push(layout.sample.decode(&chunk[offset..offset + size]));
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::strip_tiff;
    use super::*;

    fn layout(reader: &TiffReader) -> ChunkLayout {
        ChunkLayout::from_ifd(reader.main_ifd().unwrap()).unwrap()
    }

    #[test]
    fn test_read_row_u8() {
        let reader = TiffReader::from_bytes(strip_tiff(3, 2, 8, 1, 1, &[1, 2, 3, 4, 5, 6])).unwrap();
        let layout = layout(&reader);
        assert_eq!(reader.read_row(&layout, 0, 0).unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(reader.read_row(&layout, 0, 1).unwrap(), vec![4.0, 5.0, 6.0]);
        assert!(matches!(reader.read_row(&layout, 0, 2), Err(Error::OutOfRange(_))));
        assert!(matches!(reader.read_row(&layout, 1, 0), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn test_read_row_interleaved_samples() {
        let pixels: Vec<u8> = [10i16, -1, 20, -2].iter().flat_map(|v| v.to_le_bytes()).collect();
        let reader = TiffReader::from_bytes(strip_tiff(2, 1, 16, 2, 2, &pixels)).unwrap();
        let layout = layout(&reader);
        assert_eq!(layout.samples, 2);
        assert_eq!(reader.read_row(&layout, 0, 0).unwrap(), vec![10.0, 20.0]);
        assert_eq!(reader.read_row(&layout, 1, 0).unwrap(), vec![-1.0, -2.0]);
    }

    #[test]
    fn test_read_row_float() {
        let pixels: Vec<u8> = [1.5f32, -0.25].iter().flat_map(|v| v.to_le_bytes()).collect();
        let reader = TiffReader::from_bytes(strip_tiff(2, 1, 32, 3, 1, &pixels)).unwrap();
        let layout = layout(&reader);
        assert_eq!(reader.read_row(&layout, 0, 0).unwrap(), vec![1.5, -0.25]);
        assert_eq!(reader.cache().len(), 1);
    }
}
