use std::env;
use std::fs;
use std::process;

use georaster::formats::tiff::TiffReader;
use georaster::{
    Band, Error, GeoTiffSource, RasterSource, Raster, RasterConfig, Result, DEFAULT_GEOTRANSFORM,
};

const USAGE: &str = "usage: georaster-info [--format hex|wkb|storage|tiff] <file>";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Format {
    HexWkb,
    Wkb,
    Storage,
    Tiff,
}

impl Format {
    fn from_arg(arg: &str) -> Result<Self> {
        match arg {
            "hex" => Ok(Format::HexWkb),
            "wkb" => Ok(Format::Wkb),
            "storage" => Ok(Format::Storage),
            "tiff" => Ok(Format::Tiff),
            other => Err(Error::InvalidArgument(format!("Unknown format '{}'", other))),
        }
    }

    /// Guesses the encoding from the leading bytes
    fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") || bytes.starts_with(b"II+\0") {
            Format::Tiff
        } else if !bytes.is_empty() && bytes.iter().all(|b| b.is_ascii_hexdigit() || b.is_ascii_whitespace()) {
            Format::HexWkb
        } else if matches!(bytes.first(), Some(0) | Some(1)) && bytes.get(1..3) == Some(&[0, 0]) {
            Format::Wkb
        } else {
            Format::Storage
        }
    }
}

/// Hex digits of a text file with every line break and space removed
fn hex_text(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|&b| char::from(b))
        .collect()
}

/// Builds a raster whose bands reference the samples of a GeoTIFF
fn open_tiff(path: &str) -> Result<Raster<'static>> {
    let reader = TiffReader::open_with_config(path, &RasterConfig::default())?;
    let source = GeoTiffSource::new(reader)?;

    let mut raster = Raster::new(source.width(), source.height())?;
    raster.set_geotransform(source.geotransform().unwrap_or(DEFAULT_GEOTRANSFORM));
    if let Some(epsg) = source.epsg_code() {
        raster.set_srid(i32::from(epsg));
    }

    let count = u8::try_from(source.band_count())
        .map_err(|_| Error::Unsupported(format!("{} bands in {}", source.band_count(), path)))?;
    for index in 0..count {
        let band = Band::new_offline(
            raster.width(),
            raster.height(),
            source.pixel_type(),
            source.nodata(),
            index,
            path,
        );
        raster.add_band(band, index as usize)?;
    }
    Ok(raster)
}

fn run(args: &[String]) -> Result<()> {
    let (format, path) = match args {
        [path] => (None, path),
        [flag, format, path] if flag == "--format" => (Some(Format::from_arg(format)?), path),
        _ => {
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    let bytes = fs::read(path)?;
    let format = format.unwrap_or_else(|| Format::sniff(&bytes));

    let summary = match format {
        Format::HexWkb => Raster::from_hex_wkb(&hex_text(&bytes))?.summary(),
        Format::Wkb => Raster::from_wkb(&bytes)?.summary(),
        Format::Storage => Raster::deserialize(&bytes, false)?.summary(),
        Format::Tiff => open_tiff(path)?.summary(),
    };

    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| Error::InvalidArgument(format!("Cannot render summary: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        eprintln!("georaster-info: {}", e);
        process::exit(1);
    }
}
