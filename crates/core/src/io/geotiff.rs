//! Native GeoTIFF reading/writing
//!
//! Georeferencing is taken from ModelPixelScale + ModelTiepoint, the CRS from
//! the projected/geographic type keys of the GeoKey directory, and the no-data
//! marker from the GDAL_NODATA ASCII tag. Multi-sample images must use chunky
//! (pixel-interleaved) layout.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterBands, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Read one band of a GeoTIFF file into a Raster.
///
/// `band` is 1-based and defaults to the first band.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let bands = read_geotiff_bands(path)?;
    let band = bands.band(band.unwrap_or(1))?;
    convert_band(band)
}

/// Read every band of a GeoTIFF file
pub fn read_geotiff_bands<P: AsRef<Path>>(path: P) -> Result<RasterBands> {
    let file = File::open(path.as_ref())?;
    debug!("Reading {}", path.as_ref().display());
    decode_geotiff(BufReader::new(file))
}

/// Read all bands of a GeoTIFF held in memory
pub fn read_geotiff_from_buffer(data: &[u8]) -> Result<RasterBands> {
    decode_geotiff(Cursor::new(data))
}

fn convert_band<T: RasterElement>(band: &Raster<f64>) -> Result<Raster<T>> {
    let nodata_out = T::default_nodata();
    let data = band.data().mapv(|v| {
        if band.is_nodata(v) {
            nodata_out
        } else {
            T::from_f64(v).unwrap_or(nodata_out)
        }
    });
    let mut raster = band.with_same_meta(data)?;
    raster.set_nodata(Some(nodata_out));
    Ok(raster)
}

macro_rules! samples_to_f64 {
    ($result:expr, $($variant:ident),*) => {
        match $result {
            $(DecodingResult::$variant(buf) => buf.into_iter().map(|v| v as f64).collect::<Vec<f64>>(),)*
            _ => {
                return Err(Error::UnsupportedDataType(
                    "unsupported TIFF sample format".to_string(),
                ))
            }
        }
    };
}

fn decode_geotiff<R: Read + Seek>(reader: R) -> Result<RasterBands> {
    let mut decoder = Decoder::new(reader)?;

    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;
    let samples = decoder
        .get_tag_u32(Tag::SamplesPerPixel)
        .map(|s| s.max(1) as usize)
        .unwrap_or(1);

    let transform = read_geotransform(&mut decoder);
    let crs = read_crs(&mut decoder);
    let nodata = decoder
        .get_tag_ascii_string(tag(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

    let data = samples_to_f64!(decoder.read_image()?, U8, U16, U32, I8, I16, I32, F32, F64);

    if data.len() != rows * cols * samples {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let bands = (0..samples)
        .map(|b| {
            let values: Vec<f64> = data.iter().skip(b).step_by(samples).copied().collect();
            let mut raster = Raster::from_vec(values, rows, cols)?;
            if let Some(t) = transform {
                raster.set_transform(t);
            }
            raster.set_crs(crs);
            raster.set_nodata(nodata);
            Ok(raster)
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Decoded {} band(s) of {} x {}", samples, cols, rows);
    RasterBands::new(bands)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(tag(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(tag(MODEL_TIEPOINT)).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(tag(GEO_KEY_DIRECTORY)).ok()?;
    let entries = keys.get(4..)?;

    let lookup = |wanted: u16| {
        entries
            .chunks_exact(4)
            .find(|e| e[0] == wanted && e[1] == 0)
            .map(|e| e[3])
            .filter(|&code| code != 0 && code != 32767)
    };

    lookup(PROJECTED_CS_TYPE_KEY)
        .or_else(|| lookup(GEOGRAPHIC_TYPE_KEY))
        .map(|code| CRS::from_epsg(code as u32))
}

/// Write a Raster to a single-band 32-bit float GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let mut file = BufWriter::new(File::create(path.as_ref())?);
    encode_geotiff(raster, &mut file)?;
    file.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T: RasterElement>(raster: &Raster<T>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| v.to_f64().map_or(f32::NAN, |f| f as f32))
        .collect();

    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image.encoder().write_tag(tag(MODEL_PIXEL_SCALE), &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image.encoder().write_tag(tag(MODEL_TIEPOINT), &tiepoint[..])?;

    // Header (version 1.1.0, key count) then 4-short entries:
    // key, location (0 = value inline), count, value
    let mut entries: Vec<[u16; 4]> = Vec::with_capacity(3);
    match raster.crs() {
        Some(crs) if crs.epsg() <= u16::MAX as u32 => {
            let (model_type, key) = if crs.is_geographic() {
                (2, GEOGRAPHIC_TYPE_KEY)
            } else {
                (1, PROJECTED_CS_TYPE_KEY)
            };
            entries.push([GT_MODEL_TYPE_KEY, 0, 1, model_type]);
            entries.push([GT_RASTER_TYPE_KEY, 0, 1, 1]);
            entries.push([key, 0, 1, crs.epsg() as u16]);
        }
        _ => {
            entries.push([GT_MODEL_TYPE_KEY, 0, 1, 1]);
            entries.push([GT_RASTER_TYPE_KEY, 0, 1, 1]);
        }
    }
    let mut geokeys: Vec<u16> = vec![1, 1, 0, entries.len() as u16];
    geokeys.extend(entries.iter().flatten());
    image.encoder().write_tag(tag(GEO_KEY_DIRECTORY), &geokeys[..])?;

    if let Some(nd) = raster.nodata().and_then(|v| v.to_f64()) {
        let text = if nd.is_nan() { "nan".to_string() } else { nd.to_string() };
        image.encoder().write_tag(tag(GDAL_NODATA), text.as_str())?;
    }

    image.write_data(&data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Raster<f64> {
        let mut r = Raster::from_vec(vec![0.1, 0.2, -9999.0, 0.4, 0.5, 0.6], 2, 3).unwrap();
        r.set_transform(GeoTransform::new(300_000.0, 9_870_000.0, 30.0, -30.0));
        r.set_crs(Some(CRS::from_epsg(31983)));
        r.set_nodata(Some(-9999.0));
        r
    }

    #[test]
    fn test_buffer_roundtrip_keeps_metadata() {
        let buf = write_geotiff_to_buffer(&sample()).unwrap();
        let bands = read_geotiff_from_buffer(&buf).unwrap();
        assert_eq!(bands.count(), 1);

        let band = bands.band(1).unwrap();
        assert_eq!(band.shape(), (2, 3));
        assert_eq!(band.transform(), sample().transform());
        assert_eq!(band.crs(), Some(CRS::from_epsg(31983)));
        assert_eq!(band.nodata(), Some(-9999.0));
        assert!(band.is_nodata(band.get(0, 2).unwrap()));
        assert_relative_eq!(band.get(1, 1).unwrap(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_file_roundtrip_as_class_raster() {
        let mut classes: Raster<i32> = Raster::from_vec(vec![1, 2, -9999, 5], 2, 2).unwrap();
        classes.set_nodata(Some(-9999));

        let tmp = tempfile::NamedTempFile::new().unwrap();
        write_geotiff(&classes, tmp.path()).unwrap();

        let back: Raster<i32> = read_geotiff(tmp.path(), None).unwrap();
        assert_eq!(back.get(0, 1).unwrap(), 2);
        assert_eq!(back.get(1, 0).unwrap(), -9999);
        assert!(back.is_nodata(back.get(1, 0).unwrap()));
    }

    #[test]
    fn test_missing_band() {
        let buf = write_geotiff_to_buffer(&sample()).unwrap();
        let bands = read_geotiff_from_buffer(&buf).unwrap();
        assert!(matches!(bands.band(3), Err(Error::BandOutOfRange { band: 3, count: 1 })));
    }
}
