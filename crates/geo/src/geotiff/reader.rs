use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use num::NumCast;
use tiff::{
    decoder::{Decoder, DecodingResult, Limits},
    tags::Tag,
};

use crate::{ArrayNum, Error, GeoReference, GeoTransform, RasterSize, Result};

use super::{GEO_KEY_GEOGRAPHIC_TYPE, GEO_KEY_PROJECTED_CS_TYPE, gdal_nodata_tag};

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    if !path.is_file() {
        return Err(Error::InvalidPath(path.to_path_buf()));
    }

    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited()))
}

fn read_pixel_scale<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<(f64, f64)> {
    let values = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    if values.len() < 2 {
        return None;
    }

    Some((values[0], values[1]))
}

fn read_tie_points<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<[f64; 6]> {
    let values = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
    if values.len() < 6 {
        return None;
    }

    let mut tie_points = [0.0; 6];
    tie_points.copy_from_slice(&values[0..6]);
    Some(tie_points)
}

fn read_geo_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    if let Ok(transform) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if transform.len() >= 8 {
            return Ok(GeoTransform::new([
                transform[3],
                transform[0],
                transform[1],
                transform[7],
                transform[4],
                transform[5],
            ]));
        }
    }

    let (scale_x, scale_y) = read_pixel_scale(decoder).ok_or_else(|| Error::Runtime("ModelPixelScale tag not found".into()))?;
    if scale_x == 0.0 || scale_y == 0.0 {
        return Err(Error::Runtime("No cell sizes present in geotiff".into()));
    }

    let tie_points = read_tie_points(decoder).ok_or_else(|| Error::Runtime("ModelTiepoint tag not found".into()))?;

    Ok(GeoTransform::new([
        tie_points[3] - tie_points[0] * scale_x,
        scale_x,
        0.0,
        tie_points[4] + tie_points[1] * scale_y,
        0.0,
        -scale_y,
    ]))
}

fn read_nodata_value<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let nodata = decoder.get_tag_ascii_string(gdal_nodata_tag()).ok()?;
    let nodata = nodata.trim_matches(char::from(0)).trim();
    match nodata.to_ascii_lowercase().as_str() {
        "nan" | "-nan" => Some(f64::NAN),
        value => value.parse::<f64>().ok(),
    }
}

/// Extracts the EPSG code from the geo key directory, an empty projection is returned when absent
fn read_projection<R: Read + Seek>(decoder: &mut Decoder<R>) -> String {
    let Ok(keys) = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag) else {
        return String::new();
    };

    // header of 4 values followed by entries of (key, location, count, value)
    let mut projected = None;
    let mut geographic = None;
    for entry in keys.chunks_exact(4).skip(1) {
        if entry[1] != 0 {
            continue;
        }

        match entry[0] {
            GEO_KEY_PROJECTED_CS_TYPE => projected = Some(entry[3]),
            GEO_KEY_GEOGRAPHIC_TYPE => geographic = Some(entry[3]),
            _ => {}
        }
    }

    match projected.or(geographic) {
        Some(code) if code != 0 && code != u16::MAX => format!("EPSG:{code}"),
        _ => String::new(),
    }
}

fn read_metadata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoReference> {
    let (width, height) = decoder.dimensions()?;
    let size = RasterSize::with_rows_cols(height as usize, width as usize);
    let geo_transform = read_geo_transform(decoder)?;
    let nodata = read_nodata_value(decoder);
    let projection = read_projection(decoder);

    Ok(GeoReference::new(projection, size, geo_transform, nodata))
}

/// Reads the georeference of a GeoTIFF file without decoding the pixel data
pub fn read_georeference(path: &Path) -> Result<GeoReference> {
    let mut decoder = open_decoder(path)?;
    read_metadata(&mut decoder)
}

fn convert_pixels<S, T>(data: Vec<S>, file_nodata: Option<f64>) -> Vec<T>
where
    S: NumCast + Copy,
    T: ArrayNum,
{
    data.into_iter()
        .map(|v| {
            let Some(value) = v.to_f64() else {
                return T::NODATA;
            };

            let is_nodata = match file_nodata {
                Some(nod) if nod.is_nan() => value.is_nan(),
                Some(nod) => value == nod,
                None => false,
            };

            if is_nodata {
                T::NODATA
            } else {
                NumCast::from(value).unwrap_or(T::NODATA)
            }
        })
        .collect()
}

/// Reads the first band of a GeoTIFF file.
/// The pixels are converted to `T` and the nodata value of the file is mapped on the nodata value of `T`.
/// Values that cannot be represented by `T` become nodata.
pub fn read_raster_band<T: ArrayNum>(path: &Path) -> Result<(GeoReference, Vec<T>)> {
    let mut decoder = open_decoder(path)?;
    let meta = read_metadata(&mut decoder)?;
    let file_nodata = meta.nodata();

    let data = match decoder.read_image()? {
        DecodingResult::U8(data) => convert_pixels(data, file_nodata),
        DecodingResult::U16(data) => convert_pixels(data, file_nodata),
        DecodingResult::U32(data) => convert_pixels(data, file_nodata),
        DecodingResult::U64(data) => convert_pixels(data, file_nodata),
        DecodingResult::I8(data) => convert_pixels(data, file_nodata),
        DecodingResult::I16(data) => convert_pixels(data, file_nodata),
        DecodingResult::I32(data) => convert_pixels(data, file_nodata),
        DecodingResult::I64(data) => convert_pixels(data, file_nodata),
        DecodingResult::F32(data) => convert_pixels(data, file_nodata),
        DecodingResult::F64(data) => convert_pixels(data, file_nodata),
    };

    if data.len() != meta.raster_size().cell_count() {
        return Err(Error::Runtime(format!(
            "Only single band rasters are supported: {} values read for a {} raster ({})",
            data.len(),
            meta.raster_size(),
            path.display()
        )));
    }

    Ok((meta.copy_with_nodata(Some(T::NODATA)), data))
}
