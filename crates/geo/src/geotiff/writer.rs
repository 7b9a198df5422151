use std::{
    fs::File,
    io::{BufWriter, Seek, Write},
    path::Path,
};

use num::NumCast;
use tiff::{
    encoder::{
        TiffEncoder, TiffValue,
        colortype::{ColorType, Gray8, Gray16, Gray32, Gray32Float, Gray64, Gray64Float},
        compression::Lzw,
    },
    tags::Tag,
};

use crate::{ArrayDataType, ArrayNum, Error, GeoReference, Result};

use super::{
    GEO_KEY_GEOGRAPHIC_TYPE, GEO_KEY_MODEL_TYPE, GEO_KEY_PROJECTED_CS_TYPE, GEO_KEY_RASTER_TYPE, MODEL_TYPE_GEOGRAPHIC,
    MODEL_TYPE_PROJECTED, RASTER_PIXEL_IS_AREA, gdal_nodata_tag,
};

fn geo_key_directory(epsg: u16) -> Vec<u16> {
    // EPSG codes of geographic coordinate systems are in the 4000 range
    let (model_type, cs_key) = if (4000..5000).contains(&epsg) {
        (MODEL_TYPE_GEOGRAPHIC, GEO_KEY_GEOGRAPHIC_TYPE)
    } else {
        (MODEL_TYPE_PROJECTED, GEO_KEY_PROJECTED_CS_TYPE)
    };

    vec![
        1, 1, 0, 3, // version 1.1.0, 3 keys
        GEO_KEY_MODEL_TYPE, 0, 1, model_type,
        GEO_KEY_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA,
        cs_key, 0, 1, epsg,
    ]
}

fn to_pixel_type<T: ArrayNum, D: NumCast>(data: &[T]) -> Result<Vec<D>> {
    data.iter()
        .map(|&v| NumCast::from(v).ok_or_else(|| Error::Runtime(format!("Failed to convert pixel value {v:?}"))))
        .collect()
}

fn write_image<C, W>(encoder: &mut TiffEncoder<W>, meta: &GeoReference, nodata: &str, data: &[C::Inner]) -> Result
where
    C: ColorType,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let width = meta.columns() as u32;
    let height = meta.rows() as u32;
    let mut image = encoder.new_image_with_compression::<C, _>(width, height, Lzw)?;

    let transform = meta.geo_transform();
    let top_left = transform.top_left();
    let pixel_scale = [transform.cell_size_x(), transform.cell_size_y().abs(), 0.0];
    let tie_points = [0.0, 0.0, 0.0, top_left.x(), top_left.y(), 0.0];

    let dir = image.encoder();
    dir.write_tag(Tag::ModelPixelScaleTag, &pixel_scale[..])?;
    dir.write_tag(Tag::ModelTiepointTag, &tie_points[..])?;
    if let Some(epsg) = meta.epsg().and_then(|code| u16::try_from(code).ok()) {
        dir.write_tag(Tag::GeoKeyDirectoryTag, &geo_key_directory(epsg)[..])?;
    } else if !meta.projection().is_empty() {
        log::warn!("Projection '{}' can not be stored in the GeoTIFF key directory", meta.projection());
    }
    dir.write_tag(gdal_nodata_tag(), nodata)?;

    image.write_data(data)?;
    Ok(())
}

/// Writes a single band GeoTIFF with LZW compression.
/// The nodata value of the pixel type is stored in the GDAL nodata tag.
pub fn write_raster_band<T: ArrayNum>(path: &Path, meta: &GeoReference, data: &[T]) -> Result {
    if data.len() != meta.raster_size().cell_count() {
        return Err(Error::InvalidArgument(format!(
            "Data length ({}) does not match the raster size ({})",
            data.len(),
            meta.raster_size()
        )));
    }

    if !meta.geo_transform().is_north_up() {
        return Err(Error::InvalidArgument("Only north up rasters can be written as GeoTIFF".into()));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let nodata = if T::has_nan() { "nan".to_string() } else { T::NODATA.to_string() };
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;

    match T::TYPE {
        ArrayDataType::Uint8 => write_image::<Gray8, _>(&mut encoder, meta, &nodata, &to_pixel_type::<T, u8>(data)?),
        ArrayDataType::Uint16 => write_image::<Gray16, _>(&mut encoder, meta, &nodata, &to_pixel_type::<T, u16>(data)?),
        ArrayDataType::Uint32 => write_image::<Gray32, _>(&mut encoder, meta, &nodata, &to_pixel_type::<T, u32>(data)?),
        ArrayDataType::Uint64 => write_image::<Gray64, _>(&mut encoder, meta, &nodata, &to_pixel_type::<T, u64>(data)?),
        ArrayDataType::Float32 => write_image::<Gray32Float, _>(&mut encoder, meta, &nodata, &to_pixel_type::<T, f32>(data)?),
        ArrayDataType::Float64 => write_image::<Gray64Float, _>(&mut encoder, meta, &nodata, &to_pixel_type::<T, f64>(data)?),
        data_type => Err(Error::Runtime(format!("Writing {data_type} rasters as GeoTIFF is not supported"))),
    }
}
