use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::Path;

use ndarray::Array2;
use num_traits::ToPrimitive;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::debug;

use crate::engine::DisplacementField;
use crate::error::{CorrelationError, Result};
use crate::raster::{GeoTransform, RasterBand};

/// GeoKey directory declaring a pixel-is-area raster (GTRasterTypeGeoKey = 1).
const GEO_KEY_DIRECTORY: [u16; 8] = [1, 1, 0, 1, 1025, 0, 1, 1];

/// Summary of a raster file.
#[derive(Clone, Debug)]
pub struct RasterInfo {
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub geotransform: GeoTransform,
    pub nodata: Option<f64>,
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
}

fn open_tiff(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let decoder = Decoder::new(BufReader::new(File::open(path)?))?.with_limits(Limits::unlimited());
    Ok(decoder)
}

/// Read dimensions, band count and georeferencing without decoding pixels.
pub fn raster_info(path: &Path) -> Result<RasterInfo> {
    if !is_tiff(path) {
        let img = image::open(path)?;
        return Ok(RasterInfo {
            width: img.width() as usize,
            height: img.height() as usize,
            bands: img.color().channel_count() as usize,
            geotransform: GeoTransform::identity(),
            nodata: None,
        });
    }

    let mut decoder = open_tiff(path)?;
    let (w, h) = decoder.dimensions()?;
    let geotransform = read_geotransform(&mut decoder)?;
    let nodata = read_nodata(&mut decoder)?;

    let mut bands = 0;
    loop {
        bands += samples_per_pixel(&mut decoder)?;
        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    Ok(RasterInfo {
        width: w as usize,
        height: h as usize,
        bands,
        geotransform,
        nodata,
    })
}

/// Total number of bands in a raster file.
pub fn band_count(path: &Path) -> Result<usize> {
    Ok(raster_info(path)?.bands)
}

/// Load one band (1-based `band_index`) as `f64` samples.
///
/// For TIFF files every page contributes its samples-per-pixel channels as
/// consecutive bands. Other formats expose their color channels as bands.
pub fn load_band(path: &Path, band_index: usize) -> Result<RasterBand> {
    let count = band_count(path)?;
    if band_index == 0 || band_index > count {
        return Err(CorrelationError::BandIndexOutOfRange {
            path: path.to_path_buf(),
            index: band_index,
            count,
        });
    }

    let band = if is_tiff(path) {
        load_tiff_band(path, band_index - 1)?
    } else {
        load_image_band(path, band_index - 1)?
    };
    debug!(
        path = %path.display(),
        band = band_index,
        width = band.width(),
        height = band.height(),
        "Band loaded"
    );
    Ok(band)
}

fn load_tiff_band(path: &Path, channel: usize) -> Result<RasterBand> {
    let mut decoder = open_tiff(path)?;
    let geotransform = read_geotransform(&mut decoder)?;
    let nodata = read_nodata(&mut decoder)?;

    let mut first = 0;
    loop {
        let spp = samples_per_pixel(&mut decoder)?;
        if channel < first + spp {
            let (w, h) = decoder.dimensions()?;
            let planar = decoder
                .find_tag(Tag::PlanarConfiguration)?
                .map(|v| v.into_u32())
                .transpose()?
                == Some(2);
            let (w, h) = (w as usize, h as usize);
            let local = channel - first;
            // The decoder only returns the first plane of a band-interleaved page.
            if planar && local > 0 {
                return Err(CorrelationError::UnsupportedRaster(format!(
                    "{}: band {} is stored in a separate plane of a band-interleaved TIFF",
                    path.display(),
                    channel + 1
                )));
            }

            let samples = samples_to_f64(decoder.read_image()?)?;
            let stride = if planar { 1 } else { spp };
            let data = extract_channel(&samples, w, h, stride, local)?;
            return Ok(RasterBand::with_nodata(data, nodata, geotransform));
        }
        first += spp;
        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    Err(CorrelationError::UnsupportedRaster(format!(
        "{}: channel {} not found",
        path.display(),
        channel + 1
    )))
}

/// Channel `offset` of an interleaved sample buffer with `stride` samples per
/// pixel. Short buffers are an error, never an out-of-bounds read.
fn extract_channel(
    samples: &[f64],
    width: usize,
    height: usize,
    stride: usize,
    offset: usize,
) -> Result<Array2<f64>> {
    let needed = width * height * stride;
    if offset >= stride || samples.len() < needed {
        return Err(CorrelationError::UnsupportedRaster(format!(
            "decoded {} samples for a {}x{} page with {} samples per pixel",
            samples.len(),
            width,
            height,
            stride
        )));
    }
    Ok(Array2::from_shape_fn((height, width), |(row, col)| {
        samples[(row * width + col) * stride + offset]
    }))
}

fn load_image_band(path: &Path, channel: usize) -> Result<RasterBand> {
    let img = image::open(path)?;
    let (w, h) = (img.width() as usize, img.height() as usize);
    let (samples, stride) = match img.color().channel_count() {
        1 | 2 => (img.to_luma_alpha32f().into_raw(), 2),
        _ => (img.to_rgba32f().into_raw(), 4),
    };

    let data = Array2::from_shape_fn((h, w), |(row, col)| {
        samples[(row * w + col) * stride + channel] as f64
    });
    Ok(RasterBand::new(data))
}

fn samples_per_pixel<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<usize> {
    let spp = decoder
        .find_tag(Tag::SamplesPerPixel)?
        .map(|v| v.into_u32())
        .transpose()?
        .unwrap_or(1);
    Ok(spp.max(1) as usize)
}

fn samples_to_f64(result: DecodingResult) -> Result<Vec<f64>> {
    fn convert<T: ToPrimitive>(buf: Vec<T>) -> Vec<f64> {
        buf.iter().map(|v| v.to_f64().unwrap_or(f64::NAN)).collect()
    }

    Ok(match result {
        DecodingResult::U8(buf) => convert(buf),
        DecodingResult::U16(buf) => convert(buf),
        DecodingResult::U32(buf) => convert(buf),
        DecodingResult::U64(buf) => convert(buf),
        DecodingResult::I8(buf) => convert(buf),
        DecodingResult::I16(buf) => convert(buf),
        DecodingResult::I32(buf) => convert(buf),
        DecodingResult::I64(buf) => convert(buf),
        DecodingResult::F32(buf) => convert(buf),
        DecodingResult::F64(buf) => buf,
        #[allow(unreachable_patterns)]
        _ => {
            return Err(CorrelationError::UnsupportedRaster(
                "unsupported TIFF sample format".into(),
            ))
        }
    })
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    if let Some(matrix) = decoder.find_tag(Tag::ModelTransformationTag)? {
        let m = matrix.into_f64_vec()?;
        if m.len() >= 8 {
            return Ok(GeoTransform([m[3], m[0], m[1], m[7], m[4], m[5]]));
        }
    }

    let scale = decoder.find_tag(Tag::ModelPixelScaleTag)?;
    let tiepoint = decoder.find_tag(Tag::ModelTiepointTag)?;
    if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        let s = scale.into_f64_vec()?;
        let t = tiepoint.into_f64_vec()?;
        if s.len() >= 2 && t.len() >= 6 {
            // Raster point (t0, t1) maps to ground (t3, t4).
            let x0 = t[3] - t[0] * s[0];
            let y0 = t[4] + t[1] * s[1];
            return Ok(GeoTransform([x0, s[0], 0.0, y0, 0.0, -s[1]]));
        }
    }

    Ok(GeoTransform::identity())
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>> {
    let Some(value) = decoder.find_tag(Tag::GdalNodata)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    Ok(text.trim_matches(char::from(0)).trim().parse::<f64>().ok())
}

fn write_geotags<W, K>(dir: &mut DirectoryEncoder<'_, W, K>, gt: &GeoTransform) -> Result<()>
where
    W: std::io::Write + Seek,
    K: TiffKind,
{
    let c = &gt.0;
    if c[2] == 0.0 && c[4] == 0.0 {
        dir.write_tag(Tag::ModelPixelScaleTag, &[c[1], -c[5], 0.0][..])?;
        dir.write_tag(Tag::ModelTiepointTag, &[0.0, 0.0, 0.0, c[0], c[3], 0.0][..])?;
    } else {
        let matrix = [
            c[1], c[2], 0.0, c[0], //
            c[4], c[5], 0.0, c[3], //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        dir.write_tag(Tag::ModelTransformationTag, &matrix[..])?;
    }
    dir.write_tag(Tag::GeoKeyDirectoryTag, &GEO_KEY_DIRECTORY[..])?;
    Ok(())
}

/// Write named `f64` layers as a multi-page 32-bit float GeoTIFF, one page
/// per band. Every page carries its name, the geotransform and a NaN nodata tag.
pub fn write_bands(
    path: &Path,
    bands: &[(&str, &Array2<f64>)],
    geotransform: &GeoTransform,
) -> Result<()> {
    let Some((_, first)) = bands.first() else {
        return Err(CorrelationError::config("at least one band is required to write a raster"));
    };
    let (h, w) = first.dim();
    if let Some((name, band)) = bands.iter().find(|(_, b)| b.dim() != (h, w)) {
        return Err(CorrelationError::config(format!(
            "band '{}' has shape {:?}, expected {:?}",
            name,
            band.dim(),
            (h, w)
        )));
    }

    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    for (name, band) in bands {
        let mut image = encoder.new_image::<colortype::Gray32Float>(w as u32, h as u32)?;
        image.encoder().write_tag(Tag::ImageDescription, *name)?;
        image.encoder().write_tag(Tag::GdalNodata, "nan")?;
        write_geotags(image.encoder(), geotransform)?;

        let pixels: Vec<f32> = band.iter().map(|&v| v as f32).collect();
        image.write_data(&pixels)?;
    }

    debug!(path = %path.display(), bands = bands.len(), width = w, height = h, "Raster written");
    Ok(())
}

/// Write the `dx`, `dy` and `score` layers of a displacement field.
pub fn write_displacement_field(path: &Path, field: &DisplacementField) -> Result<()> {
    write_bands(path, &field.layers(), &field.geotransform)
}
