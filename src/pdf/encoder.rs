//! Raster encoders for rendered slices.
//!
//! Every encoder embeds the render resolution so viewers show the slice at
//! its physical size.

use std::io::{Seek, Write};

use image::RgbImage;
use jpeg_encoder::{ColorType as JpegColorType, Density};
use png::{BitDepth, ColorType, PixelDimensions, Unit};
use tiff::encoder::compression::{Compression, Deflate, Lzw, Packbits, Uncompressed};
use tiff::encoder::{colortype, Rational, TiffEncoder};
use tiff::tags::ResolutionUnit;

use crate::error::{codes, Error, Result};
use crate::options::Encoder;

const METERS_PER_INCH: f64 = 0.0254;

/// Encode `image` with `encoder` into `out`, tagging it with `ppi`.
pub fn encode<W: Write + Seek>(image: &RgbImage, encoder: &Encoder, ppi: f64, out: W) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::encode(codes::ZERO_IMAGE, "image has no pixels"));
    }
    log::debug!(
        "encoding {}x{} image as {} at {} ppi",
        image.width(),
        image.height(),
        encoder.kind().as_str(),
        ppi
    );
    match encoder {
        Encoder::Png => write_png(image, ppi, out),
        Encoder::Jpeg {
            quality,
            progressive,
        } => write_jpeg(image, *quality, *progressive, ppi, out),
        Encoder::Tiff { compression } => write_tiff(image, compression.as_deref(), ppi, out),
    }
}

fn write_png<W: Write>(image: &RgbImage, ppi: f64, out: W) -> Result<()> {
    let mut encoder = png::Encoder::new(out, image.width(), image.height());
    encoder.set_color(ColorType::Rgb);
    encoder.set_depth(BitDepth::Eight);
    let ppm = (ppi / METERS_PER_INCH).round() as u32;
    encoder.set_pixel_dims(Some(PixelDimensions {
        xppu: ppm,
        yppu: ppm,
        unit: Unit::Meter,
    }));

    let mut writer = encoder.write_header().map_err(png_error)?;
    writer.write_image_data(image.as_raw()).map_err(png_error)?;
    writer.finish().map_err(png_error)
}

fn png_error(err: png::EncodingError) -> Error {
    match err {
        png::EncodingError::IoError(e) => Error::encode(codes::OPEN_FILE, e.to_string()),
        png::EncodingError::Parameter(e) => Error::encode(codes::BAD_ARG, e.to_string()),
        other => Error::encode(codes::GENERIC, other.to_string()),
    }
}

fn write_jpeg<W: Write>(image: &RgbImage, quality: u8, progressive: bool, ppi: f64, out: W) -> Result<()> {
    let (Ok(width), Ok(height)) = (u16::try_from(image.width()), u16::try_from(image.height())) else {
        return Err(Error::encode(
            codes::BAD_ARG,
            format!(
                "JPEG dimensions are limited to 65535, got {}x{}",
                image.width(),
                image.height()
            ),
        ));
    };

    // quality 0 is accepted as input, the encoder's floor is 1
    let mut encoder = jpeg_encoder::Encoder::new(out, quality.clamp(1, 100));
    encoder.set_progressive(progressive);
    let density = ppi.round().clamp(1.0, f64::from(u16::MAX)) as u16;
    encoder.set_density(Density::Inch {
        x: density,
        y: density,
    });

    encoder
        .encode(image.as_raw(), width, height, JpegColorType::Rgb)
        .map_err(|e| match e {
            jpeg_encoder::EncodingError::IoError(e) => Error::encode(codes::OPEN_FILE, e.to_string()),
            other => Error::encode(codes::GENERIC, other.to_string()),
        })
}

fn write_tiff<W: Write + Seek>(image: &RgbImage, compression: Option<&str>, ppi: f64, out: W) -> Result<()> {
    match compression.unwrap_or("none") {
        "none" => tiff_with(image, Uncompressed, ppi, out),
        "lzw" => tiff_with(image, Lzw, ppi, out),
        "deflate" | "zip" | "adobe_deflate" => tiff_with(image, Deflate::default(), ppi, out),
        "packbits" => tiff_with(image, Packbits, ppi, out),
        other => Err(Error::encode(
            codes::BAD_ARG,
            format!("unsupported TIFF compression {other:?}"),
        )),
    }
}

fn tiff_with<W: Write + Seek, D: Compression>(image: &RgbImage, compression: D, ppi: f64, out: W) -> Result<()> {
    let mut encoder = TiffEncoder::new(out).map_err(tiff_error)?;
    let mut frame = encoder
        .new_image_with_compression::<colortype::RGB8, D>(image.width(), image.height(), compression)
        .map_err(tiff_error)?;
    frame.resolution(
        ResolutionUnit::Inch,
        Rational {
            n: ppi.round().max(1.0) as u32,
            d: 1,
        },
    );
    frame.write_data(image.as_raw()).map_err(tiff_error)
}

fn tiff_error(err: tiff::TiffError) -> Error {
    match err {
        tiff::TiffError::IoError(e) => Error::encode(codes::OPEN_FILE, e.to_string()),
        other => Error::encode(codes::GENERIC, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tiff::tags::Tag;

    fn checker(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        })
    }

    fn encode_to_vec(image: &RgbImage, encoder: &Encoder, ppi: f64) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        encode(image, encoder, ppi, &mut out)?;
        Ok(out.into_inner())
    }

    #[test]
    fn png_carries_size_and_resolution() {
        let bytes = encode_to_vec(&checker(7, 5), &Encoder::Png, 150.0).unwrap();
        let decoder = png::Decoder::new(Cursor::new(bytes));
        let reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!((info.width, info.height), (7, 5));
        let dims = info.pixel_dims.unwrap();
        assert_eq!(dims.unit, Unit::Meter);
        assert_eq!(dims.xppu, 5906);
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let encoder = Encoder::Jpeg {
            quality: 0,
            progressive: true,
        };
        let bytes = encode_to_vec(&checker(16, 16), &encoder, 72.0).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn jpeg_jfif_header_carries_density() {
        let encoder = Encoder::Jpeg {
            quality: 80,
            progressive: false,
        };
        let bytes = encode_to_vec(&checker(8, 8), &encoder, 150.0).unwrap();
        // SOI, APP0 marker and length, then the JFIF identifier and version
        assert_eq!(&bytes[2..4], &[0xFF, 0xE0]);
        assert_eq!(&bytes[6..11], b"JFIF\0");
        // units: dots per inch
        assert_eq!(bytes[13], 1);
        assert_eq!(u16::from_be_bytes([bytes[14], bytes[15]]), 150);
        assert_eq!(u16::from_be_bytes([bytes[16], bytes[17]]), 150);
    }

    #[test]
    fn jpeg_rejects_oversized_dimensions() {
        let image = RgbImage::new(70_000, 1);
        let encoder = Encoder::with_defaults(crate::options::EncoderKind::Jpeg);
        let err = encode_to_vec(&image, &encoder, 72.0).unwrap_err();
        assert!(matches!(err, Error::Encode { code: codes::BAD_ARG, .. }));
    }

    #[test]
    fn tiff_compression_schemes() {
        let image = checker(9, 4);
        for name in [None, Some("none"), Some("lzw"), Some("deflate"), Some("packbits")] {
            let encoder = Encoder::Tiff {
                compression: name.map(str::to_string),
            };
            let bytes = encode_to_vec(&image, &encoder, 300.0).unwrap();
            let mut decoder = tiff::decoder::Decoder::new(Cursor::new(bytes)).unwrap();
            assert_eq!(decoder.dimensions().unwrap(), (9, 4), "compression {name:?}");
        }
    }

    #[test]
    fn tiff_carries_resolution_in_inches() {
        let encoder = Encoder::Tiff { compression: None };
        let bytes = encode_to_vec(&checker(3, 3), &encoder, 300.0).unwrap();
        let mut decoder = tiff::decoder::Decoder::new(Cursor::new(bytes)).unwrap();
        assert_eq!(decoder.get_tag_u32_vec(Tag::XResolution).unwrap(), vec![300, 1]);
        assert_eq!(decoder.get_tag_u32_vec(Tag::YResolution).unwrap(), vec![300, 1]);
        assert_eq!(
            decoder.get_tag_unsigned::<u16>(Tag::ResolutionUnit).unwrap(),
            ResolutionUnit::Inch.to_u16()
        );
    }

    #[test]
    fn tiff_unknown_compression_is_bad_arg() {
        let encoder = Encoder::Tiff {
            compression: Some("jbig".into()),
        };
        let err = encode_to_vec(&checker(2, 2), &encoder, 72.0).unwrap_err();
        assert!(matches!(err, Error::Encode { code: codes::BAD_ARG, .. }));
    }

    #[test]
    fn empty_image_is_rejected() {
        let err = encode_to_vec(&RgbImage::new(0, 10), &Encoder::Png, 72.0).unwrap_err();
        assert!(matches!(err, Error::Encode { code: codes::ZERO_IMAGE, .. }));
    }
}
