//! Validation of user supplied render arguments.
//!
//! Arguments arrive as loosely typed values from the embedding runtime and
//! are turned into a [`RenderRequest`] before anything touches the page.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::geometry::Slice;

/// Output encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    Png,
    Jpeg,
    Tiff,
}

impl EncoderKind {
    /// Match the leading characters of `token` against the encoder names.
    pub fn from_token(token: &str) -> Result<Self> {
        if token.starts_with("png") {
            Ok(EncoderKind::Png)
        } else if token.starts_with("jpeg") {
            Ok(EncoderKind::Jpeg)
        } else if token.starts_with("tiff") {
            Ok(EncoderKind::Tiff)
        } else {
            Err(Error::validation("Unknown image compression method"))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EncoderKind::Png => "png",
            EncoderKind::Jpeg => "jpeg",
            EncoderKind::Tiff => "tiff",
        }
    }
}

/// Encoder selection with the settings that belong to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoder {
    Png,
    Jpeg { quality: u8, progressive: bool },
    /// `None` leaves the compression scheme to the encoder.
    Tiff { compression: Option<String> },
}

impl Encoder {
    pub const DEFAULT_JPEG_QUALITY: u8 = 100;

    pub fn kind(&self) -> EncoderKind {
        match self {
            Encoder::Png => EncoderKind::Png,
            Encoder::Jpeg { .. } => EncoderKind::Jpeg,
            Encoder::Tiff { .. } => EncoderKind::Tiff,
        }
    }

    /// Encoder with every option at its default.
    pub fn with_defaults(kind: EncoderKind) -> Self {
        match kind {
            EncoderKind::Png => Encoder::Png,
            EncoderKind::Jpeg => Encoder::Jpeg {
                quality: Self::DEFAULT_JPEG_QUALITY,
                progressive: false,
            },
            EncoderKind::Tiff => Encoder::Tiff { compression: None },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub encoder: Encoder,
    pub slice: Slice,
}

/// A validated render request.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// Target resolution, pixels per inch.
    pub ppi: f64,
    pub options: RenderOptions,
}

impl RenderRequest {
    /// Build a request from typed parts, applying the same checks as [`RenderRequest::parse`].
    pub fn new(encoder: Encoder, ppi: f64, slice: Option<Slice>) -> Result<Self> {
        check_ppi(ppi)?;
        if let Encoder::Jpeg { quality, .. } = encoder {
            check_quality(f64::from(quality))?;
        }
        let slice = match slice {
            Some(slice) => check_slice(slice)?,
            None => Slice::FULL,
        };
        Ok(Self {
            ppi,
            options: RenderOptions { encoder, slice },
        })
    }

    /// Parse `(encoder, ppi[, options])` as supplied by the caller.
    ///
    /// An absent or `null` options value means every option takes its default.
    pub fn parse(encoder: &Value, ppi: &Value, options: Option<&Value>) -> Result<Self> {
        let kind = parse_encoder(encoder)?;
        let ppi = parse_ppi(ppi)?;

        let options = match options {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => return Err(Error::validation("'options' must be an instance of Object")),
        };

        let (encoder, slice) = match options {
            Some(map) => (
                parse_encoder_options(kind, map)?,
                match map.get("slice") {
                    Some(value) => parse_slice(value)?,
                    None => Slice::FULL,
                },
            ),
            None => (Encoder::with_defaults(kind), Slice::FULL),
        };

        Ok(Self {
            ppi,
            options: RenderOptions { encoder, slice },
        })
    }

    pub fn encoder_kind(&self) -> EncoderKind {
        self.options.encoder.kind()
    }
}

fn parse_encoder(value: &Value) -> Result<EncoderKind> {
    match value {
        Value::String(token) => EncoderKind::from_token(token),
        _ => Err(Error::validation("'encoder' must be an instance of String")),
    }
}

fn parse_ppi(value: &Value) -> Result<f64> {
    let ppi = value
        .as_f64()
        .ok_or_else(|| Error::validation("'PPI' must be an instance of number"))?;
    check_ppi(ppi)?;
    Ok(ppi)
}

fn check_ppi(ppi: f64) -> Result<()> {
    if ppi.is_finite() && ppi > 0.0 {
        Ok(())
    } else {
        Err(Error::validation("'PPI' value must be greater than 0"))
    }
}

/// Only the options of the selected encoder are read; the rest are ignored.
fn parse_encoder_options(kind: EncoderKind, options: &Map<String, Value>) -> Result<Encoder> {
    match kind {
        EncoderKind::Png => Ok(Encoder::Png),
        EncoderKind::Jpeg => {
            let quality = match options.get("quality") {
                Some(value) => parse_quality(value)?,
                None => Encoder::DEFAULT_JPEG_QUALITY,
            };
            let progressive = match options.get("progressive") {
                Some(Value::Bool(flag)) => *flag,
                Some(_) => return Err(Error::validation("'progressive' must be a boolean value")),
                None => false,
            };
            Ok(Encoder::Jpeg {
                quality,
                progressive,
            })
        }
        EncoderKind::Tiff => {
            let compression = match options.get("compression") {
                Some(Value::String(name)) if !name.is_empty() => Some(name.clone()),
                Some(Value::String(_)) | None => None,
                Some(_) => return Err(Error::validation("'compression' must be an instance of String")),
            };
            Ok(Encoder::Tiff { compression })
        }
    }
}

fn parse_quality(value: &Value) -> Result<u8> {
    let quality = value
        .as_f64()
        .filter(|q| q.fract() == 0.0)
        .ok_or_else(|| Error::validation("'quality' must be 0 - 100 interval integer"))?;
    check_quality(quality)?;
    Ok(quality as u8)
}

fn check_quality(quality: f64) -> Result<()> {
    if (0.0..=100.0).contains(&quality) {
        Ok(())
    } else {
        Err(Error::validation("'quality' not in 0 - 100 interval"))
    }
}

fn parse_slice(value: &Value) -> Result<Slice> {
    let slice = value
        .as_object()
        .ok_or_else(|| Error::validation("'slice' must be an instance of Object"))?;

    let (Some(x), Some(y), Some(w), Some(h)) = (
        slice.get("x"),
        slice.get("y"),
        slice.get("w"),
        slice.get("h"),
    ) else {
        return Err(Error::validation("Not enough values for slice"));
    };

    let (Some(x), Some(y), Some(w), Some(h)) = (x.as_f64(), y.as_f64(), w.as_f64(), h.as_f64())
    else {
        return Err(Error::validation("Wrong values for slice"));
    };

    check_slice(Slice { x, y, w, h })
}

fn check_slice(slice: Slice) -> Result<Slice> {
    let in_range = |v: f64| (0.0..=1.0).contains(&v);
    if in_range(slice.x) && in_range(slice.y) && in_range(slice.w) && in_range(slice.h) {
        Ok(slice)
    } else {
        Err(Error::bounds("Slice values not in 0 - 1 interval"))
    }
}
