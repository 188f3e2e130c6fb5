// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster converter — decode any supported image into a full RGBA pixel
// buffer and re-encode it as JPEG, PNG, or WebP using the `image` crate.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{InputFile, OutputArtifact, RasterFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{Rgb, RgbImage, RgbaImage};
use tracing::{debug, info, instrument};

/// Re-encodes raster images into a fixed target format at a fixed quality.
///
/// ```ignore
/// let converter = RasterConverter::new(RasterFormat::Webp, 0.8);
/// let artifact = converter.convert(&input)?;
/// assert_eq!(artifact.mime_type, "image/webp");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RasterConverter {
    format: RasterFormat,
    /// Lossy quality in `[0.0, 1.0]`, already clamped.
    quality: f32,
}

impl RasterConverter {
    /// Create a converter. Out-of-range qualities are clamped into `[0, 1]`;
    /// NaN falls back to full quality.
    pub fn new(format: RasterFormat, quality: f32) -> Self {
        let quality = if quality.is_nan() {
            1.0
        } else {
            quality.clamp(0.0, 1.0)
        };
        Self { format, quality }
    }

    pub fn format(&self) -> RasterFormat {
        self.format
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Convert one input into an artifact named after the input with the
    /// target format's extension.
    #[instrument(skip_all, fields(name = %input.name, format = %self.format))]
    pub fn convert(&self, input: &InputFile) -> Result<OutputArtifact> {
        let pixels = decode_rgba(&input.name, &input.bytes)?;
        let output_name = replace_extension(&input.name, self.format.extension());
        let bytes = encode_rgba(&pixels, self.format, self.quality, &output_name)?;

        info!(
            width = pixels.width(),
            height = pixels.height(),
            input_bytes = input.len(),
            output_bytes = bytes.len(),
            "Image converted"
        );

        Ok(OutputArtifact::new(output_name, bytes, self.format.mime_type()))
    }
}

/// Decode encoded image bytes into a fully materialised RGBA8 buffer.
///
/// Source and target formats may disagree on colour model (palette, alpha,
/// 16-bit channels), so every conversion goes through this uniform form.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode_rgba(name: &str, data: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(data).map_err(|err| BlattwerkError::decode(name, err))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(BlattwerkError::decode(name, "image has no pixels"));
    }
    debug!(
        width = img.width(),
        height = img.height(),
        color = ?img.color(),
        "Image decoded from bytes"
    );
    Ok(img.to_rgba8())
}

/// Encode an RGBA buffer into `format`.
///
/// `quality` drives the JPEG quantiser; PNG and WebP are written losslessly
/// and ignore it.
pub fn encode_rgba(
    pixels: &RgbaImage,
    format: RasterFormat,
    quality: f32,
    name: &str,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match format {
        RasterFormat::Jpeg => {
            // JPEG carries no alpha channel; transparent areas become white.
            let rgb = flatten_onto_white(pixels);
            let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality));
            rgb.write_with_encoder(encoder)
                .map_err(|err| BlattwerkError::encode(name, format!("JPEG encoding failed: {err}")))?;
        }
        RasterFormat::Png => {
            let encoder = PngEncoder::new(&mut buffer);
            pixels
                .write_with_encoder(encoder)
                .map_err(|err| BlattwerkError::encode(name, format!("PNG encoding failed: {err}")))?;
        }
        RasterFormat::Webp => {
            let encoder = WebPEncoder::new_lossless(&mut buffer);
            pixels
                .write_with_encoder(encoder)
                .map_err(|err| BlattwerkError::encode(name, format!("WebP encoding failed: {err}")))?;
        }
    }
    Ok(buffer)
}

/// Map a `[0, 1]` quality onto the JPEG encoder's `1..=100` scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    let scaled = (quality.clamp(0.0, 1.0) * 100.0).round() as u8;
    scaled.max(1)
}

/// Composite an RGBA image over an opaque white background.
pub fn flatten_onto_white(pixels: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let image::Rgba([r, g, b, a]) = *pixels.get_pixel(x, y);
        let alpha = a as u16;
        let blend = |channel: u8| -> u8 {
            ((channel as u16 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Replace the extension of `name` with `extension`, or append one when the
/// name has none. Dotfiles such as `.hidden` count as extension-less.
pub fn replace_extension(name: &str, extension: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 && !name[dot..].contains(['/', '\\']) => {
            format!("{}.{}", &name[..dot], extension)
        }
        _ => format!("{name}.{extension}"),
    }
}
