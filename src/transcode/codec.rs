//! Decode and encode adapters.
//!
//! | Format | Crate          | Knobs                              |
//! |--------|----------------|------------------------------------|
//! | decode | `image`        | jpeg, png, webp                    |
//! | WebP   | `webp`         | quality, lossless, exact           |
//! | AVIF   | `ravif`        | quality, alpha quality, speed      |
//! | JXL    | `zune-jpegxl`  | effort (encoder is lossless only)  |

use image::RgbaImage;
use thiserror::Error;

use crate::config::EncodeSettings;
use crate::format::FormatKind;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to decode {format} image")]
    Decode {
        format: FormatKind,
        #[source]
        source: image::ImageError,
    },

    #[error("{format} encoder failed: {message}")]
    Encode { format: FormatKind, message: String },

    #[error("no codec for {0}")]
    Unsupported(FormatKind),
}

/// Decode `bytes` as `format` into 8-bit RGBA.
pub fn decode(bytes: &[u8], format: FormatKind) -> Result<RgbaImage, CodecError> {
    let image_format = match format {
        FormatKind::Jpeg => image::ImageFormat::Jpeg,
        FormatKind::Png => image::ImageFormat::Png,
        FormatKind::WebP => image::ImageFormat::WebP,
        FormatKind::Avif | FormatKind::Jxl => return Err(CodecError::Unsupported(format)),
    };

    image::load_from_memory_with_format(bytes, image_format)
        .map(|img| img.to_rgba8())
        .map_err(|source| CodecError::Decode { format, source })
}

/// Encode `img` as `format` with the configured knobs.
pub fn encode(
    img: &RgbaImage,
    format: FormatKind,
    settings: &EncodeSettings,
) -> Result<Vec<u8>, CodecError> {
    match format {
        FormatKind::WebP => encode_webp(img, settings),
        FormatKind::Avif => encode_avif(img, settings),
        FormatKind::Jxl => encode_jxl(img, settings),
        FormatKind::Jpeg | FormatKind::Png => Err(CodecError::Unsupported(format)),
    }
}

fn encode_error(format: FormatKind, message: impl Into<String>) -> CodecError {
    CodecError::Encode {
        format,
        message: message.into(),
    }
}

fn encode_webp(img: &RgbaImage, settings: &EncodeSettings) -> Result<Vec<u8>, CodecError> {
    let mut config = webp::WebPConfig::new()
        .map_err(|()| encode_error(FormatKind::WebP, "invalid encoder config"))?;
    config.quality = f32::from(settings.webp_quality());
    config.lossless = i32::from(settings.webp.lossless);
    config.exact = i32::from(settings.webp.exact);

    let encoder = webp::Encoder::from_rgba(img.as_raw(), img.width(), img.height());
    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| encode_error(FormatKind::WebP, format!("{e:?}")))?;
    Ok(memory.to_vec())
}

fn encode_avif(img: &RgbaImage, settings: &EncodeSettings) -> Result<Vec<u8>, CodecError> {
    let pixels: Vec<ravif::RGBA8> = img
        .pixels()
        .map(|p| ravif::RGBA8::new(p[0], p[1], p[2], p[3]))
        .collect();
    let buffer = ravif::Img::new(
        pixels.as_slice(),
        img.width() as usize,
        img.height() as usize,
    );

    let encoded = ravif::Encoder::new()
        .with_quality(f32::from(settings.avif_quality()))
        .with_alpha_quality(f32::from(settings.avif_alpha_quality()))
        .with_speed(settings.avif.speed)
        .encode_rgba(buffer)
        .map_err(|e| encode_error(FormatKind::Avif, e.to_string()))?;
    Ok(encoded.avif_file)
}

fn encode_jxl(img: &RgbaImage, settings: &EncodeSettings) -> Result<Vec<u8>, CodecError> {
    use zune_core::bit_depth::BitDepth;
    use zune_core::colorspace::ColorSpace;
    use zune_core::options::EncoderOptions;

    let options = EncoderOptions::new(
        img.width() as usize,
        img.height() as usize,
        ColorSpace::RGBA,
        BitDepth::Eight,
    )
    .set_effort(settings.jxl.effort);
    // lossless only; quality is accepted for config symmetry
    crate::debug!("transcode"; "jxl effort {}, quality {} ignored", settings.jxl.effort, settings.jxl_quality());

    zune_jpegxl::JxlSimpleEncoder::new(img.as_raw(), options)
        .encode()
        .map_err(|e| encode_error(FormatKind::Jxl, format!("{e:?}")))
}
