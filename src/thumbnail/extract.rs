use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use image::imageops;

use crate::error::ThumbnailError;

/// Share of the duration to skip before grabbing the preview frame, past
/// the black frames many files open with.
pub const SEEK_FRACTION: f64 = 0.10;

/// Pulls one representative frame out of a media file.
///
/// Called from worker threads; implementations must not touch anything the
/// control thread owns.
pub trait FrameExtractor: Send + Sync {
    /// Return a frame that fits within `max_width` x `max_height`.
    fn extract(
        &self,
        path: &Path,
        max_width: u32,
        max_height: u32,
    ) -> Result<RgbaImage, ThumbnailError>;
}

/// Scale `image` down to fit the box, keeping its aspect ratio. Images that
/// already fit are returned unchanged.
pub fn fit_preview(image: &RgbaImage, max_width: u32, max_height: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    if w <= max_width && h <= max_height {
        return image.clone();
    }
    let scale = f64::min(
        f64::from(max_width) / f64::from(w),
        f64::from(max_height) / f64::from(h),
    );
    let tw = ((f64::from(w) * scale).round() as u32).clamp(1, max_width.max(1));
    let th = ((f64::from(h) * scale).round() as u32).clamp(1, max_height.max(1));
    imageops::thumbnail(image, tw, th)
}

/// Stand-in used when the build has no video decoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedExtractor;

impl FrameExtractor for UnsupportedExtractor {
    fn extract(&self, _path: &Path, _w: u32, _h: u32) -> Result<RgbaImage, ThumbnailError> {
        Err(ThumbnailError::Unsupported(
            "video decoding is not available in this build".to_string(),
        ))
    }
}

/// The best extractor this build has.
pub fn default_extractor() -> Arc<dyn FrameExtractor> {
    #[cfg(feature = "ffmpeg")]
    {
        Arc::new(FfmpegExtractor)
    }
    #[cfg(not(feature = "ffmpeg"))]
    {
        Arc::new(UnsupportedExtractor)
    }
}

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegExtractor;

#[cfg(feature = "ffmpeg")]
mod ffmpeg {
    use std::path::Path;

    use ffmpeg_next::format::Pixel;
    use ffmpeg_next::software::scaling;
    use image::RgbaImage;
    use log::debug;

    use crate::backend::video_feed::{init_ffmpeg, next_frame, to_image};
    use crate::error::ThumbnailError;

    use super::{FrameExtractor, SEEK_FRACTION, fit_preview};

    /// Decodes one frame near the start of the file with FFmpeg.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FfmpegExtractor;

    impl FrameExtractor for FfmpegExtractor {
        fn extract(
            &self,
            path: &Path,
            max_width: u32,
            max_height: u32,
        ) -> Result<RgbaImage, ThumbnailError> {
            init_ffmpeg();

            let mut ictx = ffmpeg_next::format::input(&path)
                .map_err(|e| ThumbnailError::Open(format!("{}: {e}", path.display())))?;

            let stream_index = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .map(|s| s.index())
                .ok_or(ThumbnailError::NoVideoStream)?;

            let mut decoder = {
                let stream = ictx
                    .stream(stream_index)
                    .ok_or(ThumbnailError::NoVideoStream)?;
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
                    .and_then(|ctx| ctx.decoder().video())
                    .map_err(|e| ThumbnailError::Decode(format!("video decoder: {e}")))?
            };

            let (width, height) = (decoder.width(), decoder.height());
            if width == 0 || height == 0 {
                return Err(ThumbnailError::Decode(format!(
                    "invalid video dimensions {width}x{height}"
                )));
            }

            // Container duration is in AV_TIME_BASE (microsecond) units.
            let total = ictx.duration();
            if total > 0 {
                let ts = (total as f64 * SEEK_FRACTION) as i64;
                match ictx.seek(ts, ..ts) {
                    Ok(()) => decoder.flush(),
                    Err(e) => debug!("{}: seek failed ({e}), using first frame", path.display()),
                }
            }

            let frame = next_frame(&mut ictx, &mut decoder, stream_index)
                .map_err(|e| ThumbnailError::Decode(e.to_string()))?
                .ok_or_else(|| ThumbnailError::Decode("no frame decoded".to_string()))?;

            let mut scaler = scaling::Context::get(
                decoder.format(),
                width,
                height,
                Pixel::RGBA,
                width,
                height,
                scaling::Flags::BILINEAR,
            )
            .map_err(|e| ThumbnailError::Decode(format!("scaler: {e}")))?;
            let mut rgba = ffmpeg_next::frame::Video::empty();
            scaler
                .run(&frame, &mut rgba)
                .map_err(|e| ThumbnailError::Decode(format!("scale failed: {e}")))?;

            let full = to_image(&rgba)
                .ok_or_else(|| ThumbnailError::Decode("short frame buffer".to_string()))?;
            Ok(fit_preview(&full, max_width, max_height))
        }
    }
}
