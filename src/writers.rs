use std::path::{Path, PathBuf};

use crate::{
    error::{KinetoError, KinetoResult},
    render::FrameRgba,
    sink::FrameSink,
};

/// A registered animation writer, selectable by name.
///
/// Pipe-based writers stream raw frames to an external encoder's stdin;
/// file-based writers stage every frame as a PNG first and invoke the
/// encoder once. The `image` and `html` writers run fully in-process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterId {
    /// Pipe-based `ffmpeg` writer.
    Ffmpeg,
    /// File-based `ffmpeg` writer (frames staged as PNG files).
    FfmpegFile,
    /// Pipe-based ImageMagick (`magick`) writer.
    ImageMagick,
    /// File-based ImageMagick writer (frames staged as PNG files).
    ImageMagickFile,
    /// In-process writer backed by the `image`/`png` codec crates.
    Image,
    /// In-process writer producing a JS-player HTML page or PNG frame dumps.
    Html,
}

impl WriterId {
    /// All registered writers, in registry order.
    pub fn all() -> &'static [WriterId] {
        &[
            WriterId::Ffmpeg,
            WriterId::FfmpegFile,
            WriterId::ImageMagick,
            WriterId::ImageMagickFile,
            WriterId::Image,
            WriterId::Html,
        ]
    }

    /// Look a writer up by its registry name.
    pub fn by_name(name: &str) -> Option<WriterId> {
        match name {
            "ffmpeg" => Some(WriterId::Ffmpeg),
            "ffmpeg_file" => Some(WriterId::FfmpegFile),
            "imagemagick" => Some(WriterId::ImageMagick),
            "imagemagick_file" => Some(WriterId::ImageMagickFile),
            "image" => Some(WriterId::Image),
            "html" => Some(WriterId::Html),
            _ => None,
        }
    }

    /// The registry name.
    pub fn name(self) -> &'static str {
        match self {
            WriterId::Ffmpeg => "ffmpeg",
            WriterId::FfmpegFile => "ffmpeg_file",
            WriterId::ImageMagick => "imagemagick",
            WriterId::ImageMagickFile => "imagemagick_file",
            WriterId::Image => "image",
            WriterId::Html => "html",
        }
    }

    /// Output formats (filename extensions, lowercase) this writer accepts.
    pub fn supported_formats(self) -> &'static [&'static str] {
        match self {
            WriterId::Ffmpeg | WriterId::FfmpegFile => &[
                "mp4", "m4v", "mov", "mkv", "avi", "webm", "gif", "apng", "webp", "mjpeg",
            ],
            WriterId::ImageMagick | WriterId::ImageMagickFile => {
                &["gif", "apng", "webp", "png", "tiff", "mng"]
            }
            WriterId::Image => &["gif", "apng"],
            WriterId::Html => &["htm", "html", "png"],
        }
    }

    /// Return `true` when this writer accepts `format`.
    pub fn supports(self, format: &str) -> bool {
        self.supported_formats().contains(&format)
    }

    pub(crate) fn make_sink(
        self,
        out_path: &Path,
        format: &str,
        extra_args: &[String],
        overwrite: bool,
    ) -> KinetoResult<Box<dyn FrameSink>> {
        match self {
            WriterId::Ffmpeg => Ok(Box::new(crate::encode_ffmpeg::FfmpegWriter::new(
                out_path, format, extra_args, overwrite,
            ))),
            WriterId::FfmpegFile => Ok(Box::new(crate::encode_ffmpeg::FfmpegFileWriter::new(
                out_path, format, extra_args, overwrite,
            ))),
            WriterId::ImageMagick => Ok(Box::new(crate::encode_magick::MagickWriter::new(
                out_path, format, extra_args, overwrite,
            ))),
            WriterId::ImageMagickFile => Ok(Box::new(
                crate::encode_magick::MagickFileWriter::new(out_path, format, extra_args, overwrite),
            )),
            WriterId::Image => {
                reject_extra_args(self, extra_args)?;
                Ok(Box::new(crate::encode_image::ImageWriter::new(
                    out_path, format, overwrite,
                )?))
            }
            WriterId::Html => {
                reject_extra_args(self, extra_args)?;
                Ok(Box::new(crate::encode_html::HtmlWriter::new(
                    out_path, format, overwrite,
                )?))
            }
        }
    }
}

fn reject_extra_args(id: WriterId, extra_args: &[String]) -> KinetoResult<()> {
    if !extra_args.is_empty() {
        return Err(KinetoError::validation(format!(
            "writer '{}' runs in-process and does not accept extra encoder args",
            id.name()
        )));
    }
    Ok(())
}

/// Infer the output format (lowercase filename extension) from `path`.
pub fn output_format(path: &Path) -> KinetoResult<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| {
            KinetoError::validation(format!(
                "output filename '{}' has no extension to infer a format from",
                path.display()
            ))
        })?;
    Ok(ext.to_ascii_lowercase())
}

/// Resolve a writer name and output path into a validated (writer, format)
/// pair.
///
/// Fails with a validation error when the writer is unknown or the filename
/// extension is outside the writer's supported set. This runs before any
/// sink is constructed, so an unsupported combination can never spawn an
/// encoder subprocess.
pub fn resolve(name: &str, path: &Path) -> KinetoResult<(WriterId, String)> {
    let id = WriterId::by_name(name).ok_or_else(|| {
        KinetoError::validation(format!(
            "unknown writer '{}' (registered: {})",
            name,
            WriterId::all()
                .iter()
                .map(|w| w.name())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;

    let format = output_format(path)?;
    if !id.supports(&format) {
        return Err(KinetoError::validation(format!(
            "writer '{}' does not support '.{}' output (supported: {})",
            id.name(),
            format,
            id.supported_formats().join(", ")
        )));
    }
    Ok((id, format))
}

/// Ensure the parent directory of `path` exists.
pub(crate) fn ensure_parent_dir(path: &Path) -> KinetoResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

pub(crate) fn check_overwrite(path: &Path, overwrite: bool) -> KinetoResult<()> {
    if !overwrite && path.exists() {
        return Err(KinetoError::validation(format!(
            "output file '{}' already exists",
            path.display()
        )));
    }
    Ok(())
}

/// Staging directory for file-based writers: numbered PNG frames in a
/// process-unique temp directory, removed on drop.
pub(crate) struct FrameStage {
    dir: PathBuf,
    count: u64,
}

impl FrameStage {
    pub(crate) fn create(label: &str) -> KinetoResult<Self> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!(
            "kineto_{}_{}_{}",
            label,
            std::process::id(),
            nanos
        ));
        use anyhow::Context as _;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create frame stage '{}'", dir.display()))?;
        Ok(Self { dir, count: 0 })
    }

    pub(crate) fn write_frame(&mut self, frame: &FrameRgba) -> KinetoResult<()> {
        let path = self.dir.join(format!("frame_{:07}.png", self.count));
        image::save_buffer_with_format(
            &path,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|e| {
            KinetoError::encode(format!("failed to stage frame '{}': {e}", path.display()))
        })?;
        self.count += 1;
        Ok(())
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }

    /// `frame_%07d.png` input pattern for `ffmpeg`.
    pub(crate) fn printf_pattern(&self) -> PathBuf {
        self.dir.join("frame_%07d.png")
    }

    /// `frame_*.png` input pattern for ImageMagick (expanded by the encoder).
    pub(crate) fn glob_pattern(&self) -> PathBuf {
        self.dir.join("frame_*.png")
    }
}

impl Drop for FrameStage {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip_through_registry() {
        for &id in WriterId::all() {
            assert_eq!(WriterId::by_name(id.name()), Some(id));
        }
        assert_eq!(WriterId::by_name("pillow"), None);
    }

    #[test]
    fn format_inference_lowercases_extension() {
        assert_eq!(output_format(Path::new("/tmp/out.GIF")).unwrap(), "gif");
        assert!(output_format(Path::new("/tmp/noext")).is_err());
    }

    #[test]
    fn resolve_rejects_unsupported_extension() {
        let err = resolve("image", Path::new("/tmp/out.mp4")).unwrap_err();
        assert!(matches!(err, KinetoError::Validation(_)));
        assert!(err.to_string().contains("does not support"));
    }

    #[test]
    fn resolve_rejects_unknown_writer() {
        let err = resolve("pillow", Path::new("/tmp/out.gif")).unwrap_err();
        assert!(matches!(err, KinetoError::Validation(_)));
    }

    #[test]
    fn resolve_accepts_known_pairs() {
        assert_eq!(
            resolve("ffmpeg", Path::new("/tmp/out.mkv")).unwrap().1,
            "mkv"
        );
        assert_eq!(
            resolve("html", Path::new("/tmp/out.html")).unwrap().1,
            "html"
        );
    }
}
