use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};

use crate::{
    core::FrameIndex,
    error::{KinetoError, KinetoResult},
    render::FrameRgba,
    sink::{FrameSink, SinkConfig},
    writers::{check_overwrite, ensure_parent_dir},
};

enum Codec {
    Gif {
        enc: GifEncoder<BufWriter<File>>,
        // (numerator, denominator) milliseconds for `Delay`.
        delay_ms: (u32, u32),
    },
    Apng {
        writer: png::Writer<BufWriter<File>>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ImageFormatKind {
    Gif,
    Apng,
}

/// In-process writer backed by the `image` and `png` codec crates.
///
/// Produces looping animated GIF or APNG output without any external
/// encoder binary. Animated WebP has no encoder in this stack; use the
/// `ffmpeg` writer for `.webp`.
pub struct ImageWriter {
    out_path: PathBuf,
    format: ImageFormatKind,
    overwrite: bool,

    codec: Option<Codec>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl ImageWriter {
    pub(crate) fn new(out_path: &Path, format: &str, overwrite: bool) -> KinetoResult<Self> {
        let format = match format {
            "gif" => ImageFormatKind::Gif,
            "apng" => ImageFormatKind::Apng,
            other => {
                return Err(KinetoError::validation(format!(
                    "image writer does not support '.{other}' output"
                )));
            }
        };
        Ok(Self {
            out_path: out_path.to_path_buf(),
            format,
            overwrite,
            codec: None,
            cfg: None,
            last_idx: None,
        })
    }
}

impl FrameSink for ImageWriter {
    fn begin(&mut self, cfg: SinkConfig) -> KinetoResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(KinetoError::validation(
                "image writer width/height must be non-zero",
            ));
        }
        ensure_parent_dir(&self.out_path)?;
        check_overwrite(&self.out_path, self.overwrite)?;

        use anyhow::Context as _;
        let file = File::create(&self.out_path)
            .with_context(|| format!("failed to create '{}'", self.out_path.display()))?;
        let out = BufWriter::new(file);

        self.codec = Some(match self.format {
            ImageFormatKind::Gif => {
                let mut enc = GifEncoder::new(out);
                enc.set_repeat(Repeat::Infinite)
                    .map_err(|e| KinetoError::encode(format!("gif repeat setup failed: {e}")))?;
                Codec::Gif {
                    enc,
                    // Per-frame delay comes from the save fps, not the
                    // display interval.
                    delay_ms: (1000 * cfg.fps.den, cfg.fps.num),
                }
            }
            ImageFormatKind::Apng => {
                let frames = u32::try_from(cfg.frames_total).map_err(|_| {
                    KinetoError::validation("apng output supports at most u32::MAX frames")
                })?;
                if frames == 0 {
                    return Err(KinetoError::validation("apng output requires at least one frame"));
                }
                let delay_num = u16::try_from(cfg.fps.den)
                    .map_err(|_| KinetoError::validation("apng frame delay out of range"))?;
                let delay_den = u16::try_from(cfg.fps.num)
                    .map_err(|_| KinetoError::validation("apng frame delay out of range"))?;

                let mut enc = png::Encoder::new(out, cfg.width, cfg.height);
                enc.set_color(png::ColorType::Rgba);
                enc.set_depth(png::BitDepth::Eight);
                enc.set_animated(frames, 0)
                    .map_err(|e| KinetoError::encode(format!("apng setup failed: {e}")))?;
                enc.set_frame_delay(delay_num, delay_den)
                    .map_err(|e| KinetoError::encode(format!("apng delay setup failed: {e}")))?;
                let writer = enc
                    .write_header()
                    .map_err(|e| KinetoError::encode(format!("apng header write failed: {e}")))?;
                Codec::Apng { writer }
            }
        });
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> KinetoResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| KinetoError::encode("image writer not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(KinetoError::sequence(
                "image writer received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(KinetoError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        frame.validate()?;

        let Some(codec) = self.codec.as_mut() else {
            return Err(KinetoError::encode("image writer is already finalized"));
        };
        match codec {
            Codec::Gif { enc, delay_ms } => {
                let img = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
                    .ok_or_else(|| KinetoError::validation("frame data does not fit its size"))?;
                let delay = Delay::from_numer_denom_ms(delay_ms.0, delay_ms.1);
                enc.encode_frame(Frame::from_parts(img, 0, 0, delay))
                    .map_err(|e| KinetoError::encode(format!("gif frame encode failed: {e}")))
            }
            Codec::Apng { writer } => writer
                .write_image_data(&frame.data)
                .map_err(|e| KinetoError::encode(format!("apng frame encode failed: {e}"))),
        }
    }

    fn end(&mut self) -> KinetoResult<()> {
        let codec = self
            .codec
            .take()
            .ok_or_else(|| KinetoError::encode("image writer not started"))?;
        match codec {
            // GifEncoder flushes on drop.
            Codec::Gif { .. } => {}
            Codec::Apng { writer } => {
                writer
                    .finish()
                    .map_err(|e| KinetoError::encode(format!("apng finalize failed: {e}")))?;
            }
        }
        self.cfg = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Canvas, Fps};

    fn tmp(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kineto_image_test_{}_{name}", std::process::id()))
    }

    fn cfg(frames_total: u64) -> SinkConfig {
        SinkConfig {
            width: 4,
            height: 4,
            fps: Fps::new(10, 1).unwrap(),
            frames_total,
        }
    }

    #[test]
    fn unknown_format_is_rejected_at_construction() {
        assert!(ImageWriter::new(Path::new("/tmp/x.webp"), "webp", true).is_err());
    }

    #[test]
    fn gif_writer_produces_nonempty_file() {
        let path = tmp("out.gif");
        let mut w = ImageWriter::new(&path, "gif", true).unwrap();
        w.begin(cfg(2)).unwrap();
        let canvas = Canvas::new(4, 4).unwrap();
        w.push_frame(FrameIndex(0), &FrameRgba::solid(canvas, [255, 0, 0, 255]))
            .unwrap();
        w.push_frame(FrameIndex(1), &FrameRgba::solid(canvas, [0, 255, 0, 255]))
            .unwrap();
        w.end().unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.len() > 0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn apng_writer_produces_nonempty_file() {
        let path = tmp("out.apng");
        let mut w = ImageWriter::new(&path, "apng", true).unwrap();
        w.begin(cfg(2)).unwrap();
        let canvas = Canvas::new(4, 4).unwrap();
        w.push_frame(FrameIndex(0), &FrameRgba::solid(canvas, [255, 0, 0, 255]))
            .unwrap();
        w.push_frame(FrameIndex(1), &FrameRgba::solid(canvas, [0, 255, 0, 255]))
            .unwrap();
        w.end().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn out_of_order_push_is_rejected() {
        let path = tmp("order.gif");
        let mut w = ImageWriter::new(&path, "gif", true).unwrap();
        w.begin(cfg(2)).unwrap();
        let canvas = Canvas::new(4, 4).unwrap();
        let frame = FrameRgba::solid(canvas, [0, 0, 0, 255]);
        w.push_frame(FrameIndex(1), &frame).unwrap();
        assert!(w.push_frame(FrameIndex(0), &frame).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
