use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::{
    core::FrameIndex,
    error::{KinetoError, KinetoResult},
    render::FrameRgba,
    sink::{FrameSink, SinkConfig},
    writers::{check_overwrite, ensure_parent_dir},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HtmlMode {
    /// Standalone page with a JS player and base64-embedded PNG frames.
    Player,
    /// Numbered PNG frame files next to the output path (`<stem>_0000000.png`, ...).
    FrameFiles,
}

/// In-process writer producing a JavaScript-driven animation page, or a
/// plain PNG frame dump when the output extension is `.png`.
///
/// The player paces frames at the save fps; the display interval plays no
/// part in the generated page.
pub struct HtmlWriter {
    out_path: PathBuf,
    mode: HtmlMode,
    overwrite: bool,

    frames: Vec<String>,
    written: u64,
    cfg: Option<SinkConfig>,
}

impl HtmlWriter {
    pub(crate) fn new(out_path: &Path, format: &str, overwrite: bool) -> KinetoResult<Self> {
        let mode = match format {
            "htm" | "html" => HtmlMode::Player,
            "png" => HtmlMode::FrameFiles,
            other => {
                return Err(KinetoError::validation(format!(
                    "html writer does not support '.{other}' output"
                )));
            }
        };
        Ok(Self {
            out_path: out_path.to_path_buf(),
            mode,
            overwrite,
            frames: Vec::new(),
            written: 0,
            cfg: None,
        })
    }

    fn frame_file_path(&self, n: u64) -> KinetoResult<PathBuf> {
        let stem = self
            .out_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                KinetoError::validation(format!(
                    "output filename '{}' has no usable stem",
                    self.out_path.display()
                ))
            })?;
        Ok(self
            .out_path
            .with_file_name(format!("{stem}_{n:07}.png")))
    }
}

fn encode_png(frame: &FrameRgba) -> KinetoResult<Vec<u8>> {
    use image::ImageEncoder as _;
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(std::io::Cursor::new(&mut bytes))
        .write_image(
            &frame.data,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| KinetoError::encode(format!("failed to encode png frame: {e}")))?;
    Ok(bytes)
}

impl FrameSink for HtmlWriter {
    fn begin(&mut self, cfg: SinkConfig) -> KinetoResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(KinetoError::validation(
                "html writer width/height must be non-zero",
            ));
        }
        ensure_parent_dir(&self.out_path)?;
        if self.mode == HtmlMode::Player {
            check_overwrite(&self.out_path, self.overwrite)?;
        }
        self.frames.clear();
        self.written = 0;
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, frame: &FrameRgba) -> KinetoResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| KinetoError::encode("html writer not started"))?;
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(KinetoError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        frame.validate()?;

        match self.mode {
            HtmlMode::Player => {
                let png = encode_png(frame)?;
                self.frames
                    .push(format!("data:image/png;base64,{}", BASE64.encode(&png)));
            }
            HtmlMode::FrameFiles => {
                let path = self.frame_file_path(self.written)?;
                check_overwrite(&path, self.overwrite)?;
                image::save_buffer_with_format(
                    &path,
                    &frame.data,
                    frame.width,
                    frame.height,
                    image::ColorType::Rgba8,
                    image::ImageFormat::Png,
                )
                .map_err(|e| {
                    KinetoError::encode(format!("failed to write '{}': {e}", path.display()))
                })?;
                self.written += 1;
            }
        }
        Ok(())
    }

    fn end(&mut self) -> KinetoResult<()> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| KinetoError::encode("html writer not started"))?;
        if self.mode == HtmlMode::FrameFiles {
            return Ok(());
        }

        let title = self
            .out_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("animation");
        let frames_json = serde_json::to_string(&self.frames)
            .map_err(|e| KinetoError::encode(format!("failed to embed frame list: {e}")))?;
        let page = render_player_page(title, cfg.fps.frame_millis(), &frames_json);

        use anyhow::Context as _;
        std::fs::write(&self.out_path, page)
            .with_context(|| format!("failed to write '{}'", self.out_path.display()))?;
        self.frames.clear();
        Ok(())
    }
}

fn render_player_page(title: &str, delay_ms: u64, frames_json: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
<img id="frame" alt="{title}">
<script>
const frames = {frames_json};
const delayMs = {delay_ms};
let i = 0;
const img = document.getElementById("frame");
function tick() {{
  img.src = frames[i];
  i = (i + 1) % frames.length;
}}
tick();
setInterval(tick, delayMs);
</script>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Canvas, Fps};

    fn cfg() -> SinkConfig {
        SinkConfig {
            width: 2,
            height: 2,
            fps: Fps::new(4, 1).unwrap(),
            frames_total: 2,
        }
    }

    #[test]
    fn unknown_format_is_rejected_at_construction() {
        assert!(HtmlWriter::new(Path::new("/tmp/x.gif"), "gif", true).is_err());
    }

    #[test]
    fn player_page_embeds_every_frame_at_save_fps() {
        let path = std::env::temp_dir().join(format!(
            "kineto_html_test_{}_player.html",
            std::process::id()
        ));
        let mut w = HtmlWriter::new(&path, "html", true).unwrap();
        w.begin(cfg()).unwrap();
        let canvas = Canvas::new(2, 2).unwrap();
        w.push_frame(FrameIndex(0), &FrameRgba::solid(canvas, [255, 0, 0, 255]))
            .unwrap();
        w.push_frame(FrameIndex(1), &FrameRgba::solid(canvas, [0, 0, 255, 255]))
            .unwrap();
        w.end().unwrap();

        let page = std::fs::read_to_string(&path).unwrap();
        assert_eq!(page.matches("data:image/png;base64,").count(), 2);
        // 4 fps => 250 ms per frame.
        assert!(page.contains("const delayMs = 250;"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn frame_files_mode_writes_numbered_pngs() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("kineto_html_test_{}_dump.png", std::process::id()));
        let mut w = HtmlWriter::new(&path, "png", true).unwrap();
        w.begin(cfg()).unwrap();
        let canvas = Canvas::new(2, 2).unwrap();
        w.push_frame(FrameIndex(0), &FrameRgba::solid(canvas, [1, 2, 3, 255]))
            .unwrap();
        w.end().unwrap();

        let frame0 = w.frame_file_path(0).unwrap();
        assert!(frame0.exists());
        let _ = std::fs::remove_file(&frame0);
    }
}
