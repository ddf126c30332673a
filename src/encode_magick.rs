use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::{
    core::FrameIndex,
    error::{KinetoError, KinetoResult},
    render::FrameRgba,
    sink::{FrameSink, SinkConfig},
    writers::{FrameStage, check_overwrite, ensure_parent_dir},
};

/// Return `true` when ImageMagick's `magick` can be invoked from `PATH`.
pub fn is_magick_on_path() -> bool {
    Command::new("magick")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn require_magick() -> KinetoResult<()> {
    if !is_magick_on_path() {
        return Err(KinetoError::encode(
            "ImageMagick ('magick') is required for this writer, but was not found on PATH",
        ));
    }
    Ok(())
}

fn check_frame(cfg: &SinkConfig, frame: &FrameRgba) -> KinetoResult<()> {
    if frame.width != cfg.width || frame.height != cfg.height {
        return Err(KinetoError::validation(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width, frame.height, cfg.width, cfg.height
        )));
    }
    frame.validate()
}

/// Pipe-based ImageMagick writer: successive raw RGBA frames streamed to
/// `magick`'s stdin, which stitches them into the output animation.
pub struct MagickWriter {
    out_path: PathBuf,
    extra_args: Vec<String>,
    overwrite: bool,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl MagickWriter {
    pub(crate) fn new(
        out_path: &Path,
        _format: &str,
        extra_args: &[String],
        overwrite: bool,
    ) -> Self {
        Self {
            out_path: out_path.to_path_buf(),
            extra_args: extra_args.to_vec(),
            overwrite,
            child: None,
            stdin: None,
            stderr_drain: None,
            cfg: None,
            last_idx: None,
        }
    }
}

impl FrameSink for MagickWriter {
    fn begin(&mut self, cfg: SinkConfig) -> KinetoResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(KinetoError::validation(
                "imagemagick writer width/height must be non-zero",
            ));
        }
        ensure_parent_dir(&self.out_path)?;
        check_overwrite(&self.out_path, self.overwrite)?;
        require_magick()?;

        // `-delay` is in ticks of 1/100 s; the output format is inferred by
        // the encoder from the filename extension.
        let mut cmd = Command::new("magick");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args([
            "-size",
            &format!("{}x{}", cfg.width, cfg.height),
            "-depth",
            "8",
            "-delay",
            &cfg.fps.frame_ticks().to_string(),
            "-loop",
            "0",
            "rgba:-",
        ]);
        cmd.args(&self.extra_args);
        cmd.arg(&self.out_path);

        tracing::debug!(out = %self.out_path.display(), "spawning magick");
        let mut child = cmd.spawn().map_err(|e| {
            KinetoError::encode(format!(
                "failed to spawn magick (is ImageMagick installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| KinetoError::encode("failed to open magick stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| KinetoError::encode("failed to open magick stderr (unexpected)"))?;
        self.stderr_drain = Some(std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        }));
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> KinetoResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| KinetoError::encode("imagemagick writer not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(KinetoError::sequence(
                "imagemagick writer received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);
        check_frame(cfg, frame)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(KinetoError::encode("imagemagick writer is already finalized"));
        };
        use std::io::Write as _;
        stdin.write_all(&frame.data).map_err(|e| {
            KinetoError::encode(format!("failed to write frame to magick stdin: {e}"))
        })
    }

    fn end(&mut self) -> KinetoResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| KinetoError::encode("imagemagick writer not started"))?;
        let status = child
            .wait()
            .map_err(|e| KinetoError::encode(format!("failed to wait for magick to finish: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| KinetoError::encode("magick stderr drain thread panicked"))?
                .map_err(|e| KinetoError::encode(format!("magick stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(KinetoError::encode(format!(
                "magick exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        self.cfg = None;
        Ok(())
    }
}

/// File-based ImageMagick writer: frames staged as PNG files, stitched once
/// at the end.
pub struct MagickFileWriter {
    out_path: PathBuf,
    extra_args: Vec<String>,
    overwrite: bool,

    stage: Option<FrameStage>,
    cfg: Option<SinkConfig>,
}

impl MagickFileWriter {
    pub(crate) fn new(
        out_path: &Path,
        _format: &str,
        extra_args: &[String],
        overwrite: bool,
    ) -> Self {
        Self {
            out_path: out_path.to_path_buf(),
            extra_args: extra_args.to_vec(),
            overwrite,
            stage: None,
            cfg: None,
        }
    }
}

impl FrameSink for MagickFileWriter {
    fn begin(&mut self, cfg: SinkConfig) -> KinetoResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(KinetoError::validation(
                "imagemagick writer width/height must be non-zero",
            ));
        }
        ensure_parent_dir(&self.out_path)?;
        check_overwrite(&self.out_path, self.overwrite)?;

        self.stage = Some(FrameStage::create("magick")?);
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, frame: &FrameRgba) -> KinetoResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| KinetoError::encode("imagemagick file writer not started"))?;
        check_frame(cfg, frame)?;
        let Some(stage) = self.stage.as_mut() else {
            return Err(KinetoError::encode(
                "imagemagick file writer is already finalized",
            ));
        };
        stage.write_frame(frame)
    }

    fn end(&mut self) -> KinetoResult<()> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| KinetoError::encode("imagemagick file writer not started"))?;
        let stage = self
            .stage
            .take()
            .ok_or_else(|| KinetoError::encode("imagemagick file writer not started"))?;
        if stage.count() == 0 {
            return Err(KinetoError::encode("no frames were staged for encoding"));
        }
        require_magick()?;

        // The glob pattern is expanded by ImageMagick itself, not a shell.
        let mut cmd = Command::new("magick");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args([
            "-delay",
            &cfg.fps.frame_ticks().to_string(),
            "-loop",
            "0",
        ]);
        cmd.arg(stage.glob_pattern());
        cmd.args(&self.extra_args);
        cmd.arg(&self.out_path);

        tracing::debug!(
            out = %self.out_path.display(),
            frames = stage.count(),
            "encoding staged frames with magick"
        );
        let child = cmd.spawn().map_err(|e| {
            KinetoError::encode(format!(
                "failed to spawn magick (is ImageMagick installed and on PATH?): {e}"
            ))
        })?;
        let output = child
            .wait_with_output()
            .map_err(|e| KinetoError::encode(format!("failed to wait for magick to finish: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KinetoError::encode(format!(
                "magick exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Canvas, Fps};

    #[test]
    fn push_before_begin_fails() {
        let mut w = MagickWriter::new(Path::new("/tmp/out.gif"), "gif", &[], true);
        let frame = FrameRgba::solid(Canvas::new(2, 2).unwrap(), [0, 0, 0, 255]);
        assert!(w.push_frame(FrameIndex(0), &frame).is_err());
    }

    #[test]
    fn frame_size_mismatch_is_rejected() {
        let cfg = SinkConfig {
            width: 4,
            height: 2,
            fps: Fps::new(20, 1).unwrap(),
            frames_total: 1,
        };
        let frame = FrameRgba::solid(Canvas::new(2, 2).unwrap(), [0, 0, 0, 255]);
        assert!(check_frame(&cfg, &frame).is_err());
    }
}
