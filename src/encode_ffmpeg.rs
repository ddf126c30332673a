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

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

// Containers we encode as h264 + yuv420p, which requires even dimensions.
fn needs_yuv420p(format: &str) -> bool {
    matches!(format, "mp4" | "m4v" | "mov" | "mkv" | "avi" | "webm")
}

fn push_codec_args(cmd: &mut Command, format: &str) {
    match format {
        "mp4" | "m4v" | "mov" => {
            cmd.args([
                "-an",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ]);
        }
        "mkv" | "avi" => {
            cmd.args(["-an", "-c:v", "libx264", "-pix_fmt", "yuv420p"]);
        }
        "webm" => {
            cmd.args(["-an", "-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p"]);
        }
        // gif/apng/webp/mjpeg: let ffmpeg pick from the muxer.
        _ => {
            cmd.arg("-an");
        }
    }
}

fn validate_dims(cfg: &SinkConfig, format: &str) -> KinetoResult<()> {
    if cfg.width == 0 || cfg.height == 0 {
        return Err(KinetoError::validation(
            "ffmpeg writer width/height must be non-zero",
        ));
    }
    if needs_yuv420p(format) && (!cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2)) {
        return Err(KinetoError::validation(format!(
            "ffmpeg writer width/height must be even for '.{format}' (yuv420p output)"
        )));
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

fn require_ffmpeg() -> KinetoResult<()> {
    if !is_ffmpeg_on_path() {
        return Err(KinetoError::encode(
            "ffmpeg is required for this writer, but was not found on PATH",
        ));
    }
    Ok(())
}

fn spawn_with_drain(mut cmd: Command) -> KinetoResult<SpawnedEncoder> {
    let mut child = cmd.spawn().map_err(|e| {
        KinetoError::encode(format!(
            "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
        ))
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| KinetoError::encode("failed to open ffmpeg stdin (unexpected)"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| KinetoError::encode("failed to open ffmpeg stderr (unexpected)"))?;
    let stderr_drain = std::thread::spawn(move || {
        let mut stderr_bytes = Vec::new();
        stderr.read_to_end(&mut stderr_bytes)?;
        Ok(stderr_bytes)
    });

    Ok(SpawnedEncoder {
        child,
        stdin: Some(stdin),
        stderr_drain: Some(stderr_drain),
    })
}

struct SpawnedEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl SpawnedEncoder {
    fn write(&mut self, bytes: &[u8]) -> KinetoResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(KinetoError::encode("ffmpeg writer is already finalized"));
        };
        use std::io::Write as _;
        stdin.write_all(bytes).map_err(|e| {
            KinetoError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })
    }

    fn finish(mut self, name: &str) -> KinetoResult<()> {
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| KinetoError::encode(format!("failed to wait for {name} to finish: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| KinetoError::encode(format!("{name} stderr drain thread panicked")))?
                .map_err(|e| KinetoError::encode(format!("{name} stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(KinetoError::encode(format!(
                "{name} exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Pipe-based `ffmpeg` writer: raw RGBA frames streamed to stdin.
///
/// Producer and encoder overlap only through the OS pipe buffer; writes
/// block when the encoder falls behind, so ordering stays strict FIFO.
pub struct FfmpegWriter {
    out_path: PathBuf,
    format: String,
    extra_args: Vec<String>,
    overwrite: bool,

    enc: Option<SpawnedEncoder>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegWriter {
    pub(crate) fn new(
        out_path: &Path,
        format: &str,
        extra_args: &[String],
        overwrite: bool,
    ) -> Self {
        Self {
            out_path: out_path.to_path_buf(),
            format: format.to_owned(),
            extra_args: extra_args.to_vec(),
            overwrite,
            enc: None,
            cfg: None,
            last_idx: None,
        }
    }
}

impl FrameSink for FfmpegWriter {
    fn begin(&mut self, cfg: SinkConfig) -> KinetoResult<()> {
        validate_dims(&cfg, &self.format)?;
        ensure_parent_dir(&self.out_path)?;
        check_overwrite(&self.out_path, self.overwrite)?;
        require_ffmpeg()?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if self.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &format!("{}/{}", cfg.fps.num, cfg.fps.den),
            "-i",
            "pipe:0",
        ]);
        push_codec_args(&mut cmd, &self.format);
        cmd.args(&self.extra_args);
        cmd.arg(&self.out_path);

        tracing::debug!(out = %self.out_path.display(), "spawning ffmpeg");
        self.enc = Some(spawn_with_drain(cmd)?);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> KinetoResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| KinetoError::encode("ffmpeg writer not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(KinetoError::sequence(
                "ffmpeg writer received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);
        check_frame(cfg, frame)?;

        let Some(enc) = self.enc.as_mut() else {
            return Err(KinetoError::encode("ffmpeg writer is already finalized"));
        };
        enc.write(&frame.data)
    }

    fn end(&mut self) -> KinetoResult<()> {
        let enc = self
            .enc
            .take()
            .ok_or_else(|| KinetoError::encode("ffmpeg writer not started"))?;
        enc.finish("ffmpeg")?;
        self.cfg = None;
        Ok(())
    }
}

/// File-based `ffmpeg` writer: frames staged as PNG files, encoded once at
/// the end. Slower than the pipe writer but the staged frames are plain
/// files, which helps debugging.
pub struct FfmpegFileWriter {
    out_path: PathBuf,
    format: String,
    extra_args: Vec<String>,
    overwrite: bool,

    stage: Option<FrameStage>,
    cfg: Option<SinkConfig>,
}

impl FfmpegFileWriter {
    pub(crate) fn new(
        out_path: &Path,
        format: &str,
        extra_args: &[String],
        overwrite: bool,
    ) -> Self {
        Self {
            out_path: out_path.to_path_buf(),
            format: format.to_owned(),
            extra_args: extra_args.to_vec(),
            overwrite,
            stage: None,
            cfg: None,
        }
    }
}

impl FrameSink for FfmpegFileWriter {
    fn begin(&mut self, cfg: SinkConfig) -> KinetoResult<()> {
        validate_dims(&cfg, &self.format)?;
        ensure_parent_dir(&self.out_path)?;
        check_overwrite(&self.out_path, self.overwrite)?;

        self.stage = Some(FrameStage::create("ffmpeg")?);
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, frame: &FrameRgba) -> KinetoResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| KinetoError::encode("ffmpeg file writer not started"))?;
        check_frame(cfg, frame)?;
        let Some(stage) = self.stage.as_mut() else {
            return Err(KinetoError::encode("ffmpeg file writer is already finalized"));
        };
        stage.write_frame(frame)
    }

    fn end(&mut self) -> KinetoResult<()> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| KinetoError::encode("ffmpeg file writer not started"))?;
        let stage = self
            .stage
            .take()
            .ok_or_else(|| KinetoError::encode("ffmpeg file writer not started"))?;
        if stage.count() == 0 {
            return Err(KinetoError::encode("no frames were staged for encoding"));
        }
        require_ffmpeg()?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if self.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            "error",
            "-framerate",
            &format!("{}/{}", cfg.fps.num, cfg.fps.den),
            "-i",
        ]);
        cmd.arg(stage.printf_pattern());
        push_codec_args(&mut cmd, &self.format);
        cmd.args(&self.extra_args);
        cmd.arg(&self.out_path);

        tracing::debug!(
            out = %self.out_path.display(),
            frames = stage.count(),
            "encoding staged frames with ffmpeg"
        );
        let mut child = cmd.spawn().map_err(|e| {
            KinetoError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let output = child
            .wait_with_output()
            .map_err(|e| KinetoError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        // `stage` dropped here removes the temp frames.
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KinetoError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
