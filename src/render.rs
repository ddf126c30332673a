use crate::{
    core::{Canvas, FrameIndex},
    error::{KinetoError, KinetoResult},
};

/// A rendered frame as RGBA8 pixels, tightly packed, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

impl FrameRgba {
    /// Create a frame filled with a single color.
    pub fn solid(canvas: Canvas, rgba: [u8; 4]) -> Self {
        let mut data = vec![0u8; canvas.rgba_len()];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
        }
    }

    /// Validate that `data` matches `width * height * 4`.
    pub fn validate(&self) -> KinetoResult<()> {
        let expected = (self.width as usize) * (self.height as usize) * 4;
        if self.data.len() != expected {
            return Err(KinetoError::validation(format!(
                "frame data length {} does not match {}x{} rgba8",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}

/// The external drawing surface seam.
///
/// Implementations own the figure state (artists, axes, whatever the host
/// plotting layer uses) and turn the per-frame payload produced by a
/// [`crate::FrameSource`] into pixels. The engine never inspects `A`.
pub trait Renderer<A> {
    /// Output dimensions. Stable for the lifetime of an animation.
    fn canvas(&self) -> Canvas;

    /// Render one frame from the payload the frame source produced for it.
    ///
    /// In function mode `artists` is the set of drawables the update callback
    /// touched; in artist-list mode it is the full snapshot to show.
    fn render(&mut self, frame: FrameIndex, artists: &A) -> KinetoResult<FrameRgba>;
}
