use crate::core::FrameIndex;
use crate::error::{KinetoError, KinetoResult};

/// Produces the per-frame drawable payload for an animation.
///
/// A source is either *function mode* ([`FuncSource`]: a callback mutates
/// persistent figure state and returns the drawables it touched) or
/// *artist-list mode* ([`ArtistSource`]: every frame snapshot is built before
/// playback starts and replayed in list order).
pub trait FrameSource {
    /// The per-frame payload handed to the renderer.
    type Artists;

    /// Number of frames in one pass, or `None` for an unbounded source.
    ///
    /// Unbounded sources can be displayed (until the display stops playback)
    /// but refuse to save.
    fn total_frames(&self) -> Option<u64>;

    /// Produce the payload for `frame`.
    ///
    /// The sequencer calls this with strictly increasing indices, exactly once
    /// per frame of a pass; a repeated display pass restarts from zero.
    fn produce(&mut self, frame: FrameIndex) -> KinetoResult<Self::Artists>;
}

/// Function-mode source: an update procedure invoked once per frame.
///
/// The callback is expected to be incremental, extending or modifying
/// previously drawn state each call. That is a caller convention; the engine
/// only guarantees the invocation order.
pub struct FuncSource<A> {
    frames: Option<u64>,
    update: Box<dyn FnMut(FrameIndex) -> KinetoResult<A>>,
}

impl<A> FuncSource<A> {
    /// Create a bounded source invoking `update` for frames `0..frames`.
    pub fn new(
        frames: u64,
        update: impl FnMut(FrameIndex) -> KinetoResult<A> + 'static,
    ) -> Self {
        Self {
            frames: Some(frames),
            update: Box::new(update),
        }
    }

    /// Create an unbounded source. Display-only; saving it is a validation
    /// error.
    pub fn unbounded(update: impl FnMut(FrameIndex) -> KinetoResult<A> + 'static) -> Self {
        Self {
            frames: None,
            update: Box::new(update),
        }
    }
}

impl<A> FrameSource for FuncSource<A> {
    type Artists = A;

    fn total_frames(&self) -> Option<u64> {
        self.frames
    }

    fn produce(&mut self, frame: FrameIndex) -> KinetoResult<A> {
        if let Some(n) = self.frames
            && frame.0 >= n
        {
            return Err(KinetoError::sequence(format!(
                "frame {} requested from a {}-frame source",
                frame.0, n
            )));
        }
        (self.update)(frame)
    }
}

/// Artist-list source: pre-built frame snapshots replayed in list order.
pub struct ArtistSource<A> {
    snapshots: Vec<A>,
}

impl<A> ArtistSource<A> {
    /// Create a source from an ordered list of frame snapshots.
    pub fn new(snapshots: Vec<A>) -> Self {
        Self { snapshots }
    }

    /// Number of snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Return `true` when there are no snapshots.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl<A: Clone> FrameSource for ArtistSource<A> {
    type Artists = A;

    fn total_frames(&self) -> Option<u64> {
        Some(self.snapshots.len() as u64)
    }

    fn produce(&mut self, frame: FrameIndex) -> KinetoResult<A> {
        self.snapshots
            .get(frame.0 as usize)
            .cloned()
            .ok_or_else(|| {
                KinetoError::sequence(format!(
                    "frame {} requested from a {}-snapshot source",
                    frame.0,
                    self.snapshots.len()
                ))
            })
    }
}
