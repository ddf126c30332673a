use std::path::Path;

use crate::{
    core::{Fps, FrameIndex, Interval},
    display::Display,
    error::KinetoResult,
    render::Renderer,
    sequencer::{drive_once, drive_paced},
    sink::FrameSink,
    source::{ArtistSource, FrameSource, FuncSource},
    writers,
};

/// Options for [`Animation::save`].
///
/// `fps` is the rate of the saved file and is independent of the animation's
/// display interval; there is no conversion between the two.
#[derive(Debug, Clone)]
pub struct SaveOpts {
    /// Frame rate of the saved animation.
    pub fps: Fps,
    /// Extra command-line arguments appended to an external encoder
    /// invocation. In-process writers reject these.
    pub extra_args: Vec<String>,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
}

impl SaveOpts {
    /// Create options with the given save frame rate.
    pub fn new(fps: Fps) -> Self {
        Self {
            fps,
            extra_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Append extra encoder arguments.
    pub fn with_extra_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args.extend(args);
        self
    }
}

/// A frame-sequencing animation: a figure (renderer seam), a frame source,
/// and a display interval.
///
/// Construct in *function mode* ([`Animation::func`]) with an update
/// procedure invoked once per frame, or in *artist-list mode*
/// ([`Animation::artists`]) with pre-built frame snapshots. Then either
/// [`show`](Animation::show) it live or [`save`](Animation::save) it through
/// a writer.
pub struct Animation<A> {
    figure: Box<dyn Renderer<A>>,
    source: Box<dyn FrameSource<Artists = A>>,
    interval: Interval,
    repeat: bool,
}

impl<A: 'static> Animation<A> {
    /// Function-mode animation: `update` is invoked for frames `0..frames`,
    /// mutating the caller's figure state and returning the drawables it
    /// touched.
    pub fn func(
        figure: impl Renderer<A> + 'static,
        frames: u64,
        interval: Interval,
        update: impl FnMut(FrameIndex) -> KinetoResult<A> + 'static,
    ) -> Self {
        Self::from_source(figure, FuncSource::new(frames, update), interval)
    }

    /// Function-mode animation without a frame bound. Can be shown (until
    /// the display stops it) but not saved.
    pub fn func_unbounded(
        figure: impl Renderer<A> + 'static,
        interval: Interval,
        update: impl FnMut(FrameIndex) -> KinetoResult<A> + 'static,
    ) -> Self {
        Self::from_source(figure, FuncSource::unbounded(update), interval)
    }

    /// Artist-list animation: `snapshots` replay in list order, one per
    /// frame.
    pub fn artists(
        figure: impl Renderer<A> + 'static,
        snapshots: Vec<A>,
        interval: Interval,
    ) -> Self
    where
        A: Clone,
    {
        Self::from_source(figure, ArtistSource::new(snapshots), interval)
    }

    /// Build from any custom frame source.
    pub fn from_source(
        figure: impl Renderer<A> + 'static,
        source: impl FrameSource<Artists = A> + 'static,
        interval: Interval,
    ) -> Self {
        Self {
            figure: Box::new(figure),
            source: Box::new(source),
            interval,
            repeat: true,
        }
    }

    /// Set whether live playback loops after the last frame. Defaults to
    /// `true`; saving always runs exactly one pass regardless.
    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    /// The display interval.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Number of frames in one pass, or `None` for an unbounded source.
    pub fn total_frames(&self) -> Option<u64> {
        self.source.total_frames()
    }

    /// Play the animation into a live display, paced at the configured
    /// interval.
    pub fn show(&mut self, display: &mut dyn Display) -> KinetoResult<()> {
        drive_paced(
            self.source.as_mut(),
            self.figure.as_mut(),
            display,
            self.interval,
            self.repeat,
        )
    }

    /// Save the animation through a named writer.
    ///
    /// The output format is inferred from the filename extension and
    /// validated against the writer's supported set before any encoder
    /// subprocess is spawned. Returns the number of frames written.
    #[tracing::instrument(skip_all)]
    pub fn save(
        &mut self,
        path: impl AsRef<Path>,
        writer: &str,
        opts: SaveOpts,
    ) -> KinetoResult<u64> {
        let path = path.as_ref();
        let (id, format) = writers::resolve(writer, path)?;
        tracing::debug!(writer = id.name(), format, out = %path.display(), "saving animation");
        let mut sink = id.make_sink(path, &format, &opts.extra_args, opts.overwrite)?;
        drive_once(
            self.source.as_mut(),
            self.figure.as_mut(),
            sink.as_mut(),
            opts.fps,
        )
    }

    /// Save the animation through a caller-supplied writer object instead of
    /// a registered name. No filename/format validation happens here; the
    /// sink is responsible for its own output.
    pub fn save_with(&mut self, sink: &mut dyn FrameSink, fps: Fps) -> KinetoResult<u64> {
        drive_once(self.source.as_mut(), self.figure.as_mut(), sink, fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Canvas;
    use crate::error::KinetoError;
    use crate::render::FrameRgba;
    use crate::sink::InMemorySink;

    struct SolidFigure {
        canvas: Canvas,
    }

    impl<A> Renderer<A> for SolidFigure {
        fn canvas(&self) -> Canvas {
            self.canvas
        }

        fn render(&mut self, _frame: FrameIndex, _artists: &A) -> KinetoResult<FrameRgba> {
            Ok(FrameRgba::solid(self.canvas, [9, 9, 9, 255]))
        }
    }

    fn figure() -> SolidFigure {
        SolidFigure {
            canvas: Canvas::new(2, 2).unwrap(),
        }
    }

    #[test]
    fn save_with_streams_at_save_fps_independent_of_interval() {
        let interval = Interval::from_millis(30).unwrap();
        let mut ani = Animation::artists(figure(), vec![1u8, 2, 3], interval);

        let mut sink = InMemorySink::new();
        let written = ani.save_with(&mut sink, Fps::new(12, 1).unwrap()).unwrap();

        assert_eq!(written, 3);
        let cfg = sink.config().unwrap();
        // fps comes from the save call, untouched by the 30 ms interval.
        assert_eq!(cfg.fps, Fps::new(12, 1).unwrap());
        assert_eq!(ani.interval(), interval);
    }

    #[test]
    fn save_rejects_unsupported_writer_extension() {
        let mut ani = Animation::artists(figure(), vec![0u8], Interval::default());
        let err = ani
            .save("/tmp/out.mp4", "image", SaveOpts::new(Fps::new(10, 1).unwrap()))
            .unwrap_err();
        assert!(matches!(err, KinetoError::Validation(_)));
    }

    #[test]
    fn save_rejects_unbounded_animation() {
        let mut ani = Animation::func_unbounded(figure(), Interval::default(), |_| Ok(0u8));
        let mut sink = InMemorySink::new();
        let err = ani.save_with(&mut sink, Fps::new(10, 1).unwrap()).unwrap_err();
        assert!(matches!(err, KinetoError::Validation(_)));
    }

    #[test]
    fn function_mode_update_runs_once_per_frame_in_order() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = seen.clone();
        let mut ani = Animation::func(figure(), 4, Interval::default(), move |f| {
            seen_in.borrow_mut().push(f.0);
            Ok(())
        });

        let mut sink = InMemorySink::new();
        ani.save_with(&mut sink, Fps::new(10, 1).unwrap()).unwrap();
        assert_eq!(*seen.borrow(), vec![0, 1, 2, 3]);
    }
}
