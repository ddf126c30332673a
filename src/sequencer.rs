use std::time::Instant;

use crate::{
    core::{Fps, FrameIndex, Interval},
    display::{Display, DisplayControl},
    error::{KinetoError, KinetoResult},
    render::Renderer,
    sink::{FrameSink, SinkConfig},
    source::FrameSource,
};

/// Drive one full pass of the frame sequence into a sink.
///
/// Invokes the source for frames `0..N` in strictly increasing order, exactly
/// once each, forwarding every payload to the renderer and every rendered
/// frame to the sink before advancing. This is the save path; pacing is the
/// sink's concern (`fps` is carried in the [`SinkConfig`], never derived from
/// the display interval).
///
/// Returns the number of frames pushed.
pub fn drive_once<A>(
    source: &mut dyn FrameSource<Artists = A>,
    renderer: &mut dyn Renderer<A>,
    sink: &mut dyn FrameSink,
    fps: Fps,
) -> KinetoResult<u64> {
    let Some(total) = source.total_frames() else {
        return Err(KinetoError::validation(
            "cannot save an unbounded animation; give the source a frame count",
        ));
    };
    if total == 0 {
        return Err(KinetoError::validation("animation has no frames"));
    }

    let canvas = renderer.canvas();
    let cfg = SinkConfig {
        width: canvas.width,
        height: canvas.height,
        fps,
        frames_total: total,
    };

    tracing::debug!(frames = total, fps = fps.as_f64(), "sequence start");
    sink.begin(cfg)?;
    for f in 0..total {
        let idx = FrameIndex(f);
        let artists = source.produce(idx)?;
        let frame = renderer.render(idx, &artists)?;
        sink.push_frame(idx, &frame)?;
    }
    sink.end()?;
    tracing::debug!(frames = total, "sequence end");

    Ok(total)
}

/// Drive the frame sequence into a live display, paced at `interval`.
///
/// One payload is produced, rendered, and presented per tick. When `repeat`
/// is set a bounded sequence restarts from frame zero after its last frame;
/// unbounded sources play until the display returns
/// [`DisplayControl::Stop`].
pub fn drive_paced<A>(
    source: &mut dyn FrameSource<Artists = A>,
    renderer: &mut dyn Renderer<A>,
    display: &mut dyn Display,
    interval: Interval,
    repeat: bool,
) -> KinetoResult<()> {
    if source.total_frames() == Some(0) {
        return Err(KinetoError::validation("animation has no frames"));
    }

    let mut deadline = Instant::now();
    loop {
        let mut f = 0u64;
        loop {
            if let Some(total) = source.total_frames()
                && f >= total
            {
                break;
            }

            let idx = FrameIndex(f);
            let artists = source.produce(idx)?;
            let frame = renderer.render(idx, &artists)?;
            if display.present(idx, &frame)? == DisplayControl::Stop {
                return Ok(());
            }

            deadline += interval.as_duration();
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            } else {
                // Rendering outran the interval; rebase instead of bursting.
                deadline = now;
            }
            f += 1;
        }

        if !repeat {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Canvas;
    use crate::display::CountingDisplay;
    use crate::render::FrameRgba;
    use crate::sink::InMemorySink;
    use crate::source::{ArtistSource, FuncSource};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct SolidRenderer {
        canvas: Canvas,
    }

    impl<A> Renderer<A> for SolidRenderer {
        fn canvas(&self) -> Canvas {
            self.canvas
        }

        fn render(&mut self, _frame: FrameIndex, _artists: &A) -> KinetoResult<FrameRgba> {
            Ok(FrameRgba::solid(self.canvas, [0, 0, 0, 255]))
        }
    }

    fn renderer() -> SolidRenderer {
        SolidRenderer {
            canvas: Canvas::new(2, 2).unwrap(),
        }
    }

    #[test]
    fn drive_once_invokes_update_exactly_n_times_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = seen.clone();
        let mut src = FuncSource::new(5, move |f| {
            seen_in.borrow_mut().push(f.0);
            Ok(())
        });

        let mut sink = InMemorySink::new();
        let pushed = drive_once(
            &mut src,
            &mut renderer(),
            &mut sink,
            Fps::new(30, 1).unwrap(),
        )
        .unwrap();

        assert_eq!(pushed, 5);
        assert_eq!(*seen.borrow(), vec![0, 1, 2, 3, 4]);
        assert_eq!(sink.frames().len(), 5);
        for (i, (idx, _)) in sink.frames().iter().enumerate() {
            assert_eq!(idx.0, i as u64);
        }
    }

    #[test]
    fn drive_once_preserves_artist_list_order_and_length() {
        let mut src = ArtistSource::new(vec![10u32, 20, 30]);
        let mut sink = InMemorySink::new();
        drive_once(
            &mut src,
            &mut renderer(),
            &mut sink,
            Fps::new(10, 1).unwrap(),
        )
        .unwrap();
        assert_eq!(sink.frames().len(), 3);
        assert_eq!(sink.config().unwrap().frames_total, 3);
    }

    #[test]
    fn drive_once_rejects_empty_and_unbounded_sources() {
        let mut empty = ArtistSource::<u32>::new(vec![]);
        let mut sink = InMemorySink::new();
        let err = drive_once(
            &mut empty,
            &mut renderer(),
            &mut sink,
            Fps::new(10, 1).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, KinetoError::Validation(_)));

        let mut unbounded = FuncSource::unbounded(|_| Ok(()));
        let err = drive_once(
            &mut unbounded,
            &mut renderer(),
            &mut sink,
            Fps::new(10, 1).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, KinetoError::Validation(_)));
    }

    #[test]
    fn drive_paced_repeat_restarts_from_zero_until_stopped() {
        let mut src = ArtistSource::new(vec![1u8, 2]);
        let mut display = CountingDisplay::stop_after(5);
        drive_paced(
            &mut src,
            &mut renderer(),
            &mut display,
            Interval::from_millis(1).unwrap(),
            true,
        )
        .unwrap();

        let idxs: Vec<u64> = display.presented().iter().map(|i| i.0).collect();
        assert_eq!(idxs, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn drive_paced_without_repeat_plays_one_pass() {
        let mut src = ArtistSource::new(vec![1u8, 2, 3]);
        let mut display = CountingDisplay::new();
        drive_paced(
            &mut src,
            &mut renderer(),
            &mut display,
            Interval::from_millis(1).unwrap(),
            false,
        )
        .unwrap();
        assert_eq!(display.presented().len(), 3);
    }
}
