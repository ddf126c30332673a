use std::cell::RefCell;
use std::rc::Rc;

use kineto::{
    Animation, Canvas, CountingDisplay, Fps, FrameIndex, FrameRgba, InMemorySink, Interval,
    KinetoError, KinetoResult, Renderer, SaveOpts,
};

struct StampFigure {
    canvas: Canvas,
}

impl Renderer<u8> for StampFigure {
    fn canvas(&self) -> Canvas {
        self.canvas
    }

    fn render(&mut self, _frame: FrameIndex, artists: &u8) -> KinetoResult<FrameRgba> {
        // Stamp the payload into the pixels so output order is observable.
        Ok(FrameRgba::solid(self.canvas, [*artists, 0, 0, 255]))
    }
}

fn figure() -> StampFigure {
    StampFigure {
        canvas: Canvas::new(2, 2).unwrap(),
    }
}

#[test]
fn function_mode_invokes_update_exactly_n_times_in_increasing_order() {
    for n in [1u64, 2, 7, 40] {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = seen.clone();
        let mut ani = Animation::func(figure(), n, Interval::default(), move |f| {
            seen_in.borrow_mut().push(f.0);
            Ok(f.0 as u8)
        });

        let mut sink = InMemorySink::new();
        let written = ani.save_with(&mut sink, Fps::new(30, 1).unwrap()).unwrap();

        assert_eq!(written, n);
        let expected: Vec<u64> = (0..n).collect();
        assert_eq!(*seen.borrow(), expected, "n = {n}");
    }
}

#[test]
fn artist_list_playback_preserves_order_and_length() {
    let snapshots: Vec<u8> = vec![5, 1, 9, 9, 3];
    let mut ani = Animation::artists(figure(), snapshots.clone(), Interval::default());

    let mut sink = InMemorySink::new();
    ani.save_with(&mut sink, Fps::new(10, 1).unwrap()).unwrap();

    assert_eq!(sink.frames().len(), snapshots.len());
    for (i, (idx, frame)) in sink.frames().iter().enumerate() {
        assert_eq!(idx.0, i as u64);
        assert_eq!(frame.data[0], snapshots[i], "snapshot {i} out of order");
    }
}

#[test]
fn interval_and_fps_are_independent() {
    let interval = Interval::from_millis(30).unwrap();
    let fps = Fps::new(12, 1).unwrap();
    let mut ani = Animation::artists(figure(), vec![1u8, 2], interval);

    let mut sink = InMemorySink::new();
    ani.save_with(&mut sink, fps).unwrap();

    // The sink sees the save fps untouched by the display interval, and the
    // animation's interval is untouched by the save.
    assert_eq!(sink.config().unwrap().fps, fps);
    assert_eq!(ani.interval(), interval);

    let mut sink2 = InMemorySink::new();
    let other_fps = Fps::new(60, 1).unwrap();
    ani.save_with(&mut sink2, other_fps).unwrap();
    assert_eq!(sink2.config().unwrap().fps, other_fps);
    assert_eq!(ani.interval(), interval);
}

#[test]
fn show_repeats_artist_list_until_display_stops() {
    let mut ani = Animation::artists(figure(), vec![1u8, 2, 3], Interval::from_millis(1).unwrap());
    let mut display = CountingDisplay::stop_after(7);
    ani.show(&mut display).unwrap();

    let idxs: Vec<u64> = display.presented().iter().map(|i| i.0).collect();
    assert_eq!(idxs, vec![0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn show_without_repeat_runs_one_pass() {
    let mut ani = Animation::artists(figure(), vec![1u8, 2, 3], Interval::from_millis(1).unwrap())
        .with_repeat(false);
    let mut display = CountingDisplay::new();
    ani.show(&mut display).unwrap();
    assert_eq!(display.presented().len(), 3);
}

#[test]
fn empty_animation_refuses_to_save_or_show() {
    let mut ani = Animation::artists(figure(), Vec::<u8>::new(), Interval::default());
    let mut sink = InMemorySink::new();
    assert!(matches!(
        ani.save_with(&mut sink, Fps::new(10, 1).unwrap()),
        Err(KinetoError::Validation(_))
    ));
    let mut display = CountingDisplay::new();
    assert!(matches!(
        ani.show(&mut display),
        Err(KinetoError::Validation(_))
    ));
}

#[test]
fn unbounded_animation_shows_but_refuses_to_save() {
    let mut ani = Animation::func_unbounded(figure(), Interval::from_millis(1).unwrap(), |f| {
        Ok(f.0 as u8)
    });

    let mut display = CountingDisplay::stop_after(5);
    ani.show(&mut display).unwrap();
    assert_eq!(display.presented().len(), 5);

    let mut sink = InMemorySink::new();
    assert!(matches!(
        ani.save_with(&mut sink, Fps::new(10, 1).unwrap()),
        Err(KinetoError::Validation(_))
    ));
}

#[test]
fn update_error_propagates_and_aborts_the_sequence() {
    let calls = Rc::new(RefCell::new(0u64));
    let calls_in = calls.clone();
    let mut ani = Animation::func(figure(), 10, Interval::default(), move |f| {
        *calls_in.borrow_mut() += 1;
        if f.0 == 3 {
            return Err(KinetoError::sequence("update blew up"));
        }
        Ok(0u8)
    });

    let mut sink = InMemorySink::new();
    let err = ani
        .save_with(&mut sink, Fps::new(10, 1).unwrap())
        .unwrap_err();
    assert!(matches!(err, KinetoError::Sequence(_)));
    // Frames 0..=3 were attempted, nothing after the failure.
    assert_eq!(*calls.borrow(), 4);
    assert_eq!(sink.frames().len(), 3);
}

#[test]
fn named_writer_with_bad_extension_fails_before_any_output() {
    // The named-writer path resolves the writer before constructing a sink;
    // a bad extension must fail without touching the filesystem.
    let mut ani = Animation::artists(figure(), vec![1u8], Interval::default());
    let err = ani
        .save(
            "/tmp/kineto_never_written.xyz",
            "ffmpeg",
            SaveOpts::new(Fps::new(10, 1).unwrap()),
        )
        .unwrap_err();
    assert!(matches!(err, KinetoError::Validation(_)));
    assert!(!std::path::Path::new("/tmp/kineto_never_written.xyz").exists());
}
