//! kineto is a minimal frame-sequencing animation engine.
//!
//! An animation is a sequence of frames. Frames come from one of two kinds
//! of source:
//!
//! - *function mode* ([`FuncSource`]): an update procedure is invoked once
//!   per frame, mutating persistent figure state and returning the drawables
//!   it touched;
//! - *artist-list mode* ([`ArtistSource`]): every frame snapshot is built
//!   before playback starts and replayed in list order.
//!
//! The engine drives either source strictly in order through a [`Renderer`]
//! (the external plotting surface seam) and into a live [`Display`] paced at
//! the configured interval, or into a writer that encodes a media file at an
//! independent frame rate. Writers are selected by name from a small
//! registry ([`WriterId`]); pipe- and file-based writers delegate to the
//! external `ffmpeg` or ImageMagick binaries, while the `image` and `html`
//! writers run fully in-process.
#![forbid(unsafe_code)]

pub mod animation;
pub mod core;
pub mod display;
pub mod encode_ffmpeg;
pub mod encode_html;
pub mod encode_image;
pub mod encode_magick;
pub mod error;
pub mod render;
pub mod sequencer;
pub mod sink;
pub mod source;
pub mod writers;

pub use crate::animation::{Animation, SaveOpts};
pub use crate::core::{Canvas, Fps, FrameIndex, Interval};
pub use crate::display::{CountingDisplay, Display, DisplayControl};
pub use crate::error::{KinetoError, KinetoResult};
pub use crate::render::{FrameRgba, Renderer};
pub use crate::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::source::{ArtistSource, FrameSource, FuncSource};
pub use crate::writers::{WriterId, output_format, resolve};
