use crate::error::{KinetoError, KinetoResult};

/// Absolute 0-based frame index in animation timeline space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
///
/// This rate applies only when an animation is saved; live playback is paced
/// by [`Interval`] and the two never convert into each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> KinetoResult<Self> {
        if den == 0 {
            return Err(KinetoError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(KinetoError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one saved frame in milliseconds, rounded to the nearest ms.
    pub fn frame_millis(self) -> u64 {
        let ms = 1000.0 * f64::from(self.den) / f64::from(self.num);
        ms.round().max(1.0) as u64
    }

    /// Duration of one saved frame in ImageMagick ticks (1/100 s).
    pub fn frame_ticks(self) -> u64 {
        let ticks = 100.0 * f64::from(self.den) / f64::from(self.num);
        ticks.round().max(1.0) as u64
    }
}

/// Milliseconds between two displayed frames.
///
/// Applies only to live playback ([`crate::Animation::show`]); saving uses
/// [`Fps`] instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Interval(u64);

impl Interval {
    /// Create a validated interval from milliseconds.
    pub fn from_millis(millis: u64) -> KinetoResult<Self> {
        if millis == 0 {
            return Err(KinetoError::validation("Interval must be > 0 ms"));
        }
        Ok(Self(millis))
    }

    /// The interval in milliseconds.
    pub fn millis(self) -> u64 {
        self.0
    }

    /// The interval as a [`std::time::Duration`].
    pub fn as_duration(self) -> std::time::Duration {
        std::time::Duration::from_millis(self.0)
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self(200)
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create validated canvas dimensions.
    pub fn new(width: u32, height: u32) -> KinetoResult<Self> {
        if width == 0 || height == 0 {
            return Err(KinetoError::validation("Canvas width/height must be non-zero"));
        }
        Ok(Self { width, height })
    }

    /// Byte length of one RGBA8 frame on this canvas.
    pub fn rgba_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_rejects_zero_parts() {
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(30, 0).is_err());
        assert!(Fps::new(30, 1).is_ok());
    }

    #[test]
    fn fps_frame_millis_rounds() {
        assert_eq!(Fps::new(30, 1).unwrap().frame_millis(), 33);
        assert_eq!(Fps::new(5, 1).unwrap().frame_millis(), 200);
        // Very high rates never collapse to zero.
        assert_eq!(Fps::new(10_000, 1).unwrap().frame_millis(), 1);
    }

    #[test]
    fn fps_frame_ticks_for_magick_delay() {
        assert_eq!(Fps::new(20, 1).unwrap().frame_ticks(), 5);
        assert_eq!(Fps::new(100, 1).unwrap().frame_ticks(), 1);
    }

    #[test]
    fn interval_rejects_zero() {
        assert!(Interval::from_millis(0).is_err());
        assert_eq!(Interval::from_millis(30).unwrap().millis(), 30);
        assert_eq!(Interval::default().millis(), 200);
    }

    #[test]
    fn canvas_rgba_len() {
        let c = Canvas::new(4, 3).unwrap();
        assert_eq!(c.rgba_len(), 48);
        assert!(Canvas::new(0, 3).is_err());
    }
}
