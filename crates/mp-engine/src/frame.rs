//! Audio frame type.

/// A stereo audio frame (16-bit integer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0, right: 0 }
    }

    /// Quantize a normalized stereo pair, clipping outside -1..1.
    pub fn from_normalized(left: f32, right: f32) -> Self {
        Self {
            left: quantize(left),
            right: quantize(right),
        }
    }
}

fn quantize(v: f32) -> i16 {
    (v.clamp(-1.0, 1.0) * 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantizes_and_clips() {
        assert_eq!(Frame::from_normalized(0.0, 0.0), Frame::silence());
        assert_eq!(Frame::from_normalized(1.0, -1.0), Frame { left: 32767, right: -32767 });
        assert_eq!(Frame::from_normalized(3.0, -3.0), Frame { left: 32767, right: -32767 });
        assert_eq!(Frame::from_normalized(0.5, 0.0).left, 16383);
        assert_ne!(Frame::from_normalized(0.5, 0.0), Frame::silence());
    }
}
