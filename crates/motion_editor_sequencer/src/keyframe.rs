// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for the sequencer.
//!
//! Each track holds exactly one keyframe variant; [`KeyframeKind`] is the tag
//! a track declares and [`Keyframe`] the closed sum over the three records.

use crate::easing::{Easing, Rgba};
use crate::geometry::{Point, PolarOffset};
use serde::{Deserialize, Serialize};

/// Keyframe variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyframeKind {
    /// Head position with Bezier handles
    Head,
    /// Antenna position or waveform
    Antenna,
    /// LED color
    Led,
}

impl KeyframeKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Head => "Head",
            Self::Antenna => "Antenna",
            Self::Led => "LED",
        }
    }

    /// Fresh keyframe of this kind with default values
    pub fn default_keyframe(&self) -> Keyframe {
        match self {
            Self::Head => Keyframe::Head(HeadKeyframe::default()),
            Self::Antenna => Keyframe::Antenna(AntennaKeyframe::default()),
            Self::Led => Keyframe::Led(LedKeyframe::default()),
        }
    }
}

/// Color a LED transition starts from, overriding the previous keyframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedStart {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha in `[0, 1]`
    pub a: f64,
}

impl Default for LedStart {
    fn default() -> Self {
        Self { r: 0, g: 0, b: 0, a: 1.0 }
    }
}

impl LedStart {
    /// Channels as floats
    pub fn rgba(&self) -> Rgba {
        [f64::from(self.r), f64::from(self.g), f64::from(self.b), self.a]
    }
}

/// LED color keyframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedKeyframe {
    /// Hold the previous color instead of transitioning
    pub keep: bool,
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha in `[0, 1]`
    pub a: f64,
    /// Transition curve into this keyframe
    #[serde(rename = "bezierPoints")]
    pub easing: Easing,
    /// Optional explicit start color
    #[serde(rename = "startPoint")]
    pub start: Option<LedStart>,
}

impl Default for LedKeyframe {
    fn default() -> Self {
        Self {
            keep: false,
            r: 0,
            g: 0,
            b: 0,
            a: 1.0,
            easing: Easing::default(),
            start: None,
        }
    }
}

impl LedKeyframe {
    /// Create an opaque color keyframe
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, ..Self::default() }
    }

    /// Channels as floats
    pub fn rgba(&self) -> Rgba {
        [f64::from(self.r), f64::from(self.g), f64::from(self.b), self.a]
    }

    /// Start override channels, transparent black when unset
    pub fn start_rgba(&self) -> Rgba {
        self.start.map_or([0.0; 4], |start| start.rgba())
    }

    /// CSS `rgba()` string, for UI layers
    pub fn to_rgba_string(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Antenna start override
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AntennaStart {
    /// Start position
    pub position: f64,
    /// Start frequency
    pub frequency: f64,
    /// Start amplitude
    pub amplitude: f64,
}

/// Antenna keyframe: either a position or a frequency/amplitude waveform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AntennaKeyframe {
    /// Use `position` rather than `frequency`/`amplitude`
    pub use_position: bool,
    /// Target position
    pub position: f64,
    /// Waveform frequency
    pub frequency: f64,
    /// Waveform amplitude
    pub amplitude: f64,
    /// Optional explicit start values
    #[serde(rename = "startPoint")]
    pub start: Option<AntennaStart>,
}

impl Default for AntennaKeyframe {
    fn default() -> Self {
        Self {
            use_position: true,
            position: 0.0,
            frequency: 0.0,
            amplitude: 0.0,
            start: None,
        }
    }
}

impl AntennaKeyframe {
    /// Position keyframe
    pub fn at_position(position: f64) -> Self {
        Self { position, ..Self::default() }
    }

    /// Waveform keyframe
    pub fn wave(frequency: f64, amplitude: f64) -> Self {
        Self {
            use_position: false,
            frequency,
            amplitude,
            ..Self::default()
        }
    }
}

/// Head position keyframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeadKeyframe {
    /// Hold position instead of moving
    pub keep: bool,
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
    /// Timing curve of the movement into this keyframe
    #[serde(rename = "bezierPoints")]
    pub easing: Easing,
    /// Incoming (0) and outgoing (1) path handles around the position
    #[serde(rename = "controlPoints")]
    pub handles: [PolarOffset; 2],
}

impl Default for HeadKeyframe {
    fn default() -> Self {
        Self {
            keep: false,
            x: 0.0,
            y: 0.0,
            easing: Easing::default(),
            handles: [PolarOffset::default(); 2],
        }
    }
}

impl HeadKeyframe {
    /// Keyframe at a position
    pub fn at(x: f64, y: f64) -> Self {
        Self { x, y, ..Self::default() }
    }

    /// Position as a point
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Absolute position of handle `index`
    pub fn handle_point(&self, index: usize) -> Option<Point> {
        self.handles.get(index).map(|h| h.resolve(self.position()))
    }
}

/// A keyframe of any variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Keyframe {
    /// Head keyframe
    Head(HeadKeyframe),
    /// Antenna keyframe
    Antenna(AntennaKeyframe),
    /// LED keyframe
    Led(LedKeyframe),
}

impl Keyframe {
    /// Variant tag
    pub fn kind(&self) -> KeyframeKind {
        match self {
            Self::Head(_) => KeyframeKind::Head,
            Self::Antenna(_) => KeyframeKind::Antenna,
            Self::Led(_) => KeyframeKind::Led,
        }
    }

    /// Easing curve, if the variant has one
    pub fn easing(&self) -> Option<&Easing> {
        match self {
            Self::Head(kf) => Some(&kf.easing),
            Self::Led(kf) => Some(&kf.easing),
            Self::Antenna(_) => None,
        }
    }

    /// Mutable easing curve, if the variant has one
    pub fn easing_mut(&mut self) -> Option<&mut Easing> {
        match self {
            Self::Head(kf) => Some(&mut kf.easing),
            Self::Led(kf) => Some(&mut kf.easing),
            Self::Antenna(_) => None,
        }
    }

    /// Whether this keyframe holds rather than transitions
    pub fn keep(&self) -> bool {
        match self {
            Self::Head(kf) => kf.keep,
            Self::Led(kf) => kf.keep,
            Self::Antenna(_) => false,
        }
    }

    /// Whether a start override is set
    pub fn has_start_override(&self) -> bool {
        match self {
            Self::Led(kf) => kf.start.is_some(),
            Self::Antenna(kf) => kf.start.is_some(),
            Self::Head(_) => false,
        }
    }

    /// Get as LED keyframe if possible
    pub fn as_led(&self) -> Option<&LedKeyframe> {
        match self {
            Self::Led(kf) => Some(kf),
            _ => None,
        }
    }

    /// Get as antenna keyframe if possible
    pub fn as_antenna(&self) -> Option<&AntennaKeyframe> {
        match self {
            Self::Antenna(kf) => Some(kf),
            _ => None,
        }
    }

    /// Get as head keyframe if possible
    pub fn as_head(&self) -> Option<&HeadKeyframe> {
        match self {
            Self::Head(kf) => Some(kf),
            _ => None,
        }
    }
}

impl From<HeadKeyframe> for Keyframe {
    fn from(kf: HeadKeyframe) -> Self {
        Self::Head(kf)
    }
}

impl From<AntennaKeyframe> for Keyframe {
    fn from(kf: AntennaKeyframe) -> Self {
        Self::Antenna(kf)
    }
}

impl From<LedKeyframe> for Keyframe {
    fn from(kf: LedKeyframe) -> Self {
        Self::Led(kf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_kind() {
        for kind in [KeyframeKind::Head, KeyframeKind::Antenna, KeyframeKind::Led] {
            assert_eq!(kind.default_keyframe().kind(), kind);
        }
        assert!(AntennaKeyframe::default().use_position);
        assert_eq!(LedKeyframe::default().a, 1.0);
    }

    #[test]
    fn test_led_field_names() {
        let kf = LedKeyframe::rgb(10, 20, 30);
        let json = serde_json::to_value(kf).unwrap();
        assert_eq!(json["r"], 10);
        assert!(json["startPoint"].is_null());
        assert_eq!(json["bezierPoints"].as_array().unwrap().len(), 4);
        assert_eq!(json["bezierPoints"][0]["y"], 1.0);
    }

    #[test]
    fn test_partial_head_uses_defaults() {
        let kf: HeadKeyframe = serde_json::from_str(r#"{"x": 3, "y": 4}"#).unwrap();
        assert_eq!(kf.position(), Point::new(3.0, 4.0));
        assert!(!kf.keep);
        assert_eq!(kf.easing, Easing::linear());
    }

    #[test]
    fn test_head_handle_point() {
        let mut kf = HeadKeyframe::at(5.0, 5.0);
        kf.handles[1] = PolarOffset::new(0.0, 2.0);
        assert_eq!(kf.handle_point(1), Some(Point::new(7.0, 5.0)));
        assert_eq!(kf.handle_point(2), None);
    }

    #[test]
    fn test_start_rgba_defaults_transparent() {
        let mut kf = LedKeyframe::rgb(1, 2, 3);
        assert_eq!(kf.start_rgba(), [0.0; 4]);
        kf.start = Some(LedStart { r: 9, ..LedStart::default() });
        assert_eq!(kf.start_rgba(), [9.0, 0.0, 0.0, 1.0]);
    }
}
