// SPDX-License-Identifier: MIT OR Apache-2.0
//! Device motion export.
//!
//! The device interpolates on its own, so export only lays out curve
//! parameters: one transition per keyframe, each with the time elapsed since
//! the previous keyframe of the same track. The preview helpers at the end
//! of this module compute what the editor draws between keyframes.

use crate::project::FrameScale;
use motion_editor_sequencer::document::{
    ANTENNA_TRACK, CHEEK_LEFT_TRACK, CHEEK_RIGHT_TRACK, FUNCTION_LED_TRACK, HEAD_TRACK,
    PLAY_LED_TRACK, RECORD_LED_TRACK,
};
use motion_editor_sequencer::{
    gradient, AntennaStart, Document, Frame, HeadKeyframe, Keyframe, Point, Rgba, Track,
};
use serde::{Deserialize, Serialize};

/// Optional 2-D point; `[null, null]` in JSON
pub type OptPoint = [Option<f64>; 2];

/// Optional RGBA channels; `[null, null, null, null]` in JSON
pub type LedChannels = (Option<u8>, Option<u8>, Option<u8>, Option<f64>);

const NO_POINT: OptPoint = [None, None];
const NO_CHANNELS: LedChannels = (None, None, None, None);
const NO_EASE: [f64; 4] = [0.0; 4];

fn point(p: Point) -> OptPoint {
    [Some(p.x), Some(p.y)]
}

/// Sound reference for the device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundExport {
    /// Playback delay in milliseconds
    pub delay_ms: f64,
    /// File base name
    pub name: String,
}

/// One head movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadTransition {
    /// Time since the previous keyframe (or since start for the first one)
    pub duration: u64,
    /// Start anchor; the device does not take one, always null
    pub p0: OptPoint,
    /// Outgoing handle of the previous moving keyframe
    pub p1: OptPoint,
    /// Incoming handle of this keyframe
    pub p2: OptPoint,
    /// Target position
    pub p3: OptPoint,
    /// Easing handles with a bottom-left origin
    pub ease: [f64; 4],
}

/// Antenna values; unused ones are null
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AntennaValues {
    /// Amplitude
    pub amp: Option<f64>,
    /// Frequency
    pub freq: Option<f64>,
    /// Position
    pub pos: Option<f64>,
}

impl AntennaValues {
    fn new(use_position: bool, position: f64, frequency: f64, amplitude: f64) -> Self {
        if use_position {
            Self {
                pos: Some(position),
                ..Self::default()
            }
        } else {
            Self {
                amp: Some(amplitude),
                freq: Some(frequency),
                pos: None,
            }
        }
    }
}

/// One antenna change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntennaTransition {
    /// Time since the previous keyframe
    pub duration: u64,
    /// Explicit start values
    pub start: AntennaValues,
    /// Target values
    pub end: AntennaValues,
}

/// One LED color change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedTransition {
    /// Time since the previous keyframe
    pub duration: u64,
    /// Explicit start color
    pub start: LedChannels,
    /// Target color; null for a hold
    pub end: LedChannels,
    /// Easing handles with a bottom-left origin
    pub ease: [f64; 4],
}

/// Device motion document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Sound reference
    pub sound: SoundExport,
    /// Head transitions
    pub head: Vec<HeadTransition>,
    /// Antenna transitions
    pub antenna: Vec<AntennaTransition>,
    /// Left cheek LED
    pub led_cheek_l: Vec<LedTransition>,
    /// Right cheek LED
    pub led_cheek_r: Vec<LedTransition>,
    /// Record LED
    pub led_rec: Vec<LedTransition>,
    /// Play LED
    pub led_play: Vec<LedTransition>,
    /// Function LED
    pub led_func: Vec<LedTransition>,
}

impl ExportDocument {
    /// Serialize to JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize to indented JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Duration of each keyframe relative to the one before it
fn durations<'a, K>(keyframes: K) -> impl Iterator<Item = (u64, &'a Keyframe)>
where
    K: IntoIterator<Item = (u64, &'a Keyframe)>,
{
    let mut previous = 0;
    keyframes.into_iter().map(move |(key, keyframe)| {
        let duration = key.saturating_sub(previous);
        previous = key;
        (duration, keyframe)
    })
}

/// Head transitions for keyframes in ascending key order. Non-head keyframes are ignored.
pub fn head_transitions<'a>(keyframes: impl IntoIterator<Item = (u64, &'a Keyframe)>) -> Vec<HeadTransition> {
    let mut moving: Option<&HeadKeyframe> = None;
    let mut transitions = Vec::new();

    for (duration, keyframe) in durations(keyframes) {
        let Some(kf) = keyframe.as_head() else {
            continue;
        };

        if kf.keep {
            transitions.push(HeadTransition {
                duration,
                p0: NO_POINT,
                p1: NO_POINT,
                p2: NO_POINT,
                p3: NO_POINT,
                ease: NO_EASE,
            });
            continue;
        }

        let p1 = moving
            .and_then(|prev| prev.handle_point(1))
            .map_or(NO_POINT, point);
        let p2 = kf.handle_point(0).map_or(NO_POINT, point);
        transitions.push(HeadTransition {
            duration,
            p0: NO_POINT,
            p1,
            p2,
            p3: point(kf.position()),
            ease: kf.easing.device_handles(),
        });
        moving = Some(kf);
    }

    transitions
}

/// Antenna transitions for keyframes in ascending key order
pub fn antenna_transitions<'a>(keyframes: impl IntoIterator<Item = (u64, &'a Keyframe)>) -> Vec<AntennaTransition> {
    durations(keyframes)
        .filter_map(|(duration, keyframe)| {
            let kf = keyframe.as_antenna()?;
            let start = kf.start.map_or_else(AntennaValues::default, |start| {
                AntennaValues::new(kf.use_position, start.position, start.frequency, start.amplitude)
            });
            Some(AntennaTransition {
                duration,
                start,
                end: AntennaValues::new(kf.use_position, kf.position, kf.frequency, kf.amplitude),
            })
        })
        .collect()
}

/// LED transitions for keyframes in ascending key order
pub fn led_transitions<'a>(keyframes: impl IntoIterator<Item = (u64, &'a Keyframe)>) -> Vec<LedTransition> {
    durations(keyframes)
        .filter_map(|(duration, keyframe)| {
            let kf = keyframe.as_led()?;
            let start = kf
                .start
                .map_or(NO_CHANNELS, |s| (Some(s.r), Some(s.g), Some(s.b), Some(s.a)));
            let (end, ease) = if kf.keep {
                (NO_CHANNELS, NO_EASE)
            } else {
                (
                    (Some(kf.r), Some(kf.g), Some(kf.b), Some(kf.a)),
                    kf.easing.device_handles(),
                )
            };
            Some(LedTransition {
                duration,
                start,
                end,
                ease,
            })
        })
        .collect()
}

/// Keyframes of a track keyed by milliseconds
fn timed(document: &Document, index: usize, scale: FrameScale) -> Vec<(u64, &Keyframe)> {
    document
        .track(index)
        .map(|track| track.iter().map(|(frame, kf)| (scale.frame_to_ms(frame), kf)).collect())
        .unwrap_or_default()
}

/// Convert a document into the device format
pub fn convert(document: &Document, scale: FrameScale) -> ExportDocument {
    let audio = &document.audio;
    let name = audio
        .path
        .as_deref()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let export = ExportDocument {
        sound: SoundExport {
            delay_ms: scale.frames_to_seconds(audio.delay_frames) * 1000.0,
            name,
        },
        head: head_transitions(timed(document, HEAD_TRACK, scale)),
        antenna: antenna_transitions(timed(document, ANTENNA_TRACK, scale)),
        led_cheek_l: led_transitions(timed(document, CHEEK_LEFT_TRACK, scale)),
        led_cheek_r: led_transitions(timed(document, CHEEK_RIGHT_TRACK, scale)),
        led_rec: led_transitions(timed(document, RECORD_LED_TRACK, scale)),
        led_play: led_transitions(timed(document, PLAY_LED_TRACK, scale)),
        led_func: led_transitions(timed(document, FUNCTION_LED_TRACK, scale)),
    };

    tracing::info!(
        "Exported motion: {} head, {} antenna transitions",
        export.head.len(),
        export.antenna.len()
    );
    export
}

/// Color the editor starts an LED transition from.
///
/// The keyframe's own start override wins. Otherwise the closest earlier
/// keyframe that is not a plain hold supplies it: its start override if it
/// is a hold, its color if not. With no such keyframe the start is
/// transparent black.
pub fn led_preview_start(track: &Track, frame: Frame) -> Rgba {
    let Some(kf) = track.get(frame).and_then(Keyframe::as_led) else {
        return [0.0; 4];
    };
    if kf.start.is_some() {
        return kf.start_rgba();
    }

    track
        .range(..frame)
        .rev()
        .filter_map(|(_, kf)| kf.as_led())
        .find(|prev| !prev.keep || prev.start.is_some())
        .map_or([0.0; 4], |prev| if prev.keep { prev.start_rgba() } else { prev.rgba() })
}

/// Preview gradient leading into the LED keyframe at `frame`
pub fn led_preview_gradient(track: &Track, frame: Frame, samples: usize) -> Vec<Rgba> {
    let Some(kf) = track.get(frame).and_then(Keyframe::as_led) else {
        return Vec::new();
    };
    let start = led_preview_start(track, frame);
    let end = if kf.keep { start } else { kf.rgba() };
    gradient(start, end, &kf.easing, samples)
}

/// Values the editor starts an antenna transition from.
///
/// Without a start override, values carry over from the previous keyframe
/// when both use the same mode; everything else starts at zero.
pub fn antenna_preview_start(track: &Track, frame: Frame) -> AntennaStart {
    let Some(kf) = track.get(frame).and_then(Keyframe::as_antenna) else {
        return AntennaStart::default();
    };
    if let Some(start) = kf.start {
        return start;
    }

    match track.keyframe_before(frame).and_then(|(_, prev)| prev.as_antenna()) {
        Some(prev) if prev.use_position && kf.use_position => AntennaStart {
            position: prev.position,
            ..AntennaStart::default()
        },
        Some(prev) if !prev.use_position && !kf.use_position => AntennaStart {
            position: 0.0,
            frequency: prev.frequency,
            amplitude: prev.amplitude,
        },
        _ => AntennaStart::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_editor_sequencer::{
        AntennaKeyframe, Audio, Easing, KeyframeKind, LedKeyframe, LedStart, PolarOffset,
    };
    use std::path::PathBuf;

    fn frames<'a>(track: &'a Track) -> impl Iterator<Item = (u64, &'a Keyframe)> {
        track.iter().map(|(frame, kf)| (u64::from(frame), kf))
    }

    #[test]
    fn test_head_scenario_in_frames() {
        let mut track = Track::new("Head", KeyframeKind::Head);
        track.insert(0, HeadKeyframe::at(0.0, 0.0).into()).unwrap();
        track.insert(10, HeadKeyframe::at(50.0, 50.0).into()).unwrap();

        let transitions = head_transitions(frames(&track));
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].duration, 0);
        assert_eq!(transitions[0].p1, [None, None]);
        assert_eq!(transitions[1].duration, 10);
        assert_eq!(transitions[1].p3, [Some(50.0), Some(50.0)]);
        assert_eq!(transitions[1].p1, [Some(0.0), Some(0.0)]);
        assert_eq!(transitions[1].p0, [None, None]);
        assert_eq!(transitions[1].ease, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_head_keep_is_skipped_for_p1() {
        let mut first = HeadKeyframe::at(10.0, 10.0);
        first.handles[1] = PolarOffset::new(0.0, 5.0);
        let hold = HeadKeyframe {
            keep: true,
            ..HeadKeyframe::at(99.0, 99.0)
        };

        let mut track = Track::new("Head", KeyframeKind::Head);
        track.insert(2, first.into()).unwrap();
        track.insert(4, hold.into()).unwrap();
        track.insert(9, HeadKeyframe::at(20.0, 0.0).into()).unwrap();

        let transitions = head_transitions(frames(&track));
        assert_eq!(transitions[0].duration, 2);
        assert_eq!(transitions[1].p3, [None, None]);
        assert_eq!(transitions[1].ease, [0.0; 4]);
        assert_eq!(transitions[2].duration, 5);
        assert_eq!(transitions[2].p1, [Some(15.0), Some(10.0)]);
    }

    #[test]
    fn test_antenna_nulls_unused_fields() {
        let mut wave = AntennaKeyframe::wave(2.0, 30.0);
        wave.start = Some(AntennaStart {
            position: 5.0,
            frequency: 1.0,
            amplitude: 10.0,
        });

        let mut track = Track::new("Antenna", KeyframeKind::Antenna);
        track.insert(3, AntennaKeyframe::at_position(45.0).into()).unwrap();
        track.insert(8, wave.into()).unwrap();

        let transitions = antenna_transitions(frames(&track));
        assert_eq!(transitions[0].start, AntennaValues::default());
        assert_eq!(transitions[0].end, AntennaValues { amp: None, freq: None, pos: Some(45.0) });
        assert_eq!(transitions[1].duration, 5);
        assert_eq!(transitions[1].start, AntennaValues { amp: Some(10.0), freq: Some(1.0), pos: None });
        assert_eq!(transitions[1].end, AntennaValues { amp: Some(30.0), freq: Some(2.0), pos: None });
    }

    #[test]
    fn test_led_hold_and_start() {
        let mut hold = LedKeyframe {
            keep: true,
            ..LedKeyframe::rgb(1, 2, 3)
        };
        hold.start = Some(LedStart { r: 9, g: 8, b: 7, a: 0.5 });

        let mut track = Track::new("LED", KeyframeKind::Led);
        track.insert(1, LedKeyframe::rgb(255, 128, 0).into()).unwrap();
        track.insert(6, hold.into()).unwrap();

        let transitions = led_transitions(frames(&track));
        assert_eq!(transitions[0].start, (None, None, None, None));
        assert_eq!(transitions[0].end, (Some(255), Some(128), Some(0), Some(1.0)));
        assert_eq!(transitions[1].start, (Some(9), Some(8), Some(7), Some(0.5)));
        assert_eq!(transitions[1].end, (None, None, None, None));
        assert_eq!(transitions[1].ease, [0.0; 4]);
    }

    #[test]
    fn test_convert_uses_milliseconds() {
        let document = Document::default()
            .add_keyframe(HEAD_TRACK, 3, HeadKeyframe::at(1.0, 2.0).into())
            .and_then(|d| d.add_keyframe(PLAY_LED_TRACK, 5, LedKeyframe::rgb(1, 1, 1).into()))
            .unwrap()
            .with_audio(Audio {
                name: "beep.wav".into(),
                path: Some(PathBuf::from("/sounds/beep.wav")),
                duration_frames: 20.0,
                delay_frames: 4.0,
            });

        let export = convert(&document, FrameScale::default());
        assert_eq!(export.head[0].duration, 300);
        assert_eq!(export.led_play[0].duration, 500);
        assert!(export.antenna.is_empty());
        assert!((export.sound.delay_ms - 400.0).abs() < 1e-9);
        assert_eq!(export.sound.name, "beep.wav");

        let json: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        assert_eq!(json["led_play"][0]["end"], serde_json::json!([1, 1, 1, 1.0]));
        assert_eq!(json["head"][0]["p0"], serde_json::json!([null, null]));
        assert!(json["led_func"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_led_preview_start() {
        let mut track = Track::new("LED", KeyframeKind::Led);
        track.insert(0, LedKeyframe::rgb(10, 20, 30).into()).unwrap();
        track
            .insert(
                2,
                LedKeyframe {
                    keep: true,
                    ..LedKeyframe::rgb(0, 0, 0)
                }
                .into(),
            )
            .unwrap();
        track.insert(5, LedKeyframe::rgb(200, 0, 0).into()).unwrap();

        // The plain hold at 2 is skipped
        assert_eq!(led_preview_start(&track, 5), [10.0, 20.0, 30.0, 1.0]);
        assert_eq!(led_preview_start(&track, 0), [0.0; 4]);

        let colors = led_preview_gradient(&track, 5, 2);
        assert_eq!(colors.len(), 2);
        assert!((colors[0][0] - 10.0).abs() < 0.1);
        assert!((colors[1][0] - 105.0).abs() < 0.1);
    }

    #[test]
    fn test_antenna_preview_start() {
        let mut track = Track::new("Antenna", KeyframeKind::Antenna);
        track.insert(0, AntennaKeyframe::at_position(30.0).into()).unwrap();
        track.insert(4, AntennaKeyframe::at_position(60.0).into()).unwrap();
        track.insert(8, AntennaKeyframe::wave(1.0, 2.0).into()).unwrap();

        assert_eq!(antenna_preview_start(&track, 4).position, 30.0);
        assert_eq!(antenna_preview_start(&track, 8), AntennaStart::default());
    }

    #[test]
    fn test_default_easing_exports_linear_handles() {
        assert_eq!(Easing::default().device_handles(), [0.0, 0.0, 1.0, 1.0]);
    }
}
