//! Palette sequences that drive the glow animation.
//!
//! A sequence document is a JSON array of steps. Each step carries a palette
//! (colour stops indexed by a normalised distance) plus fade and hold
//! durations. Everything in here is validated eagerly: once a [`Sequence`]
//! exists, the player and renderer can treat it as well formed.
//!
//! ```json
//! [
//!   { "stops": [{ "colour": "#0b0b2a", "distance": 0.0 },
//!               { "colour": "#ff7a3c", "distance": 1.0 }],
//!     "fade": 4000, "hold": "2s" }
//! ]
//! ```
//!
//! Durations given as numbers are milliseconds; strings go through
//! `humantime`. The object form `{ "steps": [...] }` is accepted as well.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("failed to parse sequence document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read sequence document at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sequence: {0}")]
    Invalid(String),
}

impl SequenceError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Linear RGB triple with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parses a `#RRGGBB` colour string.
    pub fn from_hex(raw: &str) -> Result<Self, SequenceError> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix('#').ok_or_else(|| {
            SequenceError::invalid(format!("colour '{raw}' must start with '#'"))
        })?;
        if digits.len() != 6 || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(SequenceError::invalid(format!(
                "colour '{raw}' is not a #RRGGBB hex string"
            )));
        }
        let packed = u32::from_str_radix(digits, 16)
            .map_err(|err| SequenceError::invalid(format!("colour '{raw}': {err}")))?;
        let channel = |shift: u32| ((packed >> shift) & 0xff) as f32 / 255.0;
        Ok(Self::new(channel(16), channel(8), channel(0)))
    }

    pub fn to_hex(self) -> String {
        let quantise = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            quantise(self.r),
            quantise(self.g),
            quantise(self.b)
        )
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Component-wise `a * (1 - t) + b * t`; exact at both ends.
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let mix = |a: f32, b: f32| a * (1.0 - t) + b * t;
        Rgb::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
        )
    }

    pub fn scale(self, factor: f32) -> Rgb {
        Rgb::new(self.r * factor, self.g * factor, self.b * factor)
    }
}

impl FromStr for Rgb {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One anchor of a palette.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub colour: Rgb,
    pub distance: f32,
}

impl ColorStop {
    pub const fn new(colour: Rgb, distance: f32) -> Self {
        Self { colour, distance }
    }
}

/// Non-empty list of colour stops ordered by increasing distance.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    stops: Vec<ColorStop>,
}

impl Palette {
    /// Builds a palette, clamping distances into `[0, 1]` and ordering stops.
    ///
    /// Duplicate distances are kept; the evaluator resolves them to the later
    /// stop.
    pub fn new(mut stops: Vec<ColorStop>) -> Result<Self, SequenceError> {
        if stops.is_empty() {
            return Err(SequenceError::invalid(
                "palette must contain at least one colour stop",
            ));
        }

        for stop in &mut stops {
            if !stop.distance.is_finite() {
                return Err(SequenceError::invalid(format!(
                    "colour stop {} has a non-finite distance",
                    stop.colour
                )));
            }
            if !(0.0..=1.0).contains(&stop.distance) {
                let clamped = stop.distance.clamp(0.0, 1.0);
                warn!(
                    colour = %stop.colour,
                    distance = stop.distance,
                    clamped,
                    "colour stop distance outside [0, 1]; clamping"
                );
                stop.distance = clamped;
            }
        }

        let sorted = stops
            .windows(2)
            .all(|pair| pair[0].distance <= pair[1].distance);
        if !sorted {
            warn!("colour stops are not ordered by distance; sorting");
            stops.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        }

        Ok(Self { stops })
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn first(&self) -> ColorStop {
        self.stops[0]
    }

    pub fn last(&self) -> ColorStop {
        self.stops[self.stops.len() - 1]
    }
}

/// A palette plus its cross-fade and hold windows.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    palette: Palette,
    fade: Duration,
    hold: Duration,
}

impl Step {
    pub fn new(palette: Palette, fade: Duration, hold: Duration) -> Result<Self, SequenceError> {
        if fade.is_zero() {
            return Err(SequenceError::invalid(
                "fade duration must be greater than zero",
            ));
        }
        if fade.checked_add(hold).is_none() {
            return Err(SequenceError::invalid("fade + hold is too long"));
        }
        Ok(Self {
            palette,
            fade,
            hold,
        })
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn fade(&self) -> Duration {
        self.fade
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// Length of one full fade + hold cycle.
    pub fn cycle(&self) -> Duration {
        self.fade + self.hold
    }
}

/// Cyclic, immutable list of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    steps: Vec<Step>,
}

impl Sequence {
    pub fn new(steps: Vec<Step>) -> Result<Self, SequenceError> {
        if steps.is_empty() {
            return Err(SequenceError::invalid(
                "sequence must contain at least one step",
            ));
        }
        let lap = steps
            .iter()
            .try_fold(Duration::ZERO, |total, step| total.checked_add(step.cycle()));
        if lap.is_none() {
            return Err(SequenceError::invalid(
                "combined length of all steps is too long",
            ));
        }
        Ok(Self { steps })
    }

    pub fn from_json_str(input: &str) -> Result<Self, SequenceError> {
        let document: serde_json::Value = serde_json::from_str(input)?;
        let raw_steps: Vec<RawStep> = match document {
            serde_json::Value::Array(items) => {
                serde_json::from_value(serde_json::Value::Array(items))?
            }
            serde_json::Value::Object(mut map) => match map.remove("steps") {
                Some(steps) => serde_json::from_value(steps)?,
                None => {
                    return Err(SequenceError::invalid(
                        "sequence object must contain a `steps` array",
                    ))
                }
            },
            _ => {
                return Err(SequenceError::invalid(
                    "sequence document must be an array of steps",
                ))
            }
        };

        let steps = raw_steps
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                raw.into_step().map_err(|err| match err {
                    SequenceError::Invalid(message) => {
                        SequenceError::Invalid(format!("step {index}: {message}"))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(steps)
    }

    pub fn load(path: &Path) -> Result<Self, SequenceError> {
        let contents = fs::read_to_string(path).map_err(|source| SequenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at `index`, wrapping around the end of the sequence.
    pub fn step(&self, index: usize) -> &Step {
        &self.steps[index % self.steps.len()]
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.steps.len()
    }

    /// Sum of every step's cycle.
    pub fn total_cycle(&self) -> Duration {
        self.steps.iter().map(Step::cycle).sum()
    }

    /// Widest palette in the sequence.
    pub fn max_palette_len(&self) -> usize {
        self.steps
            .iter()
            .map(|step| step.palette.len())
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    stops: Vec<RawStop>,
    #[serde(deserialize_with = "deserialize_millis")]
    fade: Duration,
    #[serde(default, deserialize_with = "deserialize_millis")]
    hold: Duration,
}

#[derive(Debug, Deserialize)]
struct RawStop {
    #[serde(alias = "color")]
    colour: String,
    distance: f32,
}

impl RawStep {
    fn into_step(self) -> Result<Step, SequenceError> {
        let stops = self
            .stops
            .into_iter()
            .map(|raw| Ok(ColorStop::new(Rgb::from_hex(&raw.colour)?, raw.distance)))
            .collect::<Result<Vec<_>, SequenceError>>()?;
        Step::new(Palette::new(stops)?, self.fade, self.hold)
    }
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as milliseconds or a human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v.trim())
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_millis(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_millis(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be a non-negative number"));
            }
            Duration::try_from_secs_f64(v / 1000.0)
                .map_err(|err| E::custom(format!("duration {v}ms is out of range: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
[
  {
    "stops": [
      { "colour": "#000000", "distance": 0.0 },
      { "colour": "#ffffff", "distance": 1.0 }
    ],
    "fade": 1000,
    "hold": 500
  },
  {
    "stops": [
      { "color": "#FF8000", "distance": 0.25 }
    ],
    "fade": "2s"
  }
]
"##;

    #[test]
    fn parses_sample_document() {
        let sequence = Sequence::from_json_str(SAMPLE).expect("parse sequence");
        assert_eq!(sequence.len(), 2);

        let first = sequence.step(0);
        assert_eq!(first.fade(), Duration::from_millis(1000));
        assert_eq!(first.hold(), Duration::from_millis(500));
        assert_eq!(first.cycle(), Duration::from_millis(1500));
        assert_eq!(first.palette().first().colour, Rgb::BLACK);
        assert_eq!(first.palette().last().colour, Rgb::WHITE);

        let second = sequence.step(1);
        assert_eq!(second.fade(), Duration::from_secs(2));
        assert_eq!(second.hold(), Duration::ZERO);
        assert_eq!(second.palette().first().colour.to_hex(), "#ff8000");
        assert_eq!(sequence.total_cycle(), Duration::from_millis(3500));
    }

    #[test]
    fn accepts_wrapped_steps_object() {
        let sequence = Sequence::from_json_str(
            r##"{ "steps": [ { "stops": [{ "colour": "#102030", "distance": 0.5 }], "fade": 10 } ] }"##,
        )
        .expect("parse wrapped sequence");
        assert_eq!(sequence.len(), 1);
        assert_eq!(sequence.next_index(0), 0);
    }

    #[test]
    fn rejects_empty_sequence() {
        let err = Sequence::from_json_str("[]").unwrap_err();
        assert!(matches!(err, SequenceError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_palette() {
        let err = Sequence::from_json_str(r#"[{ "stops": [], "fade": 100 }]"#).unwrap_err();
        assert!(matches!(err, SequenceError::Invalid(ref msg) if msg.starts_with("step 0")));
    }

    #[test]
    fn rejects_zero_fade() {
        let err = Sequence::from_json_str(
            r##"[{ "stops": [{ "colour": "#ffffff", "distance": 0 }], "fade": 0 }]"##,
        )
        .unwrap_err();
        assert!(matches!(err, SequenceError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_duration() {
        let err = Sequence::from_json_str(
            r##"[{ "stops": [{ "colour": "#ffffff", "distance": 0 }], "fade": -5 }]"##,
        )
        .unwrap_err();
        assert!(matches!(err, SequenceError::Parse(_)));
    }

    #[test]
    fn rejects_durations_too_large_to_represent() {
        let err = Sequence::from_json_str(
            r##"[{ "stops": [{ "colour": "#ffffff", "distance": 0 }], "fade": 1e30 }]"##,
        )
        .unwrap_err();
        assert!(matches!(err, SequenceError::Parse(_)));
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn rejects_cycles_that_overflow() {
        let palette = Palette::new(vec![ColorStop::new(Rgb::WHITE, 0.0)]).unwrap();
        let half = Duration::MAX / 2;
        assert!(Step::new(palette.clone(), Duration::MAX, Duration::from_secs(1)).is_err());

        let step = Step::new(palette, half, Duration::ZERO).unwrap();
        let err = Sequence::new(vec![step.clone(), step.clone(), step]).unwrap_err();
        assert!(matches!(err, SequenceError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_colours() {
        for raw in ["ffffff", "#fff", "#gggggg", "#1234567", ""] {
            assert!(Rgb::from_hex(raw).is_err(), "{raw} should be rejected");
        }
        let rgb: Rgb = "#3366CC".parse().expect("parse colour");
        assert!((rgb.r - 0.2).abs() < 1e-6);
        assert!((rgb.g - 0.4).abs() < 1e-6);
        assert!((rgb.b - 0.8).abs() < 1e-6);
    }

    #[test]
    fn palette_clamps_and_orders_stops() {
        let palette = Palette::new(vec![
            ColorStop::new(Rgb::WHITE, 1.4),
            ColorStop::new(Rgb::BLACK, -0.2),
            ColorStop::new(Rgb::new(0.5, 0.5, 0.5), 0.5),
        ])
        .expect("palette");
        let distances: Vec<f32> = palette.stops().iter().map(|s| s.distance).collect();
        assert_eq!(distances, vec![0.0, 0.5, 1.0]);
        assert_eq!(palette.first().colour, Rgb::BLACK);
        assert_eq!(palette.last().colour, Rgb::WHITE);
    }

    #[test]
    fn palette_rejects_nan_distance() {
        let err = Palette::new(vec![ColorStop::new(Rgb::WHITE, f32::NAN)]).unwrap_err();
        assert!(matches!(err, SequenceError::Invalid(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Sequence::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, SequenceError::Io { .. }));
    }
}
