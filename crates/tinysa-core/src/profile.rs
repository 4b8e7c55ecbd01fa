//! Device profiles: the per-model bound constants consulted at validation time.
//!
//! A [`DeviceProfile`] is an immutable record describing one hardware variant
//! (screen geometry, analyzer and generator frequency coverage, attenuator
//! and LNA hardware). Concrete presets are built by the factory functions in
//! `tinysa::models`; this module only defines the shape and the
//! [`ProfileBound`] selectors that constraint tables use to refer to a
//! profile value without hardcoding it.

use std::fmt;

/// A contiguous frequency range in hertz, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyRange {
    /// Lower bound of the range in hertz (inclusive).
    pub low_hz: u64,
    /// Upper bound of the range in hertz (inclusive).
    pub high_hz: u64,
}

impl FrequencyRange {
    /// Create a new frequency range.
    pub const fn new(low_hz: u64, high_hz: u64) -> Self {
        FrequencyRange { low_hz, high_hz }
    }

    /// Check whether a frequency (in hertz) falls within this range (inclusive).
    pub fn contains(&self, freq_hz: u64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }
}

impl fmt::Display for FrequencyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} Hz", self.low_hz, self.high_hz)
    }
}

/// Output level range of the signal generator in dBm, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRange {
    pub min_dbm: i32,
    pub max_dbm: i32,
}

impl LevelRange {
    pub const fn new(min_dbm: i32, max_dbm: i32) -> Self {
        LevelRange { min_dbm, max_dbm }
    }
}

/// Touch screen geometry in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenGeometry {
    pub width: u16,
    pub height: u16,
    /// Diagonal size in inches.
    pub diagonal_in: f32,
}

/// One built-in low-noise amplifier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LnaStage {
    /// Frequency span over which the stage is usable.
    pub range: FrequencyRange,
    /// Nominal gain in dB.
    pub gain_db: u8,
}

/// Static description of one analyzer hardware variant.
///
/// Profiles are chosen once when a gateway is constructed and never mutated.
/// Frequency- and geometry-dependent commands (`freq`, `touch`, `scan`)
/// resolve their bounds through [`DeviceProfile::bound`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    /// Human-readable product name (e.g. "tinySA Ultra").
    pub name: &'static str,
    /// Hardware revision identifier (e.g. "ZS405").
    pub model_id: &'static str,
    /// Touch screen geometry.
    pub screen: ScreenGeometry,
    /// Maximum number of sweep points shown on screen.
    pub display_points: u16,
    /// Spectrum-analyzer input coverage across all input modes.
    pub sa_range: FrequencyRange,
    /// Spectrum-analyzer coverage in low input mode.
    pub sa_low: FrequencyRange,
    /// Spectrum-analyzer coverage in high input mode.
    pub sa_high: FrequencyRange,
    /// Coverage with ultra mode enabled, if the variant has it.
    pub sa_ultra: Option<FrequencyRange>,
    /// Coverage with harmonic mode enabled, if the variant has it.
    pub sa_harmonic: Option<FrequencyRange>,
    /// Signal-generator sine output coverage.
    pub sg_sine: Option<FrequencyRange>,
    /// Signal-generator square output coverage.
    pub sg_square: Option<FrequencyRange>,
    /// Generator output level in low output mode.
    pub output_level_low: LevelRange,
    /// Generator output level in high output mode.
    pub output_level_high: LevelRange,
    /// Resolution bandwidth filter span.
    pub rbw: FrequencyRange,
    /// Internal step attenuator bounds in dB, inclusive.
    pub attenuator_db: (u8, u8),
    /// Built-in LNA stages; empty when the variant has none.
    pub lna_stages: Vec<LnaStage>,
    pub has_sd_card: bool,
    /// Full-scale raw battery reading.
    pub max_battery_raw: u16,
    /// Modulation frequency span in output mode.
    pub modulation: FrequencyRange,
    /// Offset in dB subtracted from scaled `scanraw` samples.
    pub scanraw_offset_db: f64,
}

impl DeviceProfile {
    /// Whether the variant has at least one internal LNA.
    pub fn has_lna(&self) -> bool {
        !self.lna_stages.is_empty()
    }

    /// Whether the variant supports ultra mode.
    pub fn has_ultra_mode(&self) -> bool {
        self.sa_ultra.is_some()
    }

    /// Resolve a [`ProfileBound`] selector to a concrete integer.
    pub fn bound(&self, which: ProfileBound) -> i64 {
        match which {
            ProfileBound::SaMinHz => self.sa_range.low_hz as i64,
            ProfileBound::SaMaxHz => self.sa_range.high_hz as i64,
            ProfileBound::ScreenWidth => i64::from(self.screen.width),
            ProfileBound::ScreenHeight => i64::from(self.screen.height),
            ProfileBound::DisplayPoints => i64::from(self.display_points),
        }
    }
}

/// A named profile value usable as an argument bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileBound {
    /// Lowest spectrum-analyzer input frequency in hertz.
    SaMinHz,
    /// Highest spectrum-analyzer input frequency in hertz.
    SaMaxHz,
    /// Screen width in pixels.
    ScreenWidth,
    /// Screen height in pixels.
    ScreenHeight,
    /// Maximum on-screen sweep points.
    DisplayPoints,
}

impl fmt::Display for ProfileBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProfileBound::SaMinHz => "sa_min",
            ProfileBound::SaMaxHz => "sa_max",
            ProfileBound::ScreenWidth => "screen_width",
            ProfileBound::ScreenHeight => "screen_height",
            ProfileBound::DisplayPoints => "display_points",
        };
        write!(f, "{s}")
    }
}
