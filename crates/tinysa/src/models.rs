//! Device presets.
//!
//! Each supported analyzer variant is described by a [`DeviceProfile`]
//! returned from a factory function. The profile is chosen once when a
//! gateway is built and is consulted whenever a command's bounds depend on
//! the hardware (`freq`, `scan`, `touch`).
//!
//! | Model      | Screen  | Points | SA coverage      | LNA | SD  |
//! |------------|---------|--------|------------------|-----|-----|
//! | tinySA     | 320x240 | 290    | 100 kHz-960 MHz  | No  | No  |
//! | ZS405      | 480x320 | 450    | 100 kHz-5.3 GHz  | No  | Yes |
//! | ZS406      | 480x320 | 450    | 100 kHz-10 GHz   | 1   | Yes |
//! | ZS407      | 480x320 | 450    | 100 kHz-11 GHz   | 2   | Yes |

use tinysa_core::{DeviceProfile, FrequencyRange, LevelRange, LnaStage, ScreenGeometry};

const KHZ: u64 = 1_000;
const MHZ: u64 = 1_000_000;

/// Offset subtracted from scaled `scanraw` samples on the original tinySA.
const SCANRAW_OFFSET_BASIC: f64 = 128.0;
/// Offset subtracted from scaled `scanraw` samples on the Ultra family.
const SCANRAW_OFFSET_ULTRA: f64 = 174.0;

fn ultra_screen() -> ScreenGeometry {
    ScreenGeometry {
        width: 480,
        height: 320,
        diagonal_in: 4.0,
    }
}

/// The original tinySA (2.8" screen, up to 960 MHz).
///
/// Low input covers 100 kHz to 350 MHz, high input 240 MHz to 960 MHz. The
/// generator has a sine output on the low side and a square output on the
/// high side.
pub fn basic() -> DeviceProfile {
    DeviceProfile {
        name: "tinySA",
        model_id: "BASIC",
        screen: ScreenGeometry {
            width: 320,
            height: 240,
            diagonal_in: 2.8,
        },
        display_points: 290,
        sa_range: FrequencyRange::new(100 * KHZ, 960 * MHZ),
        sa_low: FrequencyRange::new(100 * KHZ, 350 * MHZ),
        sa_high: FrequencyRange::new(240 * MHZ, 960 * MHZ),
        sa_ultra: None,
        sa_harmonic: None,
        sg_sine: Some(FrequencyRange::new(100 * KHZ, 350 * MHZ)),
        sg_square: Some(FrequencyRange::new(240 * MHZ, 960 * MHZ)),
        output_level_low: LevelRange::new(-76, -7),
        output_level_high: LevelRange::new(-32, 16),
        rbw: FrequencyRange::new(3 * KHZ, 600 * KHZ),
        attenuator_db: (0, 31),
        lna_stages: Vec::new(),
        has_sd_card: false,
        max_battery_raw: 4095,
        modulation: FrequencyRange::new(50, 5 * KHZ),
        scanraw_offset_db: SCANRAW_OFFSET_BASIC,
    }
}

/// tinySA Ultra, hardware revision ZS405.
pub fn ultra_zs405() -> DeviceProfile {
    DeviceProfile {
        name: "tinySA Ultra",
        model_id: "ZS405",
        screen: ultra_screen(),
        display_points: 450,
        sa_range: FrequencyRange::new(100 * KHZ, 5_300 * MHZ),
        sa_low: FrequencyRange::new(100 * KHZ, 800 * MHZ),
        sa_high: FrequencyRange::new(100 * KHZ, 5_300 * MHZ),
        sa_ultra: Some(FrequencyRange::new(100 * KHZ, 5_300 * MHZ)),
        sa_harmonic: None,
        sg_sine: Some(FrequencyRange::new(100 * KHZ, 800 * MHZ)),
        sg_square: Some(FrequencyRange::new(100 * KHZ, 4_400 * MHZ)),
        output_level_low: LevelRange::new(-115, -19),
        output_level_high: LevelRange::new(-115, -19),
        rbw: FrequencyRange::new(200, 850 * KHZ),
        attenuator_db: (0, 31),
        lna_stages: Vec::new(),
        has_sd_card: true,
        max_battery_raw: 4095,
        modulation: FrequencyRange::new(50, 3_500),
        scanraw_offset_db: SCANRAW_OFFSET_ULTRA,
    }
}

/// tinySA Ultra Plus, hardware revision ZS406 (one LNA, up to 10 GHz in
/// harmonic mode).
pub fn ultra_plus_zs406() -> DeviceProfile {
    DeviceProfile {
        name: "tinySA Ultra Plus",
        model_id: "ZS406",
        screen: ultra_screen(),
        display_points: 450,
        sa_range: FrequencyRange::new(100 * KHZ, 10_000 * MHZ),
        sa_low: FrequencyRange::new(100 * KHZ, 900 * MHZ),
        sa_high: FrequencyRange::new(100 * KHZ, 5_400 * MHZ),
        sa_ultra: Some(FrequencyRange::new(100 * KHZ, 5_400 * MHZ)),
        sa_harmonic: Some(FrequencyRange::new(100 * KHZ, 10_000 * MHZ)),
        sg_sine: Some(FrequencyRange::new(100 * KHZ, 900 * MHZ)),
        sg_square: Some(FrequencyRange::new(100 * KHZ, 4_400 * MHZ)),
        output_level_low: LevelRange::new(-115, -19),
        output_level_high: LevelRange::new(-115, -19),
        rbw: FrequencyRange::new(200, 850 * KHZ),
        attenuator_db: (0, 31),
        lna_stages: vec![LnaStage {
            range: FrequencyRange::new(100 * KHZ, 4_000 * MHZ),
            gain_db: 20,
        }],
        has_sd_card: true,
        max_battery_raw: 4095,
        modulation: FrequencyRange::new(50, 3_500),
        scanraw_offset_db: SCANRAW_OFFSET_ULTRA,
    }
}

/// tinySA Ultra Plus, hardware revision ZS407 (two LNAs, up to 11 GHz in
/// harmonic mode).
pub fn ultra_plus_zs407() -> DeviceProfile {
    DeviceProfile {
        name: "tinySA Ultra Plus",
        model_id: "ZS407",
        screen: ultra_screen(),
        display_points: 450,
        sa_range: FrequencyRange::new(100 * KHZ, 11_000 * MHZ),
        sa_low: FrequencyRange::new(100 * KHZ, 900 * MHZ),
        sa_high: FrequencyRange::new(100 * KHZ, 7_300 * MHZ),
        sa_ultra: Some(FrequencyRange::new(100 * KHZ, 7_300 * MHZ)),
        sa_harmonic: Some(FrequencyRange::new(100 * KHZ, 11_000 * MHZ)),
        sg_sine: Some(FrequencyRange::new(100 * KHZ, 900 * MHZ)),
        sg_square: Some(FrequencyRange::new(100 * KHZ, 4_400 * MHZ)),
        output_level_low: LevelRange::new(-115, -19),
        output_level_high: LevelRange::new(-115, -19),
        rbw: FrequencyRange::new(200, 850 * KHZ),
        attenuator_db: (0, 31),
        lna_stages: vec![
            LnaStage {
                range: FrequencyRange::new(MHZ, 7_300 * MHZ),
                gain_db: 20,
            },
            LnaStage {
                range: FrequencyRange::new(7_300 * MHZ, 9_000 * MHZ),
                gain_db: 15,
            },
        ],
        has_sd_card: true,
        max_battery_raw: 4095,
        modulation: FrequencyRange::new(50, 3_500),
        scanraw_offset_db: SCANRAW_OFFSET_ULTRA,
    }
}

/// Every built-in preset.
pub fn all_profiles() -> Vec<DeviceProfile> {
    vec![basic(), ultra_zs405(), ultra_plus_zs406(), ultra_plus_zs407()]
}

/// Look up a preset by model id or alias, ignoring case.
///
/// Accepts `basic` (or `original`), `ultra` (same as `zs405`), `plus`
/// (same as `zs406`), `zs405`, `zs406`, `zs407`.
pub fn by_name(name: &str) -> Option<DeviceProfile> {
    match name.to_ascii_lowercase().as_str() {
        "basic" | "original" | "tinysa" => Some(basic()),
        "ultra" | "zs405" => Some(ultra_zs405()),
        "plus" | "ultra_plus" | "zs406" => Some(ultra_plus_zs406()),
        "zs407" => Some(ultra_plus_zs407()),
        _ => None,
    }
}
