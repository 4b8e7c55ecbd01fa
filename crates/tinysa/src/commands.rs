//! Console command builders.
//!
//! Each function returns an [`Invocation`]: a command name plus typed
//! arguments. Builders are pure; nothing here validates against a profile or
//! touches a transport. Hand the result to
//! [`CommandGateway::execute`](crate::CommandGateway::execute), which checks
//! it against the constraint table before anything is written.
//!
//! Builders take Rust types where the console takes a closed set of words
//! (`on`/`off`, `low`/`high`, trace slots) so the common mistakes do not
//! compile. Numeric ranges are left to the constraint table because several
//! of them depend on the connected hardware.

use std::fmt;

use tinysa_console::protocol::encode_command;

use crate::constraints::ArgValue;

/// A command ready for validation and transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: &'static str,
    pub args: Vec<ArgValue>,
}

impl Invocation {
    /// An invocation with no arguments.
    pub fn new(name: &'static str) -> Self {
        Invocation {
            name,
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Append an argument only when present.
    pub fn arg_opt<T: Into<ArgValue>>(self, value: Option<T>) -> Self {
        match value {
            Some(v) => self.arg(v),
            None => self,
        }
    }

    /// Wire bytes for this invocation exactly as given, without defaults or
    /// validation.
    pub fn to_wire(&self) -> Vec<u8> {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        encode_command(self.name, &args)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A setting that is either automatic or an explicit number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoValue {
    Auto,
    Value(i64),
}

impl From<AutoValue> for ArgValue {
    fn from(v: AutoValue) -> Self {
        match v {
            AutoValue::Auto => ArgValue::Text("auto".into()),
            AutoValue::Value(n) => ArgValue::Int(n),
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Input range selector for `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRange {
    Low,
    High,
}

/// Analyzer or generator operation for `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Trace selector for `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceSlot {
    /// Scratch values of the sweep in progress.
    Temp = 0,
    /// The stored trace.
    Stored = 1,
    /// The last measured trace.
    Measured = 2,
}

/// Trace calculation for `calc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcMode {
    Off,
    MinHold,
    MaxHold,
    MaxDecay,
    Average4,
    Average16,
    QuasiPeak,
}

impl CalcMode {
    fn as_str(self) -> &'static str {
        match self {
            CalcMode::Off => "off",
            CalcMode::MinHold => "minh",
            CalcMode::MaxHold => "maxh",
            CalcMode::MaxDecay => "maxd",
            CalcMode::Average4 => "aver4",
            CalcMode::Average16 => "aver16",
            CalcMode::QuasiPeak => "quasip",
        }
    }
}

/// Generator modulation for `modulation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    Off,
    Am1kHz,
    Am10Hz,
    Nfm,
    Wfm,
    External,
}

impl Modulation {
    fn as_str(self) -> &'static str {
        match self {
            Modulation::Off => "off",
            Modulation::Am1kHz => "AM_1kHz",
            Modulation::Am10Hz => "AM_10Hz",
            Modulation::Nfm => "NFM",
            Modulation::Wfm => "WFM",
            Modulation::External => "extern",
        }
    }
}

// ---------------------------------------------------------------
// Measurement setup
// ---------------------------------------------------------------

/// `attenuate auto|0..30`
pub fn cmd_attenuate(db: AutoValue) -> Invocation {
    Invocation::new("attenuate").arg(db)
}

/// `agc auto|0..7`
pub fn cmd_agc(gain: AutoValue) -> Invocation {
    Invocation::new("agc").arg(gain)
}

/// `lna2 auto|0..7`
pub fn cmd_lna2(gain: AutoValue) -> Invocation {
    Invocation::new("lna2").arg(gain)
}

/// `rbw auto|3..600` (kHz)
pub fn cmd_rbw(khz: AutoValue) -> Invocation {
    Invocation::new("rbw").arg(khz)
}

/// `freq {hz}`: pause the sweep and tune to one frequency.
pub fn cmd_freq(freq_hz: u64) -> Invocation {
    Invocation::new("freq").arg(freq_hz)
}

/// `actual_freq [hz]`
pub fn cmd_actual_freq(freq_hz: Option<u64>) -> Invocation {
    Invocation::new("actual_freq").arg_opt(freq_hz)
}

pub fn cmd_ext_gain(db: i32) -> Invocation {
    Invocation::new("ext_gain").arg(db)
}

pub fn cmd_lna(on: bool) -> Invocation {
    Invocation::new("lna").arg(on_off(on))
}

pub fn cmd_spur(on: bool) -> Invocation {
    Invocation::new("spur").arg(on_off(on))
}

pub fn cmd_calc(mode: CalcMode) -> Invocation {
    Invocation::new("calc").arg(mode.as_str())
}

/// `if 0|433M..435M`; 0 selects automatic.
pub fn cmd_if(freq_hz: u64) -> Invocation {
    Invocation::new("if").arg(freq_hz)
}

/// `if1 0|975M..979M`
pub fn cmd_if1(freq_hz: u64) -> Invocation {
    Invocation::new("if1").arg(freq_hz)
}

pub fn cmd_mode(range: InputRange, direction: Direction) -> Invocation {
    let range = match range {
        InputRange::Low => "low",
        InputRange::High => "high",
    };
    let direction = match direction {
        Direction::Input => "input",
        Direction::Output => "output",
    };
    Invocation::new("mode").arg(range).arg(direction)
}

// ---------------------------------------------------------------
// Signal generator
// ---------------------------------------------------------------

/// `level {dbm}`, -76..13 inclusive.
pub fn cmd_level(dbm: i32) -> Invocation {
    Invocation::new("level").arg(dbm)
}

pub fn cmd_levelchange(db: i32) -> Invocation {
    Invocation::new("levelchange").arg(db)
}

pub fn cmd_output(on: bool) -> Invocation {
    Invocation::new("output").arg(on_off(on))
}

pub fn cmd_modulation(modulation: Modulation) -> Invocation {
    Invocation::new("modulation").arg(modulation.as_str())
}

/// `caloutput off|1|2|3|4|10|15|30`; `None` switches the output off.
pub fn cmd_caloutput(mhz: Option<u8>) -> Invocation {
    match mhz {
        Some(mhz) => Invocation::new("caloutput").arg(mhz),
        None => Invocation::new("caloutput").arg("off"),
    }
}

// ---------------------------------------------------------------
// Sweeps and trace data
// ---------------------------------------------------------------

/// `scan {start} {stop} [points] [outmask]`
///
/// `outmask` bits: 1 frequency, 2 measured level, 4 stored level.
pub fn cmd_scan(start_hz: u64, stop_hz: u64, points: Option<u16>, outmask: Option<u8>) -> Invocation {
    Invocation::new("scan")
        .arg(start_hz)
        .arg(stop_hz)
        .arg_opt(points)
        .arg_opt(outmask)
}

/// `scanraw {start} {stop} [points] [option]`; decode the reply with
/// [`tinysa_core::trace::decode_scanraw`].
pub fn cmd_scanraw(start_hz: u64, stop_hz: u64, points: Option<u16>, option: Option<u8>) -> Invocation {
    Invocation::new("scanraw")
        .arg(start_hz)
        .arg(stop_hz)
        .arg_opt(points)
        .arg_opt(option)
}

pub fn cmd_data(slot: TraceSlot) -> Invocation {
    Invocation::new("data").arg(slot as u8)
}

pub fn cmd_frequencies() -> Invocation {
    Invocation::new("frequencies")
}

pub fn cmd_pause() -> Invocation {
    Invocation::new("pause")
}

pub fn cmd_resume() -> Invocation {
    Invocation::new("resume")
}

pub fn cmd_wait() -> Invocation {
    Invocation::new("wait")
}

pub fn cmd_repeat(count: Option<u16>) -> Invocation {
    Invocation::new("repeat").arg_opt(count)
}

pub fn cmd_refresh(on: bool) -> Invocation {
    Invocation::new("refresh").arg(on_off(on))
}

/// `capture`: the reply is raw RGB565 screen data.
pub fn cmd_capture() -> Invocation {
    Invocation::new("capture")
}

// ---------------------------------------------------------------
// Presets and configuration
// ---------------------------------------------------------------

pub fn cmd_load(slot: u8) -> Invocation {
    Invocation::new("load").arg(slot)
}

pub fn cmd_save(slot: u8) -> Invocation {
    Invocation::new("save").arg(slot)
}

pub fn cmd_recall(slot: u8) -> Invocation {
    Invocation::new("recall").arg(slot)
}

pub fn cmd_saveconfig() -> Invocation {
    Invocation::new("saveconfig")
}

/// `clearconfig 1234`: erases calibration; the instrument then resets.
pub fn cmd_clearconfig() -> Invocation {
    Invocation::new("clearconfig").arg(1234)
}

/// `color [id rgb24]`; `None` dumps the palette.
pub fn cmd_color(entry: Option<(u8, u32)>) -> Invocation {
    match entry {
        Some((id, rgb)) => Invocation::new("color")
            .arg(id)
            .arg(format!("0x{:06X}", rgb & 0x00FF_FFFF)),
        None => Invocation::new("color"),
    }
}

pub fn cmd_dac(value: Option<u16>) -> Invocation {
    Invocation::new("dac").arg_opt(value)
}

pub fn cmd_deviceid(id: Option<u32>) -> Invocation {
    Invocation::new("deviceid").arg_opt(id)
}

pub fn cmd_vbat_offset(offset: Option<u16>) -> Invocation {
    Invocation::new("vbat_offset").arg_opt(offset)
}

// ---------------------------------------------------------------
// Touch screen
// ---------------------------------------------------------------

/// `touch {x} {y}`; the upper left corner is `0 0`.
pub fn cmd_touch(x: u16, y: u16) -> Invocation {
    Invocation::new("touch").arg(x).arg(y)
}

pub fn cmd_release() -> Invocation {
    Invocation::new("release")
}

pub fn cmd_touchcal() -> Invocation {
    Invocation::new("touchcal")
}

pub fn cmd_touchtest() -> Invocation {
    Invocation::new("touchtest")
}

// ---------------------------------------------------------------
// SD card
// ---------------------------------------------------------------

pub fn cmd_sd_list() -> Invocation {
    Invocation::new("sd_list")
}

pub fn cmd_sd_read(filename: &str) -> Invocation {
    Invocation::new("sd_read").arg(filename)
}

pub fn cmd_sd_delete(filename: &str) -> Invocation {
    Invocation::new("sd_delete").arg(filename)
}

// ---------------------------------------------------------------
// Device information and lifecycle
// ---------------------------------------------------------------

pub fn cmd_version() -> Invocation {
    Invocation::new("version")
}

pub fn cmd_info() -> Invocation {
    Invocation::new("info")
}

pub fn cmd_help() -> Invocation {
    Invocation::new("help")
}

pub fn cmd_status() -> Invocation {
    Invocation::new("status")
}

pub fn cmd_threads() -> Invocation {
    Invocation::new("threads")
}

pub fn cmd_vbat() -> Invocation {
    Invocation::new("vbat")
}

pub fn cmd_freq_corr() -> Invocation {
    Invocation::new("freq_corr")
}

pub fn cmd_usart_cfg() -> Invocation {
    Invocation::new("usart_cfg")
}

/// `selftest [n]`; 0 runs every test.
pub fn cmd_selftest(test: u8) -> Invocation {
    Invocation::new("selftest").arg(test)
}

/// `reset`: the instrument reboots and drops the USB link.
pub fn cmd_reset() -> Invocation {
    Invocation::new("reset")
}

/// `restart [seconds]`: like `reset`, optionally delayed.
pub fn cmd_restart(after_secs: Option<u32>) -> Invocation {
    Invocation::new("restart").arg_opt(after_secs)
}
