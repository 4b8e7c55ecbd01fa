//! The standard catalogue of modeled console commands.
//!
//! Argument ranges follow the firmware's own `usage:` strings. Commands that
//! are not listed here (`sweep`, `trace`, `marker`, `trigger`, `ultra`,
//! `menu`, ...) are still reachable through the raw passthrough.

use tinysa_core::ProfileBound;

use crate::constraints::{ArgumentSpec, Bound, CommandDescriptor, Constraint};

// Argument forms shared by several commands.

const AUTO: Constraint = Constraint::Sentinel("auto");
const ON_OFF: Constraint = Constraint::Enumeration(&["on", "off"]);
const SA_RANGE: Constraint = Constraint::profile(
    Bound::Profile(ProfileBound::SaMinHz),
    Bound::Profile(ProfileBound::SaMaxHz),
);
const PRESET_SLOT: Constraint = Constraint::half_open(0, 5);
const DAC_VALUE: Constraint = Constraint::inclusive(0, 4095);
const OUTMASK: Constraint = Constraint::inclusive(0, 7);
const SCAN_POINTS: Constraint = Constraint::profile(
    Bound::Fixed(1),
    Bound::Profile(ProfileBound::DisplayPoints),
);

const ACTUAL_FREQ: &[ArgumentSpec] = &[ArgumentSpec::optional("frequency", &[SA_RANGE])];
const AGC: &[ArgumentSpec] = &[ArgumentSpec::with_default(
    "gain",
    &[AUTO, Constraint::inclusive(0, 7)],
    "auto",
)];
const ATTENUATE: &[ArgumentSpec] = &[ArgumentSpec::with_default(
    "db",
    &[AUTO, Constraint::half_open(0, 31)],
    "auto",
)];
const CALC: &[ArgumentSpec] = &[ArgumentSpec::with_default(
    "mode",
    &[Constraint::Enumeration(&[
        "off", "minh", "maxh", "maxd", "aver4", "aver16", "quasip",
    ])],
    "off",
)];
const CALOUTPUT: &[ArgumentSpec] = &[ArgumentSpec::with_default(
    "mhz",
    &[Constraint::Enumeration(&[
        "off", "30", "15", "10", "4", "3", "2", "1",
    ])],
    "off",
)];
const CLEARCONFIG: &[ArgumentSpec] = &[ArgumentSpec::with_default(
    "password",
    &[Constraint::Enumeration(&["1234"])],
    "1234",
)];
const COLOR: &[ArgumentSpec] = &[
    ArgumentSpec::optional("id", &[Constraint::half_open(0, 31)]),
    ArgumentSpec::with_default("rgb24", &[Constraint::Hex { max_digits: 6 }], "0xF8FCF8"),
];
const DAC: &[ArgumentSpec] = &[ArgumentSpec::optional("value", &[DAC_VALUE])];
const DATA: &[ArgumentSpec] = &[ArgumentSpec::with_default(
    "trace",
    &[Constraint::Enumeration(&["0", "1", "2"])],
    "0",
)];
const DEVICEID: &[ArgumentSpec] = &[ArgumentSpec::optional(
    "id",
    &[Constraint::inclusive(0, u32::MAX as i64)],
)];
const EXT_GAIN: &[ArgumentSpec] = &[ArgumentSpec::required(
    "db",
    &[Constraint::inclusive(-100, 100)],
)];
const FREQ: &[ArgumentSpec] = &[ArgumentSpec::required("frequency", &[SA_RANGE])];
const IF: &[ArgumentSpec] = &[ArgumentSpec::with_default(
    "frequency",
    &[
        Constraint::inclusive(0, 0),
        Constraint::inclusive(433_000_000, 435_000_000),
    ],
    "0",
)];
const IF1: &[ArgumentSpec] = &[ArgumentSpec::required(
    "frequency",
    &[
        Constraint::inclusive(0, 0),
        Constraint::inclusive(975_000_000, 979_000_000),
    ],
)];
const LEVEL: &[ArgumentSpec] = &[ArgumentSpec::required(
    "dbm",
    &[Constraint::inclusive(-76, 13)],
)];
const LEVELCHANGE: &[ArgumentSpec] = &[ArgumentSpec::required(
    "db",
    &[Constraint::inclusive(-70, 70)],
)];
const LNA2: &[ArgumentSpec] = &[ArgumentSpec::with_default(
    "gain",
    &[AUTO, Constraint::inclusive(0, 7)],
    "auto",
)];
const LOAD: &[ArgumentSpec] = &[ArgumentSpec::with_default("slot", &[PRESET_SLOT], "0")];
const MODE: &[ArgumentSpec] = &[
    ArgumentSpec::required("range", &[Constraint::Enumeration(&["low", "high"])]),
    ArgumentSpec::required("direction", &[Constraint::Enumeration(&["input", "output"])]),
];
const MODULATION: &[ArgumentSpec] = &[ArgumentSpec::required(
    "type",
    &[Constraint::Enumeration(&[
        "off", "AM_1kHz", "AM_10Hz", "NFM", "WFM", "extern",
    ])],
)];
const NF: &[ArgumentSpec] = &[ArgumentSpec::optional("value", &[Constraint::Token])];
const RBW: &[ArgumentSpec] = &[ArgumentSpec::with_default(
    "khz",
    &[AUTO, Constraint::inclusive(3, 600)],
    "auto",
)];
const REPEAT: &[ArgumentSpec] = &[ArgumentSpec::optional(
    "count",
    &[Constraint::inclusive(1, 1000)],
)];
const RESTART: &[ArgumentSpec] = &[ArgumentSpec::optional(
    "seconds",
    &[Constraint::inclusive(0, 86_400)],
)];
const SAVE: &[ArgumentSpec] = &[ArgumentSpec::with_default("slot", &[PRESET_SLOT], "1")];
const SCAN: &[ArgumentSpec] = &[
    ArgumentSpec::required("start", &[SA_RANGE]),
    ArgumentSpec::required("stop", &[SA_RANGE]),
    ArgumentSpec::optional("points", &[SCAN_POINTS]),
    ArgumentSpec::optional("outmask", &[OUTMASK]),
];
const SCANRAW: &[ArgumentSpec] = &[
    ArgumentSpec::required("start", &[SA_RANGE]),
    ArgumentSpec::required("stop", &[SA_RANGE]),
    ArgumentSpec::optional("points", &[SCAN_POINTS]),
    ArgumentSpec::optional("option", &[OUTMASK]),
];
const SD_FILE: &[ArgumentSpec] = &[ArgumentSpec::required("filename", &[Constraint::Token])];
const SELFTEST: &[ArgumentSpec] = &[ArgumentSpec::with_default(
    "test",
    &[Constraint::half_open(0, 15)],
    "0",
)];
const STATE: &[ArgumentSpec] = &[ArgumentSpec::required("state", &[ON_OFF])];
const TOUCH: &[ArgumentSpec] = &[
    ArgumentSpec::required(
        "x",
        &[Constraint::profile(
            Bound::Fixed(0),
            Bound::Profile(ProfileBound::ScreenWidth),
        )],
    ),
    ArgumentSpec::required(
        "y",
        &[Constraint::profile(
            Bound::Fixed(0),
            Bound::Profile(ProfileBound::ScreenHeight),
        )],
    ),
];
const VBAT_OFFSET: &[ArgumentSpec] = &[ArgumentSpec::optional("offset", &[DAC_VALUE])];

const fn cmd(
    name: &'static str,
    summary: &'static str,
    args: &'static [ArgumentSpec],
) -> CommandDescriptor {
    CommandDescriptor {
        name,
        summary,
        args,
        disconnects: false,
    }
}

const fn disconnecting(
    name: &'static str,
    summary: &'static str,
    args: &'static [ArgumentSpec],
) -> CommandDescriptor {
    CommandDescriptor {
        name,
        summary,
        args,
        disconnects: true,
    }
}

/// Every command modeled by [`ConstraintTable::standard`](crate::ConstraintTable::standard).
pub static STANDARD: &[CommandDescriptor] = &[
    cmd("actual_freq", "get or set the corrected reference frequency", ACTUAL_FREQ),
    cmd("agc", "set the automatic gain control", AGC),
    cmd("attenuate", "set the internal attenuator in dB", ATTENUATE),
    cmd("calc", "set the trace calculation mode", CALC),
    cmd("caloutput", "set the calibration output in MHz", CALOUTPUT),
    cmd("capture", "dump the screen as RGB565", &[]),
    disconnecting("clearconfig", "erase configuration and calibration", CLEARCONFIG),
    cmd("color", "dump or set a display color", COLOR),
    cmd("dac", "get or set the DAC value", DAC),
    cmd("data", "dump trace data (0 temp, 1 stored, 2 measured)", DATA),
    cmd("deviceid", "get or set the user device id", DEVICEID),
    cmd("ext_gain", "set external attenuation or amplification", EXT_GAIN),
    cmd("freq", "pause the sweep and set the frequency in Hz", FREQ),
    cmd("freq_corr", "get the frequency correction in ppb", &[]),
    cmd("frequencies", "dump the frequencies of the last sweep", &[]),
    cmd("help", "list the firmware's commands", &[]),
    cmd("if", "set the IF in Hz, 0 for automatic", IF),
    cmd("if1", "set the first IF in Hz, 0 for automatic", IF1),
    cmd("info", "show hardware and firmware information", &[]),
    cmd("level", "set the generator output level in dBm", LEVEL),
    cmd("levelchange", "set the output level change in dB", LEVELCHANGE),
    cmd("lna", "switch the LNA", STATE),
    cmd("lna2", "set the second LNA gain", LNA2),
    cmd("load", "load a stored preset", LOAD),
    cmd("mode", "select input/output and low/high range", MODE),
    cmd("modulation", "set the generator modulation", MODULATION),
    cmd("nf", "get or set the noise figure", NF),
    cmd("output", "switch the generator output", STATE),
    cmd("pause", "pause sweeping", &[]),
    cmd("rbw", "set the resolution bandwidth in kHz", RBW),
    cmd("recall", "recall a stored preset", LOAD),
    cmd("refresh", "switch automatic display refresh", STATE),
    cmd("release", "signal the end of a touch", &[]),
    cmd("repeat", "set the measurements per frequency", REPEAT),
    disconnecting("reset", "reboot the instrument", &[]),
    disconnecting("restart", "restart after the given seconds", RESTART),
    cmd("resume", "resume sweeping", &[]),
    cmd("save", "save the current setting to a preset", SAVE),
    cmd("saveconfig", "save configuration and calibration", &[]),
    cmd("scan", "run a sweep and dump the requested columns", SCAN),
    cmd("scanraw", "run a sweep and dump binary samples", SCANRAW),
    cmd("sd_delete", "delete a file from the SD card", SD_FILE),
    cmd("sd_list", "list the files on the SD card", &[]),
    cmd("sd_read", "read a file from the SD card", SD_FILE),
    cmd("selftest", "run one self test, 0 for all", SELFTEST),
    cmd("spur", "switch spur removal", STATE),
    cmd("status", "show the sweep status", &[]),
    cmd("threads", "list firmware threads", &[]),
    cmd("touch", "touch the screen at x y", TOUCH),
    cmd("touchcal", "start touch screen calibration", &[]),
    cmd("touchtest", "start the touch screen test", &[]),
    cmd("usart_cfg", "show the serial port configuration", &[]),
    cmd("vbat", "show the battery voltage", &[]),
    cmd("vbat_offset", "get or set the battery voltage offset", VBAT_OFFSET),
    cmd("version", "show the firmware version", &[]),
    cmd("wait", "wait for one sweep to complete", &[]),
];
