//! Argument constraint table.
//!
//! Every modeled console command is described by a [`CommandDescriptor`]:
//! its name, a one-line summary, and an ordered list of [`ArgumentSpec`]s.
//! Each argument lists the [`Constraint`]s it accepts; a value is legal when
//! any one of them accepts it (`attenuate` takes the sentinel `auto` *or* an
//! integer in `[0, 31)`).
//!
//! The table is built once from static data (see [`crate::catalog`]) and
//! shared read-only. New commands are added with
//! [`ConstraintTable::with_command`]; neither the framer nor the gateway
//! needs to change for that.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tinysa_core::{DeviceProfile, ProfileBound};

use crate::catalog;

/// One end of an integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// A constant.
    Fixed(i64),
    /// A value read from the active [`DeviceProfile`].
    Profile(ProfileBound),
}

impl Bound {
    /// Resolve against `profile`.
    pub fn resolve(&self, profile: &DeviceProfile) -> i64 {
        match *self {
            Bound::Fixed(v) => v,
            Bound::Profile(which) => profile.bound(which),
        }
    }
}

/// One accepted form of an argument value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// The rendered value must equal one of these tokens exactly
    /// (case-sensitive). Integers are compared by their decimal rendering.
    Enumeration(&'static [&'static str]),
    /// An integer with `low <= value`, and `value < high` or `value <= high`
    /// depending on `high_inclusive`.
    IntegerRange {
        low: Bound,
        high: Bound,
        high_inclusive: bool,
    },
    /// A fixed non-numeric token such as `auto`, matched exactly.
    Sentinel(&'static str),
    /// Any single word without whitespace (file names).
    Token,
    /// `0x`-prefixed hexadecimal with at most `max_digits` digits.
    Hex { max_digits: usize },
}

impl Constraint {
    /// Integer range with an exclusive upper bound.
    pub const fn half_open(low: i64, high: i64) -> Self {
        Constraint::IntegerRange {
            low: Bound::Fixed(low),
            high: Bound::Fixed(high),
            high_inclusive: false,
        }
    }

    /// Integer range with both ends inclusive.
    pub const fn inclusive(low: i64, high: i64) -> Self {
        Constraint::IntegerRange {
            low: Bound::Fixed(low),
            high: Bound::Fixed(high),
            high_inclusive: true,
        }
    }

    /// Inclusive integer range whose bounds come from the profile.
    pub const fn profile(low: Bound, high: Bound) -> Self {
        Constraint::IntegerRange {
            low,
            high,
            high_inclusive: true,
        }
    }

    /// Whether `value` satisfies this constraint under `profile`.
    pub fn accepts(&self, value: &ArgValue, profile: &DeviceProfile) -> bool {
        match *self {
            Constraint::Enumeration(allowed) => {
                let rendered = value.to_string();
                allowed.iter().any(|a| *a == rendered)
            }
            Constraint::IntegerRange {
                low,
                high,
                high_inclusive,
            } => match *value {
                ArgValue::Int(v) => {
                    let (lo, hi) = (low.resolve(profile), high.resolve(profile));
                    v >= lo && if high_inclusive { v <= hi } else { v < hi }
                }
                ArgValue::Text(_) => false,
            },
            Constraint::Sentinel(token) => matches!(value, ArgValue::Text(t) if t == token),
            Constraint::Token => {
                let rendered = value.to_string();
                !rendered.is_empty() && !rendered.chars().any(char::is_whitespace)
            }
            Constraint::Hex { max_digits } => match value {
                ArgValue::Text(t) => t
                    .strip_prefix("0x")
                    .or_else(|| t.strip_prefix("0X"))
                    .is_some_and(|digits| {
                        !digits.is_empty()
                            && digits.len() <= max_digits
                            && digits.chars().all(|c| c.is_ascii_hexdigit())
                    }),
                ArgValue::Int(_) => false,
            },
        }
    }

    /// Human-readable form. Profile bounds are resolved when a profile is
    /// given and shown by name otherwise.
    pub fn describe(&self, profile: Option<&DeviceProfile>) -> String {
        let bound = |b: Bound| match (b, profile) {
            (Bound::Fixed(v), _) => v.to_string(),
            (Bound::Profile(which), Some(p)) => p.bound(which).to_string(),
            (Bound::Profile(which), None) => which.to_string(),
        };

        match *self {
            Constraint::Enumeration(allowed) => allowed.join("|"),
            Constraint::IntegerRange {
                low,
                high,
                high_inclusive,
            } => match (high, high_inclusive) {
                (Bound::Fixed(h), false) => format!("{}..{}", bound(low), h - 1),
                (_, false) => format!("{}..<{}", bound(low), bound(high)),
                (_, true) => format!("{}..{}", bound(low), bound(high)),
            },
            Constraint::Sentinel(token) => token.to_string(),
            Constraint::Token => "{name}".to_string(),
            Constraint::Hex { max_digits } => format!("0x{}", "h".repeat(max_digits)),
        }
    }
}

/// Declared shape of one positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub name: &'static str,
    /// Accepted forms; any one match makes the value legal.
    pub accepts: &'static [Constraint],
    /// May be omitted. Omitting it also omits every later argument.
    pub optional: bool,
    /// Sent in place of an omitted argument.
    pub default: Option<&'static str>,
}

impl ArgumentSpec {
    pub const fn required(name: &'static str, accepts: &'static [Constraint]) -> Self {
        ArgumentSpec {
            name,
            accepts,
            optional: false,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, accepts: &'static [Constraint]) -> Self {
        ArgumentSpec {
            name,
            accepts,
            optional: true,
            default: None,
        }
    }

    pub const fn with_default(
        name: &'static str,
        accepts: &'static [Constraint],
        default: &'static str,
    ) -> Self {
        ArgumentSpec {
            name,
            accepts,
            optional: true,
            default: Some(default),
        }
    }

    /// Accepted forms joined with `|`.
    pub fn expected(&self, profile: Option<&DeviceProfile>) -> String {
        self.accepts
            .iter()
            .map(|c| c.describe(profile))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Whether any accepted form matches `value`.
    pub fn accepts(&self, value: &ArgValue, profile: &DeviceProfile) -> bool {
        self.accepts.iter().any(|c| c.accepts(value, profile))
    }
}

/// Immutable description of one console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub summary: &'static str,
    pub args: &'static [ArgumentSpec],
    /// The instrument drops the USB link after this command.
    pub disconnects: bool,
}

impl CommandDescriptor {
    /// Usage line, e.g. `attenuate [auto|0..30]`.
    pub fn usage(&self, profile: Option<&DeviceProfile>) -> String {
        let mut line = self.name.to_string();
        for arg in self.args {
            let expected = arg.expected(profile);
            if arg.optional {
                line.push_str(&format!(" [{expected}]"));
            } else {
                line.push_str(&format!(" {{{expected}}}"));
            }
        }
        line
    }
}

/// A typed argument value.
///
/// Parsing from text yields [`ArgValue::Int`] for anything that parses as a
/// decimal `i64` and [`ArgValue::Text`] otherwise. The `From<&str>` and
/// `From<String>` conversions parse the same way, so `.arg("30")` and
/// `.arg(30)` are the same argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Int(v) => write!(f, "{v}"),
            ArgValue::Text(t) => write!(f, "{t}"),
        }
    }
}

impl FromStr for ArgValue {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(v) => ArgValue::Int(v),
            Err(_) => ArgValue::Text(s.to_string()),
        })
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        ArgValue::Int(i64::from(v))
    }
}

impl From<u32> for ArgValue {
    fn from(v: u32) -> Self {
        ArgValue::Int(i64::from(v))
    }
}

impl From<u16> for ArgValue {
    fn from(v: u16) -> Self {
        ArgValue::Int(i64::from(v))
    }
}

impl From<u8> for ArgValue {
    fn from(v: u8) -> Self {
        ArgValue::Int(i64::from(v))
    }
}

impl From<u64> for ArgValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => ArgValue::Int(v),
            Err(_) => ArgValue::Text(v.to_string()),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(v) => ArgValue::Int(v),
            Err(_) => ArgValue::Text(s.to_string()),
        }
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        match s.parse::<i64>() {
            Ok(v) => ArgValue::Int(v),
            Err(_) => ArgValue::Text(s),
        }
    }
}

/// Lookup table from command name to [`CommandDescriptor`].
#[derive(Debug, Clone, Default)]
pub struct ConstraintTable {
    commands: HashMap<&'static str, CommandDescriptor>,
}

impl ConstraintTable {
    /// An empty table: every command must go through the passthrough.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in catalogue of modeled commands.
    pub fn standard() -> Self {
        catalog::STANDARD
            .iter()
            .fold(Self::empty(), |table, desc| table.with_command(*desc))
    }

    /// Add or replace a command.
    pub fn with_command(mut self, desc: CommandDescriptor) -> Self {
        self.commands.insert(desc.name, desc);
        self
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Command names in alphabetical order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Usage line for one command.
    pub fn usage(&self, name: &str, profile: Option<&DeviceProfile>) -> Option<String> {
        self.get(name).map(|d| d.usage(profile))
    }

    /// One line per command, alphabetical, with its summary.
    pub fn help(&self, profile: Option<&DeviceProfile>) -> String {
        let mut out = String::new();
        for name in self.names() {
            if let Some(desc) = self.get(name) {
                out.push_str(&format!("{:<44} {}\n", desc.usage(profile), desc.summary));
            }
        }
        out
    }
}
