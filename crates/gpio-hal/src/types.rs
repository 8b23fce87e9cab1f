//! Line identifiers, edge modes and pin maps.
//!
//! Lines are addressed by a small logical number (the wiringPi numbering used
//! on the Raspberry Pi header). The [`PinMap`] translates those numbers into
//! kernel GPIO numbers, which is what the sysfs interface expects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{HalError, HalResult};

/// Logical line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(u8);

impl LineId {
    /// Creates a line identifier from its logical number.
    pub const fn new(raw: u8) -> Self {
        LineId(raw)
    }

    /// Returns the logical number.
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Returns the logical number as a slot index.
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u8> for LineId {
    fn from(raw: u8) -> Self {
        LineId(raw)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kernel GPIO number (the `N` in `/sys/class/gpio/gpioN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GpioNumber(u32);

impl GpioNumber {
    pub const fn new(raw: u32) -> Self {
        GpioNumber(raw)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for GpioNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logic-level transition observed on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// High to low
    Falling,
    /// Low to high
    Rising,
}

/// Which transitions fire a line's interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// High to low only
    #[default]
    Falling,
    /// Low to high only
    Rising,
    /// Either direction
    Both,
}

impl EdgeMode {
    /// Returns the spelling used by the sysfs `edge` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeMode::Falling => "falling",
            EdgeMode::Rising => "rising",
            EdgeMode::Both => "both",
        }
    }

    /// Returns true if `transition` fires an interrupt in this mode.
    pub fn matches(&self, transition: Transition) -> bool {
        matches!(
            (self, transition),
            (EdgeMode::Both, _)
                | (EdgeMode::Falling, Transition::Falling)
                | (EdgeMode::Rising, Transition::Rising)
        )
    }
}

impl fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeMode {
    type Err = HalError;

    fn from_str(s: &str) -> HalResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "falling" => Ok(EdgeMode::Falling),
            "rising" => Ok(EdgeMode::Rising),
            "both" => Ok(EdgeMode::Both),
            other => Err(HalError::InvalidEdgeMode(other.to_string())),
        }
    }
}

/// Translation from logical lines to kernel GPIO numbers.
///
/// Entry `i` is the kernel GPIO behind logical line `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinMap(Vec<GpioNumber>);

impl PinMap {
    /// wiringPi pins 0-7 on a revision 2 (and later) Raspberry Pi header.
    pub const WIRINGPI_REV2: [u32; 8] = [17, 18, 27, 22, 23, 24, 25, 4];

    /// Most lines a map can address with a [`LineId`].
    pub const MAX_LINES: usize = u8::MAX as usize + 1;

    pub fn new(gpios: impl IntoIterator<Item = u32>) -> Self {
        PinMap(gpios.into_iter().map(GpioNumber::new).collect())
    }

    /// The wiringPi layout for lines 0-7.
    pub fn wiringpi() -> Self {
        Self::new(Self::WIRINGPI_REV2)
    }

    /// Number of lines covered by the map.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, line: LineId) -> bool {
        line.index() < self.0.len()
    }

    /// Looks up the kernel GPIO behind `line`.
    pub fn gpio(&self, line: LineId) -> HalResult<GpioNumber> {
        self.0
            .get(line.index())
            .copied()
            .ok_or(HalError::InvalidLine {
                line,
                lines: self.0.len(),
            })
    }

    /// Every addressable logical line in ascending order.
    ///
    /// Entries past [`PinMap::MAX_LINES`] have no line id and are skipped.
    pub fn lines(&self) -> impl Iterator<Item = LineId> + '_ {
        (0..=u8::MAX).take(self.0.len()).map(LineId::new)
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self::wiringpi()
    }
}
