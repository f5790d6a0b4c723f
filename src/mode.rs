//! Variable modes.

use std::fmt;
use std::str::FromStr;

use crate::error::NwsError;

/// Retrieval order and retention policy of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// `find`/`fetch` return the oldest value.
    Fifo,
    /// `find`/`fetch` return the newest value.
    Lifo,
    /// `find`/`fetch` return values in no particular order.
    Multi,
    /// Only the most recent value is kept.
    Single,
}

impl Mode {
    /// Wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Fifo => "fifo",
            Mode::Lifo => "lifo",
            Mode::Multi => "multi",
            Mode::Single => "single",
        }
    }

    /// Whether cursors over this mode visit values in a defined order.
    pub fn supports_cursors(&self) -> bool {
        matches!(self, Mode::Fifo | Mode::Single)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = NwsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fifo" => Ok(Mode::Fifo),
            "lifo" => Ok(Mode::Lifo),
            "multi" => Ok(Mode::Multi),
            "single" => Ok(Mode::Single),
            other => Err(NwsError::InvalidArgument(format!(
                "unsupported mode: {}",
                other
            ))),
        }
    }
}
