use std::str::FromStr;

use strum_macros::{Display, IntoStaticStr};

use super::ConfigurationError;
use crate::time::StopAt;

/// What to ask of the time controller once the sentinel file shows up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
pub enum StopMode {
    #[strum(serialize = "noWriteNow")]
    NoWriteNow,
    #[strum(serialize = "writeNow")]
    WriteNow,
    #[default]
    #[strum(serialize = "nextWrite")]
    NextWrite,
}

impl StopMode {
    pub const ALL: [StopMode; 3] = [StopMode::NoWriteNow, StopMode::WriteNow, StopMode::NextWrite];

    /// Parses a configuration token. Matching is exact and case-sensitive.
    pub fn parse(token: &str) -> Result<Self, ConfigurationError> {
        Self::ALL
            .into_iter()
            .find(|mode| <&'static str>::from(*mode) == token)
            .ok_or_else(|| ConfigurationError::InvalidAction(token.to_string()))
    }

    pub fn description(&self) -> &'static str {
        match self {
            StopMode::NoWriteNow => "stop without writing data",
            StopMode::WriteNow => "stop+write data",
            StopMode::NextWrite => "stop after next data write",
        }
    }
}

impl FromStr for StopMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<StopMode> for StopAt {
    fn from(mode: StopMode) -> Self {
        match mode {
            StopMode::NoWriteNow => StopAt::NoWriteNow,
            StopMode::WriteNow => StopAt::WriteNow,
            StopMode::NextWrite => StopAt::NextWrite,
        }
    }
}
