use isoft_api::Command;
use strum::{Display, EnumString};

/// Key actuators use for the main water-stop valve.
pub const VALVE_MODE: &str = "valve_mode";
/// Key actuators use for vacation mode.
pub const VACATION_MODE: &str = "vacation_mode";

/// Position requested for the water-stop valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ValveMode {
    Open,
    Close,
}

/// A writable device setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    Valve(ValveMode),
    /// Raw vacation value, forwarded as-is (`"1"` on, `"0"` off).
    Vacation(String),
}

impl Setting {
    /// Map an actuator `(key, value)` pair to a setting.
    ///
    /// `valve_mode` opens the valve only for the literal `"1"`.
    /// Unknown keys yield `None`.
    pub fn parse(key: &str, value: &str) -> Option<Self> {
        match key {
            VALVE_MODE => Some(Self::Valve(if value == "1" {
                ValveMode::Open
            } else {
                ValveMode::Close
            })),
            VACATION_MODE => Some(Self::Vacation(value.to_owned())),
            _ => None,
        }
    }

    pub fn vacation(on: bool) -> Self {
        Self::Vacation(if on { "1" } else { "0" }.to_owned())
    }

    /// The device command that applies this setting.
    ///
    /// Both commands take their argument in a parameter named `valve`.
    pub fn command(&self) -> Command {
        match self {
            Self::Valve(mode) => Command::new("waterstop", "valve").param("valve", mode.to_string()),
            Self::Vacation(value) => {
                Command::new("waterstop", "vacation").param("valve", value.as_str())
            }
        }
    }
}
