use serde::Serialize;

/// Width of each column in the `consumption/water total` payload.
const FIELD_WIDTH: usize = 7;

/// Consolidated device readings, fetched fresh on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reading {
    /// Unit type reported by `register/show`.
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub serial: Option<String>,
    /// Total water drawn, in liters.
    pub water_total_raw: i64,
    /// Softened water delivered, in liters.
    pub water_total_soft: i64,
    pub valve_open: bool,
    pub vacation: bool,
}

/// The two counters packed into one fixed-width string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterTotals {
    pub raw: i64,
    pub soft: i64,
}

impl WaterTotals {
    /// Parse `"  12345  67890"`: the first seven characters hold the raw
    /// total and the last seven the softened total.
    ///
    /// Slicing is by character, and a payload shorter than one column is
    /// used whole for both fields.
    pub fn parse(text: &str) -> Result<Self, std::num::ParseIntError> {
        let chars: Vec<char> = text.chars().collect();
        let head: String = chars.iter().take(FIELD_WIDTH).collect();
        let tail: String = chars[chars.len().saturating_sub(FIELD_WIDTH)..]
            .iter()
            .collect();

        Ok(Self {
            raw: head.trim().parse()?,
            soft: tail.trim().parse()?,
        })
    }
}
