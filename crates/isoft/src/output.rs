//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits `key=value` lines.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use isoft_core::Reading;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// A green check mark line for confirmations on stderr.
pub fn success(message: &str, color: bool) -> String {
    if color {
        format!("{} {message}", "✓".green().bold())
    } else {
        format!("✓ {message}")
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering goes through `detail_fn`, plain through `plain_fn`.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> Result<String, CliError>,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Plain => Ok(plain_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Reading views ────────────────────────────────────────────────────

#[derive(Tabled)]
struct Field {
    #[tabled(rename = "Field")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn reading_fields(reading: &Reading) -> Vec<Field> {
    let or_dash = |v: Option<&str>| v.unwrap_or("-").to_owned();
    vec![
        Field { name: "Type", value: or_dash(reading.device_type.as_deref()) },
        Field { name: "Serial", value: or_dash(reading.serial.as_deref()) },
        Field { name: "Water total (raw)", value: format!("{} l", reading.water_total_raw) },
        Field { name: "Water total (soft)", value: format!("{} l", reading.water_total_soft) },
        Field { name: "Valve", value: if reading.valve_open { "open" } else { "closed" }.into() },
        Field { name: "Vacation", value: if reading.vacation { "on" } else { "off" }.into() },
    ]
}

/// Two-column table of a reading.
pub fn reading_table(reading: &Reading) -> String {
    Table::new(reading_fields(reading))
        .with(Style::rounded())
        .to_string()
}

/// `key=value` lines, stable for scripts.
pub fn reading_plain(reading: &Reading) -> String {
    [
        format!("type={}", reading.device_type.as_deref().unwrap_or_default()),
        format!("serial={}", reading.serial.as_deref().unwrap_or_default()),
        format!("water_total_raw={}", reading.water_total_raw),
        format!("water_total_soft={}", reading.water_total_soft),
        format!("valve_open={}", reading.valve_open),
        format!("vacation={}", reading.vacation),
    ]
    .join("\n")
}
