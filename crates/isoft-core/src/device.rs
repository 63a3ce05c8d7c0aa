// ── Softener facade ──
//
// The two coarse operations external pollers and actuators call:
// fetch a consolidated reading, and apply a named setting. Everything
// about sessions and retries stays inside `IsoftClient`.

use isoft_api::{Command, ErrorKind, IsoftClient};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::DeviceConfig;
use crate::error::CoreError;
use crate::reading::{Reading, WaterTotals};
use crate::setting::{Setting, ValveMode};

const WATER_TOTAL: (&str, &str) = ("consumption", "water total");
const VALVE: (&str, &str) = ("waterstop", "valve");
const VACATION: (&str, &str) = ("waterstop", "vacation");

/// Result of a credential and connectivity check.
#[derive(Debug)]
pub enum CheckOutcome {
    /// The unit answered a full reading.
    Ok(Reading),
    /// Credentials were rejected.
    Auth(CoreError),
    /// The unit could not be reached.
    Connection(CoreError),
    /// Anything else went wrong.
    Unknown(CoreError),
}

/// One water softener.
#[derive(Debug)]
pub struct Softener {
    client: IsoftClient,
}

impl Softener {
    /// Build a softener and its HTTP client from configuration.
    pub fn new(config: &DeviceConfig) -> Result<Self, CoreError> {
        let client = IsoftClient::new(
            config.endpoint()?,
            config.username.clone(),
            config.password.clone(),
            &config.transport(),
        )?;
        Ok(Self { client })
    }

    /// Wrap an existing client (e.g. one sharing a caller-owned
    /// `reqwest::Client`).
    pub fn with_client(client: IsoftClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &IsoftClient {
        &self.client
    }

    /// Fetch water totals, valve and vacation state, plus unit identity.
    ///
    /// Fails with the first error raised; never returns partial data.
    pub async fn fetch_reading(&self) -> Result<Reading, CoreError> {
        let text = self.fetch_text(WATER_TOTAL).await?;
        let totals = WaterTotals::parse(&text)
            .map_err(|e| CoreError::payload(WATER_TOTAL.1, format!("{text:?} ({e})")))?;

        let session = self.client.session().await;
        let valve = self.fetch(VALVE).await?;
        let vacation = self.fetch(VACATION).await?;

        let reading = Reading {
            device_type: session.device_type().map(str::to_owned),
            serial: session.serial_number().map(str::to_owned),
            water_total_raw: totals.raw,
            water_total_soft: totals.soft,
            valve_open: is_literal(valve.as_ref(), "opened"),
            vacation: is_literal(vacation.as_ref(), "1"),
        };
        debug!(?reading, "reading fetched");
        Ok(reading)
    }

    /// Apply an actuator `(key, value)` pair.
    ///
    /// Unknown keys are ignored without contacting the device.
    pub async fn apply_setting(&self, key: &str, value: &str) -> Result<(), CoreError> {
        match Setting::parse(key, value) {
            Some(setting) => self.apply(&setting).await.map(|_| ()),
            None => {
                debug!(key, "ignoring unknown setting");
                Ok(())
            }
        }
    }

    /// Apply a typed setting and return the device's data payload.
    pub async fn apply(&self, setting: &Setting) -> Result<Option<Value>, CoreError> {
        let command = setting.command();
        info!(%command, ?setting, "applying setting");
        Ok(self.client.execute(&command).await?)
    }

    pub async fn set_valve(&self, open: bool) -> Result<(), CoreError> {
        let mode = if open { ValveMode::Open } else { ValveMode::Close };
        self.apply(&Setting::Valve(mode)).await.map(|_| ())
    }

    pub async fn set_vacation(&self, on: bool) -> Result<(), CoreError> {
        self.apply(&Setting::vacation(on)).await.map(|_| ())
    }

    /// Try a full reading and classify the outcome, the way a setup
    /// wizard validates freshly entered credentials.
    pub async fn check_credentials(&self) -> CheckOutcome {
        match self.fetch_reading().await {
            Ok(reading) => CheckOutcome::Ok(reading),
            Err(err) => match err.kind() {
                ErrorKind::Authentication => CheckOutcome::Auth(err),
                ErrorKind::Communication => CheckOutcome::Connection(err),
                ErrorKind::Protocol => CheckOutcome::Unknown(err),
            },
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    async fn fetch(&self, (group, name): (&str, &str)) -> Result<Option<Value>, CoreError> {
        Ok(self.client.execute(&Command::new(group, name)).await?)
    }

    async fn fetch_text(&self, verb: (&str, &str)) -> Result<String, CoreError> {
        match self.fetch(verb).await? {
            Some(Value::String(text)) => Ok(text),
            Some(other) => Err(CoreError::payload(verb.1, &other)),
            None => Err(CoreError::payload(verb.1, "no data")),
        }
    }
}

fn is_literal(data: Option<&Value>, literal: &str) -> bool {
    data.and_then(Value::as_str) == Some(literal)
}
