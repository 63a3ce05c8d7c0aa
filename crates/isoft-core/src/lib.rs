//! Domain facade between `isoft-api` and consumers (CLI, pollers).
//!
//! - **[`Softener`]** - wraps one [`isoft_api::IsoftClient`] and exposes the
//!   two coarse operations pollers and actuators need:
//!   [`fetch_reading()`](Softener::fetch_reading) and
//!   [`apply_setting()`](Softener::apply_setting).
//!
//! - **[`Reading`]** - consolidated snapshot of unit identity, water
//!   totals, valve and vacation state. Built fresh on every fetch.
//!
//! - **[`Setting`]** - typed form of the `(key, value)` pairs actuators
//!   send.
//!
//! - **[`DeviceConfig`]** - how to reach a unit. Built by the CLI or any
//!   other host; core never reads config files.

pub mod config;
pub mod device;
pub mod error;
pub mod reading;
pub mod setting;

pub use config::{DeviceConfig, TlsVerification};
pub use device::{CheckOutcome, Softener};
pub use error::CoreError;
pub use isoft_api::ErrorKind;
pub use reading::{Reading, WaterTotals};
pub use setting::{Setting, ValveMode};
