//! `isoft check`: validate credentials the way a setup wizard would.
//!
//! Failures keep their category through the exit code (auth = 3,
//! connection = 7, timeout = 8, anything else = 1).

use isoft_core::{CheckOutcome, Softener};
use tracing::info;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(softener: &Softener, global: &GlobalOpts) -> Result<(), CliError> {
    match softener.check_credentials().await {
        CheckOutcome::Ok(reading) => {
            let unit = match (&reading.device_type, &reading.serial) {
                (Some(kind), Some(serial)) => format!("{kind} #{serial}"),
                (Some(kind), None) => kind.clone(),
                _ => "unit".into(),
            };
            let message = format!("Connected to {unit} at {}", softener.client().base_url());
            output::print_output(
                &output::success(&message, output::should_color(&global.color)),
                global.quiet,
            );
            Ok(())
        }
        CheckOutcome::Auth(err) => {
            info!("credentials rejected");
            Err(err.into())
        }
        CheckOutcome::Connection(err) => {
            info!("unit unreachable");
            Err(err.into())
        }
        CheckOutcome::Unknown(err) => Err(err.into()),
    }
}
