use isoft_core::setting::{VACATION_MODE, VALVE_MODE};
use isoft_core::{Setting, Softener};

use crate::cli::{GlobalOpts, SetArgs, SetCommand, Toggle, ValveState};
use crate::error::CliError;
use crate::output;

pub async fn handle(softener: &Softener, args: SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let done = match args.command {
        SetCommand::Valve { state } => {
            let open = matches!(state, ValveState::Open);
            softener.set_valve(open).await?;
            format!("Valve {}", if open { "opened" } else { "closed" })
        }
        SetCommand::Vacation { state } => {
            let on = matches!(state, Toggle::On);
            softener.set_vacation(on).await?;
            format!("Vacation mode {}", if on { "on" } else { "off" })
        }
        SetCommand::Raw { key, value } => {
            if Setting::parse(&key, &value).is_none() {
                return Err(CliError::Validation {
                    field: "key".into(),
                    reason: format!("unknown setting '{key}'. Valid keys: {VALVE_MODE}, {VACATION_MODE}"),
                });
            }
            softener.apply_setting(&key, &value).await?;
            format!("Sent {key}={value}")
        }
    };

    if !global.quiet {
        eprintln!("{}", output::success(&done, output::should_color(&global.color)));
    }
    Ok(())
}
