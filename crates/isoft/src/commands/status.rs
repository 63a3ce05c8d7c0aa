use isoft_core::Softener;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(softener: &Softener, global: &GlobalOpts) -> Result<(), CliError> {
    let reading = softener.fetch_reading().await?;
    let out = output::render_single(
        &global.output,
        &reading,
        |r| Ok(output::reading_table(r)),
        output::reading_plain,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
