use anyhow::Result;

use crate::args::{Cli, Command};

mod diff;
mod verify;

/// Run the selected command and return the process exit code.
pub fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Diff {
            from,
            to,
            registry_from,
            registry_to,
            bindings,
            raw_schema,
            detail,
            report_out,
        } => diff::run(
            &from,
            &to,
            registry_from.as_deref(),
            registry_to.as_deref(),
            bindings.as_deref(),
            raw_schema.as_deref(),
            detail,
            report_out.as_deref(),
        ),
        Command::Verify { target } => verify::run(target),
    }
}
