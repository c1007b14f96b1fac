//! `condroles roles` command implementation.

use std::collections::BTreeSet;

use clap::Args;
use condroles_config::split_values;
use condroles_core::RoleFormat;

use super::{ConfigArgs, role_format};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the roles command.
#[derive(Args)]
pub(crate) struct RolesArgs {
    /// Values, space or comma separated.
    #[arg(required = true)]
    values: Vec<String>,

    /// Use the values as given instead of every other value.
    #[arg(long)]
    ifdef: bool,

    /// Print the inline `.a.b` form instead of `role="a b"`.
    #[arg(long)]
    dot: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

impl RolesArgs {
    /// Execute the roles command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load()?;

        let given = split_values(&self.values);
        for unknown in given.difference(config.values()) {
            output.warning(&format!("warning: unknown value '{unknown}'"));
        }

        let selected = select(config.values(), given, self.ifdef);
        output.result(&render(&role_format(&config), &selected, self.dot));
        Ok(())
    }
}

/// Values the roles are printed for: `given` itself, or every other value
/// of `universe` when inverting.
fn select(universe: &BTreeSet<String>, given: BTreeSet<String>, ifdef: bool) -> BTreeSet<String> {
    if ifdef {
        given
    } else {
        universe.difference(&given).cloned().collect()
    }
}

/// Role markup for `values`; empty when there are none.
fn render(roles: &RoleFormat, values: &BTreeSet<String>, dot: bool) -> String {
    if values.is_empty() {
        String::new()
    } else if dot {
        roles.dotted(values)
    } else {
        roles.assignment(values)
    }
}
