//! `condroles inspect` command implementation.

use std::path::PathBuf;

use clap::Args;

use super::{ConfigArgs, preprocessor, read_input, write_output};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the inspect command.
#[derive(Args)]
pub(crate) struct InspectArgs {
    /// `AsciiDoc` file to inspect.
    input: PathBuf,

    /// Where to write the parse and the conditionals map.
    output: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

impl InspectArgs {
    /// Execute the inspect command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, a file cannot be read or
    /// written, or the document hits an unrecoverable parser state.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load()?;

        let text = read_input(&self.input)?;
        let lines: Vec<&str> = text.lines().collect();
        let inspection = preprocessor(&config).inspect(&lines)?;
        output.diagnostics(&inspection.diagnostics);

        let report = format!(
            "{}\n\n{}\n",
            inspection.document.pretty(),
            inspection.conditionals.pretty()
        );
        write_output(&self.output, &report)?;

        output.success(&format!(
            "Inspected {} -> {}",
            self.input.display(),
            self.output.display()
        ));
        Ok(())
    }
}
