//! `condroles process` command implementation.

use std::path::PathBuf;

use clap::Args;

use super::{ConfigArgs, preprocessor, read_input, write_output};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the process command.
#[derive(Args)]
pub(crate) struct ProcessArgs {
    /// `AsciiDoc` file to process.
    input: PathBuf,

    /// Where to write the result.
    output: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

impl ProcessArgs {
    /// Execute the process command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, a file cannot be read or
    /// written, or the document hits an unrecoverable parser state.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load()?;

        let text = read_input(&self.input)?;
        let (resolved, outcome) = preprocessor(&config).process_str(&text)?;
        output.diagnostics(&outcome.diagnostics);
        write_output(&self.output, &resolved)?;

        output.success(&format!(
            "Resolved {} conditionals: {} -> {}",
            outcome.conditionals.len(),
            self.input.display(),
            self.output.display()
        ));
        Ok(())
    }
}
