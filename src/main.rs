//! buildline - run CI build jobs from the command line
//!
//! ## Commands
//!
//! - `buildline run job.yml` - Run a job through the default pipeline
//! - `buildline plugins` - List the registered plugins
//! - `buildline completions` - Generate shell completions
//!
//! ## Quick Start
//!
//! ```bash
//! # Run a job locally, or on the host named in its `remote` block
//! buildline run job.yml
//!
//! # Fan the build step out over four units
//! buildline run job.yml --plugin parallel --option steps=4
//!
//! # Generate shell completions
//! buildline completions bash > /etc/bash_completion.d/buildline
//! ```

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if std::env::var("BUILDLINE_VERBOSE").is_ok() {
                eprintln!("{e:?}");
            }
            ExitCode::FAILURE
        }
    }
}
