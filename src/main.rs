//! # fp-audit CLI
//!
//! Command-line interface for the fingerprint audit.
//!
//! ## Usage
//! ```bash
//! fp-audit compare ./originals ./renamed
//! fp-audit compare ./originals ./renamed --mode perceptual --output json
//! ```

mod cli;

use fingerprint_audit::Result;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    fingerprint_audit::init_tracing();
    cli::run()
}
