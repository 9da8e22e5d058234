//! `bundle` command: expands glob inputs and packs them into a
//! DALBUNDLE file (spec §6 CLI table, §4.7).

use std::path::PathBuf;

use clap::Args;

use crate::bundle::build_bundle;
use crate::error::{DalError, DalResult};

#[derive(Args)]
pub struct BundleArgs {
    #[arg(short = 'o')]
    output: PathBuf,

    inputs: Vec<String>,
}

pub fn execute(args: BundleArgs) -> DalResult<()> {
    let mut files = Vec::new();
    for pattern in &args.inputs {
        let paths = glob::glob(pattern)
            .map_err(|e| DalError::InvariantViolation(format!("bad glob pattern '{pattern}': {e}")))?;
        for entry in paths {
            let path = entry.map_err(|e| DalError::Io(e.into_error()))?;
            if path.is_file() {
                files.push(path);
            }
        }
    }

    let mut inputs = Vec::with_capacity(files.len());
    for path in &files {
        let bytes = std::fs::read(path)?;
        inputs.push((path.to_string_lossy().into_owned(), bytes));
    }

    let bytes = build_bundle(&inputs)?;
    std::fs::write(&args.output, &bytes)?;
    log::info!(
        "wrote {} ({} item(s))",
        args.output.display(),
        inputs.len()
    );
    Ok(())
}
