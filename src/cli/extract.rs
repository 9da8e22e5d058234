//! `extract` command: writes every item of a DALBUNDLE file to a
//! sibling directory, auto-suffixed to avoid collision (spec §6 CLI
//! table).

use std::path::{Path, PathBuf};

use clap::Args;

use crate::bundle::parse_bundle;
use crate::error::{DalError, DalResult};

#[derive(Args)]
pub struct ExtractArgs {
    paths: Vec<PathBuf>,
}

const MAX_SUFFIX_ATTEMPTS: u32 = 1000;

/// `<stem>`, then `<stem>_000`, `<stem>_001`, ... until a name that
/// does not already exist on disk is found, giving up after
/// `MAX_SUFFIX_ATTEMPTS` collisions.
fn pick_output_dir(bundle_path: &Path) -> DalResult<PathBuf> {
    let parent = bundle_path.parent().unwrap_or_else(|| Path::new("."));
    let stem = bundle_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("bundle");

    let plain = parent.join(stem);
    if !plain.exists() {
        return Ok(plain);
    }
    for n in 0..MAX_SUFFIX_ATTEMPTS {
        let candidate = parent.join(format!("{stem}_{n:03}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(DalError::Io(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("could not find a free output directory name for '{stem}' after {MAX_SUFFIX_ATTEMPTS} attempts"),
    )))
}

pub fn execute(args: ExtractArgs) -> DalResult<()> {
    for path in &args.paths {
        let bytes = std::fs::read(path)?;
        let record = parse_bundle(&bytes)?;

        let out_dir = pick_output_dir(path)?;
        std::fs::create_dir_all(&out_dir)?;

        for item in record.items() {
            let data = record
                .lookup(&item.name)?
                .ok_or_else(|| DalError::NameNotFound(item.name.clone()))?;
            std::fs::write(out_dir.join(&item.name), &data)?;
        }

        log::info!(
            "extracted {} item(s) from {} to {}",
            record.items().len(),
            path.display(),
            out_dir.display()
        );
    }
    Ok(())
}
