//! `key` command: prints metadata and key type for each `.dky` file.

use std::path::PathBuf;

use clap::Args;

use crate::crypto::{deserialise_key, VKeys};
use crate::error::DalResult;

#[derive(Args)]
pub struct KeyArgs {
    files: Vec<PathBuf>,
}

/// Scans every path and prints what it can; a bad file logs an error
/// and does not stop the remaining paths from being processed. The
/// first failure's error is returned once all paths are done, so the
/// process still exits non-zero.
pub fn execute(args: KeyArgs) -> DalResult<()> {
    let mut first_err = None;

    for path in &args.files {
        if let Err(e) = print_one(path) {
            log::error!("{}: {e}", path.display());
            first_err.get_or_insert(e);
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn print_one(path: &std::path::Path) -> DalResult<()> {
    let text = std::fs::read_to_string(path)?;
    let (keys, md) = deserialise_key(&text)?;
    let kind = match keys {
        VKeys::Public(_) => "public",
        VKeys::Secret(_) => "secret",
    };
    println!("{}: {kind} key", path.display());
    println!("  owner:       {}", md.owner_name);
    println!("  email:       {}", md.email);
    println!("  description: {}", md.description);
    println!("  created:     {}", md.created_time);
    Ok(())
}
