//! `bundle-view` command: prints a DALBUNDLE file's header and item
//! listing (spec §6 CLI table).

use std::path::PathBuf;

use clap::Args;

use crate::bundle::parse_bundle;
use crate::error::DalResult;

#[derive(Args)]
pub struct BundleViewArgs {
    paths: Vec<PathBuf>,
}

pub fn execute(args: BundleViewArgs) -> DalResult<()> {
    for path in &args.paths {
        let bytes = std::fs::read(path)?;
        let record = parse_bundle(&bytes)?;
        let header = record.header();

        println!("{}", path.display());
        println!("  version:        {}", header.version);
        println!("  created:        {}", header.created_datetime);
        println!("  items_count:    {}", header.items_count);
        println!("  items_size:     {} ({} compressed)", header.items_size, header.items_size_z);
        println!("  data_size:      {} ({} compressed)", header.data_size, header.data_size_z);

        for item in record.items() {
            println!("    {} @ {} ({} bytes)", item.name, item.offset, item.size);
        }

        let overflowing = record.overflowing_items();
        if !overflowing.is_empty() {
            log::warn!("{}: overflowing item(s): {}", path.display(), overflowing.join(", "));
        }
    }
    Ok(())
}
