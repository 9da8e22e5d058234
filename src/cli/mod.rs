//! CLI dispatcher (spec §6): a single binary, one subcommand per
//! pipeline stage. Each submodule owns its `clap::Args` struct and an
//! `execute` function returning `DalResult<()>`, mirroring how a
//! multi-command build tool structures its commands one file per verb.

mod bundle;
mod bundle_view;
mod compile;
mod extract;
mod key;
mod keygen;

use clap::{Parser, Subcommand};

use crate::error::DalResult;

#[derive(Parser)]
#[command(name = "daltools")]
#[command(about = "Proprietary 3D model asset pipeline toolkit")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a fresh signing + encryption keypair to disk
    Keygen(keygen::KeygenArgs),
    /// Print metadata and key type for one or more .dky files
    Key(key::KeyArgs),
    /// Compile authoring JSON scenes into .dmd model files
    Compile(compile::CompileArgs),
    /// Pack files into a DALBUNDLE archive
    Bundle(bundle::BundleArgs),
    /// Print a DALBUNDLE file's header and item listing
    BundleView(bundle_view::BundleViewArgs),
    /// Extract every item of a DALBUNDLE file to a sibling directory
    Extract(extract::ExtractArgs),
}

pub fn run(cli: Cli) -> DalResult<()> {
    match cli.command {
        Commands::Keygen(args) => keygen::execute(args),
        Commands::Key(args) => key::execute(args),
        Commands::Compile(args) => compile::execute(args),
        Commands::Bundle(args) => bundle::execute(args),
        Commands::BundleView(args) => bundle_view::execute(args),
        Commands::Extract(args) => extract::execute(args),
    }
}
