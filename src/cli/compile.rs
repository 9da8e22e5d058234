//! `compile` command: authoring JSON -> optimised Model -> .dmd file.
//! Runs the full pipeline named in spec §6: `flip_uv_vertically`,
//! `clear_collection_info`, `optimize_scene`, conversion to `Model`,
//! then DMD encoding with the requested compression method.

use std::path::PathBuf;

use clap::Args;

use crate::dmd::{encode_dmd, CompressionMethod};
use crate::error::{DalError, DalResult};
use crate::model::convert::convert_scene_to_model;
use crate::scene::passes::{clear_collection_info, flip_uv_vertically, optimize_scene};
use crate::scene::Scene;

#[derive(Args)]
pub struct CompileArgs {
    /// Compression method: 0/none, 1/zip, 2/brotli (default 2)
    #[arg(short = 'c', default_value = "2")]
    compression: String,

    files: Vec<PathBuf>,
}

fn parse_compression(flag: &str) -> DalResult<CompressionMethod> {
    match flag {
        "0" | "none" => Ok(CompressionMethod::None),
        "1" | "zip" => Ok(CompressionMethod::Deflate),
        "2" | "brotli" => Ok(CompressionMethod::Brotli),
        other => Err(DalError::KeyInvalid(format!(
            "unknown compression method '{other}'"
        ))),
    }
}

pub fn execute(args: CompileArgs) -> DalResult<()> {
    let method = parse_compression(&args.compression)?;

    for path in &args.files {
        log::info!("compiling {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let mut scene: Scene = serde_json::from_str(&text)?;

        let asset_dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));

        flip_uv_vertically(&mut scene);
        clear_collection_info(&mut scene);
        optimize_scene(&mut scene, asset_dir)?;

        let model = convert_scene_to_model(&scene)?;
        let bytes = encode_dmd(&model, method)?;

        let out_path = path.with_extension("dmd");
        std::fs::write(&out_path, &bytes)?;
        log::info!("wrote {}", out_path.display());
    }
    Ok(())
}
