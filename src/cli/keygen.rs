//! `keygen` command: writes `<prefix>-data_sec.dky` and
//! `<prefix>-data_pub.dky` (spec §6 CLI table).

use clap::Args;

use crate::crypto::{gen_data_keypair, serialise_key_public, serialise_key_secret, KeyMetadata};
use crate::error::DalResult;

#[derive(Args)]
pub struct KeygenArgs {
    /// Output path prefix
    #[arg(short = 'o')]
    prefix: String,

    #[arg(long, default_value = "")]
    owner: String,

    #[arg(long, default_value = "")]
    email: String,

    #[arg(long, default_value = "")]
    description: String,
}

pub fn execute(args: KeygenArgs) -> DalResult<()> {
    let md = KeyMetadata::new(args.owner, args.email, args.description);
    let (public, secret) = gen_data_keypair();

    let pub_path = format!("{}-data_pub.dky", args.prefix);
    let sec_path = format!("{}-data_sec.dky", args.prefix);

    std::fs::write(&pub_path, serialise_key_public(&public, &md)?)?;
    std::fs::write(&sec_path, serialise_key_secret(&secret, &md)?)?;

    log::info!("wrote {pub_path}");
    log::info!("wrote {sec_path}");
    Ok(())
}
