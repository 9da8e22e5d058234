//! daltools: a proprietary 3D model asset pipeline toolkit — DMD binary
//! model codec, DALBUNDLE indexed resource archives, a keypair/signing
//! facility, and the scene-graph optimisation passes that convert an
//! authoring scene into a runtime model.

pub mod bundle;
pub mod byte_codec;
pub mod cli;
pub mod compression;
pub mod crypto;
pub mod dmd;
pub mod error;
pub mod image;
pub mod model;
pub mod resource_manager;
pub mod scene;
pub mod vfs;
