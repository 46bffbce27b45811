// ABOUTME: Command module aggregator for the greenswap CLI.
// ABOUTME: Re-exports validate and simulate command handlers.

mod simulate;
mod validate;

pub use simulate::{SimulateArgs, simulate};
pub use validate::validate;

use greenswap::config::Manifest;
use greenswap::error::Result;
use std::path::{Path, PathBuf};

/// Load `file`, or discover a manifest in the current directory.
fn load_manifest(file: Option<&Path>) -> Result<(PathBuf, Manifest)> {
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => Manifest::locate(&std::env::current_dir()?)?,
    };
    let manifest = Manifest::load(&path)?;
    Ok((path, manifest))
}
