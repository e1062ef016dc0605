use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use fs_extra::{copy_items, dir::CopyOptions};

// Shaders, OBJ/MTL files, textures and the bootstrap manifest live in /assets/.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let assets = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?).join("assets");
    if !assets.is_dir() {
        return Ok(());
    }
    let out_dir = env::var("OUT_DIR")?;
    let options = CopyOptions {
        overwrite: true,
        ..CopyOptions::new()
    };
    copy_items(&[&assets], &out_dir, &options)
        .with_context(|| format!("copying {} into {}", assets.display(), out_dir))?;

    Ok(())
}
