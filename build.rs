// Copies the static site shell (`static/`) to `dist/` so it can be served
// next to the wasm-pack output.
use std::{env, fs, path::Path};

use fs_extra::dir::{copy, CopyOptions};

fn main() {
    println!("cargo:rerun-if-changed=static");

    let root = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
    let static_dir = Path::new(&root).join("static");
    let out_dir = Path::new(&root).join("dist");
    if !static_dir.exists() {
        println!("cargo:warning=no static/ directory; dist/ not refreshed");
        return;
    }

    if out_dir.exists() {
        fs::remove_dir_all(&out_dir).ok();
    }
    if let Err(e) = fs::create_dir_all(&out_dir) {
        println!("cargo:warning=cannot create dist/: {e}");
        return;
    }

    let options = CopyOptions::new().overwrite(true).content_only(true);
    if let Err(e) = copy(&static_dir, &out_dir, &options) {
        println!("cargo:warning=copying static/ to dist/ failed: {e}");
    }
}
