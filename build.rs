//! Ships the default config.ini next to the built executable so a fresh
//! install seeds the per-user configuration from it.

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=config.ini");

    // OUT_DIR is target/<profile>/build/<pkg>-<hash>/out
    let Some(profile_dir) = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .and_then(|out| out.ancestors().nth(3).map(|p| p.to_path_buf()))
    else {
        return;
    };

    let source = PathBuf::from("config.ini");
    if !source.exists() {
        return;
    }

    let target = profile_dir.join("config.ini");
    if let Err(e) = fs::copy(&source, &target) {
        println!("cargo:warning=could not copy config.ini to {}: {}", target.display(), e);
    }
}
