//! Build script for the Coinbase account relay.
//!
//! Copies the `.env.example` configuration template into the user's local
//! data directory, next to the location where the relay looks for its `.env`
//! file when none is given on the command line.

use std::{env, fs, path::PathBuf};

/// Copies `.env.example` to `<data_local_dir>/coinbase-relay/.env.example`.
///
/// A missing template or an unwritable data directory only produces a cargo
/// warning.
///
/// # Destination Location
/// - Linux: `~/.local/share/coinbase-relay/.env.example`
/// - macOS: `~/Library/Application Support/coinbase-relay/.env.example`
/// - Windows: `%LOCALAPPDATA%/coinbase-relay/.env.example`
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    if !env_example_path.is_file() {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
        return Ok(());
    }

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("coinbase-relay");

    // Read-only home directories (CI, sandboxes) must not break the build.
    if let Err(e) = fs::create_dir_all(&out_dir)
        .and_then(|_| fs::copy(&env_example_path, out_dir.join(".env.example")))
    {
        println!(
            "cargo:warning=cannot copy .env.example to {}: {}",
            out_dir.display(),
            e
        );
    }

    Ok(())
}
