//! A tour of a JSON-backed tree.
//!
//! Mounts a document (a scratch file, or the path given as the first
//! argument), builds a small tree, moves things around and prints the
//! document after each step.
//!
//! Run with: `RUST_LOG=jsonfs=debug cargo run --example walkthrough [tree.json]`

use jsonfs::*;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Keep the scratch directory alive until the end of main.
    let scratch = tempfile::tempdir()?;
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| scratch.path().join("tree.json"));

    let fs = JsonFs::mount_with(&path, MountOptions::default().with_pretty(true))?;
    let root = fs.root();

    // =========================================================================
    // Build
    // =========================================================================

    let docs = root.mkdir("docs")?;
    let notes = docs.create("notes.txt", OpenFlags::READ_WRITE, Mode::REGULAR)?;
    notes.write_at(0, b"first line\n")?;

    let log = docs.create("log.txt", OpenFlags::APPEND, Mode::REGULAR)?;
    log.write_at(0, b"one\n")?;
    log.write_at(0, b"two\n")?;

    show("after build", &fs)?;

    // =========================================================================
    // Move
    // =========================================================================

    let archive = root.mkdir("archive")?;
    docs.rename("notes.txt", &archive, "2024-notes.txt")?;
    println!("notes now at {}", notes.entry().path().display());

    // Sessions follow their entry through renames.
    notes.write_at(11, b"second line\n")?;
    show("after rename", &fs)?;

    // =========================================================================
    // Inspect
    // =========================================================================

    for dir in [&root, &docs, &archive] {
        println!("{}:", dir.path().display());
        for item in dir.read_dir()? {
            let item = item?;
            let meta = dir.lookup(&item.name)?.getattr()?;
            println!(
                "  {:>3}  {:<16} {:?} {} bytes",
                item.inode, item.name, item.file_type, meta.size
            );
        }
    }

    // =========================================================================
    // Protocol-engine view
    // =========================================================================

    let inode = fs.path_to_inode(std::path::Path::new("/archive/2024-notes.txt"))?;
    let handle = FsHandles::open(&fs, inode, OpenFlags::READ)?;
    let mut buf = [0u8; 64];
    let n = FsHandles::read_at(&fs, handle, &mut buf, 0)?;
    print!("{}", String::from_utf8_lossy(&buf[..n]));
    FsHandles::close(&fs, handle)?;

    notes.close();
    log.close();
    Ok(())
}

fn show(step: &str, fs: &JsonFs) -> Result<(), Box<dyn std::error::Error>> {
    println!("--- {step} ---");
    println!("{}", std::fs::read_to_string(fs.backing_path())?);
    Ok(())
}
