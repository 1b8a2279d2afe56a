use std::fs::File;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use flate2::write::GzEncoder;
use flate2::Compression;

// Site data written by a local run also lives under res/ and must not ship
const PACKED_DIRS: &[&str] = &["template", "public"];
const PACKED_FILES: &[&str] = &["about.md"];

fn get_file_name(path: &Path) -> PathBuf {
    let last = path.file_name().unwrap().to_str().unwrap();
    let file_name = format!("{}.tar.gz", last);
    let out_dir = env::var("OUT_DIR").unwrap();
    PathBuf::from(out_dir).join(file_name)
}

fn compress_dir(path: &Path) -> io::Result<()> {
    let archive_path = get_file_name(path);
    let _ = fs::remove_file(&archive_path);

    let tar_gz = File::create(archive_path)?;
    let enc = GzEncoder::new(tar_gz, Compression::default());
    let mut tar = tar::Builder::new(enc);
    for dir in PACKED_DIRS {
        tar.append_dir_all(dir, path.join(dir))?;
    }
    for file in PACKED_FILES {
        tar.append_path_with_name(path.join(file), file)?;
    }
    tar.into_inner()?.finish()?;
    Ok(())
}

fn compress_resources() {
    let current_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let res_dir = PathBuf::from(&current_dir).join("res");
    println!("cargo:rerun-if-changed=res/template");
    println!("cargo:rerun-if-changed=res/public");
    println!("cargo:rerun-if-changed=res/about.md");
    compress_dir(&res_dir).unwrap()
}

fn main() {
    compress_resources();
}
