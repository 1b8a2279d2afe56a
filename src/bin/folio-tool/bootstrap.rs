use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::decompress::decompress_files;
use crate::BootstrapArgs;

const SAMPLE_CFG: &str = include_str!("../../../folio.toml");
const SAMPLE_DATE: &str = "2024-04-22";

lazy_static! {
    static ref RES_PATH_RE: Regex = Regex::new(r#""res/([\w./]+)""#).unwrap();
}

fn write_folio_cfg(out_dir: &Path) -> Result<()> {
    let cfg_path = out_dir.join("folio.toml");
    let file = File::create(&cfg_path)
        .with_context(|| format!("Could not create {}", cfg_path.display()))?;
    let mut writer = BufWriter::new(file);

    let sample_cfg = replace_paths(out_dir, SAMPLE_CFG);
    let sample_cfg = replace_date(&sample_cfg);

    writer.write_all(sample_cfg.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Points every `res/...` path of the sample config into `prefix`.
fn replace_paths(prefix: &Path, config_data: &str) -> String {
    let prefix = prefix.to_string_lossy();
    let prefix = prefix.trim_end_matches('/');

    RES_PATH_RE.replace_all(config_data, |captures: &Captures| {
        format!("\"{}/{}\"", prefix, &captures[1])
    }).to_string()
}

fn get_current_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn replace_date(config_data: &str) -> String {
    config_data.replace(SAMPLE_DATE, &get_current_date())
}

pub fn bootstrap_cmd(args: BootstrapArgs) -> Result<()> {
    let out_path = fs::canonicalize(PathBuf::from(&args.out_dir))
        .with_context(|| format!("Error converting path to absolute: {}", args.out_dir))?;

    if !out_path.is_dir() {
        bail!("Output path must be a directory: {}", out_path.display());
    }

    decompress_files(&out_path).context("Error unpacking site resources")?;
    write_folio_cfg(&out_path).context("Error writing Folio configuration")?;

    println!("Site created in {}", out_path.display());
    println!("Set the dashboard password with FOLIO_PASSWORD before starting folio");
    Ok(())
}
