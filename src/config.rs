use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;

use crate::util::toml_date::ConfigDate;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_FEATURED_COUNT: usize = 3;
pub const DEFAULT_RETAINED_DAYS: usize = 30;

#[derive(Deserialize)]
pub struct Site {
    pub name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub description: String,
    pub base_url: String,
    pub started_on: ConfigDate,
    pub featured_count: Option<usize>,
}

#[derive(Deserialize)]
pub struct Paths {
    pub template_dir: PathBuf,
    pub public_dir: PathBuf,
    pub data_dir: PathBuf,
    pub media_dir: PathBuf,
    pub about_file: PathBuf,
}

#[derive(Deserialize)]
pub struct Server {
    pub address: String,
    pub port: u16,
    pub max_upload_bytes: Option<usize>,
    #[serde(default = "default_render_cache")]
    pub render_cache: bool,
}

fn default_render_cache() -> bool {
    true
}

#[derive(Deserialize, Default)]
pub struct Dashboard {
    /// Name of the environment variable holding the password.
    pub password_env: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Copy, Clone, Debug, PartialEq)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize)]
pub struct Metrics {
    pub location: Option<PathBuf>,
    pub retained_days: Option<usize>,
}

#[derive(Deserialize)]
pub struct RssFeed {
    pub title: String,
    pub description: String,
    pub size: usize,
}

#[derive(Deserialize)]
pub struct Config {
    pub site: Site,
    pub paths: Paths,
    pub server: Server,
    #[serde(default)]
    pub dashboard: Dashboard,
    pub log: Option<Log>,
    pub metrics: Option<Metrics>,
    pub rss_feed: Option<RssFeed>,
}

impl Config {
    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn featured_count(&self) -> usize {
        self.site.featured_count.unwrap_or(DEFAULT_FEATURED_COUNT)
    }
}

fn expand_exe_dir(path: PathBuf, exe_dir: &Path) -> PathBuf {
    match path.to_str() {
        Some(str_path) if str_path.starts_with("${exe_dir}") => {
            PathBuf::from(str_path.replacen("${exe_dir}", &exe_dir.to_string_lossy(), 1))
        }
        _ => path,
    }
}

fn expand_paths(paths: Paths, exe_dir: &Path) -> Paths {
    Paths {
        template_dir: expand_exe_dir(paths.template_dir, exe_dir),
        public_dir: expand_exe_dir(paths.public_dir, exe_dir),
        data_dir: expand_exe_dir(paths.data_dir, exe_dir),
        media_dir: expand_exe_dir(paths.media_dir, exe_dir),
        about_file: expand_exe_dir(paths.about_file, exe_dir),
    }
}

pub fn parse_config(buf: &str) -> io::Result<Config> {
    toml::from_str::<Config>(buf)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("Error parsing configuration file: {}", e)))
}

pub fn read_config(cfg_path: &Path) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.display(), e))),
    };

    let mut cfg = parse_config(&cfg_content)?;

    let cur_exe = env::current_exe()?;
    let exe_dir = cur_exe.parent().unwrap_or(Path::new("."));
    cfg.paths = expand_paths(cfg.paths, exe_dir);

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    pub const CONFIG_TOML: &str = r#"
[site]
name = "Jane Doe"
tagline = "Software and design"
base_url = "https://jane.example.com"
started_on = 2012-03-01

[paths]
template_dir = "${exe_dir}/template"
public_dir = "public"
data_dir = "data"
media_dir = "data/media"
about_file = "about.md"

[server]
address = "127.0.0.1"
port = 8001

[dashboard]
password_env = "FOLIO_PASSWORD"

[log]
level = "Info"
log_to_console = true

[rss_feed]
title = "Jane Doe"
description = "Projects and notes"
size = 20
"#;

    #[test]
    fn test_parse_config() {
        let cfg = parse_config(CONFIG_TOML).unwrap();
        assert_eq!(cfg.site.name, "Jane Doe");
        assert_eq!(cfg.site.started_on.0, NaiveDate::from_ymd_opt(2012, 3, 1).unwrap());
        assert_eq!(cfg.featured_count(), DEFAULT_FEATURED_COUNT);
        assert_eq!(cfg.max_upload_bytes(), DEFAULT_MAX_UPLOAD_BYTES);
        assert!(cfg.server.render_cache);
        assert_eq!(cfg.dashboard.password_env.as_deref(), Some("FOLIO_PASSWORD"));
        assert_eq!(cfg.log.as_ref().map(|l| l.level), Some(LogLevel::Info));
        assert!(cfg.metrics.is_none());
        assert_eq!(cfg.rss_feed.map(|r| r.size), Some(20));
    }

    #[test]
    fn test_exe_dir_expansion() {
        let cfg = parse_config(CONFIG_TOML).unwrap();
        let paths = expand_paths(cfg.paths, Path::new("/opt/folio"));
        assert_eq!(paths.template_dir, PathBuf::from("/opt/folio/template"));
        assert_eq!(paths.public_dir, PathBuf::from("public"));
    }

    #[test]
    fn test_missing_section() {
        let err = parse_config("[site]\nname = \"x\"\n").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }
}
