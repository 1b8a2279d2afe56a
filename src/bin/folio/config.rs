use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use folio::config::{read_config, Config};

use crate::CFG_FILE_NAME;

fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("Folio")
}

fn get_config_path() -> Option<PathBuf> {
    let exe_dir = env::current_exe().ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()));
    let cur_dir = env::current_dir().ok();
    let cfg_dir = dirs::config_dir().map(|dir| dir.join("folio"));

    [exe_dir, cur_dir, cfg_dir].into_iter()
        .flatten()
        .map(|dir| dir.join(CFG_FILE_NAME))
        .find(|path| path.exists())
}

pub(crate) fn open_config(cfg_path: Option<PathBuf>) -> Result<Config> {
    let config_path = match cfg_path {
        Some(path) => path,
        None => get_config_path().ok_or_else(|| anyhow!("Could not find Folio configuration ({})", CFG_FILE_NAME))?,
    };

    println!("Reading config from {}", config_path.display());
    let mut config = read_config(&config_path)
        .with_context(|| format!("Could not load {}", config_path.display()))?;

    if let Some(ref mut log) = config.log {
        let location = log.location.take()
            .unwrap_or_else(|| cache_dir().join("log").join("server.log"));
        println!("Log enabled. Files will be written in {}", location.display());
        log.location = Some(location);
    } else {
        println!("Log disabled. Using stdout");
    }

    if let Some(ref mut metrics) = config.metrics {
        let location = metrics.location.take()
            .unwrap_or_else(|| cache_dir().join("metrics").join("visitors.log"));
        println!("Visitor history enabled. Files will be written in {}", location.display());
        metrics.location = Some(location);
    } else {
        println!("Visitor history disabled. Counters stay in memory");
    }

    if config.dashboard.password.is_some() && config.dashboard.password_env.is_none() {
        println!("Dashboard password read from the config file. Prefer dashboard.password_env");
    }

    Ok(config)
}
