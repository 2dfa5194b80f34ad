//! `avfetch config` – show where configuration and logs live.

use anyhow::Result;
use avfetch_core::{config, logging};

pub fn run_config() -> Result<()> {
    let cfg = config::load_or_init()?;
    println!("config file: {}", config::config_path()?.display());
    if let Ok(path) = logging::log_path() {
        println!("log file:    {}", path.display());
    }
    println!();
    print!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}
