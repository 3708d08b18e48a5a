//! Config command implementations

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use crate::runtime::config_file;
use rscc_core::config::{self, RsccConfig};

/// Show current configuration
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = config_file(config_path);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Built-in defaults:");
        println!();
        println!("{}", toml::to_string_pretty(&RsccConfig::default())?);
        print_info("Run 'rscc config init' to write them to disk");
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    println!("{}", content);

    let parsed: RsccConfig = config::load_config(&path)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;
    if let Err(e) = parsed.validate() {
        print_warning(&format!("Configuration is not usable: {}", e));
    }

    Ok(())
}

/// Print the config file path
pub fn config_path(config_path: Option<&PathBuf>) -> Result<()> {
    println!("{}", config_file(config_path).display());
    Ok(())
}

/// Write the default configuration
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = config_file(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(&path, &RsccConfig::default())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    print_success(&format!("Created configuration file: {:?}", path));

    let scripts_dir = RsccConfig::default().programs.scripts_dir;
    if !scripts_dir.exists() {
        print_info(&format!(
            "Install the key-server scripts into {:?} before starting a session",
            scripts_dir
        ));
    }

    Ok(())
}
