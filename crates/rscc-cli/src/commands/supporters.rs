//! Address book command implementations

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::output::{format_supporters, print_error, print_success};
use crate::runtime::supporter_store;
use rscc_core::config::Supporter;

/// List the address book
pub fn supporters_list(config_path: Option<&PathBuf>) -> Result<()> {
    let store = supporter_store(config_path);
    println!("{}", format_supporters(&store.load()));
    Ok(())
}

/// Add or replace an entry
pub fn supporters_add(config_path: Option<&PathBuf>, supporter: Supporter) -> Result<()> {
    // Reject a bad port before it lands on disk
    supporter.port_number()?;

    let store = supporter_store(config_path);
    let mut supporters = store.load();

    let replaced = match supporters
        .iter_mut()
        .find(|s| s.description.eq_ignore_ascii_case(&supporter.description))
    {
        Some(existing) => {
            *existing = supporter.clone();
            true
        }
        None => {
            supporters.push(supporter.clone());
            false
        }
    };

    store
        .save(&supporters)
        .with_context(|| format!("Failed to save address book {:?}", store.path()))?;

    if replaced {
        print_success(&format!("Updated supporter '{}'", supporter.description));
    } else {
        print_success(&format!("Added supporter '{}'", supporter.description));
    }
    Ok(())
}

/// Remove an entry by description
pub fn supporters_remove(config_path: Option<&PathBuf>, description: &str) -> Result<()> {
    let store = supporter_store(config_path);
    let mut supporters = store.load();
    let before = supporters.len();
    supporters.retain(|s| !s.description.eq_ignore_ascii_case(description));

    if supporters.len() == before {
        print_error(&format!("No supporter named '{}'", description));
        anyhow::bail!("Supporter not found: {}", description);
    }

    store
        .save(&supporters)
        .with_context(|| format!("Failed to save address book {:?}", store.path()))?;
    print_success(&format!("Removed supporter '{}'", description));
    Ok(())
}
