//! Key command implementations

use anyhow::Result;

use crate::output::{print_error, print_success};
use rscc_core::key::{self, KEY_LENGTH};
use rscc_core::SessionKey;

/// Print a (possibly partial) key in display form
pub fn key_format(input: &str) -> Result<()> {
    let raw = key::deformat(input.trim());
    if raw.is_empty() || raw.len() > KEY_LENGTH || !raw.chars().all(|c| c.is_ascii_digit()) {
        print_error(&format!("Not a key: {}", input));
        anyhow::bail!("Keys are 1 to {} digits", KEY_LENGTH);
    }
    println!("{}", key::format(&raw));
    Ok(())
}

/// Check that a key is complete
pub fn key_validate(input: &str) -> Result<()> {
    match SessionKey::parse(input) {
        Ok(key) => {
            print_success(&format!("{} is a valid key", key.display()));
            Ok(())
        }
        Err(e) => {
            print_error(&format!("Invalid key: {}", e));
            Err(e.into())
        }
    }
}
