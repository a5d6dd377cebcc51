//! Persistence, date and HTTP helpers shared by the agtable crates.

use std::path::PathBuf;

use dirs_next::home_dir;

pub mod date_handling;
pub mod http;
pub mod preferences;

pub use date_handling::{format_timestamp_millis, is_gmt_value};
pub use preferences::{InMemoryKeyValueStore, JsonKeyValueStore, KeyValueStore, KeyValueStoreError};

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if trimmed == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = trimmed.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    if let Some(rest) = trimmed.strip_prefix("~\\") {
        // Windows-style
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde(" /tmp/prefs.json "), PathBuf::from("/tmp/prefs.json"));
    }

    #[test]
    fn expand_tilde_joins_home() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_tilde("~/agtable/prefs.json"), home.join("agtable/prefs.json"));
            assert_eq!(expand_tilde("~"), home);
        }
    }
}
