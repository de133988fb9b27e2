use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// The two Carto table names, read from the Jekyll site config.
/// All other keys in `_config.yml` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub carto_metadata: String,
    pub carto_routes: String,
}

pub fn load(path: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let config = serde_yaml::from_str(&raw)
        .with_context(|| format!("cannot parse config {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignores_unknown_keys() {
        let raw = "title: Passages\ncarto_metadata: meta_table\ncarto_routes: routes_table\n";
        let config: Config = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.carto_metadata, "meta_table");
        assert_eq!(config.carto_routes, "routes_table");
    }

    #[test]
    fn test_missing_table_name_is_error() {
        let raw = "carto_metadata: meta_table\n";
        assert!(serde_yaml::from_str::<Config>(raw).is_err());
    }
}
