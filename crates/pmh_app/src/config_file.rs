use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use pmh_core::ProviderConfig;
use pmh_logging::pmh_info;

/// Reads a provider configuration from a RON file.
pub(crate) fn load_config(path: &Path) -> Result<ProviderConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration from {path:?}"))?;
    let config: ProviderConfig = ron::from_str(&content)
        .with_context(|| format!("failed to parse configuration from {path:?}"))?;
    pmh_info!(
        "Loaded configuration for {:?} from {:?} ({} harvestable format(s))",
        config.identity.repository_name,
        path,
        config.formats.iter_harvestable().count()
    );
    Ok(config)
}
