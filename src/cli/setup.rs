use super::ui;
use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::path::Path;

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

/// Writes the example config to the default location and prints what to run next.
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    setup_at_path(&path)?;
    println!("{}", next_steps(&path));
    Ok(())
}

fn next_steps(path: &Path) -> String {
    [
        ui::style_text("Configuration written", ui::StyleType::Success),
        format!("  1. Point database.url in {} at your database", path.display()),
        "  2. Run `ratesync init` to create the rates and users tables".to_string(),
        "  3. Run `ratesync rates` and `ratesync users --file <csv>` to load data".to_string(),
    ]
    .join("\n")
}

/// Creates a default configuration file at the specified path
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
