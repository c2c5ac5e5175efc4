use crate::{Result, SignInError, config::Config, output};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct ConfigInfo {
    pub path: PathBuf,
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct ConfigShowResult {
    pub config: Config,
}

impl output::OutputFormatter for ConfigInfo {
    fn format_text(&self) -> String {
        use crate::output::text;
        format!(
            "{}\n{}",
            text::key_value("Config Path", &self.path.display().to_string()),
            text::key_value("Exists", &text::yes_no(self.exists))
        )
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

impl output::OutputFormatter for ConfigShowResult {
    fn format_text(&self) -> String {
        self.config.show_masked()
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(&self.config, pretty)
    }
}

/// Writes the default configuration to `path`; refuses to overwrite.
pub fn handle_config_init(path: &Path) -> Result<ConfigInfo> {
    if path.exists() {
        return Err(SignInError::ConfigError(format!(
            "Config file already exists at {}",
            path.display()
        )));
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let toml_content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, toml_content)?;

    Ok(ConfigInfo {
        path: path.to_path_buf(),
        exists: true,
    })
}

pub fn handle_config_show(config: &Config) -> ConfigShowResult {
    ConfigShowResult {
        config: config.clone(),
    }
}

pub fn handle_config_path(path: &Path) -> ConfigInfo {
    ConfigInfo {
        path: path.to_path_buf(),
        exists: path.exists(),
    }
}
