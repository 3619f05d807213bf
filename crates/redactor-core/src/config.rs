use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_FUNCTIONS_REGION: &str = "australia-southeast1";
const ASSIST_FUNCTION_PATH: &str = "/aiAssist";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub post_type: Option<String>,

    // Hosted assist endpoint
    pub assist_endpoint: Option<String>,
    pub assist_token: Option<String>,
    pub functions_base_url: Option<String>,
    pub functions_region: Option<String>,
    pub project_id: Option<String>,

    // Direct providers
    pub ollama_url: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some("assist".to_string()),
            ..Self::default()
        }
    }

    /// Load the config file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        Self::save_default_model_to(&Self::get_config_path()?, model)
    }

    /// Record `model` as the default in the config file at `path`, keeping
    /// its other settings
    pub fn save_default_model_to(path: &Path, model: &str) -> Result<()> {
        let mut config = Self::load_from(path).unwrap_or_else(|_| Self::new());
        config.default_model = Some(model.to_string());
        config.save_to(path)
    }

    fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Environment values win over the file
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup("REDACTOR_ASSIST_ENDPOINT") {
            self.assist_endpoint = Some(url);
        }
        if let Some(token) = lookup("REDACTOR_ASSIST_TOKEN") {
            self.assist_token = Some(token);
        }
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            self.claude_api_key = Some(key);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
    }

    /// URL of a hosted function: the explicit base URL when set, otherwise
    /// the regional cloud functions host for the project.
    pub fn resolve_functions_url(&self, path: &str) -> Result<String> {
        if !path.starts_with('/') {
            return Err(anyhow!("Functions path must start with '/': {}", path));
        }

        if let Some(base) = self.functions_base_url.as_deref().filter(|b| !b.is_empty()) {
            return Ok(format!("{}{}", base.trim_end_matches('/'), path));
        }

        let project_id = self
            .project_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| anyhow!("No assist endpoint configured: set assist_endpoint, functions_base_url or project_id"))?;
        let region = self
            .functions_region
            .as_deref()
            .unwrap_or(DEFAULT_FUNCTIONS_REGION);
        Ok(format!("https://{}-{}.cloudfunctions.net{}", region, project_id, path))
    }

    /// The assist endpoint URL, explicit or derived from the functions host
    pub fn assist_url(&self) -> Result<String> {
        match self.assist_endpoint.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => Ok(url.to_string()),
            None => self.resolve_functions_url(ASSIST_FUNCTION_PATH),
        }
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("redactor").join("config.json"))
    }
}
