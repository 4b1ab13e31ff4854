//! Configuration management for advisor.toml and API credentials

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::profile::DEFAULT_PROFILE_PATH;

/// Name of the configuration file searched for on disk
pub const CONFIG_FILE_NAME: &str = "advisor.toml";

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const SERPER_API_KEY: &str = "SERPER_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub interview: InterviewConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Chat completions endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Retries for rate limits, server errors and transport failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Tool-calling rounds an agent may take per task
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_num_results")]
    pub num_results: usize,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    #[serde(default = "default_max_questions")]
    pub max_questions: usize,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_profile_path")]
    pub profile_path: PathBuf,
}

/// Job market the advice is aimed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub currency: String,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            name: default_region(),
            currency: default_currency(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4-turbo-preview".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_iterations() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".to_string()
}

fn default_num_results() -> usize {
    10
}

fn default_search_timeout() -> u64 {
    30
}

fn default_max_questions() -> usize {
    5
}

fn default_region() -> String {
    "Sri Lanka".to_string()
}

fn default_currency() -> String {
    "LKR".to_string()
}

fn default_profile_path() -> PathBuf {
    PathBuf::from(DEFAULT_PROFILE_PATH)
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_llm_timeout(),
            max_retries: default_max_retries(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_search_endpoint(),
            num_results: default_num_results(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            max_questions: default_max_questions(),
            region: default_region(),
            currency: default_currency(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            profile_path: default_profile_path(),
        }
    }
}

impl AdvisorConfig {
    /// Load advisor.toml from the working tree or the user config dir.
    ///
    /// Falls back to defaults when no file exists.
    pub fn load() -> Result<Self> {
        match Self::find_config_path() {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
    }

    /// Find advisor.toml in the current directory, its parents, then the user config dir
    pub fn find_config_path() -> Option<PathBuf> {
        if let Ok(mut current) = std::env::current_dir() {
            for _ in 0..10 {
                let candidate = current.join(CONFIG_FILE_NAME);
                if candidate.exists() {
                    return Some(candidate);
                }
                if !current.pop() {
                    break;
                }
            }
        }

        Self::user_config_path().filter(|p| p.exists())
    }

    /// Platform config location, e.g. ~/.config/career-advisor/advisor.toml
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("career-advisor").join(CONFIG_FILE_NAME))
    }

    /// Write a commented default configuration file
    pub fn create_default(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let default_config = r#"# career-advisor configuration
# API keys are read from OPENAI_API_KEY and SERPER_API_KEY (environment or .env)

[llm]
base_url = "https://api.openai.com/v1"
model = "gpt-4-turbo-preview"
temperature = 0.7
# max_tokens = 4096
timeout_secs = 120
max_retries = 3
# Tool-calling rounds per agent task
max_iterations = 5

[search]
enabled = true
endpoint = "https://google.serper.dev/search"
num_results = 10
timeout_secs = 30

[interview]
max_questions = 5
region = "Sri Lanka"
currency = "LKR"

[output]
profile_path = "user_profile.json"
"#;

        fs::write(path, default_config)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(path.to_path_buf())
    }

    pub fn region(&self) -> Region {
        Region {
            name: self.interview.region.clone(),
            currency: self.interview.currency.clone(),
        }
    }
}

/// API keys required by the agents
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub serper_api_key: String,
}

impl Credentials {
    /// Read keys from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read keys through a lookup function. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| -> Result<String> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
                _ => anyhow::bail!(
                    "Missing configuration: {} is not set. Add it to your environment or .env file.",
                    name
                ),
            }
        };

        Ok(Self {
            openai_api_key: require(OPENAI_API_KEY)?,
            serper_api_key: require(SERPER_API_KEY)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"<redacted>")
            .field("serper_api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AdvisorConfig::default();
        assert_eq!(config.llm.model, "gpt-4-turbo-preview");
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.interview.max_questions, 5);
        assert_eq!(config.output.profile_path, PathBuf::from("user_profile.json"));
        assert_eq!(config.region().currency, "LKR");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[llm]
model = "gpt-4o-mini"
max_retries = 1

[interview]
region = "Singapore"
currency = "SGD"
"#;

        let config: AdvisorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_retries, 1);
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert!(config.search.enabled);
        assert_eq!(config.interview.max_questions, 5);
        assert_eq!(
            config.region(),
            Region {
                name: "Singapore".to_string(),
                currency: "SGD".to_string()
            }
        );
    }

    #[test]
    fn test_create_default_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        AdvisorConfig::create_default(&path).unwrap();
        let config = AdvisorConfig::load_from(&path).unwrap();
        assert_eq!(config.search.num_results, 10);

        assert!(AdvisorConfig::create_default(&path).is_err());
    }

    #[test]
    fn test_credentials_present() {
        let env: HashMap<&str, &str> =
            [(OPENAI_API_KEY, "sk-test"), (SERPER_API_KEY, " serper ")].into();
        let creds = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.openai_api_key, "sk-test");
        assert_eq!(creds.serper_api_key, "serper");
        assert!(!format!("{:?}", creds).contains("sk-test"));
    }

    #[test]
    fn test_missing_credential_names_variable() {
        let env: HashMap<&str, &str> = [(OPENAI_API_KEY, "sk-test")].into();
        let err = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(err.to_string().contains(SERPER_API_KEY));

        let err = Credentials::from_lookup(|_| Some("  ".to_string())).unwrap_err();
        assert!(err.to_string().contains(OPENAI_API_KEY));
    }
}
