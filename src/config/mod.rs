use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Channel analyzed when neither the CLI nor the config names one.
pub const DEFAULT_CHANNEL_ID: &str = "UC_x5XG1OV2P6uZZ5FSM9Ttw";
pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const DEFAULT_RETRIES: u32 = 1;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 300;
pub const API_KEY_ENV: &str = "YOUTUBE_API";

/// `[youtube]` block from config.toml.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct YouTubeConfig {
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub base_url: Option<String>,
    pub default_channel: Option<String>,
    pub max_results: Option<usize>,
}

/// `[pipeline]` block from config.toml.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct PipelineConfig {
    pub retries: Option<u32>,
    pub retry_delay_secs: Option<u64>,
}

/// Top-level yts config file structure.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct YtsConfig {
    pub youtube: Option<YouTubeConfig>,
    pub pipeline: Option<PipelineConfig>,
}

impl YtsConfig {
    /// Load config from ~/.yts/config.toml. Returns default if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(YtsConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse config.toml")
    }

    pub fn channel_id(&self, cli_channel: Option<&str>) -> String {
        cli_channel
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .or_else(|| self.youtube.as_ref().and_then(|y| y.default_channel.clone()))
            .unwrap_or_else(|| DEFAULT_CHANNEL_ID.to_string())
    }

    pub fn max_results(&self, cli_max: Option<usize>) -> usize {
        cli_max
            .or_else(|| self.youtube.as_ref().and_then(|y| y.max_results))
            .unwrap_or(DEFAULT_MAX_RESULTS)
    }

    pub fn retries(&self, cli_retries: Option<u32>) -> u32 {
        cli_retries
            .or_else(|| self.pipeline.as_ref().and_then(|p| p.retries))
            .unwrap_or(DEFAULT_RETRIES)
    }

    pub fn retry_delay_secs(&self, cli_delay: Option<u64>) -> u64 {
        cli_delay
            .or_else(|| self.pipeline.as_ref().and_then(|p| p.retry_delay_secs))
            .unwrap_or(DEFAULT_RETRY_DELAY_SECS)
    }

    /// Display config with secrets redacted.
    pub fn display_redacted(&self) -> String {
        let mut lines = Vec::new();
        if let Some(ref yt) = self.youtube {
            lines.push("[youtube]".to_string());
            if let Some(ref key) = yt.api_key {
                lines.push(format!("  api_key = \"{}\"", redact(key)));
            }
            if let Some(ref cmd) = yt.api_key_command {
                lines.push(format!("  api_key_command = \"{}\"", cmd));
            }
            if let Some(ref url) = yt.base_url {
                lines.push(format!("  base_url = \"{}\"", url));
            }
            if let Some(ref channel) = yt.default_channel {
                lines.push(format!("  default_channel = \"{}\"", channel));
            }
            if let Some(max) = yt.max_results {
                lines.push(format!("  max_results = {}", max));
            }
        }
        if let Some(ref p) = self.pipeline {
            lines.push("[pipeline]".to_string());
            if let Some(retries) = p.retries {
                lines.push(format!("  retries = {}", retries));
            }
            if let Some(delay) = p.retry_delay_secs {
                lines.push(format!("  retry_delay_secs = {}", delay));
            }
        }
        if lines.is_empty() {
            lines.push("(nothing configured)".to_string());
        }
        lines.join("\n")
    }
}

fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

/// Resolve the API key through the chain: CLI flag > env var > config key > config command.
pub fn resolve_credential(
    cli_flag: Option<&str>,
    env_var_name: &str,
    config: Option<&YouTubeConfig>,
) -> Result<String> {
    // 1. CLI flag
    if let Some(key) = cli_flag {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    // 2. Environment variable
    if let Ok(val) = std::env::var(env_var_name) {
        if !val.is_empty() {
            return Ok(val);
        }
    }

    if let Some(yc) = config {
        // 3. Config file api_key
        if let Some(ref key) = yc.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }

        // 4. External command
        if let Some(ref cmd) = yc.api_key_command {
            if !cmd.is_empty() {
                let output = std::process::Command::new("sh")
                    .arg("-c")
                    .arg(cmd)
                    .output()
                    .with_context(|| format!("Failed to run api_key_command: {cmd}"))?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    bail!(
                        "api_key_command failed (exit {}): {}",
                        output.status.code().unwrap_or(-1),
                        stderr.trim()
                    );
                }

                let secret = String::from_utf8(output.stdout)
                    .context("api_key_command output is not valid UTF-8")?
                    .trim()
                    .to_string();

                if !secret.is_empty() {
                    return Ok(secret);
                }
            }
        }
    }

    bail!(
        "No API key found. Provide via --api-key, {} env var, or ~/.yts/config.toml",
        env_var_name
    );
}

/// Path to the config file: ~/.yts/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".yts").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.yts/config.toml
# Credential resolution order: CLI flag > YOUTUBE_API env var > api_key > api_key_command

[youtube]
# api_key = "your-youtube-data-api-key"
# api_key_command = "your-secrets-manager-command-here"
# default_channel = "UC_x5XG1OV2P6uZZ5FSM9Ttw"
# max_results = 20

[pipeline]
# retries = 1
# retry_delay_secs = 300
"#
}

/// Create the default config file if it doesn't already exist.
pub fn init_config() -> Result<bool> {
    let path = config_path()?;
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, default_config_template())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_empty_blocks() {
        let config = YtsConfig::parse(default_config_template()).unwrap();
        assert_eq!(config.channel_id(None), DEFAULT_CHANNEL_ID);
        assert_eq!(config.max_results(None), DEFAULT_MAX_RESULTS);
        assert_eq!(config.retries(None), DEFAULT_RETRIES);
        assert_eq!(config.retry_delay_secs(None), DEFAULT_RETRY_DELAY_SECS);
    }

    #[test]
    fn cli_values_override_config_file() {
        let config = YtsConfig::parse(
            r#"
            [youtube]
            default_channel = "UC_from_file"
            max_results = 75

            [pipeline]
            retries = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.channel_id(None), "UC_from_file");
        assert_eq!(config.channel_id(Some("UC_cli")), "UC_cli");
        assert_eq!(config.max_results(None), 75);
        assert_eq!(config.max_results(Some(5)), 5);
        assert_eq!(config.retries(None), 3);
        assert_eq!(config.retry_delay_secs(Some(0)), 0);
    }

    #[test]
    fn credential_prefers_cli_flag_then_config() {
        let yc = YouTubeConfig {
            api_key: Some("from-config".into()),
            ..Default::default()
        };
        let env = "YTS_TEST_UNSET_CREDENTIAL_VAR";
        assert_eq!(
            resolve_credential(Some("from-cli"), env, Some(&yc)).unwrap(),
            "from-cli"
        );
        assert_eq!(resolve_credential(None, env, Some(&yc)).unwrap(), "from-config");
        assert!(resolve_credential(None, env, None).is_err());
    }

    #[test]
    fn credential_can_come_from_command() {
        let yc = YouTubeConfig {
            api_key_command: Some("echo '  secret-from-cmd  '".into()),
            ..Default::default()
        };
        let key = resolve_credential(None, "YTS_TEST_UNSET_CREDENTIAL_VAR", Some(&yc)).unwrap();
        assert_eq!(key, "secret-from-cmd");
    }

    #[test]
    fn redacted_display_hides_key() {
        let config = YtsConfig {
            youtube: Some(YouTubeConfig {
                api_key: Some("AIzaSyExampleKey1234".into()),
                ..Default::default()
            }),
            pipeline: None,
        };
        let shown = config.display_redacted();
        assert!(shown.contains("AIza...1234"));
        assert!(!shown.contains("ExampleKey"));
    }

    #[test]
    fn redact_counts_characters_not_bytes() {
        assert_eq!(redact("ключ-секрет-ёж"), "ключ...т-ёж");
        assert_eq!(redact("äöüäöü"), "****");
    }
}
