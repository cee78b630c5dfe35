//! On-disk TOML schema.
//!
//! Every field has a default so partial files are accepted; unknown keys are
//! rejected so typos surface at startup instead of being silently ignored.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE_MAPS_URL: &str =
    "https://raw.githubusercontent.com/zerootoad/discord-rich-presence-lsp/main/assets/languages.json";
pub const DEFAULT_ASSETS_URL: &str =
    "https://raw.githubusercontent.com/zerootoad/discord-rich-presence-lsp/main/assets";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub discord: DiscordSection,
    pub git: GitSection,
    pub lsp: LspSection,
    pub language_maps: LanguageMapsSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscordSection {
    pub application_id: String,
    pub small_usage: String,
    pub large_usage: String,
    pub retry_after: String,
    pub update_interval: String,
    pub activity: ActivitySection,
}

impl Default for DiscordSection {
    fn default() -> Self {
        Self {
            application_id: String::new(),
            small_usage: "language".to_string(),
            large_usage: "editor".to_string(),
            retry_after: "1m".to_string(),
            update_interval: "2s".to_string(),
            activity: ActivitySection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivitySection {
    pub idle_action: String,
    pub view_action: String,
    pub edit_action: String,
    pub edit_line_action: String,
    pub state: String,
    pub details: String,
    pub large_image: String,
    pub large_text: String,
    pub small_image: String,
    pub small_text: String,
    pub timestamp: bool,
    pub editing_info: bool,
    pub line_offset: LineOffset,
}

impl Default for ActivitySection {
    fn default() -> Self {
        Self {
            idle_action: "Idle in {editor}".to_string(),
            view_action: "Viewing {filename}".to_string(),
            edit_action: "Editing {filename}".to_string(),
            edit_line_action: "Editing {filename}:{line}".to_string(),
            state: "{action}".to_string(),
            details: "In {workspace}".to_string(),
            large_image: String::new(),
            large_text: "{editor}".to_string(),
            small_image: String::new(),
            small_text: "Coding in {language}".to_string(),
            timestamp: true,
            editing_info: true,
            line_offset: LineOffset::Number(1),
        }
    }
}

/// Signed line adjustment, written either as a number or as `"+1"`/`"-1"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineOffset {
    Number(i64),
    Expression(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitSection {
    pub git_info: bool,
}

impl Default for GitSection {
    fn default() -> Self {
        Self { git_info: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LspSection {
    /// Idle timeout.
    pub timeout: String,
    pub view_timeout: String,
}

impl Default for LspSection {
    fn default() -> Self {
        Self {
            timeout: "5m".to_string(),
            view_timeout: "30s".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LanguageMapsSection {
    pub url: String,
    pub assets_url: String,
}

impl Default for LanguageMapsSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_LANGUAGE_MAPS_URL.to_string(),
            assets_url: DEFAULT_ASSETS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: String,
    pub output: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: "file".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_toml_roundtrip() {
        let text = toml::to_string(&ConfigFile::default()).unwrap();
        let parsed: ConfigFile = toml::from_str(&text).unwrap();
        assert_eq!(parsed, ConfigFile::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let parsed: ConfigFile = toml::from_str("[lsp]\ntimeout = \"10m\"\n").unwrap();
        assert_eq!(parsed.lsp.timeout, "10m");
        assert_eq!(parsed.lsp.view_timeout, "30s");
        assert_eq!(parsed.discord.activity.edit_action, "Editing {filename}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = toml::from_str::<ConfigFile>("[lsp]\ntimeuot = \"10m\"\n").unwrap_err();
        assert!(err.to_string().contains("timeuot"));
    }

    #[test]
    fn line_offset_accepts_number_or_expression() {
        let parsed: ConfigFile =
            toml::from_str("[discord.activity]\nline_offset = \"-1\"\n").unwrap();
        assert_eq!(
            parsed.discord.activity.line_offset,
            LineOffset::Expression("-1".to_string())
        );
        let parsed: ConfigFile = toml::from_str("[discord.activity]\nline_offset = 0\n").unwrap();
        assert_eq!(parsed.discord.activity.line_offset, LineOffset::Number(0));
    }
}
