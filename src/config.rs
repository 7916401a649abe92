use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// `config.toml` schema. Every field is optional; the file is a partial
/// overlay on top of the defaults in [`Config`].
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub settings: SettingsSection,
    #[serde(default)]
    pub chat: ChatSection,
    #[serde(default)]
    pub voice: VoiceSection,
    #[serde(default)]
    pub monitor: MonitorSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsSection {
    pub wake_phrase: Option<String>,
    pub max_history: Option<usize>,
    pub reminder_interval_secs: Option<u64>,
    pub monitor_interval_secs: Option<u64>,
    pub engaged_timeout_secs: Option<u64>,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VoiceSection {
    /// Premium cloud TTS endpoint and key; skipped when absent.
    pub premium_endpoint: Option<String>,
    pub premium_api_key: Option<String>,
    /// Free cloud TTS endpoint; skipped when absent.
    pub free_endpoint: Option<String>,
    pub voice_id: Option<String>,
    /// Audio player for cloud TTS output.
    pub player: Option<String>,
    /// Local synthesizer command, the last fallback.
    pub local_command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonitorSection {
    pub source_timeout_ms: Option<u64>,
    /// Command printing "app<TAB>title" for the foreground window.
    pub window_command: Option<Vec<String>>,
    /// Command printing visible screen text.
    pub ocr_command: Option<Vec<String>>,
    /// Command printing "label<TAB>confidence".
    pub emotion_command: Option<Vec<String>>,
    /// Browser opener used for web searches.
    pub opener: Option<String>,
    pub search_url: Option<String>,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub wake_phrase: String,
    pub max_history: usize,
    pub reminder_interval_secs: u64,
    pub monitor_interval_secs: u64,
    pub engaged_timeout_secs: u64,
    pub data_dir: PathBuf,

    pub chat_base_url: String,
    pub chat_api_key: String,
    pub chat_model: String,
    pub chat_timeout_secs: u64,

    pub voice_premium_endpoint: Option<String>,
    pub voice_premium_api_key: String,
    pub voice_free_endpoint: Option<String>,
    pub voice_id: String,
    pub voice_player: String,
    pub voice_local_command: String,

    pub source_timeout_ms: u64,
    pub window_command: Option<Vec<String>>,
    pub ocr_command: Option<Vec<String>>,
    pub emotion_command: Option<Vec<String>>,
    pub opener: String,
    pub search_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wake_phrase: "hey vesper".to_string(),
            max_history: 10,
            reminder_interval_secs: 10,
            monitor_interval_secs: 5,
            engaged_timeout_secs: 30,
            data_dir: PathBuf::from("vesper_data"),

            chat_base_url: "http://localhost:8080/v1".to_string(),
            chat_api_key: String::new(),
            chat_model: "llama3".to_string(),
            chat_timeout_secs: 30,

            voice_premium_endpoint: None,
            voice_premium_api_key: String::new(),
            voice_free_endpoint: None,
            voice_id: "default".to_string(),
            voice_player: "mpg123".to_string(),
            voice_local_command: "espeak".to_string(),

            source_timeout_ms: 800,
            window_command: None,
            ocr_command: None,
            emotion_command: None,
            opener: "xdg-open".to_string(),
            search_url: "https://www.google.com/search?q=".to_string(),
        }
    }
}

impl Config {
    /// Load and overlay `config.toml`. A missing file at the default path
    /// yields the defaults; an explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        let (raw, required) = match path {
            Some(p) => (std::fs::read_to_string(p).map_err(anyhow::Error::from), true),
            None => (
                std::fs::read_to_string("config.toml").map_err(anyhow::Error::from),
                false,
            ),
        };

        let file: ConfigFile = match raw {
            Ok(raw) => toml::from_str(&raw).context("config.toml is not valid TOML")?,
            Err(e) if required => return Err(e).context("cannot read configuration file"),
            Err(_) => ConfigFile::default(),
        };

        let mut config = Config::default();
        if let Some(v) = file.settings.wake_phrase {
            config.wake_phrase = v;
        }
        if let Some(v) = file.settings.max_history {
            config.max_history = v.max(1);
        }
        if let Some(v) = file.settings.reminder_interval_secs {
            config.reminder_interval_secs = v.max(1);
        }
        if let Some(v) = file.settings.monitor_interval_secs {
            config.monitor_interval_secs = v.max(1);
        }
        if let Some(v) = file.settings.engaged_timeout_secs {
            config.engaged_timeout_secs = v.max(1);
        }
        if let Some(v) = file.settings.data_dir {
            config.data_dir = v;
        }

        if let Some(v) = file.chat.base_url {
            config.chat_base_url = v;
        }
        if let Some(v) = file.chat.api_key {
            config.chat_api_key = v;
        }
        if let Some(v) = file.chat.model {
            config.chat_model = v;
        }
        if let Some(v) = file.chat.timeout_secs {
            config.chat_timeout_secs = v.max(1);
        }

        config.voice_premium_endpoint = file.voice.premium_endpoint;
        if let Some(v) = file.voice.premium_api_key {
            config.voice_premium_api_key = v;
        }
        config.voice_free_endpoint = file.voice.free_endpoint;
        if let Some(v) = file.voice.voice_id {
            config.voice_id = v;
        }
        if let Some(v) = file.voice.player {
            config.voice_player = v;
        }
        if let Some(v) = file.voice.local_command {
            config.voice_local_command = v;
        }

        if let Some(v) = file.monitor.source_timeout_ms {
            config.source_timeout_ms = v.max(1);
        }
        config.window_command = file.monitor.window_command;
        config.ocr_command = file.monitor.ocr_command;
        config.emotion_command = file.monitor.emotion_command;
        if let Some(v) = file.monitor.opener {
            config.opener = v;
        }
        if let Some(v) = file.monitor.search_url {
            config.search_url = v;
        }

        Ok(config)
    }
}
