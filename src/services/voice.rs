use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::error::AssistantError;

/// The transcription collaborator. Audio capture and decoding live outside
/// the core; a frontend hands finished utterance text to the event queue.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, AssistantError>;
}

/// One voice-output backend in the fallback chain.
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn speak(&self, text: &str) -> Result<(), AssistantError>;
}

/// Ordered list of voice providers, tried in sequence. A failure only
/// surfaces when every provider in the chain has failed.
pub struct FallbackChain {
    providers: Vec<Box<dyn VoiceProvider>>,
}

impl FallbackChain {
    pub fn new(providers: Vec<Box<dyn VoiceProvider>>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub async fn speak(&self, text: &str) -> Result<(), AssistantError> {
        let mut last_error = AssistantError::Api("no voice providers configured".to_string());
        for provider in &self.providers {
            match provider.speak(text).await {
                Ok(()) => {
                    info!(provider = provider.name(), "spoke response");
                    return Ok(());
                }
                Err(e) => {
                    warn!(provider = provider.name(), "voice provider failed: {e}");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

/// Cloud TTS over HTTP: POST the text, receive audio, hand it to a local
/// player command. Covers both the premium and the free cloud tiers; the
/// tier is just a different endpoint and key.
pub struct HttpVoice {
    name: String,
    client: Client,
    endpoint: String,
    api_key: String,
    voice_id: String,
    player: String,
}

impl HttpVoice {
    pub fn new(
        name: impl Into<String>,
        endpoint: String,
        api_key: String,
        voice_id: String,
        player: String,
    ) -> Self {
        Self {
            name: name.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            endpoint,
            api_key,
            voice_id,
            player,
        }
    }
}

#[async_trait]
impl VoiceProvider for HttpVoice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn speak(&self, text: &str) -> Result<(), AssistantError> {
        let body = serde_json::json!({
            "text": text,
            "voice": self.voice_id,
        });
        let mut builder = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| AssistantError::Api(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AssistantError::Api(format!(
                "voice backend returned {}",
                response.status()
            )));
        }
        let audio = response
            .bytes()
            .await
            .map_err(|e| AssistantError::Api(e.to_string()))?;

        // Pipe the synthesized audio through the configured player.
        let tmp = std::env::temp_dir().join(format!("vesper_speech_{}.mp3", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &audio)
            .await
            .map_err(|e| AssistantError::Api(e.to_string()))?;
        let status = tokio::process::Command::new(&self.player)
            .arg(&tmp)
            .status()
            .await
            .map_err(|e| AssistantError::Api(e.to_string()))?;
        let _ = tokio::fs::remove_file(&tmp).await;
        if status.success() {
            Ok(())
        } else {
            Err(AssistantError::Api(format!(
                "audio player exited with {status}"
            )))
        }
    }
}

/// Last-resort local synthesizer: spawn a system TTS command (`say`,
/// `espeak`, ...) with the text as its argument.
pub struct LocalVoice {
    command: String,
}

impl LocalVoice {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl VoiceProvider for LocalVoice {
    fn name(&self) -> &str {
        "local"
    }

    async fn speak(&self, text: &str) -> Result<(), AssistantError> {
        let status = tokio::process::Command::new(&self.command)
            .arg(text)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| AssistantError::Api(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(AssistantError::Api(format!(
                "{} exited with {status}",
                self.command
            )))
        }
    }
}
