use async_trait::async_trait;
use thiserror::Error;

use crate::error::AssistantError;

/// Failure of a monitor sample source. Not fatal; the sample is skipped.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source not available")]
    Unavailable,
    #[error("{0}")]
    Failed(String),
}

/// Foreground application and window title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSample {
    pub app_name: String,
    pub window_title: String,
}

/// Facial-emotion reading from the emotion-classifier collaborator.
#[derive(Debug, Clone)]
pub struct EmotionReading {
    pub label: String,
    pub confidence: f32,
}

#[async_trait]
pub trait WindowSource: Send + Sync {
    async fn active_window(&self) -> Result<WindowSample, SourceError>;
}

#[async_trait]
pub trait OcrSource: Send + Sync {
    async fn capture_text(&self) -> Result<String, SourceError>;
}

#[async_trait]
pub trait EmotionSource: Send + Sync {
    async fn sample(&self) -> Result<EmotionReading, SourceError>;
}

#[async_trait]
pub trait AppLauncher: Send + Sync {
    /// Launch an application; the returned string is the spoken confirmation.
    async fn launch(&self, app: &str) -> Result<String, AssistantError>;
}

#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, AssistantError>;
}

/// Launches applications by invoking them directly as commands.
pub struct CommandLauncher;

#[async_trait]
impl AppLauncher for CommandLauncher {
    async fn launch(&self, app: &str) -> Result<String, AssistantError> {
        tokio::process::Command::new(app)
            .spawn()
            .map_err(|e| AssistantError::Api(format!("could not launch {app}: {e}")))?;
        Ok(format!("Opening {app}."))
    }
}

/// Opens a search-results page in the system browser.
pub struct BrowserSearcher {
    opener: String,
    search_url: String,
}

impl BrowserSearcher {
    pub fn new(opener: String, search_url: String) -> Self {
        Self { opener, search_url }
    }
}

#[async_trait]
impl WebSearcher for BrowserSearcher {
    async fn search(&self, query: &str) -> Result<String, AssistantError> {
        let url = format!("{}{}", self.search_url, urlencoding::encode(query));
        let status = tokio::process::Command::new(&self.opener)
            .arg(&url)
            .status()
            .await
            .map_err(|e| AssistantError::Api(e.to_string()))?;
        if status.success() {
            Ok(format!("Searching the web for {query}."))
        } else {
            Err(AssistantError::Api(format!(
                "{} exited with {status}",
                self.opener
            )))
        }
    }
}

/// Monitor source backed by a user-configured command that prints
/// `app<TAB>title` (window) or free text (OCR) or `label<TAB>confidence`
/// (emotion) on stdout.
pub struct CommandSource {
    command: Vec<String>,
}

impl CommandSource {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    async fn run(&self) -> Result<String, SourceError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or(SourceError::Unavailable)?;
        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| SourceError::Failed(e.to_string()))?;
        if !output.status.success() {
            return Err(SourceError::Failed(format!(
                "{program} exited with {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl WindowSource for CommandSource {
    async fn active_window(&self) -> Result<WindowSample, SourceError> {
        let line = self.run().await?;
        let (app, title) = line.split_once('\t').unwrap_or((line.as_str(), ""));
        if app.is_empty() {
            return Err(SourceError::Failed("empty window report".to_string()));
        }
        Ok(WindowSample {
            app_name: app.to_string(),
            window_title: title.to_string(),
        })
    }
}

#[async_trait]
impl OcrSource for CommandSource {
    async fn capture_text(&self) -> Result<String, SourceError> {
        self.run().await
    }
}

#[async_trait]
impl EmotionSource for CommandSource {
    async fn sample(&self) -> Result<EmotionReading, SourceError> {
        let line = self.run().await?;
        let (label, confidence) = line.split_once('\t').unwrap_or((line.as_str(), "1.0"));
        Ok(EmotionReading {
            label: label.to_string(),
            confidence: confidence.trim().parse().unwrap_or(0.0),
        })
    }
}

/// Placeholder for an unconfigured sample source.
pub struct UnavailableSource;

#[async_trait]
impl WindowSource for UnavailableSource {
    async fn active_window(&self) -> Result<WindowSample, SourceError> {
        Err(SourceError::Unavailable)
    }
}

#[async_trait]
impl OcrSource for UnavailableSource {
    async fn capture_text(&self) -> Result<String, SourceError> {
        Err(SourceError::Unavailable)
    }
}

#[async_trait]
impl EmotionSource for UnavailableSource {
    async fn sample(&self) -> Result<EmotionReading, SourceError> {
        Err(SourceError::Unavailable)
    }
}
