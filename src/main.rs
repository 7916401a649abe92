use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vesper::config::Config;
use vesper::kernel::event::{Directive, Event, UtteranceEvent};
use vesper::kernel::orchestrator::{Orchestrator, OrchestratorConfig};
use vesper::monitor::BackgroundMonitor;
use vesper::services::chat::{ChatBackend, ChatClient};
use vesper::services::desktop::{
    AppLauncher, BrowserSearcher, CommandLauncher, CommandSource, EmotionSource, OcrSource,
    UnavailableSource, WebSearcher, WindowSource,
};
use vesper::services::voice::{FallbackChain, HttpVoice, LocalVoice, VoiceProvider};
use vesper::store::{JsonStore, MemStore, Store, StoreError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    info!("Vesper booting...");

    let config = Config::load(config_path_from_args().as_deref())?;

    // Persistent store; an unusable medium degrades to memory-only, but a
    // corrupt file refuses to start rather than risk silent data loss.
    let store: Arc<dyn Store> = match JsonStore::open(&config.data_dir) {
        Ok(store) => Arc::new(store),
        Err(e @ StoreError::Corrupt { .. }) => {
            return Err(anyhow::Error::new(e)
                .context("persistent store is corrupt; refusing to start"));
        }
        Err(e) => {
            warn!("persistent store unavailable, running memory-only: {e}");
            Arc::new(MemStore::new())
        }
    };

    // Kernel channel shared by the frontend, the timers, and workers.
    let (tx, rx) = mpsc::channel(100);

    let mut orchestrator = Orchestrator::new(
        rx,
        store.clone(),
        OrchestratorConfig {
            wake_phrase: config.wake_phrase.clone(),
            max_history: config.max_history,
            engaged_timeout_secs: config.engaged_timeout_secs,
        },
    );
    match orchestrator.restore() {
        Ok(count) => info!("restored {count} pending reminder(s)"),
        Err(e) => warn!("could not restore reminders: {e}"),
    }

    // Collaborators.
    let chat: Arc<dyn ChatBackend> = Arc::new(ChatClient::new(
        config.chat_base_url.clone(),
        config.chat_api_key.clone(),
        config.chat_model.clone(),
        config.chat_timeout_secs,
    ));
    let launcher: Arc<dyn AppLauncher> = Arc::new(CommandLauncher);
    let searcher: Arc<dyn WebSearcher> = Arc::new(BrowserSearcher::new(
        config.opener.clone(),
        config.search_url.clone(),
    ));
    let voice = Arc::new(build_voice_chain(&config));

    let monitor = Arc::new(tokio::sync::Mutex::new(BackgroundMonitor::new(
        store.clone(),
        window_source(&config.window_command),
        ocr_source(&config.ocr_command),
        emotion_source(&config.emotion_command),
        config.source_timeout_ms,
    )));

    // Two independent cancellable timer tasks feed the same queue the
    // utterance frontend uses; the orchestrator alone decides what happens.
    let cancel = CancellationToken::new();
    spawn_timer(
        tx.clone(),
        cancel.clone(),
        Duration::from_secs(config.reminder_interval_secs),
        Event::ReminderTick,
    );
    spawn_timer(
        tx.clone(),
        cancel.clone(),
        Duration::from_secs(config.monitor_interval_secs),
        Event::MonitorTick,
    );
    spawn_text_frontend(tx.clone());
    spawn_interrupt_watch(tx.clone());

    println!(
        "Vesper is active. Say '{}' (or type it) to wake me. Ctrl+C to exit.",
        config.wake_phrase
    );

    while let Some(event) = orchestrator.next_event().await {
        for directive in orchestrator.step(event) {
            match directive {
                Directive::Speak(text) => {
                    println!("Vesper: {text}");
                    let voice = voice.clone();
                    tokio::spawn(async move {
                        if let Err(e) = voice.speak(&text).await {
                            warn!("all voice providers failed: {e}");
                        }
                    });
                }

                Directive::Notify(reminder) => {
                    println!("*** Reminder: {} ***", reminder.message);
                    let voice = voice.clone();
                    tokio::spawn(async move {
                        let line = format!("Reminder: {}", reminder.message);
                        if let Err(e) = voice.speak(&line).await {
                            warn!("reminder notification voice failed: {e}");
                        }
                    });
                }

                Directive::RunMonitor(now) => {
                    let monitor = monitor.clone();
                    tokio::spawn(async move {
                        monitor.lock().await.tick(now).await;
                    });
                }

                Directive::CallChat { id, history } => {
                    let chat = chat.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let event = match chat.complete(&history).await {
                            Ok(reply) => Event::ExchangeResolved { id, reply },
                            Err(e) => Event::ExchangeFailed {
                                id,
                                error: e.to_string(),
                            },
                        };
                        let _ = tx.send(event).await;
                    });
                }

                Directive::CallAppLaunch { id, app } => {
                    let launcher = launcher.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let event = match launcher.launch(&app).await {
                            Ok(reply) => Event::ExchangeResolved { id, reply },
                            Err(e) => Event::ExchangeFailed {
                                id,
                                error: e.to_string(),
                            },
                        };
                        let _ = tx.send(event).await;
                    });
                }

                Directive::CallWebSearch { id, query } => {
                    let searcher = searcher.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let event = match searcher.search(&query).await {
                            Ok(reply) => Event::ExchangeResolved { id, reply },
                            Err(e) => Event::ExchangeFailed {
                                id,
                                error: e.to_string(),
                            },
                        };
                        let _ = tx.send(event).await;
                    });
                }

                Directive::Halt => {
                    info!("shutting down");
                    cancel.cancel();
                    monitor.lock().await.finish(Utc::now());
                    return Ok(());
                }
            }
        }
    }

    Ok(())
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

fn build_voice_chain(config: &Config) -> FallbackChain {
    let mut providers: Vec<Box<dyn VoiceProvider>> = Vec::new();
    if let Some(endpoint) = &config.voice_premium_endpoint {
        providers.push(Box::new(HttpVoice::new(
            "premium",
            endpoint.clone(),
            config.voice_premium_api_key.clone(),
            config.voice_id.clone(),
            config.voice_player.clone(),
        )));
    }
    if let Some(endpoint) = &config.voice_free_endpoint {
        providers.push(Box::new(HttpVoice::new(
            "free",
            endpoint.clone(),
            String::new(),
            config.voice_id.clone(),
            config.voice_player.clone(),
        )));
    }
    providers.push(Box::new(LocalVoice::new(config.voice_local_command.clone())));
    FallbackChain::new(providers)
}

fn window_source(command: &Option<Vec<String>>) -> Arc<dyn WindowSource> {
    match command {
        Some(cmd) => Arc::new(CommandSource::new(cmd.clone())),
        None => Arc::new(UnavailableSource),
    }
}

fn ocr_source(command: &Option<Vec<String>>) -> Arc<dyn OcrSource> {
    match command {
        Some(cmd) => Arc::new(CommandSource::new(cmd.clone())),
        None => Arc::new(UnavailableSource),
    }
}

fn emotion_source(command: &Option<Vec<String>>) -> Arc<dyn EmotionSource> {
    match command {
        Some(cmd) => Arc::new(CommandSource::new(cmd.clone())),
        None => Arc::new(UnavailableSource),
    }
}

fn spawn_timer(
    tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
    period: Duration,
    make: fn(chrono::DateTime<Utc>) -> Event,
) {
    tokio::spawn(async move {
        let mut cadence = tokio::time::interval(period);
        cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = cadence.tick() => {
                    if tx.send(make(Utc::now())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Text input frontend: each stdin line becomes an utterance event; EOF
/// shuts the loop down. A speech frontend would feed the same channel.
fn spawn_text_frontend(tx: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let event = Event::Utterance(UtteranceEvent::new(line, Utc::now()));
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(None) | Err(_) => {
                    let _ = tx.send(Event::Shutdown).await;
                    break;
                }
            }
        }
    });
}

fn spawn_interrupt_watch(tx: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(Event::Shutdown).await;
        }
    });
}
