use crate::backend::{
    program_available, ConsoleBackend, EspeakBackend, OneShotCommand, SayBackend, SpeechBackend,
};
use crate::{sanitize_utterance, SpeechSink};
use async_trait::async_trait;
use narrate_config::{SpeechConfig, SpeechEngineKind};
use std::io::Write;
use tokio::sync::Mutex;

/// The production [`SpeechSink`].
pub struct Narrator {
    backend: Mutex<Box<dyn SpeechBackend>>,
    fallback: Option<OneShotCommand>,
    echo: bool,
}

impl Narrator {
    pub fn new(backend: Box<dyn SpeechBackend>, fallback: Option<OneShotCommand>) -> Self {
        Self {
            backend: Mutex::new(backend),
            fallback,
            echo: true,
        }
    }

    /// Turn the stdout echo on or off.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Pick a backend for `config`, probing `PATH` when the engine is `auto`.
    pub async fn from_config(config: &SpeechConfig) -> Self {
        let voice = config.voice.as_deref();
        let backend: Box<dyn SpeechBackend> = match config.engine {
            SpeechEngineKind::Console => Box::new(ConsoleBackend),
            SpeechEngineKind::Say => Box::new(SayBackend::new(voice, config.rate)),
            SpeechEngineKind::Espeak => espeak_or_console("espeak", voice, config.rate),
            SpeechEngineKind::Auto => {
                if cfg!(target_os = "macos") && program_available("say").await {
                    Box::new(SayBackend::new(voice, config.rate))
                } else if program_available("espeak-ng").await {
                    espeak_or_console("espeak-ng", voice, config.rate)
                } else if program_available("espeak").await {
                    espeak_or_console("espeak", voice, config.rate)
                } else {
                    tracing::warn!(target: "speech", "no speech program found; text is printed only");
                    Box::new(ConsoleBackend)
                }
            }
        };

        let fallback = match config.engine {
            SpeechEngineKind::Console => None,
            _ => OneShotCommand::platform_default(),
        };
        tracing::info!(
            target: "speech",
            backend = backend.name(),
            fallback = fallback.as_ref().map(OneShotCommand::program).unwrap_or("-"),
            "speech.ready"
        );
        Self::new(backend, fallback)
    }

    /// Stop the backend. Later calls to `speak` still echo but produce no audio
    /// until the backend is restarted by a failure.
    pub async fn shutdown(&self) {
        let mut backend = self.backend.lock().await;
        backend.shutdown().await;
        tracing::debug!(target: "speech", backend = backend.name(), "speech.shutdown");
    }
}

fn espeak_or_console(program: &str, voice: Option<&str>, rate: Option<u32>) -> Box<dyn SpeechBackend> {
    match EspeakBackend::spawn(program, voice, rate) {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            tracing::warn!(target: "speech", error = %e, "speech.backend.unavailable");
            Box::new(ConsoleBackend)
        }
    }
}

#[async_trait]
impl SpeechSink for Narrator {
    async fn speak(&self, text: &str) {
        let Some(text) = sanitize_utterance(text) else {
            return;
        };
        if self.echo {
            // Raw-mode terminals need the explicit carriage return.
            let mut out = std::io::stdout().lock();
            let _ = write!(out, "{text}\r\n");
            let _ = out.flush();
        }

        let mut backend = self.backend.lock().await;
        let first = match backend.say(&text).await {
            Ok(()) => return,
            Err(e) => e,
        };
        tracing::warn!(target: "speech", backend = backend.name(), error = %first, "speech.failed; restarting backend");

        let retried = match backend.restart().await {
            Ok(()) => backend.say(&text).await,
            Err(e) => Err(e),
        };
        let second = match retried {
            Ok(()) => return,
            Err(e) => e,
        };
        drop(backend);

        let Some(fallback) = &self.fallback else {
            tracing::warn!(target: "speech", error = %second, "speech.failed; no fallback command");
            return;
        };
        if let Err(e) = fallback.run(&text).await {
            tracing::warn!(target: "speech", program = fallback.program(), error = %e, "speech.fallback.failed");
        }
    }
}
