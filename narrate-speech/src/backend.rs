use async_trait::async_trait;
use narrate_common::{NarrateError, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// One way of turning text into audio.
#[async_trait]
pub trait SpeechBackend: Send {
    fn name(&self) -> &'static str;

    async fn say(&mut self, text: &str) -> Result<()>;

    /// Tear down and recreate whatever resources the backend holds.
    async fn restart(&mut self) -> Result<()>;

    async fn shutdown(&mut self);
}

/// Speaks nothing. Used when no speech program is installed or when audio is
/// explicitly disabled; the narrator's stdout echo still carries the text.
pub struct ConsoleBackend;

#[async_trait]
impl SpeechBackend for ConsoleBackend {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn say(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn restart(&mut self) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&mut self) {}
}

/// A long-lived `espeak`/`espeak-ng` process fed one utterance per line.
pub struct EspeakBackend {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl EspeakBackend {
    pub fn spawn(program: &str, voice: Option<&str>, rate: Option<u32>) -> Result<Self> {
        let mut args = Vec::new();
        if let Some(voice) = voice {
            args.push("-v".to_string());
            args.push(voice.to_string());
        }
        if let Some(rate) = rate {
            args.push("-s".to_string());
            args.push(rate.to_string());
        }
        args.push("--stdin".to_string());

        let mut backend = Self {
            program: program.to_string(),
            args,
            child: None,
            stdin: None,
        };
        backend.start()?;
        Ok(backend)
    }

    fn start(&mut self) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NarrateError::Speech(format!("failed to start {}: {e}", self.program)))?;
        self.stdin = child.stdin.take();
        self.child = Some(child);
        tracing::debug!(target: "speech", program = %self.program, "speech.backend.started");
        Ok(())
    }
}

#[async_trait]
impl SpeechBackend for EspeakBackend {
    fn name(&self) -> &'static str {
        "espeak"
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        if let Some(child) = self.child.as_mut() {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(NarrateError::Speech(format!(
                    "{} exited with {status}",
                    self.program
                )));
            }
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| NarrateError::Speech(format!("{} is not running", self.program)))?;
        stdin
            .write_all(format!("{text}\n").as_bytes())
            .await
            .map_err(|e| NarrateError::Speech(e.to_string()))?;
        stdin
            .flush()
            .await
            .map_err(|e| NarrateError::Speech(e.to_string()))
    }

    async fn restart(&mut self) -> Result<()> {
        self.shutdown().await;
        self.start()
    }

    async fn shutdown(&mut self) {
        // Closing stdin lets espeak finish the queued utterance and exit.
        self.stdin.take();
        if let Some(mut child) = self.child.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, child.wait())
                .await
                .is_err()
            {
                let _ = child.kill().await;
            }
        }
    }
}

/// macOS `say`, one process per utterance.
pub struct SayBackend {
    command: OneShotCommand,
}

impl SayBackend {
    pub fn new(voice: Option<&str>, rate: Option<u32>) -> Self {
        let mut args = Vec::new();
        if let Some(voice) = voice {
            args.push("-v".to_string());
            args.push(voice.to_string());
        }
        if let Some(rate) = rate {
            args.push("-r".to_string());
            args.push(rate.to_string());
        }
        Self {
            command: OneShotCommand::new("say", args),
        }
    }
}

#[async_trait]
impl SpeechBackend for SayBackend {
    fn name(&self) -> &'static str {
        "say"
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        self.command.run(text).await
    }

    async fn restart(&mut self) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&mut self) {}
}

/// Runs `program args.. text` and waits for it to finish.
#[derive(Debug, Clone)]
pub struct OneShotCommand {
    program: String,
    args: Vec<String>,
}

impl OneShotCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The speech command shipped with the host OS, if there is a usual one.
    pub fn platform_default() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(Self::new("say", Vec::new()))
        } else if cfg!(unix) {
            Some(Self::new("espeak", Vec::new()))
        } else {
            None
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub async fn run(&self, text: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| NarrateError::Speech(format!("failed to run {}: {e}", self.program)))?;
        if status.success() {
            Ok(())
        } else {
            Err(NarrateError::Speech(format!(
                "{} exited with {status}",
                self.program
            )))
        }
    }
}

/// Whether `program` resolves on `PATH`.
pub async fn program_available(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
