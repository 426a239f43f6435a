//! Background daemon: the check loop, signal handling and detaching from the
//! terminal.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::app::{Result, Session};
use crate::cli::FOREGROUND_FLAG;
use crate::config::format_interval;
use crate::notifier::{Notifier, ProwlNotifier};
use crate::pipeline::Pipeline;

/// Daemon run mode
#[derive(Debug, Clone, Default)]
pub struct DaemonConfig {
    /// Check all feeds once and exit
    pub run_once: bool,
    /// Process this local RSS file instead of the configured feeds
    pub xml_file: Option<PathBuf>,
}

/// Shared stop request: a flag checked between feeds plus a wakeup for the
/// sleep between cycles.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl Shutdown {
    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn flag(&self) -> &AtomicBool {
        &self.requested
    }

    /// Sleep for `duration` unless a stop request arrives first. Returns
    /// true when interrupted.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.wake.notified() => true,
        }
    }
}

/// Daemon runner
pub struct Daemon {
    pipeline: Pipeline,
    config: DaemonConfig,
    shutdown: Shutdown,
}

impl Daemon {
    pub fn new(pipeline: Pipeline, config: DaemonConfig) -> Self {
        Self {
            pipeline,
            config,
            shutdown: Shutdown::default(),
        }
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Turn SIGINT and SIGTERM into a stop request.
    pub fn install_signal_handler(&self) {
        let shutdown = self.shutdown.clone();

        #[cfg(unix)]
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        tracing::warn!("Failed to set up signal handlers: {}", e);
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                _ = sigint.recv() => tracing::info!("Received SIGINT"),
            }
            shutdown.trigger();
        });

        #[cfg(windows)]
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl-C");
                shutdown.trigger();
            }
        });
    }

    /// Run until stopped, or for one pass in run-once mode. Returns the
    /// number of completed cycles.
    pub async fn run(&self, session: &mut Session) -> Result<usize> {
        if let Some(ref path) = self.config.xml_file {
            let result = self.pipeline.process_file(session, path).await;
            session.shutdown();
            return result.map(|_| 1);
        }

        tracing::info!(
            "reelwatch started (check interval: {}, {} feeds, {} filters, PID: {})",
            format_interval(session.check_interval.as_secs()),
            session.feeds.len(),
            session.filters.len(),
            std::process::id()
        );

        let mut cycles = 0;
        while !self.shutdown.is_triggered() {
            self.pipeline
                .run_cycle(session, cycles == 0, self.shutdown.flag())
                .await;
            cycles += 1;

            if self.config.run_once || self.shutdown.is_triggered() {
                break;
            }

            tracing::debug!(
                "Next check in {}",
                format_interval(session.check_interval.as_secs())
            );
            if self.shutdown.sleep(session.check_interval).await {
                break;
            }
        }

        tracing::info!("reelwatch shutting down...");
        session.shutdown();

        Ok(cycles)
    }

    /// Stop the daemon (called externally)
    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

/// Build the Prowl notifier when an API key is configured and Prowl accepts
/// it.
pub async fn connect_notifier(api_key: Option<&str>) -> Option<Arc<dyn Notifier + Send + Sync>> {
    let api_key = api_key?;
    let notifier = match ProwlNotifier::new(api_key) {
        Ok(notifier) => notifier,
        Err(e) => {
            tracing::warn!("Prowl notifications disabled: {}", e);
            return None;
        }
    };

    match notifier.verify().await {
        Ok(true) => {
            tracing::info!("Prowl API key verified, notifications enabled");
            Some(Arc::new(notifier))
        }
        Ok(false) => {
            tracing::warn!("Prowl notifications disabled: API key is invalid");
            None
        }
        Err(e) => {
            tracing::warn!("Prowl notifications disabled: {}", e);
            None
        }
    }
}

/// Arguments for the detached child: the original ones plus the
/// foreground flag.
pub fn detached_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().collect();
    if !args.iter().any(|arg| arg == FOREGROUND_FLAG) {
        args.push(OsString::from(FOREGROUND_FLAG));
    }
    args
}

/// Command that re-runs `exe` with `args` in the foreground mode, without
/// stdio and in a new process group.
///
/// The child leaves the terminal's foreground group, so keyboard signals
/// (Ctrl-C, Ctrl-Z) no longer reach it, but it stays in the terminal's
/// session: it does not call `setsid`. It still has no controlling-terminal
/// I/O, since all three standard streams go to the null device.
pub fn detached_command(exe: PathBuf, args: Vec<OsString>) -> Command {
    let mut command = Command::new(exe);
    command
        .args(detached_args(args))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    command
}

/// Re-execute this program in the background. Returns the child's PID; the
/// caller should exit.
pub fn detach() -> Result<u32> {
    let exe = std::env::current_exe()?;
    let child = detached_command(exe, std::env::args_os().skip(1).collect()).spawn()?;
    Ok(child.id())
}
