use crate::config::{self, AppId};
use crate::engine::decision::Presenter;
use crate::exit::{map_exit, ExitOutcome, Terminal};
use crate::model::WorkflowEvent;
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::orchestrator::{run_workflow, Collaborators, RunRequest};
use crate::prompt::{HeadlessPresenter, TextPresenter};
use crate::system::{LinuxSystem, SystemdRunScheduler};
use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use time::OffsetDateTime;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
///
/// The stream lock is taken per line; presenters and the log subscriber write
/// to the same streams while the run is in progress.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let mut out = std::io::stdout().lock();
                    let _ = writeln!(out, "{}", msg);
                    let _ = out.flush();
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(std::io::stderr().lock(), "{}", msg);
                }
            }
        }
    });
    (tx, handle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UiMode {
    /// Full-screen terminal dialog
    Tui,
    /// Line prompt on stdin, countdown on stderr
    Text,
    /// No prompt; the countdown always runs out
    Headless,
}

impl Default for UiMode {
    fn default() -> Self {
        #[cfg(feature = "tui")]
        {
            UiMode::Tui
        }
        #[cfg(not(feature = "tui"))]
        {
            UiMode::Text
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "update-gate",
    version,
    about = "Ask before restarting applications to finish pending updates"
)]
pub struct Cli {
    /// Application whose update is gated
    #[arg(long, value_enum, ignore_case = true)]
    pub app: AppId,

    /// Proceed even when no pending update is detected
    #[arg(long = "override")]
    pub override_check: bool,

    /// Pre-approved run registered by an earlier schedule choice
    #[arg(long)]
    pub deferred: bool,

    /// Configuration file (YAML). Defaults to the user config directory
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Decision countdown in seconds, overriding the configured value
    #[arg(long)]
    pub countdown: Option<u64>,

    /// How the decision prompt is presented
    #[arg(long, value_enum, default_value_t = UiMode::default())]
    pub ui: UiMode,

    /// Exit 3 instead of 0 after a successful schedule
    #[arg(long)]
    pub distinct_scheduled_exit: bool,

    /// Suppress progress output; errors are still printed
    #[arg(long)]
    pub quiet: bool,
}

fn presenter_for(mode: UiMode) -> Box<dyn Presenter> {
    match mode {
        #[cfg(feature = "tui")]
        UiMode::Tui => Box::new(crate::tui::TuiPresenter::default()),
        #[cfg(not(feature = "tui"))]
        UiMode::Tui => {
            tracing::warn!("built without tui support; using the text prompt");
            Box::new(TextPresenter)
        }
        UiMode::Text => Box::new(TextPresenter),
        UiMode::Headless => Box::new(HeadlessPresenter),
    }
}

fn notifier_for(settings: &config::Settings) -> anyhow::Result<Box<dyn Notifier>> {
    match settings.notifier.webhook_url.as_deref() {
        Some(url) => Ok(Box::new(
            WebhookNotifier::new(url).context("build webhook notifier")?,
        )),
        None => Ok(Box::new(LogNotifier)),
    }
}

pub async fn run(args: Cli) -> ExitOutcome {
    let (out_tx, out_handle) = spawn_output_writer();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();

    let printer = {
        let out_tx = out_tx.clone();
        let quiet = args.quiet;
        tokio::spawn(async move {
            while let Some(ev) = event_rx.recv().await {
                if !quiet {
                    let _ = out_tx.send(OutputLine::Stderr(ev.to_message()));
                }
            }
        })
    };

    let terminal = match execute(&args, &event_tx).await {
        Ok(terminal) => terminal,
        Err(e) => Terminal::Failed(e),
    };
    drop(event_tx);
    let _ = printer.await;

    let outcome = map_exit(&terminal, args.distinct_scheduled_exit);
    if let Terminal::Scheduled(Ok(scheduled)) = &terminal {
        match serde_json::to_string(scheduled) {
            Ok(json) => {
                let _ = out_tx.send(OutputLine::Stdout(json));
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize scheduled invocation"),
        }
    }
    if let Terminal::Failed(e) = &terminal {
        let _ = out_tx.send(OutputLine::Stderr(format!("error: {e:#}")));
        if !args.quiet {
            let _ = out_tx.send(OutputLine::Stderr(format!(
                "Result: exit {}",
                outcome.code()
            )));
        }
    }
    drop(out_tx);
    let _ = out_handle.await;
    outcome
}

/// Everything that can fail before the workflow starts is reported as `Err`.
async fn execute(
    args: &Cli,
    event_tx: &mpsc::UnboundedSender<WorkflowEvent>,
) -> anyhow::Result<Terminal> {
    let (settings, registry) =
        config::load(args.config.as_deref()).context("failed to load configuration")?;
    let notifier = notifier_for(&settings)?;
    let scheduler = SystemdRunScheduler::new(settings.scheduler.user_scope);
    let system = LinuxSystem::new();
    let mut presenter = presenter_for(args.ui);

    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let req = RunRequest {
        app: args.app,
        override_check: args.override_check,
        deferred: args.deferred,
        config_path: args.config.clone(),
        countdown_seconds: args.countdown.unwrap_or(settings.countdown_seconds),
        distinct_scheduled_exit: args.distinct_scheduled_exit,
        now,
    };
    tracing::debug!(app = %req.app, deferred = req.deferred, ui = ?args.ui, "starting run");

    let collaborators = Collaborators {
        env: &system,
        probe: &system,
        control: &system,
        scheduler: &scheduler,
        notifier: notifier.as_ref(),
        presenter: presenter.as_mut(),
    };
    Ok(run_workflow(&req, &registry, &settings, collaborators, event_tx).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn writer_releases_stderr_between_lines() {
        let (tx, handle) = spawn_output_writer();
        tx.send(OutputLine::Stderr("[1/5] first".into())).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = writeln!(std::io::stderr().lock(), "direct write");
            let _ = writeln!(std::io::stdout().lock(), "direct write");
            let _ = done_tx.send(());
        });
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());

        drop(tx);
        handle.await.unwrap();
    }

    #[test]
    fn parses_full_flag_set() {
        let cli = Cli::try_parse_from([
            "update-gate",
            "--app",
            "m365apps",
            "--override",
            "--countdown",
            "30",
            "--ui",
            "headless",
            "--distinct-scheduled-exit",
        ])
        .unwrap();
        assert_eq!(cli.app, AppId::M365Apps);
        assert!(cli.override_check);
        assert!(!cli.deferred);
        assert_eq!(cli.countdown, Some(30));
        assert_eq!(cli.ui, UiMode::Headless);
        assert!(cli.distinct_scheduled_exit);
    }

    #[test]
    fn app_is_required_and_closed() {
        assert!(Cli::try_parse_from(["update-gate"]).is_err());
        assert!(Cli::try_parse_from(["update-gate", "--app", "Safari"]).is_err());
        let cli = Cli::try_parse_from(["update-gate", "--app", "FeatureUpdate"]).unwrap();
        assert_eq!(cli.ui, UiMode::default());
    }
}
