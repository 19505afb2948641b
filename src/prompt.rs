//! Line-oriented and non-interactive presenters for the decision gate.

use crate::engine::decision::{GateEvent, Presenter, PromptChannels, PromptView, UserAction};
use anyhow::Context;
use std::io::{BufRead, Write};
use time::macros::format_description;
use tokio::sync::mpsc;

/// Map one line of operator input to an action.
pub fn parse_choice(line: &str) -> Option<UserAction> {
    match line.trim().to_ascii_lowercase().as_str() {
        "i" | "now" | "install" => Some(UserAction::ChooseImmediate),
        "s" | "later" | "schedule" => Some(UserAction::ChooseSchedule),
        "c" | "cancel" => Some(UserAction::ChooseCancel),
        _ => None,
    }
}

/// Countdown values worth printing: every minute and the last ten seconds.
fn announce(remaining: u64, total: u64) -> bool {
    remaining == total || remaining % 60 == 0 || remaining <= 10
}

fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Reads choices from stdin and prints the countdown on stderr.
#[derive(Debug, Default)]
pub struct TextPresenter;

impl Presenter for TextPresenter {
    fn present(&mut self, view: &PromptView) -> anyhow::Result<PromptChannels> {
        let (action_tx, actions) = mpsc::unbounded_channel();
        let (updates, mut updates_rx) = mpsc::unbounded_channel::<GateEvent>();

        let slot = view
            .schedule_at
            .format(format_description!("[hour]:[minute]"))
            .context("format schedule slot")?;
        let mut err = std::io::stderr();
        let _ = writeln!(
            err,
            "{} needs to restart to finish updating.\n  [i] restart now  [s] schedule for {slot}  [c] cancel",
            view.display_name
        );

        // Detached: a blocked stdin read cannot be interrupted, and the process
        // exits once the run is over.
        std::thread::Builder::new()
            .name("prompt-stdin".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    match parse_choice(&line) {
                        Some(action) => {
                            if action_tx.send(action).is_err() {
                                break;
                            }
                        }
                        None => eprintln!("  unrecognized choice {line:?}; expected i, s or c"),
                    }
                }
            })
            .context("spawn stdin reader")?;

        let total = view.countdown_seconds;
        tokio::spawn(async move {
            while let Some(ev) = updates_rx.recv().await {
                if let GateEvent::Countdown { remaining } = ev {
                    if announce(remaining, total) {
                        eprintln!("  restarting in {}", format_remaining(remaining));
                    }
                }
            }
        });

        Ok(PromptChannels { actions, updates })
    }
}

/// No input at all; the gate can only run out its countdown.
#[derive(Debug, Default)]
pub struct HeadlessPresenter;

impl Presenter for HeadlessPresenter {
    fn present(&mut self, view: &PromptView) -> anyhow::Result<PromptChannels> {
        tracing::info!(
            app = %view.app,
            countdown = view.countdown_seconds,
            "headless run; waiting for countdown"
        );
        let (_, actions) = mpsc::unbounded_channel();
        let (updates, _) = mpsc::unbounded_channel();
        Ok(PromptChannels { actions, updates })
    }
}
