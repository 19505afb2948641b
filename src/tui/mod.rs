mod help;

use crate::engine::decision::{GateEvent, Presenter, PromptChannels, PromptView, UserAction};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Terminal,
};
use std::io::{self, IsTerminal};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use time::macros::format_description;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

struct DialogState {
    display_name: String,
    slot: String,
    total: u64,
    remaining: u64,
    chosen: Option<UserAction>,
}

/// Full-screen countdown dialog rendered on a dedicated thread.
#[derive(Default)]
pub struct TuiPresenter {
    ui_handle: Option<JoinHandle<Result<()>>>,
}

impl Presenter for TuiPresenter {
    fn present(&mut self, view: &PromptView) -> Result<PromptChannels> {
        if !io::stdout().is_terminal() {
            anyhow::bail!("stdout is not a terminal");
        }
        let slot = view
            .schedule_at
            .format(format_description!("[hour]:[minute]"))
            .context("format schedule slot")?;
        let state = DialogState {
            display_name: view.display_name.clone(),
            slot,
            total: view.countdown_seconds,
            remaining: view.countdown_seconds,
            chosen: None,
        };

        let (action_tx, actions) = mpsc::unbounded_channel();
        let (updates, updates_rx) = mpsc::unbounded_channel();
        // Rendering blocks on terminal I/O, so it stays off the runtime thread.
        let handle = std::thread::Builder::new()
            .name("tui".into())
            .spawn(move || run_threaded(state, updates_rx, action_tx))
            .context("spawn tui thread")?;
        self.ui_handle = Some(handle);
        Ok(PromptChannels { actions, updates })
    }

    fn dismiss(&mut self) {
        if let Some(handle) = self.ui_handle.take() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %format!("{e:#}"), "tui exited with error"),
                Err(_) => tracing::warn!("tui thread panicked"),
            }
        }
    }
}

/// Run the dialog loop until the gate resolves or its update channel closes.
fn run_threaded(
    mut state: DialogState,
    mut update_rx: UnboundedReceiver<GateEvent>,
    action_tx: UnboundedSender<UserAction>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    terminal.draw(|f| draw(f.area(), f, &state)).ok();
    let mut last_tick = Instant::now();

    'ui: loop {
        loop {
            match update_rx.try_recv() {
                Ok(GateEvent::Countdown { remaining }) => state.remaining = remaining,
                Ok(GateEvent::Resolved(_)) => break 'ui,
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => break 'ui,
            }
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press || state.chosen.is_some() {
                    continue;
                }
                let Some(action) = action_for(k) else {
                    continue;
                };
                state.chosen = Some(action);
                let _ = action_tx.send(action);
            }
        }
    }

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    Ok(())
}

/// Modifiers are ignored, so Ctrl-C (`Char('c')` with CONTROL) also cancels.
fn action_for(key: KeyEvent) -> Option<UserAction> {
    match key.code {
        KeyCode::Char('i') | KeyCode::Enter => Some(UserAction::ChooseImmediate),
        KeyCode::Char('s') => Some(UserAction::ChooseSchedule),
        KeyCode::Char('c') | KeyCode::Esc => Some(UserAction::ChooseCancel),
        _ => None,
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1])[1]
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &DialogState) {
    let dialog = centered(area, area.width.min(64), 12);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" update-gate ")
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(dialog);
    f.render_widget(block, dialog);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let message = Paragraph::new(vec![
        Line::from(format!("{} has an update ready.", state.display_name)),
        Line::from("It will be closed and restarted when the countdown ends."),
    ])
    .wrap(Wrap { trim: true });
    f.render_widget(message, rows[0]);

    let ratio = if state.total == 0 {
        0.0
    } else {
        state.remaining as f64 / state.total as f64
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!(
            "restarting in {}:{:02}",
            state.remaining / 60,
            state.remaining % 60
        ));
    f.render_widget(gauge, rows[1]);

    let body = match state.chosen {
        Some(action) => vec![Line::from(format!("  {action:?} selected, please wait"))],
        None => help::keybind_lines(&state.slot),
    };
    f.render_widget(Paragraph::new(body), rows[3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    #[test]
    fn keys_map_to_actions() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(action_for(key(KeyCode::Enter)), Some(UserAction::ChooseImmediate));
        assert_eq!(action_for(key(KeyCode::Char('s'))), Some(UserAction::ChooseSchedule));
        assert_eq!(action_for(key(KeyCode::Esc)), Some(UserAction::ChooseCancel));
        assert_eq!(action_for(key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn ctrl_c_cancels() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(action_for(ctrl_c), Some(UserAction::ChooseCancel));
    }
}
