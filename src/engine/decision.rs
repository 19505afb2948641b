//! Timed three-way decision: restart now, schedule for later, or cancel.
//!
//! A one-second countdown and the presenter's action channel race inside a single
//! `select!` loop. Whichever side reaches [`DecisionResolver`] first decides the run;
//! every later signal is dropped.

use crate::config::AppId;
use crate::model::DecisionOutcome;
use std::sync::{Mutex, PoisonError};
use time::OffsetDateTime;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{Duration, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    ChooseImmediate,
    ChooseSchedule,
    ChooseCancel,
}

impl UserAction {
    fn into_outcome(self, schedule_at: OffsetDateTime) -> DecisionOutcome {
        match self {
            UserAction::ChooseImmediate => DecisionOutcome::Immediate,
            UserAction::ChooseSchedule => DecisionOutcome::Scheduled(schedule_at),
            UserAction::ChooseCancel => DecisionOutcome::Cancelled,
        }
    }
}

/// Updates pushed from the gate to the presenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    Countdown { remaining: u64 },
    Resolved(DecisionOutcome),
}

/// What the presenter needs to render the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptView {
    pub app: AppId,
    pub display_name: String,
    pub countdown_seconds: u64,
    pub schedule_at: OffsetDateTime,
}

pub struct PromptChannels {
    pub actions: UnboundedReceiver<UserAction>,
    pub updates: UnboundedSender<GateEvent>,
}

/// Presentation layer for the decision prompt.
pub trait Presenter {
    /// Show the prompt. User input arrives on `actions`; the gate reports progress on `updates`.
    fn present(&mut self, view: &PromptView) -> anyhow::Result<PromptChannels>;

    /// Tear the prompt down after `GateEvent::Resolved` has been sent.
    fn dismiss(&mut self) {}
}

/// Single-assignment slot for the gate's outcome.
#[derive(Debug, Default)]
pub struct DecisionResolver {
    slot: Mutex<Option<DecisionOutcome>>,
}

impl DecisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `outcome` if nothing has been stored yet. Returns whether this call won.
    pub fn resolve(&self, outcome: DecisionOutcome) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        true
    }

    pub fn outcome(&self) -> Option<DecisionOutcome> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run the gate until a user action or the countdown decides it.
///
/// Never fails: a presenter that cannot open, or whose input closes, leaves the
/// countdown running to its default.
pub async fn resolve(view: &PromptView, presenter: &mut dyn Presenter) -> DecisionOutcome {
    if view.countdown_seconds == 0 {
        return DecisionOutcome::TimedOutDefault;
    }

    let (mut actions, updates) = match presenter.present(view) {
        Ok(PromptChannels { actions, updates }) => (Some(actions), Some(updates)),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "prompt unavailable; waiting for countdown");
            (None, None)
        }
    };
    let notify = |ev: GateEvent| {
        if let Some(tx) = &updates {
            let _ = tx.send(ev);
        }
    };

    let resolver = DecisionResolver::new();
    let mut remaining = view.countdown_seconds;
    let period = Duration::from_secs(1);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    notify(GateEvent::Countdown { remaining });

    let outcome = loop {
        tokio::select! {
            biased;
            action = next_action(&mut actions), if actions.is_some() => match action {
                Some(a) => {
                    if resolver.resolve(a.into_outcome(view.schedule_at)) {
                        tracing::info!(app = %view.app, action = ?a, "user decision");
                    }
                }
                None => {
                    tracing::debug!("prompt input closed; countdown continues");
                    actions = None;
                }
            },
            _ = ticker.tick() => {
                remaining = remaining.saturating_sub(1);
                notify(GateEvent::Countdown { remaining });
                if remaining == 0 && resolver.resolve(DecisionOutcome::TimedOutDefault) {
                    tracing::info!(app = %view.app, "decision countdown expired");
                }
            }
        }
        if let Some(outcome) = resolver.outcome() {
            break outcome;
        }
    };

    notify(GateEvent::Resolved(outcome));
    drop(updates);
    presenter.dismiss();
    outcome
}

async fn next_action(actions: &mut Option<UnboundedReceiver<UserAction>>) -> Option<UserAction> {
    match actions {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;
    use time::macros::datetime;
    use tokio::sync::mpsc;

    /// Presenter driven by a test: each `(secs, action)` is sent after `secs` seconds.
    pub(crate) struct ScriptedPresenter {
        pub script: Vec<(u64, UserAction)>,
        pub updates: Option<mpsc::UnboundedReceiver<GateEvent>>,
        pub presented: usize,
        pub dismissed: usize,
        pub fail: bool,
    }

    impl ScriptedPresenter {
        pub(crate) fn new(script: Vec<(u64, UserAction)>) -> Self {
            Self {
                script,
                updates: None,
                presented: 0,
                dismissed: 0,
                fail: false,
            }
        }

        pub(crate) fn events(&mut self) -> Vec<GateEvent> {
            let mut out = Vec::new();
            if let Some(rx) = self.updates.as_mut() {
                while let Ok(ev) = rx.try_recv() {
                    out.push(ev);
                }
            }
            out
        }
    }

    impl Presenter for ScriptedPresenter {
        fn present(&mut self, _view: &PromptView) -> anyhow::Result<PromptChannels> {
            self.presented += 1;
            if self.fail {
                anyhow::bail!("no terminal");
            }
            let (action_tx, actions) = mpsc::unbounded_channel();
            let (updates, updates_rx) = mpsc::unbounded_channel();
            self.updates = Some(updates_rx);
            for (after_secs, action) in self.script.clone() {
                let tx = action_tx.clone();
                tokio::spawn(async move {
                    if after_secs > 0 {
                        tokio::time::sleep(Duration::from_secs(after_secs)).await;
                    }
                    let _ = tx.send(action);
                });
            }
            Ok(PromptChannels { actions, updates })
        }

        fn dismiss(&mut self) {
            self.dismissed += 1;
        }
    }

    pub(crate) fn view(countdown_seconds: u64) -> PromptView {
        PromptView {
            app: AppId::Chrome,
            display_name: "Google Chrome".into(),
            countdown_seconds,
            schedule_at: datetime!(2026-10-14 19:00:00 UTC),
        }
    }

    fn resolved_count(events: &[GateEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, GateEvent::Resolved(_)))
            .count()
    }

    #[test]
    fn resolver_is_single_fire() {
        let r = DecisionResolver::new();
        assert_eq!(r.outcome(), None);
        assert!(r.resolve(DecisionOutcome::Cancelled));
        assert!(!r.resolve(DecisionOutcome::TimedOutDefault));
        assert!(!r.resolve(DecisionOutcome::Immediate));
        assert_eq!(r.outcome(), Some(DecisionOutcome::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_resolves_cancelled() {
        let mut p = ScriptedPresenter::new(vec![(3, UserAction::ChooseCancel)]);
        let started = Instant::now();
        let outcome = resolve(&view(300), &mut p).await;
        assert_eq!(outcome, DecisionOutcome::Cancelled);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(p.dismissed, 1);
        let events = p.events();
        assert_eq!(events.last(), Some(&GateEvent::Resolved(DecisionOutcome::Cancelled)));
        assert_eq!(resolved_count(&events), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_uses_prompt_time() {
        let mut p = ScriptedPresenter::new(vec![(0, UserAction::ChooseSchedule)]);
        let outcome = resolve(&view(300), &mut p).await;
        assert_eq!(
            outcome,
            DecisionOutcome::Scheduled(datetime!(2026-10-14 19:00:00 UTC))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_expiry_times_out_to_default() {
        let mut p = ScriptedPresenter::new(vec![]);
        let started = Instant::now();
        let outcome = resolve(&view(5), &mut p).await;
        assert_eq!(outcome, DecisionOutcome::TimedOutDefault);
        assert!(outcome.proceeds_now());
        assert_eq!(started.elapsed(), Duration::from_secs(5));

        let events = p.events();
        let ticks: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                GateEvent::Countdown { remaining } => Some(*remaining),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![5, 4, 3, 2, 1, 0]);
        assert_eq!(resolved_count(&events), 1);
    }

    /// Hands the action sender back to the test so it can be fed mid-countdown.
    struct HandlePresenter {
        action_tx: Arc<Mutex<Option<mpsc::UnboundedSender<UserAction>>>>,
        updates: Option<mpsc::UnboundedReceiver<GateEvent>>,
    }

    impl Presenter for HandlePresenter {
        fn present(&mut self, _view: &PromptView) -> anyhow::Result<PromptChannels> {
            let (tx, actions) = mpsc::unbounded_channel();
            let (updates, updates_rx) = mpsc::unbounded_channel();
            *self.action_tx.lock().unwrap() = Some(tx);
            self.updates = Some(updates_rx);
            Ok(PromptChannels { actions, updates })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn action_ready_with_final_tick_wins() {
        let handle = Arc::new(Mutex::new(None));
        let mut p = HandlePresenter {
            action_tx: handle.clone(),
            updates: None,
        };
        let view = view(2);
        let outcome = {
            let gate = resolve(&view, &mut p);
            tokio::pin!(gate);

            assert!(futures::poll!(&mut gate).is_pending());
            tokio::time::advance(Duration::from_secs(1)).await;
            assert!(futures::poll!(&mut gate).is_pending());

            // Final tick is due and the action is queued before the next poll.
            tokio::time::advance(Duration::from_secs(1)).await;
            let tx = handle.lock().unwrap().clone().unwrap();
            tx.send(UserAction::ChooseCancel).unwrap();
            gate.await
        };
        assert_eq!(outcome, DecisionOutcome::Cancelled);

        let mut events = Vec::new();
        if let Some(rx) = p.updates.as_mut() {
            while let Ok(ev) = rx.try_recv() {
                events.push(ev);
            }
        }
        assert_eq!(
            events,
            vec![
                GateEvent::Countdown { remaining: 2 },
                GateEvent::Countdown { remaining: 1 },
                GateEvent::Resolved(DecisionOutcome::Cancelled),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn simultaneous_actions_resolve_once() {
        let mut p = ScriptedPresenter::new(vec![
            (2, UserAction::ChooseCancel),
            (2, UserAction::ChooseImmediate),
        ]);
        let outcome = resolve(&view(2), &mut p).await;
        let events = p.events();
        assert_eq!(resolved_count(&events), 1);
        assert_eq!(events.last(), Some(&GateEvent::Resolved(outcome)));
    }

    #[tokio::test(start_paused = true)]
    async fn later_actions_are_ignored() {
        let mut p = ScriptedPresenter::new(vec![
            (1, UserAction::ChooseImmediate),
            (2, UserAction::ChooseCancel),
        ]);
        let outcome = resolve(&view(300), &mut p).await;
        assert_eq!(outcome, DecisionOutcome::Immediate);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_presenter_still_times_out() {
        let mut p = ScriptedPresenter::new(vec![]);
        p.fail = true;
        let started = Instant::now();
        let outcome = resolve(&view(3), &mut p).await;
        assert_eq!(outcome, DecisionOutcome::TimedOutDefault);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_countdown_returns_default_without_prompt() {
        let mut p = ScriptedPresenter::new(vec![]);
        let outcome = resolve(&view(0), &mut p).await;
        assert_eq!(outcome, DecisionOutcome::TimedOutDefault);
        assert_eq!(p.presented, 0);
    }
}
