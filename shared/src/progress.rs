//! Lifecycle progress for a single file: local preview, network upload and
//! remote processing, collapsed into one indicator.
//!
//! [`ProgressState`] never owns a timer. Each transition hands back a
//! [`Timer`] directive which the host applies to its one timer slot, and each
//! timer callback comes back with the [`Ticket`] it was scheduled under.
//! Every mode entry and reset moves the generation forward, so callbacks from
//! a superseded mode are recognised as stale and ignored.

use derive_more::Display;
use std::time::Duration;

pub const PREVIEW_TICK: Duration = Duration::from_millis(200);
pub const PREVIEW_STEP: f64 = 10.0;
pub const PREVIEW_CEILING: f64 = 70.0;

pub const PROCESSING_TICK: Duration = Duration::from_millis(1000);
pub const PROCESSING_STEP_MAX: f64 = 5.0;
/// Simulated processing progress stops here; only a real response reaches 100.
pub const PROCESSING_CEILING: f64 = 90.0;

/// How long a completed bar stays visible before collapsing to idle.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

pub const PREVIEW_MESSAGE: &str = "Loading preview...";
pub const UPLOAD_MESSAGE: &str = "Uploading image...";
pub const PROCESSING_MESSAGE: &str = "Processing image (this may take 5-10 minutes)...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "#{}", _0)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ModeKind {
    Idle,
    PreviewLoading,
    Uploading,
    Processing,
}

/// The active phase together with the data that only exists inside it.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleMode {
    Idle,
    PreviewLoading { file_name: String, progress: f64 },
    Uploading { file_name: String, progress: f64 },
    Processing { file_name: String, progress: f64 },
}

impl LifecycleMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            LifecycleMode::Idle => ModeKind::Idle,
            LifecycleMode::PreviewLoading { .. } => ModeKind::PreviewLoading,
            LifecycleMode::Uploading { .. } => ModeKind::Uploading,
            LifecycleMode::Processing { .. } => ModeKind::Processing,
        }
    }

    fn progress_mut(&mut self) -> Option<&mut f64> {
        match self {
            LifecycleMode::Idle => None,
            LifecycleMode::PreviewLoading { progress, .. }
            | LifecycleMode::Uploading { progress, .. }
            | LifecycleMode::Processing { progress, .. } => Some(progress),
        }
    }
}

/// What the host should do with its progress timer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Replace the slot with a repeating timer delivering `ticket`.
    Interval { ticket: Ticket, period: Duration },
    /// Replace the slot with a one-shot timer delivering `ticket` to `settle`.
    Delay { ticket: Ticket, delay: Duration },
    /// Empty the slot.
    Cancel,
}

impl Timer {
    pub fn ticket(&self) -> Option<Ticket> {
        match self {
            Timer::Interval { ticket, .. } | Timer::Delay { ticket, .. } => Some(*ticket),
            Timer::Cancel => None,
        }
    }
}

/// Result of delivering a periodic tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    /// The ceiling was reached; the host should drop the interval.
    Stop,
    /// The tick belongs to a superseded mode and changed nothing.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    mode: LifecycleMode,
    generation: u64,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    pub fn new() -> Self {
        Self {
            mode: LifecycleMode::Idle,
            generation: 0,
        }
    }

    pub fn mode(&self) -> &LifecycleMode {
        &self.mode
    }

    pub fn mode_kind(&self) -> ModeKind {
        self.mode.kind()
    }

    pub fn is_active(&self) -> bool {
        self.mode_kind() != ModeKind::Idle
    }

    /// Current percentage; always 0 while idle.
    pub fn progress(&self) -> f64 {
        match &self.mode {
            LifecycleMode::Idle => 0.0,
            LifecycleMode::PreviewLoading { progress, .. }
            | LifecycleMode::Uploading { progress, .. }
            | LifecycleMode::Processing { progress, .. } => *progress,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match &self.mode {
            LifecycleMode::Idle => None,
            LifecycleMode::PreviewLoading { file_name, .. }
            | LifecycleMode::Uploading { file_name, .. }
            | LifecycleMode::Processing { file_name, .. } => Some(file_name),
        }
    }

    pub fn status_message(&self) -> &'static str {
        match self.mode_kind() {
            ModeKind::Idle => "",
            ModeKind::PreviewLoading => PREVIEW_MESSAGE,
            ModeKind::Uploading => UPLOAD_MESSAGE,
            ModeKind::Processing => PROCESSING_MESSAGE,
        }
    }

    pub fn current_ticket(&self) -> Ticket {
        Ticket(self.generation)
    }

    fn next_ticket(&mut self) -> Ticket {
        self.generation += 1;
        Ticket(self.generation)
    }

    fn enter(&mut self, mode: LifecycleMode) -> Ticket {
        let ticket = self.next_ticket();
        log::debug!(
            "progress {}: {} -> {}",
            ticket,
            self.mode.kind(),
            mode.kind()
        );
        self.mode = mode;
        ticket
    }

    pub fn enter_preview(&mut self, file_name: &str) -> Timer {
        let ticket = self.enter(LifecycleMode::PreviewLoading {
            file_name: file_name.to_string(),
            progress: 0.0,
        });
        Timer::Interval {
            ticket,
            period: PREVIEW_TICK,
        }
    }

    pub fn advance_preview(&mut self, ticket: Ticket) -> Tick {
        if ticket != self.current_ticket() {
            return Tick::Stale;
        }
        match &mut self.mode {
            LifecycleMode::PreviewLoading { progress, .. } => {
                step_towards(progress, PREVIEW_STEP, PREVIEW_CEILING)
            }
            _ => Tick::Stale,
        }
    }

    /// Shows a full bar and schedules the collapse to idle.
    ///
    /// Returns `None` when no preview is running, e.g. an upload pre-empted it.
    pub fn complete_preview(&mut self) -> Option<Timer> {
        if self.mode_kind() != ModeKind::PreviewLoading {
            return None;
        }
        Some(self.finish())
    }

    pub fn enter_upload(&mut self, file_name: &str) -> Timer {
        self.enter(LifecycleMode::Uploading {
            file_name: file_name.to_string(),
            progress: 0.0,
        });
        Timer::Cancel
    }

    /// Takes a real transfer percentage as-is. Ignored outside of uploading.
    pub fn set_upload_progress(&mut self, percent: f64) {
        if let LifecycleMode::Uploading { progress, .. } = &mut self.mode {
            *progress = percent;
        }
    }

    pub fn enter_processing(&mut self, file_name: &str) -> Timer {
        let ticket = self.enter(LifecycleMode::Processing {
            file_name: file_name.to_string(),
            progress: 0.0,
        });
        Timer::Interval {
            ticket,
            period: PROCESSING_TICK,
        }
    }

    /// Simulated processing tick. `unit` is a random draw in `[0, 1)`.
    pub fn advance_processing(&mut self, ticket: Ticket, unit: f64) -> Tick {
        if ticket != self.current_ticket() {
            return Tick::Stale;
        }
        let step = unit.clamp(0.0, 1.0) * PROCESSING_STEP_MAX;
        match &mut self.mode {
            LifecycleMode::Processing { progress, .. } => {
                step_towards(progress, step, PROCESSING_CEILING)
            }
            _ => Tick::Stale,
        }
    }

    pub fn complete_processing(&mut self) -> Option<Timer> {
        if self.mode_kind() != ModeKind::Processing {
            return None;
        }
        Some(self.finish())
    }

    fn finish(&mut self) -> Timer {
        let ticket = self.next_ticket();
        if let Some(progress) = self.mode.progress_mut() {
            *progress = 100.0;
        }
        Timer::Delay {
            ticket,
            delay: SETTLE_DELAY,
        }
    }

    /// Delayed collapse after a completion. Returns whether it applied.
    pub fn settle(&mut self, ticket: Ticket) -> bool {
        if ticket != self.current_ticket() || !self.is_active() {
            return false;
        }
        self.enter(LifecycleMode::Idle);
        true
    }

    pub fn reset(&mut self) -> Timer {
        self.enter(LifecycleMode::Idle);
        Timer::Cancel
    }
}

fn step_towards(progress: &mut f64, step: f64, ceiling: f64) -> Tick {
    if *progress >= ceiling {
        return Tick::Stop;
    }
    *progress = (*progress + step).min(ceiling);
    if *progress >= ceiling {
        Tick::Stop
    } else {
        Tick::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval_ticket(timer: Timer) -> Ticket {
        match timer {
            Timer::Interval { ticket, .. } => ticket,
            other => panic!("expected an interval, got {:?}", other),
        }
    }

    fn delay_ticket(timer: Option<Timer>) -> Ticket {
        match timer {
            Some(Timer::Delay { ticket, .. }) => ticket,
            other => panic!("expected a delay, got {:?}", other),
        }
    }

    #[test]
    fn idle_has_no_progress_or_name() {
        let state = ProgressState::new();
        assert_eq!(state.mode_kind(), ModeKind::Idle);
        assert_eq!(state.progress(), 0.0);
        assert_eq!(state.file_name(), None);
        assert_eq!(state.status_message(), "");
    }

    #[test]
    fn preview_climbs_in_steps_and_stops_at_seventy() {
        let mut state = ProgressState::new();
        let ticket = interval_ticket(state.enter_preview("field.tif"));
        assert_eq!(state.status_message(), PREVIEW_MESSAGE);

        let mut seen = Vec::new();
        loop {
            let tick = state.advance_preview(ticket);
            seen.push(state.progress());
            if tick == Tick::Stop {
                break;
            }
        }
        assert_eq!(seen, vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0]);
        assert_eq!(state.advance_preview(ticket), Tick::Stop);
        assert_eq!(state.progress(), 70.0);
    }

    #[test]
    fn completion_jumps_to_full_then_settles() {
        let mut state = ProgressState::new();
        state.enter_preview("field.tif");
        let settle = delay_ticket(state.complete_preview());
        assert_eq!(state.progress(), 100.0);
        assert_eq!(state.mode_kind(), ModeKind::PreviewLoading);

        assert!(state.settle(settle));
        assert_eq!(state.mode(), &LifecycleMode::Idle);
    }

    #[test]
    fn late_settle_does_not_clobber_a_new_upload() {
        let mut state = ProgressState::new();
        state.enter_preview("a.png");
        let settle = delay_ticket(state.complete_preview());

        assert_eq!(state.enter_upload("a.png"), Timer::Cancel);
        state.set_upload_progress(40.0);

        assert!(!state.settle(settle));
        assert_eq!(state.mode_kind(), ModeKind::Uploading);
        assert_eq!(state.progress(), 40.0);
    }

    #[test]
    fn upload_progress_only_applies_while_uploading() {
        let mut state = ProgressState::new();
        state.set_upload_progress(50.0);
        assert_eq!(state.progress(), 0.0);

        state.enter_upload("a.png");
        state.set_upload_progress(25.0);
        assert_eq!(state.progress(), 25.0);
        assert_eq!(state.status_message(), UPLOAD_MESSAGE);
    }

    #[test]
    fn processing_never_auto_completes() {
        let mut state = ProgressState::new();
        state.enter_upload("a.png");
        let ticket = interval_ticket(state.enter_processing("a.png"));
        assert_eq!(state.progress(), 0.0);
        assert_eq!(state.status_message(), PROCESSING_MESSAGE);

        for _ in 0..500 {
            state.advance_processing(ticket, 0.99);
        }
        assert_eq!(state.progress(), PROCESSING_CEILING);
        assert_eq!(state.advance_processing(ticket, 0.99), Tick::Stop);

        delay_ticket(state.complete_processing());
        assert_eq!(state.progress(), 100.0);
    }

    #[test]
    fn ticks_after_reset_are_stale() {
        let mut state = ProgressState::new();
        state.enter_upload("a.png");
        let ticket = interval_ticket(state.enter_processing("a.png"));
        state.advance_processing(ticket, 0.5);

        assert_eq!(state.reset(), Timer::Cancel);
        assert_eq!(state.advance_processing(ticket, 0.5), Tick::Stale);
        assert_eq!(state.progress(), 0.0);
        assert_eq!(state.mode_kind(), ModeKind::Idle);
    }

    #[test]
    fn completing_the_wrong_mode_is_a_no_op() {
        let mut state = ProgressState::new();
        assert_eq!(state.complete_preview(), None);
        state.enter_upload("a.png");
        assert_eq!(state.complete_preview(), None);
        assert_eq!(state.complete_processing(), None);
        assert_eq!(state.mode_kind(), ModeKind::Uploading);
    }
}
