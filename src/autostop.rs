//! Auto-stop ("sleep timer") state machine.
//!
//! The service never touches the player. It is driven by one-second ticks from
//! the session and hands back `AutoStopNotice`s the session turns into events
//! or a stop.

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum AutoStopPolicy {
    #[default]
    Disabled,
    /// Stop once the current track ends; handled by the session's track-end path.
    AfterTrackEnd,
    /// Stop after this many seconds of playback.
    After(f64),
}

impl AutoStopPolicy {
    pub fn is_disabled(&self) -> bool {
        matches!(self, AutoStopPolicy::Disabled)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AutoStopNotice {
    Remaining(f64),
    /// The countdown ran out; the owner should stop playback.
    StopRequested,
    PolicyChanged(AutoStopPolicy),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TimerState {
    Idle,
    Running,
    Suspended,
}

#[derive(Debug)]
pub struct AutoStopService {
    policy: AutoStopPolicy,
    remaining: f64,
    timer: TimerState,
}

impl Default for AutoStopService {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoStopService {
    pub fn new() -> Self {
        Self {
            policy: AutoStopPolicy::Disabled,
            remaining: 0.0,
            timer: TimerState::Idle,
        }
    }

    pub fn policy(&self) -> AutoStopPolicy {
        self.policy
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn is_ticking(&self) -> bool {
        self.timer == TimerState::Running
    }

    /// Replace the policy. An `After` countdown starts right away when `playing`.
    pub fn setup(&mut self, policy: AutoStopPolicy, playing: bool) -> Vec<AutoStopNotice> {
        self.policy = policy;
        let mut notices = vec![AutoStopNotice::PolicyChanged(policy)];
        match policy {
            AutoStopPolicy::Disabled | AutoStopPolicy::AfterTrackEnd => {
                self.timer = TimerState::Idle;
            }
            AutoStopPolicy::After(seconds) => {
                self.remaining = if seconds.is_finite() { seconds } else { 0.0 };
                self.timer = TimerState::Idle;
                self.start_timer(playing);
                notices.push(AutoStopNotice::Remaining(self.remaining));
            }
        }
        notices
    }

    /// Start (or resume) the countdown if the policy has one and playback is active.
    pub fn start_timer(&mut self, playing: bool) {
        if !matches!(self.policy, AutoStopPolicy::After(_)) || !playing {
            return;
        }
        self.timer = TimerState::Running;
    }

    /// Suspend ticking; the remaining time is kept.
    pub fn pause_timer(&mut self) {
        if self.timer == TimerState::Running {
            self.timer = TimerState::Suspended;
        }
    }

    /// Stop ticking and reset the policy to `Disabled`.
    pub fn cancel_timer(&mut self) {
        self.timer = TimerState::Idle;
        self.policy = AutoStopPolicy::Disabled;
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Vec<AutoStopNotice> {
        if self.timer != TimerState::Running {
            return Vec::new();
        }

        self.remaining -= 1.0;
        let mut notices = vec![AutoStopNotice::Remaining(self.remaining)];
        if self.remaining <= 0.0 {
            tracing::debug!("auto-stop countdown elapsed");
            self.timer = TimerState::Idle;
            notices.push(AutoStopNotice::StopRequested);
        }
        notices
    }
}
