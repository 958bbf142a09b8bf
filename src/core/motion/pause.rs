use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseState {
    Active,
    Paused { end_ms: u64 },
}

/// `(paused, remaining_ms)` update for collaborators showing a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseNotice {
    pub paused: bool,
    pub remaining_ms: Option<u64>,
}

impl PauseNotice {
    fn paused(remaining_ms: u64) -> Self {
        Self {
            paused: true,
            remaining_ms: Some(remaining_ms),
        }
    }

    fn resumed() -> Self {
        Self {
            paused: false,
            remaining_ms: None,
        }
    }
}

/// Post-detection hold-off. The deadline is fixed at engagement time and
/// cannot be extended while it runs.
#[derive(Debug, Clone)]
pub struct PauseController {
    duration_ms: u64,
    notify_interval_ms: u64,
    state: PauseState,
    last_notice_ms: u64,
}

impl PauseController {
    pub fn new(duration_ms: u64, notify_interval_ms: u64) -> Self {
        Self {
            duration_ms,
            notify_interval_ms,
            state: PauseState::Active,
            last_notice_ms: 0,
        }
    }

    pub fn state(&self) -> PauseState {
        self.state
    }

    pub fn is_paused(&self, now_ms: u64) -> bool {
        matches!(self.state, PauseState::Paused { end_ms } if now_ms < end_ms)
    }

    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        match self.state {
            PauseState::Paused { end_ms } if now_ms < end_ms => Some(end_ms - now_ms),
            _ => None,
        }
    }

    /// Starts a pause at `now_ms`. Returns `None` if a pause is already
    /// running, since the deadline cannot be pushed back.
    pub fn engage(&mut self, now_ms: u64) -> Option<PauseNotice> {
        if self.is_paused(now_ms) || self.duration_ms == 0 {
            return None;
        }
        let end_ms = now_ms.saturating_add(self.duration_ms);
        self.state = PauseState::Paused { end_ms };
        self.last_notice_ms = now_ms;
        info!("⏸️ PauseController: paused until {} ms", end_ms);
        Some(PauseNotice::paused(self.duration_ms))
    }

    /// Returns to `Active` once the deadline has passed.
    pub fn expire(&mut self, now_ms: u64) -> Option<PauseNotice> {
        match self.state {
            PauseState::Paused { end_ms } if now_ms >= end_ms => {
                self.state = PauseState::Active;
                info!("▶️ PauseController: resumed");
                Some(PauseNotice::resumed())
            }
            _ => None,
        }
    }

    /// Called once per driver tick: resumes once the deadline has passed and
    /// otherwise reports the remaining time at most once per notify interval.
    pub fn poll(&mut self, now_ms: u64) -> Option<PauseNotice> {
        if let Some(notice) = self.expire(now_ms) {
            return Some(notice);
        }
        let PauseState::Paused { end_ms } = self.state else {
            return None;
        };
        if now_ms.saturating_sub(self.last_notice_ms) >= self.notify_interval_ms {
            self.last_notice_ms = now_ms;
            return Some(PauseNotice::paused(end_ms - now_ms));
        }
        None
    }

    /// Drops a running pause, e.g. when the stream stops.
    pub fn cancel(&mut self) -> Option<PauseNotice> {
        match std::mem::replace(&mut self.state, PauseState::Active) {
            PauseState::Paused { .. } => Some(PauseNotice::resumed()),
            PauseState::Active => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engage_and_expire() {
        let mut pause = PauseController::new(3000, 200);
        assert!(!pause.is_paused(0));

        let notice = pause.engage(1000).unwrap();
        assert_eq!(notice, PauseNotice::paused(3000));
        assert!(pause.is_paused(1000));
        assert!(pause.is_paused(3999));
        assert!(!pause.is_paused(4000));
        assert_eq!(pause.remaining_ms(2500), Some(1500));
    }

    #[test]
    fn test_deadline_not_extendable() {
        let mut pause = PauseController::new(3000, 200);
        pause.engage(0);
        assert!(pause.engage(1500).is_none());
        assert_eq!(pause.state(), PauseState::Paused { end_ms: 3000 });
    }

    #[test]
    fn test_poll_cadence() {
        let mut pause = PauseController::new(1000, 200);
        pause.engage(0);

        assert_eq!(pause.poll(100), None);
        assert_eq!(pause.poll(200), Some(PauseNotice::paused(800)));
        assert_eq!(pause.poll(300), None);
        assert_eq!(pause.poll(450), Some(PauseNotice::paused(550)));
        assert_eq!(pause.poll(1000), Some(PauseNotice::resumed()));
        assert_eq!(pause.state(), PauseState::Active);
        assert_eq!(pause.poll(1200), None);
    }

    #[test]
    fn test_expire_only_after_deadline() {
        let mut pause = PauseController::new(1000, 200);
        assert_eq!(pause.expire(0), None);
        pause.engage(0);

        assert_eq!(pause.expire(999), None);
        assert_eq!(pause.state(), PauseState::Paused { end_ms: 1000 });
        assert_eq!(pause.expire(1000), Some(PauseNotice::resumed()));
        assert_eq!(pause.state(), PauseState::Active);
        assert_eq!(pause.poll(1000), None);
    }

    #[test]
    fn test_cancel() {
        let mut pause = PauseController::new(1000, 200);
        assert_eq!(pause.cancel(), None);
        pause.engage(0);
        assert_eq!(pause.cancel(), Some(PauseNotice::resumed()));
        assert!(!pause.is_paused(10));
    }
}
