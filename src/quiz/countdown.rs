use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum CountdownStatus {
    #[default]
    Idle,
    Running,
    Stopped,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing changed.
    Idle,
    Remaining(u32),
    /// Reached zero on this tick. Reported exactly once per arming.
    Expired,
}

/// Whole-second countdown bound to the active phase of a session. The
/// owner drives it with [`Countdown::tick`] once per second.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub status: CountdownStatus,
    pub duration_secs: u32,
    pub remaining_secs: u32,
}

impl Countdown {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            status: CountdownStatus::Idle,
            duration_secs,
            remaining_secs: duration_secs,
        }
    }

    pub fn arm(&mut self, duration_secs: u32) {
        *self = Self {
            status: CountdownStatus::Running,
            duration_secs,
            remaining_secs: duration_secs,
        };
    }

    /// Freezes the remaining time so the result view can still show it.
    pub fn disarm(&mut self) {
        if self.status == CountdownStatus::Running {
            self.status = CountdownStatus::Stopped;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.duration_secs);
    }

    pub fn is_running(&self) -> bool {
        self.status == CountdownStatus::Running
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.status != CountdownStatus::Running {
            return TickOutcome::Idle;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.status = CountdownStatus::Expired;
            TickOutcome::Expired
        } else {
            TickOutcome::Remaining(self.remaining_secs)
        }
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.duration_secs.saturating_sub(self.remaining_secs)
    }

    pub fn is_urgent(&self, urgent_threshold_secs: u32) -> bool {
        self.is_running() && self.remaining_secs < urgent_threshold_secs
    }

    pub fn display(&self) -> String {
        format_mmss(self.remaining_secs)
    }
}

/// `MM:SS`, minutes not capped at 59.
pub fn format_mmss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_down_by_one_and_expires_once() {
        let mut countdown = Countdown::new(3);
        assert_eq!(countdown.tick(), TickOutcome::Idle);

        countdown.arm(3);
        assert_eq!(countdown.tick(), TickOutcome::Remaining(2));
        assert_eq!(countdown.tick(), TickOutcome::Remaining(1));
        assert_eq!(countdown.tick(), TickOutcome::Expired);
        assert_eq!(countdown.remaining_secs, 0);

        assert_eq!(countdown.tick(), TickOutcome::Idle);
        assert_eq!(countdown.remaining_secs, 0);
    }

    #[test]
    fn disarm_freezes_remaining_time() {
        let mut countdown = Countdown::new(10);
        countdown.arm(10);
        countdown.tick();
        countdown.disarm();

        assert_eq!(countdown.tick(), TickOutcome::Idle);
        assert_eq!(countdown.remaining_secs, 9);
        assert_eq!(countdown.elapsed_secs(), 1);
        assert_eq!(countdown.status, CountdownStatus::Stopped);
    }

    #[test]
    fn rearming_discards_previous_progress() {
        let mut countdown = Countdown::new(5);
        countdown.arm(5);
        countdown.tick();
        countdown.tick();
        countdown.arm(5);
        assert_eq!(countdown.remaining_secs, 5);
        assert!(countdown.is_running());
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_mmss(600), "10:00");
        assert_eq!(format_mmss(119), "01:59");
        assert_eq!(format_mmss(5), "00:05");
        assert_eq!(format_mmss(0), "00:00");
    }

    #[test]
    fn urgent_only_while_running() {
        let mut countdown = Countdown::new(600);
        assert!(!countdown.is_urgent(120));

        countdown.arm(100);
        assert!(countdown.is_urgent(120));
        countdown.disarm();
        assert!(!countdown.is_urgent(120));
    }
}
