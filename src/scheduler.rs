// PulseWatch: Upload Scheduler
//
// Two targets share one tick. The fast path fires on every tick that has a
// record. The slow path fires at most once per `slow_interval_ms`; the timer
// restarts on every slow attempt, failed or not, so a dead endpoint is only
// hit once per interval.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadDecision {
    pub do_fast: bool,
    pub do_slow: bool,
}

impl UploadDecision {
    pub const NONE: Self = Self { do_fast: false, do_slow: false };
}

#[derive(Debug, Clone)]
pub struct UploadScheduler {
    slow_interval_ms: u64,
    /// `None` until the first slow attempt: the first record is eligible at once.
    last_slow_upload_at: Option<u64>,
}

impl UploadScheduler {
    pub fn new(slow_interval_ms: u64) -> Self {
        Self {
            slow_interval_ms,
            last_slow_upload_at: None,
        }
    }

    pub fn last_slow_upload_at(&self) -> Option<u64> {
        self.last_slow_upload_at
    }

    /// Decide what to send on this tick. When `do_slow` is returned the slow
    /// timer is committed to `now`; the caller must make exactly one attempt.
    pub fn decide(&mut self, now: u64, has_record: bool) -> UploadDecision {
        if !has_record {
            return UploadDecision::NONE;
        }

        let do_slow = match self.last_slow_upload_at {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.slow_interval_ms,
        };
        if do_slow {
            self.last_slow_upload_at = Some(now);
        }

        UploadDecision { do_fast: true, do_slow }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_path_follows_record() {
        let mut scheduler = UploadScheduler::new(30_000);
        assert_eq!(scheduler.decide(0, false), UploadDecision::NONE);
        assert!(scheduler.decide(1_000, true).do_fast);
        assert!(scheduler.decide(2_000, true).do_fast);
        assert!(!scheduler.decide(3_000, false).do_fast);
    }

    #[test]
    fn slow_path_fires_at_start_and_after_each_full_interval() {
        let mut scheduler = UploadScheduler::new(30_000);
        let fired: Vec<u64> = (0..=30)
            .map(|s| s * 1_000)
            .filter(|&now| scheduler.decide(now, true).do_slow)
            .collect();
        assert_eq!(fired, vec![0, 30_000]);
        assert_eq!(scheduler.last_slow_upload_at(), Some(30_000));
    }

    #[test]
    fn slow_interval_boundary() {
        let mut scheduler = UploadScheduler::new(30_000);
        assert!(scheduler.decide(0, true).do_slow);
        assert!(!scheduler.decide(29_999, true).do_slow);
        assert_eq!(scheduler.last_slow_upload_at(), Some(0));
        assert!(scheduler.decide(30_000, true).do_slow);
        assert_eq!(scheduler.last_slow_upload_at(), Some(30_000));
    }

    #[test]
    fn no_contact_does_not_consume_slow_slot() {
        let mut scheduler = UploadScheduler::new(30_000);
        assert!(!scheduler.decide(0, false).do_slow);
        assert_eq!(scheduler.last_slow_upload_at(), None);
        // First record after a long gap still goes out immediately.
        assert!(scheduler.decide(45_000, true).do_slow);
    }

    #[test]
    fn overdue_slot_fires_once_then_waits_full_interval() {
        let mut scheduler = UploadScheduler::new(30_000);
        scheduler.decide(0, true);
        // Finger lifted for a while; next contact is late.
        assert!(scheduler.decide(70_000, true).do_slow);
        assert!(!scheduler.decide(71_000, true).do_slow);
        assert!(!scheduler.decide(99_999, true).do_slow);
        assert!(scheduler.decide(100_000, true).do_slow);
    }

    #[test]
    fn backwards_clock_never_fires_early() {
        let mut scheduler = UploadScheduler::new(30_000);
        scheduler.decide(50_000, true);
        assert!(!scheduler.decide(10_000, true).do_slow);
    }
}
