use std::time::Duration;

use rand::Rng;

/// Requeue schedule for transient failures: exponential growth from the base
/// delay up to the cap, with jitter so colliding reconciles spread out.
#[derive(Clone, Debug)]
pub struct BackoffSchedule {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(60),
        }
    }
}

impl BackoffSchedule {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.base.as_secs_f64() * 2f64.powi(attempt.min(31) as i32);
        let capped = exp.min(self.cap.as_secs_f64());
        let jittered = capped * rand::thread_rng().gen_range(0.5..1.5);
        Duration::from_secs_f64(jittered.min(self.cap.as_secs_f64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_and_respects_cap() {
        let schedule = BackoffSchedule::default();
        for attempt in 0..20 {
            let delay = schedule.delay(attempt);
            assert!(delay >= Duration::from_millis(500), "attempt {attempt} delay {delay:?}");
            assert!(delay <= Duration::from_secs(60), "attempt {attempt} delay {delay:?}");
        }
    }

    #[test]
    fn large_attempt_counts_do_not_overflow() {
        let schedule = BackoffSchedule::default();
        assert!(schedule.delay(u32::MAX) <= Duration::from_secs(60));
    }
}
