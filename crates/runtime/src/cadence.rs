use crate::frame::Frame;

/// Runs a piece of per-frame work on every `interval`-th frame.
///
/// Frame-index based rather than wall-clock based, so the schedule is
/// replayable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameCadence {
    interval: u32,
}

impl FrameCadence {
    /// `interval` of zero is treated as one (every frame).
    pub fn every(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
        }
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn is_due(&self, frame: Frame) -> bool {
        frame.index % u64::from(self.interval) == 0
    }

    /// Worst-case wait (seconds) between a request and the next due frame.
    pub fn worst_case_delay_s(&self, dt_s: f64) -> f64 {
        f64::from(self.interval - 1) * dt_s
    }
}

#[cfg(test)]
mod tests {
    use super::FrameCadence;
    use crate::frame::Frame;

    #[test]
    fn runs_one_in_three() {
        let cadence = FrameCadence::every(3);
        let due: Vec<u64> = (0..9)
            .map(|i| Frame::new(i, 1.0 / 60.0))
            .filter(|f| cadence.is_due(*f))
            .map(|f| f.index)
            .collect();
        assert_eq!(due, vec![0, 3, 6]);
    }

    #[test]
    fn zero_interval_means_every_frame() {
        let cadence = FrameCadence::every(0);
        assert_eq!(cadence.interval(), 1);
        assert!(cadence.is_due(Frame::new(5, 1.0)));
        assert_eq!(cadence.worst_case_delay_s(1.0), 0.0);
    }

    #[test]
    fn one_in_three_at_sixty_hz_stays_well_under_100ms() {
        let cadence = FrameCadence::every(3);
        let dt = 1.0 / 60.0;
        let delay = cadence.worst_case_delay_s(dt);
        assert!(delay < 0.1, "delay {delay}s");
    }
}
