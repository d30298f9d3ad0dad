/// One turn of the render loop.
///
/// Every per-frame decision (hover cadence, fly-to steps, event stamps) keys
/// off `index`, never off wall-clock time, so a scripted session replays the
/// same way every run.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub index: u64,
    /// Nominal seconds between frames. Only used to convert frame counts to
    /// durations for logging and config checks.
    pub dt_s: f64,
}

impl Frame {
    pub const DEFAULT_DT_S: f64 = 1.0 / 60.0;

    pub fn new(index: u64, dt_s: f64) -> Self {
        Self { index, dt_s }
    }

    pub fn first() -> Self {
        Self::new(0, Self::DEFAULT_DT_S)
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.dt_s)
    }

    /// Nominal time since the first frame.
    pub fn elapsed_s(&self) -> f64 {
        self.index as f64 * self.dt_s
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;

    #[test]
    fn first_frame_runs_at_sixty_hertz() {
        let f = Frame::first();
        assert_eq!(f.index, 0);
        assert_eq!(f.elapsed_s(), 0.0);
        assert!((f.dt_s - 1.0 / 60.0).abs() < 1e-15);
    }

    #[test]
    fn next_keeps_the_step_and_advances_elapsed() {
        let f = Frame::new(0, 0.5).next().next();
        assert_eq!(f.index, 2);
        assert_eq!(f.dt_s, 0.5);
        assert_eq!(f.elapsed_s(), 1.0);
    }
}
