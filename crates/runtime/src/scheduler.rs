use tracing::trace;

/// Identifier of a requested display-refresh callback.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(pub u64);

/// The host's vsync hook.
///
/// The loop asks for exactly one callback at a time and cancels it on
/// teardown; a host must not deliver a cancelled request.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameRequestId;
    fn cancel_frame(&mut self, id: FrameRequestId);
}

/// Host-driven scheduler for headless runs and tests.
///
/// Requests queue up until the host calls [`ManualScheduler::fire`].
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    pending: Vec<FrameRequestId>,
    cancelled: Vec<FrameRequestId>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[FrameRequestId] {
        &self.pending
    }

    pub fn cancelled(&self) -> &[FrameRequestId] {
        &self.cancelled
    }

    /// Pops the oldest pending request, as a vsync would.
    pub fn fire(&mut self) -> Option<FrameRequestId> {
        if self.pending.is_empty() {
            return None;
        }
        Some(self.pending.remove(0))
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameRequestId {
        let id = FrameRequestId(self.next_id);
        self.next_id += 1;
        self.pending.push(id);
        trace!(id = id.0, "frame requested");
        id
    }

    fn cancel_frame(&mut self, id: FrameRequestId) {
        let before = self.pending.len();
        self.pending.retain(|p| *p != id);
        if self.pending.len() != before {
            self.cancelled.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameScheduler, ManualScheduler};

    #[test]
    fn fires_in_request_order() {
        let mut s = ManualScheduler::new();
        let a = s.request_frame();
        let b = s.request_frame();
        assert_eq!(s.fire(), Some(a));
        assert_eq!(s.fire(), Some(b));
        assert_eq!(s.fire(), None);
    }

    #[test]
    fn cancelled_request_never_fires() {
        let mut s = ManualScheduler::new();
        let a = s.request_frame();
        s.cancel_frame(a);
        assert_eq!(s.fire(), None);
        assert_eq!(s.cancelled(), &[a]);
    }

    #[test]
    fn cancelling_a_fired_request_is_a_no_op() {
        let mut s = ManualScheduler::new();
        let a = s.request_frame();
        assert_eq!(s.fire(), Some(a));
        s.cancel_frame(a);
        assert!(s.cancelled().is_empty());
    }
}
