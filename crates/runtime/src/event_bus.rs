use crate::frame::Frame;

/// Engine output tagged with the index of the frame that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    pub frame_index: u64,
    pub payload: E,
}

/// Outbox drained by whoever embeds the engine.
///
/// Emitters finish mutating engine state before they emit, so a drained
/// event never disagrees with the engine's readouts.
#[derive(Debug)]
pub struct EventBus<E> {
    queue: Vec<Event<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self { queue: Vec::new() }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, frame: Frame, payload: E) {
        self.queue.push(Event {
            frame_index: frame.index,
            payload,
        });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Everything emitted since the last drain, oldest first.
    pub fn drain(&mut self) -> Vec<Event<E>> {
        std::mem::take(&mut self.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, EventBus};
    use crate::frame::Frame;
    use pretty_assertions::assert_eq;

    #[test]
    fn drain_returns_in_emit_order_and_empties() {
        let mut bus = EventBus::new();
        let f = Frame::new(4, 0.1);
        bus.emit(f, "press");
        bus.emit(f.next(), "select");
        assert_eq!(bus.len(), 2);
        assert_eq!(
            bus.drain(),
            vec![
                Event { frame_index: 4, payload: "press" },
                Event { frame_index: 5, payload: "select" },
            ]
        );
        assert!(bus.is_empty());
        assert!(bus.drain().is_empty());
    }
}
