//! Explicit change dispatch for values fed into the engine from outside.
//!
//! A collaborator writes into an [`Observable`]; each consumer owns a
//! [`Watcher`] and polls it from the loop. A consumer sees every change at
//! most once and never sees a value it has already handled.

/// A value plus a revision counter that increases on every observed change.
#[derive(Debug, Clone, PartialEq)]
pub struct Observable<T> {
    value: T,
    revision: u64,
}

impl<T> Observable<T> {
    pub fn new(value: T) -> Self {
        Self { value, revision: 0 }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Stores `value` as a new identity, even if it compares equal.
    pub fn replace(&mut self, value: T) {
        self.value = value;
        self.revision += 1;
    }
}

impl<T: PartialEq> Observable<T> {
    /// Stores `value` only if it differs. Returns `true` on change.
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.replace(value);
        true
    }
}

/// Remembers the last revision a consumer handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Watcher {
    seen: u64,
}

impl Watcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value if it changed since the previous poll.
    pub fn poll<'a, T>(&mut self, observable: &'a Observable<T>) -> Option<&'a T> {
        if observable.revision() == self.seen {
            return None;
        }
        self.seen = observable.revision();
        Some(observable.get())
    }
}

#[cfg(test)]
mod tests {
    use super::{Observable, Watcher};

    #[test]
    fn watcher_sees_each_change_once() {
        let mut obs = Observable::new(0u32);
        let mut w = Watcher::new();
        assert_eq!(w.poll(&obs), None);

        assert!(obs.set(5));
        assert_eq!(w.poll(&obs), Some(&5));
        assert_eq!(w.poll(&obs), None);
    }

    #[test]
    fn equal_set_is_not_a_change() {
        let mut obs = Observable::new(Some("a"));
        let mut w = Watcher::new();
        assert!(!obs.set(Some("a")));
        assert_eq!(w.poll(&obs), None);
    }

    #[test]
    fn replace_is_a_change_even_when_equal() {
        let mut obs = Observable::new(vec![1, 2]);
        let mut w = Watcher::new();
        obs.replace(vec![1, 2]);
        assert_eq!(w.poll(&obs), Some(&vec![1, 2]));
    }

    #[test]
    fn coalesces_multiple_writes_between_polls() {
        let mut obs = Observable::new(0);
        let mut w = Watcher::new();
        obs.set(1);
        obs.set(2);
        assert_eq!(w.poll(&obs), Some(&2));
        assert_eq!(w.poll(&obs), None);
    }
}
