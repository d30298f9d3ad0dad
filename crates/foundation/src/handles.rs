/// Generational handle: `(index, generation)`.
///
/// A slot reused after release gets a new generation, so a handle kept past
/// its object's lifetime never resolves to the replacement.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32, u32);

impl Handle {
    pub fn new(index: u32, generation: u32) -> Self {
        Handle(index, generation)
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    pub fn generation(&self) -> u32 {
        self.1
    }
}

/// Hands out handles and recycles released slots with a bumped generation.
#[derive(Debug, Default)]
pub struct HandleAllocator {
    generations: Vec<u32>,
    live: Vec<bool>,
    free: Vec<u32>,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> Handle {
        if let Some(index) = self.free.pop() {
            let i = index as usize;
            self.live[i] = true;
            return Handle::new(index, self.generations[i]);
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.live.push(true);
        Handle::new(index, 0)
    }

    /// Returns `false` for stale or already released handles.
    pub fn release(&mut self, handle: Handle) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        let i = handle.index() as usize;
        self.live[i] = false;
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.free.push(handle.index());
        true
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        let i = handle.index() as usize;
        self.live.get(i).copied().unwrap_or(false) && self.generations[i] == handle.generation()
    }

    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|l| **l).count()
    }
}

#[cfg(test)]
mod tests {
    use super::HandleAllocator;

    #[test]
    fn released_slot_is_reused_with_new_generation() {
        let mut alloc = HandleAllocator::new();
        let a = alloc.allocate();
        assert!(alloc.release(a));
        let b = alloc.allocate();
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(!alloc.is_live(a));
        assert!(alloc.is_live(b));
    }

    #[test]
    fn double_release_is_rejected() {
        let mut alloc = HandleAllocator::new();
        let a = alloc.allocate();
        let _b = alloc.allocate();
        assert!(alloc.release(a));
        assert!(!alloc.release(a));
        assert_eq!(alloc.live_count(), 1);
    }
}
