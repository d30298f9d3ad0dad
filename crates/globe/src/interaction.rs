use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a pointer press means.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// Hover highlights pins, a press selects the hovered one.
    #[default]
    Normal,
    /// A press on the globe reports the coordinate under the pointer.
    Picking,
}

/// Holds the externally set mode and derives the instruction overlay from it.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    mode: InteractionMode,
}

impl InteractionController {
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn is_picking(&self) -> bool {
        self.mode == InteractionMode::Picking
    }

    /// Returns `true` when the mode actually changed.
    pub fn set_mode(&mut self, mode: InteractionMode) -> bool {
        if self.mode == mode {
            return false;
        }
        debug!(from = ?self.mode, to = ?mode, "interaction mode changed");
        self.mode = mode;
        true
    }

    pub fn set_picking(&mut self, picking: bool) -> bool {
        self.set_mode(if picking {
            InteractionMode::Picking
        } else {
            InteractionMode::Normal
        })
    }

    /// The "click the globe to pick a location" hint.
    pub fn overlay_visible(&self) -> bool {
        self.is_picking()
    }
}
