//! Pointer-to-scene resolution: hover probing and press handling.

use foundation::ids::TripId;
use foundation::math::{GeoCoordinate, PerspectiveCamera, Ray, Vec2, Viewport};
use runtime::{Frame, FrameCadence};
use scene::SceneGraph;
use scene::picking::{pick_pins, pick_surface};
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::interaction::InteractionMode;

/// Cursor the host should show over the globe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorHint {
    #[default]
    Default,
    Pointer,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HoverState {
    pub trip_id: Option<TripId>,
}

/// Emitted when the hovered pin changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverChange {
    pub hovered: Option<TripId>,
    /// Set only when the cursor hint flipped as well.
    pub cursor: Option<CursorHint>,
}

/// What a pointer press resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum PressOutcome {
    Selected(TripId),
    LocationPicked(GeoCoordinate),
    Nothing,
}

/// Everything a ray cast needs for one frame.
#[derive(Debug, Copy, Clone)]
pub struct PickContext<'a> {
    pub scene: &'a SceneGraph,
    pub camera: &'a PerspectiveCamera,
    pub viewport: Viewport,
}

impl PickContext<'_> {
    fn ray_at(&self, at: Vec2) -> Option<Ray> {
        let ndc = self.viewport.pixel_to_ndc(at)?;
        Some(self.camera.ray_through_ndc(ndc))
    }
}

#[derive(Debug, Clone)]
pub struct PickingEngine {
    cadence: FrameCadence,
    hover: HoverState,
    pointer: Option<Vec2>,
    /// Pointer moved since the last hover probe.
    moved: bool,
}

impl PickingEngine {
    pub fn new(hover_probe_interval: u32) -> Self {
        Self {
            cadence: FrameCadence::every(hover_probe_interval),
            hover: HoverState::default(),
            pointer: None,
            moved: false,
        }
    }

    pub fn hover(&self) -> &HoverState {
        &self.hover
    }

    pub fn hovered(&self) -> Option<&TripId> {
        self.hover.trip_id.as_ref()
    }

    pub fn cursor(&self) -> CursorHint {
        cursor_for(self.hover.trip_id.is_some())
    }

    pub fn cadence(&self) -> FrameCadence {
        self.cadence
    }

    pub fn pointer_moved(&mut self, at: Vec2) {
        self.pointer = Some(at);
        self.moved = true;
    }

    /// Throttled hover update.
    ///
    /// Runs only in normal mode, while not dragging, after the pointer moved,
    /// and on frames the cadence allows.
    pub fn probe_hover(
        &mut self,
        frame: Frame,
        mode: InteractionMode,
        dragging: bool,
        ctx: &PickContext<'_>,
    ) -> Option<HoverChange> {
        if mode != InteractionMode::Normal || dragging || !self.moved {
            return None;
        }
        if !self.cadence.is_due(frame) {
            return None;
        }
        let at = self.pointer?;
        self.moved = false;
        trace!(frame = frame.index, x = at.x, y = at.y, "hover probe");
        self.resolve_hover(at, ctx)
    }

    fn resolve_hover(&mut self, at: Vec2, ctx: &PickContext<'_>) -> Option<HoverChange> {
        let hit = ctx
            .ray_at(at)
            .and_then(|ray| pick_pins(ctx.scene, ray))
            .map(|hit| hit.trip_id);
        self.set_hover(hit)
    }

    fn set_hover(&mut self, trip_id: Option<TripId>) -> Option<HoverChange> {
        if self.hover.trip_id == trip_id {
            return None;
        }
        let was_pointer = self.hover.trip_id.is_some();
        let is_pointer = trip_id.is_some();
        debug!(hovered = ?trip_id, "hover changed");
        self.hover.trip_id = trip_id.clone();
        Some(HoverChange {
            hovered: trip_id,
            cursor: (was_pointer != is_pointer).then(|| cursor_for(is_pointer)),
        })
    }

    /// Drops the hover, e.g. when entering picking mode or after a rebuild
    /// removed the hovered pin.
    pub fn clear_hover(&mut self) -> Option<HoverChange> {
        self.set_hover(None)
    }

    /// Resolves a press.
    ///
    /// In normal mode the hover is refreshed at the press position first, so
    /// a press right after a fast move is not lost to the probe throttle. In
    /// picking mode only the globe surface is tested.
    pub fn pointer_down(
        &mut self,
        at: Vec2,
        mode: InteractionMode,
        ctx: &PickContext<'_>,
    ) -> (PressOutcome, Option<HoverChange>) {
        self.pointer = Some(at);
        match mode {
            InteractionMode::Normal => {
                self.moved = false;
                let change = self.resolve_hover(at, ctx);
                let outcome = match self.hovered() {
                    Some(id) => {
                        info!(trip = %id, "trip selected");
                        PressOutcome::Selected(id.clone())
                    }
                    None => PressOutcome::Nothing,
                };
                (outcome, change)
            }
            InteractionMode::Picking => {
                if self.hover.trip_id.is_some() {
                    return (PressOutcome::Nothing, None);
                }
                let outcome = match ctx.ray_at(at).and_then(|ray| pick_surface(ctx.scene, ray)) {
                    Some(hit) => {
                        info!(
                            lat = hit.coordinate.lat,
                            lng = hit.coordinate.lng,
                            "location picked"
                        );
                        PressOutcome::LocationPicked(hit.coordinate)
                    }
                    None => PressOutcome::Nothing,
                };
                (outcome, None)
            }
        }
    }
}

fn cursor_for(hovering: bool) -> CursorHint {
    if hovering {
        CursorHint::Pointer
    } else {
        CursorHint::Default
    }
}
