use std::collections::{HashMap, HashSet};

use foundation::handles::HandleAllocator;
use foundation::ids::TripId;
use tracing::{debug, warn};

use crate::pins::{PartHandle, PinMarker, PinPartKind, PinStyle};
use crate::prefabs::{GlobePrefab, GlobeSettings};
use crate::spatial::{Bvh, PinVolume};
use crate::trip::Trip;

/// Outcome of a pin rebuild.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PinRebuild {
    pub removed: usize,
    pub added: usize,
    /// Trips skipped because an earlier trip had the same id.
    pub duplicates: usize,
}

/// CPU-side scene: the globe prefab plus one marker per trip.
///
/// Every part of every marker is registered in a part index so a ray hit on
/// any of them resolves back to its trip.
#[derive(Debug)]
pub struct SceneGraph {
    globe: GlobePrefab,
    pin_style: PinStyle,
    pins: Vec<PinMarker>,
    part_index: HashMap<PartHandle, usize>,
    handles: HandleAllocator,
    bvh: Bvh,
    pin_revision: u64,
}

impl SceneGraph {
    pub fn new(settings: &GlobeSettings, pin_style: PinStyle) -> Self {
        Self {
            globe: GlobePrefab::build(settings),
            pin_style,
            pins: Vec::new(),
            part_index: HashMap::new(),
            handles: HandleAllocator::new(),
            bvh: Bvh::empty(),
            pin_revision: 0,
        }
    }

    pub fn globe(&self) -> &GlobePrefab {
        &self.globe
    }

    pub fn sphere_radius(&self) -> f64 {
        self.globe.radius
    }

    pub fn pin_style(&self) -> &PinStyle {
        &self.pin_style
    }

    /// Replaces every marker with one per distinct trip id.
    ///
    /// Old part handles are released before new ones are allocated, so a
    /// handle from a previous generation never resolves again.
    pub fn rebuild_pins(&mut self, trips: &[Trip]) -> PinRebuild {
        let removed = self.pins.len();
        for pin in self.pins.drain(..) {
            for part in pin.parts {
                self.handles.release(part.handle.0);
            }
        }
        self.part_index.clear();

        let mut seen: HashSet<&TripId> = HashSet::with_capacity(trips.len());
        let mut duplicates = 0;
        for trip in trips {
            if !seen.insert(&trip.id) {
                warn!(trip_id = %trip.id, "duplicate trip id; keeping the first");
                duplicates += 1;
                continue;
            }

            let handles = [
                PartHandle(self.handles.allocate()),
                PartHandle(self.handles.allocate()),
                PartHandle(self.handles.allocate()),
            ];
            let slot = self.pins.len();
            for handle in handles {
                self.part_index.insert(handle, slot);
            }
            self.pins.push(PinMarker::new(
                trip.id.clone(),
                trip.coordinates,
                self.globe.radius,
                &self.pin_style,
                handles,
            ));
        }

        let items = self
            .pins
            .iter()
            .map(|pin| PinVolume {
                part: pin.part(PinPartKind::HitTarget).handle,
                center: pin.position,
                radius: pin.radius,
            })
            .collect();
        self.bvh = Bvh::build(items);
        self.pin_revision += 1;

        let report = PinRebuild {
            removed,
            added: self.pins.len(),
            duplicates,
        };
        debug!(
            removed = report.removed,
            added = report.added,
            duplicates = report.duplicates,
            revision = self.pin_revision,
            live_parts = self.handles.live_count(),
            "rebuilt pins"
        );
        report
    }

    pub fn pins(&self) -> &[PinMarker] {
        &self.pins
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    pub fn pin(&self, trip_id: &TripId) -> Option<&PinMarker> {
        self.pins.iter().find(|pin| &pin.trip_id == trip_id)
    }

    /// Marker owning `part`, if the handle is from the current generation.
    pub fn pin_for_part(&self, part: PartHandle) -> Option<&PinMarker> {
        let slot = *self.part_index.get(&part)?;
        self.pins.get(slot)
    }

    pub fn resolve_part(&self, part: PartHandle) -> Option<&TripId> {
        self.pin_for_part(part).map(|pin| &pin.trip_id)
    }

    pub fn is_live_part(&self, part: PartHandle) -> bool {
        self.handles.is_live(part.0)
    }

    /// Bumped on every rebuild; consumers mirroring the pins compare against it.
    pub fn pin_revision(&self) -> u64 {
        self.pin_revision
    }

    pub(crate) fn pin_bvh(&self) -> &Bvh {
        &self.bvh
    }
}
