//! The frame loop.
//!
//! One [`GlobeEngine`] owns the scene, renderer, camera and picking state and
//! advances them together from a single vsync callback. Collaborators write
//! inputs at any time; the loop applies them at the start of the next tick
//! and reports outputs through [`GlobeEngine::drain_events`].

use std::collections::VecDeque;

use foundation::ids::TripId;
use foundation::math::{GeoCoordinate, PerspectiveCamera, Vec2, Viewport};
use gpu::{RenderDevice, Renderer, ResourceCounts, TextureInbox, TextureLoader, TextureRequest, TextureSlot};
use runtime::{Event, EventBus, Frame, FrameRequestId, FrameScheduler, Observable, Watcher};
use scene::{SceneGraph, Trip};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::camera::{CameraController, FlyToProgress};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::input::PointerEvent;
use crate::interaction::{InteractionController, InteractionMode};
use crate::picker::{CursorHint, HoverChange, PickContext, PickingEngine, PressOutcome};
use crate::tooltip::{TooltipProjector, TooltipState};

/// Outputs for collaborators, in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GlobeEvent {
    TripSelected { trip_id: TripId },
    LocationPicked { coordinate: GeoCoordinate },
    HoverChanged { trip_id: Option<TripId> },
    CursorChanged { cursor: CursorHint },
}

/// What teardown released and cut off.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub buffers_released: usize,
    pub textures_released: usize,
    pub programs_released: usize,
    /// A frame callback was pending and got cancelled.
    pub frame_cancelled: bool,
    /// Pointer events buffered but never applied.
    pub pointer_events_discarded: usize,
}

pub struct GlobeEngine<D: RenderDevice, S: FrameScheduler> {
    device: D,
    scheduler: S,
    scene: SceneGraph,
    renderer: Renderer,
    camera: CameraController,
    interaction: InteractionController,
    picker: PickingEngine,
    tooltip: TooltipProjector,
    viewport: Viewport,

    trips: Observable<Vec<Trip>>,
    trips_seen: Watcher,
    selection: Observable<Option<TripId>>,
    selection_seen: Watcher,
    picking_mode: Observable<InteractionMode>,
    picking_mode_seen: Watcher,
    pointer_queue: VecDeque<PointerEvent>,

    textures: TextureInbox,
    events: EventBus<GlobeEvent>,
    frame: Frame,
    pending_frame: Option<FrameRequestId>,
}

impl<D: RenderDevice, S: FrameScheduler> GlobeEngine<D, S> {
    /// Builds the scene and its GPU resources, starts loading the configured
    /// surface textures and requests the first frame.
    ///
    /// Until a texture arrives the globe draws with its plain material.
    pub fn new(
        config: EngineConfig,
        mut device: D,
        mut scheduler: S,
        loader: &mut dyn TextureLoader,
        width: u32,
        height: u32,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let scene = SceneGraph::new(&config.globe_settings(), config.pin_style());
        device.resize(width, height);
        let renderer = Renderer::new(&mut device, &scene)?;

        let textures = TextureInbox::new();
        let sources = [
            (TextureSlot::Albedo, &config.textures.albedo),
            (TextureSlot::Roughness, &config.textures.roughness),
            (TextureSlot::Normal, &config.textures.normal),
        ];
        for (slot, path) in sources {
            if let Some(path) = path {
                loader.load(
                    TextureRequest {
                        slot,
                        path: path.clone(),
                    },
                    textures.completion(slot),
                );
            }
        }

        let pending_frame = Some(scheduler.request_frame());
        info!(
            width,
            height,
            sphere_radius = config.globe.sphere_radius,
            "globe engine started"
        );

        Ok(Self {
            device,
            scheduler,
            camera: CameraController::from_config(&config),
            picker: PickingEngine::new(config.picking.hover_probe_interval),
            scene,
            renderer,
            interaction: InteractionController::default(),
            tooltip: TooltipProjector::new(),
            viewport: Viewport::new(f64::from(width), f64::from(height)),
            trips: Observable::new(Vec::new()),
            trips_seen: Watcher::new(),
            selection: Observable::new(None),
            selection_seen: Watcher::new(),
            picking_mode: Observable::new(InteractionMode::Normal),
            picking_mode_seen: Watcher::new(),
            pointer_queue: VecDeque::new(),
            textures,
            events: EventBus::new(),
            frame: Frame::first(),
            pending_frame,
        })
    }

    /// Replaces the trip list. Pins are rebuilt on the next tick even if the
    /// new list compares equal to the old one.
    pub fn set_trips(&mut self, trips: Vec<Trip>) {
        self.trips.replace(trips);
    }

    /// A new non-null selection flies the camera to that trip. Clearing the
    /// selection leaves the camera where it is.
    pub fn set_selected_trip(&mut self, trip_id: Option<TripId>) {
        self.selection.set(trip_id);
    }

    pub fn set_picking_mode(&mut self, picking: bool) {
        self.picking_mode.set(if picking {
            InteractionMode::Picking
        } else {
            InteractionMode::Normal
        });
    }

    pub fn push_pointer(&mut self, event: PointerEvent) {
        self.pointer_queue.push_back(event);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(f64::from(width), f64::from(height));
        self.device.resize(width, height);
        debug!(width, height, "viewport resized");
    }

    pub fn zoom_in(&mut self) {
        self.camera.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.camera.zoom_out();
    }

    /// Vsync entry point. Runs one tick and requests the next frame.
    ///
    /// Returns `false` for a callback that is not the pending request; such
    /// a callback does nothing.
    pub fn on_frame(&mut self, id: FrameRequestId) -> bool {
        if self.pending_frame != Some(id) {
            debug!(id = id.0, pending = ?self.pending_frame.map(|p| p.0), "ignoring stale frame callback");
            return false;
        }
        self.pending_frame = None;
        self.tick();
        self.pending_frame = Some(self.scheduler.request_frame());
        true
    }

    fn tick(&mut self) {
        let frame = self.frame;
        trace!(frame = frame.index, elapsed_s = frame.elapsed_s(), "tick");

        self.apply_textures();
        self.apply_inputs(frame);
        self.apply_pointer_events(frame);

        self.camera.update_orbit();
        if let FlyToProgress::Arrived = self.camera.advance_fly_to() {
            debug!(frame = frame.index, "camera settled");
        }

        let camera = self.camera.perspective_camera(self.viewport);
        if let Some(camera) = &camera {
            let ctx = PickContext {
                scene: &self.scene,
                camera,
                viewport: self.viewport,
            };
            let change = self.picker.probe_hover(
                frame,
                self.interaction.mode(),
                self.camera.is_dragging(),
                &ctx,
            );
            emit_hover(&mut self.events, frame, change);
        }

        let hovered = self.picker.hovered().and_then(|id| self.scene.pin(id));
        self.tooltip.update(
            hovered,
            camera.as_ref(),
            self.viewport,
            self.scene.sphere_radius(),
            self.camera.is_dragging(),
        );

        if let Some(camera) = &camera {
            if let Err(err) = self.renderer.draw(&mut self.device, camera, &self.scene) {
                warn!(frame = frame.index, error = %err, "draw failed");
            }
        }

        self.frame = frame.next();
    }

    fn apply_textures(&mut self) {
        for message in self.textures.drain() {
            match message.result {
                Ok(texture) => {
                    if let Err(err) = self
                        .renderer
                        .apply_texture(&mut self.device, message.slot, &texture)
                    {
                        warn!(slot = ?message.slot, error = %err, "texture upload failed; keeping placeholder");
                    }
                }
                Err(err) => {
                    warn!(slot = ?message.slot, error = %err, "texture load failed; keeping placeholder");
                }
            }
        }
    }

    /// Trips before selection, so a selection may name a trip added in the
    /// same frame.
    fn apply_inputs(&mut self, frame: Frame) {
        if let Some(trips) = self.trips_seen.poll(&self.trips) {
            self.scene.rebuild_pins(trips);
            let hovered_gone = self
                .picker
                .hovered()
                .is_some_and(|id| self.scene.pin(id).is_none());
            if hovered_gone {
                let change = self.picker.clear_hover();
                emit_hover(&mut self.events, frame, change);
            }
        }

        if let Some(selected) = self.selection_seen.poll(&self.selection) {
            match selected {
                Some(id) => match self.scene.pin(id) {
                    Some(pin) => {
                        self.camera.fly_to(pin.coordinate);
                    }
                    None => warn!(trip = %id, "selected trip has no pin; not flying"),
                },
                None => debug!("selection cleared"),
            }
        }

        if let Some(&mode) = self.picking_mode_seen.poll(&self.picking_mode) {
            if self.interaction.set_mode(mode) && mode == InteractionMode::Picking {
                let change = self.picker.clear_hover();
                emit_hover(&mut self.events, frame, change);
            }
        }
    }

    fn apply_pointer_events(&mut self, frame: Frame) {
        let camera = self.camera.perspective_camera(self.viewport);
        while let Some(event) = self.pointer_queue.pop_front() {
            match event {
                PointerEvent::Down { at } => {
                    if let Some(camera) = &camera {
                        self.press(frame, at, camera);
                    }
                    self.camera.pointer_down(at);
                }
                PointerEvent::Move { at } => {
                    self.camera.pointer_move(at, self.viewport);
                    self.picker.pointer_moved(at);
                }
                PointerEvent::Up { .. } => self.camera.pointer_up(),
                PointerEvent::Wheel { delta_y, .. } => self.camera.wheel(delta_y),
            }
        }
    }

    fn press(&mut self, frame: Frame, at: Vec2, camera: &PerspectiveCamera) {
        let ctx = PickContext {
            scene: &self.scene,
            camera,
            viewport: self.viewport,
        };
        let (outcome, change) = self.picker.pointer_down(at, self.interaction.mode(), &ctx);
        emit_hover(&mut self.events, frame, change);
        match outcome {
            PressOutcome::Selected(trip_id) => {
                self.camera.disable_auto_rotate();
                self.events.emit(frame, GlobeEvent::TripSelected { trip_id });
            }
            PressOutcome::LocationPicked(coordinate) => {
                self.events.emit(frame, GlobeEvent::LocationPicked { coordinate });
            }
            PressOutcome::Nothing => {}
        }
    }

    pub fn drain_events(&mut self) -> Vec<Event<GlobeEvent>> {
        self.events.drain()
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Hosts deliver vsync through the scheduler they handed in.
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn pending_frame(&self) -> Option<FrameRequestId> {
        self.pending_frame
    }

    /// Index of the next frame to run.
    pub fn frame_index(&self) -> u64 {
        self.frame.index
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn interaction_mode(&self) -> InteractionMode {
        self.interaction.mode()
    }

    pub fn overlay_visible(&self) -> bool {
        self.interaction.overlay_visible()
    }

    pub fn hovered_trip(&self) -> Option<&TripId> {
        self.picker.hovered()
    }

    pub fn cursor(&self) -> CursorHint {
        self.picker.cursor()
    }

    pub fn tooltip(&self) -> &TooltipState {
        self.tooltip.state()
    }

    pub fn selected_trip(&self) -> Option<&TripId> {
        self.selection.get().as_ref()
    }

    /// Stops the loop and frees everything the engine put on the device.
    ///
    /// Order: cancel the pending frame, drop buffered input, cancel texture
    /// deliveries, then release GPU objects. The device and scheduler are
    /// handed back to the host.
    pub fn teardown(mut self) -> (TeardownReport, D, S) {
        let mut report = TeardownReport::default();

        if let Some(id) = self.pending_frame.take() {
            self.scheduler.cancel_frame(id);
            report.frame_cancelled = true;
        }
        report.pointer_events_discarded = self.pointer_queue.len();
        self.pointer_queue.clear();
        self.textures.cancel();

        let before = self.device.live_resources();
        if let Err(err) = self.renderer.release(&mut self.device) {
            warn!(error = %err, "releasing GPU resources failed part way");
        }
        let released = diff_counts(before, self.device.live_resources());
        report.buffers_released = released.buffers;
        report.textures_released = released.textures;
        report.programs_released = released.programs;

        info!(?report, "globe engine torn down");
        (report, self.device, self.scheduler)
    }
}

fn diff_counts(before: ResourceCounts, after: ResourceCounts) -> ResourceCounts {
    ResourceCounts {
        buffers: before.buffers.saturating_sub(after.buffers),
        textures: before.textures.saturating_sub(after.textures),
        programs: before.programs.saturating_sub(after.programs),
    }
}

fn emit_hover(events: &mut EventBus<GlobeEvent>, frame: Frame, change: Option<HoverChange>) {
    let Some(change) = change else {
        return;
    };
    events.emit(
        frame,
        GlobeEvent::HoverChanged {
            trip_id: change.hovered,
        },
    );
    if let Some(cursor) = change.cursor {
        events.emit(frame, GlobeEvent::CursorChanged { cursor });
    }
}
