//! The hero canvas: a slowly spinning wireframe icosphere with a 3D text
//! label, tilted toward the pointer.
//!
//! [`HeroEffect::activate`] returns the only handle to a running instance.
//! Deactivation is idempotent, and dropping the handle deactivates.

pub mod font;
pub mod render;
pub mod scene;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::Vec3;
use log::{debug, warn};

use self::font::Typeface;
use self::render::{LineMaterial, RenderContext, Surface};
use self::scene::{Scene, SceneNode, LABEL};
use crate::config::HeroConfig;
use crate::error::{FxError, FxResult};
use crate::host::{EventKind, FrameCallback, FrameHandle, Host, HostEvent, ListenerSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeroStatus {
    Running,
    Paused,
    /// The rendering context was lost; no more frames will be drawn.
    Stopped,
    Released,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Motion {
    target: [f64; 2],
    current: [f64; 2],
    spin: [f64; 2],
}

impl Motion {
    fn step(&mut self, damping: f64, spin: [f64; 2]) {
        for axis in 0..2 {
            self.current[axis] += (self.target[axis] - self.current[axis]) * damping;
            self.spin[axis] += spin[axis];
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PauseReasons {
    slide_hidden: bool,
    page_hidden: bool,
}

impl PauseReasons {
    fn any(&self) -> bool {
        self.slide_hidden || self.page_hidden
    }
}

struct HeroState {
    host: Rc<dyn Host>,
    surface: Rc<dyn Surface>,
    config: HeroConfig,
    context: Option<Box<dyn RenderContext>>,
    scene: Scene,
    motion: Motion,
    pause: PauseReasons,
    status: HeroStatus,
    started_at: f64,
    frames_rendered: u64,
    pending_frame: Option<FrameHandle>,
    frame_callback: Option<FrameCallback>,
    listeners: ListenerSet,
}

impl HeroState {
    fn schedule(&mut self) {
        if self.status != HeroStatus::Running || self.pending_frame.is_some() {
            return;
        }
        if let Some(callback) = self.frame_callback.clone() {
            self.pending_frame = Some(self.host.request_frame(callback));
        }
    }

    fn unschedule(&mut self) {
        if let Some(frame) = self.pending_frame.take() {
            self.host.cancel_frame(frame);
        }
    }

    fn on_frame(&mut self, ts: f64) {
        self.pending_frame = None;
        if self.status != HeroStatus::Running {
            return;
        }
        let lost = self.context.as_ref().map_or(true, |ctx| ctx.is_context_lost());
        if lost {
            warn!("hero: rendering context lost on {}, stopping", self.surface.label());
            self.status = HeroStatus::Stopped;
            return;
        }

        self.motion.step(self.config.damping, self.config.spin);
        let elapsed = (ts - self.started_at).max(0.0) / 1000.0;
        let float = (elapsed * self.config.float_speed).sin() * self.config.float_amplitude;
        let motion = self.motion;
        if let Some(rig) = self.scene.rig_mut() {
            rig.transform.rotation = Vec3::new(
                (motion.spin[0] + motion.current[0]) as f32,
                (motion.spin[1] + motion.current[1]) as f32,
                0.0,
            );
            rig.transform.position.y = float as f32;
        }

        let items = self.scene.draw_list();
        if let Some(ctx) = self.context.as_mut() {
            match ctx.render(&items) {
                Ok(()) => self.frames_rendered += 1,
                Err(FxError::ContextLost) => {
                    warn!("hero: context lost while rendering, stopping");
                    self.status = HeroStatus::Stopped;
                    return;
                }
                Err(e) => debug!("hero: frame skipped: {e}"),
            }
        }
        self.schedule();
    }

    fn on_event(&mut self, event: &HostEvent) {
        if self.status == HeroStatus::Released {
            return;
        }
        match *event {
            HostEvent::PointerMove { x, y } => {
                let viewport = self.host.viewport();
                if viewport.width <= 0.0 || viewport.height <= 0.0 {
                    return;
                }
                let nx = (x / viewport.width) * 2.0 - 1.0;
                let ny = (y / viewport.height) * 2.0 - 1.0;
                let tilt = self.config.max_tilt;
                self.motion.target = [ny.clamp(-1.0, 1.0) * tilt, nx.clamp(-1.0, 1.0) * tilt];
            }
            HostEvent::Resize { width, height } => {
                let ratio = self.host.viewport().pixel_ratio.min(self.config.max_pixel_ratio);
                if let Some(ctx) = self.context.as_mut() {
                    ctx.set_size(width, height, ratio);
                }
                if height > 0.0 {
                    self.scene.camera.aspect = (width / height) as f32;
                }
            }
            HostEvent::SlideChanged { index } => {
                self.pause.slide_hidden = index != self.config.slide_index;
                self.apply_pause();
            }
            HostEvent::Visibility { visible } => {
                self.pause.page_hidden = !visible;
                self.apply_pause();
            }
            _ => {}
        }
    }

    fn apply_pause(&mut self) {
        match (self.status, self.pause.any()) {
            (HeroStatus::Running, true) => {
                self.status = HeroStatus::Paused;
                self.unschedule();
                debug!("hero: paused");
            }
            (HeroStatus::Paused, false) => {
                self.status = HeroStatus::Running;
                self.schedule();
                debug!("hero: resumed");
            }
            _ => {}
        }
    }

    fn attach_label(&mut self, json: &str) -> FxResult<()> {
        let label = &self.config.label;
        let geometry = Typeface::parse(json)?.layout(
            &label.text,
            label.size,
            label.depth,
            label.curve_segments,
        )?;
        if geometry.is_empty() {
            return Ok(());
        }
        let material = LineMaterial::from_hex(label.color, label.opacity);
        let offset = Vec3::from_array(label.offset);
        let ctx = self.context.as_mut().ok_or(FxError::ContextLost)?;
        let mesh = scene::upload(ctx.as_mut(), &geometry, &material)?;
        let mut node = SceneNode::mesh(LABEL, mesh);
        node.transform.position = offset;
        match self.scene.rig_mut() {
            Some(rig) => rig.children.push(node),
            None => self.scene.root.children.push(node),
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.status == HeroStatus::Released {
            return;
        }
        self.status = HeroStatus::Released;
        self.unschedule();
        self.frame_callback = None;
        self.listeners.clear();

        if let Some(mut ctx) = self.context.take() {
            let mut failures = Vec::new();
            self.scene.root.release(ctx.as_mut(), &mut failures);
            if let Err(e) = ctx.dispose() {
                failures.push(format!("context: {e}"));
            }
            for failure in failures {
                debug!("hero: ignored release failure: {failure}");
            }
        }
        self.surface.release_claim();
        debug!("hero: released {}", self.surface.label());
    }
}

/// A live hero instance. Owns the surface claim, the GPU resources, the
/// frame request and every listener it registered.
pub struct HeroEffect {
    state: Rc<RefCell<HeroState>>,
}

impl HeroEffect {
    /// Start the hero on `surface`. Every failure is logged as a warning and
    /// leaves the surface untouched.
    pub fn activate(
        host: Rc<dyn Host>,
        surface: Rc<dyn Surface>,
        config: HeroConfig,
    ) -> FxResult<Self> {
        Self::try_activate(host, surface, config).inspect_err(|e| warn!("hero disabled: {e}"))
    }

    fn try_activate(
        host: Rc<dyn Host>,
        surface: Rc<dyn Surface>,
        config: HeroConfig,
    ) -> FxResult<Self> {
        let viewport = host.viewport();
        if viewport.width < config.min_viewport_width {
            return Err(FxError::ViewportTooNarrow {
                width: viewport.width,
                min: config.min_viewport_width,
            });
        }
        if !surface.try_claim() {
            return Err(FxError::SurfaceBusy(surface.label()));
        }

        let mut context = match surface.create_context() {
            Ok(ctx) => ctx,
            Err(e) => {
                surface.release_claim();
                return Err(e);
            }
        };
        let ratio = viewport.pixel_ratio.min(config.max_pixel_ratio);
        context.set_size(viewport.width, viewport.height, ratio);
        let aspect = if viewport.height > 0.0 {
            (viewport.width / viewport.height) as f32
        } else {
            1.0
        };
        let scene = match Scene::build(&config, aspect, context.as_mut()) {
            Ok(scene) => scene,
            Err(e) => {
                let _ = context.dispose();
                surface.release_claim();
                return Err(e);
            }
        };

        let font_url = config.label.font_url.clone();
        let state = Rc::new(RefCell::new(HeroState {
            host: host.clone(),
            surface,
            config,
            context: Some(context),
            scene,
            motion: Motion::default(),
            pause: PauseReasons::default(),
            status: HeroStatus::Running,
            started_at: host.now(),
            frames_rendered: 0,
            pending_frame: None,
            frame_callback: None,
            listeners: ListenerSet::new(),
        }));

        let weak = Rc::downgrade(&state);
        let frame_callback: FrameCallback = Rc::new(move |ts| {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().on_frame(ts);
            }
        });

        let mut listeners = ListenerSet::new();
        for kind in [
            EventKind::PointerMove,
            EventKind::Resize,
            EventKind::SlideChanged,
            EventKind::Visibility,
        ] {
            let weak = Rc::downgrade(&state);
            listeners.push(host.listen(
                kind,
                Rc::new(move |event| {
                    if let Some(state) = weak.upgrade() {
                        state.borrow_mut().on_event(event);
                    }
                }),
            ));
        }

        {
            let mut s = state.borrow_mut();
            s.frame_callback = Some(frame_callback);
            s.listeners = listeners;
            s.schedule();
        }

        if !font_url.is_empty() {
            let weak: Weak<RefCell<HeroState>> = Rc::downgrade(&state);
            host.fetch_text(
                &font_url,
                Box::new(move |result| {
                    let Some(state) = weak.upgrade() else {
                        debug!("hero: font arrived after teardown, dropped");
                        return;
                    };
                    let mut state = state.borrow_mut();
                    if state.status == HeroStatus::Released {
                        debug!("hero: font arrived after teardown, dropped");
                        return;
                    }
                    match result.and_then(|json| state.attach_label(&json)) {
                        Ok(()) => debug!("hero: label attached"),
                        Err(e) => warn!("hero: label unavailable: {e}"),
                    }
                }),
            );
        }

        debug!("hero: activated on {}", state.borrow().surface.label());
        Ok(Self { state })
    }

    /// Tear everything down. Safe to call any number of times.
    pub fn deactivate(&self) {
        self.state.borrow_mut().release();
    }

    pub fn status(&self) -> HeroStatus {
        self.state.borrow().status
    }

    pub fn is_active(&self) -> bool {
        self.status() != HeroStatus::Released
    }

    pub fn has_label(&self) -> bool {
        self.state.borrow_mut().scene.root.find_mut(LABEL).is_some()
    }

    /// Geometry plus material handles currently held on the GPU.
    pub fn resource_count(&self) -> usize {
        self.state.borrow().scene.resource_count()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.state.borrow().frames_rendered
    }

    /// Current (damped) pointer rotation around x and y.
    pub fn rotation(&self) -> [f64; 2] {
        self.state.borrow().motion.current
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

impl Drop for HeroEffect {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damping_converges_geometrically() {
        let mut motion = Motion {
            target: [1.0, -1.0],
            ..Motion::default()
        };
        motion.step(0.5, [0.0, 0.0]);
        assert_eq!(motion.current, [0.5, -0.5]);
        motion.step(0.5, [0.0, 0.0]);
        assert_eq!(motion.current, [0.75, -0.75]);
    }

    #[test]
    fn spin_accumulates_per_frame() {
        let mut motion = Motion::default();
        for _ in 0..10 {
            motion.step(0.05, [0.003, 0.004]);
        }
        assert!((motion.spin[0] - 0.03).abs() < 1e-12);
        assert!((motion.spin[1] - 0.04).abs() < 1e-12);
    }
}
