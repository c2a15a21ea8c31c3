//! Property tweens on DOM elements, driven by the host frame scheduler.
//!
//! One [`Tweens`] engine exists per page runtime. It keeps exactly one frame
//! request outstanding while any tween is running and none otherwise.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dom::Dom;
use crate::ease::Ease;
use crate::host::{FrameCallback, FrameHandle, Host};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Prop {
    Opacity,
    Y,
    Scale,
    Rotate,
    Height,
}

/// A sparse set of animatable properties. `None` means "leave as is" in a
/// target state and "start from the current value" in a start state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Props {
    pub opacity: Option<f64>,
    /// Vertical translation in px.
    pub y: Option<f64>,
    pub scale: Option<f64>,
    /// Rotation in degrees.
    pub rotate: Option<f64>,
    /// Height in px.
    pub height: Option<f64>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opacity(mut self, v: f64) -> Self {
        self.opacity = Some(v);
        self
    }

    pub fn y(mut self, v: f64) -> Self {
        self.y = Some(v);
        self
    }

    pub fn scale(mut self, v: f64) -> Self {
        self.scale = Some(v);
        self
    }

    pub fn rotate(mut self, v: f64) -> Self {
        self.rotate = Some(v);
        self
    }

    pub fn height(mut self, v: f64) -> Self {
        self.height = Some(v);
        self
    }

    pub fn get(&self, prop: Prop) -> Option<f64> {
        match prop {
            Prop::Opacity => self.opacity,
            Prop::Y => self.y,
            Prop::Scale => self.scale,
            Prop::Rotate => self.rotate,
            Prop::Height => self.height,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Prop, f64)> + '_ {
        [Prop::Opacity, Prop::Y, Prop::Scale, Prop::Rotate, Prop::Height]
            .into_iter()
            .filter_map(|p| self.get(p).map(|v| (p, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// What an element currently looks like, as far as the engine knows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualState {
    pub opacity: f64,
    pub y: f64,
    pub scale: f64,
    pub rotate: f64,
    /// `None` while the element is at its natural height.
    pub height: Option<f64>,
}

impl Default for VisualState {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            y: 0.0,
            scale: 1.0,
            rotate: 0.0,
            height: None,
        }
    }
}

impl VisualState {
    fn get(&self, prop: Prop) -> f64 {
        match prop {
            Prop::Opacity => self.opacity,
            Prop::Y => self.y,
            Prop::Scale => self.scale,
            Prop::Rotate => self.rotate,
            Prop::Height => self.height.unwrap_or(0.0),
        }
    }

    fn set(&mut self, prop: Prop, v: f64) {
        match prop {
            Prop::Opacity => self.opacity = v,
            Prop::Y => self.y = v,
            Prop::Scale => self.scale = v,
            Prop::Rotate => self.rotate = v,
            Prop::Height => self.height = Some(v),
        }
    }

    pub fn transform(&self) -> String {
        format!(
            "translateY({}px) scale({}) rotate({}deg)",
            self.y, self.scale, self.rotate
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweenSpec {
    pub from: Props,
    pub to: Props,
    /// Seconds.
    pub duration: f64,
    /// Seconds before the tween starts.
    pub delay: f64,
    pub ease: Ease,
}

impl Default for TweenSpec {
    fn default() -> Self {
        Self {
            from: Props::default(),
            to: Props::default(),
            duration: 0.5,
            delay: 0.0,
            ease: Ease::Power2Out,
        }
    }
}

impl TweenSpec {
    pub fn to(to: Props, duration: f64, ease: Ease) -> Self {
        Self {
            to,
            duration,
            ease,
            ..Self::default()
        }
    }

    pub fn from_to(from: Props, to: Props, duration: f64, ease: Ease) -> Self {
        Self {
            from,
            to,
            duration,
            ease,
            ..Self::default()
        }
    }

    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }
}

/// Callbacks around a tween. Complete hooks run after the engine has
/// released its state, so they may start new tweens. Update hooks run
/// mid-tick and must not touch the engine.
#[derive(Default)]
pub struct TweenHooks {
    pub on_update: Option<Box<dyn FnMut(f64)>>,
    pub on_complete: Option<Box<dyn FnOnce()>>,
}

impl TweenHooks {
    pub fn on_update(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TweenId(u64);

struct Active<E> {
    id: TweenId,
    target: Option<E>,
    spec: TweenSpec,
    /// Scalar tween for counters: `(from, to)`, reported through `on_update`.
    value: Option<(f64, f64)>,
    start_at: f64,
    resolved_from: Option<Props>,
    hooks: TweenHooks,
}

struct Engine<D: Dom> {
    host: Rc<dyn Host>,
    dom: Rc<D>,
    active: Vec<Active<D::Element>>,
    states: Vec<(D::Element, VisualState)>,
    frame: Option<FrameHandle>,
    tick: Option<FrameCallback>,
    next_id: u64,
}

impl<D: Dom> Engine<D> {
    fn state(&self, el: &D::Element) -> VisualState {
        self.states
            .iter()
            .find(|(e, _)| e == el)
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }

    fn state_mut(&mut self, el: &D::Element) -> &mut VisualState {
        let idx = match self.states.iter().position(|(e, _)| e == el) {
            Some(idx) => idx,
            None => {
                self.states.push((el.clone(), VisualState::default()));
                self.states.len() - 1
            }
        };
        &mut self.states[idx].1
    }

    fn apply(&mut self, el: &D::Element, props: &Props) {
        let touched_transform = props.y.is_some() || props.scale.is_some() || props.rotate.is_some();
        let state = {
            let state = self.state_mut(el);
            for (prop, v) in props.iter() {
                state.set(prop, v);
            }
            *state
        };
        if props.opacity.is_some() {
            self.dom.set_style(el, "opacity", &format!("{}", state.opacity));
        }
        if touched_transform {
            self.dom.set_style(el, "transform", &state.transform());
        }
        if let Some(h) = props.height {
            self.dom.set_style(el, "height", &format!("{h}px"));
        }
    }

    // Later tweens win: strip overlapping props from running tweens on the
    // same element, and drop tweens left with nothing to animate.
    fn overwrite(&mut self, el: &D::Element, props: &Props) {
        for active in self.active.iter_mut() {
            if active.target.as_ref() != Some(el) {
                continue;
            }
            for (prop, _) in props.iter() {
                match prop {
                    Prop::Opacity => active.spec.to.opacity = None,
                    Prop::Y => active.spec.to.y = None,
                    Prop::Scale => active.spec.to.scale = None,
                    Prop::Rotate => active.spec.to.rotate = None,
                    Prop::Height => active.spec.to.height = None,
                }
            }
        }
        self.active
            .retain(|a| a.target.as_ref() != Some(el) || !a.spec.to.is_empty());
    }

    fn ensure_frame(&mut self) {
        if self.frame.is_some() || self.active.is_empty() {
            return;
        }
        if let Some(tick) = self.tick.clone() {
            self.frame = Some(self.host.request_frame(tick));
        }
    }
}

/// Handle to a page's tween engine. Clones share the engine.
pub struct Tweens<D: Dom> {
    inner: Rc<RefCell<Engine<D>>>,
}

impl<D: Dom> Clone for Tweens<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Dom + 'static> Tweens<D> {
    pub fn new(host: Rc<dyn Host>, dom: Rc<D>) -> Self {
        let inner = Rc::new(RefCell::new(Engine {
            host,
            dom,
            active: Vec::new(),
            states: Vec::new(),
            frame: None,
            tick: None,
            next_id: 0,
        }));
        let weak: Weak<RefCell<Engine<D>>> = Rc::downgrade(&inner);
        inner.borrow_mut().tick = Some(Rc::new(move |ts| {
            if let Some(inner) = weak.upgrade() {
                Self::tick(&inner, ts);
            }
        }));
        Self { inner }
    }

    /// Jump an element to a state without animating.
    pub fn set(&self, el: &D::Element, props: Props) {
        let mut engine = self.inner.borrow_mut();
        engine.overwrite(el, &props);
        engine.apply(el, &props);
    }

    pub fn add(&self, el: &D::Element, spec: TweenSpec, hooks: TweenHooks) -> TweenId {
        let mut engine = self.inner.borrow_mut();
        engine.overwrite(el, &spec.to);
        // A from-state is visible immediately, even while the tween is delayed.
        if !spec.from.is_empty() {
            engine.apply(el, &spec.from);
        }
        Self::push(&mut engine, Some(el.clone()), spec, None, hooks)
    }

    /// Tween a bare number; progress is reported through `hooks.on_update`.
    pub fn add_value(&self, from: f64, to: f64, spec: TweenSpec, hooks: TweenHooks) -> TweenId {
        let mut engine = self.inner.borrow_mut();
        Self::push(&mut engine, None, spec, Some((from, to)), hooks)
    }

    fn push(
        engine: &mut Engine<D>,
        target: Option<D::Element>,
        spec: TweenSpec,
        value: Option<(f64, f64)>,
        hooks: TweenHooks,
    ) -> TweenId {
        let id = TweenId(engine.next_id);
        engine.next_id += 1;
        let start_at = engine.host.now() + spec.delay.max(0.0) * 1000.0;
        engine.active.push(Active {
            id,
            target,
            spec,
            value,
            start_at,
            resolved_from: None,
            hooks,
        });
        engine.ensure_frame();
        id
    }

    pub fn kill(&self, id: TweenId) {
        let mut engine = self.inner.borrow_mut();
        engine.active.retain(|a| a.id != id);
        if engine.active.is_empty() {
            if let Some(frame) = engine.frame.take() {
                engine.host.cancel_frame(frame);
            }
        }
    }

    /// Stop every tween without running completion hooks.
    pub fn kill_all(&self) {
        let mut engine = self.inner.borrow_mut();
        let killed = engine.active.len();
        engine.active.clear();
        if let Some(frame) = engine.frame.take() {
            engine.host.cancel_frame(frame);
        }
        if killed > 0 {
            debug!("killed {killed} running tweens");
        }
    }

    pub fn active_len(&self) -> usize {
        self.inner.borrow().active.len()
    }

    pub fn is_active(&self, id: TweenId) -> bool {
        self.inner.borrow().active.iter().any(|a| a.id == id)
    }

    pub fn state_of(&self, el: &D::Element) -> VisualState {
        self.inner.borrow().state(el)
    }

    fn tick(inner: &Rc<RefCell<Engine<D>>>, ts: f64) {
        let mut deferred: Vec<Box<dyn FnOnce()>> = Vec::new();
        {
            let mut engine = inner.borrow_mut();
            engine.frame = None;
            let mut active = std::mem::take(&mut engine.active);
            for tween in active.iter_mut() {
                if ts < tween.start_at {
                    continue;
                }
                if tween.resolved_from.is_none() {
                    let mut from = tween.spec.from;
                    if let Some(el) = &tween.target {
                        let current = engine.state(el);
                        for (prop, _) in tween.spec.to.iter() {
                            if from.get(prop).is_none() {
                                let v = current.get(prop);
                                match prop {
                                    Prop::Opacity => from.opacity = Some(v),
                                    Prop::Y => from.y = Some(v),
                                    Prop::Scale => from.scale = Some(v),
                                    Prop::Rotate => from.rotate = Some(v),
                                    Prop::Height => from.height = Some(v),
                                }
                            }
                        }
                    }
                    tween.resolved_from = Some(from);
                }
                let progress = if tween.spec.duration <= 0.0 {
                    1.0
                } else {
                    ((ts - tween.start_at) / (tween.spec.duration * 1000.0)).min(1.0)
                };
                let eased = tween.spec.ease.apply(progress);
                if let (Some(el), Some(from)) = (tween.target.clone(), tween.resolved_from) {
                    let mut now = Props::default();
                    for (prop, to) in tween.spec.to.iter() {
                        let start = from.get(prop).unwrap_or(to);
                        let v = start + (to - start) * eased;
                        match prop {
                            Prop::Opacity => now.opacity = Some(v),
                            Prop::Y => now.y = Some(v),
                            Prop::Scale => now.scale = Some(v),
                            Prop::Rotate => now.rotate = Some(v),
                            Prop::Height => now.height = Some(v),
                        }
                    }
                    engine.apply(&el, &now);
                }
                if let Some(update) = tween.hooks.on_update.as_mut() {
                    let v = match tween.value {
                        Some((from, to)) => from + (to - from) * eased,
                        None => eased,
                    };
                    update(v);
                }
                if progress >= 1.0 {
                    if let Some(complete) = tween.hooks.on_complete.take() {
                        deferred.push(complete);
                    }
                }
            }
            active.retain(|t| {
                let done = t.resolved_from.is_some()
                    && (t.spec.duration <= 0.0
                        || ts - t.start_at >= t.spec.duration * 1000.0);
                !done
            });
            engine.active = active;
            engine.ensure_frame();
        }
        for hook in deferred {
            hook();
        }
    }
}

/// A sequence of tweens where each step starts when the previous one ends,
/// shifted by an offset (negative offsets overlap, like `"-=0.3"`).
pub struct Timeline<E> {
    ease: Ease,
    cursor: f64,
    end: f64,
    steps: Vec<(E, TweenSpec)>,
}

impl<E: Clone> Timeline<E> {
    pub fn new(default_ease: Ease) -> Self {
        Self {
            ease: default_ease,
            cursor: 0.0,
            end: 0.0,
            steps: Vec::new(),
        }
    }

    pub fn to(self, el: E, to: Props, duration: f64, offset: f64) -> Self {
        let ease = self.ease;
        self.to_with(el, to, duration, offset, ease)
    }

    pub fn to_with(mut self, el: E, to: Props, duration: f64, offset: f64, ease: Ease) -> Self {
        let start = if self.steps.is_empty() {
            offset.max(0.0)
        } else {
            (self.cursor + offset).max(0.0)
        };
        let spec = TweenSpec::to(to, duration, ease).delay(start);
        self.cursor = start + duration;
        self.end = self.end.max(self.cursor);
        self.steps.push((el, spec));
        self
    }

    /// Total length in seconds.
    pub fn duration(&self) -> f64 {
        self.end
    }

    pub fn starts(&self) -> Vec<f64> {
        self.steps.iter().map(|(_, s)| s.delay).collect()
    }

    pub fn play<D: Dom<Element = E> + 'static>(self, tweens: &Tweens<D>) -> Vec<TweenId> {
        self.steps
            .into_iter()
            .map(|(el, spec)| tweens.add(&el, spec, TweenHooks::default()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_offsets_overlap_previous_steps() {
        let tl = Timeline::new(Ease::Power3Out)
            .to("title", Props::new().opacity(1.0), 0.6, 0.0)
            .to("subtitle", Props::new().opacity(1.0), 0.5, -0.3)
            .to("cta", Props::new().opacity(1.0), 0.4, -0.2);
        let starts = tl.starts();
        assert_eq!(starts.len(), 3);
        assert!((starts[1] - 0.3).abs() < 1e-9);
        assert!((starts[2] - 0.6).abs() < 1e-9);
        assert!((tl.duration() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn props_iterate_in_declared_order() {
        let props = Props::new().y(40.0).opacity(0.0);
        let got: Vec<_> = props.iter().map(|(p, _)| p).collect();
        assert_eq!(got, vec![Prop::Opacity, Prop::Y]);
    }
}
