//! Scroll-trigger registry.
//!
//! A registration watches one element against a viewport threshold such as
//! `"top 80%"`: it is inside once the element's top edge has scrolled up to
//! 80% of the viewport height. Registrations are re-evaluated on scroll and
//! resize, and on [`ScrollTriggers::refresh`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dom::Dom;
use crate::error::FxError;
use crate::host::{EventKind, Host, ListenerSet};

/// Which edge of the element is compared, and where in the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Threshold {
    pub edge: Edge,
    /// Percent of viewport height from the top.
    pub viewport_pct: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Top,
    Center,
    Bottom,
}

impl Threshold {
    pub const fn top(viewport_pct: f64) -> Self {
        Self {
            edge: Edge::Top,
            viewport_pct,
        }
    }

    pub fn is_reached(&self, rect_top: f64, rect_height: f64, viewport_height: f64) -> bool {
        let y = match self.edge {
            Edge::Top => rect_top,
            Edge::Center => rect_top + rect_height / 2.0,
            Edge::Bottom => rect_top + rect_height,
        };
        y <= viewport_height * self.viewport_pct / 100.0
    }
}

impl FromStr for Threshold {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let edge = match parts.next() {
            Some("top") => Edge::Top,
            Some("center") => Edge::Center,
            Some("bottom") => Edge::Bottom,
            _ => return Err(FxError::Config(format!("bad threshold edge in `{s}`"))),
        };
        let pct = parts
            .next()
            .and_then(|p| p.strip_suffix('%'))
            .and_then(|p| p.parse::<f64>().ok())
            .ok_or_else(|| FxError::Config(format!("bad threshold position in `{s}`")))?;
        if parts.next().is_some() || !(0.0..=100.0).contains(&pct) {
            return Err(FxError::Config(format!("bad threshold `{s}`")));
        }
        Ok(Self {
            edge,
            viewport_pct: pct,
        })
    }
}

impl TryFrom<String> for Threshold {
    type Error = FxError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Threshold> for String {
    fn from(t: Threshold) -> String {
        let edge = match t.edge {
            Edge::Top => "top",
            Edge::Center => "center",
            Edge::Bottom => "bottom",
        };
        format!("{edge} {}%", t.viewport_pct)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerEvent {
    Enter,
    LeaveBack,
}

pub type TriggerCallback = Rc<dyn Fn(TriggerEvent)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TriggerId(u64);

struct Registration<E> {
    id: TriggerId,
    element: E,
    threshold: Threshold,
    once: bool,
    inside: bool,
    callback: TriggerCallback,
}

struct Registry<D: Dom> {
    host: Rc<dyn Host>,
    dom: Rc<D>,
    registrations: Vec<Registration<D::Element>>,
    next_id: u64,
    fired: usize,
}

/// Scroll triggers for one page. Clones share the registry.
pub struct ScrollTriggers<D: Dom> {
    inner: Rc<RefCell<Registry<D>>>,
    listeners: Rc<RefCell<ListenerSet>>,
}

impl<D: Dom> Clone for ScrollTriggers<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            listeners: self.listeners.clone(),
        }
    }
}

impl<D: Dom + 'static> ScrollTriggers<D> {
    pub fn new(host: Rc<dyn Host>, dom: Rc<D>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                host,
                dom,
                registrations: Vec::new(),
                next_id: 0,
                fired: 0,
            })),
            listeners: Rc::new(RefCell::new(ListenerSet::new())),
        }
    }

    /// Register a trigger. `once` triggers unregister themselves after their
    /// first `Enter`.
    pub fn register(
        &self,
        element: &D::Element,
        threshold: Threshold,
        once: bool,
        callback: TriggerCallback,
    ) -> TriggerId {
        self.ensure_listening();
        let mut registry = self.inner.borrow_mut();
        let id = TriggerId(registry.next_id);
        registry.next_id += 1;
        registry.registrations.push(Registration {
            id,
            element: element.clone(),
            threshold,
            once,
            inside: false,
            callback,
        });
        id
    }

    fn ensure_listening(&self) {
        if !self.listeners.borrow().is_empty() {
            return;
        }
        let host = self.inner.borrow().host.clone();
        let weak: Weak<RefCell<Registry<D>>> = Rc::downgrade(&self.inner);
        let mut listeners = self.listeners.borrow_mut();
        for kind in [EventKind::Scroll, EventKind::Resize] {
            let weak = weak.clone();
            listeners.push(host.listen(
                kind,
                Rc::new(move |_| {
                    if let Some(inner) = weak.upgrade() {
                        Self::evaluate(&inner);
                    }
                }),
            ));
        }
    }

    /// Re-measure every registration against the current viewport.
    pub fn refresh(&self) {
        Self::evaluate(&self.inner);
    }

    fn evaluate(inner: &Rc<RefCell<Registry<D>>>) {
        let mut fire: Vec<(TriggerCallback, TriggerEvent)> = Vec::new();
        {
            let mut registry = inner.borrow_mut();
            let viewport = registry.host.viewport();
            let dom = registry.dom.clone();
            for reg in registry.registrations.iter_mut() {
                let rect = dom.rect(&reg.element);
                let reached = reg.threshold.is_reached(rect.top, rect.height, viewport.height);
                if reached && !reg.inside {
                    reg.inside = true;
                    fire.push((reg.callback.clone(), TriggerEvent::Enter));
                } else if !reached && reg.inside {
                    reg.inside = false;
                    if !reg.once {
                        fire.push((reg.callback.clone(), TriggerEvent::LeaveBack));
                    }
                }
            }
            registry.fired += fire.len();
            registry.registrations.retain(|r| !(r.once && r.inside));
        }
        for (callback, event) in fire {
            callback(event);
        }
    }

    pub fn kill(&self, id: TriggerId) {
        self.inner.borrow_mut().registrations.retain(|r| r.id != id);
    }

    /// Remove every registration and stop listening for scroll/resize.
    pub fn kill_all(&self) {
        let killed = {
            let mut registry = self.inner.borrow_mut();
            let killed = registry.registrations.len();
            registry.registrations.clear();
            killed
        };
        self.listeners.borrow_mut().clear();
        if killed > 0 {
            debug!("killed {killed} scroll triggers");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Callbacks fired over the registry's lifetime.
    pub fn fired(&self) -> usize {
        self.inner.borrow().fired
    }
}
