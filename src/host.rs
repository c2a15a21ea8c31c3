//! Platform seam: frame scheduling, timers, window events and fetch.
//!
//! Everything an effect needs from the browser goes through [`Host`], so the
//! same controllers run on the web-sys backend and on the deterministic
//! [`crate::headless`] backend.

use std::fmt;
use std::rc::Rc;

use crate::error::FxError;

/// Called with the frame timestamp in milliseconds.
pub type FrameCallback = Rc<dyn Fn(f64)>;
pub type TimerCallback = Box<dyn FnOnce()>;
pub type EventCallback = Rc<dyn Fn(&HostEvent)>;
pub type FetchCallback = Box<dyn FnOnce(Result<String, FxError>)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerMove,
    Resize,
    Scroll,
    SlideChanged,
    Visibility,
    Unload,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    PointerMove { x: f64, y: f64 },
    Resize { width: f64, height: f64 },
    Scroll { y: f64 },
    SlideChanged { index: usize },
    Visibility { visible: bool },
    Unload,
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PointerMove { .. } => EventKind::PointerMove,
            Self::Resize { .. } => EventKind::Resize,
            Self::Scroll { .. } => EventKind::Scroll,
            Self::SlideChanged { .. } => EventKind::SlideChanged,
            Self::Visibility { .. } => EventKind::Visibility,
            Self::Unload => EventKind::Unload,
        }
    }
}

pub trait Host {
    fn viewport(&self) -> Viewport;

    /// Monotonic clock in milliseconds.
    fn now(&self) -> f64;

    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;
    fn cancel_frame(&self, handle: FrameHandle);

    fn set_timeout(&self, delay_ms: f64, callback: TimerCallback) -> TimerHandle;
    fn clear_timeout(&self, handle: TimerHandle);

    fn listen(&self, kind: EventKind, callback: EventCallback) -> Listener;

    /// Fetch a text resource. `done` runs on a later turn, never re-entrantly.
    fn fetch_text(&self, url: &str, done: FetchCallback);
}

/// A registered listener. Dropping it (or calling [`Listener::remove`])
/// unregisters the callback.
pub struct Listener {
    remove: Option<Box<dyn FnOnce()>>,
}

impl Listener {
    pub fn new(remove: impl FnOnce() + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// A listener with nothing to undo.
    pub fn noop() -> Self {
        Self { remove: None }
    }

    pub fn remove(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("armed", &self.remove.is_some())
            .finish()
    }
}

/// Removal callbacks for everything an owner registered, kept next to the
/// resources they guard.
#[derive(Debug, Default)]
pub struct ListenerSet {
    listeners: Vec<Listener>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Remove every listener, most recent first.
    pub fn clear(&mut self) {
        while let Some(listener) = self.listeners.pop() {
            listener.remove();
        }
    }
}

impl Drop for ListenerSet {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn listener_set_removes_everything_once() {
        let removed = Rc::new(Cell::new(0));
        let mut set = ListenerSet::new();
        for _ in 0..3 {
            let removed = removed.clone();
            set.push(Listener::new(move || removed.set(removed.get() + 1)));
        }
        set.clear();
        set.clear();
        assert_eq!(removed.get(), 3);
        assert!(set.is_empty());
    }

    #[test]
    fn dropping_a_listener_removes_it() {
        let removed = Rc::new(Cell::new(false));
        {
            let removed = removed.clone();
            let _listener = Listener::new(move || removed.set(true));
        }
        assert!(removed.get());
    }
}
