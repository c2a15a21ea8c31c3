use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

use crate::error::FxError;
use crate::host::{
    EventCallback, EventKind, FetchCallback, FrameCallback, FrameHandle, Host, HostEvent, Listener,
    TimerCallback, TimerHandle, Viewport,
};

struct Timer {
    due: f64,
    callback: TimerCallback,
}

/// A host whose clock only moves when told to. Frames run on
/// [`ManualHost::run_frame`], timers on [`ManualHost::advance`], fetches on
/// [`ManualHost::complete_fetch`].
pub struct ManualHost {
    me: Weak<ManualHost>,
    clock: Cell<f64>,
    viewport: Cell<Viewport>,
    next_id: Cell<u64>,
    frames: RefCell<BTreeMap<u64, FrameCallback>>,
    timers: RefCell<BTreeMap<u64, Timer>>,
    listeners: RefCell<Vec<(u64, EventKind, EventCallback)>>,
    fetches: RefCell<VecDeque<(String, FetchCallback)>>,
}

impl ManualHost {
    pub fn new(viewport: Viewport) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            clock: Cell::new(0.0),
            viewport: Cell::new(viewport),
            next_id: Cell::new(1),
            frames: RefCell::new(BTreeMap::new()),
            timers: RefCell::new(BTreeMap::new()),
            listeners: RefCell::new(Vec::new()),
            fetches: RefCell::new(VecDeque::new()),
        })
    }

    fn id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Move the clock forward, firing due timers in deadline order.
    pub fn advance(&self, ms: f64) {
        let target = self.clock.get() + ms.max(0.0);
        loop {
            let next = {
                let timers = self.timers.borrow();
                timers
                    .iter()
                    .filter(|(_, t)| t.due <= target)
                    .min_by(|a, b| a.1.due.total_cmp(&b.1.due).then(a.0.cmp(b.0)))
                    .map(|(id, _)| *id)
            };
            let Some(id) = next else { break };
            let Some(timer) = self.timers.borrow_mut().remove(&id) else { break };
            self.clock.set(self.clock.get().max(timer.due));
            (timer.callback)();
        }
        self.clock.set(target);
    }

    /// Run every frame callback requested so far. Requests made while
    /// running wait for the next call. Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let frames = std::mem::take(&mut *self.frames.borrow_mut());
        let now = self.clock.get();
        for callback in frames.values() {
            callback(now);
        }
        frames.len()
    }

    /// One display refresh: `ms` of time, then a frame.
    pub fn tick(&self, ms: f64) -> usize {
        self.advance(ms);
        self.run_frame()
    }

    /// Run `ms` worth of 60 Hz frames.
    pub fn run_for(&self, ms: f64) {
        let step = 1000.0 / 60.0;
        let mut elapsed = 0.0;
        while elapsed < ms {
            self.tick(step);
            elapsed += step;
        }
    }

    pub fn dispatch(&self, event: &HostEvent) {
        let kind = event.kind();
        let callbacks: Vec<EventCallback> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    /// Change the viewport and tell the listeners.
    pub fn resize(&self, width: f64, height: f64) {
        let mut viewport = self.viewport.get();
        viewport.width = width;
        viewport.height = height;
        self.viewport.set(viewport);
        self.dispatch(&HostEvent::Resize { width, height });
    }

    /// Answer the oldest outstanding fetch.
    pub fn complete_fetch(&self, result: Result<String, FxError>) -> Option<String> {
        let (url, done) = self.fetches.borrow_mut().pop_front()?;
        done(result);
        Some(url)
    }

    pub fn pending_fetches(&self) -> Vec<String> {
        self.fetches.borrow().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn live_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn live_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn live_listeners(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl Host for ManualHost {
    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    fn now(&self) -> f64 {
        self.clock.get()
    }

    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let id = self.id();
        self.frames.borrow_mut().insert(id, callback);
        FrameHandle(id)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.frames.borrow_mut().remove(&handle.0);
    }

    fn set_timeout(&self, delay_ms: f64, callback: TimerCallback) -> TimerHandle {
        let id = self.id();
        let due = self.clock.get() + delay_ms.max(0.0);
        self.timers.borrow_mut().insert(id, Timer { due, callback });
        TimerHandle(id)
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        self.timers.borrow_mut().remove(&handle.0);
    }

    fn listen(&self, kind: EventKind, callback: EventCallback) -> Listener {
        let id = self.id();
        self.listeners.borrow_mut().push((id, kind, callback));
        let me = self.me.clone();
        Listener::new(move || {
            if let Some(host) = me.upgrade() {
                host.listeners.borrow_mut().retain(|(i, _, _)| *i != id);
            }
        })
    }

    fn fetch_text(&self, url: &str, done: FetchCallback) {
        self.fetches.borrow_mut().push_back((url.to_string(), done));
    }
}
