use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use log::debug;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{CustomEvent, Document, Event, EventTarget, MouseEvent, Performance, Response, Window};

use crate::error::{FxError, FxResult};
use crate::host::{
    EventCallback, EventKind, FetchCallback, FrameCallback, FrameHandle, Host, HostEvent, Listener,
    TimerCallback, TimerHandle, Viewport,
};

/// Log a failed JS call at debug level and carry on.
pub(super) fn soft<T>(what: &str, result: Result<T, JsValue>) -> Option<T> {
    result
        .map_err(|e| debug!("{what} failed: {e:?}"))
        .ok()
}

/// Attach `handler` to `target`; the returned listener detaches it.
pub(super) fn add_listener(
    target: EventTarget,
    name: &'static str,
    handler: impl FnMut(Event) + 'static,
) -> Listener {
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    if soft(
        name,
        target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref()),
    )
    .is_none()
    {
        return Listener::noop();
    }
    Listener::new(move || {
        soft(
            name,
            target.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref()),
        );
        drop(closure);
    })
}

/// [`Host`] on top of the browser window.
///
/// All frame requests share one `requestAnimationFrame` trampoline; timer
/// closures are kept until they have fired or been cleared.
pub struct WebHost {
    me: Weak<WebHost>,
    window: Window,
    document: Document,
    performance: Option<Performance>,
    next_id: Cell<u64>,
    frames: RefCell<BTreeMap<u64, FrameCallback>>,
    raf: Cell<Option<i32>>,
    trampoline: Closure<dyn FnMut(f64)>,
    timers: RefCell<HashMap<u64, (i32, Closure<dyn FnMut()>)>>,
    fired: RefCell<Vec<u64>>,
}

impl WebHost {
    pub fn new(window: Window, document: Document) -> Rc<Self> {
        Rc::new_cyclic(|me: &Weak<WebHost>| {
            let weak = me.clone();
            let trampoline = Closure::<dyn FnMut(f64)>::new(move |ts: f64| {
                if let Some(host) = weak.upgrade() {
                    host.run_frames(ts);
                }
            });
            Self {
                me: me.clone(),
                performance: window.performance(),
                window,
                document,
                next_id: Cell::new(1),
                frames: RefCell::new(BTreeMap::new()),
                raf: Cell::new(None),
                trampoline,
                timers: RefCell::new(HashMap::new()),
                fired: RefCell::new(Vec::new()),
            }
        })
    }

    fn id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn run_frames(&self, ts: f64) {
        self.raf.set(None);
        let frames = std::mem::take(&mut *self.frames.borrow_mut());
        for callback in frames.values() {
            callback(ts);
        }
    }

    fn ensure_raf(&self) {
        if self.raf.get().is_some() || self.frames.borrow().is_empty() {
            return;
        }
        let handle = soft(
            "requestAnimationFrame",
            self.window
                .request_animation_frame(self.trampoline.as_ref().unchecked_ref()),
        );
        self.raf.set(handle);
    }

    // Closures of fired timers are dropped here, outside their own call.
    fn sweep_timers(&self) {
        let fired = std::mem::take(&mut *self.fired.borrow_mut());
        if fired.is_empty() {
            return;
        }
        let mut timers = self.timers.borrow_mut();
        for id in fired {
            timers.remove(&id);
        }
    }

    fn event_for(&self, kind: EventKind, event: &Event) -> Option<HostEvent> {
        Some(match kind {
            EventKind::PointerMove => {
                let mouse = event.dyn_ref::<MouseEvent>()?;
                HostEvent::PointerMove {
                    x: f64::from(mouse.client_x()),
                    y: f64::from(mouse.client_y()),
                }
            }
            EventKind::Resize => {
                let viewport = self.viewport();
                HostEvent::Resize {
                    width: viewport.width,
                    height: viewport.height,
                }
            }
            EventKind::Scroll => HostEvent::Scroll {
                y: self.window.scroll_y().unwrap_or(0.0),
            },
            EventKind::SlideChanged => {
                let detail = event.dyn_ref::<CustomEvent>()?.detail();
                let index = js_sys::Reflect::get(&detail, &JsValue::from_str("index"))
                    .ok()?
                    .as_f64()?;
                HostEvent::SlideChanged {
                    index: index.max(0.0) as usize,
                }
            }
            EventKind::Visibility => HostEvent::Visibility {
                visible: !self.document.hidden(),
            },
            EventKind::Unload => HostEvent::Unload,
        })
    }
}

impl Host for WebHost {
    fn viewport(&self) -> Viewport {
        let dimension = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        Viewport {
            width: dimension(self.window.inner_width()),
            height: dimension(self.window.inner_height()),
            pixel_ratio: self.window.device_pixel_ratio(),
        }
    }

    fn now(&self) -> f64 {
        match &self.performance {
            Some(performance) => performance.now(),
            None => js_sys::Date::now(),
        }
    }

    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let id = self.id();
        self.frames.borrow_mut().insert(id, callback);
        self.ensure_raf();
        FrameHandle(id)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let empty = {
            let mut frames = self.frames.borrow_mut();
            frames.remove(&handle.0);
            frames.is_empty()
        };
        if empty {
            if let Some(raf) = self.raf.take() {
                soft("cancelAnimationFrame", self.window.cancel_animation_frame(raf));
            }
        }
    }

    fn set_timeout(&self, delay_ms: f64, callback: TimerCallback) -> TimerHandle {
        self.sweep_timers();
        let id = self.id();
        let me = self.me.clone();
        let mut callback = Some(callback);
        let closure = Closure::<dyn FnMut()>::new(move || {
            if let Some(callback) = callback.take() {
                callback();
            }
            if let Some(host) = me.upgrade() {
                host.fired.borrow_mut().push(id);
            }
        });
        let handle = soft(
            "setTimeout",
            self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                delay_ms.max(0.0).round() as i32,
            ),
        );
        if let Some(handle) = handle {
            self.timers.borrow_mut().insert(id, (handle, closure));
        }
        TimerHandle(id)
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        self.sweep_timers();
        if let Some((js_handle, _closure)) = self.timers.borrow_mut().remove(&handle.0) {
            self.window.clear_timeout_with_handle(js_handle);
        }
    }

    fn listen(&self, kind: EventKind, callback: EventCallback) -> Listener {
        let (target, name): (EventTarget, &'static str) = match kind {
            EventKind::PointerMove => (self.window.clone().into(), "pointermove"),
            EventKind::Resize => (self.window.clone().into(), "resize"),
            EventKind::Scroll => (self.window.clone().into(), "scroll"),
            EventKind::SlideChanged => (self.window.clone().into(), "slidechange"),
            EventKind::Visibility => (self.document.clone().into(), "visibilitychange"),
            EventKind::Unload => (self.window.clone().into(), "pagehide"),
        };
        let me = self.me.clone();
        add_listener(target, name, move |event| {
            let Some(host) = me.upgrade() else { return };
            if let Some(event) = host.event_for(kind, &event) {
                callback(&event);
            }
        })
    }

    fn fetch_text(&self, url: &str, done: FetchCallback) {
        let window = self.window.clone();
        let url = url.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            let result = fetch(&window, &url).await;
            done(result);
        });
    }
}

impl Drop for WebHost {
    fn drop(&mut self) {
        if let Some(raf) = self.raf.take() {
            soft("cancelAnimationFrame", self.window.cancel_animation_frame(raf));
        }
        for (_, (handle, _)) in self.timers.borrow_mut().drain() {
            self.window.clear_timeout_with_handle(handle);
        }
    }
}

async fn fetch(window: &Window, url: &str) -> FxResult<String> {
    let fail = |reason: String| FxError::AssetLoad {
        url: url.to_string(),
        reason,
    };
    let js = |e: JsValue| fail(format!("{e:?}"));

    let response = JsFuture::from(window.fetch_with_str(url)).await.map_err(js)?;
    let response: Response = response.dyn_into().map_err(js)?;
    if !response.ok() {
        return Err(fail(format!("HTTP {}", response.status())));
    }
    let body = JsFuture::from(response.text().map_err(js)?).await.map_err(js)?;
    body.as_string().ok_or_else(|| fail("body is not text".into()))
}
