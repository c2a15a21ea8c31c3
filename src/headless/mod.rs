//! Deterministic backend: a hand-cranked clock, an in-memory document and a
//! render surface that only counts. Drives the native test suite.

mod dom;
mod host;
mod surface;

pub use self::dom::{element, ElementId, ElementSpec, MemoryDom};
pub use self::host::ManualHost;
pub use self::surface::{RecordingSurface, RenderStats};

use std::rc::Rc;

use crate::host::{Host, HostEvent, Viewport};

/// A host and a document wired together the way a browser tab is.
#[derive(Clone)]
pub struct Harness {
    pub host: Rc<ManualHost>,
    pub dom: Rc<MemoryDom>,
}

impl Harness {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            host: ManualHost::new(Viewport::new(width, height)),
            dom: MemoryDom::new(),
        }
    }

    pub fn desktop() -> Self {
        Self::new(1280.0, 800.0)
    }

    pub fn host(&self) -> Rc<dyn Host> {
        self.host.clone()
    }

    /// Scroll the document and fire the scroll event.
    pub fn scroll_to(&self, y: f64) {
        self.dom.scroll_to(y);
        self.host.dispatch(&HostEvent::Scroll { y });
    }
}
