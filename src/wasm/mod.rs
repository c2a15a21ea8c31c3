//! Browser entry point and the web-sys backends.

mod dom;
mod host;
mod webgl;

pub use self::dom::WebDom;
pub use self::host::WebHost;
pub use self::webgl::CanvasSurface;

use std::cell::RefCell;
use std::rc::Rc;

use log::{error, info, warn, Level};
use wasm_bindgen::prelude::*;
use web_sys::Document;

use crate::config::SiteConfig;
use crate::runtime::{PageKind, PageRuntime};

/// Inline JSON config: `<script type="application/json" id="fx-config">`.
const CONFIG_ID: &str = "fx-config";

thread_local! {
    static RUNTIME: RefCell<Option<Rc<RefCell<PageRuntime<WebDom>>>>> = const { RefCell::new(None) };
}

fn read_config(document: &Document) -> SiteConfig {
    let Some(text) = document
        .get_element_by_id(CONFIG_ID)
        .and_then(|el| el.text_content())
    else {
        return SiteConfig::default();
    };
    SiteConfig::from_json(&text).unwrap_or_else(|e| {
        warn!("ignoring #{CONFIG_ID}: {e}");
        SiteConfig::default()
    })
}

fn page_kind(document: &Document) -> PageKind {
    let name = document
        .body()
        .and_then(|body| body.get_attribute("data-page"))
        .unwrap_or_default();
    name.parse().unwrap_or_else(|e| {
        warn!("{e}; running the home page script");
        PageKind::Home
    })
}

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    // A second init (hot reload) finds the logger already set.
    let _ = console_log::init_with_level(Level::Info);
    if let Err(e) = start() {
        error!("clubfx failed to start: {e:?}");
    }
}

fn start() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;

    let config = Rc::new(read_config(&document));
    let kind = page_kind(&document);
    let host = WebHost::new(window, document.clone());
    let dom = WebDom::new(document);
    let runtime = PageRuntime::start(kind, host, dom, config);
    info!("clubfx running the {kind} page");
    RUNTIME.with(|slot| *slot.borrow_mut() = Some(runtime));
    Ok(())
}

/// Tear down and re-run the page script, e.g. after a client-side
/// navigation swapped the markup.
#[wasm_bindgen]
pub fn reinit() {
    RUNTIME.with(|slot| {
        if let Some(runtime) = slot.borrow().as_ref() {
            runtime.borrow_mut().init();
        }
    });
}

#[wasm_bindgen]
pub fn cleanup() {
    RUNTIME.with(|slot| {
        if let Some(runtime) = slot.borrow().as_ref() {
            runtime.borrow_mut().cleanup();
        }
    });
}
