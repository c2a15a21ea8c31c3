use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlCanvasElement, HtmlElement};

use super::host::{add_listener, soft};
use super::webgl::CanvasSurface;
use crate::dom::{Dom, DomCallback, DomEventKind, Rect};
use crate::hero::render::Surface;
use crate::host::Listener;

/// [`Dom`] over the live document.
pub struct WebDom {
    document: Document,
}

impl WebDom {
    pub fn new(document: Document) -> Rc<Self> {
        Rc::new(Self { document })
    }
}

impl Dom for WebDom {
    type Element = Element;

    fn by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn query_all(&self, selector: &str) -> Vec<Element> {
        let Some(list) = soft(selector, self.document.query_selector_all(selector)) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn query_within(&self, root: &Element, selector: &str) -> Option<Element> {
        soft(selector, root.query_selector(selector)).flatten()
    }

    fn text(&self, el: &Element) -> String {
        el.text_content().unwrap_or_default()
    }

    fn set_text(&self, el: &Element, text: &str) {
        el.set_text_content(Some(text));
    }

    fn set_html(&self, el: &Element, html: &str) {
        el.set_inner_html(html);
    }

    fn attr(&self, el: &Element, name: &str) -> Option<String> {
        el.get_attribute(name)
    }

    fn set_attr(&self, el: &Element, name: &str, value: &str) {
        soft("setAttribute", el.set_attribute(name, value));
    }

    fn set_style(&self, el: &Element, prop: &str, value: &str) {
        if let Some(el) = el.dyn_ref::<HtmlElement>() {
            soft("style", el.style().set_property(prop, value));
        }
    }

    fn add_class(&self, el: &Element, class: &str) {
        soft("classList.add", el.class_list().add_1(class));
    }

    fn remove_class(&self, el: &Element, class: &str) {
        soft("classList.remove", el.class_list().remove_1(class));
    }

    fn rect(&self, el: &Element) -> Rect {
        let r = el.get_bounding_client_rect();
        Rect {
            top: r.top(),
            left: r.left(),
            width: r.width(),
            height: r.height(),
        }
    }

    fn natural_height(&self, el: &Element) -> f64 {
        f64::from(el.scroll_height())
    }

    fn listen(&self, el: &Element, kind: DomEventKind, callback: DomCallback) -> Listener {
        let name = match kind {
            DomEventKind::Click => "click",
            DomEventKind::PointerEnter => "pointerenter",
            DomEventKind::PointerLeave => "pointerleave",
        };
        add_listener(el.clone().into(), name, move |_| callback())
    }

    fn canvas_surface(&self, el: &Element) -> Option<Rc<dyn Surface>> {
        let canvas = el.dyn_ref::<HtmlCanvasElement>()?.clone();
        Some(Rc::new(CanvasSurface::new(canvas)))
    }
}
