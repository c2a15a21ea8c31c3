use std::fmt;
use std::rc::Rc;

use crate::hero::render::Surface;
use crate::host::Listener;

pub type DomCallback = Rc<dyn Fn()>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DomEventKind {
    Click,
    PointerEnter,
    PointerLeave,
}

/// Bounding box relative to the viewport, in CSS pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// The slice of the document the page scripts touch.
///
/// Lookups return `None`/empty when the markup lacks an element; callers
/// treat that as "skip this feature".
pub trait Dom {
    type Element: Clone + PartialEq + fmt::Debug + 'static;

    fn by_id(&self, id: &str) -> Option<Self::Element>;
    fn query_all(&self, selector: &str) -> Vec<Self::Element>;
    fn query_within(&self, root: &Self::Element, selector: &str) -> Option<Self::Element>;

    fn text(&self, el: &Self::Element) -> String;
    fn set_text(&self, el: &Self::Element, text: &str);
    fn set_html(&self, el: &Self::Element, html: &str);

    fn attr(&self, el: &Self::Element, name: &str) -> Option<String>;
    fn set_attr(&self, el: &Self::Element, name: &str, value: &str);

    fn set_style(&self, el: &Self::Element, prop: &str, value: &str);
    fn add_class(&self, el: &Self::Element, class: &str);
    fn remove_class(&self, el: &Self::Element, class: &str);

    fn rect(&self, el: &Self::Element) -> Rect;
    /// Height the element would take with `height: auto`.
    fn natural_height(&self, el: &Self::Element) -> f64;

    fn listen(&self, el: &Self::Element, kind: DomEventKind, callback: DomCallback) -> Listener;

    /// The render surface behind a `<canvas>`, if `el` is one.
    fn canvas_surface(&self, el: &Self::Element) -> Option<Rc<dyn Surface>>;
}
