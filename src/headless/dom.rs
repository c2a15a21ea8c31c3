use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use crate::dom::{Dom, DomCallback, DomEventKind, Rect};
use crate::hero::render::Surface;
use crate::host::Listener;

use super::surface::RecordingSurface;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

/// Builder for an element added with [`MemoryDom::insert`].
#[derive(Clone, Debug, Default)]
pub struct ElementSpec {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    parent: Option<ElementId>,
    top: f64,
    height: f64,
    natural_height: Option<f64>,
}

pub fn element(tag: &str) -> ElementSpec {
    ElementSpec {
        tag: tag.to_ascii_lowercase(),
        height: 20.0,
        ..ElementSpec::default()
    }
}

impl ElementSpec {
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, classes: &str) -> Self {
        self.classes.extend(classes.split_whitespace().map(String::from));
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn inside(mut self, parent: ElementId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Document position: distance from the top of the page and height.
    pub fn at(mut self, top: f64, height: f64) -> Self {
        self.top = top;
        self.height = height;
        self
    }

    pub fn natural_height(mut self, height: f64) -> Self {
        self.natural_height = Some(height);
        self
    }
}

#[derive(Debug)]
struct Node {
    spec: ElementSpec,
    html: Option<String>,
    styles: BTreeMap<String, String>,
    text_history: Vec<String>,
}

struct DomListener {
    id: u64,
    el: ElementId,
    kind: DomEventKind,
    callback: DomCallback,
}

/// An in-memory document: flat element arena in document order, a scroll
/// offset, and listeners that fire on [`MemoryDom::click`] and friends.
pub struct MemoryDom {
    me: Weak<MemoryDom>,
    nodes: RefCell<Vec<Node>>,
    scroll_y: Cell<f64>,
    listeners: RefCell<Vec<DomListener>>,
    next_listener: Cell<u64>,
    surfaces: RefCell<HashMap<ElementId, Rc<RecordingSurface>>>,
}

impl MemoryDom {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            nodes: RefCell::new(Vec::new()),
            scroll_y: Cell::new(0.0),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(1),
            surfaces: RefCell::new(HashMap::new()),
        })
    }

    pub fn insert(&self, spec: ElementSpec) -> ElementId {
        let mut nodes = self.nodes.borrow_mut();
        let history = vec![spec.text.clone()];
        nodes.push(Node {
            spec,
            html: None,
            styles: BTreeMap::new(),
            text_history: history,
        });
        ElementId(nodes.len() - 1)
    }

    pub fn scroll_to(&self, y: f64) {
        self.scroll_y.set(y);
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }

    pub fn style(&self, el: ElementId, prop: &str) -> Option<String> {
        self.nodes.borrow()[el.0].styles.get(prop).cloned()
    }

    pub fn html(&self, el: ElementId) -> Option<String> {
        self.nodes.borrow()[el.0].html.clone()
    }

    pub fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.nodes.borrow()[el.0].spec.classes.iter().any(|c| c == class)
    }

    /// Every text the element has shown, oldest first.
    pub fn text_history(&self, el: ElementId) -> Vec<String> {
        self.nodes.borrow()[el.0].text_history.clone()
    }

    /// The recording surface behind a canvas, once something asked for it.
    pub fn surface(&self, el: ElementId) -> Option<Rc<RecordingSurface>> {
        self.surfaces.borrow().get(&el).cloned()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Click `el`; the event bubbles through its ancestors.
    pub fn click(&self, el: ElementId) {
        let mut path = vec![el];
        while let Some(parent) = self.parent(*path.last().unwrap_or(&el)) {
            path.push(parent);
        }
        for target in path {
            self.fire(target, DomEventKind::Click);
        }
    }

    pub fn hover(&self, el: ElementId) {
        self.fire(el, DomEventKind::PointerEnter);
    }

    pub fn unhover(&self, el: ElementId) {
        self.fire(el, DomEventKind::PointerLeave);
    }

    fn fire(&self, el: ElementId, kind: DomEventKind) {
        let callbacks: Vec<DomCallback> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.el == el && l.kind == kind)
            .map(|l| l.callback.clone())
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.nodes.borrow().get(el.0).and_then(|n| n.spec.parent)
    }

    fn is_descendant(&self, el: ElementId, ancestor: ElementId) -> bool {
        let mut cursor = self.parent(el);
        while let Some(p) = cursor {
            if p == ancestor {
                return true;
            }
            cursor = self.parent(p);
        }
        false
    }

    fn matches(&self, el: ElementId, selector: &[Compound]) -> bool {
        let Some((last, ancestors)) = selector.split_last() else {
            return false;
        };
        if !self.matches_compound(el, last) {
            return false;
        }
        // Descendant combinators: match the remaining compounds right to
        // left against the ancestor chain.
        let mut remaining = ancestors.iter().rev().peekable();
        let mut cursor = self.parent(el);
        while let (Some(compound), Some(p)) = (remaining.peek(), cursor) {
            if self.matches_compound(p, compound) {
                remaining.next();
            }
            cursor = self.parent(p);
        }
        remaining.peek().is_none()
    }

    fn matches_compound(&self, el: ElementId, compound: &Compound) -> bool {
        let nodes = self.nodes.borrow();
        let Some(node) = nodes.get(el.0) else {
            return false;
        };
        let spec = &node.spec;
        compound.tag.as_ref().map_or(true, |t| *t == spec.tag)
            && compound.id.as_ref().map_or(true, |id| spec.id.as_ref() == Some(id))
            && compound.classes.iter().all(|c| spec.classes.contains(c))
            && compound.attrs.iter().all(|(name, value)| match value {
                Some(v) => spec.attrs.get(name) == Some(v),
                None => spec.attrs.contains_key(name),
            })
    }

    fn find(&self, selector: &str, within: Option<ElementId>) -> Vec<ElementId> {
        let parsed = parse_selector(selector);
        let count = self.nodes.borrow().len();
        (0..count)
            .map(ElementId)
            .filter(|el| within.map_or(true, |root| self.is_descendant(*el, root)))
            .filter(|el| self.matches(*el, &parsed))
            .collect()
    }
}

#[derive(Debug, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

/// Compound selectors (`tag#id.class[attr="v"]`) joined by descendant
/// combinators. Anything fancier matches nothing.
fn parse_selector(selector: &str) -> Vec<Compound> {
    selector
        .split_whitespace()
        .map(|part| {
            let mut compound = Compound::default();
            let mut rest = part;
            let tag_len = rest.find(&['#', '.', '['][..]).unwrap_or(rest.len());
            if tag_len > 0 {
                compound.tag = Some(rest[..tag_len].to_ascii_lowercase());
            }
            rest = &rest[tag_len..];
            while let Some(marker) = rest.chars().next() {
                rest = &rest[marker.len_utf8()..];
                if marker == '[' {
                    let end = rest.find(']').unwrap_or(rest.len());
                    let inner = &rest[..end];
                    rest = rest.get(end + 1..).unwrap_or("");
                    match inner.split_once('=') {
                        Some((name, value)) => compound
                            .attrs
                            .push((name.to_string(), Some(value.trim_matches(&['"', '\''][..]).to_string()))),
                        None => compound.attrs.push((inner.to_string(), None)),
                    }
                    continue;
                }
                let end = rest.find(&['#', '.', '['][..]).unwrap_or(rest.len());
                let name = rest[..end].to_string();
                rest = &rest[end..];
                match marker {
                    '#' => compound.id = Some(name),
                    '.' => compound.classes.push(name),
                    _ => {}
                }
            }
            compound
        })
        .collect()
}

/// Text content of an HTML fragment: tags dropped, basic entities decoded.
fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

impl Dom for MemoryDom {
    type Element = ElementId;

    fn by_id(&self, id: &str) -> Option<ElementId> {
        self.nodes
            .borrow()
            .iter()
            .position(|n| n.spec.id.as_deref() == Some(id))
            .map(ElementId)
    }

    fn query_all(&self, selector: &str) -> Vec<ElementId> {
        self.find(selector, None)
    }

    fn query_within(&self, root: &ElementId, selector: &str) -> Option<ElementId> {
        self.find(selector, Some(*root)).into_iter().next()
    }

    fn text(&self, el: &ElementId) -> String {
        self.nodes.borrow()[el.0].spec.text.clone()
    }

    fn set_text(&self, el: &ElementId, text: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let node = &mut nodes[el.0];
        node.spec.text = text.to_string();
        node.html = None;
        node.text_history.push(text.to_string());
    }

    fn set_html(&self, el: &ElementId, html: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let node = &mut nodes[el.0];
        node.spec.text = strip_tags(html);
        node.html = Some(html.to_string());
        let text = node.spec.text.clone();
        node.text_history.push(text);
    }

    fn attr(&self, el: &ElementId, name: &str) -> Option<String> {
        let nodes = self.nodes.borrow();
        let spec = &nodes[el.0].spec;
        match name {
            "id" => spec.id.clone(),
            "class" => Some(spec.classes.join(" ")),
            _ => spec.attrs.get(name).cloned(),
        }
    }

    fn set_attr(&self, el: &ElementId, name: &str, value: &str) {
        self.nodes.borrow_mut()[el.0]
            .spec
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    fn set_style(&self, el: &ElementId, prop: &str, value: &str) {
        self.nodes.borrow_mut()[el.0]
            .styles
            .insert(prop.to_string(), value.to_string());
    }

    fn add_class(&self, el: &ElementId, class: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let classes = &mut nodes[el.0].spec.classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    fn remove_class(&self, el: &ElementId, class: &str) {
        self.nodes.borrow_mut()[el.0].spec.classes.retain(|c| c != class);
    }

    fn rect(&self, el: &ElementId) -> Rect {
        let nodes = self.nodes.borrow();
        let spec = &nodes[el.0].spec;
        Rect {
            top: spec.top - self.scroll_y.get(),
            left: 0.0,
            width: 100.0,
            height: spec.height,
        }
    }

    fn natural_height(&self, el: &ElementId) -> f64 {
        let nodes = self.nodes.borrow();
        let spec = &nodes[el.0].spec;
        // `display: none` lays out to nothing.
        if spec.classes.iter().any(|c| c == "hidden") {
            return 0.0;
        }
        spec.natural_height.unwrap_or(spec.height)
    }

    fn listen(&self, el: &ElementId, kind: DomEventKind, callback: DomCallback) -> Listener {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().push(DomListener {
            id,
            el: *el,
            kind,
            callback,
        });
        let me = self.me.clone();
        Listener::new(move || {
            if let Some(dom) = me.upgrade() {
                dom.listeners.borrow_mut().retain(|l| l.id != id);
            }
        })
    }

    fn canvas_surface(&self, el: &ElementId) -> Option<Rc<dyn Surface>> {
        let (tag, label, height) = {
            let nodes = self.nodes.borrow();
            let spec = &nodes.get(el.0)?.spec;
            let label = spec.id.as_ref().map_or_else(|| format!("canvas{}", el.0), |id| format!("#{id}"));
            (spec.tag.clone(), label, spec.height)
        };
        if tag != "canvas" {
            return None;
        }
        let surface = self
            .surfaces
            .borrow_mut()
            .entry(*el)
            .or_insert_with(|| RecordingSurface::new(label, 300, height.max(1.0) as u32))
            .clone();
        Some(surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_cover_ids_classes_tags_and_attributes() {
        let dom = MemoryDom::new();
        let grid = dom.insert(element("section").id("grid"));
        let card = dom.insert(element("div").class("card big").attr("data-role", "chair").inside(grid));
        let img = dom.insert(element("img").inside(card));
        let other = dom.insert(element("div").class("card"));

        assert_eq!(dom.query_all(".card"), vec![card, other]);
        assert_eq!(dom.query_all("div.card.big"), vec![card]);
        assert_eq!(dom.query_all("[data-role]"), vec![card]);
        assert_eq!(dom.query_all("[data-role=\"chair\"]"), vec![card]);
        assert_eq!(dom.query_all("#grid .card"), vec![card]);
        assert_eq!(dom.query_within(&card, "img"), Some(img));
        assert_eq!(dom.query_within(&other, "img"), None);
        assert_eq!(dom.by_id("grid"), Some(grid));
    }

    #[test]
    fn html_updates_text_content() {
        let dom = MemoryDom::new();
        let el = dom.insert(element("h1").text("old"));
        dom.set_html(&el, "a<span class=\"x\">&lt;</span>b");
        assert_eq!(dom.text(&el), "a<b");
        assert_eq!(dom.text_history(el), vec!["old", "a<b"]);
    }

    #[test]
    fn clicks_bubble_to_ancestors() {
        let dom = MemoryDom::new();
        let header = dom.insert(element("div"));
        let label = dom.insert(element("span").inside(header));
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let listener = dom.listen(&header, DomEventKind::Click, Rc::new(move || counter.set(counter.get() + 1)));
        dom.click(label);
        assert_eq!(hits.get(), 1);
        drop(listener);
        dom.click(label);
        assert_eq!(hits.get(), 1);
        assert_eq!(dom.listener_count(), 0);
    }

    #[test]
    fn canvas_surface_is_stable_per_element() {
        let dom = MemoryDom::new();
        let canvas = dom.insert(element("canvas").id("three-canvas"));
        let div = dom.insert(element("div"));
        let a = dom.canvas_surface(&canvas).unwrap();
        assert!(a.try_claim());
        let b = dom.canvas_surface(&canvas).unwrap();
        assert!(!b.try_claim());
        assert_eq!(b.label(), "#three-canvas");
        assert!(dom.canvas_surface(&div).is_none());
    }
}
