#![cfg(target_arch = "wasm32")]

use clubfx::config::HeroConfig;
use clubfx::dom::Dom;
use clubfx::hero::render::Surface;
use clubfx::wasm::{WebDom, WebHost};
use clubfx::{HeroEffect, HeroStatus};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn mount(html: &str) -> web_sys::Element {
    let document = web_sys::window().unwrap().document().unwrap();
    let host = document.create_element("div").unwrap();
    host.set_inner_html(html);
    document.body().unwrap().append_child(&host).unwrap();
    host
}

#[wasm_bindgen_test]
fn canvas_claims_are_exclusive() {
    let root = mount(r#"<canvas id="claim-test" width="64" height="32"></canvas>"#);
    let dom = WebDom::new(web_sys::window().unwrap().document().unwrap());
    let canvas = dom.by_id("claim-test").expect("canvas element not found");

    let first = dom.canvas_surface(&canvas).unwrap();
    let second = dom.canvas_surface(&canvas).unwrap();
    assert_eq!(first.label(), "#claim-test");
    assert_eq!(first.size(), (64, 32));

    assert!(first.try_claim());
    assert!(second.is_claimed());
    assert!(!second.try_claim());
    first.release_claim();
    assert!(second.try_claim());
    second.release_claim();
    root.remove();
}

#[wasm_bindgen_test]
fn only_canvases_have_surfaces() {
    let root = mount(r#"<div id="not-a-canvas"></div>"#);
    let dom = WebDom::new(web_sys::window().unwrap().document().unwrap());
    let div = dom.by_id("not-a-canvas").unwrap();
    assert!(dom.canvas_surface(&div).is_none());
    root.remove();
}

#[wasm_bindgen_test]
fn styles_classes_and_queries_reach_the_document() {
    let root = mount(
        r#"<section id="grid"><article class="card"><p class="title">A</p></article>
           <article class="card"><p class="title">B</p></article></section>"#,
    );
    let dom = WebDom::new(web_sys::window().unwrap().document().unwrap());
    let cards = dom.query_all("#grid .card");
    assert_eq!(cards.len(), 2);

    let title = dom.query_within(&cards[1], ".title").unwrap();
    assert_eq!(dom.text(&title), "B");

    dom.set_style(&cards[0], "opacity", "0");
    dom.add_class(&cards[0], "hidden");
    assert_eq!(dom.attr(&cards[0], "style").as_deref(), Some("opacity: 0;"));
    assert!(cards[0].class_list().contains("hidden"));
    dom.remove_class(&cards[0], "hidden");
    assert!(!cards[0].class_list().contains("hidden"));
    root.remove();
}

#[wasm_bindgen_test]
fn the_hero_restarts_on_the_same_canvas() {
    let root = mount(r#"<canvas id="restart-test" width="64" height="32"></canvas>"#);
    let window = web_sys::window().unwrap();
    let document = window.document().unwrap();
    let host = WebHost::new(window, document.clone());
    let dom = WebDom::new(document);
    let canvas = dom.by_id("restart-test").unwrap();
    let config = HeroConfig {
        min_viewport_width: 0.0,
        ..HeroConfig::default()
    };

    let first = HeroEffect::activate(host.clone(), dom.canvas_surface(&canvas).unwrap(), config.clone())
        .expect("first activation");
    first.deactivate();

    let second = HeroEffect::activate(host.clone(), dom.canvas_surface(&canvas).unwrap(), config)
        .expect("second activation on the same canvas");
    assert_eq!(second.status(), HeroStatus::Running);
    second.deactivate();
    root.remove();
}
