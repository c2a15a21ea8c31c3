#![cfg(not(target_arch = "wasm32"))]

use std::cell::RefCell;
use std::rc::Rc;

use clubfx::dom::Dom;
use clubfx::headless::{element, ElementId, Harness, MemoryDom};
use clubfx::hero::render::Surface;
use clubfx::host::HostEvent;
use clubfx::{PageKind, PageRuntime, SiteConfig};

type Runtime = Rc<RefCell<PageRuntime<MemoryDom>>>;

fn start(h: &Harness, kind: PageKind) -> Runtime {
    PageRuntime::start(kind, h.host(), h.dom.clone(), Rc::new(SiteConfig::default()))
}

fn opacity(runtime: &Runtime, el: ElementId) -> f64 {
    runtime.borrow().context().tweens.state_of(&el).opacity
}

struct Home {
    canvas: ElementId,
    counter: ElementId,
    card: ElementId,
    title: ElementId,
    scrambled: ElementId,
}

fn home_page(h: &Harness) -> Home {
    let dom = &h.dom;
    let canvas = dom.insert(element("canvas").id("three-canvas").at(0.0, 800.0));
    let title = dom.insert(element("h1").id("hero-title").text("Himpunan").at(200.0, 60.0));
    dom.insert(element("p").id("hero-subtitle").at(280.0, 30.0));
    let scrambled = dom.insert(element("span").attr("data-scramble", "HIMA TI").text("HIMA").at(320.0, 20.0));
    let card = dom.insert(element("div").class("stat-card").at(1500.0, 120.0));
    let counter = dom.insert(element("span").class("stat-number").text("1234").inside(card).at(1520.0, 40.0));
    Home {
        canvas,
        counter,
        card,
        title,
        scrambled,
    }
}

#[test]
fn home_counts_up_once_when_scrolled_into_view() {
    let h = Harness::desktop();
    let home = home_page(&h);
    let runtime = start(&h, PageKind::Home);
    assert_eq!(h.dom.text(&home.counter), "0");

    h.host.run_for(500.0);
    assert_eq!(h.dom.text(&home.counter), "0");

    // top 60% of an 800px viewport is 480px
    h.scroll_to(1100.0);
    h.host.run_for(2000.0);
    assert_eq!(h.dom.text(&home.counter), "1234");
    assert_eq!(h.dom.attr(&home.counter, "data-animated").as_deref(), Some("true"));

    let shown: Vec<u64> = h.dom.text_history(home.counter)[1..]
        .iter()
        .map(|t| t.parse().unwrap())
        .collect();
    assert!(shown.len() > 3);
    assert!(shown.windows(2).all(|w| w[0] <= w[1]), "{shown:?}");

    let entries = h.dom.text_history(home.counter).len();
    h.scroll_to(0.0);
    h.scroll_to(1100.0);
    h.host.run_for(2000.0);
    assert_eq!(h.dom.text_history(home.counter).len(), entries);
    drop(runtime);
}

#[test]
fn home_runs_the_hero_and_releases_it_on_unload() {
    let h = Harness::desktop();
    let home = home_page(&h);
    let _runtime = start(&h, PageKind::Home);
    let surface = h.dom.surface(home.canvas).unwrap();
    assert!(surface.is_claimed());
    h.host.run_for(100.0);
    assert!(surface.stats().renders.get() > 0);

    h.host.dispatch(&HostEvent::Unload);
    assert!(!surface.is_claimed());
    assert_eq!(surface.stats().live_resources(), 0);
    assert_eq!(h.host.live_frames(), 0);
    assert_eq!(h.host.live_timers(), 0);
    assert_eq!(h.dom.listener_count(), 0);
    // only the unload hook itself remains
    assert_eq!(h.host.live_listeners(), 1);
}

#[test]
fn home_skips_the_hero_on_narrow_screens() {
    let h = Harness::new(390.0, 844.0);
    let home = home_page(&h);
    let _runtime = start(&h, PageKind::Home);
    let surface = h.dom.surface(home.canvas).unwrap();
    assert!(!surface.is_claimed());
    assert_eq!(surface.stats().contexts_created.get(), 0);

    h.host.run_for(2000.0);
    assert_eq!(h.dom.text(&home.scrambled), "HIMA TI");
}

#[test]
fn home_intro_and_hover() {
    let h = Harness::desktop();
    let home = home_page(&h);
    let runtime = start(&h, PageKind::Home);
    assert_eq!(h.dom.style(home.title, "opacity"), None);
    h.host.run_for(1500.0);
    // the stylesheet hides the title; the timeline writes it back in
    assert_eq!(h.dom.style(home.title, "opacity").as_deref(), Some("1"));
    assert_eq!(runtime.borrow().context().tweens.active_len(), 0);

    h.dom.hover(home.card);
    h.host.run_for(400.0);
    let lifted = runtime.borrow().context().tweens.state_of(&home.card).y;
    assert!((lifted + 4.0).abs() < 1e-9, "{lifted}");
    h.dom.unhover(home.card);
    h.host.run_for(400.0);
    let settled = runtime.borrow().context().tweens.state_of(&home.card).y;
    assert!(settled.abs() < 1e-9);
}

#[test]
fn reinit_never_doubles_registrations() {
    let h = Harness::desktop();
    let home = home_page(&h);
    let runtime = start(&h, PageKind::Home);
    let dom_listeners = h.dom.listener_count();
    let host_listeners = h.host.live_listeners();
    let triggers = runtime.borrow().context().triggers.len();

    for _ in 0..3 {
        runtime.borrow_mut().init();
    }
    assert_eq!(runtime.borrow().init_count(), 4);
    assert_eq!(h.dom.listener_count(), dom_listeners);
    assert_eq!(h.host.live_listeners(), host_listeners);
    assert_eq!(runtime.borrow().context().triggers.len(), triggers);
    assert!(h.dom.surface(home.canvas).unwrap().is_claimed());

    // The counter still knows its target after being reset to zero.
    h.scroll_to(1100.0);
    h.host.run_for(2000.0);
    assert_eq!(h.dom.text(&home.counter), "1234");
}

#[test]
fn reinit_mid_effect_settles_on_the_original_text() {
    let h = Harness::desktop();
    home_page(&h);
    let digital = h.dom.insert(element("p").class("digital-reveal").text("HIMA 2024").at(400.0, 20.0));
    let plain = h.dom.insert(element("h2").attr("data-scramble", "").text("Visi Misi").at(440.0, 30.0));
    let runtime = start(&h, PageKind::Home);

    h.host.run_for(120.0);
    runtime.borrow_mut().init();
    h.host.run_for(5000.0);
    assert_eq!(h.dom.text(&digital), "HIMA 2024");
    assert_eq!(h.dom.text(&plain), "Visi Misi");
    assert_eq!(h.dom.attr(&digital, "data-text").as_deref(), Some("HIMA 2024"));
}

struct Courses {
    cards: Vec<ElementId>,
    headers: Vec<ElementId>,
    details: Vec<ElementId>,
    arrows: Vec<ElementId>,
}

fn academics_page(h: &Harness) -> Courses {
    let dom = &h.dom;
    let grid = dom.insert(element("section").id("courses-grid").at(1000.0, 900.0));
    let mut page = Courses {
        cards: Vec::new(),
        headers: Vec::new(),
        details: Vec::new(),
        arrows: Vec::new(),
    };
    for i in 0..3 {
        let top = 1000.0 + i as f64 * 300.0;
        let card = dom.insert(element("article").class("course-card").inside(grid).at(top, 280.0));
        let header = dom.insert(element("button").class("course-header").inside(card).at(top, 60.0));
        let arrow = dom.insert(element("span").class("course-arrow").inside(header).at(top, 20.0));
        let details = dom.insert(
            element("div")
                .class("course-details hidden")
                .inside(card)
                .at(top + 60.0, 0.0)
                .natural_height(120.0),
        );
        page.cards.push(card);
        page.headers.push(header);
        page.details.push(details);
        page.arrows.push(arrow);
    }
    page
}

#[test]
fn course_cards_reveal_once_with_a_stagger() {
    let h = Harness::desktop();
    let page = academics_page(&h);
    let runtime = start(&h, PageKind::Academics);
    for card in &page.cards {
        assert_eq!(h.dom.style(*card, "opacity").as_deref(), Some("0"));
        assert_eq!(opacity(&runtime, *card), 0.0);
    }

    // top 80% of 800px is 640px: the grid crosses at scroll 360
    h.scroll_to(300.0);
    h.host.run_for(500.0);
    assert_eq!(opacity(&runtime, page.cards[0]), 0.0);

    h.scroll_to(400.0);
    h.host.run_for(200.0);
    assert!(opacity(&runtime, page.cards[0]) > 0.0);
    // third card waits 0.3 s
    assert_eq!(opacity(&runtime, page.cards[2]), 0.0);

    h.host.run_for(1500.0);
    for card in &page.cards {
        assert!((opacity(&runtime, *card) - 1.0).abs() < 1e-9);
    }
    let triggers = runtime.borrow().context().triggers.fired();
    assert_eq!(triggers, 1);

    h.scroll_to(0.0);
    h.scroll_to(400.0);
    assert_eq!(runtime.borrow().context().triggers.fired(), 1);
}

#[test]
fn course_details_toggle_independently() {
    let h = Harness::desktop();
    let page = academics_page(&h);
    let runtime = start(&h, PageKind::Academics);
    assert_eq!(h.dom.style(page.details[0], "height").as_deref(), Some("0px"));

    // clicks on the arrow bubble to the header
    h.dom.click(page.arrows[0]);
    h.host.run_for(100.0);
    let opening = runtime.borrow().context().tweens.state_of(&page.details[0]).height;
    assert!(matches!(opening, Some(px) if px > 0.0 && px < 120.0), "{opening:?}");
    h.host.run_for(400.0);
    assert_eq!(h.dom.style(page.details[0], "height").as_deref(), Some("auto"));
    assert!(!h.dom.has_class(page.details[0], "hidden"));
    assert!((runtime.borrow().context().tweens.state_of(&page.arrows[0]).rotate - 180.0).abs() < 1e-9);

    assert_eq!(h.dom.style(page.details[1], "height").as_deref(), Some("0px"));
    assert!(h.dom.has_class(page.details[1], "hidden"));

    h.dom.click(page.headers[0]);
    h.host.run_for(500.0);
    assert_eq!(h.dom.style(page.details[0], "height").as_deref(), Some("0px"));
    assert!(h.dom.has_class(page.details[0], "hidden"));
    assert!(runtime.borrow().context().tweens.state_of(&page.arrows[0]).rotate.abs() < 1e-9);
}

#[test]
fn reinit_closes_an_open_course_card() {
    let h = Harness::desktop();
    let page = academics_page(&h);
    let runtime = start(&h, PageKind::Academics);
    h.dom.click(page.headers[0]);
    h.host.run_for(600.0);
    assert!(!h.dom.has_class(page.details[0], "hidden"));

    runtime.borrow_mut().init();
    let rotate = runtime.borrow().context().tweens.state_of(&page.arrows[0]).rotate;
    assert!(rotate.abs() < 1e-9, "{rotate}");
    assert_eq!(
        h.dom.style(page.arrows[0], "transform").as_deref(),
        Some("translateY(0px) scale(1) rotate(0deg)")
    );
    assert!(h.dom.has_class(page.details[0], "hidden"));
    assert_eq!(h.dom.style(page.details[0], "height").as_deref(), Some("0px"));

    // one click opens it again
    h.dom.click(page.headers[0]);
    h.host.run_for(500.0);
    assert_eq!(h.dom.style(page.details[0], "height").as_deref(), Some("auto"));
    assert!(!h.dom.has_class(page.details[0], "hidden"));
}

struct Members {
    buttons: Vec<ElementId>,
    cards: Vec<ElementId>,
}

fn members_page(h: &Harness) -> Members {
    let dom = &h.dom;
    let buttons = ["all", "ketua", "anggota"]
        .iter()
        .map(|f| dom.insert(element("button").class("filter-btn bg-gray-200 text-gray-700").attr("data-filter", f)))
        .collect();
    let grid = dom.insert(element("div").id("anggota-grid").at(100.0, 600.0));
    let cards = ["ketua", "anggota", "anggota"]
        .iter()
        .enumerate()
        .map(|(i, role)| {
            dom.insert(
                element("div")
                    .class("student-card")
                    .attr("data-role", role)
                    .inside(grid)
                    .at(100.0 + i as f64 * 200.0, 180.0),
            )
        })
        .collect();
    Members { buttons, cards }
}

#[test]
fn member_filter_shows_matching_roles() {
    let h = Harness::desktop();
    let page = members_page(&h);
    let runtime = start(&h, PageKind::Members);
    // the grid starts inside the viewport, so the reveal runs straight away
    h.host.run_for(1000.0);
    assert!((opacity(&runtime, page.cards[2]) - 1.0).abs() < 1e-9);

    h.dom.click(page.buttons[1]);
    h.host.run_for(500.0);
    assert_eq!(h.dom.style(page.cards[0], "display").as_deref(), Some("block"));
    assert_eq!(h.dom.style(page.cards[1], "display").as_deref(), Some("none"));
    assert_eq!(h.dom.style(page.cards[2], "display").as_deref(), Some("none"));
    assert!(opacity(&runtime, page.cards[1]).abs() < 1e-9);
    let scale = runtime.borrow().context().tweens.state_of(&page.cards[1]).scale;
    assert!((scale - 0.8).abs() < 1e-9);

    assert!(h.dom.has_class(page.buttons[1], "bg-primary-600"));
    assert!(!h.dom.has_class(page.buttons[1], "bg-gray-200"));
    assert!(h.dom.has_class(page.buttons[0], "bg-gray-200"));
    assert!(!h.dom.has_class(page.buttons[0], "text-white"));

    h.dom.click(page.buttons[0]);
    h.host.run_for(500.0);
    for card in &page.cards {
        assert_eq!(h.dom.style(*card, "display").as_deref(), Some("block"));
        assert!((opacity(&runtime, *card) - 1.0).abs() < 1e-9);
    }
}

#[test]
fn member_cards_grow_on_hover() {
    let h = Harness::desktop();
    let page = members_page(&h);
    let runtime = start(&h, PageKind::Members);
    h.host.run_for(1000.0);
    h.dom.hover(page.cards[0]);
    h.host.run_for(300.0);
    let scale = runtime.borrow().context().tweens.state_of(&page.cards[0]).scale;
    assert!((scale - 1.02).abs() < 1e-9);
    h.dom.unhover(page.cards[0]);
    h.host.run_for(300.0);
    let scale = runtime.borrow().context().tweens.state_of(&page.cards[0]).scale;
    assert!((scale - 1.0).abs() < 1e-9);
}

#[test]
fn gallery_items_reveal_on_their_own_crossing() {
    let h = Harness::desktop();
    let dom = &h.dom;
    let near = dom.insert(element("figure").class("gallery-item").at(300.0, 200.0));
    let near_img = dom.insert(element("img").inside(near).at(300.0, 200.0));
    let far = dom.insert(element("figure").class("gallery-item").at(1500.0, 200.0));
    let runtime = start(&h, PageKind::Gallery);

    h.host.run_for(1000.0);
    assert!((opacity(&runtime, near) - 1.0).abs() < 1e-9);
    assert_eq!(opacity(&runtime, far), 0.0);

    // top 90% of 800px is 720px
    h.scroll_to(900.0);
    h.host.run_for(1000.0);
    assert!((opacity(&runtime, far) - 1.0).abs() < 1e-9);
    assert_eq!(runtime.borrow().context().triggers.len(), 0);

    h.dom.hover(near);
    h.host.run_for(600.0);
    let zoom = runtime.borrow().context().tweens.state_of(&near_img).scale;
    assert!((zoom - 1.1).abs() < 1e-9);
}

#[test]
fn pages_without_their_markup_do_nothing() {
    for kind in [PageKind::Home, PageKind::Academics, PageKind::Members, PageKind::Gallery] {
        let h = Harness::desktop();
        let runtime = start(&h, kind);
        h.host.run_for(500.0);
        assert!(runtime.borrow().is_initialized());
        assert_eq!(runtime.borrow().context().triggers.len(), 0);
        assert_eq!(h.dom.listener_count(), 0);
    }
}
