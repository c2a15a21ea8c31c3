#![cfg(not(target_arch = "wasm32"))]

use std::rc::Rc;

use clubfx::config::HeroConfig;
use clubfx::headless::{Harness, RecordingSurface};
use clubfx::hero::render::Surface;
use clubfx::host::HostEvent;
use clubfx::{FxError, HeroEffect, HeroStatus};

const FONT: &str = r#"{
    "resolution": 1000,
    "glyphs": {
        "H": { "ha": 700, "o": "m 100 0 l 100 700 m 600 0 l 600 700 m 100 350 l 600 350" },
        "I": { "ha": 300, "o": "m 150 0 l 150 700" }
    }
}"#;

fn setup() -> (Harness, Rc<RecordingSurface>) {
    (Harness::desktop(), RecordingSurface::new("#three-canvas", 1280, 800))
}

fn activate(h: &Harness, surface: &Rc<RecordingSurface>) -> HeroEffect {
    HeroEffect::activate(h.host(), surface.clone(), HeroConfig::default()).unwrap()
}

#[test]
fn renders_until_deactivated() {
    let (h, surface) = setup();
    let hero = activate(&h, &surface);
    assert!(surface.is_claimed());
    assert_eq!(hero.status(), HeroStatus::Running);
    // two wireframe shells, geometry + material each
    assert_eq!(hero.resource_count(), 4);
    assert_eq!(surface.stats().live_resources(), 4);

    h.host.run_for(100.0);
    assert!(hero.frames_rendered() >= 5);
    assert_eq!(surface.stats().renders.get(), hero.frames_rendered());
    assert_eq!(surface.stats().last_draw_count.get(), 2);

    hero.deactivate();
    let renders = surface.stats().renders.get();
    h.host.run_for(100.0);
    assert_eq!(surface.stats().renders.get(), renders);
    assert_eq!(hero.status(), HeroStatus::Released);
}

#[test]
fn repeated_cycles_leave_nothing_behind() {
    let (h, surface) = setup();
    for _ in 0..25 {
        let hero = activate(&h, &surface);
        h.host.tick(16.0);
        h.host.dispatch(&HostEvent::PointerMove { x: 10.0, y: 10.0 });
        hero.deactivate();
    }
    assert_eq!(h.host.live_frames(), 0);
    assert_eq!(h.host.live_listeners(), 0);
    assert_eq!(surface.stats().live_resources(), 0);
    assert_eq!(surface.stats().disposes.get(), 25);
    assert!(!surface.is_claimed());

    // Every font request resolves after its owner is gone.
    while h.host.complete_fetch(Ok(FONT.to_string())).is_some() {}
    assert_eq!(surface.stats().live_resources(), 0);
}

#[test]
fn deactivate_is_idempotent() {
    let (h, surface) = setup();
    let hero = activate(&h, &surface);
    hero.deactivate();
    hero.deactivate();
    drop(hero);
    assert_eq!(surface.stats().disposes.get(), 1);
    assert!(!surface.is_claimed());
}

#[test]
fn dropping_the_handle_deactivates() {
    let (h, surface) = setup();
    drop(activate(&h, &surface));
    assert!(!surface.is_claimed());
    assert_eq!(h.host.live_frames(), 0);
    assert_eq!(h.host.live_listeners(), 0);
}

#[test]
fn narrow_viewport_is_a_no_op() {
    let h = Harness::new(600.0, 900.0);
    let surface = RecordingSurface::new("#three-canvas", 600, 900);
    let err = HeroEffect::activate(h.host(), surface.clone(), HeroConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, FxError::ViewportTooNarrow { width, .. } if width == 600.0));
    assert!(!surface.is_claimed());
    assert_eq!(surface.stats().contexts_created.get(), 0);
    assert_eq!(h.host.live_frames(), 0);
    assert_eq!(h.host.live_listeners(), 0);
    assert!(h.host.pending_fetches().is_empty());
}

#[test]
fn a_claimed_surface_is_refused() {
    let (h, surface) = setup();
    let first = activate(&h, &surface);
    let second = HeroEffect::activate(h.host(), surface.clone(), HeroConfig::default());
    assert!(matches!(second, Err(FxError::SurfaceBusy(_))));

    h.host.tick(16.0);
    assert_eq!(first.frames_rendered(), 1);

    first.deactivate();
    let third = activate(&h, &surface);
    assert!(third.is_active());
}

#[test]
fn failed_context_releases_the_claim() {
    let (h, surface) = setup();
    surface.fail_next_context(FxError::CapabilityUnavailable("webgl2".into()));
    let result = HeroEffect::activate(h.host(), surface.clone(), HeroConfig::default());
    assert!(matches!(result, Err(FxError::CapabilityUnavailable(_))));
    assert!(!surface.is_claimed());
    assert_eq!(h.host.live_listeners(), 0);
}

#[test]
fn lost_context_stops_the_loop() {
    let (h, surface) = setup();
    let hero = activate(&h, &surface);
    h.host.tick(16.0);
    surface.lose_context();
    h.host.tick(16.0);
    assert_eq!(hero.status(), HeroStatus::Stopped);
    assert_eq!(h.host.live_frames(), 0);

    let renders = surface.stats().renders.get();
    h.host.run_for(200.0);
    assert_eq!(surface.stats().renders.get(), renders);

    // Neither a restored context nor a slide change restarts a stopped hero.
    surface.restore_context();
    h.host.dispatch(&HostEvent::SlideChanged { index: 0 });
    assert_eq!(h.host.live_frames(), 0);
    assert_eq!(hero.status(), HeroStatus::Stopped);

    hero.deactivate();
    assert_eq!(surface.stats().live_resources(), 0);
    assert!(!surface.is_claimed());
}

#[test]
fn restarts_on_the_same_surface() {
    let (h, surface) = setup();
    let first = activate(&h, &surface);
    h.host.tick(16.0);
    first.deactivate();

    let second = activate(&h, &surface);
    h.host.tick(16.0);
    assert_eq!(second.status(), HeroStatus::Running);
    assert_eq!(second.frames_rendered(), 1);
    assert_eq!(surface.stats().contexts_created.get(), 2);
    second.deactivate();
    assert_eq!(surface.stats().live_resources(), 0);
}

#[test]
fn a_lost_surface_refuses_new_heroes_until_restored() {
    let (h, surface) = setup();
    surface.lose_context();
    let result = HeroEffect::activate(h.host(), surface.clone(), HeroConfig::default());
    assert!(matches!(result, Err(FxError::ContextLost)));
    assert!(!surface.is_claimed());

    surface.restore_context();
    let hero = activate(&h, &surface);
    h.host.tick(16.0);
    assert_eq!(hero.frames_rendered(), 1);
}

#[test]
fn label_attaches_when_the_font_arrives() {
    let (h, surface) = setup();
    let hero = activate(&h, &surface);
    assert_eq!(h.host.pending_fetches(), vec![HeroConfig::default().label.font_url]);
    h.host.complete_fetch(Ok(FONT.to_string()));
    assert!(hero.has_label());
    assert_eq!(hero.resource_count(), 6);
    assert_eq!(surface.stats().live_resources(), 6);

    h.host.tick(16.0);
    assert_eq!(surface.stats().last_draw_count.get(), 3);

    hero.deactivate();
    assert_eq!(surface.stats().live_resources(), 0);
}

#[test]
fn late_font_is_ignored() {
    let (h, surface) = setup();
    let hero = activate(&h, &surface);
    hero.deactivate();
    assert!(h.host.complete_fetch(Ok(FONT.to_string())).is_some());
    assert!(!hero.has_label());
    assert_eq!(surface.stats().live_resources(), 0);
}

#[test]
fn font_failure_leaves_the_hero_running() {
    let (h, surface) = setup();
    let hero = activate(&h, &surface);
    h.host.complete_fetch(Err(FxError::AssetLoad {
        url: "font.json".into(),
        reason: "HTTP 404".into(),
    }));
    assert!(!hero.has_label());
    assert_eq!(hero.status(), HeroStatus::Running);
}

#[test]
fn slide_changes_pause_and_resume() {
    let (h, surface) = setup();
    let hero = activate(&h, &surface);
    h.host.tick(16.0);

    h.host.dispatch(&HostEvent::SlideChanged { index: 2 });
    assert_eq!(hero.status(), HeroStatus::Paused);
    assert_eq!(h.host.live_frames(), 0);
    let renders = surface.stats().renders.get();
    h.host.run_for(100.0);
    assert_eq!(surface.stats().renders.get(), renders);

    h.host.dispatch(&HostEvent::SlideChanged { index: 0 });
    assert_eq!(hero.status(), HeroStatus::Running);
    h.host.tick(16.0);
    assert_eq!(surface.stats().renders.get(), renders + 1);
}

#[test]
fn hidden_page_and_hidden_slide_both_hold_the_pause() {
    let (h, surface) = setup();
    let hero = activate(&h, &surface);
    h.host.dispatch(&HostEvent::Visibility { visible: false });
    h.host.dispatch(&HostEvent::SlideChanged { index: 1 });
    h.host.dispatch(&HostEvent::Visibility { visible: true });
    assert_eq!(hero.status(), HeroStatus::Paused);
    h.host.dispatch(&HostEvent::SlideChanged { index: 0 });
    assert_eq!(hero.status(), HeroStatus::Running);
    assert_eq!(h.host.live_frames(), 1);
}

#[test]
fn pointer_tilt_is_damped() {
    let (h, surface) = setup();
    let hero = activate(&h, &surface);
    // bottom-right corner: full tilt on both axes
    h.host.dispatch(&HostEvent::PointerMove { x: 1280.0, y: 800.0 });
    h.host.tick(16.0);
    let [rx, ry] = hero.rotation();
    assert!((rx - 0.025).abs() < 1e-12, "{rx}");
    assert!((ry - 0.025).abs() < 1e-12, "{ry}");

    for _ in 0..300 {
        h.host.tick(16.0);
    }
    let [rx, ry] = hero.rotation();
    assert!((rx - 0.5).abs() < 1e-3 && (ry - 0.5).abs() < 1e-3);
}

#[test]
fn resize_updates_the_drawing_buffer() {
    let (h, surface) = setup();
    let _hero = activate(&h, &surface);
    assert_eq!(surface.stats().last_size.get(), (1280, 800));
    h.host.resize(1600.0, 900.0);
    assert_eq!(surface.stats().last_size.get(), (1600, 900));
}
