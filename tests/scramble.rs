#![cfg(not(target_arch = "wasm32"))]

use std::cell::Cell;
use std::rc::Rc;

use clubfx::config::{DigitalRevealConfig, ScrambleConfig};
use clubfx::dom::Dom;
use clubfx::headless::{element, ElementId, Harness};
use clubfx::{DigitalReveal, Outcome, TextScramble};

fn scramble(text: &str, seed: u64) -> (Harness, ElementId, TextScramble<clubfx::headless::MemoryDom>) {
    let h = Harness::desktop();
    let el = h.dom.insert(element("h1").text(text));
    let fx = TextScramble::new(h.host(), h.dom.clone(), el, ScrambleConfig::default(), seed);
    (h, el, fx)
}

fn run_frames(h: &Harness, frames: usize) {
    for _ in 0..frames {
        h.host.tick(16.0);
    }
}

#[test]
fn settles_on_exactly_the_new_text() {
    for seed in 0..8 {
        let (h, el, fx) = scramble("AAA", seed);
        let done = fx.set_text("BBB");
        // windows end by frame 58 at the latest
        assert!(fx.frames_remaining() <= 58);
        run_frames(&h, 80);
        assert_eq!(done.outcome(), Some(Outcome::Settled), "seed {seed}");
        assert_eq!(h.dom.text(&el), "BBB");
        assert!(!fx.is_animating());
        assert_eq!(h.host.live_frames(), 0);
    }
}

#[test]
fn every_frame_shows_old_new_or_scramble_glyphs() {
    let alphabet: Vec<char> = ScrambleConfig::default().alphabet.chars().collect();
    let (h, el, fx) = scramble("AAA", 42);
    fx.set_text("BBB");
    run_frames(&h, 80);

    let history = h.dom.text_history(el);
    assert!(history.len() > 2);
    for shown in &history[1..] {
        assert!(shown.chars().count() <= 3, "{shown}");
        for ch in shown.chars() {
            assert!(ch == 'A' || ch == 'B' || alphabet.contains(&ch), "{ch:?} in {shown:?}");
        }
    }
}

#[test]
fn length_changes_settle_both_ways() {
    let (h, el, fx) = scramble("Hi", 1);
    fx.set_text("Hello");
    run_frames(&h, 80);
    assert_eq!(h.dom.text(&el), "Hello");

    fx.set_text("Hi");
    run_frames(&h, 80);
    assert_eq!(h.dom.text(&el), "Hi");
}

#[test]
fn empty_to_empty_settles_immediately() {
    let (h, _el, fx) = scramble("", 3);
    let done = fx.set_text("");
    assert_eq!(done.outcome(), Some(Outcome::Settled));
    assert_eq!(h.host.live_frames(), 0);
}

#[test]
fn a_new_text_supersedes_the_old_one() {
    let (h, el, fx) = scramble("start", 5);
    let first = fx.set_text("first");
    h.host.tick(16.0);
    let second = fx.set_text("second");
    assert_eq!(first.outcome(), Some(Outcome::Superseded));
    assert!(!second.is_resolved());

    run_frames(&h, 80);
    assert_eq!(second.outcome(), Some(Outcome::Settled));
    assert_eq!(h.dom.text(&el), "second");
    assert_eq!(h.host.live_frames(), 0);
}

#[test]
fn cancel_freezes_the_element() {
    let (h, el, fx) = scramble("AAAAAAAA", 9);
    let done = fx.set_text("BBBBBBBB");
    run_frames(&h, 3);
    fx.cancel();
    assert_eq!(done.outcome(), Some(Outcome::Cancelled));
    assert_eq!(h.host.live_frames(), 0);

    let frozen = h.dom.text(&el);
    run_frames(&h, 80);
    assert_eq!(h.dom.text(&el), frozen);
}

#[test]
fn completion_waiters_run_once() {
    let (h, _el, fx) = scramble("ab", 11);
    let done = fx.set_text("cd");
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    done.on_complete(move |outcome| {
        assert_eq!(outcome, Outcome::Settled);
        counter.set(counter.get() + 1);
    });
    run_frames(&h, 80);
    fx.cancel();
    assert_eq!(calls.get(), 1);

    // Late subscribers see the outcome right away.
    let late = Rc::new(Cell::new(false));
    let seen = late.clone();
    done.on_complete(move |_| seen.set(true));
    assert!(late.get());
}

#[test]
fn dropping_the_scramble_stops_its_frames() {
    let (h, _el, fx) = scramble("AAAA", 13);
    fx.set_text("BBBB");
    h.host.tick(16.0);
    drop(fx);
    assert_eq!(h.host.live_frames(), 0);
}

#[test]
fn digital_reveal_settles_on_the_original_text() {
    let h = Harness::desktop();
    let el = h.dom.insert(element("span").class("digital-reveal").text("HIMA 2024"));
    let fx = DigitalReveal::start(h.host(), h.dom.clone(), el, DigitalRevealConfig::default(), 21);
    assert!(fx.pending_timers() > 0);
    // Slots start hidden but keep their characters for layout.
    assert!(h.dom.html(el).unwrap().contains("opacity:0"));

    h.host.advance(3000.0);
    assert_eq!(fx.completion().outcome(), Some(Outcome::Settled));
    assert_eq!(h.dom.text(&el), "HIMA 2024");
    assert_eq!(fx.pending_timers(), 0);
    assert_eq!(h.host.live_timers(), 0);
    assert!(!h.dom.html(el).unwrap().contains("opacity:0.5"));
}

#[test]
fn digital_reveal_shuffles_before_settling() {
    let h = Harness::desktop();
    let el = h.dom.insert(element("span").text("AB"));
    let _fx = DigitalReveal::start(h.host(), h.dom.clone(), el, DigitalRevealConfig::default(), 2);
    h.host.advance(1.0);
    assert!(h.dom.html(el).unwrap().contains("opacity:0.5"));
    // ten shuffles at 40 ms
    h.host.advance(420.0);
    let html = h.dom.html(el).unwrap();
    assert!(html.starts_with("<span style=\"display:inline-block;min-width:auto;opacity:1;"), "{html}");
}

#[test]
fn cancelled_digital_reveal_clears_its_timers() {
    let h = Harness::desktop();
    let el = h.dom.insert(element("span").text("ABCDEF"));
    let fx = DigitalReveal::start(h.host(), h.dom.clone(), el, DigitalRevealConfig::default(), 4);
    h.host.advance(100.0);
    fx.cancel();
    assert_eq!(fx.completion().outcome(), Some(Outcome::Cancelled));
    assert_eq!(h.host.live_timers(), 0);
}

#[test]
fn empty_digital_reveal_is_settled() {
    let h = Harness::desktop();
    let el = h.dom.insert(element("span"));
    let fx = DigitalReveal::start(h.host(), h.dom.clone(), el, DigitalRevealConfig::default(), 0);
    assert_eq!(fx.completion().outcome(), Some(Outcome::Settled));
    assert_eq!(h.host.live_timers(), 0);
}
