//! Text effects that settle character by character: the frame-driven
//! [`TextScramble`] and the timer-driven [`DigitalReveal`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::{DigitalRevealConfig, ScrambleConfig};
use crate::dom::Dom;
use crate::host::{FrameCallback, FrameHandle, Host, TimerHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Settled,
    Cancelled,
    /// A newer `set_text` replaced this animation.
    Superseded,
}

#[derive(Default)]
struct CompletionInner {
    outcome: Option<Outcome>,
    waiters: Vec<Box<dyn FnOnce(Outcome)>>,
}

/// Resolves once with the way an animation ended.
#[derive(Clone, Default)]
pub struct Completion {
    inner: Rc<RefCell<CompletionInner>>,
}

impl Completion {
    pub fn outcome(&self) -> Option<Outcome> {
        self.inner.borrow().outcome
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome().is_some()
    }

    /// Run `f` when resolved, or right away if it already is.
    pub fn on_complete(&self, f: impl FnOnce(Outcome) + 'static) {
        let resolved = self.inner.borrow().outcome;
        match resolved {
            Some(outcome) => f(outcome),
            None => self.inner.borrow_mut().waiters.push(Box::new(f)),
        }
    }

    fn resolve(&self, outcome: Outcome) {
        let waiters = {
            let mut inner = self.inner.borrow_mut();
            if inner.outcome.is_some() {
                return;
            }
            inner.outcome = Some(outcome);
            std::mem::take(&mut inner.waiters)
        };
        for waiter in waiters {
            waiter(outcome);
        }
    }
}

/// One character position as currently displayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    /// Original or final character.
    Plain(char),
    /// A glyph from the scramble alphabet.
    Scrambling(char),
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    from: Option<char>,
    to: Option<char>,
    start: u32,
    end: u32,
    glyph: Option<char>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScramblePhase {
    Idle,
    Animating,
}

struct ScrambleState<D: Dom> {
    host: Rc<dyn Host>,
    dom: Rc<D>,
    el: D::Element,
    alphabet: Vec<char>,
    config: ScrambleConfig,
    rng: SmallRng,
    queue: Vec<Slot>,
    cells: Vec<Cell>,
    frame: u32,
    phase: ScramblePhase,
    pending: Option<FrameHandle>,
    tick: Option<FrameCallback>,
    completion: Option<Completion>,
}

impl<D: Dom> ScrambleState<D> {
    fn random_glyph(&mut self) -> char {
        self.alphabet[self.rng.random_range(0..self.alphabet.len())]
    }

    fn stop_frames(&mut self) {
        if let Some(frame) = self.pending.take() {
            self.host.cancel_frame(frame);
        }
    }

    /// Render the current frame; returns the completion if every slot has
    /// settled.
    fn update(&mut self) -> Option<Completion> {
        if self.phase != ScramblePhase::Animating {
            return None;
        }
        let mut cells = Vec::with_capacity(self.queue.len());
        let mut complete = 0;
        for i in 0..self.queue.len() {
            let slot = self.queue[i];
            if self.frame >= slot.end {
                complete += 1;
                cells.extend(slot.to.map(Cell::Plain));
            } else if self.frame >= slot.start {
                let glyph = match slot.glyph {
                    Some(g) if !self.rng.random_bool(self.config.reroll_chance.clamp(0.0, 1.0)) => g,
                    _ => self.random_glyph(),
                };
                self.queue[i].glyph = Some(glyph);
                cells.push(Cell::Scrambling(glyph));
            } else {
                cells.extend(slot.from.map(Cell::Plain));
            }
        }
        self.dom.set_html(&self.el, &render_html(&cells));
        self.cells = cells;

        if complete == self.queue.len() {
            self.phase = ScramblePhase::Idle;
            self.pending = None;
            self.completion.take()
        } else {
            self.frame += 1;
            if self.pending.is_none() {
                if let Some(tick) = self.tick.clone() {
                    self.pending = Some(self.host.request_frame(tick));
                }
            }
            None
        }
    }
}

fn escape(ch: char, out: &mut String) {
    match ch {
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '&' => out.push_str("&amp;"),
        '"' => out.push_str("&quot;"),
        c => out.push(c),
    }
}

fn render_html(cells: &[Cell]) -> String {
    let mut html = String::new();
    for cell in cells {
        match *cell {
            Cell::Plain(c) => escape(c, &mut html),
            Cell::Scrambling(c) => {
                html.push_str("<span class=\"opacity-40 text-azure\">");
                escape(c, &mut html);
                html.push_str("</span>");
            }
        }
    }
    html
}

const SOURCE_ATTR: &str = "data-text";

/// The text an effect should end on. The first call copies the element's
/// text into an attribute; later calls read it back, so a restart in the
/// middle of an effect never picks up half-scrambled glyphs.
pub fn source_text<D: Dom>(dom: &D, el: &D::Element) -> String {
    if let Some(text) = dom.attr(el, SOURCE_ATTR) {
        return text;
    }
    let text = dom.text(el);
    dom.set_attr(el, SOURCE_ATTR, &text);
    text
}

/// Scrambles an element's text into new text, one frame at a time.
///
/// Each position switches from the old character to random glyphs at a
/// random frame, and to the new character at a later random frame.
pub struct TextScramble<D: Dom> {
    inner: Rc<RefCell<ScrambleState<D>>>,
}

impl<D: Dom + 'static> TextScramble<D> {
    pub fn new(
        host: Rc<dyn Host>,
        dom: Rc<D>,
        el: D::Element,
        config: ScrambleConfig,
        seed: u64,
    ) -> Self {
        let alphabet: Vec<char> = config.alphabet.chars().collect();
        let alphabet = if alphabet.is_empty() { vec!['_'] } else { alphabet };
        let inner = Rc::new(RefCell::new(ScrambleState {
            host,
            dom,
            el,
            alphabet,
            config,
            rng: SmallRng::seed_from_u64(seed),
            queue: Vec::new(),
            cells: Vec::new(),
            frame: 0,
            phase: ScramblePhase::Idle,
            pending: None,
            tick: None,
            completion: None,
        }));
        let weak: Weak<RefCell<ScrambleState<D>>> = Rc::downgrade(&inner);
        inner.borrow_mut().tick = Some(Rc::new(move |_ts| {
            let Some(inner) = weak.upgrade() else { return };
            let done = {
                let mut state = inner.borrow_mut();
                state.pending = None;
                state.update()
            };
            if let Some(done) = done {
                done.resolve(Outcome::Settled);
            }
        }));
        Self { inner }
    }

    /// Start scrambling toward `text`. A scramble already in flight is
    /// replaced and its completion resolves as `Superseded`.
    pub fn set_text(&self, text: &str) -> Completion {
        let completion = Completion::default();
        let (superseded, settled) = {
            let mut state = self.inner.borrow_mut();
            state.stop_frames();
            let superseded = state.completion.take();

            let old: Vec<char> = state.dom.text(&state.el).chars().collect();
            let new: Vec<char> = text.chars().collect();
            let len = old.len().max(new.len());
            let (max_start, max_span) = (state.config.max_start.max(1), state.config.max_span.max(1));
            let mut queue = Vec::with_capacity(len);
            for i in 0..len {
                let start = state.rng.random_range(0..max_start);
                let end = start.saturating_add(state.rng.random_range(0..max_span));
                queue.push(Slot {
                    from: old.get(i).copied(),
                    to: new.get(i).copied(),
                    start,
                    end,
                    glyph: None,
                });
            }
            state.queue = queue;
            state.frame = 0;
            state.phase = ScramblePhase::Animating;
            state.completion = Some(completion.clone());
            (superseded, state.update())
        };
        if let Some(old) = superseded {
            old.resolve(Outcome::Superseded);
        }
        if let Some(done) = settled {
            done.resolve(Outcome::Settled);
        }
        completion
    }

    /// Stop mid-flight. The element keeps whatever it shows right now.
    pub fn cancel(&self) {
        let cancelled = {
            let mut state = self.inner.borrow_mut();
            state.stop_frames();
            state.phase = ScramblePhase::Idle;
            state.completion.take()
        };
        if let Some(c) = cancelled {
            debug!("scramble cancelled");
            c.resolve(Outcome::Cancelled);
        }
    }

    pub fn phase(&self) -> ScramblePhase {
        self.inner.borrow().phase
    }

    pub fn is_animating(&self) -> bool {
        self.phase() == ScramblePhase::Animating
    }

    /// What the last rendered frame showed.
    pub fn cells(&self) -> Vec<Cell> {
        self.inner.borrow().cells.clone()
    }

    /// The last rendered frame as plain text.
    pub fn displayed(&self) -> String {
        self.inner
            .borrow()
            .cells
            .iter()
            .map(|c| match *c {
                Cell::Plain(c) | Cell::Scrambling(c) => c,
            })
            .collect()
    }

    /// Frames left before every position could have settled.
    pub fn frames_remaining(&self) -> u32 {
        let state = self.inner.borrow();
        let last = state.queue.iter().map(|s| s.end).max().unwrap_or(0);
        last.saturating_sub(state.frame)
    }
}

impl<D: Dom> Drop for TextScramble<D> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.try_borrow_mut() {
            state.stop_frames();
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DigitSlot {
    Hidden,
    Shuffling { count: u32, glyph: char },
    Settled,
}

struct RevealState<D: Dom> {
    host: Rc<dyn Host>,
    dom: Rc<D>,
    el: D::Element,
    alphabet: Vec<char>,
    config: DigitalRevealConfig,
    rng: SmallRng,
    text: Vec<char>,
    slots: Vec<DigitSlot>,
    timers: Vec<Option<TimerHandle>>,
    completion: Option<Completion>,
}

impl<D: Dom> RevealState<D> {
    fn render(&self) {
        let mut html = String::new();
        for (ch, slot) in self.text.iter().zip(&self.slots) {
            let width = if *ch == ' ' { "0.3em" } else { "auto" };
            let (opacity, color, shown) = match *slot {
                DigitSlot::Hidden => ("0", "inherit", *ch),
                DigitSlot::Shuffling { glyph, .. } => ("0.5", "#00D1FF", glyph),
                DigitSlot::Settled => ("1", "inherit", *ch),
            };
            html.push_str(&format!(
                "<span style=\"display:inline-block;min-width:{width};opacity:{opacity};color:{color}\">"
            ));
            escape(shown, &mut html);
            html.push_str("</span>");
        }
        self.dom.set_html(&self.el, &html);
    }

    fn all_settled(&self) -> bool {
        self.slots.iter().all(|s| *s == DigitSlot::Settled)
    }
}

/// Reveals an element's own text one character at a time, each slot
/// flickering through random glyphs before it settles.
pub struct DigitalReveal<D: Dom> {
    inner: Rc<RefCell<RevealState<D>>>,
    completion: Completion,
}

impl<D: Dom + 'static> DigitalReveal<D> {
    pub fn start(
        host: Rc<dyn Host>,
        dom: Rc<D>,
        el: D::Element,
        config: DigitalRevealConfig,
        seed: u64,
    ) -> Self {
        let text: Vec<char> = source_text(dom.as_ref(), &el).chars().collect();
        let alphabet: Vec<char> = config.alphabet.chars().collect();
        let alphabet = if alphabet.is_empty() { vec!['#'] } else { alphabet };
        let completion = Completion::default();
        let per_char = if text.is_empty() {
            0.0
        } else {
            config.duration / text.len() as f64
        };
        let inner = Rc::new(RefCell::new(RevealState {
            host: host.clone(),
            dom,
            el,
            alphabet,
            config,
            rng: SmallRng::seed_from_u64(seed),
            slots: vec![DigitSlot::Hidden; text.len()],
            timers: vec![None; text.len()],
            text,
            completion: Some(completion.clone()),
        }));

        let len = inner.borrow().text.len();
        inner.borrow().render();
        if len == 0 {
            inner.borrow_mut().completion = None;
            completion.resolve(Outcome::Settled);
        }
        for index in 0..len {
            let delay_ms = index as f64 * per_char * 0.5 * 1000.0;
            let handle = host.set_timeout(delay_ms, Self::step_callback(Rc::downgrade(&inner), index));
            inner.borrow_mut().timers[index] = Some(handle);
        }
        Self { inner, completion }
    }

    fn step_callback(weak: Weak<RefCell<RevealState<D>>>, index: usize) -> Box<dyn FnOnce()> {
        Box::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            let done = {
                let mut guard = inner.borrow_mut();
                let state = &mut *guard;
                state.timers[index] = None;
                let shuffles = state.config.shuffles;
                let next = match state.slots[index] {
                    DigitSlot::Hidden => Some(0),
                    DigitSlot::Shuffling { count, .. } => Some(count + 1),
                    DigitSlot::Settled => None,
                };
                match next {
                    Some(count) if count < shuffles => {
                        let glyph = state.alphabet[state.rng.random_range(0..state.alphabet.len())];
                        state.slots[index] = DigitSlot::Shuffling { count, glyph };
                        let interval = state.config.interval_ms;
                        let handle = state
                            .host
                            .set_timeout(interval, Self::step_callback(Rc::downgrade(&inner), index));
                        state.timers[index] = Some(handle);
                    }
                    Some(_) => state.slots[index] = DigitSlot::Settled,
                    None => {}
                }
                state.render();
                if state.all_settled() {
                    state.completion.take()
                } else {
                    None
                }
            };
            if let Some(done) = done {
                done.resolve(Outcome::Settled);
            }
        })
    }

    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }

    /// Clear every pending timer; unsettled slots stay as they are.
    pub fn cancel(&self) {
        let cancelled = {
            let mut state = self.inner.borrow_mut();
            let host = state.host.clone();
            for timer in state.timers.iter_mut() {
                if let Some(handle) = timer.take() {
                    host.clear_timeout(handle);
                }
            }
            state.completion.take()
        };
        if let Some(c) = cancelled {
            c.resolve(Outcome::Cancelled);
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.borrow().timers.iter().filter(|t| t.is_some()).count()
    }
}

impl<D: Dom> Drop for DigitalReveal<D> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.try_borrow_mut() {
            let host = state.host.clone();
            for timer in state.timers.iter_mut() {
                if let Some(handle) = timer.take() {
                    host.clear_timeout(handle);
                }
            }
        }
    }
}
