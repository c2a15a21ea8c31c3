use std::rc::Rc;

use log::{debug, info};

use crate::dom::Dom;
use crate::error::{FxError, FxResult};
use crate::hero::render::Surface;
use crate::hero::HeroEffect;
use crate::reveal;
use crate::runtime::{PageContext, PageScript};
use crate::scramble::{self, DigitalReveal, TextScramble};
use crate::tween::Timeline;

/// Landing page: hero canvas, intro timeline, stat counters and the text
/// effects.
pub struct HomePage<D: Dom> {
    hero: Option<HeroEffect>,
    scrambles: Vec<TextScramble<D>>,
    digital: Vec<DigitalReveal<D>>,
}

impl<D: Dom> Default for HomePage<D> {
    fn default() -> Self {
        Self {
            hero: None,
            scrambles: Vec::new(),
            digital: Vec::new(),
        }
    }
}

fn hero_surface<D: Dom>(ctx: &PageContext<D>) -> FxResult<Rc<dyn Surface>> {
    let canvas_id = &ctx.config.home.canvas_id;
    let canvas = ctx
        .dom
        .by_id(canvas_id)
        .ok_or_else(|| FxError::MissingElement(format!("#{canvas_id}")))?;
    ctx.dom
        .canvas_surface(&canvas)
        .ok_or_else(|| FxError::MissingElement(format!("canvas#{canvas_id}")))
}

impl<D: Dom + 'static> HomePage<D> {
    fn start_hero(&mut self, ctx: &PageContext<D>) {
        // A previous instance must be gone before the canvas can be claimed.
        if let Some(old) = self.hero.take() {
            old.deactivate();
        }
        match hero_surface(ctx) {
            Ok(surface) => {
                self.hero =
                    HeroEffect::activate(ctx.host.clone(), surface, ctx.config.hero.clone()).ok();
            }
            Err(e) => debug!("home: hero skipped: {e}"),
        }
    }

    fn play_intro(&self, ctx: &PageContext<D>) {
        let home = &ctx.config.home;
        let mut timeline = Timeline::new(home.intro_ease);
        for step in &home.intro {
            let Some(el) = ctx.dom.query_all(&step.selector).into_iter().next() else {
                continue;
            };
            let ease = step.ease.unwrap_or(home.intro_ease);
            timeline = timeline.to_with(el, step.to, step.duration, step.offset, ease);
        }
        timeline.play(&ctx.tweens);
    }

    fn start_text_effects(&mut self, ctx: &PageContext<D>) {
        let config = &ctx.config;
        for el in ctx.dom.query_all(&config.scramble.selector) {
            let target = ctx
                .dom
                .attr(&el, "data-scramble")
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| scramble::source_text(ctx.dom.as_ref(), &el));
            let scramble = TextScramble::new(
                ctx.host.clone(),
                ctx.dom.clone(),
                el,
                config.scramble.clone(),
                ctx.next_seed(),
            );
            scramble.set_text(&target);
            self.scrambles.push(scramble);
        }
        for el in ctx.dom.query_all(&config.digital.selector) {
            self.digital.push(DigitalReveal::start(
                ctx.host.clone(),
                ctx.dom.clone(),
                el,
                config.digital.clone(),
                ctx.next_seed(),
            ));
        }
    }
}

impl<D: Dom + 'static> PageScript<D> for HomePage<D> {
    fn init(&mut self, ctx: &PageContext<D>) {
        self.start_hero(ctx);
        self.play_intro(ctx);
        let counters = reveal::counters(ctx, &ctx.config.home.counters);
        reveal::hovers(ctx, &ctx.config.home.card_hover);
        self.start_text_effects(ctx);
        info!(
            "home: hero {}, {counters} counters, {} scrambles",
            if self.hero.is_some() { "on" } else { "off" },
            self.scrambles.len()
        );
    }

    fn teardown(&mut self) {
        if let Some(hero) = self.hero.take() {
            hero.deactivate();
        }
        for scramble in self.scrambles.drain(..) {
            scramble.cancel();
        }
        for reveal in self.digital.drain(..) {
            reveal.cancel();
        }
    }
}
