//! Declarative page effects: scroll reveals, counters, collapsible cards,
//! category filters and hover micro-interactions.
//!
//! Each function arms one feature through a [`PageContext`] and returns how
//! many elements it armed; missing markup arms nothing.

use std::cell::Cell;
use std::rc::Rc;

use log::debug;

use crate::config::{CollapsibleConfig, CounterConfig, FilterConfig, HoverRule, RevealRule};
use crate::dom::{Dom, DomEventKind};
use crate::runtime::PageContext;
use crate::scroll::TriggerEvent;
use crate::tween::{Props, TweenHooks, TweenSpec};

fn first<D: Dom>(dom: &D, selector: &str) -> Option<D::Element> {
    dom.query_all(selector).into_iter().next()
}

/// Hide `rule.items` in their start state and animate them to the end state
/// the first time the trigger crosses the threshold.
pub fn reveal<D: Dom + 'static>(ctx: &PageContext<D>, rule: &RevealRule) -> usize {
    let items = ctx.dom.query_all(&rule.items);
    if items.is_empty() {
        debug!("reveal: no `{}` elements", rule.items);
        return 0;
    }
    let group_trigger = match &rule.trigger {
        Some(selector) => match first(ctx.dom.as_ref(), selector) {
            Some(el) => Some(el),
            None => {
                debug!("reveal: trigger `{selector}` missing");
                return 0;
            }
        },
        None => None,
    };

    for item in &items {
        ctx.tweens.set(item, rule.from);
    }
    let spec = TweenSpec::from_to(rule.from, rule.to, rule.duration, rule.ease);

    match group_trigger {
        Some(trigger) => {
            let tweens = ctx.tweens.clone();
            let stagger = rule.stagger;
            let batch = items.clone();
            ctx.triggers.register(
                &trigger,
                rule.threshold,
                true,
                Rc::new(move |event| {
                    if event != TriggerEvent::Enter {
                        return;
                    }
                    for (i, item) in batch.iter().enumerate() {
                        tweens.add(item, spec.delay(i as f64 * stagger), TweenHooks::default());
                    }
                }),
            );
        }
        None => {
            for (i, item) in items.iter().enumerate() {
                let tweens = ctx.tweens.clone();
                let target = item.clone();
                let spec = spec.delay(i as f64 * rule.stagger);
                ctx.triggers.register(
                    item,
                    rule.threshold,
                    true,
                    Rc::new(move |event| {
                        if event == TriggerEvent::Enter {
                            tweens.add(&target, spec, TweenHooks::default());
                        }
                    }),
                );
            }
        }
    }
    items.len()
}

/// Leading integer of a counter label plus whatever follows it, so
/// `"1,234+"` counts to 1234 and keeps the `+`.
pub fn parse_counter(text: &str) -> Option<(u64, String)> {
    let text = text.trim();
    let numeric_len = text
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || *c == ',')
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    let digits: String = text[..numeric_len].chars().filter(char::is_ascii_digit).collect();
    let value = digits.parse().ok()?;
    Some((value, text[numeric_len..].to_string()))
}

const COUNT_ATTR: &str = "data-count";

/// Count each `.stat-number` up from zero once it scrolls into view.
pub fn counters<D: Dom + 'static>(ctx: &PageContext<D>, config: &CounterConfig) -> usize {
    let mut armed = 0;
    for el in ctx.dom.query_all(&config.selector) {
        if ctx.dom.attr(&el, "data-animated").as_deref() == Some("true") {
            continue;
        }
        // The label is kept in an attribute so a re-init still knows the
        // target after the text has been reset to zero.
        let label = match ctx.dom.attr(&el, COUNT_ATTR) {
            Some(label) => label,
            None => {
                let label = ctx.dom.text(&el);
                ctx.dom.set_attr(&el, COUNT_ATTR, &label);
                label
            }
        };
        let Some((target, suffix)) = parse_counter(&label) else {
            debug!("counter: unparsable label `{label}`");
            continue;
        };
        ctx.dom.set_text(&el, &format!("0{suffix}"));

        let tweens = ctx.tweens.clone();
        let dom = ctx.dom.clone();
        let spec = TweenSpec::to(Props::new(), config.duration, config.ease);
        let counter = el.clone();
        ctx.triggers.register(
            &el,
            config.threshold,
            true,
            Rc::new(move |event| {
                if event != TriggerEvent::Enter {
                    return;
                }
                let (update_dom, update_el, update_suffix) =
                    (dom.clone(), counter.clone(), suffix.clone());
                let last = Cell::new(0u64);
                let (done_dom, done_el, done_suffix) = (dom.clone(), counter.clone(), suffix.clone());
                tweens.add_value(
                    0.0,
                    target as f64,
                    spec,
                    TweenHooks::default()
                        .on_update(move |v| {
                            let shown = (v.round().max(0.0) as u64).clamp(last.get(), target);
                            last.set(shown);
                            update_dom.set_text(&update_el, &format!("{shown}{update_suffix}"));
                        })
                        .on_complete(move || {
                            done_dom.set_text(&done_el, &format!("{target}{done_suffix}"));
                            done_dom.set_attr(&done_el, "data-animated", "true");
                        }),
                );
            }),
        );
        armed += 1;
    }
    armed
}

/// Per-card open/closed toggles. Cards never affect each other.
pub fn collapsibles<D: Dom + 'static>(ctx: &PageContext<D>, config: &CollapsibleConfig) -> usize {
    let mut armed = 0;
    for card in ctx.dom.query_all(&config.cards) {
        let parts = (
            ctx.dom.query_within(&card, &config.header),
            ctx.dom.query_within(&card, &config.details),
            ctx.dom.query_within(&card, &config.arrow),
        );
        let (Some(header), Some(details), Some(arrow)) = parts else {
            debug!("collapsible: incomplete card {card:?}");
            continue;
        };
        // A re-init may find the card open.
        ctx.tweens.set(&details, Props::new().height(0.0).opacity(0.0));
        ctx.tweens.set(&arrow, Props::new().rotate(0.0));
        ctx.dom.add_class(&details, "hidden");

        let open = Rc::new(Cell::new(false));
        let tweens = ctx.tweens.clone();
        let dom = ctx.dom.clone();
        let (duration, ease) = (config.duration, config.ease);
        ctx.keep(ctx.dom.listen(
            &header,
            DomEventKind::Click,
            Rc::new(move || {
                let now_open = !open.get();
                open.set(now_open);
                if now_open {
                    // Hidden elements measure zero.
                    dom.remove_class(&details, "hidden");
                    let height = dom.natural_height(&details);
                    let (end_dom, end_el) = (dom.clone(), details.clone());
                    tweens.add(
                        &details,
                        TweenSpec::to(Props::new().height(height).opacity(1.0), duration, ease),
                        TweenHooks::default()
                            .on_complete(move || end_dom.set_style(&end_el, "height", "auto")),
                    );
                    tweens.add(
                        &arrow,
                        TweenSpec::to(Props::new().rotate(180.0), duration, ease),
                        TweenHooks::default(),
                    );
                } else {
                    let (end_dom, end_el) = (dom.clone(), details.clone());
                    tweens.add(
                        &details,
                        TweenSpec::to(Props::new().height(0.0).opacity(0.0), duration, ease),
                        TweenHooks::default().on_complete(move || end_dom.add_class(&end_el, "hidden")),
                    );
                    tweens.add(
                        &arrow,
                        TweenSpec::to(Props::new().rotate(0.0), duration, ease),
                        TweenHooks::default(),
                    );
                }
            }),
        ));
        armed += 1;
    }
    armed
}

/// Category filter: clicking a button shows cards whose role matches its
/// filter value and fades the rest out.
pub fn filters<D: Dom + 'static>(ctx: &PageContext<D>, config: &FilterConfig) -> usize {
    let buttons = ctx.dom.query_all(&config.buttons);
    let cards = ctx.dom.query_all(&config.cards);
    if buttons.is_empty() || cards.is_empty() {
        debug!("filter: nothing to filter");
        return 0;
    }
    let buttons = Rc::new(buttons);
    let cards = Rc::new(cards);
    let config = Rc::new(config.clone());
    for button in buttons.iter() {
        let (dom, tweens) = (ctx.dom.clone(), ctx.tweens.clone());
        let (all_buttons, cards, config) = (buttons.clone(), cards.clone(), config.clone());
        let this = button.clone();
        ctx.keep(ctx.dom.listen(
            button,
            DomEventKind::Click,
            Rc::new(move || {
                let filter = dom.attr(&this, &config.button_attr).unwrap_or_default();
                for b in all_buttons.iter() {
                    for class in &config.active_classes {
                        dom.remove_class(b, class);
                    }
                    for class in &config.inactive_classes {
                        dom.add_class(b, class);
                    }
                }
                for class in &config.inactive_classes {
                    dom.remove_class(&this, class);
                }
                for class in &config.active_classes {
                    dom.add_class(&this, class);
                }

                for card in cards.iter() {
                    let role = dom.attr(card, &config.card_attr);
                    let shown = filter == config.show_all || role.as_deref() == Some(filter.as_str());
                    if shown {
                        dom.set_style(card, "display", "block");
                        tweens.add(
                            card,
                            TweenSpec::to(Props::new().opacity(1.0).scale(1.0), config.duration, Default::default()),
                            TweenHooks::default(),
                        );
                    } else {
                        let (end_dom, end_el) = (dom.clone(), card.clone());
                        tweens.add(
                            card,
                            TweenSpec::to(
                                Props::new().opacity(0.0).scale(config.hidden_scale),
                                config.duration,
                                Default::default(),
                            ),
                            TweenHooks::default()
                                .on_complete(move || end_dom.set_style(&end_el, "display", "none")),
                        );
                    }
                }
            }),
        ));
    }
    buttons.len()
}

/// Pointer-enter / pointer-leave tweens on each item (or a descendant).
pub fn hovers<D: Dom + 'static>(ctx: &PageContext<D>, rule: &HoverRule) -> usize {
    let mut armed = 0;
    for item in ctx.dom.query_all(&rule.items) {
        let target = match &rule.target {
            Some(selector) => match ctx.dom.query_within(&item, selector) {
                Some(el) => el,
                None => continue,
            },
            None => item.clone(),
        };
        for (kind, props) in [
            (DomEventKind::PointerEnter, rule.enter),
            (DomEventKind::PointerLeave, rule.leave),
        ] {
            if props.is_empty() {
                continue;
            }
            let tweens = ctx.tweens.clone();
            let target = target.clone();
            let spec = TweenSpec::to(props, rule.duration, rule.ease);
            ctx.keep(ctx.dom.listen(
                &item,
                kind,
                Rc::new(move || {
                    tweens.add(&target, spec, TweenHooks::default());
                }),
            ));
        }
        armed += 1;
    }
    armed
}
