//! Front-end effects for the club site: the hero canvas, scroll reveals,
//! counters, collapsibles, filters and text scrambles.
//!
//! The effect controllers only talk to the [`host::Host`] and [`dom::Dom`]
//! traits. On wasm32 the [`wasm`] module wires them to the browser; the
//! [`headless`] backend drives them deterministically everywhere else.

#![cfg_attr(target_arch = "wasm32", allow(dead_code))]

pub mod config;
pub mod dom;
pub mod ease;
pub mod error;
pub mod headless;
pub mod hero;
pub mod host;
pub mod pages;
pub mod reveal;
pub mod runtime;
pub mod scramble;
pub mod scroll;
pub mod tween;

// Only compile the browser backend when targeting wasm32.
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use crate::config::SiteConfig;
pub use crate::error::{FxError, FxResult};
pub use crate::hero::{HeroEffect, HeroStatus};
pub use crate::runtime::{PageKind, PageRuntime};
pub use crate::scramble::{DigitalReveal, Outcome, TextScramble};
