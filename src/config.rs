//! Site-wide effect parameters.
//!
//! Every field has a default, so an empty JSON object is a complete config.

use serde::{Deserialize, Serialize};

use crate::ease::Ease;
use crate::error::{FxError, FxResult};
use crate::scroll::Threshold;
use crate::tween::Props;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub hero: HeroConfig,
    pub scramble: ScrambleConfig,
    pub digital: DigitalRevealConfig,
    pub home: HomeConfig,
    pub academics: AcademicsConfig,
    pub members: MembersConfig,
    pub gallery: GalleryConfig,
}

/// Ten seconds at 60 fps.
const MAX_SCRAMBLE_FRAMES: u32 = 600;
const MAX_CURVE_SEGMENTS: u32 = 64;

impl SiteConfig {
    pub fn from_json(text: &str) -> FxResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| FxError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FxResult<()> {
        let hero = &self.hero;
        if !(hero.damping > 0.0 && hero.damping <= 1.0) {
            return Err(FxError::Config(format!(
                "hero.damping must be in (0, 1], got {}",
                hero.damping
            )));
        }
        if hero.min_viewport_width < 0.0 {
            return Err(FxError::Config("hero.min_viewport_width is negative".into()));
        }
        if hero.fov <= 0.0 || hero.fov >= 180.0 {
            return Err(FxError::Config(format!("hero.fov out of range: {}", hero.fov)));
        }
        if self.scramble.alphabet.is_empty() || self.digital.alphabet.is_empty() {
            return Err(FxError::Config("scramble alphabets must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.scramble.reroll_chance) {
            return Err(FxError::Config("scramble.reroll_chance must be in [0, 1]".into()));
        }
        let frames = [
            ("scramble.max_start", self.scramble.max_start),
            ("scramble.max_span", self.scramble.max_span),
        ];
        for (name, value) in frames {
            if value > MAX_SCRAMBLE_FRAMES {
                return Err(FxError::Config(format!(
                    "{name} must be at most {MAX_SCRAMBLE_FRAMES} frames, got {value}"
                )));
            }
        }
        let segments = hero.label.curve_segments;
        if segments == 0 || segments > MAX_CURVE_SEGMENTS {
            return Err(FxError::Config(format!(
                "hero.label.curve_segments must be in 1..={MAX_CURVE_SEGMENTS}, got {segments}"
            )));
        }
        let rules = [
            ("academics.reveal", &self.academics.reveal),
            ("members.reveal", &self.members.reveal),
            ("gallery.reveal", &self.gallery.reveal),
        ];
        for (name, rule) in rules {
            rule.validate(name)?;
        }
        for step in &self.home.intro {
            if step.duration < 0.0 {
                return Err(FxError::Config(format!(
                    "home.intro `{}` has a negative duration",
                    step.selector
                )));
            }
        }
        if self.home.counters.duration <= 0.0 {
            return Err(FxError::Config("home.counters.duration must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroConfig {
    /// Below this viewport width the hero stays off.
    pub min_viewport_width: f64,
    /// Fraction of the remaining pointer rotation applied per frame.
    pub damping: f64,
    /// Rotation in radians at the viewport edge.
    pub max_tilt: f64,
    /// Idle spin per frame around x and y, radians.
    pub spin: [f64; 2],
    pub float_amplitude: f64,
    /// Angular speed of the float, radians per second.
    pub float_speed: f64,
    /// Slide index on which the hero is visible.
    pub slide_index: usize,
    pub max_pixel_ratio: f64,
    pub fov: f64,
    pub camera_z: f64,
    pub core: ShapeConfig,
    pub shell: ShapeConfig,
    pub ambient_intensity: f64,
    pub point_light: PointLightConfig,
    pub label: LabelConfig,
}

impl Default for HeroConfig {
    fn default() -> Self {
        Self {
            min_viewport_width: 768.0,
            damping: 0.05,
            max_tilt: 0.5,
            spin: [0.003, 0.004],
            float_amplitude: 0.12,
            float_speed: 1.2,
            slide_index: 0,
            max_pixel_ratio: 2.0,
            fov: 75.0,
            camera_z: 4.0,
            core: ShapeConfig {
                radius: 1.8,
                detail: 1,
                color: 0x0ea5e9,
                opacity: 0.6,
            },
            shell: ShapeConfig {
                radius: 2.3,
                detail: 0,
                color: 0x8b5cf6,
                opacity: 0.8,
            },
            ambient_intensity: 0.6,
            point_light: PointLightConfig::default(),
            label: LabelConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeConfig {
    pub radius: f32,
    /// Icosphere subdivision level.
    pub detail: u32,
    /// `0xRRGGBB`.
    pub color: u32,
    pub opacity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointLightConfig {
    pub position: [f32; 3],
    pub intensity: f32,
    /// Distance at which the light has fallen to half intensity.
    pub falloff: f32,
}

impl Default for PointLightConfig {
    fn default() -> Self {
        Self {
            position: [3.0, 3.0, 5.0],
            intensity: 0.8,
            falloff: 6.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub text: String,
    pub font_url: String,
    /// World units per em.
    pub size: f32,
    pub depth: f32,
    pub color: u32,
    pub opacity: f32,
    /// Segments per curved outline command.
    pub curve_segments: u32,
    pub offset: [f32; 3],
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            text: "HIMA".into(),
            font_url: "https://threejs.org/examples/fonts/helvetiker_bold.typeface.json".into(),
            size: 0.6,
            depth: 0.15,
            color: 0x00d1ff,
            opacity: 0.9,
            curve_segments: 6,
            offset: [0.0, -2.6, 0.5],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrambleConfig {
    pub alphabet: String,
    /// Window starts are drawn from `0..max_start` frames.
    pub max_start: u32,
    /// Window lengths are drawn from `0..max_span` frames.
    pub max_span: u32,
    /// Chance per frame that a scrambling slot picks a new glyph.
    pub reroll_chance: f64,
    pub selector: String,
}

impl Default for ScrambleConfig {
    fn default() -> Self {
        Self {
            alphabet: "!<>-_\\/[]{}—=+*^?#________".into(),
            max_start: 30,
            max_span: 30,
            reroll_chance: 0.28,
            selector: "[data-scramble]".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitalRevealConfig {
    pub alphabet: String,
    pub shuffles: u32,
    pub interval_ms: f64,
    /// Seconds.
    pub duration: f64,
    pub selector: String,
}

impl Default for DigitalRevealConfig {
    fn default() -> Self {
        Self {
            alphabet: "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ@#$%&".into(),
            shuffles: 10,
            interval_ms: 40.0,
            duration: 1.5,
            selector: ".digital-reveal".into(),
        }
    }
}

/// "When these elements cross the threshold, animate them in."
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealRule {
    pub items: String,
    /// Element whose crossing starts the whole batch. Without one, every
    /// item triggers itself.
    pub trigger: Option<String>,
    pub threshold: Threshold,
    pub from: Props,
    pub to: Props,
    pub duration: f64,
    /// Seconds between consecutive items.
    pub stagger: f64,
    pub ease: Ease,
}

impl Default for RevealRule {
    fn default() -> Self {
        Self {
            items: String::new(),
            trigger: None,
            threshold: Threshold::top(80.0),
            from: Props::new().opacity(0.0).y(40.0),
            to: Props::new().opacity(1.0).y(0.0),
            duration: 0.6,
            stagger: 0.1,
            ease: Ease::Power2Out,
        }
    }
}

impl RevealRule {
    fn validate(&self, name: &str) -> FxResult<()> {
        if self.duration < 0.0 || self.stagger < 0.0 {
            return Err(FxError::Config(format!("{name}: negative timing")));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverRule {
    pub items: String,
    /// Animate this descendant instead of the item itself.
    pub target: Option<String>,
    pub enter: Props,
    pub leave: Props,
    pub duration: f64,
    pub ease: Ease,
}

impl Default for HoverRule {
    fn default() -> Self {
        Self {
            items: String::new(),
            target: None,
            enter: Props::new(),
            leave: Props::new(),
            duration: 0.3,
            ease: Ease::Power2Out,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntroStep {
    pub selector: String,
    pub to: Props,
    pub duration: f64,
    /// Seconds relative to the end of the previous step.
    pub offset: f64,
    pub ease: Option<Ease>,
}

impl Default for IntroStep {
    fn default() -> Self {
        Self {
            selector: String::new(),
            to: Props::new().opacity(1.0).y(0.0),
            duration: 0.5,
            offset: 0.0,
            ease: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub selector: String,
    pub threshold: Threshold,
    pub duration: f64,
    pub ease: Ease,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            selector: ".stat-number".into(),
            threshold: Threshold::top(60.0),
            duration: 1.5,
            ease: Ease::Power2Out,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeConfig {
    pub canvas_id: String,
    pub intro_ease: Ease,
    pub intro: Vec<IntroStep>,
    pub counters: CounterConfig,
    pub card_hover: HoverRule,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            canvas_id: "three-canvas".into(),
            intro_ease: Ease::Power3Out,
            intro: vec![
                IntroStep {
                    selector: "#hero-title".into(),
                    duration: 0.6,
                    ..IntroStep::default()
                },
                IntroStep {
                    selector: "#hero-subtitle".into(),
                    duration: 0.5,
                    offset: -0.3,
                    ..IntroStep::default()
                },
                IntroStep {
                    selector: "#hero-cta".into(),
                    duration: 0.4,
                    offset: -0.2,
                    ..IntroStep::default()
                },
                IntroStep {
                    selector: "#hero-visual".into(),
                    to: Props::new().opacity(1.0).scale(1.0),
                    duration: 0.6,
                    offset: -0.2,
                    ease: Some(Ease::Power2Out),
                },
            ],
            counters: CounterConfig::default(),
            card_hover: HoverRule {
                items: ".stat-card".into(),
                enter: Props::new().y(-4.0),
                leave: Props::new().y(0.0),
                duration: 0.3,
                ..HoverRule::default()
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollapsibleConfig {
    pub cards: String,
    pub header: String,
    pub details: String,
    pub arrow: String,
    pub duration: f64,
    pub ease: Ease,
}

impl Default for CollapsibleConfig {
    fn default() -> Self {
        Self {
            cards: ".course-card".into(),
            header: ".course-header".into(),
            details: ".course-details".into(),
            arrow: ".course-arrow".into(),
            duration: 0.3,
            ease: Ease::Power2Out,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcademicsConfig {
    pub reveal: RevealRule,
    pub collapsible: CollapsibleConfig,
}

impl Default for AcademicsConfig {
    fn default() -> Self {
        Self {
            reveal: RevealRule {
                items: ".course-card".into(),
                trigger: Some("#courses-grid".into()),
                stagger: 0.15,
                ..RevealRule::default()
            },
            collapsible: CollapsibleConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub buttons: String,
    pub cards: String,
    pub button_attr: String,
    pub card_attr: String,
    /// Filter value that matches every card.
    pub show_all: String,
    pub active_classes: Vec<String>,
    pub inactive_classes: Vec<String>,
    pub hidden_scale: f64,
    pub duration: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            buttons: ".filter-btn".into(),
            cards: ".student-card".into(),
            button_attr: "data-filter".into(),
            card_attr: "data-role".into(),
            show_all: "all".into(),
            active_classes: vec!["bg-primary-600".into(), "text-white".into()],
            inactive_classes: vec!["bg-gray-200".into(), "text-gray-700".into()],
            hidden_scale: 0.8,
            duration: 0.3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembersConfig {
    pub reveal: RevealRule,
    pub hover: HoverRule,
    pub filter: FilterConfig,
}

impl Default for MembersConfig {
    fn default() -> Self {
        Self {
            reveal: RevealRule {
                items: ".student-card".into(),
                trigger: Some("#anggota-grid".into()),
                from: Props::new().opacity(0.0).y(30.0),
                stagger: 0.1,
                ..RevealRule::default()
            },
            hover: HoverRule {
                items: ".student-card".into(),
                enter: Props::new().scale(1.02),
                leave: Props::new().scale(1.0),
                duration: 0.2,
                ..HoverRule::default()
            },
            filter: FilterConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub reveal: RevealRule,
    pub hover: HoverRule,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            reveal: RevealRule {
                items: ".gallery-item".into(),
                trigger: None,
                threshold: Threshold::top(90.0),
                from: Props::new().opacity(0.0).y(50.0),
                duration: 0.5,
                stagger: 0.1,
                ..RevealRule::default()
            },
            hover: HoverRule {
                items: ".gallery-item".into(),
                target: Some("img".into()),
                enter: Props::new().scale(1.1),
                leave: Props::new().scale(1.0),
                duration: 0.5,
                ..HoverRule::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_the_default_config() {
        let config = SiteConfig::from_json("{}").unwrap();
        assert_eq!(config, SiteConfig::default());
        assert_eq!(config.hero.min_viewport_width, 768.0);
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let config = SiteConfig::from_json(
            r#"{ "hero": { "damping": 0.1 }, "gallery": { "reveal": { "threshold": "top 75%" } } }"#,
        )
        .unwrap();
        assert_eq!(config.hero.damping, 0.1);
        assert_eq!(config.hero.spin, [0.003, 0.004]);
        assert_eq!(config.gallery.reveal.threshold, Threshold::top(75.0));
    }

    #[test]
    fn rejects_out_of_range_damping() {
        let err = SiteConfig::from_json(r#"{ "hero": { "damping": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, FxError::Config(_)));
    }

    #[test]
    fn rejects_oversized_frame_counts() {
        let err = SiteConfig::from_json(r#"{ "scramble": { "max_start": 4294967295, "max_span": 4294967295 } }"#)
            .unwrap_err();
        assert!(matches!(err, FxError::Config(_)));
        let err = SiteConfig::from_json(r#"{ "hero": { "label": { "curve_segments": 100000 } } }"#).unwrap_err();
        assert!(matches!(err, FxError::Config(_)));
        assert!(SiteConfig::from_json(r#"{ "scramble": { "max_start": 600, "max_span": 600 } }"#).is_ok());
    }

    #[test]
    fn rejects_bad_thresholds() {
        let err = SiteConfig::from_json(r#"{ "academics": { "reveal": { "threshold": "top" } } }"#)
            .unwrap_err();
        assert!(matches!(err, FxError::Config(_)));
    }
}
