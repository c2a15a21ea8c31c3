//! Typeface JSON (the format three.js `FontLoader` reads) flattened into
//! line outlines.
//!
//! Each glyph carries an advance `ha` and an outline string `o` of commands:
//! `m x y`, `l x y`, `q x y cx cy` (end point first, then control point) and
//! `b x y c1x c1y c2x c2y`. Coordinates are in font units; `resolution` units
//! make one em.

use std::collections::HashMap;

use serde::Deserialize;

use super::render::LineGeometry;
use crate::error::{FxError, FxResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Glyph {
    #[serde(default)]
    pub ha: f32,
    #[serde(default)]
    pub o: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Typeface {
    pub glyphs: HashMap<String, Glyph>,
    #[serde(default = "default_resolution")]
    pub resolution: f32,
}

fn default_resolution() -> f32 {
    1000.0
}

impl Typeface {
    pub fn parse(json: &str) -> FxResult<Self> {
        let face: Self = serde_json::from_str(json).map_err(|e| FxError::FontParse(e.to_string()))?;
        if face.resolution <= 0.0 {
            return Err(FxError::FontParse(format!("resolution {}", face.resolution)));
        }
        Ok(face)
    }

    fn glyph(&self, ch: char) -> Option<&Glyph> {
        let mut buf = [0u8; 4];
        self.glyphs.get(&*ch.encode_utf8(&mut buf))
    }

    /// Outline of `text` as line segments in the xy plane, `size` world units
    /// per em, horizontally centered on the origin. A second copy of the
    /// outline sits at `z = -depth` when `depth > 0`.
    pub fn layout(&self, text: &str, size: f32, depth: f32, curve_segments: u32) -> FxResult<LineGeometry> {
        let scale = size / self.resolution;
        let mut segments: Vec<[f32; 2]> = Vec::new();
        let mut pen = 0.0_f32;
        for ch in text.chars() {
            // Unknown glyphs advance like a space so the rest still lines up.
            let Some(glyph) = self.glyph(ch).or_else(|| self.glyph('?')) else {
                pen += self.resolution * 0.5 * scale;
                continue;
            };
            if let Some(outline) = &glyph.o {
                trace_outline(outline, pen, scale, curve_segments.max(1), &mut segments)?;
            }
            pen += glyph.ha * scale;
        }
        let shift = pen / 2.0;
        let mut positions = Vec::with_capacity(segments.len() * 2);
        for p in &segments {
            positions.push([p[0] - shift, p[1], 0.0]);
        }
        if depth > 0.0 {
            for p in &segments {
                positions.push([p[0] - shift, p[1], -depth]);
            }
        }
        Ok(LineGeometry { positions })
    }
}

fn trace_outline(
    outline: &str,
    offset_x: f32,
    scale: f32,
    curve_segments: u32,
    out: &mut Vec<[f32; 2]>,
) -> FxResult<()> {
    let tokens: Vec<&str> = outline.split_whitespace().collect();
    let mut i = 0;
    let mut cursor: Option<[f32; 2]> = None;

    let num = |i: &mut usize| -> FxResult<f32> {
        let tok = tokens
            .get(*i)
            .ok_or_else(|| FxError::FontParse("outline ends mid-command".into()))?;
        *i += 1;
        tok.parse::<f32>()
            .map_err(|_| FxError::FontParse(format!("bad number `{tok}`")))
    };
    let point = |i: &mut usize| -> FxResult<[f32; 2]> {
        let x = num(i)?;
        let y = num(i)?;
        Ok([x * scale + offset_x, y * scale])
    };

    while i < tokens.len() {
        let cmd = tokens[i];
        i += 1;
        match cmd {
            "m" => cursor = Some(point(&mut i)?),
            "l" => {
                let to = point(&mut i)?;
                if let Some(from) = cursor {
                    out.extend([from, to]);
                }
                cursor = Some(to);
            }
            "q" => {
                let to = point(&mut i)?;
                let c = point(&mut i)?;
                if let Some(from) = cursor {
                    flatten(out, curve_segments, |t| {
                        let u = 1.0 - t;
                        lerp2(&[(u * u, from), (2.0 * u * t, c), (t * t, to)])
                    });
                }
                cursor = Some(to);
            }
            "b" => {
                let to = point(&mut i)?;
                let c1 = point(&mut i)?;
                let c2 = point(&mut i)?;
                if let Some(from) = cursor {
                    flatten(out, curve_segments, |t| {
                        let u = 1.0 - t;
                        lerp2(&[
                            (u * u * u, from),
                            (3.0 * u * u * t, c1),
                            (3.0 * u * t * t, c2),
                            (t * t * t, to),
                        ])
                    });
                }
                cursor = Some(to);
            }
            "z" => {}
            other => return Err(FxError::FontParse(format!("unknown outline command `{other}`"))),
        }
    }
    Ok(())
}

fn lerp2(terms: &[(f32, [f32; 2])]) -> [f32; 2] {
    terms
        .iter()
        .fold([0.0, 0.0], |acc, (w, p)| [acc[0] + w * p[0], acc[1] + w * p[1]])
}

fn flatten(out: &mut Vec<[f32; 2]>, segments: u32, at: impl Fn(f32) -> [f32; 2]) {
    let mut prev = at(0.0);
    for s in 1..=segments {
        let p = at(s as f32 / segments as f32);
        out.extend([prev, p]);
        prev = p;
    }
}
