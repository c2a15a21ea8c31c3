//! What the hero controller needs from a GPU surface.

use glam::Mat4;

use crate::error::FxResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// Line-list geometry: every two positions form one segment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineGeometry {
    pub positions: Vec<[f32; 3]>,
}

impl LineGeometry {
    pub fn segment_count(&self) -> usize {
        self.positions.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.positions.len() < 2
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineMaterial {
    pub color: [f32; 3],
    pub opacity: f32,
}

impl LineMaterial {
    pub fn from_hex(hex: u32, opacity: f32) -> Self {
        let c = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self {
            color: [c(16), c(8), c(0)],
            opacity,
        }
    }
}

/// One draw call: geometry and material already uploaded, plus the final
/// lit color and transform for this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawItem {
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub mvp: Mat4,
    pub color: [f32; 4],
}

/// A canvas-like render target. Ownership is claimed on the surface itself,
/// so two controllers can never drive the same canvas.
pub trait Surface {
    /// Stable name used in logs and errors.
    fn label(&self) -> String;

    /// Drawing buffer size in device pixels.
    fn size(&self) -> (u32, u32);

    /// Returns false if the surface is already claimed.
    fn try_claim(&self) -> bool;
    fn release_claim(&self);
    fn is_claimed(&self) -> bool;

    fn create_context(&self) -> FxResult<Box<dyn RenderContext>>;
}

pub trait RenderContext {
    fn is_context_lost(&self) -> bool;

    fn upload_geometry(&mut self, geometry: &LineGeometry) -> FxResult<GeometryId>;
    fn upload_material(&mut self, material: &LineMaterial) -> FxResult<MaterialId>;
    fn release_geometry(&mut self, id: GeometryId) -> FxResult<()>;
    fn release_material(&mut self, id: MaterialId) -> FxResult<()>;

    /// Resize the drawing buffer. `width`/`height` are CSS pixels.
    fn set_size(&mut self, width: f64, height: f64, pixel_ratio: f64);

    fn render(&mut self, items: &[DrawItem]) -> FxResult<()>;

    /// Free the context and everything left in it.
    fn dispose(&mut self) -> FxResult<()>;
}
