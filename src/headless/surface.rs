use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::error::{FxError, FxResult};
use crate::hero::render::{
    DrawItem, GeometryId, LineGeometry, LineMaterial, MaterialId, RenderContext, Surface,
};

/// Counters shared by a surface and every context created on it.
#[derive(Debug, Default)]
pub struct RenderStats {
    pub contexts_created: Cell<usize>,
    pub live_geometries: Cell<usize>,
    pub live_materials: Cell<usize>,
    pub renders: Cell<u64>,
    pub disposes: Cell<usize>,
    pub last_draw_count: Cell<usize>,
    pub last_size: Cell<(u32, u32)>,
    lost: Cell<bool>,
}

impl RenderStats {
    pub fn live_resources(&self) -> usize {
        self.live_geometries.get() + self.live_materials.get()
    }
}

fn bump(cell: &Cell<usize>, up: bool) {
    let v = cell.get();
    cell.set(if up { v + 1 } else { v.saturating_sub(1) });
}

/// A render surface that draws nothing and counts everything.
pub struct RecordingSurface {
    label: String,
    size: Cell<(u32, u32)>,
    claimed: Cell<bool>,
    create_error: RefCell<Option<FxError>>,
    stats: Rc<RenderStats>,
}

impl RecordingSurface {
    pub fn new(label: impl Into<String>, width: u32, height: u32) -> Rc<Self> {
        Rc::new(Self {
            label: label.into(),
            size: Cell::new((width, height)),
            claimed: Cell::new(false),
            create_error: RefCell::new(None),
            stats: Rc::new(RenderStats::default()),
        })
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Make the next `create_context` fail with `error`.
    pub fn fail_next_context(&self, error: FxError) {
        *self.create_error.borrow_mut() = Some(error);
    }

    /// Simulate the browser dropping the GPU context. Like a canvas, the
    /// surface keeps handing out the lost context until it is restored.
    pub fn lose_context(&self) {
        self.stats.lost.set(true);
    }

    pub fn restore_context(&self) {
        self.stats.lost.set(false);
    }
}

impl Surface for RecordingSurface {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    fn try_claim(&self) -> bool {
        !self.claimed.replace(true)
    }

    fn release_claim(&self) {
        self.claimed.set(false);
    }

    fn is_claimed(&self) -> bool {
        self.claimed.get()
    }

    fn create_context(&self) -> FxResult<Box<dyn RenderContext>> {
        if let Some(error) = self.create_error.borrow_mut().take() {
            return Err(error);
        }
        if self.stats.lost.get() {
            return Err(FxError::ContextLost);
        }
        bump(&self.stats.contexts_created, true);
        Ok(Box::new(RecordingContext {
            stats: self.stats.clone(),
            geometries: BTreeSet::new(),
            materials: BTreeSet::new(),
            next_id: 1,
            disposed: false,
        }))
    }
}

struct RecordingContext {
    stats: Rc<RenderStats>,
    geometries: BTreeSet<u32>,
    materials: BTreeSet<u32>,
    next_id: u32,
    disposed: bool,
}

impl RecordingContext {
    fn usable(&self) -> FxResult<()> {
        if self.is_context_lost() {
            Err(FxError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl RenderContext for RecordingContext {
    fn is_context_lost(&self) -> bool {
        self.disposed || self.stats.lost.get()
    }

    fn upload_geometry(&mut self, geometry: &LineGeometry) -> FxResult<GeometryId> {
        self.usable()?;
        if geometry.is_empty() {
            return Err(FxError::CapabilityUnavailable("empty geometry".into()));
        }
        let id = self.id();
        self.geometries.insert(id);
        bump(&self.stats.live_geometries, true);
        Ok(GeometryId(id))
    }

    fn upload_material(&mut self, _material: &LineMaterial) -> FxResult<MaterialId> {
        self.usable()?;
        let id = self.id();
        self.materials.insert(id);
        bump(&self.stats.live_materials, true);
        Ok(MaterialId(id))
    }

    fn release_geometry(&mut self, id: GeometryId) -> FxResult<()> {
        if !self.geometries.remove(&id.0) {
            return Err(FxError::Release(format!("unknown geometry {}", id.0)));
        }
        bump(&self.stats.live_geometries, false);
        Ok(())
    }

    fn release_material(&mut self, id: MaterialId) -> FxResult<()> {
        if !self.materials.remove(&id.0) {
            return Err(FxError::Release(format!("unknown material {}", id.0)));
        }
        bump(&self.stats.live_materials, false);
        Ok(())
    }

    fn set_size(&mut self, width: f64, height: f64, pixel_ratio: f64) {
        let px = |v: f64| (v * pixel_ratio).round().max(1.0) as u32;
        self.stats.last_size.set((px(width), px(height)));
    }

    fn render(&mut self, items: &[DrawItem]) -> FxResult<()> {
        self.usable()?;
        self.stats.renders.set(self.stats.renders.get() + 1);
        self.stats.last_draw_count.set(items.len());
        Ok(())
    }

    fn dispose(&mut self) -> FxResult<()> {
        if self.disposed {
            return Err(FxError::Release("context already disposed".into()));
        }
        self.disposed = true;
        for _ in std::mem::take(&mut self.geometries) {
            bump(&self.stats.live_geometries, false);
        }
        for _ in std::mem::take(&mut self.materials) {
            bump(&self.stats.live_materials, false);
        }
        bump(&self.stats.disposes, true);
        Ok(())
    }
}
