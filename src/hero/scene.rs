use glam::{EulerRot, Mat4, Quat, Vec3};

use super::render::{
    DrawItem, GeometryId, LineGeometry, LineMaterial, MaterialId, RenderContext,
};
use crate::config::{HeroConfig, PointLightConfig};
use crate::error::FxResult;

/// Edges of a unit icosphere with `detail` subdivisions, scaled to `radius`.
pub fn icosphere_edges(radius: f32, detail: u32) -> LineGeometry {
    let phi = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let mut vertices: Vec<Vec3> = [
        (-1.0, phi, 0.0),
        (1.0, phi, 0.0),
        (-1.0, -phi, 0.0),
        (1.0, -phi, 0.0),
        (0.0, -1.0, phi),
        (0.0, 1.0, phi),
        (0.0, -1.0, -phi),
        (0.0, 1.0, -phi),
        (phi, 0.0, -1.0),
        (phi, 0.0, 1.0),
        (-phi, 0.0, -1.0),
        (-phi, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| Vec3::new(x, y, z).normalize())
    .collect();

    let mut faces: Vec<[usize; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..detail {
        let mut midpoints: std::collections::HashMap<(usize, usize), usize> =
            std::collections::HashMap::new();
        let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Vec3>| {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let mid = ((vertices[a] + vertices[b]) * 0.5).normalize();
                vertices.push(mid);
                vertices.len() - 1
            })
        };
        let mut next = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            next.extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = next;
    }

    let mut edges: Vec<(usize, usize)> = faces
        .iter()
        .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
        .map(|(a, b)| (a.min(b), a.max(b)))
        .collect();
    edges.sort_unstable();
    edges.dedup();

    let positions = edges
        .iter()
        .flat_map(|&(a, b)| [vertices[a] * radius, vertices[b] * radius])
        .map(|v| v.to_array())
        .collect();
    LineGeometry { positions }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles (x, y, z) in radians.
    pub rotation: Vec3,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z),
            self.position,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mesh {
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub material_desc: LineMaterial,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh: None,
            children: Vec::new(),
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::group(name)
        }
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(name))
    }

    pub fn mesh_count(&self) -> usize {
        usize::from(self.mesh.is_some()) + self.children.iter().map(|c| c.mesh_count()).sum::<usize>()
    }

    fn collect_draws(&self, parent: Mat4, lights: &Lights, view_proj: Mat4, out: &mut Vec<DrawItem>) {
        let world = parent * self.transform.matrix();
        if let Some(mesh) = &self.mesh {
            let center = world.transform_point3(Vec3::ZERO);
            let light = lights.intensity_at(center);
            let [r, g, b] = mesh.material_desc.color;
            out.push(DrawItem {
                geometry: mesh.geometry,
                material: mesh.material,
                mvp: view_proj * world,
                color: [
                    (r * light).min(1.0),
                    (g * light).min(1.0),
                    (b * light).min(1.0),
                    mesh.material_desc.opacity,
                ],
            });
        }
        for child in &self.children {
            child.collect_draws(world, lights, view_proj, out);
        }
    }

    /// Release every GPU resource in this subtree, depth first. Failures are
    /// collected, never short-circuit the walk.
    pub fn release(&mut self, ctx: &mut dyn RenderContext, failures: &mut Vec<String>) {
        for child in self.children.iter_mut() {
            child.release(ctx, failures);
        }
        if let Some(mesh) = self.mesh.take() {
            if let Err(e) = ctx.release_geometry(mesh.geometry) {
                failures.push(format!("{}: geometry: {e}", self.name));
            }
            if let Err(e) = ctx.release_material(mesh.material) {
                failures.push(format!("{}: material: {e}", self.name));
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lights {
    pub ambient: f32,
    pub point_position: Vec3,
    pub point_intensity: f32,
    pub point_falloff: f32,
}

impl Lights {
    pub fn new(ambient: f32, point: &PointLightConfig) -> Self {
        Self {
            ambient,
            point_position: Vec3::from_array(point.position),
            point_intensity: point.intensity,
            point_falloff: point.falloff.max(f32::EPSILON),
        }
    }

    /// Brightness multiplier at `p`: ambient plus an inverse-square-ish point
    /// term that is half strength at `point_falloff`.
    pub fn intensity_at(&self, p: Vec3) -> f32 {
        let d = p.distance(self.point_position) / self.point_falloff;
        self.ambient + self.point_intensity / (1.0 + d * d)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub z: f32,
}

impl Camera {
    pub fn new(fov: f32, aspect: f32, z: f32) -> Self {
        Self {
            fov,
            aspect,
            near: 0.1,
            far: 1000.0,
            z,
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        let proj = Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect, self.near, self.far);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, self.z), Vec3::ZERO, Vec3::Y);
        proj * view
    }
}

/// Name of the group node the pointer and float motion is applied to.
pub const RIG: &str = "rig";
pub const LABEL: &str = "label";

pub struct Scene {
    pub root: SceneNode,
    pub camera: Camera,
    pub lights: Lights,
}

impl Scene {
    /// Upload the base primitives. On failure whatever was already uploaded
    /// is released again before returning.
    pub fn build(config: &HeroConfig, aspect: f32, ctx: &mut dyn RenderContext) -> FxResult<Self> {
        let mut rig = SceneNode::group(RIG);
        for (name, shape) in [("core", &config.core), ("shell", &config.shell)] {
            let material = LineMaterial::from_hex(shape.color, shape.opacity);
            match upload(ctx, &icosphere_edges(shape.radius, shape.detail), &material) {
                Ok(mesh) => rig.children.push(SceneNode::mesh(name, mesh)),
                Err(e) => {
                    rig.release(ctx, &mut Vec::new());
                    return Err(e);
                }
            }
        }
        let mut root = SceneNode::group("scene");
        root.children.push(rig);
        Ok(Self {
            root,
            camera: Camera::new(config.fov as f32, aspect, config.camera_z as f32),
            lights: Lights::new(config.ambient_intensity as f32, &config.point_light),
        })
    }

    pub fn rig_mut(&mut self) -> Option<&mut SceneNode> {
        self.root.find_mut(RIG)
    }

    pub fn draw_list(&self) -> Vec<DrawItem> {
        let mut out = Vec::new();
        self.root
            .collect_draws(Mat4::IDENTITY, &self.lights, self.camera.view_proj(), &mut out);
        out
    }

    pub fn resource_count(&self) -> usize {
        self.root.mesh_count() * 2
    }
}

pub fn upload(
    ctx: &mut dyn RenderContext,
    geometry: &LineGeometry,
    material: &LineMaterial,
) -> FxResult<Mesh> {
    let geometry = ctx.upload_geometry(geometry)?;
    let material_id = match ctx.upload_material(material) {
        Ok(id) => id,
        Err(e) => {
            let _ = ctx.release_geometry(geometry);
            return Err(e);
        }
    };
    Ok(Mesh {
        geometry,
        material: material_id,
        material_desc: *material,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icosahedron_has_thirty_edges() {
        assert_eq!(icosphere_edges(1.0, 0).segment_count(), 30);
    }

    #[test]
    fn one_subdivision_quadruples_faces() {
        // 80 faces, 120 unique edges
        assert_eq!(icosphere_edges(1.0, 1).segment_count(), 120);
    }

    #[test]
    fn vertices_sit_on_the_sphere() {
        for p in icosphere_edges(1.8, 1).positions {
            assert!((Vec3::from_array(p).length() - 1.8).abs() < 1e-4);
        }
    }

    #[test]
    fn light_is_brighter_near_the_point_light() {
        let lights = Lights::new(0.5, &PointLightConfig::default());
        let near = lights.intensity_at(Vec3::new(3.0, 3.0, 5.0));
        let far = lights.intensity_at(Vec3::new(-30.0, -30.0, -30.0));
        assert!(near > far);
        assert!(far >= 0.5);
    }
}
