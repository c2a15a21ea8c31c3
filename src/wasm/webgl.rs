use std::collections::HashMap;

use wasm_bindgen::JsCast;
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram, WebGlShader,
    WebGlUniformLocation, WebGlVertexArrayObject,
};

use super::host::soft;
use crate::error::{FxError, FxResult};
use crate::hero::render::{
    DrawItem, GeometryId, LineGeometry, LineMaterial, MaterialId, RenderContext, Surface,
};

/// Set on a canvas while a controller owns it.
const OWNER_ATTR: &str = "data-fx-owner";

const VERTEX_SHADER: &str = r#"#version 300 es
in vec3 a_position;
uniform mat4 u_mvp;
void main() {
    gl_Position = u_mvp * vec4(a_position, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;
uniform vec4 u_color;
out vec4 out_color;
void main() {
    out_color = u_color;
}
"#;

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self { canvas }
    }
}

impl Surface for CanvasSurface {
    fn label(&self) -> String {
        match self.canvas.id() {
            id if id.is_empty() => "canvas".into(),
            id => format!("#{id}"),
        }
    }

    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn try_claim(&self) -> bool {
        if self.canvas.has_attribute(OWNER_ATTR) {
            return false;
        }
        self.canvas.set_attribute(OWNER_ATTR, "hero").is_ok()
    }

    fn release_claim(&self) {
        soft("removeAttribute", self.canvas.remove_attribute(OWNER_ATTR));
    }

    fn is_claimed(&self) -> bool {
        self.canvas.has_attribute(OWNER_ATTR)
    }

    fn create_context(&self) -> FxResult<Box<dyn RenderContext>> {
        let gl: GL = self
            .canvas
            .get_context("webgl2")
            .map_err(|e| FxError::CapabilityUnavailable(format!("webgl2: {e:?}")))?
            .ok_or_else(|| FxError::CapabilityUnavailable("webgl2 not supported".into()))?
            .dyn_into()
            .map_err(|_| FxError::CapabilityUnavailable("webgl2 context has the wrong type".into()))?;
        if gl.is_context_lost() {
            return Err(FxError::ContextLost);
        }
        let program = link_program(&gl)?;
        let u_mvp = gl.get_uniform_location(&program, "u_mvp");
        let u_color = gl.get_uniform_location(&program, "u_color");
        let a_position = gl.get_attrib_location(&program, "a_position");
        if a_position < 0 {
            return Err(FxError::CapabilityUnavailable("a_position not bound".into()));
        }
        Ok(Box::new(GlContext {
            canvas: self.canvas.clone(),
            gl,
            program: Some(program),
            u_mvp,
            u_color,
            a_position: a_position as u32,
            geometries: HashMap::new(),
            materials: HashMap::new(),
            next_id: 1,
            disposed: false,
        }))
    }
}

fn compile_shader(gl: &GL, kind: u32, source: &str) -> FxResult<WebGlShader> {
    let shader = gl
        .create_shader(kind)
        .ok_or_else(|| FxError::CapabilityUnavailable("cannot create shader".into()))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);
    let ok = gl
        .get_shader_parameter(&shader, GL::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false);
    if ok {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(FxError::CapabilityUnavailable(format!("shader: {log}")))
    }
}

fn link_program(gl: &GL) -> FxResult<WebGlProgram> {
    let vertex = compile_shader(gl, GL::VERTEX_SHADER, VERTEX_SHADER)?;
    let fragment = compile_shader(gl, GL::FRAGMENT_SHADER, FRAGMENT_SHADER)?;
    let program = gl
        .create_program()
        .ok_or_else(|| FxError::CapabilityUnavailable("cannot create program".into()))?;
    gl.attach_shader(&program, &vertex);
    gl.attach_shader(&program, &fragment);
    gl.link_program(&program);
    // Shaders are no longer needed once linked.
    gl.delete_shader(Some(&vertex));
    gl.delete_shader(Some(&fragment));
    let ok = gl
        .get_program_parameter(&program, GL::LINK_STATUS)
        .as_bool()
        .unwrap_or(false);
    if ok {
        Ok(program)
    } else {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        Err(FxError::CapabilityUnavailable(format!("link: {log}")))
    }
}

struct GpuLines {
    vao: WebGlVertexArrayObject,
    buffer: WebGlBuffer,
    vertices: i32,
}

/// Line renderer on a WebGL2 context.
struct GlContext {
    canvas: HtmlCanvasElement,
    gl: GL,
    program: Option<WebGlProgram>,
    u_mvp: Option<WebGlUniformLocation>,
    u_color: Option<WebGlUniformLocation>,
    a_position: u32,
    geometries: HashMap<u32, GpuLines>,
    materials: HashMap<u32, LineMaterial>,
    next_id: u32,
    disposed: bool,
}

impl GlContext {
    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn usable(&self) -> FxResult<()> {
        if self.is_context_lost() {
            Err(FxError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn delete_lines(&self, lines: GpuLines) {
        self.gl.delete_vertex_array(Some(&lines.vao));
        self.gl.delete_buffer(Some(&lines.buffer));
    }
}

impl RenderContext for GlContext {
    fn is_context_lost(&self) -> bool {
        self.disposed || self.gl.is_context_lost()
    }

    fn upload_geometry(&mut self, geometry: &LineGeometry) -> FxResult<GeometryId> {
        self.usable()?;
        let gl = &self.gl;
        let flat: Vec<f32> = geometry.positions.iter().flatten().copied().collect();
        let vao = gl
            .create_vertex_array()
            .ok_or_else(|| FxError::CapabilityUnavailable("cannot create vertex array".into()))?;
        let Some(buffer) = gl.create_buffer() else {
            gl.delete_vertex_array(Some(&vao));
            return Err(FxError::CapabilityUnavailable("cannot create buffer".into()));
        };
        gl.bind_vertex_array(Some(&vao));
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        let data = js_sys::Float32Array::from(flat.as_slice());
        gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &data, GL::STATIC_DRAW);
        gl.enable_vertex_attrib_array(self.a_position);
        gl.vertex_attrib_pointer_with_i32(self.a_position, 3, GL::FLOAT, false, 0, 0);
        gl.bind_vertex_array(None);
        gl.bind_buffer(GL::ARRAY_BUFFER, None);

        let id = self.id();
        self.geometries.insert(
            id,
            GpuLines {
                vao,
                buffer,
                vertices: geometry.positions.len() as i32,
            },
        );
        Ok(GeometryId(id))
    }

    fn upload_material(&mut self, material: &LineMaterial) -> FxResult<MaterialId> {
        self.usable()?;
        let id = self.id();
        self.materials.insert(id, *material);
        Ok(MaterialId(id))
    }

    fn release_geometry(&mut self, id: GeometryId) -> FxResult<()> {
        let lines = self
            .geometries
            .remove(&id.0)
            .ok_or_else(|| FxError::Release(format!("unknown geometry {}", id.0)))?;
        self.delete_lines(lines);
        Ok(())
    }

    fn release_material(&mut self, id: MaterialId) -> FxResult<()> {
        self.materials
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| FxError::Release(format!("unknown material {}", id.0)))
    }

    fn set_size(&mut self, width: f64, height: f64, pixel_ratio: f64) {
        let px = |v: f64| (v * pixel_ratio).round().max(1.0) as u32;
        self.canvas.set_width(px(width));
        self.canvas.set_height(px(height));
    }

    fn render(&mut self, items: &[DrawItem]) -> FxResult<()> {
        self.usable()?;
        let gl = &self.gl;
        gl.viewport(0, 0, self.canvas.width() as i32, self.canvas.height() as i32);
        gl.clear_color(0.0, 0.0, 0.0, 0.0);
        gl.clear(GL::COLOR_BUFFER_BIT | GL::DEPTH_BUFFER_BIT);
        gl.enable(GL::BLEND);
        gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);
        gl.use_program(self.program.as_ref());
        for item in items {
            let Some(lines) = self.geometries.get(&item.geometry.0) else {
                continue;
            };
            gl.uniform_matrix4fv_with_f32_array(self.u_mvp.as_ref(), false, &item.mvp.to_cols_array());
            gl.uniform4fv_with_f32_array(self.u_color.as_ref(), &item.color);
            gl.bind_vertex_array(Some(&lines.vao));
            gl.draw_arrays(GL::LINES, 0, lines.vertices);
        }
        gl.bind_vertex_array(None);
        if gl.is_context_lost() {
            return Err(FxError::ContextLost);
        }
        Ok(())
    }

    fn dispose(&mut self) -> FxResult<()> {
        if self.disposed {
            return Err(FxError::Release("context already disposed".into()));
        }
        for (_, lines) in std::mem::take(&mut self.geometries) {
            self.delete_lines(lines);
        }
        self.materials.clear();
        if let Some(program) = self.program.take() {
            self.gl.delete_program(Some(&program));
        }
        // The canvas hands this same context to the next `getContext` call,
        // so it must stay usable after dispose.
        self.disposed = true;
        Ok(())
    }
}
