//! Render Steps
//!
//! A render step is the geometry half of a pipeline: it owns vertex
//! generation and, optionally, analytic coverage. Steps are produced by an
//! external renderer; this crate only consumes their descriptor.
//!
//! # Program text contract
//!
//! - The vertex text must assign `float4 devPosition` and may assign
//!   `float2 stepLocalCoords`.
//! - The coverage text must assign `half4 outputCoverage`.
//! - The primitive-color text must assign `half4 primitiveColor`.
//!
//! All three are inserted verbatim.

use std::borrow::Cow;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tincture_core::{SlType, TextureAndSampler, Uniform};

/// Identifies a render step within one [`RenderStepRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderStepId(pub u32);

impl RenderStepId {
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Per-pixel coverage a render step produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Coverage {
    #[default]
    None,
    SingleChannel,
    /// Per-channel coverage for subpixel text.
    Lcd,
}

/// A vertex or instance attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: Cow<'static, str>,
    pub ty: SlType,
}

impl Attribute {
    #[must_use]
    pub const fn new(name: &'static str, ty: SlType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            ty,
        }
    }
}

/// A value interpolated from the vertex to the fragment stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Varying {
    pub name: Cow<'static, str>,
    pub ty: SlType,
}

impl Varying {
    #[must_use]
    pub const fn new(name: &'static str, ty: SlType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            ty,
        }
    }
}

// ─── Depth / Stencil ─────────────────────────────────────────────────────────

/// Stencil behavior for one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFace {
    pub compare: wgpu::CompareFunction,
    pub fail_op: wgpu::StencilOperation,
    pub depth_fail_op: wgpu::StencilOperation,
    pub pass_op: wgpu::StencilOperation,
}

impl Default for StencilFace {
    fn default() -> Self {
        Self {
            compare: wgpu::CompareFunction::Always,
            fail_op: wgpu::StencilOperation::Keep,
            depth_fail_op: wgpu::StencilOperation::Keep,
            pass_op: wgpu::StencilOperation::Keep,
        }
    }
}

impl From<StencilFace> for wgpu::StencilFaceState {
    fn from(face: StencilFace) -> Self {
        Self {
            compare: face.compare,
            fail_op: face.fail_op,
            depth_fail_op: face.depth_fail_op,
            pass_op: face.pass_op,
        }
    }
}

/// Fixed-function depth and stencil state of a render step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilSettings {
    pub depth_test_enabled: bool,
    pub depth_write_enabled: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub stencil_test_enabled: bool,
    pub front: StencilFace,
    pub back: StencilFace,
    pub stencil_read_mask: u32,
    pub stencil_write_mask: u32,
    pub stencil_reference: u32,
}

impl Default for DepthStencilSettings {
    fn default() -> Self {
        Self {
            depth_test_enabled: false,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil_test_enabled: false,
            front: StencilFace::default(),
            back: StencilFace::default(),
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
            stencil_reference: 0,
        }
    }
}

impl DepthStencilSettings {
    /// The `wgpu` stencil state, or the pass-through state if stencil testing
    /// is off.
    #[must_use]
    pub fn stencil_state(&self) -> wgpu::StencilState {
        if !self.stencil_test_enabled {
            return wgpu::StencilState {
                front: wgpu::StencilFaceState::IGNORE,
                back: wgpu::StencilFaceState::IGNORE,
                read_mask: 0,
                write_mask: 0,
            };
        }
        wgpu::StencilState {
            front: self.front.into(),
            back: self.back.into(),
            read_mask: self.stencil_read_mask,
            write_mask: self.stencil_write_mask,
        }
    }
}

// ─── Render Step ─────────────────────────────────────────────────────────────

/// The descriptor a renderer supplies for one geometry step.
#[derive(Debug, Clone)]
pub struct RenderStep {
    id: RenderStepId,
    name: String,
    uniforms: Vec<Uniform>,
    textures: Vec<TextureAndSampler>,
    vertex_attributes: Vec<Attribute>,
    instance_attributes: Vec<Attribute>,
    varyings: Vec<Varying>,
    vertex_program: String,
    coverage_program: Option<String>,
    primitive_color_program: Option<String>,
    coverage: Coverage,
    performs_shading: bool,
    depth_stencil: DepthStencilSettings,
}

impl RenderStep {
    #[must_use]
    pub fn new(id: RenderStepId, name: impl Into<String>, vertex_program: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            uniforms: Vec::new(),
            textures: Vec::new(),
            vertex_attributes: Vec::new(),
            instance_attributes: Vec::new(),
            varyings: Vec::new(),
            vertex_program: vertex_program.into(),
            coverage_program: None,
            primitive_color_program: None,
            coverage: Coverage::None,
            performs_shading: true,
            depth_stencil: DepthStencilSettings::default(),
        }
    }

    #[must_use]
    pub fn with_uniforms(mut self, uniforms: Vec<Uniform>) -> Self {
        self.uniforms = uniforms;
        self
    }

    #[must_use]
    pub fn with_textures(mut self, textures: Vec<TextureAndSampler>) -> Self {
        self.textures = textures;
        self
    }

    #[must_use]
    pub fn with_vertex_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.vertex_attributes = attributes;
        self
    }

    #[must_use]
    pub fn with_instance_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.instance_attributes = attributes;
        self
    }

    #[must_use]
    pub fn with_varyings(mut self, varyings: Vec<Varying>) -> Self {
        self.varyings = varyings;
        self
    }

    /// Analytic coverage computed by `program`.
    #[must_use]
    pub fn with_coverage(mut self, coverage: Coverage, program: impl Into<String>) -> Self {
        self.coverage = coverage;
        self.coverage_program = (coverage != Coverage::None).then(|| program.into());
        self
    }

    #[must_use]
    pub fn with_primitive_color(mut self, program: impl Into<String>) -> Self {
        self.primitive_color_program = Some(program.into());
        self
    }

    /// Depth-only and stencil-only steps do not shade.
    #[must_use]
    pub fn with_performs_shading(mut self, performs_shading: bool) -> Self {
        self.performs_shading = performs_shading;
        self
    }

    #[must_use]
    pub fn with_depth_stencil(mut self, settings: DepthStencilSettings) -> Self {
        self.depth_stencil = settings;
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> RenderStepId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn uniforms(&self) -> &[Uniform] {
        &self.uniforms
    }

    #[inline]
    #[must_use]
    pub fn textures(&self) -> &[TextureAndSampler] {
        &self.textures
    }

    #[inline]
    #[must_use]
    pub fn vertex_attributes(&self) -> &[Attribute] {
        &self.vertex_attributes
    }

    #[inline]
    #[must_use]
    pub fn instance_attributes(&self) -> &[Attribute] {
        &self.instance_attributes
    }

    #[inline]
    #[must_use]
    pub fn varyings(&self) -> &[Varying] {
        &self.varyings
    }

    #[inline]
    #[must_use]
    pub fn vertex_program(&self) -> &str {
        &self.vertex_program
    }

    #[inline]
    #[must_use]
    pub fn coverage_program(&self) -> Option<&str> {
        self.coverage_program.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn primitive_color_program(&self) -> Option<&str> {
        self.primitive_color_program.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn emits_primitive_color(&self) -> bool {
        self.primitive_color_program.is_some()
    }

    #[inline]
    #[must_use]
    pub fn coverage(&self) -> Coverage {
        self.coverage
    }

    #[inline]
    #[must_use]
    pub fn performs_shading(&self) -> bool {
        self.performs_shading
    }

    #[inline]
    #[must_use]
    pub fn depth_stencil(&self) -> &DepthStencilSettings {
        &self.depth_stencil
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Shared lookup from [`RenderStepId`] to its descriptor.
#[derive(Debug, Default)]
pub struct RenderStepRegistry {
    steps: RwLock<FxHashMap<RenderStepId, Arc<RenderStep>>>,
}

impl RenderStepRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `step`, replacing any earlier step with the same id.
    pub fn register(&self, step: RenderStep) -> Arc<RenderStep> {
        let step = Arc::new(step);
        let previous = self.steps.write().insert(step.id(), Arc::clone(&step));
        if previous.is_some() {
            log::warn!("Render step {} replaced an existing registration", step.id().0);
        }
        step
    }

    #[must_use]
    pub fn get(&self, id: RenderStepId) -> Option<Arc<RenderStep>> {
        self.steps.read().get(&id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.read().is_empty()
    }
}
