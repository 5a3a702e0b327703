//! Shading-language types and uniform declarations.

use std::borrow::Cow;

/// Element types that may appear in a uniform block.
///
/// `Half*` and `Short*` are reduced precision and only use 2-byte storage
/// under a layout that permits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlType {
    Float,
    Float2,
    Float3,
    Float4,
    Float2x2,
    Float3x3,
    Float4x4,

    Half,
    Half2,
    Half3,
    Half4,
    Half2x2,
    Half3x3,
    Half4x4,

    Int,
    Int2,
    Int3,
    Int4,

    Short,
    Short2,
    Short3,
    Short4,

    UInt,
}

impl SlType {
    /// Components per vector, or per column for matrices.
    #[must_use]
    pub const fn vec_length(self) -> u32 {
        match self {
            Self::Float | Self::Half | Self::Int | Self::Short | Self::UInt => 1,
            Self::Float2 | Self::Half2 | Self::Int2 | Self::Short2 => 2,
            Self::Float3 | Self::Half3 | Self::Int3 | Self::Short3 => 3,
            Self::Float4 | Self::Half4 | Self::Int4 | Self::Short4 => 4,
            Self::Float2x2 | Self::Half2x2 => 2,
            Self::Float3x3 | Self::Half3x3 => 3,
            Self::Float4x4 | Self::Half4x4 => 4,
        }
    }

    /// Column count for square matrices, zero otherwise.
    #[must_use]
    pub const fn matrix_size(self) -> u32 {
        match self {
            Self::Float2x2 | Self::Half2x2 => 2,
            Self::Float3x3 | Self::Half3x3 => 3,
            Self::Float4x4 | Self::Half4x4 => 4,
            _ => 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_matrix(self) -> bool {
        self.matrix_size() != 0
    }

    /// The vector type of one matrix column; identity for non-matrices.
    #[must_use]
    pub const fn column_type(self) -> Self {
        match self {
            Self::Float2x2 => Self::Float2,
            Self::Float3x3 => Self::Float3,
            Self::Float4x4 => Self::Float4,
            Self::Half2x2 => Self::Half2,
            Self::Half3x3 => Self::Half3,
            Self::Half4x4 => Self::Half4,
            other => other,
        }
    }

    #[must_use]
    pub const fn is_full_precision(self) -> bool {
        !matches!(
            self,
            Self::Half
                | Self::Half2
                | Self::Half3
                | Self::Half4
                | Self::Half2x2
                | Self::Half3x3
                | Self::Half4x4
                | Self::Short
                | Self::Short2
                | Self::Short3
                | Self::Short4
        )
    }

    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::Int2
                | Self::Int3
                | Self::Int4
                | Self::Short
                | Self::Short2
                | Self::Short3
                | Self::Short4
                | Self::UInt
        )
    }

    /// Scalar components per element, counting every matrix entry.
    #[must_use]
    pub const fn component_count(self) -> u32 {
        match self.matrix_size() {
            0 => self.vec_length(),
            n => n * n,
        }
    }

    /// Name in generated program text.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Float4 => "float4",
            Self::Float2x2 => "float2x2",
            Self::Float3x3 => "float3x3",
            Self::Float4x4 => "float4x4",
            Self::Half => "half",
            Self::Half2 => "half2",
            Self::Half3 => "half3",
            Self::Half4 => "half4",
            Self::Half2x2 => "half2x2",
            Self::Half3x3 => "half3x3",
            Self::Half4x4 => "half4x4",
            Self::Int => "int",
            Self::Int2 => "int2",
            Self::Int3 => "int3",
            Self::Int4 => "int4",
            Self::Short => "short",
            Self::Short2 => "short2",
            Self::Short3 => "short3",
            Self::Short4 => "short4",
            Self::UInt => "uint",
        }
    }
}

/// One named, typed field of a uniform block.
///
/// `count == 0` declares a scalar field; any other value an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uniform {
    name: Cow<'static, str>,
    ty: SlType,
    count: u32,
    is_paint_color: bool,
}

impl Uniform {
    pub const NON_ARRAY: u32 = 0;

    #[must_use]
    pub const fn new(name: &'static str, ty: SlType) -> Self {
        Self::array(name, ty, Self::NON_ARRAY)
    }

    #[must_use]
    pub const fn array(name: &'static str, ty: SlType, count: u32) -> Self {
        Self {
            name: Cow::Borrowed(name),
            ty,
            count,
            is_paint_color: false,
        }
    }

    /// Runtime-declared uniform with an owned name.
    #[must_use]
    pub fn owned(name: impl Into<String>, ty: SlType, count: u32) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            ty,
            count,
            is_paint_color: false,
        }
    }

    /// The shared paint color: written once per block however many nodes
    /// reference it.
    #[must_use]
    pub const fn paint_color() -> Self {
        Self {
            name: Cow::Borrowed("paintColor"),
            ty: SlType::Float4,
            count: Self::NON_ARRAY,
            is_paint_color: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn ty(&self) -> SlType {
        self.ty
    }

    #[inline]
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        self.count != Self::NON_ARRAY
    }

    #[inline]
    #[must_use]
    pub const fn is_paint_color(&self) -> bool {
        self.is_paint_color
    }

    /// Bytes the CPU-side values occupy when tightly packed (4 bytes per
    /// component).
    #[must_use]
    pub const fn packed_size(&self) -> u32 {
        let count = if self.count == 0 { 1 } else { self.count };
        self.ty.component_count() * 4 * count
    }
}

/// A texture and its sampler, referenced by a snippet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureAndSampler {
    name: Cow<'static, str>,
}

impl TextureAndSampler {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
