//! Render target description consumed by program generation.

use crate::caps::DstReadStrategy;

/// A four-component channel swizzle such as `"rgba"` or `"bgra"`.
///
/// Each component is one of `r`, `g`, `b`, `a`, `0`, `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swizzle([u8; 4]);

impl Default for Swizzle {
    fn default() -> Self {
        Self::RGBA
    }
}

impl Swizzle {
    pub const RGBA: Self = Self(*b"rgba");
    pub const BGRA: Self = Self(*b"bgra");
    pub const RRRA: Self = Self(*b"rrra");

    #[must_use]
    pub fn new(components: &str) -> Option<Self> {
        let bytes: [u8; 4] = components.as_bytes().try_into().ok()?;
        bytes
            .iter()
            .all(|c| matches!(c, b'r' | b'g' | b'b' | b'a' | b'0' | b'1'))
            .then_some(Self(bytes))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Constructors only admit ASCII.
        std::str::from_utf8(&self.0).unwrap_or("rgba")
    }

    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::RGBA
    }

    #[inline]
    #[must_use]
    pub const fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        let bytes = value.to_le_bytes();
        std::str::from_utf8(&bytes).ok().and_then(Self::new)
    }

    /// Applies the swizzle to a `half4` expression.
    #[must_use]
    pub fn apply(&self, expr: &str) -> String {
        let component = |c: u8| match c {
            b'0' => "0".to_string(),
            b'1' => "1".to_string(),
            c => format!("{expr}.{}", c as char),
        };
        let [r, g, b, a] = self.0.map(component);
        format!("half4({r}, {g}, {b}, {a})")
    }
}

/// The render pass a pipeline draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPassDesc {
    pub color_format: wgpu::TextureFormat,
    pub sample_count: u32,
    /// Applied to the final color before it is written.
    pub write_swizzle: Swizzle,
    pub dst_read_strategy: DstReadStrategy,
}

impl Default for RenderPassDesc {
    fn default() -> Self {
        Self {
            color_format: wgpu::TextureFormat::Rgba8Unorm,
            sample_count: 1,
            write_swizzle: Swizzle::RGBA,
            dst_read_strategy: DstReadStrategy::NoneRequired,
        }
    }
}
