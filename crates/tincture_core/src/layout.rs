//! Uniform Layout Conventions
//!
//! A [`Layout`] is a GPU-API-specific set of alignment and padding rules for
//! uniform and storage buffers. [`UniformOffsetCalculator`] applies those
//! rules to a sequence of typed fields, producing the byte offset of each.
//!
//! # Conventions
//!
//! | Layout | Array stride | vec3 size | Reduced precision |
//! |--------|--------------|-----------|-------------------|
//! | `Std140` | rounded to 16 bytes | 12 bytes | no |
//! | `Std430` | natural | 12 bytes | no |
//! | `Metal` | natural | 16 bytes | 2-byte halves |
//!
//! Matrices are laid out exactly like arrays of their column vectors.
//!
//! The same calculator drives both the declaration pass of program
//! generation and the value-writing pass of
//! [`UniformManager`](crate::uniform_manager::UniformManager), so the two can
//! never disagree on an offset.

use serde::{Deserialize, Serialize};

use crate::uniform::SlType;

/// Buffer layout convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Layout {
    /// Uniform buffers on GL, Vulkan and WebGPU.
    #[default]
    Std140,
    /// Storage buffers.
    Std430,
    /// Metal argument buffers.
    Metal,
}

/// The rules that distinguish one [`Layout`] from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRules {
    /// Arrays (and matrix columns) use 16-byte strides.
    pub align_arrays_as_vec4: bool,
    /// 3-component vectors occupy the size of 4 components.
    pub pad_vec3_size: bool,
    /// Reduced-precision types still use `base_element_size` storage.
    pub use_full_precision: bool,
    /// Bytes per full-precision scalar.
    pub base_element_size: u32,
}

impl Layout {
    #[must_use]
    pub const fn rules(self) -> LayoutRules {
        LayoutRules {
            align_arrays_as_vec4: matches!(self, Self::Std140),
            pad_vec3_size: matches!(self, Self::Metal),
            use_full_precision: !matches!(self, Self::Metal),
            base_element_size: 4,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Std140 => "std140",
            Self::Std430 => "std430",
            Self::Metal => "metal",
        }
    }
}

/// How one field is laid out: `elements` repetitions of `dimension`
/// scalars of `primitive_size` bytes each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Padded component count per element.
    pub dimension: u32,
    /// Components actually written per element.
    pub components: u32,
    /// Bytes per scalar.
    pub primitive_size: u32,
    /// Element count; matrix columns count as elements.
    pub elements: u32,
}

impl FieldLayout {
    #[inline]
    #[must_use]
    pub const fn alignment(&self) -> u32 {
        self.dimension.next_power_of_two() * self.primitive_size
    }

    #[inline]
    #[must_use]
    pub const fn stride(&self) -> u32 {
        self.dimension * self.primitive_size
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.stride() * self.elements
    }
}

#[inline]
const fn align_to(offset: u32, alignment: u32) -> u32 {
    debug_assert!(alignment.is_power_of_two());
    (offset + alignment - 1) & !(alignment - 1)
}

// ─── Offset Calculator ───────────────────────────────────────────────────────

/// Computes aligned offsets for a sequence of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformOffsetCalculator {
    layout: Layout,
    offset: u32,
    required_alignment: u32,
}

impl UniformOffsetCalculator {
    /// Calculator for a top-level uniform block.
    #[must_use]
    pub const fn for_top_level(layout: Layout) -> Self {
        Self {
            layout,
            offset: 0,
            required_alignment: 1,
        }
    }

    /// Calculator for the members of a nested struct. Under `Std140` a struct
    /// is always aligned to at least 16 bytes.
    #[must_use]
    pub const fn for_struct(layout: Layout) -> Self {
        Self {
            layout,
            offset: 0,
            required_alignment: if matches!(layout, Layout::Std140) {
                16
            } else {
                1
            },
        }
    }

    #[inline]
    #[must_use]
    pub const fn layout(&self) -> Layout {
        self.layout
    }

    /// Bytes consumed so far (unpadded).
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.offset
    }

    #[inline]
    #[must_use]
    pub const fn required_alignment(&self) -> u32 {
        self.required_alignment
    }

    /// Size padded to the required alignment: the offset a following sibling
    /// of this block would start at.
    #[inline]
    #[must_use]
    pub const fn aligned_size(&self) -> u32 {
        align_to(self.offset, self.required_alignment)
    }

    /// Per-element layout of a field of `ty` with `count` elements
    /// (`0` for a non-array).
    #[must_use]
    pub const fn field_layout(&self, ty: SlType, count: u32) -> FieldLayout {
        let rules = self.layout.rules();
        let mut count = count;
        let components = ty.vec_length();
        let mut dimension = components;

        if ty.is_matrix() {
            let matrices = if count == 0 { 1 } else { count };
            count = matrices * ty.matrix_size();
        }
        let is_array = count > 0;
        if (is_array && rules.align_arrays_as_vec4)
            || (dimension == 3 && (is_array || rules.pad_vec3_size))
        {
            dimension = 4;
        }

        let primitive_size = if rules.use_full_precision || ty.is_full_precision() {
            rules.base_element_size
        } else {
            rules.base_element_size / 2
        };

        FieldLayout {
            dimension,
            components,
            primitive_size,
            elements: if count == 0 { 1 } else { count },
        }
    }

    /// Reserves space for a field and returns its aligned offset.
    pub fn advance_offset(&mut self, ty: SlType, count: u32) -> u32 {
        let field = self.field_layout(ty, count);
        let alignment = field.alignment();
        let aligned = align_to(self.offset, alignment);
        self.offset = aligned + field.size();
        self.required_alignment = self.required_alignment.max(alignment);
        aligned
    }

    /// Reserves space for `count` copies (`0` for one) of a nested struct
    /// described by `sub` and returns its aligned offset.
    pub fn advance_struct(&mut self, sub: &Self, count: u32) -> u32 {
        debug_assert_eq!(sub.layout, self.layout, "nested struct uses a foreign layout");
        let alignment = sub.required_alignment;
        let stride = sub.aligned_size();
        let aligned = align_to(self.offset, alignment);
        self.offset = aligned + stride * count.max(1);
        self.required_alignment = self.required_alignment.max(alignment);
        aligned
    }
}
