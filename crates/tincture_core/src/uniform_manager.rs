//! Uniform Data Writer
//!
//! [`UniformManager`] serializes concrete values into a contiguous byte
//! block, placing each field at the offset [`UniformOffsetCalculator`]
//! assigns it. Program generation runs the same calculator over the same
//! field sequence to emit declarations, so offsets agree by construction.
//!
//! In debug builds the manager also checks every write against the field
//! list the current block declared via
//! [`set_expected_uniforms`](UniformManager::set_expected_uniforms).

use std::hash::{Hash, Hasher};

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use half::f16;
use xxhash_rust::xxh3::xxh3_64;

use crate::layout::{Layout, UniformOffsetCalculator};
use crate::uniform::{SlType, Uniform};

// ─── Data Block ──────────────────────────────────────────────────────────────

/// An immutable, content-hashed block of uniform bytes.
#[derive(Debug, Clone)]
pub struct UniformDataBlock {
    data: Box<[u8]>,
    hash: u64,
}

impl UniformDataBlock {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        let hash = xxh3_64(&data);
        Self {
            data: data.into_boxed_slice(),
            hash,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for UniformDataBlock {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.data == other.data
    }
}

impl Eq for UniformDataBlock {}

impl Hash for UniformDataBlock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// Raw scalar values for one field, element-major, unpadded.
#[derive(Debug, Clone, Copy)]
pub enum UniformValues<'a> {
    Float(&'a [f32]),
    Int(&'a [i32]),
}

impl UniformValues<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct StructFrame {
    base_offset: u32,
    calc: UniformOffsetCalculator,
    #[cfg(debug_assertions)]
    expected: UniformOffsetCalculator,
}

// ─── Uniform Manager ─────────────────────────────────────────────────────────

/// Stateful writer for one uniform block. Single-threaded; one per draw
/// being recorded.
#[derive(Debug)]
pub struct UniformManager {
    layout: Layout,
    calc: UniformOffsetCalculator,
    storage: Vec<u8>,
    current_struct: Option<StructFrame>,
    wrote_paint_color: bool,

    #[cfg(debug_assertions)]
    expected: Vec<Uniform>,
    #[cfg(debug_assertions)]
    expected_index: usize,
}

impl UniformManager {
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            calc: UniformOffsetCalculator::for_top_level(layout),
            storage: Vec::new(),
            current_struct: None,
            wrote_paint_color: false,
            #[cfg(debug_assertions)]
            expected: Vec::new(),
            #[cfg(debug_assertions)]
            expected_index: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Bytes written so far, before final padding.
    #[inline]
    #[must_use]
    pub fn size(&self) -> u32 {
        self.calc.size()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calc.size() == 0
    }

    pub fn reset(&mut self) {
        self.calc = UniformOffsetCalculator::for_top_level(self.layout);
        self.storage.clear();
        self.current_struct = None;
        self.wrote_paint_color = false;
        #[cfg(debug_assertions)]
        {
            self.expected.clear();
            self.expected_index = 0;
        }
    }

    /// Consumes the written data as a block padded to the layout's required
    /// alignment, and resets the manager.
    #[must_use]
    pub fn finish(&mut self) -> UniformDataBlock {
        debug_assert!(self.current_struct.is_none(), "unterminated uniform struct");
        let size = self.calc.aligned_size() as usize;
        let mut data = std::mem::take(&mut self.storage);
        data.resize(size, 0);
        self.reset();
        UniformDataBlock::new(data)
    }

    // ─── Validation ──────────────────────────────────────────────────────────

    /// Declares the fields the next writes must match (debug builds only).
    pub fn set_expected_uniforms(&mut self, uniforms: &[Uniform]) {
        #[cfg(debug_assertions)]
        {
            debug_assert_eq!(
                self.expected_index,
                self.expected.len(),
                "previous block left uniforms unwritten"
            );
            self.expected.clear();
            self.expected.extend_from_slice(uniforms);
            self.expected_index = 0;
        }
        #[cfg(not(debug_assertions))]
        let _ = uniforms;
    }

    /// Asserts that every expected field was written (debug builds only).
    pub fn done_with_expected_uniforms(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert_eq!(
                self.expected_index,
                self.expected.len(),
                "uniform block finished with unwritten fields"
            );
            self.expected.clear();
            self.expected_index = 0;
        }
    }

    #[cfg(debug_assertions)]
    fn check_expected(&mut self, ty: SlType, count: u32, paint_color: bool) {
        if self.expected.is_empty() {
            return;
        }
        let Some(expected) = self.expected.get(self.expected_index) else {
            panic!("wrote more uniforms than declared");
        };
        assert_eq!(expected.ty(), ty, "uniform '{}' written with wrong type", expected.name());
        assert_eq!(
            expected.count(),
            count,
            "uniform '{}' written with wrong count",
            expected.name()
        );
        assert_eq!(expected.is_paint_color(), paint_color);
        self.expected_index += 1;
    }

    // ─── Raw Writes ──────────────────────────────────────────────────────────

    /// Writes one field and returns its offset in the block.
    ///
    /// `values` holds `max(count, 1) * ty.component_count()` scalars in
    /// element-major order; matrices are given column-major. Any other
    /// length panics in debug builds; release builds leave missing scalars
    /// zeroed.
    pub fn write(&mut self, ty: SlType, count: u32, values: UniformValues<'_>) -> u32 {
        #[cfg(debug_assertions)]
        self.check_expected(ty, count, false);
        self.write_field(ty, count, values)
    }

    fn write_field(&mut self, ty: SlType, count: u32, values: UniformValues<'_>) -> u32 {
        let field = match &self.current_struct {
            Some(frame) => frame.calc.field_layout(ty, count),
            None => self.calc.field_layout(ty, count),
        };
        debug_assert_eq!(
            values.len() as u32,
            field.elements * field.components,
            "value count does not match {} x{}",
            ty.name(),
            count
        );
        debug_assert_eq!(
            matches!(values, UniformValues::Int(_)),
            ty.is_integral(),
            "scalar kind does not match {}",
            ty.name()
        );

        let offset = match &mut self.current_struct {
            Some(frame) => frame.base_offset + frame.calc.advance_offset(ty, count),
            None => self.calc.advance_offset(ty, count),
        };

        let end = (offset + field.size()) as usize;
        if self.storage.len() < end {
            self.storage.resize(end, 0);
        }

        for element in 0..field.elements {
            for component in 0..field.components {
                let src = (element * field.components + component) as usize;
                let dst = (offset + element * field.stride() + component * field.primitive_size)
                    as usize;
                self.write_scalar(dst, field.primitive_size, values, src);
            }
        }
        offset
    }

    fn write_scalar(&mut self, dst: usize, size: u32, values: UniformValues<'_>, src: usize) {
        let out = &mut self.storage[dst..dst + size as usize];
        match (values, size) {
            (UniformValues::Float(v), 4) => {
                if let Some(x) = v.get(src) {
                    out.copy_from_slice(&x.to_le_bytes());
                }
            }
            (UniformValues::Float(v), _) => {
                if let Some(x) = v.get(src) {
                    out.copy_from_slice(&f16::from_f32(*x).to_le_bytes());
                }
            }
            (UniformValues::Int(v), 4) => {
                if let Some(x) = v.get(src) {
                    out.copy_from_slice(&x.to_le_bytes());
                }
            }
            (UniformValues::Int(v), _) => {
                if let Some(x) = v.get(src) {
                    out.copy_from_slice(&(*x as i16).to_le_bytes());
                }
            }
        }
    }

    // ─── Structs ─────────────────────────────────────────────────────────────

    /// Starts a nested struct whose members are `fields`. Subsequent writes
    /// land inside the struct until [`end_struct`](Self::end_struct).
    pub fn begin_struct(&mut self, fields: &[Uniform]) {
        debug_assert!(self.current_struct.is_none(), "nested uniform structs are not supported");
        let mut sub = UniformOffsetCalculator::for_struct(self.layout);
        for field in fields {
            sub.advance_offset(field.ty(), field.count());
        }
        let base_offset = self.calc.advance_struct(&sub, Uniform::NON_ARRAY);
        let end = (base_offset + sub.aligned_size()) as usize;
        if self.storage.len() < end {
            self.storage.resize(end, 0);
        }
        self.current_struct = Some(StructFrame {
            base_offset,
            calc: UniformOffsetCalculator::for_struct(self.layout),
            #[cfg(debug_assertions)]
            expected: sub,
        });
    }

    pub fn end_struct(&mut self) {
        let frame = self.current_struct.take();
        debug_assert!(frame.is_some(), "end_struct without begin_struct");
        #[cfg(debug_assertions)]
        if let Some(frame) = frame {
            debug_assert_eq!(frame.calc, frame.expected, "uniform struct written out of sync");
        }
    }

    // ─── Typed Writes ────────────────────────────────────────────────────────

    pub fn write_float(&mut self, value: f32) {
        self.write(SlType::Float, 0, UniformValues::Float(&[value]));
    }

    pub fn write_half(&mut self, value: f32) {
        self.write(SlType::Half, 0, UniformValues::Float(&[value]));
    }

    pub fn write_int(&mut self, value: i32) {
        self.write(SlType::Int, 0, UniformValues::Int(&[value]));
    }

    pub fn write_vec2(&mut self, value: Vec2) {
        self.write(SlType::Float2, 0, UniformValues::Float(&value.to_array()));
    }

    pub fn write_vec3(&mut self, value: Vec3) {
        self.write(SlType::Float3, 0, UniformValues::Float(&value.to_array()));
    }

    pub fn write_vec4(&mut self, value: Vec4) {
        self.write(SlType::Float4, 0, UniformValues::Float(&value.to_array()));
    }

    pub fn write_half4(&mut self, value: Vec4) {
        self.write(SlType::Half4, 0, UniformValues::Float(&value.to_array()));
    }

    pub fn write_mat3(&mut self, value: &Mat3) {
        self.write(SlType::Float3x3, 0, UniformValues::Float(&value.to_cols_array()));
    }

    pub fn write_half3x3(&mut self, value: &Mat3) {
        self.write(SlType::Half3x3, 0, UniformValues::Float(&value.to_cols_array()));
    }

    pub fn write_mat4(&mut self, value: &Mat4) {
        self.write(SlType::Float4x4, 0, UniformValues::Float(&value.to_cols_array()));
    }

    pub fn write_float_array(&mut self, values: &[f32]) {
        self.write(SlType::Float, values.len() as u32, UniformValues::Float(values));
    }

    pub fn write_half_array(&mut self, values: &[f32]) {
        self.write(SlType::Half, values.len() as u32, UniformValues::Float(values));
    }

    pub fn write_vec4_array(&mut self, values: &[Vec4]) {
        self.write(
            SlType::Float4,
            values.len() as u32,
            UniformValues::Float(bytemuck::cast_slice(values)),
        );
    }

    pub fn write_half4_array(&mut self, values: &[Vec4]) {
        self.write(
            SlType::Half4,
            values.len() as u32,
            UniformValues::Float(bytemuck::cast_slice(values)),
        );
    }

    /// Writes the shared paint color unless an earlier node already did.
    pub fn write_paint_color(&mut self, color: Vec4) {
        #[cfg(debug_assertions)]
        self.check_expected(SlType::Float4, 0, true);
        if self.wrote_paint_color {
            return;
        }
        self.wrote_paint_color = true;
        self.write_field(SlType::Float4, 0, UniformValues::Float(&color.to_array()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_f32(block: &UniformDataBlock, offset: usize) -> f32 {
        let bytes = &block.as_bytes()[offset..offset + 4];
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    #[test]
    fn finish_pads_to_required_alignment() {
        let mut mgr = UniformManager::new(Layout::Std140);
        mgr.write_vec4(Vec4::ONE);
        mgr.write_float(2.0);
        let block = mgr.finish();
        assert_eq!(block.len(), 32);
        assert_eq!(read_f32(&block, 16), 2.0);
        assert!(mgr.is_empty());
    }

    #[test]
    fn paint_color_is_written_once() {
        let mut mgr = UniformManager::new(Layout::Std430);
        mgr.write_paint_color(Vec4::new(1.0, 0.0, 0.0, 1.0));
        mgr.write_float(5.0);
        mgr.write_paint_color(Vec4::new(0.0, 1.0, 0.0, 1.0));
        let block = mgr.finish();
        assert_eq!(block.len(), 32);
        assert_eq!(read_f32(&block, 0), 1.0);
        assert_eq!(read_f32(&block, 16), 5.0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "value count does not match float4")]
    fn short_value_slice_is_caught() {
        let mut mgr = UniformManager::new(Layout::Std140);
        mgr.write(SlType::Float4, 0, UniformValues::Float(&[1.0, 2.0, 3.0]));
    }

    #[test]
    fn metal_writes_halves_as_f16() {
        let mut mgr = UniformManager::new(Layout::Metal);
        mgr.write_half(0.5);
        let block = mgr.finish();
        assert_eq!(block.len(), 2);
        assert_eq!(block.as_bytes(), f16::from_f32(0.5).to_le_bytes());
    }

    #[test]
    fn std140_mat3_columns_are_padded() {
        let mut mgr = UniformManager::new(Layout::Std140);
        mgr.write_mat3(&Mat3::from_cols_array(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]));
        let block = mgr.finish();
        assert_eq!(block.len(), 48);
        assert_eq!(read_f32(&block, 16), 4.0);
        assert_eq!(read_f32(&block, 12), 0.0);
        assert_eq!(read_f32(&block, 40), 9.0);
    }

    #[test]
    fn struct_members_follow_struct_offset() {
        let fields = [Uniform::new("a", SlType::Float), Uniform::new("b", SlType::Float2)];
        let mut mgr = UniformManager::new(Layout::Std140);
        mgr.write_float(1.0);
        mgr.begin_struct(&fields);
        mgr.write_float(2.0);
        mgr.write_vec2(Vec2::new(3.0, 4.0));
        mgr.end_struct();
        let block = mgr.finish();
        assert_eq!(block.len(), 32);
        assert_eq!(read_f32(&block, 16), 2.0);
        assert_eq!(read_f32(&block, 24), 3.0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "wrong type")]
    fn mismatched_write_is_caught_in_debug() {
        let mut mgr = UniformManager::new(Layout::Std140);
        mgr.set_expected_uniforms(&[Uniform::new("color", SlType::Float4)]);
        mgr.write_float(1.0);
    }

    #[test]
    fn equal_contents_hash_equal() {
        let mut a = UniformManager::new(Layout::Std430);
        let mut b = UniformManager::new(Layout::Std430);
        a.write_int(7);
        b.write_int(7);
        let (a, b) = (a.finish(), b.finish());
        assert_eq!(a, b);
        assert_eq!(a.content_hash(), b.content_hash());
    }
}
