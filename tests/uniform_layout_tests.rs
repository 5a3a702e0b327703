//! Uniform layout tests
//!
//! Tests for:
//! - Declare-only and value-writing passes agreeing on every offset
//! - Finished block sizes and alignment
//! - Reduced-precision storage under the Metal convention
//! - Paint color deduplication

use glam::Vec4;
use tincture::core::{Layout, SlType, Uniform, UniformManager, UniformOffsetCalculator, UniformValues};

const LAYOUTS: [Layout; 3] = [Layout::Std140, Layout::Std430, Layout::Metal];

fn field_sequences() -> Vec<Vec<(SlType, u32)>> {
    vec![
        vec![(SlType::Float, 0), (SlType::Float4, 0), (SlType::Float2, 0)],
        vec![(SlType::Half, 0), (SlType::Float3, 0), (SlType::Half3, 0), (SlType::Int, 0)],
        vec![(SlType::Float4, 3), (SlType::Half, 7), (SlType::Float2, 2)],
        vec![(SlType::Float3x3, 0), (SlType::Float, 0), (SlType::Float4x4, 0)],
        vec![(SlType::Half3x3, 0), (SlType::Int4, 0), (SlType::Short2, 0), (SlType::UInt, 0)],
        vec![(SlType::Float2x2, 2), (SlType::Half4, 0), (SlType::Float3, 4)],
    ]
}

fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes.chunks_exact(4).map(bytemuck::pod_read_unaligned).collect()
}

fn write_field(manager: &mut UniformManager, ty: SlType, count: u32) -> u32 {
    let len = (ty.component_count() * count.max(1)) as usize;
    if ty.is_integral() {
        let values: Vec<i32> = (0..len as i32).collect();
        manager.write(ty, count, UniformValues::Int(&values))
    } else {
        let values: Vec<f32> = (0..len).map(|i| i as f32 * 0.5).collect();
        manager.write(ty, count, UniformValues::Float(&values))
    }
}

// ============================================================================
// Declare / Write Parity
// ============================================================================

#[test]
fn declare_and_write_offsets_agree() {
    for layout in LAYOUTS {
        for fields in field_sequences() {
            let mut declared = UniformOffsetCalculator::for_top_level(layout);
            let mut manager = UniformManager::new(layout);
            let mut previous = 0;

            for &(ty, count) in &fields {
                let declared_offset = declared.advance_offset(ty, count);
                let written_offset = write_field(&mut manager, ty, count);
                assert_eq!(
                    declared_offset,
                    written_offset,
                    "{} {} x{count} in {fields:?}",
                    layout.name(),
                    ty.name()
                );
                assert!(written_offset >= previous, "offsets must not decrease");
                previous = written_offset;
            }

            let block = manager.finish();
            assert_eq!(block.len() as u32, declared.aligned_size());
            assert_eq!(block.len() as u32 % declared.required_alignment(), 0);
        }
    }
}

#[test]
fn struct_offsets_agree() {
    let fields = [
        Uniform::new("flags", SlType::Int),
        Uniform::new("gamut", SlType::Half3x3),
        Uniform::array("coeffs", SlType::Half, 7),
    ];
    for layout in LAYOUTS {
        let mut sub = UniformOffsetCalculator::for_struct(layout);
        for field in &fields {
            sub.advance_offset(field.ty(), field.count());
        }
        let mut declared = UniformOffsetCalculator::for_top_level(layout);
        declared.advance_offset(SlType::Float, 0);
        let struct_offset = declared.advance_struct(&sub, 0);
        let trailing = declared.advance_offset(SlType::Float4, 0);

        let mut manager = UniformManager::new(layout);
        write_field(&mut manager, SlType::Float, 0);
        manager.begin_struct(&fields);
        let first_member = write_field(&mut manager, SlType::Int, 0);
        write_field(&mut manager, SlType::Half3x3, 0);
        write_field(&mut manager, SlType::Half, 7);
        manager.end_struct();
        let written_trailing = write_field(&mut manager, SlType::Float4, 0);

        assert_eq!(first_member, struct_offset, "{}", layout.name());
        assert_eq!(written_trailing, trailing, "{}", layout.name());
    }
}

// ============================================================================
// Precision
// ============================================================================

#[test]
fn metal_stores_halves_in_two_bytes() {
    let mut manager = UniformManager::new(Layout::Metal);
    manager.write_half4(Vec4::new(1.0, 0.5, 0.25, 2.0));
    let block = manager.finish();
    assert_eq!(block.len(), 8);

    let bytes = block.as_bytes();
    let decoded: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|pair| half::f16::from_le_bytes([pair[0], pair[1]]).to_f32())
        .collect();
    assert_eq!(decoded, [1.0, 0.5, 0.25, 2.0]);
}

#[test]
fn std140_stores_halves_at_full_precision() {
    let mut manager = UniformManager::new(Layout::Std140);
    manager.write_half4(Vec4::new(1.0, 0.5, 0.25, 2.0));
    let block = manager.finish();
    assert_eq!(block.len(), 16);
    assert_eq!(floats(block.as_bytes()), [1.0, 0.5, 0.25, 2.0]);
}

// ============================================================================
// Paint Color
// ============================================================================

#[test]
fn paint_color_is_written_once() {
    let mut manager = UniformManager::new(Layout::Std140);
    manager.write_paint_color(Vec4::ONE);
    manager.write_paint_color(Vec4::ZERO);
    manager.write_float(3.0);
    let block = manager.finish();
    assert_eq!(block.len(), 32);
    assert_eq!(floats(block.as_bytes())[..5], [1.0, 1.0, 1.0, 1.0, 3.0]);
}
