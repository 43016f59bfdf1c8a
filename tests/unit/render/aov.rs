use super::*;

#[test]
fn format_components_and_validity() {
    assert!(!Format::Invalid.is_valid());
    assert!(Format::Float32Vec4.is_valid());
    assert_eq!(Format::Float32Vec4.components(), 4);
    assert_eq!(Format::UNorm8Vec4.components(), 4);
    assert_eq!(Format::Float32.components(), 1);
    assert_eq!(Format::Int32.components(), 1);
    assert_eq!(OutputDescriptor::invalid().format, Format::Invalid);
}

#[test]
fn allocate_sizes_storage_by_format_and_skips_same_size() {
    let mut color = RenderBuffer::new(AovId::color(), Format::Float32Vec4);
    assert!(color.allocate(4, 2));
    assert_eq!(color.as_f32().map(<[f32]>::len), Some(4 * 2 * 4));
    assert!(!color.allocate(4, 2));
    assert!(color.allocate(1, 1));
    assert_eq!(color.as_f32().map(<[f32]>::len), Some(4));

    let mut ids = RenderBuffer::new(AovId::prim_id(), Format::Int32);
    ids.allocate(3, 3);
    assert_eq!(ids.as_i32().map(<[i32]>::len), Some(9));
    assert!(ids.as_f32().is_none());

    let mut ldr = RenderBuffer::new(AovId::color(), Format::UNorm8Vec4);
    ldr.allocate(2, 2);
    assert_eq!(ldr.as_u8().map(<[u8]>::len), Some(16));
}

#[test]
fn clear_writes_matching_values_only() {
    let mut color = RenderBuffer::new(AovId::color(), Format::Float32Vec4);
    color.allocate(2, 1);
    color.clear(ClearValue::Color([0.25, 0.5, 0.75, 1.0]));
    assert_eq!(
        color.as_f32().unwrap(),
        &[0.25, 0.5, 0.75, 1.0, 0.25, 0.5, 0.75, 1.0]
    );
    color.clear(ClearValue::Depth(1.0));
    assert_eq!(color.as_f32().unwrap()[0], 0.25);

    let mut depth = RenderBuffer::new(AovId::depth(), Format::Float32);
    depth.allocate(2, 2);
    depth.clear(ClearValue::Depth(1.0));
    assert!(depth.as_f32().unwrap().iter().all(|&d| d == 1.0));
    depth.clear(ClearValue::Color([0.0; 4]));
    assert!(depth.as_f32().unwrap().iter().all(|&d| d == 1.0));

    let mut ids = RenderBuffer::new(AovId::prim_id(), Format::Int32);
    ids.allocate(2, 2);
    ids.clear(ClearValue::Id(-1));
    assert!(ids.as_i32().unwrap().iter().all(|&i| i == -1));

    let mut ldr = RenderBuffer::new(AovId::color(), Format::UNorm8Vec4);
    ldr.allocate(1, 1);
    ldr.clear(ClearValue::Color([1.0, 0.0, 0.5, 1.0]));
    assert_eq!(ldr.as_u8().unwrap(), &[255, 0, 128, 255]);
}
