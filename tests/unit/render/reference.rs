use super::*;
use crate::collection::{DrawCollection, ReprStyle, compute_render_tags};
use crate::foundation::core::{Matrix4d, Viewport};
use crate::render::index::RprimSync;
use crate::scene::stage::{DrawMode, PrimKind};
use crate::task::pass::{CameraState, RenderTaskParams};

fn p(s: &str) -> ScenePath {
    ScenePath::new(s).unwrap()
}

fn plugin(max_samples: u32) -> ReferenceBackendPlugin {
    ReferenceBackendPlugin::new(ReferenceBackendOpts { max_samples })
}

fn pass(delegate: &dyn RenderDelegate, aovs: &[AovId], drawn: &[&str], fp: u64) -> RenderPassState {
    RenderPassState {
        fingerprint: PassFingerprint { hi: 0, lo: fp },
        collection: DrawCollection::new(ReprStyle::SmoothHull, vec![ScenePath::root()]),
        render_tags: compute_render_tags(&[]),
        params: RenderTaskParams::default(),
        camera: CameraState {
            view: Matrix4d::IDENTITY,
            projection: Matrix4d::IDENTITY,
            scene_camera: None,
            window_policy: None,
            clip_planes: Vec::new(),
        },
        viewport: Viewport::new(0.0, 0.0, 4.0, 2.0),
        selection_enabled: false,
        aov_bindings: aovs
            .iter()
            .map(|aov| AovBinding {
                aov: aov.clone(),
                descriptor: delegate.default_output_descriptor(aov),
            })
            .collect(),
        drawn: drawn.iter().map(|s| p(s)).collect(),
    }
}

fn buffers(delegate: &dyn RenderDelegate, aovs: &[AovId]) -> Vec<RenderBuffer> {
    aovs.iter()
        .map(|aov| {
            let mut b = RenderBuffer::new(aov.clone(), delegate.default_output_descriptor(aov).format);
            b.allocate(4, 2);
            b
        })
        .collect()
}

fn rprim(id: &str) -> RprimSync {
    RprimSync {
        id: p(id),
        state: RprimState {
            kind: PrimKind::Mesh,
            tag: crate::foundation::ids::RenderTag::geometry(),
            visible: true,
            world_transform: Matrix4d::IDENTITY,
            refine_level: 1,
            material_enabled: false,
            draw_mode: DrawMode::Default,
            time: None,
        },
        dirty: crate::render::index::DirtyBits::ALL,
    }
}

#[test]
fn descriptors_cover_color_depth_and_prim_id_only() {
    let d = plugin(4).create_instance().unwrap();
    assert_eq!(
        d.default_output_descriptor(&AovId::color()).format,
        Format::Float32Vec4
    );
    assert_eq!(
        d.default_output_descriptor(&AovId::depth()).clear_value,
        ClearValue::Depth(1.0)
    );
    assert_eq!(
        d.default_output_descriptor(&AovId::prim_id()).format,
        Format::Int32
    );
    assert!(
        !d.default_output_descriptor(&AovId::new("bogus-aov"))
            .format
            .is_valid()
    );
    assert!(d.supports_output_buffers());
}

#[test]
fn live_instances_track_created_delegates() {
    let plugin = plugin(4);
    let a = plugin.create_instance().unwrap();
    let b = plugin.create_instance().unwrap();
    assert_eq!(plugin.live_instances(), 2);
    drop(a);
    assert_eq!(plugin.live_instances(), 1);
    plugin.destroy_instance(b);
    assert_eq!(plugin.live_instances(), 0);
}

#[test]
fn empty_pass_converges_after_one_execute_with_clear_color() {
    let mut d = plugin(8).create_instance().unwrap();
    assert!(!d.is_converged());

    let aovs = [AovId::color()];
    let pass = pass(d.as_ref(), &aovs, &[], 1);
    let mut bufs = buffers(d.as_ref(), &aovs);
    d.execute(&pass, &mut bufs).unwrap();
    assert!(d.is_converged());
    assert!(
        bufs[0]
            .as_f32()
            .unwrap()
            .chunks_exact(4)
            .all(|px| px == [0.0, 0.0, 0.0, 1.0])
    );
}

#[test]
fn progressive_pass_converges_after_max_samples_and_restarts_on_change() {
    let mut d = plugin(3).create_instance().unwrap();
    let aovs = [AovId::color()];
    let first = pass(d.as_ref(), &aovs, &["/A"], 1);
    let mut bufs = buffers(d.as_ref(), &aovs);

    d.execute(&first, &mut bufs).unwrap();
    assert!(!d.is_converged());
    d.execute(&first, &mut bufs).unwrap();
    assert!(!d.is_converged());
    d.execute(&first, &mut bufs).unwrap();
    assert!(d.is_converged());

    let converged = bufs[0].as_f32().unwrap().to_vec();
    d.execute(&first, &mut bufs).unwrap();
    assert!(d.is_converged());
    assert_eq!(bufs[0].as_f32().unwrap(), converged.as_slice());

    let moved = pass(d.as_ref(), &aovs, &["/A"], 2);
    d.execute(&moved, &mut bufs).unwrap();
    assert!(!d.is_converged());
}

#[test]
fn synced_changes_restart_accumulation() {
    let mut d = plugin(1).create_instance().unwrap();
    let aovs = [AovId::color()];
    let pass = pass(d.as_ref(), &aovs, &["/A"], 7);
    let mut bufs = buffers(d.as_ref(), &aovs);
    d.execute(&pass, &mut bufs).unwrap();
    assert!(d.is_converged());

    d.sync(&SyncBatch::default()).unwrap();
    assert!(d.is_converged());

    d.sync(&SyncBatch {
        synced: vec![rprim("/A")],
        removed: Vec::new(),
    })
    .unwrap();
    assert!(!d.is_converged());
    d.execute(&pass, &mut bufs).unwrap();
    assert!(d.is_converged());
}

#[test]
fn covered_pixels_fill_depth_and_prim_id() {
    let mut d = plugin(1).create_instance().unwrap();
    let aovs = [AovId::color(), AovId::depth(), AovId::prim_id()];
    let pass = pass(d.as_ref(), &aovs, &["/A", "/B"], 1);
    let mut bufs = buffers(d.as_ref(), &aovs);
    d.execute(&pass, &mut bufs).unwrap();

    assert!(bufs[1].as_f32().unwrap().iter().all(|&z| z == 0.5));
    // 4 columns split into two bands, two rows.
    assert_eq!(bufs[2].as_i32().unwrap(), &[0, 0, 1, 1, 0, 0, 1, 1]);
    assert!(
        bufs[0]
            .as_f32()
            .unwrap()
            .chunks_exact(4)
            .all(|px| px[3] == 1.0 && px[0] > 0.0)
    );
}

#[test]
fn buffer_count_mismatch_is_a_backend_error() {
    let mut d = plugin(1).create_instance().unwrap();
    let aovs = [AovId::color(), AovId::depth()];
    let pass = pass(d.as_ref(), &aovs, &[], 1);
    let mut bufs = buffers(d.as_ref(), &aovs[..1]);
    let err = d.execute(&pass, &mut bufs).unwrap_err();
    assert!(matches!(err, StagehandError::Backend(_)));
}
