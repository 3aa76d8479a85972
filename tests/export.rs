use std::sync::Arc;

use parking_lot::Mutex;

use cyber_container::render::PipelineSettings;
use cyber_container::scene::SceneSettings;
use cyber_container::{
    ExportController, ExportError, ExportPhase, ExportRequest, IsometricProjector, PipelineError,
    RenderPipeline, RenderTargetState, Scene, SceneAssembler,
};

fn scene() -> Scene {
    SceneAssembler::new(SceneSettings {
        seed: Some(11),
        ..SceneSettings::default()
    })
    .assemble()
    .unwrap()
}

fn pipeline(settings: PipelineSettings) -> RenderPipeline {
    RenderPipeline::new(
        PipelineSettings {
            samples: 1,
            band_height: 32,
            ..settings
        },
        RenderTargetState::new(800, 600),
    )
    .unwrap()
}

fn controller() -> ExportController {
    ExportController::new(IsometricProjector::default(), 6.0).unwrap()
}

#[test]
fn export_produces_square_png_and_restores_viewport() {
    let scene = scene();
    let mut pipeline = pipeline(PipelineSettings::default());
    let mut controller = controller();

    let image = controller
        .export(&mut pipeline, &scene, 0.5, &ExportRequest::new(96, Some("icon")))
        .unwrap();

    assert_eq!(image.filename, "icon-96.png");
    let decoded = image::load_from_memory(&image.png).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (96, 96));
    assert!(decoded.pixels().all(|p| p[3] == 255));

    assert_eq!(pipeline.target_state(), RenderTargetState::new(800, 600));
    assert_eq!(pipeline.buffer_dimensions(), Some((800, 600)));
    assert_eq!(controller.phase(), ExportPhase::Idle);
}

#[test]
fn filenames_follow_request() {
    let named = ExportRequest::new(1024, Some("icon"));
    assert_eq!(named.resolved_filename("cyber-container"), "icon-1024.png");

    let unnamed = ExportRequest::new(7680, None::<String>);
    assert_eq!(
        unnamed.resolved_filename("cyber-container"),
        "cyber-container-7680.png"
    );

    let verbatim = ExportRequest::new(512, Some("Poster.PNG"));
    assert_eq!(verbatim.resolved_filename("cyber-container"), "Poster.PNG");
}

#[test]
fn second_export_is_rejected_while_one_runs() {
    let scene = scene();
    let mut pipeline = pipeline(PipelineSettings::default());
    let controller = controller();
    let client = controller.client();

    let attempts = Arc::new(Mutex::new(Vec::new()));
    let inner_client = client.clone();
    let record = Arc::clone(&attempts);
    let mut controller = controller.with_observer(move |phase| {
        if phase == ExportPhase::RenderingAtTarget {
            record.lock().push(inner_client.request_export(32, None));
        }
    });

    controller
        .export(&mut pipeline, &scene, 0.0, &ExportRequest::new(48, None::<String>))
        .unwrap();

    let attempts = attempts.lock();
    assert_eq!(attempts.len(), 1);
    assert!(matches!(attempts[0], Err(ExportError::ConcurrentExportRejected)));
    assert_eq!(pipeline.target_state(), RenderTargetState::new(800, 600));
    // nothing was queued behind the running export
    assert!(!controller.poll(&mut pipeline, &scene, 0.0));
    assert!(!client.is_busy());
}

#[test]
fn readback_failure_still_restores_target() {
    let scene = scene();
    let mut pipeline = pipeline(PipelineSettings {
        preserve_drawing_buffer: false,
        ..PipelineSettings::default()
    });
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let mut controller = controller().with_observer(move |p| log.lock().push(p));

    let err = controller
        .export(&mut pipeline, &scene, 0.0, &ExportRequest::new(40, None::<String>))
        .unwrap_err();

    assert!(matches!(err, ExportError::EncodingError(_)));
    assert_eq!(pipeline.target_state(), RenderTargetState::new(800, 600));
    assert_eq!(pipeline.buffer_dimensions(), Some((800, 600)));
    assert_eq!(
        *seen.lock(),
        vec![
            ExportPhase::Reconfiguring,
            ExportPhase::RenderingAtTarget,
            ExportPhase::Encoding,
            ExportPhase::Failed,
            ExportPhase::Restoring,
            ExportPhase::Idle,
        ]
    );
}

#[test]
fn oversized_export_fails_and_restores_target() {
    let scene = scene();
    let mut pipeline = pipeline(PipelineSettings {
        max_dimension: 1024,
        ..PipelineSettings::default()
    });
    let mut controller = controller();

    let err = controller
        .export(&mut pipeline, &scene, 0.0, &ExportRequest::new(2048, None::<String>))
        .unwrap_err();

    assert!(matches!(
        err,
        ExportError::PipelineResizeFailure(PipelineError::ExceedsMaxDimension { .. })
    ));
    assert_eq!(pipeline.target_state(), RenderTargetState::new(800, 600));
    assert_eq!(controller.phase(), ExportPhase::Idle);

    // the controller accepts work again afterwards
    controller
        .export(&mut pipeline, &scene, 0.0, &ExportRequest::new(16, None::<String>))
        .unwrap();
}

#[test]
fn resizing_to_the_same_state_does_not_reallocate() {
    let mut pipeline = pipeline(PipelineSettings::default());
    let before = pipeline.allocation_count();
    pipeline.apply_state(RenderTargetState::new(800, 600)).unwrap();
    pipeline.set_size(800, 600).unwrap();
    assert_eq!(pipeline.allocation_count(), before);

    pipeline.set_size(400, 300).unwrap();
    pipeline.set_size(800, 600).unwrap();
    assert_eq!(pipeline.allocation_count(), before + 2);
}
