//! Exclusive, self-restoring high-resolution export.
//!
//! An export borrows the live render target, renders the scene square at the
//! requested size, encodes it and puts the target back exactly as it was.
//! Everything runs on the render loop's thread, between interactive frames.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::camera::{CameraFrame, IsometricProjector};
use crate::error::{EncodeError, ExportError, InvalidParameters, PipelineError};
use crate::export::client::ExportClient;
use crate::export::encode::encode_png;
use crate::export::request::{DEFAULT_BASENAME, ExportRequest};
use crate::render::{RenderPipeline, RenderTargetState};
use crate::scene::Scene;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExportPhase {
    #[default]
    Idle,
    Reconfiguring,
    RenderingAtTarget,
    Encoding,
    Restoring,
    Failed,
}

#[derive(Debug, Default)]
pub(crate) struct ExportStatus {
    pub(crate) phase: ExportPhase,
    /// A request sits in the channel and has not started yet.
    pub(crate) pending: bool,
}

impl ExportStatus {
    pub(crate) fn is_busy(&self) -> bool {
        self.pending || self.phase != ExportPhase::Idle
    }
}

/// Encoded PNG plus the name it should be saved under.
#[derive(Clone, Debug)]
pub struct ExportedImage {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl ExportedImage {
    pub fn save(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        fs::write(&path, &self.png)?;
        Ok(path)
    }
}

#[derive(Debug)]
pub struct ExportOutcome {
    pub request: ExportRequest,
    pub result: Result<ExportedImage, ExportError>,
}

/// Holds the render target for the length of an export. The saved state goes
/// back on `release`, or on drop if `release` was never reached.
pub struct RenderTargetLease<'p> {
    pipeline: &'p mut RenderPipeline,
    saved: RenderTargetState,
    released: bool,
}

impl<'p> RenderTargetLease<'p> {
    pub fn acquire(pipeline: &'p mut RenderPipeline) -> Self {
        let saved = pipeline.target_state();
        Self {
            pipeline,
            saved,
            released: false,
        }
    }

    pub fn saved(&self) -> RenderTargetState {
        self.saved
    }

    pub fn pipeline(&mut self) -> &mut RenderPipeline {
        self.pipeline
    }

    pub fn release(mut self) -> Result<(), PipelineError> {
        self.released = true;
        self.pipeline.apply_state(self.saved)
    }
}

impl Drop for RenderTargetLease<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.pipeline.apply_state(self.saved) {
            error!("render target left at {:?}: {e}", self.pipeline.target_state());
        }
    }
}

/// Puts the shared phase back to idle however the session ends.
struct Session {
    status: Arc<Mutex<ExportStatus>>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.status.lock().phase = ExportPhase::Idle;
    }
}

type PhaseObserver = Box<dyn FnMut(ExportPhase) + Send>;

pub struct ExportController {
    camera: CameraFrame,
    default_basename: String,
    status: Arc<Mutex<ExportStatus>>,
    tx_request: Sender<ExportRequest>,
    rx_request: Receiver<ExportRequest>,
    tx_outcome: Sender<ExportOutcome>,
    rx_outcome: Receiver<ExportOutcome>,
    observer: Option<PhaseObserver>,
}

impl ExportController {
    /// Exports are framed square, so the frustum is fixed at aspect 1.
    pub fn new(projector: IsometricProjector, zoom_scale: f32) -> Result<Self, InvalidParameters> {
        let camera = projector.compute_frustum(1.0, zoom_scale)?;
        let (tx_request, rx_request) = channel::unbounded();
        let (tx_outcome, rx_outcome) = channel::unbounded();
        Ok(Self {
            camera,
            default_basename: DEFAULT_BASENAME.to_string(),
            status: Arc::new(Mutex::new(ExportStatus::default())),
            tx_request,
            rx_request,
            tx_outcome,
            rx_outcome,
            observer: None,
        })
    }

    pub fn with_default_basename(mut self, basename: impl Into<String>) -> Self {
        self.default_basename = basename.into();
        self
    }

    /// Calls `observer` on every phase change, after the phase is visible to clients.
    pub fn with_observer(mut self, observer: impl FnMut(ExportPhase) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn client(&self) -> ExportClient {
        ExportClient {
            tx_request: self.tx_request.clone(),
            rx_outcome: self.rx_outcome.clone(),
            status: Arc::clone(&self.status),
        }
    }

    pub fn phase(&self) -> ExportPhase {
        self.status.lock().phase
    }

    pub fn camera(&self) -> &CameraFrame {
        &self.camera
    }

    fn enter(&mut self, phase: ExportPhase) {
        let previous = std::mem::replace(&mut self.status.lock().phase, phase);
        debug!("export phase {previous:?} -> {phase:?}");
        if let Some(observer) = self.observer.as_mut() {
            observer(phase);
        }
    }

    fn begin(&mut self) -> Result<Session, ExportError> {
        {
            let mut status = self.status.lock();
            if status.phase != ExportPhase::Idle {
                return Err(ExportError::ConcurrentExportRejected);
            }
            status.phase = ExportPhase::Reconfiguring;
        }
        debug!("export phase Idle -> Reconfiguring");
        if let Some(observer) = self.observer.as_mut() {
            observer(ExportPhase::Reconfiguring);
        }
        Ok(Session {
            status: Arc::clone(&self.status),
        })
    }

    /// Runs one export to completion against `pipeline` and restores it.
    ///
    /// The target is restored on every path. If restoring fails the result is
    /// `RestoreFailed`, carrying whatever error came before it.
    pub fn export(
        &mut self,
        pipeline: &mut RenderPipeline,
        scene: &Scene,
        time: f32,
        request: &ExportRequest,
    ) -> Result<ExportedImage, ExportError> {
        request.validate()?;
        let session = self.begin()?;
        info!("exporting {0}x{0}", request.target_size);

        let mut lease = RenderTargetLease::acquire(pipeline);
        let outcome = self.capture(&mut lease, scene, time, request);
        if let Err(e) = &outcome {
            warn!("export of {}px failed: {e}", request.target_size);
            self.enter(ExportPhase::Failed);
        }

        self.enter(ExportPhase::Restoring);
        let saved = lease.saved();
        let restored = lease.release();
        self.enter(ExportPhase::Idle);
        drop(session);

        match (outcome, restored) {
            (Ok(image), Ok(())) => {
                info!(
                    "exported {} ({} bytes), target back at {}x{}",
                    image.filename,
                    image.png.len(),
                    saved.width,
                    saved.height
                );
                Ok(image)
            }
            (Err(e), Ok(())) => Err(e),
            (outcome, Err(cause)) => {
                error!("could not restore render target to {saved:?}: {cause}");
                Err(ExportError::RestoreFailed {
                    cause,
                    original: outcome.err().map(Box::new),
                })
            }
        }
    }

    fn capture(
        &mut self,
        lease: &mut RenderTargetLease<'_>,
        scene: &Scene,
        time: f32,
        request: &ExportRequest,
    ) -> Result<ExportedImage, ExportError> {
        let size = request.target_size;
        // density 1: the requested size is the output size
        lease
            .pipeline()
            .apply_state(RenderTargetState::new(size, size))
            .map_err(ExportError::PipelineResizeFailure)?;

        self.enter(ExportPhase::RenderingAtTarget);
        lease
            .pipeline()
            .render(scene, &self.camera, time)
            .map_err(ExportError::PipelineResizeFailure)?;

        self.enter(ExportPhase::Encoding);
        let pixels = lease.pipeline().read_pixels().map_err(EncodeError::Readback)?;
        let png = encode_png(&pixels)?;

        Ok(ExportedImage {
            filename: request.resolved_filename(&self.default_basename),
            width: pixels.width(),
            height: pixels.height(),
            png,
        })
    }

    /// Runs the next queued client request, if there is one, and posts its outcome
    /// back to the clients. Returns whether an export ran.
    pub fn poll(&mut self, pipeline: &mut RenderPipeline, scene: &Scene, time: f32) -> bool {
        let Ok(request) = self.rx_request.try_recv() else {
            return false;
        };
        self.status.lock().pending = false;
        let result = self.export(pipeline, scene, time, &request);
        // the controller holds a receiver itself, so this cannot disconnect
        let _ = self.tx_outcome.send(ExportOutcome { request, result });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::PipelineSettings;
    use crate::scene::{SceneAssembler, SceneSettings};

    fn fixtures() -> (Scene, RenderPipeline, ExportController) {
        let scene = SceneAssembler::new(SceneSettings {
            seed: Some(3),
            ..SceneSettings::default()
        })
        .assemble()
        .unwrap();
        let pipeline = RenderPipeline::new(
            PipelineSettings {
                samples: 1,
                band_height: 16,
                ..PipelineSettings::default()
            },
            RenderTargetState::new(40, 30).with_density(2.0),
        )
        .unwrap();
        let controller = ExportController::new(IsometricProjector::default(), 6.0).unwrap();
        (scene, pipeline, controller)
    }

    #[test]
    fn export_neutralises_density_and_restores_it() {
        let (scene, mut pipeline, mut controller) = fixtures();
        let image = controller
            .export(&mut pipeline, &scene, 0.0, &ExportRequest::new(24, Some("tile")))
            .unwrap();
        assert_eq!((image.width, image.height), (24, 24));
        assert_eq!(image.filename, "tile-24.png");
        assert_eq!(pipeline.target_state(), RenderTargetState::new(40, 30).with_density(2.0));
        assert_eq!(pipeline.buffer_dimensions(), Some((80, 60)));
        assert_eq!(controller.phase(), ExportPhase::Idle);
    }

    #[test]
    fn phases_run_in_order() {
        let (scene, mut pipeline, controller) = fixtures();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let mut controller = controller.with_observer(move |p| log.lock().push(p));
        controller
            .export(&mut pipeline, &scene, 0.0, &ExportRequest::new(8, None::<String>))
            .unwrap();
        assert_eq!(
            *seen.lock(),
            vec![
                ExportPhase::Reconfiguring,
                ExportPhase::RenderingAtTarget,
                ExportPhase::Encoding,
                ExportPhase::Restoring,
                ExportPhase::Idle,
            ]
        );
    }

    #[test]
    fn invalid_request_leaves_everything_alone() {
        let (scene, mut pipeline, mut controller) = fixtures();
        let before = pipeline.allocation_count();
        let err = controller
            .export(&mut pipeline, &scene, 0.0, &ExportRequest::new(0, None::<String>))
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidParameters(_)));
        assert_eq!(pipeline.allocation_count(), before);
    }

    #[test]
    fn queued_requests_run_on_poll() {
        let (scene, mut pipeline, mut controller) = fixtures();
        let client = controller.client();
        client.request_export(16, Some("queued".to_string())).unwrap();
        assert!(client.is_busy());
        assert!(matches!(
            client.request_export(16, None),
            Err(ExportError::ConcurrentExportRejected)
        ));
        assert!(controller.poll(&mut pipeline, &scene, 0.0));
        assert!(!controller.poll(&mut pipeline, &scene, 0.0));
        let outcome = client.try_outcome().unwrap();
        assert_eq!(outcome.result.unwrap().filename, "queued-16.png");
        assert!(!client.is_busy());
    }

    #[test]
    fn failed_restore_is_reported_with_the_earlier_error() {
        let (scene, _, controller) = fixtures();
        let mut pipeline = RenderPipeline::new(
            PipelineSettings {
                samples: 1,
                band_height: 16,
                preserve_drawing_buffer: false,
                ..PipelineSettings::default()
            },
            RenderTargetState::new(40, 30),
        )
        .unwrap();
        let gate = Arc::clone(&pipeline.fail_allocations);
        let arm = Arc::clone(&gate);
        let mut controller = controller.with_observer(move |phase| {
            if phase == ExportPhase::Encoding {
                arm.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        });

        let err = controller
            .export(&mut pipeline, &scene, 0.0, &ExportRequest::new(24, None::<String>))
            .unwrap_err();
        match err {
            ExportError::RestoreFailed {
                cause: PipelineError::Allocation { width, height, .. },
                original: Some(original),
            } => {
                assert_eq!((width, height), (40, 30));
                assert!(matches!(*original, ExportError::EncodingError(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(controller.phase(), ExportPhase::Idle);

        // the target is still usable once memory is back
        gate.store(false, std::sync::atomic::Ordering::SeqCst);
        pipeline.apply_state(RenderTargetState::new(40, 30)).unwrap();
        assert_eq!(pipeline.buffer_dimensions(), Some((40, 30)));
    }

    #[test]
    fn lease_restores_on_drop() {
        let (_, mut pipeline, _) = fixtures();
        {
            let mut lease = RenderTargetLease::acquire(&mut pipeline);
            lease.pipeline().set_size(10, 10).unwrap();
        }
        assert_eq!(pipeline.target_state(), RenderTargetState::new(40, 30).with_density(2.0));
    }
}
