use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};
use log::{info, warn};
use parking_lot::Mutex;

use crate::error::ExportError;
use crate::export::controller::{ExportOutcome, ExportPhase, ExportStatus};
use crate::export::request::ExportRequest;

/// UI-side handle to the export controller. Cheap to clone.
#[derive(Clone)]
pub struct ExportClient {
    pub(crate) tx_request: Sender<ExportRequest>,
    pub(crate) rx_outcome: Receiver<ExportOutcome>,
    pub(crate) status: Arc<Mutex<ExportStatus>>,
}

impl ExportClient {
    /// Queues an export for the render loop. Rejected while another export is
    /// queued or running.
    pub fn request_export(
        &self,
        target_size: u32,
        filename: Option<String>,
    ) -> Result<(), ExportError> {
        let request = ExportRequest {
            target_size,
            filename,
        };
        request.validate()?;

        let mut status = self.status.lock();
        if status.is_busy() {
            warn!(
                "export of {target_size}px rejected, controller is {:?}",
                status.phase
            );
            return Err(ExportError::ConcurrentExportRejected);
        }
        self.tx_request
            .send(request)
            .map_err(|_| ExportError::ControllerUnavailable)?;
        status.pending = true;
        info!("export of {target_size}px queued");
        Ok(())
    }

    pub fn phase(&self) -> ExportPhase {
        self.status.lock().phase
    }

    pub fn is_busy(&self) -> bool {
        self.status.lock().is_busy()
    }

    /// Next finished export, if any.
    pub fn try_outcome(&self) -> Option<ExportOutcome> {
        self.rx_outcome.try_recv().ok()
    }
}
