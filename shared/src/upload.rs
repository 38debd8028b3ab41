//! Maps one analysis request's transport events onto [`ProgressState`].
//!
//! The host owns the actual transfer. It reports upload progress, the end of
//! the request body, and the terminal response or failure, each tagged with
//! the [`RequestId`] returned by [`UploadOrchestrator::begin`]. Events for any
//! other id are ignored, which keeps a superseded or discarded request from
//! moving the indicator.

use derive_more::Display;

use crate::error::UploadError;
use crate::intake::SelectedFile;
use crate::progress::{ModeKind, ProgressState, Timer};
use crate::{AnalysisParams, AnalysisResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "upload-{}", _0)]
pub struct RequestId(u64);

/// Immutable description of one outbound analysis request.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub id: RequestId,
    pub file_name: String,
    pub params: AnalysisParams,
}

impl AnalysisRequest {
    /// Text fields sent next to the `file` part.
    pub fn form_fields(&self) -> [(&'static str, String); 2] {
        [
            ("environment", self.params.environment.to_string()),
            ("confidence", self.params.confidence_field()),
        ]
    }
}

pub type Outcome = Result<AnalysisResult, UploadError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Sending,
    Waiting,
}

#[derive(Debug, Clone)]
struct InFlight {
    id: RequestId,
    file_name: String,
    phase: Phase,
}

#[derive(Debug, Clone, Default)]
pub struct UploadOrchestrator {
    last_id: u64,
    in_flight: Option<InFlight>,
    last_error: Option<UploadError>,
}

impl UploadOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&UploadError> {
        self.last_error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Whether an analysis may start for `selected`: nothing is in flight and
    /// the file passed the size check.
    pub fn can_begin(&self, selected: Option<&SelectedFile>) -> bool {
        !self.is_busy() && selected.is_some_and(|file| file.size_ok)
    }

    /// Starts a new request, superseding any earlier one.
    pub fn begin(
        &mut self,
        file_name: &str,
        params: AnalysisParams,
        progress: &mut ProgressState,
    ) -> (AnalysisRequest, Timer) {
        self.last_error = None;
        if let Some(previous) = self.in_flight.take() {
            log::warn!("Superseding {} for {}", previous.id, previous.file_name);
        }

        self.last_id += 1;
        let id = RequestId(self.last_id);
        let timer = progress.enter_upload(file_name);
        log::info!(
            "Starting {} for {} ({}, confidence {})",
            id,
            file_name,
            params.environment,
            params.confidence_field()
        );

        self.in_flight = Some(InFlight {
            id,
            file_name: file_name.to_string(),
            phase: Phase::Sending,
        });
        let request = AnalysisRequest {
            id,
            file_name: file_name.to_string(),
            params,
        };
        (request, timer)
    }

    fn current(&self, id: RequestId) -> Option<&InFlight> {
        self.in_flight.as_ref().filter(|flight| flight.id == id)
    }

    fn take_current(&mut self, id: RequestId) -> Option<InFlight> {
        self.current(id)?;
        self.in_flight.take()
    }

    /// Byte-level transfer progress. Without a known total the last value stays.
    pub fn on_upload_progress(
        &mut self,
        id: RequestId,
        loaded: u64,
        total: Option<u64>,
        progress: &mut ProgressState,
    ) {
        let Some(flight) = self.current(id) else {
            return;
        };
        if flight.phase != Phase::Sending {
            return;
        }
        if let Some(total) = total.filter(|total| *total > 0) {
            let percent = loaded.min(total) as f64 * 100.0 / total as f64;
            progress.set_upload_progress(percent);
        }
    }

    /// The request body has been sent; from here on the service is computing.
    pub fn on_upload_sent(&mut self, id: RequestId, progress: &mut ProgressState) -> Option<Timer> {
        let flight = self.in_flight.as_mut().filter(|flight| flight.id == id)?;
        if flight.phase != Phase::Sending {
            return None;
        }
        flight.phase = Phase::Waiting;
        log::info!("{} sent, waiting for the service", id);
        Some(progress.enter_processing(&flight.file_name))
    }

    /// Terminal HTTP response.
    pub fn on_response(
        &mut self,
        id: RequestId,
        status: u16,
        body: &str,
        progress: &mut ProgressState,
    ) -> Option<(Outcome, Timer)> {
        let flight = self.take_current(id)?;

        if !(200..300).contains(&status) {
            return Some(self.fail(
                UploadError::ServerError {
                    status,
                    body: body.to_string(),
                },
                progress,
            ));
        }

        match serde_json::from_str::<AnalysisResult>(body) {
            Ok(result) => {
                if progress.mode_kind() != ModeKind::Processing {
                    progress.enter_processing(&flight.file_name);
                }
                let timer = progress.complete_processing().unwrap_or(Timer::Cancel);
                log::info!(
                    "{} finished: {} trees detected",
                    id,
                    result.statistics.total_trees
                );
                Some((Ok(result), timer))
            }
            Err(e) => Some(self.fail(UploadError::ResponseParseFailure(e.to_string()), progress)),
        }
    }

    /// Transport failure before any terminal status.
    pub fn on_network_failure(
        &mut self,
        id: RequestId,
        reason: &str,
        progress: &mut ProgressState,
    ) -> Option<(Outcome, Timer)> {
        self.take_current(id)?;
        Some(self.fail(UploadError::NetworkFailure(reason.to_string()), progress))
    }

    fn fail(&mut self, error: UploadError, progress: &mut ProgressState) -> (Outcome, Timer) {
        log::error!("Analysis failed ({}): {}", error.kind(), error);
        self.last_error = Some(error.clone());
        (Err(error), progress.reset())
    }

    /// Explicit discard: forget the request and collapse the indicator.
    pub fn abandon(&mut self, progress: &mut ProgressState) -> Timer {
        if let Some(flight) = self.in_flight.take() {
            log::info!("Abandoned {}", flight.id);
        }
        self.last_error = None;
        progress.reset()
    }
}
