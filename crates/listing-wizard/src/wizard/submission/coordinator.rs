use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::outcome::SubmissionOutcome;
use super::transport::{HttpListingTransport, ListingTransport};
use crate::config::{AppEnvironment, SubmissionConfig};
use crate::wizard::draft::{ContactInfo, PropertyDraft};
use crate::wizard::normalizer::{self, CorrectionKind, NormalizedListing};
use crate::wizard::photos::{PhotoError, PhotoPipeline};
use crate::wizard::schema::ListingSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

impl SubmissionState {
    const fn to_raw(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Submitting => 1,
            Self::Succeeded => 2,
            Self::Failed => 3,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Submitting,
            2 => Self::Succeeded,
            3 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("a submission is already in progress")]
    InProgress,
    #[error("this listing has already been submitted")]
    AlreadySubmitted,
    #[error("photos could not be prepared: {0}")]
    Photos(#[from] PhotoError),
}

/// Runs normalization, photo encoding and transmission for one wizard session,
/// allowing at most one submission in flight.
#[derive(Debug)]
pub struct SubmissionCoordinator {
    schema: Arc<ListingSchema>,
    photos: PhotoPipeline,
    transport: Arc<dyn ListingTransport>,
    state: AtomicU8,
    log_corrections: bool,
}

impl SubmissionCoordinator {
    pub fn new(transport: Arc<dyn ListingTransport>) -> Self {
        Self {
            schema: Arc::new(ListingSchema::standard()),
            photos: PhotoPipeline::default(),
            transport,
            state: AtomicU8::new(SubmissionState::Idle.to_raw()),
            log_corrections: true,
        }
    }

    pub fn from_config(config: &SubmissionConfig, environment: AppEnvironment) -> Self {
        Self::new(Arc::new(HttpListingTransport::from_config(config)))
            .with_photo_pipeline(PhotoPipeline::from_config(config))
            .with_correction_logging(environment.logs_corrections())
    }

    pub fn with_schema(mut self, schema: Arc<ListingSchema>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_photo_pipeline(mut self, photos: PhotoPipeline) -> Self {
        self.photos = photos;
        self
    }

    pub fn with_correction_logging(mut self, enabled: bool) -> Self {
        self.log_corrections = enabled;
        self
    }

    pub fn schema(&self) -> &ListingSchema {
        &self.schema
    }

    pub fn state(&self) -> SubmissionState {
        SubmissionState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Allows a consumed coordinator to submit again, e.g. for a new listing.
    /// Refused while a submission is in flight.
    pub fn reset(&self) -> Result<(), SubmissionError> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if SubmissionState::from_raw(current) == SubmissionState::Submitting {
                return Err(SubmissionError::InProgress);
            }
            match self.state.compare_exchange_weak(
                current,
                SubmissionState::Idle.to_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(observed) => current = observed,
            }
        }
    }

    /// Normalizes and transmits `draft`. The draft is never modified, so a
    /// failed submission can be corrected and retried.
    pub async fn submit(
        &self,
        draft: &PropertyDraft,
        contact: &ContactInfo,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let guard = self.begin()?;

        let normalized = normalizer::normalize(&self.schema, draft, contact);
        if self.log_corrections {
            log_corrections(&normalized);
        }

        let photos = match self.photos.encode_draft(draft).await {
            Ok(photos) => photos,
            Err(err) => {
                warn!(error = %err, "photo encoding failed, submission aborted");
                guard.finish(SubmissionState::Failed);
                return Err(err.into());
            }
        };
        let photo_count = photos.len();
        let payload = normalized.payload.with_photos(photos).into_value();

        let outcome = SubmissionOutcome::from_transport(self.transport.send(&payload).await);
        match &outcome {
            SubmissionOutcome::Success { listing_id } => {
                info!(?listing_id, photo_count, "listing submitted");
                guard.finish(SubmissionState::Succeeded);
            }
            SubmissionOutcome::BusinessError { message } => {
                warn!(%message, "listing rejected by backend");
                guard.finish(SubmissionState::Failed);
            }
            SubmissionOutcome::TransportError { cause } => {
                warn!(%cause, "listing submission transport failure");
                guard.finish(SubmissionState::Failed);
            }
        }

        Ok(outcome)
    }

    fn begin(&self) -> Result<InFlight<'_>, SubmissionError> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            match SubmissionState::from_raw(current) {
                SubmissionState::Submitting => return Err(SubmissionError::InProgress),
                SubmissionState::Succeeded => return Err(SubmissionError::AlreadySubmitted),
                SubmissionState::Idle | SubmissionState::Failed => {}
            }

            match self.state.compare_exchange(
                current,
                SubmissionState::Submitting.to_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Ok(InFlight {
                        state: &self.state,
                        finished: false,
                    })
                }
                Err(observed) => current = observed,
            }
        }
    }
}

/// Holds the `Submitting` state; dropping it unfinished returns to `Idle`.
struct InFlight<'a> {
    state: &'a AtomicU8,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(mut self, state: SubmissionState) {
        self.state.store(state.to_raw(), Ordering::Release);
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state
                .store(SubmissionState::Idle.to_raw(), Ordering::Release);
        }
    }
}

fn log_corrections(normalized: &NormalizedListing) {
    for correction in &normalized.corrections {
        match correction.kind {
            CorrectionKind::Defaulted => debug!(
                field = correction.field,
                corrected = %correction.corrected,
                "draft field defaulted"
            ),
            CorrectionKind::Coerced => warn!(
                field = correction.field,
                expected = correction.expected.label(),
                original = ?correction.original,
                corrected = %correction.corrected,
                "draft field coerced"
            ),
        }
    }
}
