//! Claim extraction pipeline.
//!
//! Runs the linear pipeline for the configured dispute-claim form: extract
//! the document text, scan it for the form's free-text fields, detect the
//! ticked checkbox on page 1, and assemble everything into one claim report.

pub mod checkbox;
pub mod fields;
pub mod pdf;
pub mod report;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::StaticConfig;
use crate::error::{ServiceError, ServiceResult};
use checkbox::{CheckboxDetector, DebugSink, PngOverlaySink};
use report::ClaimReport;

/// Runs the extraction pipeline for the configured claim document
pub struct ClaimExtractor {
    pdf_path: PathBuf,
    detector: CheckboxDetector,
    overlay_sink: Option<PngOverlaySink>,
}

impl ClaimExtractor {
    pub fn new(config: &StaticConfig) -> Self {
        let overlay_sink = config
            .detection
            .debug_overlay_path
            .clone()
            .map(PngOverlaySink::new);

        Self {
            pdf_path: config.document.pdf_path.clone(),
            detector: CheckboxDetector::new(config.detection.clone()),
            overlay_sink,
        }
    }

    pub fn document_path(&self) -> &Path {
        &self.pdf_path
    }

    /// Extract the full claim report from the configured PDF.
    pub fn extract(&self) -> ServiceResult<ClaimReport> {
        if !self.pdf_path.exists() {
            return Err(ServiceError::DocumentNotFound {
                path: self.pdf_path.clone(),
            });
        }

        let text = pdf::extract_document_text(&self.pdf_path)?;

        let mut report = ClaimReport::default();
        fields::apply_claim_text(&mut report, &text);

        let sink = self.overlay_sink.as_ref().map(|s| s as &dyn DebugSink);
        let detection = self.detector.detect(&self.pdf_path, sink)?;
        report.custom_data.card_disposition = detection.field_value();

        info!(
            events = report.events.len(),
            instruments = report.instruments.len(),
            card_disposition = %report.custom_data.card_disposition,
            "Claim extracted"
        );

        Ok(report)
    }
}
