//! Checkbox detection for the claim form's multiple-choice answer.
//!
//! The form asks "At the time of the transaction the card was:" with four
//! printed checkboxes on page 1. Detection rasterizes the page, binarizes it,
//! finds checkbox-sized contours, classifies each as ticked or empty by fill
//! ratio, and maps the ticked box nearest a calibrated label anchor to that
//! label's answer.

use std::path::{Path, PathBuf};

use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::filter::gaussian_blur_f32;
use imageproc::rect::Rect;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::{debug, warn};

use crate::config::{DetectionConfig, LabelAnchor};
use crate::error::ProcessingError;
use crate::extraction::pdf;

/// Sigma of a 5x5 Gaussian kernel, for scan/render noise suppression
const BLUR_SIGMA: f32 = 1.1;

const CHECKED_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const UNCHECKED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Axis-aligned bounding box of a candidate checkbox region
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub cx: u32,
    pub cy: u32,
    pub checked: bool,
}

/// Outcome of a checkbox detection pass
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionResult {
    /// A ticked box was matched to this answer label
    Selected(String),
    /// The page had no ticked checkbox-sized region
    NoneDetected,
    /// Detection ran but failed; carries a diagnostic message
    Failed(String),
}

impl DetectionResult {
    /// Render the result the way it is stored in the claim report
    pub fn field_value(&self) -> String {
        match self {
            DetectionResult::Selected(label) => label.clone(),
            DetectionResult::NoneDetected => "No checkbox detected".to_string(),
            DetectionResult::Failed(message) => {
                format!("Error extracting checkbox: {}", message)
            }
        }
    }
}

impl Serialize for DetectionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("DetectionResult", 1)?;
        match self {
            DetectionResult::Selected(label) => s.serialize_field("label", label)?,
            DetectionResult::NoneDetected => s.serialize_field("status", "none detected")?,
            DetectionResult::Failed(message) => s.serialize_field("error", message)?,
        }
        s.end()
    }
}

/// Receives the annotated page render when detection debugging is enabled
pub trait DebugSink: Send + Sync {
    fn publish(&self, overlay: &RgbImage) -> Result<(), ProcessingError>;
}

/// Writes the annotated render as a PNG file
pub struct PngOverlaySink {
    path: PathBuf,
}

impl PngOverlaySink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for PngOverlaySink {
    fn default() -> Self {
        Self::new("debug_checkbox.png")
    }
}

impl DebugSink for PngOverlaySink {
    fn publish(&self, overlay: &RgbImage) -> Result<(), ProcessingError> {
        overlay
            .save(&self.path)
            .map_err(|e| ProcessingError::Io(std::io::Error::other(e)))
    }
}

/// Detects which answer checkbox is ticked on page 1 of the claim form
pub struct CheckboxDetector {
    config: DetectionConfig,
}

impl CheckboxDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Detect the ticked checkbox on page 1 of `pdf_path`.
    ///
    /// A missing file fails fast with [`ProcessingError::NotFound`]. Every
    /// failure past that point is captured into [`DetectionResult::Failed`]
    /// so callers always receive a structured value.
    pub fn detect(
        &self,
        pdf_path: &Path,
        debug_sink: Option<&dyn DebugSink>,
    ) -> Result<DetectionResult, ProcessingError> {
        if !pdf_path.exists() {
            return Err(ProcessingError::NotFound {
                path: pdf_path.to_path_buf(),
            });
        }

        Ok(
            match pdf::render_first_page(pdf_path, self.config.dpi)
                .map(|page| self.detect_in_page(&page, debug_sink))
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Checkbox detection failed");
                    DetectionResult::Failed(e.to_string())
                }
            },
        )
    }

    /// Run the detection pipeline on an already-rendered page.
    pub fn detect_in_page(
        &self,
        page: &RgbImage,
        debug_sink: Option<&dyn DebugSink>,
    ) -> DetectionResult {
        let mask = self.binarize(page);
        let candidates = self.find_candidates(&mask);

        debug!(
            candidates = candidates.len(),
            checked = candidates.iter().filter(|c| c.checked).count(),
            "Checkbox candidates located"
        );

        if let Some(sink) = debug_sink {
            let overlay = draw_overlay(page, &candidates);
            if let Err(e) = sink.publish(&overlay) {
                warn!(error = %e, "Failed to publish detection overlay");
            }
        }

        match self.select_label(&candidates) {
            Some(anchor) => DetectionResult::Selected(anchor.label.clone()),
            None => DetectionResult::NoneDetected,
        }
    }

    /// Binarize a page render: ink (dark) pixels become 255, paper 0.
    fn binarize(&self, page: &RgbImage) -> GrayImage {
        let gray = image::imageops::grayscale(page);
        let blurred = gaussian_blur_f32(&gray, BLUR_SIGMA);
        threshold(
            &blurred,
            self.config.ink_threshold,
            ThresholdType::BinaryInverted,
        )
    }

    /// Locate checkbox-sized connected regions in the binary mask.
    fn find_candidates(&self, mask: &GrayImage) -> Vec<CandidateBox> {
        let contours: Vec<Contour<u32>> = find_contours(mask);

        contours
            .iter()
            .filter(|contour| contour.border_type == BorderType::Outer)
            .filter_map(|contour| self.bounding_box(contour))
            .map(|(x, y, width, height)| {
                let fill = fill_ratio(mask, x, y, width, height);
                CandidateBox {
                    x,
                    y,
                    width,
                    height,
                    cx: x + width / 2,
                    cy: y + height / 2,
                    checked: fill > self.config.fill_threshold,
                }
            })
            .collect()
    }

    /// Bounding box of a contour, or None when it is not checkbox-sized.
    fn bounding_box(&self, contour: &Contour<u32>) -> Option<(u32, u32, u32, u32)> {
        let first = contour.points.first()?;
        let (mut min_x, mut max_x) = (first.x, first.x);
        let (mut min_y, mut max_y) = (first.y, first.y);
        for point in &contour.points {
            min_x = min_x.min(point.x);
            max_x = max_x.max(point.x);
            min_y = min_y.min(point.y);
            max_y = max_y.max(point.y);
        }

        let width = max_x - min_x + 1;
        let height = max_y - min_y + 1;
        let boxed = |side: u32| side >= self.config.min_box_px && side <= self.config.max_box_px;
        (boxed(width) && boxed(height)).then_some((min_x, min_y, width, height))
    }

    /// Globally nearest (anchor, ticked candidate) pair across the full cross
    /// product. With two ticked boxes only the one closest to any anchor is
    /// ever reported; distance ties go to the anchor declared first.
    fn select_label(&self, candidates: &[CandidateBox]) -> Option<&LabelAnchor> {
        let mut best: Option<(&LabelAnchor, f64)> = None;

        for anchor in &self.config.anchors {
            for candidate in candidates.iter().filter(|c| c.checked) {
                let dx = f64::from(candidate.cx) - f64::from(anchor.x);
                let dy = f64::from(candidate.cy) - f64::from(anchor.y);
                let distance = (dx * dx + dy * dy).sqrt();

                if best.map_or(true, |(_, d)| distance < d) {
                    best = Some((anchor, distance));
                }
            }
        }

        best.map(|(anchor, _)| anchor)
    }
}

/// Fraction of foreground pixels inside a bounding box of the mask
fn fill_ratio(mask: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> f64 {
    let mut ink = 0u32;
    for py in y..y + height {
        for px in x..x + width {
            if mask.get_pixel(px, py)[0] > 0 {
                ink += 1;
            }
        }
    }
    f64::from(ink) / f64::from(width * height)
}

/// Draw every candidate box on a copy of the page render
fn draw_overlay(page: &RgbImage, candidates: &[CandidateBox]) -> RgbImage {
    let mut overlay = page.clone();
    for candidate in candidates {
        let color = if candidate.checked {
            CHECKED_COLOR
        } else {
            UNCHECKED_COLOR
        };
        let rect = Rect::at(candidate.x as i32, candidate.y as i32)
            .of_size(candidate.width, candidate.height);
        draw_hollow_rect_mut(&mut overlay, rect, color);
    }
    overlay
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn detector() -> CheckboxDetector {
        CheckboxDetector::new(DetectionConfig::default())
    }

    fn blank_page(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, WHITE)
    }

    /// Solid black square of `size` centered at (cx, cy)
    fn paint_square(page: &mut RgbImage, cx: u32, cy: u32, size: u32) {
        let half = size / 2;
        for y in cy - half..cy - half + size {
            for x in cx - half..cx - half + size {
                page.put_pixel(x, y, BLACK);
            }
        }
    }

    /// Empty box outline (1 px stroke) of `size` centered at (cx, cy)
    fn paint_outline(page: &mut RgbImage, cx: u32, cy: u32, size: u32) {
        let half = size / 2;
        let (left, top) = (cx - half, cy - half);
        for offset in 0..size {
            page.put_pixel(left + offset, top, BLACK);
            page.put_pixel(left + offset, top + size - 1, BLACK);
            page.put_pixel(left, top + offset, BLACK);
            page.put_pixel(left + size - 1, top + offset, BLACK);
        }
    }

    /// Filled rectangle of foreground in a binary mask
    fn paint_mask_rect(mask: &mut GrayImage, x: u32, y: u32, width: u32, height: u32) {
        for py in y..y + height {
            for px in x..x + width {
                mask.put_pixel(px, py, image::Luma([255]));
            }
        }
    }

    #[test]
    fn blank_page_yields_sentinel() {
        let page = blank_page(1000, 2700);
        let result = detector().detect_in_page(&page, None);
        assert_eq!(result, DetectionResult::NoneDetected);
    }

    #[test]
    fn solid_square_selects_nearest_anchor() {
        // 20x20 solid square centered on the "In my possession" anchor
        let mut page = blank_page(1000, 2700);
        paint_square(&mut page, 600, 2640, 20);

        let result = detector().detect_in_page(&page, None);
        assert_eq!(
            result,
            DetectionResult::Selected("In my possession".to_string())
        );
    }

    #[test]
    fn ticked_box_near_stolen_anchor() {
        let mut page = blank_page(1000, 2700);
        paint_square(&mut page, 403, 2637, 20);

        let result = detector().detect_in_page(&page, None);
        assert_eq!(result, DetectionResult::Selected("Stolen".to_string()));
    }

    #[test]
    fn empty_outline_is_not_a_tick() {
        // A printed-but-unticked box has low fill ratio
        let mut page = blank_page(1000, 2700);
        paint_outline(&mut page, 600, 2640, 30);

        let result = detector().detect_in_page(&page, None);
        assert_eq!(result, DetectionResult::NoneDetected);
    }

    #[test]
    fn detection_is_deterministic() {
        let mut page = blank_page(1000, 2700);
        paint_square(&mut page, 600, 2640, 20);

        let det = detector();
        let first = det.detect_in_page(&page, None);
        let second = det.detect_in_page(&page, None);
        assert_eq!(first, second);
    }

    #[test]
    fn size_window_bounds_are_inclusive() {
        let mut mask = GrayImage::new(700, 300);
        paint_mask_rect(&mut mask, 50, 50, 10, 10);
        paint_mask_rect(&mut mask, 200, 50, 40, 40);
        paint_mask_rect(&mut mask, 400, 50, 9, 41);
        paint_mask_rect(&mut mask, 500, 50, 41, 41);

        let mut sizes: Vec<(u32, u32)> = detector()
            .find_candidates(&mask)
            .iter()
            .map(|c| (c.width, c.height))
            .collect();
        sizes.sort_unstable();

        assert_eq!(sizes, vec![(10, 10), (40, 40)]);
    }

    #[test]
    fn candidate_center_uses_integer_division() {
        let mut mask = GrayImage::new(200, 200);
        paint_mask_rect(&mut mask, 30, 40, 15, 15);

        let candidates = detector().find_candidates(&mask);
        assert_eq!(candidates.len(), 1);
        assert_eq!((candidates[0].cx, candidates[0].cy), (30 + 7, 40 + 7));
    }

    #[test]
    fn fill_ratio_counts_foreground_within_box() {
        let mut mask = GrayImage::new(100, 100);
        paint_mask_rect(&mut mask, 10, 10, 20, 10);

        assert_eq!(fill_ratio(&mask, 10, 10, 20, 10), 1.0);
        assert_eq!(fill_ratio(&mask, 10, 10, 20, 20), 0.5);
        assert_eq!(fill_ratio(&mask, 60, 60, 20, 20), 0.0);
    }

    #[test]
    fn thicker_fill_flips_unchecked_to_checked() {
        // Cross shapes with identical 21x21 bounding boxes; only arm width
        // changes the fill ratio
        let thin = cross_mask(3);
        let thick = cross_mask(9);

        let det = detector();
        let thin_candidates = det.find_candidates(&thin);
        let thick_candidates = det.find_candidates(&thick);

        assert_eq!(thin_candidates.len(), 1);
        assert_eq!(thick_candidates.len(), 1);
        assert!(!thin_candidates[0].checked);
        assert!(thick_candidates[0].checked);
    }

    /// 21x21-bounded cross centered at (60, 60) with the given arm width
    fn cross_mask(arm: u32) -> GrayImage {
        let mut mask = GrayImage::new(200, 200);
        paint_mask_rect(&mut mask, 50, 60 - arm / 2, 21, arm);
        paint_mask_rect(&mut mask, 60 - arm / 2, 50, arm, 21);
        mask
    }

    #[test]
    fn globally_nearest_candidate_wins() {
        // Two ticked boxes; only the one nearest any anchor is reported
        let det = CheckboxDetector::new(DetectionConfig {
            anchors: vec![
                LabelAnchor {
                    label: "Lost".to_string(),
                    x: 100,
                    y: 100,
                },
                LabelAnchor {
                    label: "Stolen".to_string(),
                    x: 500,
                    y: 100,
                },
            ],
            ..DetectionConfig::default()
        });

        let near_lost = candidate_at(105, 100);
        let far_from_stolen = candidate_at(560, 100);

        let selected = det.select_label(&[far_from_stolen, near_lost]).unwrap();
        assert_eq!(selected.label, "Lost");
    }

    #[test]
    fn distance_ties_go_to_first_declared_anchor() {
        let det = CheckboxDetector::new(DetectionConfig {
            anchors: vec![
                LabelAnchor {
                    label: "Lost".to_string(),
                    x: 100,
                    y: 100,
                },
                LabelAnchor {
                    label: "Stolen".to_string(),
                    x: 300,
                    y: 100,
                },
            ],
            ..DetectionConfig::default()
        });

        // Equidistant from both anchors
        let selected = det.select_label(&[candidate_at(200, 100)]).unwrap();
        assert_eq!(selected.label, "Lost");
    }

    #[test]
    fn unchecked_candidates_never_match() {
        let det = detector();
        let mut candidate = candidate_at(600, 2640);
        candidate.checked = false;

        assert!(det.select_label(&[candidate]).is_none());
    }

    fn candidate_at(cx: u32, cy: u32) -> CandidateBox {
        CandidateBox {
            x: cx - 10,
            y: cy - 10,
            width: 20,
            height: 20,
            cx,
            cy,
            checked: true,
        }
    }

    #[test]
    fn missing_file_fails_fast() {
        let result = detector().detect(Path::new("/nonexistent/claim_form.pdf"), None);
        assert!(matches!(result, Err(ProcessingError::NotFound { .. })));
    }

    #[test]
    fn unparseable_document_fails_soft() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_form.pdf");
        std::fs::write(&path, b"plainly not a pdf").unwrap();

        // Past the existence preflight, failures become a structured value
        let result = detector().detect(&path, None).unwrap();
        assert!(matches!(result, DetectionResult::Failed(_)));
    }

    #[test]
    fn result_serializes_to_wire_shapes() {
        let selected = DetectionResult::Selected("Stolen".to_string());
        assert_eq!(
            serde_json::to_value(&selected).unwrap(),
            serde_json::json!({"label": "Stolen"})
        );

        assert_eq!(
            serde_json::to_value(&DetectionResult::NoneDetected).unwrap(),
            serde_json::json!({"status": "none detected"})
        );

        let failed = DetectionResult::Failed("render failed".to_string());
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"error": "render failed"})
        );
    }

    #[test]
    fn field_values_match_report_wording() {
        assert_eq!(
            DetectionResult::Selected("Lost".to_string()).field_value(),
            "Lost"
        );
        assert_eq!(
            DetectionResult::NoneDetected.field_value(),
            "No checkbox detected"
        );
        assert_eq!(
            DetectionResult::Failed("boom".to_string()).field_value(),
            "Error extracting checkbox: boom"
        );
    }

    struct CapturingSink {
        captured: Mutex<Option<RgbImage>>,
    }

    impl DebugSink for CapturingSink {
        fn publish(&self, overlay: &RgbImage) -> Result<(), ProcessingError> {
            *self.captured.lock().unwrap() = Some(overlay.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl DebugSink for FailingSink {
        fn publish(&self, _overlay: &RgbImage) -> Result<(), ProcessingError> {
            Err(ProcessingError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn debug_sink_receives_annotated_overlay() {
        let mut page = blank_page(1000, 2700);
        paint_square(&mut page, 600, 2640, 20);

        let sink = CapturingSink {
            captured: Mutex::new(None),
        };
        detector().detect_in_page(&page, Some(&sink));

        let overlay = sink.captured.lock().unwrap().take().unwrap();
        assert_eq!(overlay.dimensions(), page.dimensions());
        // The ticked candidate's outline is highlighted in the checked color
        let has_checked_outline = overlay.pixels().any(|p| *p == CHECKED_COLOR);
        assert!(has_checked_outline);
    }

    #[test]
    fn sink_failure_does_not_change_the_result() {
        let mut page = blank_page(1000, 2700);
        paint_square(&mut page, 600, 2640, 20);

        let det = detector();
        let with_failing_sink = det.detect_in_page(&page, Some(&FailingSink));
        let without_sink = det.detect_in_page(&page, None);
        assert_eq!(with_failing_sink, without_sink);
    }
}
