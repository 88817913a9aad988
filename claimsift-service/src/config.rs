use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{ServiceError, ServiceResult};

/// Service configuration, loaded once at startup
/// These settings affect server binding or require restart to change
#[derive(Debug, Clone, Deserialize)]
pub struct StaticConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_document")]
    pub document: DocumentConfig,

    #[serde(default)]
    pub detection: DetectionConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Claim document configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
    /// Path to the dispute-claim form served by the extract endpoint
    #[serde(default = "default_pdf_path")]
    pub pdf_path: PathBuf,
}

/// Checkbox detection calibration.
///
/// Anchor coordinates live in the pixel space of the page render at `dpi`.
/// They are tuned to one claim-form layout; layout variants ship a different
/// anchor table instead of a code change.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Render resolution for page rasterization
    #[serde(default = "default_dpi")]
    pub dpi: f32,

    /// Answer labels and their anchor points on the rendered page
    #[serde(default = "default_anchors")]
    pub anchors: Vec<LabelAnchor>,

    /// Blurred grayscale intensities below this count as ink
    #[serde(default = "default_ink_threshold")]
    pub ink_threshold: u8,

    /// Fill ratio above which a candidate box counts as ticked
    #[serde(default = "default_fill_threshold")]
    pub fill_threshold: f64,

    /// Candidate boxes must have width and height within this window
    #[serde(default = "default_min_box_px")]
    pub min_box_px: u32,

    #[serde(default = "default_max_box_px")]
    pub max_box_px: u32,

    /// When set, every detection writes an annotated page render here
    #[serde(default)]
    pub debug_overlay_path: Option<PathBuf>,
}

/// A fixed reference point associated with one answer label
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelAnchor {
    pub label: String,
    pub x: u32,
    pub y: u32,
}

impl LabelAnchor {
    fn new(label: &str, x: u32, y: u32) -> Self {
        Self {
            label: label.to_string(),
            x,
            y,
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            document: default_document(),
            detection: DetectionConfig::default(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            anchors: default_anchors(),
            ink_threshold: default_ink_threshold(),
            fill_threshold: default_fill_threshold(),
            min_box_px: default_min_box_px(),
            max_box_px: default_max_box_px(),
            debug_overlay_path: None,
        }
    }
}

/// Load configuration from file and env vars
pub fn load_static_config() -> ServiceResult<StaticConfig> {
    Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(
            Environment::with_prefix("CLAIMSIFT")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ServiceError::Config {
            message: format!("Failed to build config: {}", e),
        })?
        .try_deserialize()
        .map_err(|e| ServiceError::Config {
            message: format!("Failed to deserialize config: {}", e),
        })
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_document() -> DocumentConfig {
    DocumentConfig {
        pdf_path: default_pdf_path(),
    }
}

fn default_pdf_path() -> PathBuf {
    PathBuf::from("./claim_form.pdf")
}

fn default_dpi() -> f32 {
    300.0
}

/// Anchor table calibrated against the 300 DPI render of the claim form's
/// checkbox row on page 1
fn default_anchors() -> Vec<LabelAnchor> {
    vec![
        LabelAnchor::new("Lost", 200, 2640),
        LabelAnchor::new("Stolen", 400, 2640),
        LabelAnchor::new("In my possession", 600, 2640),
        LabelAnchor::new("Never Received", 800, 2640),
    ]
}

fn default_ink_threshold() -> u8 {
    180
}

fn default_fill_threshold() -> f64 {
    0.3
}

fn default_min_box_px() -> u32 {
    10
}

fn default_max_box_px() -> u32 {
    40
}
