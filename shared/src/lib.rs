pub mod error;
pub mod intake;
pub mod progress;
pub mod upload;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

pub use error::{ErrorKind, IntakeError, UploadError};
pub use intake::{FileCandidate, FileIntake, IntakePolicy, Notice, SelectedFile, Selection};
pub use progress::{LifecycleMode, ModeKind, ProgressState, Tick, Ticket, Timer};
pub use upload::{AnalysisRequest, Outcome, RequestId, UploadOrchestrator};

/// Scene type the detector is tuned for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
    EnumIter, AsRefStr,
)]
pub enum Environment {
    #[default]
    Default,
    Forest,
    Urban,
}

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Analysis parameters pushed by the environment/confidence widgets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub environment: Environment,
    pub confidence: f64,
}

impl AnalysisParams {
    pub fn new(environment: Environment, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            DEFAULT_CONFIDENCE
        };
        Self {
            environment,
            confidence,
        }
    }

    /// Decimal string sent as the `confidence` form field.
    pub fn confidence_field(&self) -> String {
        format!("{}", self.confidence)
    }
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self::new(Environment::Default, DEFAULT_CONFIDENCE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_trees: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of a successful analysis response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub image: String,
    pub statistics: Statistics,
}

/// Derived artifacts the service offers for download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactKind {
    Png,
    Gpkg,
}

impl ArtifactKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::Png => "result.png",
            ArtifactKind::Gpkg => "crowns_out.gpkg",
        }
    }

    pub fn download_path(&self) -> String {
        format!("download/{}", self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn confidence_is_clamped_into_unit_range() {
        assert_eq!(AnalysisParams::new(Environment::Forest, 1.7).confidence, 1.0);
        assert_eq!(AnalysisParams::new(Environment::Forest, -0.2).confidence, 0.0);
        assert_eq!(
            AnalysisParams::new(Environment::Urban, f64::NAN).confidence,
            DEFAULT_CONFIDENCE
        );
        assert_eq!(AnalysisParams::default().confidence_field(), "0.5");
    }

    #[test]
    fn environment_uses_wire_names() {
        assert_eq!(Environment::Forest.to_string(), "Forest");
        assert_eq!(Environment::from_str("Urban").unwrap(), Environment::Urban);
        assert_eq!(serde_json::to_string(&Environment::Default).unwrap(), "\"Default\"");
    }

    #[test]
    fn artifacts_map_to_endpoints_and_file_names() {
        assert_eq!(ArtifactKind::Png.download_path(), "download/png");
        assert_eq!(ArtifactKind::Gpkg.file_name(), "crowns_out.gpkg");
        assert_eq!(ArtifactKind::from_str("gpkg").unwrap(), ArtifactKind::Gpkg);
    }

    #[test]
    fn result_keeps_unknown_statistics() {
        let body = r#"{"image":"data:image/png;base64,AAAA","statistics":{"total_trees":42,"mean_area":3.5}}"#;
        let result: AnalysisResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.statistics.total_trees, 42);
        assert!(result.statistics.extra.contains_key("mean_area"));
    }
}
