use shared::{AnalysisParams, Environment};
use std::str::FromStr;

/// A validated analysis upload, buffered in memory before it is forwarded.
#[derive(Debug, Clone)]
pub struct AnalysisForm {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub params: AnalysisParams,
}

/// Fields collected from the multipart stream, not yet validated.
#[derive(Debug, Default)]
pub struct RawForm {
    pub file: Option<(String, String, Vec<u8>)>,
    pub environment: Option<String>,
    pub confidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Missing form field: {0}")]
    Missing(&'static str),
    #[error("Unknown environment: {0}")]
    Environment(String),
    #[error("Confidence must be a number between 0 and 1, got {0}")]
    Confidence(String),
    #[error("Uploaded file is empty")]
    EmptyFile,
}

impl RawForm {
    pub fn validate(self) -> Result<AnalysisForm, FormError> {
        let (file_name, content_type, bytes) = self.file.ok_or(FormError::Missing("file"))?;
        if bytes.is_empty() {
            return Err(FormError::EmptyFile);
        }

        let environment = match self.environment {
            Some(value) => Environment::from_str(value.trim())
                .map_err(|_| FormError::Environment(value))?,
            None => Environment::default(),
        };

        let confidence = match self.confidence {
            Some(value) => match value.trim().parse::<f64>() {
                Ok(parsed) if (0.0..=1.0).contains(&parsed) => parsed,
                _ => return Err(FormError::Confidence(value)),
            },
            None => shared::DEFAULT_CONFIDENCE,
        };

        Ok(AnalysisForm {
            file_name,
            content_type,
            bytes,
            params: AnalysisParams::new(environment, confidence),
        })
    }
}
