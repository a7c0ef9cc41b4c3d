//! Configuration structures for the evaluation pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::dates::{CalendarPolicy, ReferenceYear, SelectionPolicy};
use crate::validation::ground_truth::{DateBasis, IdentifierKey};

/// Main configuration for the edf pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EdfConfig {
    /// Date extraction configuration.
    pub extraction: ExtractionConfig,

    /// Date selection configuration.
    pub selection: SelectionConfig,

    /// Ground truth configuration.
    pub ground_truth: GroundTruthConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Batch processing configuration.
    pub batch: BatchConfig,
}

/// Date extraction configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Year used to expand 2-digit years. `None` means the current year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_year: Option<ReferenceYear>,

    /// Handling of day/month combinations that do not exist.
    pub calendar: CalendarPolicy,
}

impl ExtractionConfig {
    /// Configured reference year, or the current one.
    pub fn reference_year(&self) -> ReferenceYear {
        self.reference_year.unwrap_or_else(ReferenceYear::current)
    }
}

/// Date selection configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Which dates stand for a document.
    pub policy: SelectionPolicy,
}

/// Ground truth configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundTruthConfig {
    /// Path to the ground truth CSV.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// chrono format of the timestamp columns.
    pub timestamp_format: String,

    /// Which calendar day a timestamp with an offset stands for.
    pub date_basis: DateBasis,

    /// How document paths map to ground truth identifiers.
    pub key: IdentifierKey,
}

impl Default for GroundTruthConfig {
    fn default() -> Self {
        Self {
            path: None,
            timestamp_format: "%Y-%m-%d %H:%M:%S%:z".to_string(),
            date_basis: DateBasis::default(),
            key: IdentifierKey::default(),
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` tokens in recognized text instead of blanking them.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "cyrillic_rec.onnx".to_string(),
            dictionary: "cyrillic_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Get full path to an OCR model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of documents processed concurrently.
    pub jobs: usize,

    /// Extensions read as pre-extracted text transcripts.
    pub text_extensions: Vec<String>,

    /// Extensions sent through the OCR engine.
    pub image_extensions: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            text_extensions: vec!["txt".to_string()],
            image_extensions: ["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl EdfConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{"selection": {"policy": "pair"}, "extraction": {"reference_year": 2025}}"#;
        let config: EdfConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.selection.policy, SelectionPolicy::Pair);
        assert_eq!(config.extraction.reference_year().year(), 2025);
        assert_eq!(config.extraction.calendar, CalendarPolicy::Strict);
        assert_eq!(config.batch.jobs, 4);
        assert_eq!(config.ground_truth.timestamp_format, "%Y-%m-%d %H:%M:%S%:z");
    }

    #[test]
    fn test_invalid_reference_year_is_rejected() {
        let result = serde_json::from_str::<EdfConfig>(r#"{"extraction": {"reference_year": 25}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = EdfConfig::default();
        config.extraction.calendar = CalendarPolicy::Rollover;
        config.batch.jobs = 8;
        config.save(&path).unwrap();

        let loaded = EdfConfig::from_file(&path).unwrap();
        assert_eq!(loaded.extraction.calendar, CalendarPolicy::Rollover);
        assert_eq!(loaded.batch.jobs, 8);
        assert_eq!(loaded.ocr.model_path("det.onnx"), PathBuf::from("models/det.onnx"));
    }
}
