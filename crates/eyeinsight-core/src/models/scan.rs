use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::de::deserialize_string_or_number;
use crate::utils::{contains_ignore_case, format_date};

/// Prediction label the server uses for a healthy scan
pub const NORMAL_PREDICTION: &str = "Normal";

/// A retinal scan and the prediction the service produced for it.
///
/// The list endpoint spells some fields differently from the detail endpoint
/// (`pred` vs `prediction`, `conf` vs `confidence`); both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(alias = "pred")]
    pub prediction: String,
    #[serde(alias = "conf", default)]
    pub confidence: f64,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub imagepath: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanListResponse {
    #[serde(default)]
    pub scans: Vec<ScanRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub scan: ScanRecord,
}

/// Coarse classification of a scan result for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Normal,
    Warning,
    Alert,
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStatus::Normal => write!(f, "normal"),
            ScanStatus::Warning => write!(f, "warning"),
            ScanStatus::Alert => write!(f, "alert"),
        }
    }
}

impl ScanRecord {
    pub fn is_normal(&self) -> bool {
        self.prediction == NORMAL_PREDICTION
    }

    /// Mild or early-stage findings are a warning, anything else abnormal is an alert.
    pub fn status(&self) -> ScanStatus {
        if self.is_normal() {
            return ScanStatus::Normal;
        }
        let label = self.diagnosis_label();
        if label.contains("Mild") || label.contains("Early") {
            ScanStatus::Warning
        } else {
            ScanStatus::Alert
        }
    }

    /// Prediction with severity appended, e.g. "Glaucoma (Mild)"
    pub fn diagnosis_label(&self) -> String {
        match self.severity.as_deref() {
            Some(severity) if !severity.is_empty() => {
                format!("{} ({})", self.prediction, severity)
            }
            _ => self.prediction.clone(),
        }
    }

    /// Confidence as a whole percentage. Accepts both 0..1 and 0..100 scales.
    pub fn confidence_percent(&self) -> u32 {
        let pct = if self.confidence <= 1.0 {
            self.confidence * 100.0
        } else {
            self.confidence
        };
        pct.round().clamp(0.0, 100.0) as u32
    }

    pub fn date_display(&self) -> String {
        self.datetime
            .as_deref()
            .map(format_date)
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Report list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanFilter {
    #[default]
    All,
    Normal,
    Abnormal,
}

impl ScanFilter {
    pub fn matches(&self, scan: &ScanRecord) -> bool {
        match self {
            ScanFilter::All => true,
            ScanFilter::Normal => scan.is_normal(),
            ScanFilter::Abnormal => !scan.is_normal(),
        }
    }

    /// Apply the filter together with a case-insensitive search on the prediction.
    pub fn apply<'a>(&self, scans: &'a [ScanRecord], search: &str) -> Vec<&'a ScanRecord> {
        scans
            .iter()
            .filter(|scan| contains_ignore_case(&scan.prediction, search))
            .filter(|scan| self.matches(scan))
            .collect()
    }
}

impl FromStr for ScanFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ScanFilter::All),
            "normal" => Ok(ScanFilter::Normal),
            "abnormal" => Ok(ScanFilter::Abnormal),
            other => Err(format!("Unknown filter '{}' (expected all, normal or abnormal)", other)),
        }
    }
}
