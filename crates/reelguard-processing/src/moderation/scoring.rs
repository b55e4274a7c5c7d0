//! Weighted-score aggregation over per-frame labels.

use chrono::{DateTime, Utc};
use reelguard_core::models::{
    CategoryScoreTable, DetectedLabel, ModerationCategory, ModerationLabel, SensitivityResult,
};
use reelguard_core::{ModerationError, ModerationResult};

/// Overall score above which a job is flagged regardless of the category breakdown.
pub const OVERALL_FLAG_THRESHOLD: f64 = 50.0;

/// Average label confidence reported when nothing was detected.
const CLEAN_AVERAGE_CONFIDENCE: u32 = 100;

/// Turns raw labels into a [`SensitivityResult`]. Pure and order-independent in its
/// scores; detected labels keep the first occurrence of each name.
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    analysis_method: String,
}

impl ScoreAggregator {
    pub fn new(analysis_method: impl Into<String>) -> Self {
        Self {
            analysis_method: analysis_method.into(),
        }
    }

    pub fn aggregate(
        &self,
        frames: &[Vec<ModerationLabel>],
        analyzed_at: DateTime<Utc>,
    ) -> ModerationResult<SensitivityResult> {
        let mut table = CategoryScoreTable::new();
        let mut detected: Vec<DetectedLabel> = Vec::new();

        for label in frames.iter().flatten() {
            if !label.confidence.is_finite() || !(0.0..=100.0).contains(&label.confidence) {
                return Err(ModerationError::Aggregation(format!(
                    "label '{}' has confidence {} outside [0, 100]",
                    label.name, label.confidence
                )));
            }

            let parent_or_name = label.parent.as_deref().unwrap_or(&label.name);
            if let Some(category) = ModerationCategory::from_label_name(parent_or_name) {
                table.observe(category, label.confidence);
            }
            if let Some(category) = ModerationCategory::from_label_name(&label.name) {
                table.observe(category, label.confidence);
            }

            if !detected.iter().any(|d| d.name == label.name) {
                detected.push(DetectedLabel {
                    name: label.name.clone(),
                    parent: label.parent.clone(),
                    confidence: label.confidence.round() as u32,
                });
            }
        }

        let score = overall_score(&table);
        let is_flagged = is_flagged(&table, score);

        let average_label_confidence = if detected.is_empty() {
            CLEAN_AVERAGE_CONFIDENCE
        } else {
            let sum: u32 = detected.iter().map(|d| d.confidence).sum();
            (f64::from(sum) / detected.len() as f64).round() as u32
        };

        Ok(SensitivityResult {
            overall_score: score.round() as u32,
            categories: table.rounded(),
            detected_labels: detected,
            frames_analyzed: frames.len(),
            analysis_method: self.analysis_method.clone(),
            average_label_confidence,
            is_flagged,
            analyzed_at,
        })
    }
}

/// `min(100, Σ confidence × weight)`, before rounding.
pub fn overall_score(table: &CategoryScoreTable) -> f64 {
    table.weighted_sum().min(100.0)
}

/// Flag decision over the unrounded scores.
pub fn is_flagged(table: &CategoryScoreTable, overall_score: f64) -> bool {
    overall_score > OVERALL_FLAG_THRESHOLD
        || table.iter().any(|(category, value)| {
            category
                .flag_threshold()
                .is_some_and(|threshold| value > threshold)
        })
}
