//! Moderation labels, the closed category set and the sensitivity result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::ModerationError;

/// Closed set of categories the overall score is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModerationCategory {
    #[serde(rename = "Explicit Nudity")]
    ExplicitNudity,
    #[serde(rename = "Suggestive")]
    Suggestive,
    #[serde(rename = "Violence")]
    Violence,
    #[serde(rename = "Visually Disturbing")]
    VisuallyDisturbing,
    #[serde(rename = "Drugs")]
    Drugs,
    #[serde(rename = "Hate Symbols")]
    HateSymbols,
    #[serde(rename = "Gambling")]
    Gambling,
}

impl ModerationCategory {
    pub const ALL: [ModerationCategory; 7] = [
        ModerationCategory::ExplicitNudity,
        ModerationCategory::Suggestive,
        ModerationCategory::Violence,
        ModerationCategory::VisuallyDisturbing,
        ModerationCategory::Drugs,
        ModerationCategory::HateSymbols,
        ModerationCategory::Gambling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationCategory::ExplicitNudity => "Explicit Nudity",
            ModerationCategory::Suggestive => "Suggestive",
            ModerationCategory::Violence => "Violence",
            ModerationCategory::VisuallyDisturbing => "Visually Disturbing",
            ModerationCategory::Drugs => "Drugs",
            ModerationCategory::HateSymbols => "Hate Symbols",
            ModerationCategory::Gambling => "Gambling",
        }
    }

    /// Multiplier applied to the category's maximum confidence in the overall score.
    pub fn weight(&self) -> f64 {
        match self {
            ModerationCategory::ExplicitNudity => 1.0,
            ModerationCategory::Suggestive => 0.4,
            ModerationCategory::Violence => 0.8,
            ModerationCategory::VisuallyDisturbing => 0.7,
            ModerationCategory::Drugs => 0.6,
            ModerationCategory::HateSymbols => 0.9,
            ModerationCategory::Gambling => 0.3,
        }
    }

    /// Confidence above which this category alone flags a job. Gambling never does.
    pub fn flag_threshold(&self) -> Option<f64> {
        match self {
            ModerationCategory::ExplicitNudity => Some(50.0),
            ModerationCategory::Suggestive => Some(80.0),
            ModerationCategory::Violence => Some(60.0),
            ModerationCategory::VisuallyDisturbing => Some(60.0),
            ModerationCategory::Drugs => Some(70.0),
            ModerationCategory::HateSymbols => Some(50.0),
            ModerationCategory::Gambling => None,
        }
    }

    fn slot(&self) -> usize {
        match self {
            ModerationCategory::ExplicitNudity => 0,
            ModerationCategory::Suggestive => 1,
            ModerationCategory::Violence => 2,
            ModerationCategory::VisuallyDisturbing => 3,
            ModerationCategory::Drugs => 4,
            ModerationCategory::HateSymbols => 5,
            ModerationCategory::Gambling => 6,
        }
    }

    /// Match a label or parent name against the category set.
    pub fn from_label_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl Display for ModerationCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationCategory {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label_name(s).ok_or_else(|| ModerationError::UnknownCategory(s.to_string()))
    }
}

/// A label returned by the classifier backend for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationLabel {
    pub name: String,
    pub parent: Option<String>,
    /// Confidence in [0, 100].
    pub confidence: f64,
}

impl ModerationLabel {
    pub fn new(name: impl Into<String>, parent: Option<&str>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            parent: parent.filter(|p| !p.is_empty()).map(str::to_string),
            confidence,
        }
    }
}

/// Running maximum confidence per category, seeded at 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CategoryScoreTable {
    maxima: [f64; 7],
}

impl CategoryScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation; the stored value only ever increases.
    pub fn observe(&mut self, category: ModerationCategory, confidence: f64) {
        let slot = &mut self.maxima[category.slot()];
        if confidence > *slot {
            *slot = confidence;
        }
    }

    pub fn get(&self, category: ModerationCategory) -> f64 {
        self.maxima[category.slot()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModerationCategory, f64)> + '_ {
        ModerationCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    /// Σ confidence × weight, unclamped.
    pub fn weighted_sum(&self) -> f64 {
        self.iter().map(|(c, v)| v * c.weight()).sum()
    }

    /// Snapshot with every value rounded to the nearest integer.
    pub fn rounded(&self) -> BTreeMap<ModerationCategory, u32> {
        self.iter().map(|(c, v)| (c, v.round() as u32)).collect()
    }
}

impl TryFrom<&HashMap<String, f64>> for CategoryScoreTable {
    type Error = ModerationError;

    /// Build a table from named scores, rejecting names outside the category set.
    fn try_from(scores: &HashMap<String, f64>) -> Result<Self, Self::Error> {
        let mut table = Self::new();
        for (name, value) in scores {
            let category: ModerationCategory = name.parse()?;
            table.observe(category, *value);
        }
        Ok(table)
    }
}

/// A deduplicated label as persisted in the sensitivity details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedLabel {
    pub name: String,
    pub parent: Option<String>,
    pub confidence: u32,
}

/// Final verdict of a moderation run. Written once into the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityResult {
    pub overall_score: u32,
    pub categories: BTreeMap<ModerationCategory, u32>,
    pub detected_labels: Vec<DetectedLabel>,
    pub frames_analyzed: usize,
    pub analysis_method: String,
    pub average_label_confidence: u32,
    pub is_flagged: bool,
    pub analyzed_at: DateTime<Utc>,
}
