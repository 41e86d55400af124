//! Performance stage classification.
//!
//! A [`StageScheme`] is an ordered list of [`StageRule`]s plus a fallback
//! stage. [`StageScheme::classify`] evaluates the rules in order and returns
//! the stage of the first matching rule. Null input is always
//! [`PerformanceStage::Unknown`]. The two-tier and four-tier presets are plain
//! data fed to the same evaluator.

use std::{fmt, str::FromStr};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{ReconError, ReconResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerformanceStage {
    #[serde(rename = "High Performing")]
    HighPerforming,
    #[serde(rename = "On Track")]
    OnTrack,
    #[serde(rename = "Stable")]
    Stable,
    #[serde(rename = "Low Performing")]
    LowPerforming,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl PerformanceStage {
    pub const ALL: [PerformanceStage; 6] = [
        PerformanceStage::HighPerforming,
        PerformanceStage::OnTrack,
        PerformanceStage::Stable,
        PerformanceStage::LowPerforming,
        PerformanceStage::AtRisk,
        PerformanceStage::Unknown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceStage::HighPerforming => "High Performing",
            PerformanceStage::OnTrack => "On Track",
            PerformanceStage::Stable => "Stable",
            PerformanceStage::LowPerforming => "Low Performing",
            PerformanceStage::AtRisk => "At Risk",
            PerformanceStage::Unknown => "Unknown",
        }
    }

    /// Snake-case token used in summary metric names.
    pub fn token(&self) -> &'static str {
        match self {
            PerformanceStage::HighPerforming => "high_performing",
            PerformanceStage::OnTrack => "on_track",
            PerformanceStage::Stable => "stable",
            PerformanceStage::LowPerforming => "low_performing",
            PerformanceStage::AtRisk => "at_risk",
            PerformanceStage::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PerformanceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PerformanceStage {
    type Err = ReconError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        PerformanceStage::ALL
            .into_iter()
            .find(|stage| {
                stage.label().eq_ignore_ascii_case(wanted) || stage.token().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ReconError::InvalidConfig(format!("Unknown performance stage '{value}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// `value > threshold`
    Above(f64),
    /// `value < threshold`
    Below(f64),
    /// `low <= value <= high`
    Between(f64, f64),
}

impl Predicate {
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Predicate::Above(threshold) => value > threshold,
            Predicate::Below(threshold) => value < threshold,
            Predicate::Between(low, high) => low <= value && value <= high,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Above(t) => write!(f, "> {t}"),
            Predicate::Below(t) => write!(f, "< {t}"),
            Predicate::Between(low, high) => write!(f, "in [{low}, {high}]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageRule {
    pub when: Predicate,
    pub stage: PerformanceStage,
}

impl StageRule {
    pub fn new(when: Predicate, stage: PerformanceStage) -> Self {
        Self { when, stage }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum StagePreset {
    /// > 20 High Performing, < -20 At Risk, otherwise Stable
    #[default]
    TwoTier,
    /// > 100 High Performing, < 80 Low Performing, 90..=99 On Track, otherwise Stable
    FourTier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageScheme {
    pub rules: Vec<StageRule>,
    pub fallback: PerformanceStage,
}

impl StageScheme {
    pub fn new(rules: Vec<StageRule>, fallback: PerformanceStage) -> ReconResult<Self> {
        for rule in &rules {
            if let Predicate::Between(low, high) = rule.when
                && low > high
            {
                return Err(ReconError::InvalidConfig(format!(
                    "Stage rule for '{}' has an empty range [{low}, {high}]",
                    rule.stage
                )));
            }
            if rule.stage == PerformanceStage::Unknown {
                return Err(ReconError::InvalidConfig(
                    "Stage rules cannot assign 'Unknown'; it is reserved for missing metrics"
                        .to_string(),
                ));
            }
        }
        Ok(Self { rules, fallback })
    }

    pub fn preset(preset: StagePreset) -> Self {
        use PerformanceStage::*;
        let rules = match preset {
            StagePreset::TwoTier => vec![
                StageRule::new(Predicate::Above(20.0), HighPerforming),
                StageRule::new(Predicate::Below(-20.0), AtRisk),
            ],
            StagePreset::FourTier => vec![
                StageRule::new(Predicate::Above(100.0), HighPerforming),
                StageRule::new(Predicate::Below(80.0), LowPerforming),
                StageRule::new(Predicate::Between(90.0, 99.0), OnTrack),
            ],
        };
        Self {
            rules,
            fallback: Stable,
        }
    }

    pub fn classify(&self, value: Option<f64>) -> PerformanceStage {
        let Some(value) = value.filter(|v| !v.is_nan()) else {
            return PerformanceStage::Unknown;
        };
        self.rules
            .iter()
            .find(|rule| rule.when.matches(value))
            .map_or(self.fallback, |rule| rule.stage)
    }
}

impl Default for StageScheme {
    fn default() -> Self {
        Self::preset(StagePreset::default())
    }
}
