//! Run configuration: key candidates, metric aliases, ratios, stage rules and
//! summary declarations. Loaded from YAML; [`ReconConfig::default`] mirrors the
//! layout of the usual merchant exports (client code, GMV, transaction count).

use std::{collections::HashSet, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    columns::{FieldSpec, normalize_header},
    error::{Period, ReconError, ReconResult},
    growth::RatioSpec,
    stage::{PerformanceStage, StagePreset, StageRule, StageScheme},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageBasis {
    /// Growth percentage of the metric.
    #[default]
    Growth,
    /// Absolute change `current - base`.
    Change,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Field whose growth (or change) drives the classification.
    pub metric: String,
    #[serde(default)]
    pub basis: StageBasis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<StagePreset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<StageRule>,
    #[serde(default = "StageConfig::default_fallback")]
    pub fallback: PerformanceStage,
}

impl StageConfig {
    fn default_fallback() -> PerformanceStage {
        PerformanceStage::Stable
    }

    /// Explicit rules win; otherwise the preset (two-tier when unset).
    pub fn scheme(&self) -> ReconResult<StageScheme> {
        if self.rules.is_empty() {
            let mut scheme = StageScheme::preset(self.preset.unwrap_or_default());
            scheme.fallback = self.fallback;
            Ok(scheme)
        } else {
            StageScheme::new(self.rules.clone(), self.fallback)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub field: String,
    pub period: Period,
}

impl FieldRef {
    pub fn new(field: &str, period: Period) -> Self {
        Self {
            field: field.to_string(),
            period,
        }
    }

    /// Metric name used in the summary, e.g. `gmv_current`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.field.replace(' ', "_"), self.period)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRatio {
    pub name: String,
    pub numerator: FieldRef,
    pub denominator: FieldRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default)]
    pub sums: Vec<FieldRef>,
    #[serde(default)]
    pub ratios: Vec<SummaryRatio>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconConfig {
    pub key_candidates: Vec<String>,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub ratios: Vec<RatioSpec>,
    pub stage: StageConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_attribute: Option<String>,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            key_candidates: [
                "client code",
                "merchant id",
                "merchant_id",
                "client_id",
                "client id",
                "mid",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            fields: vec![
                FieldSpec::new("gmv", ["gmv", "gross merchandise value"]),
                FieldSpec::new(
                    "transaction count",
                    ["transaction count", "txn count", "txn"],
                ),
                FieldSpec::new(
                    "successful transactions",
                    ["successful transactions", "success count", "successful"],
                )
                .optional(),
                FieldSpec::new(
                    "attempted transactions",
                    ["attempted transactions", "total transactions", "attempted"],
                )
                .optional(),
            ],
            ratios: vec![RatioSpec {
                name: "success rate".to_string(),
                numerator: "successful transactions".to_string(),
                denominator: "attempted transactions".to_string(),
                period: Period::Current,
            }],
            stage: StageConfig {
                metric: "gmv".to_string(),
                basis: StageBasis::Growth,
                preset: Some(StagePreset::TwoTier),
                rules: Vec::new(),
                fallback: PerformanceStage::Stable,
            },
            summary: SummaryConfig {
                sums: vec![
                    FieldRef::new("gmv", Period::Base),
                    FieldRef::new("gmv", Period::Current),
                    FieldRef::new("transaction count", Period::Current),
                ],
                ratios: vec![SummaryRatio {
                    name: "success rate".to_string(),
                    numerator: FieldRef::new("successful transactions", Period::Current),
                    denominator: FieldRef::new("attempted transactions", Period::Current),
                }],
            },
            filter_attribute: Some("account manager".to_string()),
        }
    }
}

impl ReconConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening config file {path:?}"))?;
        let config: ReconConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_yaml_string()?)
            .with_context(|| format!("Writing config file {path:?}"))
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing config YAML")
    }

    pub fn with_preset(mut self, preset: StagePreset) -> Self {
        self.stage.preset = Some(preset);
        self.stage.rules.clear();
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn normalized_filter_attribute(&self) -> Option<String> {
        self.filter_attribute
            .as_deref()
            .map(normalize_header)
            .filter(|a| !a.is_empty())
    }

    pub fn validate(&self) -> ReconResult<()> {
        if self
            .key_candidates
            .iter()
            .all(|c| normalize_header(c).is_empty())
        {
            return Err(invalid("key_candidates must list at least one column name"));
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(invalid("field names cannot be empty"));
            }
            if !names.insert(field.name.as_str()) {
                return Err(invalid(format!("field '{}' is declared twice", field.name)));
            }
            if field.candidates().is_empty() {
                return Err(invalid(format!("field '{}' has no usable aliases", field.name)));
            }
        }

        for ratio in &self.ratios {
            for part in [&ratio.numerator, &ratio.denominator] {
                if !names.contains(part.as_str()) {
                    return Err(invalid(format!(
                        "ratio '{}' refers to undeclared field '{part}'",
                        ratio.name
                    )));
                }
            }
        }

        match self.field(&self.stage.metric) {
            None => {
                return Err(invalid(format!(
                    "stage metric '{}' is not a declared field",
                    self.stage.metric
                )));
            }
            Some(spec) if !spec.required => {
                return Err(invalid(format!(
                    "stage metric '{}' must be a required field",
                    self.stage.metric
                )));
            }
            Some(_) => {}
        }
        if self.stage.preset.is_some() && !self.stage.rules.is_empty() {
            return Err(invalid("stage: give either a preset or explicit rules, not both"));
        }
        if self.stage.fallback == PerformanceStage::Unknown {
            return Err(invalid("stage fallback cannot be 'Unknown'"));
        }
        self.stage.scheme()?;

        let summary_refs = self.summary.sums.iter().chain(
            self.summary
                .ratios
                .iter()
                .flat_map(|r| [&r.numerator, &r.denominator]),
        );
        for field_ref in summary_refs {
            if !names.contains(field_ref.field.as_str()) {
                return Err(invalid(format!(
                    "summary refers to undeclared field '{}'",
                    field_ref.field
                )));
            }
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ReconError {
    ReconError::InvalidConfig(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Predicate;

    #[test]
    fn default_config_is_valid() {
        ReconConfig::default().validate().unwrap();
    }

    #[test]
    fn yaml_round_trip_preserves_config() {
        let config = ReconConfig::default().with_preset(StagePreset::FourTier);
        let yaml = config.to_yaml_string().unwrap();
        assert!(yaml.contains("preset: four-tier"));
        let parsed: ReconConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn explicit_rules_from_yaml() {
        let yaml = r#"
key_candidates: [mid]
fields:
  - name: gmv
    aliases: [gmv]
stage:
  metric: gmv
  rules:
    - when: { above: 50 }
      stage: High Performing
    - when: { below: 0 }
      stage: Low Performing
"#;
        let config: ReconConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        let scheme = config.stage.scheme().unwrap();
        assert_eq!(scheme.rules[0].when, Predicate::Above(50.0));
        assert_eq!(scheme.fallback, PerformanceStage::Stable);
        assert_eq!(config.filter_attribute, None);
        assert!(config.fields[0].required);
    }

    #[test]
    fn rejects_unknown_stage_metric() {
        let mut config = ReconConfig::default();
        config.stage.metric = "refunds".into();
        assert!(matches!(config.validate(), Err(ReconError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_preset_with_rules() {
        let mut config = ReconConfig::default();
        config.stage.rules = StageScheme::preset(StagePreset::FourTier).rules;
        assert!(config.validate().is_err());
        assert!(config.with_preset(StagePreset::TwoTier).validate().is_ok());
    }

    #[test]
    fn rejects_ratio_on_undeclared_field() {
        let mut config = ReconConfig::default();
        config.ratios[0].numerator = "refunds".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn field_ref_label_is_snake_case() {
        let field = FieldRef::new("transaction count", Period::Current);
        assert_eq!(field.label(), "transaction_count_current");
    }
}
