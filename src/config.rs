use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregationPolicy;
use crate::data::model::DEFAULT_INSTRUMENTS;
use crate::error::{ChartError, ChartResult};
use crate::render::{ChartLayout, RenderOptions, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Which input feeds the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    /// One `early_late_var<N>` table per variant.
    #[default]
    Tables,
    /// A single workbook with `early var<N>` / `late var<N>` columns.
    Workbook,
}

/// Everything one run needs.  Read from an optional JSON file; command line
/// flags override individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "RunConfig::default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub source: DataSource,
    /// Relative paths are resolved against `data_dir`.
    #[serde(default = "RunConfig::default_workbook")]
    pub workbook: PathBuf,
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default = "RunConfig::default_instruments")]
    pub instruments: Vec<String>,
    /// `None` means every variant found in the source.
    #[serde(default)]
    pub variants: Option<Vec<u32>>,
    #[serde(default)]
    pub policy: AggregationPolicy,
    #[serde(default)]
    pub layout: ChartLayout,
    /// Defaults to a policy-specific name in the working directory.
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default = "RunConfig::default_width")]
    pub width: u32,
    #[serde(default = "RunConfig::default_height")]
    pub height: u32,
    #[serde(default)]
    pub title: Option<String>,
}

impl RunConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from(".")
    }
    fn default_workbook() -> PathBuf {
        PathBuf::from("early_late_groups_3_locations.xlsx")
    }
    fn default_instruments() -> Vec<String> {
        DEFAULT_INSTRUMENTS.iter().map(|s| s.to_string()).collect()
    }
    fn default_width() -> u32 {
        DEFAULT_WIDTH
    }
    fn default_height() -> u32 {
        DEFAULT_HEIGHT
    }

    /// Read a JSON config file; absent fields take their defaults.
    pub fn load(path: &Path) -> ChartResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ChartError::missing(format!("config file {} does not exist", path.display()))
            } else {
                ChartError::io(path, e)
            }
        })?;
        let cfg: RunConfig = serde_json::from_str(&text)
            .map_err(|e| ChartError::malformed(path.display().to_string(), e.to_string()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(cfg)
    }

    /// Reject configurations no input could satisfy.
    pub fn validate(&self) -> ChartResult<()> {
        if self.instruments.is_empty() {
            return Err(ChartError::Precondition("no instruments configured".into()));
        }
        for (i, name) in self.instruments.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ChartError::Precondition("instrument names must not be blank".into()));
            }
            if self.instruments[..i].iter().any(|other| other.trim() == name.trim()) {
                return Err(ChartError::Precondition(format!(
                    "instrument '{name}' is listed twice"
                )));
            }
        }
        if let Some(variants) = &self.variants {
            if variants.is_empty() {
                return Err(ChartError::Precondition("variant list is empty".into()));
            }
            for (i, variant) in variants.iter().enumerate() {
                if variants[..i].contains(variant) {
                    return Err(ChartError::Precondition(format!(
                        "variant {variant} is listed twice"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn workbook_path(&self) -> PathBuf {
        if self.workbook.is_absolute() {
            self.workbook.clone()
        } else {
            self.data_dir.join(&self.workbook)
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.policy.default_output()))
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            layout: self.layout,
            width: self.width,
            height: self.height,
            title: self.title.clone(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            source: DataSource::default(),
            workbook: Self::default_workbook(),
            sheet: None,
            instruments: Self::default_instruments(),
            variants: None,
            policy: AggregationPolicy::default(),
            layout: ChartLayout::default(),
            output: None,
            width: Self::default_width(),
            height: Self::default_height(),
            title: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        fs::write(
            &path,
            r#"{ "policy": "equal-weight", "layout": "combined", "variants": [16, 17] }"#,
        )
        .unwrap();
        let cfg = RunConfig::load(&path).unwrap();
        assert_eq!(cfg.policy, AggregationPolicy::EqualWeight);
        assert_eq!(cfg.layout, ChartLayout::Combined);
        assert_eq!(cfg.variants, Some(vec![16, 17]));
        assert_eq!(cfg.instruments.len(), 3);
        assert_eq!(cfg.width, DEFAULT_WIDTH);
        assert_eq!(cfg.output_path(), PathBuf::from("variant_distribution_averaged.png"));
    }

    #[test]
    fn bad_files_map_to_error_kinds() {
        let dir = TempDir::new().unwrap();
        let missing = RunConfig::load(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(missing, ChartError::MissingInput(_)));

        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "policy": "median" }"#).unwrap();
        let bad = RunConfig::load(&path).unwrap_err();
        assert!(matches!(bad, ChartError::MalformedData { .. }));
    }

    #[test]
    fn validation_rejects_unusable_lists() {
        assert!(RunConfig::default().validate().is_ok());

        let mut cfg = RunConfig::default();
        cfg.instruments.push("DE MiniSeq".into());
        assert!(matches!(cfg.validate(), Err(ChartError::Precondition(_))));

        let cfg = RunConfig {
            variants: Some(vec![]),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RunConfig {
            variants: Some(vec![16, 17, 16]),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ChartError::Precondition(ref m)) if m.contains("16")));

        let cfg = RunConfig {
            instruments: vec![],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn workbook_resolves_against_data_dir() {
        let cfg = RunConfig {
            data_dir: PathBuf::from("/data/run1"),
            ..Default::default()
        };
        assert_eq!(
            cfg.workbook_path(),
            PathBuf::from("/data/run1/early_late_groups_3_locations.xlsx")
        );
    }
}
