use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::aggregate::AggregationPolicy;
use crate::config::{DataSource, RunConfig};
use crate::error::ChartResult;
use crate::render::ChartLayout;

#[derive(Parser, Debug)]
#[command(author, version, about = "Variant distribution charts per sequencing instrument", long_about = None)]
pub struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load, aggregate and render the stacked bar chart
    Render(RenderArgs),
    /// Compare workbook percentages with the per-variant tables
    Compare(CompareArgs),
}

/// Input selection shared by every command.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// JSON run configuration; flags below override it
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Directory holding early_late_var<N> tables and the workbook
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    /// Workbook file (relative paths resolve against the data directory)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub workbook: Option<PathBuf>,

    /// Worksheet name (first sheet when omitted)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Variants to include, comma separated (default: all found)
    #[arg(long, value_delimiter = ',')]
    pub variants: Vec<u32>,

    /// Instrument row name, repeat in stacking order (default: the three standard sequencers)
    #[arg(long = "instrument")]
    pub instruments: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Which input feeds the chart
    #[arg(long, value_enum)]
    pub source: Option<DataSource>,

    /// How instrument percentages combine into stacked segments
    #[arg(short, long, value_enum)]
    pub policy: Option<AggregationPolicy>,

    /// Panel arrangement
    #[arg(short, long, value_enum)]
    pub layout: Option<ChartLayout>,

    /// Output PNG path (default depends on the policy)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Chart title (default depends on the policy)
    #[arg(long)]
    pub title: Option<String>,

    /// Open an interactive viewer after saving
    #[arg(long, action = ArgAction::SetTrue)]
    pub show: bool,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Largest difference still counted as equal
    #[arg(long, default_value_t = 1e-9)]
    pub tolerance: f64,

    /// Print the report as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Exit non-zero when any value differs
    #[arg(long, action = ArgAction::SetTrue)]
    pub strict: bool,
}

impl InputArgs {
    /// Config file (or defaults) with the input flags applied.
    pub fn resolve(&self) -> ChartResult<RunConfig> {
        let mut cfg = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            cfg.data_dir = dir.clone();
        }
        if let Some(workbook) = &self.workbook {
            cfg.workbook = workbook.clone();
        }
        if self.sheet.is_some() {
            cfg.sheet = self.sheet.clone();
        }
        if !self.variants.is_empty() {
            cfg.variants = Some(self.variants.clone());
        }
        if !self.instruments.is_empty() {
            cfg.instruments = self.instruments.clone();
        }
        Ok(cfg)
    }
}

impl RenderArgs {
    pub fn resolve(&self) -> ChartResult<RunConfig> {
        let mut cfg = self.input.resolve()?;
        if let Some(source) = self.source {
            cfg.source = source;
        }
        if let Some(policy) = self.policy {
            cfg.policy = policy;
        }
        if let Some(layout) = self.layout {
            cfg.layout = layout;
        }
        if self.output.is_some() {
            cfg.output = self.output.clone();
        }
        if let Some(width) = self.width {
            cfg.width = width;
        }
        if let Some(height) = self.height {
            cfg.height = height;
        }
        if self.title.is_some() {
            cfg.title = self.title.clone();
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn render_args(args: &[&str]) -> RenderArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Render(r) => r,
            other => panic!("expected render, got {other:?}"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_defaults_come_from_config_defaults() {
        let cfg = render_args(&["variant-panda", "render"]).resolve().unwrap();
        assert_eq!(cfg, RunConfig::default());
    }

    #[test]
    fn render_flags_override() {
        let args = render_args(&[
            "variant-panda",
            "render",
            "--policy",
            "proportional",
            "--layout",
            "split-grouped",
            "--variants",
            "18,16",
            "--instrument",
            "A",
            "--instrument",
            "B",
            "--source",
            "workbook",
            "-o",
            "out.png",
        ]);
        let cfg = args.resolve().unwrap();
        assert_eq!(cfg.policy, AggregationPolicy::Proportional);
        assert_eq!(cfg.layout, ChartLayout::SplitGrouped);
        assert_eq!(cfg.variants, Some(vec![18, 16]));
        assert_eq!(cfg.instruments, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(cfg.source, DataSource::Workbook);
        assert_eq!(cfg.output_path(), PathBuf::from("out.png"));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(Cli::try_parse_from(["variant-panda", "render", "--policy", "median"]).is_err());
    }

    #[test]
    fn compare_flags() {
        let cli = Cli::try_parse_from(["variant-panda", "-v", "compare", "--json", "--strict"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Compare(c) => {
                assert!(c.json && c.strict);
                assert_eq!(c.tolerance, 1e-9);
            }
            other => panic!("expected compare, got {other:?}"),
        }
    }
}
