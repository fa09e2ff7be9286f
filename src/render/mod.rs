/// Static chart output.
///
/// ```text
///   AggregatedChart
///        │
///        ▼
///   ┌──────────┐
///   │  png      │  plotters → RGB buffer (one or two panels + legend)
///   └──────────┘
///        │
///        ▼
///   image::RgbImage → <output>.png
/// ```
pub mod geometry;
pub mod png;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregatedChart, AggregationPolicy};
use crate::error::{ChartError, ChartResult};

pub const DEFAULT_WIDTH: u32 = 1400;
pub const DEFAULT_HEIGHT: u32 = 800;

const BASE_TITLE: &str = "Variant Distribution by Sequencer";

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ChartLayout {
    /// Early and late side by side, one stacked bar per variant.
    #[default]
    SplitStacked,
    /// Early and late side by side, instruments as adjacent bars.
    SplitGrouped,
    /// One panel, a column per instrument with late stacked on early.
    Combined,
}

impl ChartLayout {
    pub const ALL: [ChartLayout; 3] = [
        ChartLayout::SplitStacked,
        ChartLayout::SplitGrouped,
        ChartLayout::Combined,
    ];

    pub fn is_split(self) -> bool {
        !matches!(self, ChartLayout::Combined)
    }
}

impl fmt::Display for ChartLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartLayout::SplitStacked => write!(f, "split-stacked"),
            ChartLayout::SplitGrouped => write!(f, "split-grouped"),
            ChartLayout::Combined => write!(f, "combined"),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub layout: ChartLayout,
    pub width: u32,
    pub height: u32,
    /// Overrides the policy-derived title.
    pub title: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            layout: ChartLayout::default(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            title: None,
        }
    }
}

impl RenderOptions {
    pub fn title_for(&self, policy: AggregationPolicy) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| default_title(policy))
    }
}

pub fn default_title(policy: AggregationPolicy) -> String {
    format!("{BASE_TITLE}{}", policy.title_suffix())
}

// ---------------------------------------------------------------------------
// Entry-point
// ---------------------------------------------------------------------------

/// Draw `chart` and write it as a PNG to `path`.
pub fn render_png(chart: &AggregatedChart, opts: &RenderOptions, path: &Path) -> ChartResult<()> {
    if opts.width < 200 || opts.height < 150 {
        return Err(ChartError::Precondition(format!(
            "image size {}x{} is too small to draw a chart",
            opts.width, opts.height
        )));
    }

    let mut buf = vec![0u8; opts.width as usize * opts.height as usize * 3];
    png::draw_chart(chart, opts, &mut buf)
        .map_err(|e| ChartError::io(path, format!("rendering chart: {e}")))?;

    let img = image::RgbImage::from_raw(opts.width, opts.height, buf)
        .ok_or_else(|| ChartError::io(path, "pixel buffer does not match the image size"))?;
    img.save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| ChartError::io(path, e))?;

    log::info!("Graph saved as '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::data::clean::clean_dataset;
    use crate::data::model::{Reading, VariantDataset, VariantRecord};

    #[test]
    fn titles_carry_the_policy() {
        assert_eq!(default_title(AggregationPolicy::Raw), BASE_TITLE);
        assert!(default_title(AggregationPolicy::EqualWeight).ends_with("(Averaged)"));
        let opts = RenderOptions {
            title: Some("Custom".into()),
            ..Default::default()
        };
        assert_eq!(opts.title_for(AggregationPolicy::Proportional), "Custom");
    }

    #[test]
    fn tiny_images_are_refused_before_drawing() {
        let chart = AggregatedChart {
            policy: AggregationPolicy::Raw,
            instruments: vec![],
            variants: vec![],
            early: vec![],
            late: vec![],
        };
        let opts = RenderOptions {
            width: 10,
            height: 10,
            ..Default::default()
        };
        let dir = tempfile::TempDir::new().unwrap();
        let err = render_png(&chart, &opts, &dir.path().join("x.png")).unwrap_err();
        assert!(matches!(err, ChartError::Precondition(_)));
    }

    /// Variant 16 stacks above 100 under raw, variant 17 has no late reading.
    fn chart_with_edge_bars(policy: AggregationPolicy) -> AggregatedChart {
        let ds = clean_dataset(VariantDataset::new(
            vec!["China".into(), "DE".into(), "UK".into()],
            vec![
                VariantRecord {
                    variant: 16,
                    readings: vec![
                        Reading { early: 70.0, late: 10.0 },
                        Reading { early: -1.0, late: 20.0 },
                        Reading { early: 60.0, late: 5.0 },
                    ],
                },
                VariantRecord {
                    variant: 17,
                    readings: vec![
                        Reading { early: 10.0, late: 0.0 },
                        Reading { early: 20.0, late: -1.0 },
                        Reading { early: 0.0, late: 0.0 },
                    ],
                },
            ],
        ));
        aggregate(&ds, policy)
    }

    #[test]
    fn every_layout_and_policy_writes_a_png_of_the_requested_size() {
        let dir = tempfile::TempDir::new().unwrap();
        for policy in AggregationPolicy::ALL {
            let chart = chart_with_edge_bars(policy);
            assert!(chart.late[1].is_empty());
            for layout in ChartLayout::ALL {
                let opts = RenderOptions {
                    layout,
                    width: 900,
                    height: 500,
                    title: None,
                };
                let path = dir.path().join(format!("{layout}_{}", policy.default_output()));
                render_png(&chart, &opts, &path).unwrap();
                let img = image::open(&path).unwrap();
                assert_eq!((img.width(), img.height()), (900, 500), "{}", path.display());
            }
        }
        assert!(chart_with_edge_bars(AggregationPolicy::Raw).max_total() > 100.0);
    }

    #[test]
    fn unwritable_output_is_fatal_io() {
        let dir = tempfile::TempDir::new().unwrap();
        let chart = chart_with_edge_bars(AggregationPolicy::Raw);
        let path = dir.path().join("missing").join("chart.png");
        let err = render_png(&chart, &RenderOptions::default(), &path).unwrap_err();
        assert!(matches!(err, ChartError::FatalIo { .. }));
    }

    #[test]
    fn layouts_split_or_not() {
        assert!(ChartLayout::SplitStacked.is_split());
        assert!(ChartLayout::SplitGrouped.is_split());
        assert!(!ChartLayout::Combined.is_split());
        assert_eq!(ChartLayout::default().to_string(), "split-stacked");
    }
}
