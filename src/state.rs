use std::path::{Path, PathBuf};

use crate::aggregate::{aggregate, AggregatedChart, AggregationPolicy};
use crate::data::clean::CleanDataset;
use crate::error::ChartResult;
use crate::render::{render_png, ChartLayout, RenderOptions};

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// The full viewer state, independent of rendering.
pub struct ViewerState {
    /// Cleaned input; re-aggregated whenever the policy changes.
    pub dataset: CleanDataset,

    /// Bars for the current policy (cached).
    pub chart: AggregatedChart,

    pub layout: ChartLayout,

    /// Size and title used when exporting.
    pub options: RenderOptions,

    /// Most recently written PNG, shown as a thumbnail.
    pub saved_png: Option<PathBuf>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl ViewerState {
    pub fn new(
        dataset: CleanDataset,
        chart: AggregatedChart,
        options: RenderOptions,
        saved_png: Option<PathBuf>,
    ) -> Self {
        Self {
            dataset,
            chart,
            layout: options.layout,
            options,
            saved_png,
            status_message: None,
        }
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.chart.policy
    }

    /// Switch policy and rebuild the bars.
    pub fn set_policy(&mut self, policy: AggregationPolicy) {
        if policy == self.chart.policy {
            return;
        }
        self.chart = aggregate(&self.dataset, policy);
        log::debug!("Viewer re-aggregated with the {policy} policy");
    }

    pub fn set_layout(&mut self, layout: ChartLayout) {
        self.layout = layout;
        self.options.layout = layout;
    }

    pub fn title(&self) -> String {
        self.options.title_for(self.chart.policy)
    }

    /// Write what the viewer currently shows to `path`.
    pub fn export_png(&mut self, path: &Path) -> ChartResult<()> {
        render_png(&self.chart, &self.options, path)?;
        self.saved_png = Some(path.to_path_buf());
        self.status_message = Some(format!("Saved {}", path.display()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clean::clean_dataset;
    use crate::data::model::{Reading, VariantDataset, VariantRecord};

    fn state() -> ViewerState {
        let dataset = clean_dataset(VariantDataset::new(
            vec!["A".into(), "B".into()],
            vec![VariantRecord {
                variant: 16,
                readings: vec![
                    Reading { early: 30.0, late: 10.0 },
                    Reading { early: 10.0, late: 0.0 },
                ],
            }],
        ));
        let chart = aggregate(&dataset, AggregationPolicy::Raw);
        ViewerState::new(dataset, chart, RenderOptions::default(), None)
    }

    #[test]
    fn policy_switch_reaggregates() {
        let mut s = state();
        assert_eq!(s.chart.early[0].total(), 40.0);
        s.set_policy(AggregationPolicy::EqualWeight);
        assert_eq!(s.policy(), AggregationPolicy::EqualWeight);
        assert_eq!(s.chart.early[0].total(), 20.0);
        assert!(s.title().ends_with("(Averaged)"));
    }

    #[test]
    fn layout_switch_follows_into_export_options() {
        let mut s = state();
        s.set_layout(ChartLayout::Combined);
        assert_eq!(s.options.layout, ChartLayout::Combined);
    }
}
