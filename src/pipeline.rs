use std::path::PathBuf;

use crate::aggregate::{aggregate, AggregatedChart};
use crate::config::{DataSource, RunConfig};
use crate::data::clean::{clean_dataset, CleanDataset};
use crate::data::loader;
use crate::data::model::VariantDataset;
use crate::error::ChartResult;
use crate::render::render_png;

/// Loader step for either source.
pub fn load(cfg: &RunConfig, source: DataSource) -> ChartResult<VariantDataset> {
    match source {
        DataSource::Tables => {
            let files = match &cfg.variants {
                Some(variants) => loader::resolve_tables(&cfg.data_dir, variants)?,
                None => loader::discover_tables(&cfg.data_dir)?,
            };
            loader::load_tables(&files, &cfg.instruments)
        }
        DataSource::Workbook => loader::load_workbook(
            &cfg.workbook_path(),
            cfg.sheet.as_deref(),
            &cfg.instruments,
            cfg.variants.as_deref(),
        ),
    }
}

/// Load and clean one source.
pub fn load_clean(cfg: &RunConfig, source: DataSource) -> ChartResult<CleanDataset> {
    let dataset = load(cfg, source)?;
    log::debug!("Loaded: {} variants {:?}", dataset.len(), dataset.variants());
    Ok(clean_dataset(dataset))
}

/// What a finished render leaves behind for the viewer.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub dataset: CleanDataset,
    pub chart: AggregatedChart,
    pub output: PathBuf,
}

/// load → clean → aggregate → render, once.
pub fn run_render(cfg: &RunConfig) -> ChartResult<RenderOutcome> {
    let dataset = load_clean(cfg, cfg.source)?;

    let chart = aggregate(&dataset, cfg.policy);
    log::debug!(
        "Aggregated with the {} policy; tallest stack {:.1}%",
        cfg.policy,
        chart.max_total()
    );

    let output = cfg.output_path();
    render_png(&chart, &cfg.render_options(), &output)?;

    Ok(RenderOutcome {
        dataset,
        chart,
        output,
    })
}
