mod aggregate;
mod app;
mod cli;
mod color;
mod compare;
mod config;
mod data;
mod error;
mod pipeline;
mod preflight;
mod render;
mod state;
mod ui;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use cli::{Cli, Command, CompareArgs, RenderArgs};
use config::DataSource;
use error::ChartError;
use preflight::Requirements;
use state::ViewerState;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::from(exit_status(&err))
        }
    }
}

/// Taxonomy errors keep their own status; anything else is 1.
fn exit_status(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<ChartError>()
        .map_or(1, |e| e.exit_code() as u8)
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Render(args) => render(&args),
        Command::Compare(args) => compare(&args),
    }
}

fn render(args: &RenderArgs) -> anyhow::Result<()> {
    let cfg = args.resolve()?;
    preflight::check(&Requirements {
        data_dir: cfg.data_dir.clone(),
        output: Some(cfg.output_path()),
        font: true,
        display: args.show,
    })?;

    let outcome = pipeline::run_render(&cfg)?;

    if args.show {
        let state = ViewerState::new(
            outcome.dataset,
            outcome.chart,
            cfg.render_options(),
            Some(outcome.output),
        );
        app::launch(state).context("interactive viewer")?;
    }
    Ok(())
}

fn compare(args: &CompareArgs) -> anyhow::Result<()> {
    let cfg = args.input.resolve()?;
    cfg.validate()?;
    preflight::check(&Requirements {
        data_dir: cfg.data_dir.clone(),
        ..Default::default()
    })?;

    let workbook = pipeline::load_clean(&cfg, DataSource::Workbook)?;
    let tables = pipeline::load_clean(&cfg, DataSource::Tables)?;
    let report = compare::compare_datasets(&workbook, &tables, args.tolerance)?;

    let mut out = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report).context("writing JSON report")?;
        writeln!(out)?;
    } else {
        report.write_text(&mut out).context("writing report")?;
    }

    let differing = report.mismatches().count();
    if differing > 0 {
        log::warn!("{differing} values differ between workbook and tables");
        if args.strict {
            anyhow::bail!("workbook and tables disagree in {differing} values");
        }
    } else {
        log::info!("Workbook and tables agree on all {} values", report.cells.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn chart_errors_keep_their_status() {
        let err = anyhow::Error::from(ChartError::malformed("t.csv", "bad"));
        assert_eq!(exit_status(&err), 3);
        let err = anyhow::Error::from(ChartError::io(Path::new("o.png"), "denied"))
            .context("rendering");
        assert_eq!(exit_status(&err), 4);
    }

    #[test]
    fn other_errors_exit_with_one() {
        assert_eq!(exit_status(&anyhow::anyhow!("values differ")), 1);
    }
}
