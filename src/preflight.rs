use std::path::{Path, PathBuf};

use plotters::style::IntoFont;

use crate::error::{ChartError, ChartResult};

/// What the environment must provide before any input is read.
#[derive(Debug, Clone, Default)]
pub struct Requirements {
    /// Directory the inputs are read from.
    pub data_dir: PathBuf,
    /// File the chart will be written to.
    pub output: Option<PathBuf>,
    /// Chart text needs a system font.
    pub font: bool,
    /// The interactive viewer needs a display.
    pub display: bool,
}

/// Fail fast, with a message naming the missing piece.
pub fn check(req: &Requirements) -> ChartResult<()> {
    if !req.data_dir.is_dir() {
        return Err(ChartError::missing(format!(
            "data directory {} does not exist",
            req.data_dir.display()
        )));
    }
    if let Some(output) = &req.output {
        check_output_dir(output)?;
    }
    if req.font {
        check_font()?;
    }
    if req.display && !display_available() {
        return Err(ChartError::Precondition(
            "--show needs a graphical display (DISPLAY / WAYLAND_DISPLAY is unset)".into(),
        ));
    }
    log::debug!("Startup checks passed");
    Ok(())
}

fn check_output_dir(output: &Path) -> ChartResult<()> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(ChartError::Precondition(format!(
            "output directory {} does not exist",
            parent.display()
        )));
    }
    if output.is_dir() {
        return Err(ChartError::Precondition(format!(
            "output path {} is a directory",
            output.display()
        )));
    }
    Ok(())
}

fn check_font() -> ChartResult<()> {
    ("sans-serif", 12)
        .into_font()
        .box_size("Variant 0123456789 %")
        .map(|_| ())
        .map_err(|e| {
            ChartError::Precondition(format!(
                "no usable sans-serif system font for chart text ({e}); install one, e.g. DejaVu Sans"
            ))
        })
}

#[cfg(all(unix, not(target_os = "macos")))]
fn display_available() -> bool {
    ["DISPLAY", "WAYLAND_DISPLAY"]
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn display_available() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_data_dir_is_missing_input() {
        let dir = TempDir::new().unwrap();
        let req = Requirements {
            data_dir: dir.path().join("absent"),
            ..Default::default()
        };
        assert!(matches!(check(&req), Err(ChartError::MissingInput(_))));
    }

    #[test]
    fn output_directory_must_exist() {
        let dir = TempDir::new().unwrap();
        let ok = Requirements {
            data_dir: dir.path().to_path_buf(),
            output: Some(dir.path().join("chart.png")),
            ..Default::default()
        };
        assert!(check(&ok).is_ok());

        let bad = Requirements {
            output: Some(dir.path().join("nope").join("chart.png")),
            ..ok.clone()
        };
        assert!(matches!(check(&bad), Err(ChartError::Precondition(_))));

        let is_dir = Requirements {
            output: Some(dir.path().to_path_buf()),
            ..ok
        };
        assert!(matches!(check(&is_dir), Err(ChartError::Precondition(_))));
    }

    #[test]
    fn bare_file_name_writes_to_working_directory() {
        assert!(check_output_dir(Path::new("variant_distribution.png")).is_ok());
    }
}
