use std::io::{self, Write};

use serde::Serialize;

use crate::data::clean::CleanDataset;
use crate::data::model::Timing;
use crate::error::{ChartError, ChartResult};

/// One instrument/variant/timing cell seen from both sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellComparison {
    pub variant: u32,
    pub instrument: String,
    pub timing: Timing,
    pub workbook: f64,
    pub tables: f64,
    pub matches: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub tolerance: f64,
    pub cells: Vec<CellComparison>,
}

impl ComparisonReport {
    pub fn mismatches(&self) -> impl Iterator<Item = &CellComparison> {
        self.cells.iter().filter(|c| !c.matches)
    }

    /// Human-readable report, grouped by variant then instrument.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut current: Option<(u32, &str)> = None;
        for cell in &self.cells {
            if current.map(|(v, _)| v) != Some(cell.variant) {
                writeln!(out, "\nVariant {}:", cell.variant)?;
                current = None;
            }
            if current.map(|(_, i)| i) != Some(cell.instrument.as_str()) {
                writeln!(out, "{}:", cell.instrument)?;
                current = Some((cell.variant, cell.instrument.as_str()));
            }
            let flag = if cell.matches { "" } else { "  <-- mismatch" };
            writeln!(
                out,
                "  {}: workbook={}, tables={}{flag}",
                cell.timing, cell.workbook, cell.tables
            )?;
        }
        let n = self.mismatches().count();
        writeln!(out, "\n{n} of {} values differ", self.cells.len())?;
        Ok(())
    }
}

/// Pair every table cell with the workbook cell of the same variant,
/// instrument and timing.  Both datasets must declare the same instruments.
pub fn compare_datasets(
    workbook: &CleanDataset,
    tables: &CleanDataset,
    tolerance: f64,
) -> ChartResult<ComparisonReport> {
    if workbook.instruments != tables.instruments {
        return Err(ChartError::Precondition(
            "workbook and tables were loaded with different instrument lists".into(),
        ));
    }

    let mut cells = Vec::new();
    for table_record in &tables.records {
        let variant = table_record.variant;
        let wb_record = workbook.record(variant).ok_or_else(|| {
            ChartError::missing(format!("workbook has no columns for variant {variant}"))
        })?;

        for (idx, instrument) in tables.instruments.iter().enumerate() {
            for timing in Timing::ALL {
                let wb = wb_record.readings[idx].get(timing);
                let tb = table_record.readings[idx].get(timing);
                cells.push(CellComparison {
                    variant,
                    instrument: instrument.clone(),
                    timing,
                    workbook: wb,
                    tables: tb,
                    matches: (wb - tb).abs() <= tolerance,
                });
            }
        }
    }
    Ok(ComparisonReport { tolerance, cells })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clean::clean_dataset;
    use crate::data::model::{Reading, VariantDataset, VariantRecord};

    fn dataset(variants: &[u32], de_early: f64) -> CleanDataset {
        clean_dataset(VariantDataset::new(
            vec!["China".into(), "DE".into()],
            variants
                .iter()
                .map(|&v| VariantRecord {
                    variant: v,
                    readings: vec![
                        Reading { early: 40.0, late: 10.0 },
                        Reading { early: de_early, late: 5.0 },
                    ],
                })
                .collect(),
        ))
    }

    #[test]
    fn identical_sources_have_no_mismatches() {
        let report = compare_datasets(&dataset(&[16, 17], 3.0), &dataset(&[16, 17], 3.0), 1e-9).unwrap();
        assert_eq!(report.cells.len(), 2 * 2 * 2);
        assert_eq!(report.mismatches().count(), 0);
    }

    #[test]
    fn sentinel_and_zero_compare_equal_after_cleaning() {
        let report = compare_datasets(&dataset(&[16], -1.0), &dataset(&[16], 0.0), 1e-9).unwrap();
        assert_eq!(report.mismatches().count(), 0);
    }

    #[test]
    fn differing_cell_is_flagged_and_reported() {
        let report = compare_datasets(&dataset(&[16], 3.0), &dataset(&[16], 4.0), 1e-9).unwrap();
        let bad: Vec<_> = report.mismatches().collect();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].instrument, "DE");
        assert_eq!(bad[0].timing, Timing::Early);

        let mut text = Vec::new();
        report.write_text(&mut text).unwrap();
        let text = String::from_utf8(text).unwrap();
        assert!(text.contains("Variant 16:"));
        assert!(text.contains("Early: workbook=3, tables=4  <-- mismatch"));
        assert!(text.contains("1 of 8 values differ"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cells"][2]["timing"], "early");
    }

    #[test]
    fn variant_missing_from_workbook() {
        let err = compare_datasets(&dataset(&[16], 3.0), &dataset(&[16, 21], 3.0), 1e-9).unwrap_err();
        assert!(matches!(err, ChartError::MissingInput(ref m) if m.contains("21")));
    }
}
