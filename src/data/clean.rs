use std::ops::Deref;

use super::model::{VariantDataset, NOT_MEASURED};

// ---------------------------------------------------------------------------
// Sentinel cleaning
// ---------------------------------------------------------------------------

/// Map the "not measured" sentinel to 0; every other value passes through.
pub fn clean_value(v: f64) -> f64 {
    if v == NOT_MEASURED {
        0.0
    } else {
        v
    }
}

/// A dataset in which no cell holds the sentinel.
///
/// Only [`clean_dataset`] builds one, so aggregation and rendering never see
/// an unmeasured cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanDataset(VariantDataset);

impl Deref for CleanDataset {
    type Target = VariantDataset;

    fn deref(&self) -> &VariantDataset {
        &self.0
    }
}

/// Clean every cell of a dataset.
pub fn clean_dataset(mut dataset: VariantDataset) -> CleanDataset {
    let mut replaced = 0usize;
    for record in &mut dataset.records {
        for reading in &mut record.readings {
            for cell in [&mut reading.early, &mut reading.late] {
                if *cell == NOT_MEASURED {
                    replaced += 1;
                }
                *cell = clean_value(*cell);
            }
        }
    }
    if replaced > 0 {
        log::debug!("Replaced {replaced} not-measured cells with 0");
    }
    CleanDataset(dataset)
}
