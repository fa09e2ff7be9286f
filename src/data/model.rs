use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Cell value meaning "not measured".
pub const NOT_MEASURED: f64 = -1.0;

/// Instruments compared by default, in stacking order.
pub const DEFAULT_INSTRUMENTS: [&str; 3] = ["China MGISEQ-2000", "DE MiniSeq", "UK HiSeq 2500"];

// ---------------------------------------------------------------------------
// Timing – early or late collection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Timing {
    Early,
    Late,
}

impl Timing {
    pub const ALL: [Timing; 2] = [Timing::Early, Timing::Late];

    /// Column label used by the variant tables.
    pub fn column(self) -> &'static str {
        match self {
            Timing::Early => "early",
            Timing::Late => "late",
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timing::Early => write!(f, "Early"),
            Timing::Late => write!(f, "Late"),
        }
    }
}

impl FromStr for Timing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "early" => Ok(Timing::Early),
            "late" => Ok(Timing::Late),
            other => Err(format!("unknown timing '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// VariantRecord – one variant, every instrument
// ---------------------------------------------------------------------------

/// Early/late percentages of one instrument for one variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub early: f64,
    pub late: f64,
}

impl Reading {
    pub fn get(&self, timing: Timing) -> f64 {
        match timing {
            Timing::Early => self.early,
            Timing::Late => self.late,
        }
    }
}

/// One variant with a reading per declared instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    /// Variant identifier, e.g. 16.
    pub variant: u32,
    /// Readings in declared instrument order.
    pub readings: Vec<Reading>,
}

impl VariantRecord {
    /// Values for one timing, in declared instrument order.
    pub fn values(&self, timing: Timing) -> Vec<f64> {
        self.readings.iter().map(|r| r.get(timing)).collect()
    }
}

// ---------------------------------------------------------------------------
// InstrumentSeries – one instrument across all variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSeries {
    pub instrument: String,
    pub timing: Timing,
    /// One value per variant, in dataset order.
    pub values: Vec<f64>,
}

// ---------------------------------------------------------------------------
// VariantDataset – the complete loaded data
// ---------------------------------------------------------------------------

/// Everything the loader produced, in source-defined variant order.
/// Values may still contain [`NOT_MEASURED`].
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDataset {
    pub instruments: Vec<String>,
    pub records: Vec<VariantRecord>,
}

impl VariantDataset {
    pub fn new(instruments: Vec<String>, records: Vec<VariantRecord>) -> Self {
        debug_assert!(records.iter().all(|r| r.readings.len() == instruments.len()));
        VariantDataset {
            instruments,
            records,
        }
    }

    pub fn variants(&self) -> Vec<u32> {
        self.records.iter().map(|r| r.variant).collect()
    }

    pub fn record(&self, variant: u32) -> Option<&VariantRecord> {
        self.records.iter().find(|r| r.variant == variant)
    }

    /// One series per instrument for the given timing, in declared order.
    pub fn series(&self, timing: Timing) -> Vec<InstrumentSeries> {
        self.instruments
            .iter()
            .enumerate()
            .map(|(idx, name)| InstrumentSeries {
                instrument: name.clone(),
                timing,
                values: self
                    .records
                    .iter()
                    .map(|r| r.readings[idx].get(timing))
                    .collect(),
            })
            .collect()
    }

    /// Number of variants.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Axis label for a variant.
pub fn variant_label(variant: u32) -> String {
    format!("Variant {variant}")
}
