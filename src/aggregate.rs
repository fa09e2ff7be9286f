use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::clean::CleanDataset;
use crate::data::model::Timing;

// ---------------------------------------------------------------------------
// Aggregation policy
// ---------------------------------------------------------------------------

/// How per-instrument percentages of one variant/timing become stacked
/// segments.  Instruments at 0 never get a segment under any policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationPolicy {
    /// Segment = raw percentage; the stack is the raw sum.
    #[default]
    Raw,
    /// Segment = raw / k, k = number of nonzero instruments; the stack is
    /// the mean of the nonzero values.
    EqualWeight,
    /// Segment = raw / S * 100, S = sum of nonzero values; the stack is 100.
    Proportional,
}

impl AggregationPolicy {
    pub const ALL: [AggregationPolicy; 3] = [
        AggregationPolicy::Raw,
        AggregationPolicy::EqualWeight,
        AggregationPolicy::Proportional,
    ];

    /// Suffix appended to the chart title.
    pub fn title_suffix(self) -> &'static str {
        match self {
            AggregationPolicy::Raw => "",
            AggregationPolicy::EqualWeight => " (Averaged)",
            AggregationPolicy::Proportional => " (Normalized)",
        }
    }

    /// Default PNG name written for this policy.
    pub fn default_output(self) -> &'static str {
        match self {
            AggregationPolicy::Raw => "variant_distribution.png",
            AggregationPolicy::EqualWeight => "variant_distribution_averaged.png",
            AggregationPolicy::Proportional => "variant_distribution_normalized.png",
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationPolicy::Raw => write!(f, "raw"),
            AggregationPolicy::EqualWeight => write!(f, "equal-weight"),
            AggregationPolicy::Proportional => write!(f, "proportional"),
        }
    }
}

// ---------------------------------------------------------------------------
// Stacked bars
// ---------------------------------------------------------------------------

/// One drawn piece of a stacked bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    /// Position of the instrument in the declared list; selects its colour.
    pub instrument_idx: usize,
    pub instrument: String,
    pub height: f64,
}

/// Segments of one variant/timing, bottom to top.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedBar {
    pub variant: u32,
    pub timing: Timing,
    pub segments: Vec<Segment>,
}

impl StackedBar {
    pub fn total(&self) -> f64 {
        self.segments.iter().map(|s| s.height).sum()
    }

    /// True when every instrument was 0; such a bar is not drawn.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Height of one instrument's segment, 0 when it has none.
    pub fn height_of(&self, instrument_idx: usize) -> f64 {
        self.segments
            .iter()
            .find(|s| s.instrument_idx == instrument_idx)
            .map_or(0.0, |s| s.height)
    }

    /// `(bottom, top)` of every segment, in stacking order.
    pub fn spans(&self) -> Vec<(&Segment, f64, f64)> {
        let mut bottom = 0.0;
        self.segments
            .iter()
            .map(|s| {
                let span = (s, bottom, bottom + s.height);
                bottom += s.height;
                span
            })
            .collect()
    }
}

/// Everything the renderers need, for both timings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedChart {
    pub policy: AggregationPolicy,
    pub instruments: Vec<String>,
    pub variants: Vec<u32>,
    /// One bar per variant, in `variants` order.
    pub early: Vec<StackedBar>,
    pub late: Vec<StackedBar>,
}

impl AggregatedChart {
    pub fn bars(&self, timing: Timing) -> &[StackedBar] {
        match timing {
            Timing::Early => &self.early,
            Timing::Late => &self.late,
        }
    }

    /// Largest stack total over both timings.
    pub fn max_total(&self) -> f64 {
        self.early
            .iter()
            .chain(&self.late)
            .map(StackedBar::total)
            .fold(0.0, f64::max)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Segments for one variant/timing.  `values` are cleaned percentages in
/// declared instrument order; zeros are skipped.
pub fn stack_segments(
    instruments: &[String],
    values: &[f64],
    policy: AggregationPolicy,
) -> Vec<Segment> {
    let nonzero: Vec<(usize, f64)> = values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| *v > 0.0)
        .collect();
    if nonzero.is_empty() {
        return Vec::new();
    }

    let count = nonzero.len() as f64;
    let sum: f64 = nonzero.iter().map(|(_, v)| v).sum();

    nonzero
        .into_iter()
        .map(|(idx, raw)| {
            let height = match policy {
                AggregationPolicy::Raw => raw,
                AggregationPolicy::EqualWeight => raw / count,
                AggregationPolicy::Proportional => raw / sum * 100.0,
            };
            Segment {
                instrument_idx: idx,
                instrument: instruments[idx].clone(),
                height,
            }
        })
        .collect()
}

/// Apply `policy` to every variant and both timings.
pub fn aggregate(dataset: &CleanDataset, policy: AggregationPolicy) -> AggregatedChart {
    let bars_for = |timing: Timing| -> Vec<StackedBar> {
        dataset
            .records
            .iter()
            .map(|record| StackedBar {
                variant: record.variant,
                timing,
                segments: stack_segments(&dataset.instruments, &record.values(timing), policy),
            })
            .collect()
    };

    let chart = AggregatedChart {
        policy,
        instruments: dataset.instruments.clone(),
        variants: dataset.variants(),
        early: bars_for(Timing::Early),
        late: bars_for(Timing::Late),
    };

    for bar in chart.early.iter().chain(&chart.late) {
        if bar.is_empty() {
            log::debug!("Variant {} ({}): no measured values, bar omitted", bar.variant, bar.timing);
        } else if bar.total() > 100.0 + 1e-9 {
            log::warn!(
                "Variant {} ({}): stack totals {:.1}%, above the 100% axis",
                bar.variant,
                bar.timing,
                bar.total()
            );
        }
    }
    chart
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clean::clean_dataset;
    use crate::data::model::{Reading, VariantDataset, VariantRecord};

    const EPS: f64 = 1e-9;

    fn names() -> Vec<String> {
        vec!["China".into(), "DE".into(), "UK".into()]
    }

    /// Variant 16, early: China=40, DE not measured, UK=60.
    fn fixture() -> CleanDataset {
        clean_dataset(VariantDataset::new(
            names(),
            vec![VariantRecord {
                variant: 16,
                readings: vec![
                    Reading { early: 40.0, late: 0.0 },
                    Reading { early: -1.0, late: 0.0 },
                    Reading { early: 60.0, late: -1.0 },
                ],
            }],
        ))
    }

    fn heights(bar: &StackedBar) -> Vec<f64> {
        bar.segments.iter().map(|s| s.height).collect()
    }

    #[test]
    fn fixture_raw_policy() {
        let chart = aggregate(&fixture(), AggregationPolicy::Raw);
        let bar = &chart.early[0];
        assert_eq!(heights(bar), vec![40.0, 60.0]);
        assert!((bar.total() - 100.0).abs() < EPS);
        let order: Vec<&str> = bar.segments.iter().map(|s| s.instrument.as_str()).collect();
        assert_eq!(order, vec!["China", "UK"]);
    }

    #[test]
    fn fixture_equal_weight_policy() {
        let chart = aggregate(&fixture(), AggregationPolicy::EqualWeight);
        let bar = &chart.early[0];
        assert_eq!(heights(bar), vec![20.0, 30.0]);
        assert!((bar.total() - 50.0).abs() < EPS);
    }

    #[test]
    fn fixture_proportional_policy() {
        let chart = aggregate(&fixture(), AggregationPolicy::Proportional);
        let bar = &chart.early[0];
        let h = heights(bar);
        assert_eq!(h.len(), 2);
        assert!((h[0] - 40.0).abs() < EPS && (h[1] - 60.0).abs() < EPS);
        assert!((bar.total() - 100.0).abs() < EPS);
    }

    #[test]
    fn all_zero_bar_has_no_segments() {
        for policy in AggregationPolicy::ALL {
            let chart = aggregate(&fixture(), policy);
            let late = &chart.late[0];
            assert!(late.is_empty());
            assert_eq!(late.total(), 0.0);
        }
    }

    #[test]
    fn equal_weight_total_is_mean_of_nonzero() {
        let values = [10.0, 0.0, 25.0, 55.0];
        let names: Vec<String> = (0..4).map(|i| format!("I{i}")).collect();
        let segs = stack_segments(&names, &values, AggregationPolicy::EqualWeight);
        let total: f64 = segs.iter().map(|s| s.height).sum();
        assert!((total - 30.0).abs() < EPS);
        assert!(segs.iter().all(|s| (s.height - values[s.instrument_idx] / 3.0).abs() < EPS));
    }

    #[test]
    fn proportional_stacks_to_one_hundred() {
        let names: Vec<String> = (0..3).map(|i| format!("I{i}")).collect();
        for values in [[1.0, 2.0, 3.0], [0.0, 0.0, 0.3], [33.3, 33.3, 0.1], [80.0, 90.0, 100.0]] {
            let segs = stack_segments(&names, &values, AggregationPolicy::Proportional);
            let total: f64 = segs.iter().map(|s| s.height).sum();
            assert!((total - 100.0).abs() < 1e-9, "{values:?} -> {total}");
        }
    }

    #[test]
    fn segments_keep_declared_order_not_magnitude() {
        let segs = stack_segments(&names(), &[90.0, 5.0, 50.0], AggregationPolicy::Raw);
        let idx: Vec<usize> = segs.iter().map(|s| s.instrument_idx).collect();
        assert_eq!(idx, vec![0, 1, 2]);
    }

    #[test]
    fn raw_segments_sum_to_cleaned_inputs() {
        let ds = clean_dataset(VariantDataset::new(
            names(),
            (16..22)
                .map(|v| VariantRecord {
                    variant: v,
                    readings: (0..3)
                        .map(|i| Reading {
                            early: if (v + i) % 4 == 0 { -1.0 } else { (v * 3 + i) as f64 },
                            late: ((v + i * 7) % 11) as f64,
                        })
                        .collect(),
                })
                .collect(),
        ));
        let chart = aggregate(&ds, AggregationPolicy::Raw);
        let stacked: f64 = chart.early.iter().chain(&chart.late).map(StackedBar::total).sum();
        let inputs: f64 = ds
            .records
            .iter()
            .flat_map(|r| r.readings.iter())
            .map(|r| r.early + r.late)
            .sum();
        assert!((stacked - inputs).abs() < EPS);
    }

    #[test]
    fn spans_accumulate_bottom_to_top() {
        let chart = aggregate(&fixture(), AggregationPolicy::Raw);
        let spans: Vec<(usize, f64, f64)> = chart.early[0]
            .spans()
            .into_iter()
            .map(|(s, lo, hi)| (s.instrument_idx, lo, hi))
            .collect();
        assert_eq!(spans, vec![(0, 0.0, 40.0), (2, 40.0, 100.0)]);
        assert_eq!(chart.early[0].height_of(1), 0.0);
    }

    #[test]
    fn output_names_depend_on_policy() {
        assert_eq!(AggregationPolicy::Raw.default_output(), "variant_distribution.png");
        assert_eq!(
            AggregationPolicy::EqualWeight.default_output(),
            "variant_distribution_averaged.png"
        );
        assert_ne!(
            AggregationPolicy::Proportional.default_output(),
            AggregationPolicy::Raw.default_output()
        );
    }
}
