use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Legend, Plot, PlotUi};

use crate::aggregate::AggregatedChart;
use crate::color::instrument_colors;
use crate::data::model::Timing;
use crate::render::geometry::{category_label, column_span, STACK_WIDTH};
use crate::render::ChartLayout;
use crate::state::ViewerState;

/// Late segments are drawn in a faded tone of the instrument colour.
const LATE_FADE: f32 = 0.55;

/// A bar piece in plot coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarPiece {
    pub x: f64,
    pub bottom: f64,
    pub height: f64,
    pub width: f64,
}

impl BarPiece {
    fn to_bar(self, color: Color32) -> Bar {
        Bar::new(self.x, self.height)
            .width(self.width)
            .base_offset(self.bottom)
            .fill(color)
    }
}

/// Pieces of one timing panel, one list per instrument.
pub fn panel_pieces(chart: &AggregatedChart, timing: Timing, layout: ChartLayout) -> Vec<Vec<BarPiece>> {
    let slots = chart.instruments.len();
    let mut pieces = vec![Vec::new(); slots];

    for (i, bar) in chart.bars(timing).iter().enumerate() {
        let x = i as f64;
        match layout {
            ChartLayout::SplitGrouped => {
                for (slot, out) in pieces.iter_mut().enumerate() {
                    let height = bar.height_of(slot);
                    if height > 0.0 {
                        let (left, right) = column_span(x, slot, slots);
                        out.push(BarPiece {
                            x: (left + right) / 2.0,
                            bottom: 0.0,
                            height,
                            width: right - left,
                        });
                    }
                }
            }
            _ => {
                for (segment, bottom, top) in bar.spans() {
                    pieces[segment.instrument_idx].push(BarPiece {
                        x,
                        bottom,
                        height: top - bottom,
                        width: STACK_WIDTH,
                    });
                }
            }
        }
    }
    pieces
}

/// Early and late pieces of the single-panel layout: late sits on early.
pub fn combined_pieces(chart: &AggregatedChart) -> (Vec<Vec<BarPiece>>, Vec<Vec<BarPiece>>) {
    let slots = chart.instruments.len();
    let mut early = vec![Vec::new(); slots];
    let mut late = vec![Vec::new(); slots];

    for (i, (e, l)) in chart.early.iter().zip(&chart.late).enumerate() {
        for slot in 0..slots {
            let (left, right) = column_span(i as f64, slot, slots);
            let (x, width) = ((left + right) / 2.0, right - left);
            let base = e.height_of(slot);
            let top = l.height_of(slot);
            if base > 0.0 {
                early[slot].push(BarPiece { x, bottom: 0.0, height: base, width });
            }
            if top > 0.0 {
                late[slot].push(BarPiece { x, bottom: base, height: top, width });
            }
        }
    }
    (early, late)
}

// ---------------------------------------------------------------------------
// Chart (central panel)
// ---------------------------------------------------------------------------

/// Render the chart in the central panel.
pub fn variant_chart(ui: &mut Ui, state: &ViewerState) {
    let chart = &state.chart;
    if state.dataset.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No variants loaded");
        });
        return;
    }

    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(state.title());
    });

    let colors: Vec<Color32> = instrument_colors(chart.instruments.len())
        .into_iter()
        .map(Color32::from)
        .collect();

    if state.layout.is_split() {
        ui.columns(2, |cols| {
            for (col, timing) in cols.iter_mut().zip(Timing::ALL) {
                col.vertical_centered(|ui: &mut Ui| {
                    ui.strong(format!("{timing} Variants"));
                });
                let pieces = panel_pieces(chart, timing, state.layout);
                let first = timing == Timing::Early;
                let legend = carries_legend(state.layout, timing);
                base_plot(&format!("{}_plot", timing.column()), &chart.variants, first, legend)
                    .show(col, |plot_ui| {
                        add_series(plot_ui, chart, &pieces, &colors, timing);
                    });
            }
        });
    } else {
        let (early, late) = combined_pieces(chart);
        base_plot(
            "combined_plot",
            &chart.variants,
            true,
            carries_legend(state.layout, Timing::Early),
        ).show(ui, |plot_ui| {
            add_series(plot_ui, chart, &early, &colors, Timing::Early);
            add_series(plot_ui, chart, &late, &colors, Timing::Late);
        });
    }
}

/// One legend per window: both split panels share instruments and colours.
pub fn carries_legend(layout: ChartLayout, timing: Timing) -> bool {
    !layout.is_split() || timing == Timing::Early
}

fn base_plot(id: &str, variants: &[u32], y_label: bool, legend: bool) -> Plot<'static> {
    let variants = variants.to_vec();
    let mut plot = Plot::new(id)
        .x_axis_label("Variants")
        .include_y(0.0)
        .include_y(100.0)
        .include_x(-0.5)
        .include_x(variants.len() as f64 - 0.5)
        .allow_drag(true)
        .allow_zoom(true)
        .allow_scroll(false)
        .x_axis_formatter(move |mark, _range| category_label(mark.value, &variants));
    if legend {
        plot = plot.legend(Legend::default());
    }
    if y_label {
        plot.y_axis_label("Percentage (%)")
    } else {
        plot
    }
}

fn add_series(
    plot_ui: &mut PlotUi,
    chart: &AggregatedChart,
    pieces: &[Vec<BarPiece>],
    colors: &[Color32],
    timing: Timing,
) {
    for ((name, list), color) in chart.instruments.iter().zip(pieces).zip(colors) {
        let color = match timing {
            Timing::Early => *color,
            Timing::Late => color.gamma_multiply(LATE_FADE),
        };
        let bars: Vec<Bar> = list.iter().map(|p| p.to_bar(color)).collect();
        // Same name for both timings so the legend shows one entry per instrument.
        plot_ui.bar_chart(BarChart::new(bars).name(name).color(color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, AggregationPolicy};
    use crate::data::clean::clean_dataset;
    use crate::data::model::{Reading, VariantDataset, VariantRecord};

    fn chart() -> AggregatedChart {
        let ds = clean_dataset(VariantDataset::new(
            vec!["A".into(), "B".into()],
            vec![
                VariantRecord {
                    variant: 16,
                    readings: vec![
                        Reading { early: 30.0, late: 5.0 },
                        Reading { early: 20.0, late: 0.0 },
                    ],
                },
                VariantRecord {
                    variant: 17,
                    readings: vec![
                        Reading { early: 0.0, late: 10.0 },
                        Reading { early: 40.0, late: 15.0 },
                    ],
                },
            ],
        ));
        aggregate(&ds, AggregationPolicy::Raw)
    }

    #[test]
    fn split_layouts_show_a_single_legend() {
        for layout in [ChartLayout::SplitStacked, ChartLayout::SplitGrouped] {
            assert!(carries_legend(layout, Timing::Early));
            assert!(!carries_legend(layout, Timing::Late));
        }
        assert!(carries_legend(ChartLayout::Combined, Timing::Early));
    }

    #[test]
    fn stacked_pieces_sit_on_each_other() {
        let pieces = panel_pieces(&chart(), Timing::Early, ChartLayout::SplitStacked);
        assert_eq!(pieces[0], vec![BarPiece { x: 0.0, bottom: 0.0, height: 30.0, width: STACK_WIDTH }]);
        assert_eq!(
            pieces[1],
            vec![
                BarPiece { x: 0.0, bottom: 30.0, height: 20.0, width: STACK_WIDTH },
                BarPiece { x: 1.0, bottom: 0.0, height: 40.0, width: STACK_WIDTH },
            ]
        );
    }

    #[test]
    fn grouped_pieces_start_at_zero_and_skip_empty() {
        let pieces = panel_pieces(&chart(), Timing::Late, ChartLayout::SplitGrouped);
        assert_eq!(pieces[0].len(), 2);
        assert_eq!(pieces[1].len(), 1);
        assert!(pieces.iter().flatten().all(|p| p.bottom == 0.0));
        assert!(pieces[0][0].x < 0.0 && pieces[1][0].x > 1.0);
    }

    #[test]
    fn combined_late_rests_on_early() {
        let (early, late) = combined_pieces(&chart());
        assert_eq!(early[1][1].height, 40.0);
        let b17 = late[1].iter().find(|p| p.x > 0.5).unwrap();
        assert_eq!((b17.bottom, b17.height), (40.0, 15.0));
        // A with no early reading for 17: late starts at the axis
        let a17 = late[0].iter().find(|p| p.x > 0.5).unwrap();
        assert_eq!(a17.bottom, 0.0);
    }
}
