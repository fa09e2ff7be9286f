use std::error::Error;

use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontStyle;

use super::geometry::{category_label, column_span, hatch_lines, STACK_WIDTH};
use super::{ChartLayout, RenderOptions};
use crate::aggregate::{AggregatedChart, StackedBar};
use crate::color::{instrument_colors, Rgb};
use crate::data::model::Timing;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type Panel<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;
type DrawResult = Result<(), Box<dyn Error>>;

const FONT: &str = "sans-serif";
const LEGEND_HEIGHT: i32 = 70;
const SWATCH: i32 = 18;
const HATCH_SPACING: i32 = 7;
const BAR_ALPHA: f64 = 0.8;
const Y_MAX: f64 = 100.0;

/// Draw the whole figure into an RGB buffer of `opts.width * opts.height * 3` bytes.
pub fn draw_chart(chart: &AggregatedChart, opts: &RenderOptions, buf: &mut [u8]) -> DrawResult {
    let root = BitMapBackend::with_buffer(buf, (opts.width, opts.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let title = opts.title_for(chart.policy);
    let body = root.titled(&title, (FONT, 28).into_font().style(FontStyle::Bold))?;
    let body_height = body.dim_in_pixel().1 as i32;
    let (plot_area, legend_area) = body.split_vertically(body_height - LEGEND_HEIGHT);

    let colors = instrument_colors(chart.instruments.len());

    if opts.layout.is_split() {
        let panels = plot_area.split_evenly((1, 2));
        for (idx, (panel, timing)) in panels.iter().zip(Timing::ALL).enumerate() {
            draw_split_panel(&root, panel, chart, timing, opts.layout, &colors, idx == 0)?;
        }
    } else {
        draw_combined_panel(&root, &plot_area, chart, &colors)?;
    }

    draw_legend(&legend_area, chart, &colors)?;
    root.present()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

fn build_panel<'a, 'b>(
    area: &'a Area<'b>,
    caption: Option<String>,
    variants: &[u32],
    y_desc: bool,
) -> Result<Panel<'a, 'b>, Box<dyn Error>> {
    let n = variants.len().max(1);
    let mut builder = ChartBuilder::on(area);
    builder
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(if y_desc { 70 } else { 45 });
    if let Some(caption) = caption {
        builder.caption(caption, (FONT, 22).into_font().style(FontStyle::Bold));
    }
    let mut panel = builder.build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..Y_MAX)?;

    panel
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| category_label(*x, variants))
        .y_labels(11)
        .y_label_formatter(&|y| format!("{}", y.round() as i64))
        .max_light_lines(0)
        .bold_line_style(BLACK.mix(0.12).stroke_width(1))
        .x_desc("Variants")
        .y_desc(if y_desc { "Percentage (%)" } else { "" })
        .label_style((FONT, 15))
        .axis_desc_style((FONT, 17))
        .draw()?;

    Ok(panel)
}

fn draw_split_panel(
    root: &Area<'_>,
    area: &Area<'_>,
    chart: &AggregatedChart,
    timing: Timing,
    layout: ChartLayout,
    colors: &[Rgb],
    y_desc: bool,
) -> DrawResult {
    let mut panel = build_panel(area, Some(format!("{timing} Variants")), &chart.variants, y_desc)?;
    let hatched = timing == Timing::Late;

    for (i, bar) in chart.bars(timing).iter().enumerate() {
        let x = i as f64;
        match layout {
            ChartLayout::SplitGrouped => {
                let slots = chart.instruments.len();
                for (slot, color) in colors.iter().enumerate() {
                    let (left, right) = column_span(x, slot, slots);
                    let height = bar.height_of(slot);
                    draw_box(root, &mut panel, (left, 0.0), (right, height), *color, hatched)?;
                }
            }
            _ => draw_stack(root, &mut panel, bar, x, colors, hatched)?,
        }
    }
    Ok(())
}

fn draw_stack(
    root: &Area<'_>,
    panel: &mut Panel<'_, '_>,
    bar: &StackedBar,
    x: f64,
    colors: &[Rgb],
    hatched: bool,
) -> DrawResult {
    let (left, right) = (x - STACK_WIDTH / 2.0, x + STACK_WIDTH / 2.0);
    for (segment, bottom, top) in bar.spans() {
        let color = colors[segment.instrument_idx];
        draw_box(root, panel, (left, bottom), (right, top), color, hatched)?;
    }
    Ok(())
}

/// Single panel; per variant one column per instrument, early at the bottom
/// and late (hatched) on top of it.
fn draw_combined_panel(
    root: &Area<'_>,
    area: &Area<'_>,
    chart: &AggregatedChart,
    colors: &[Rgb],
) -> DrawResult {
    let mut panel = build_panel(area, None, &chart.variants, true)?;
    let slots = chart.instruments.len();

    for (i, (early, late)) in chart.early.iter().zip(&chart.late).enumerate() {
        for (slot, color) in colors.iter().enumerate() {
            let (left, right) = column_span(i as f64, slot, slots);
            let bottom = early.height_of(slot);
            let top = bottom + late.height_of(slot);
            draw_box(root, &mut panel, (left, 0.0), (right, bottom), *color, false)?;
            draw_box(root, &mut panel, (left, bottom), (right, top), *color, true)?;
        }
    }
    Ok(())
}

/// Filled bar piece with a white edge, clipped to the 0–100 axis.
fn draw_box(
    root: &Area<'_>,
    panel: &mut Panel<'_, '_>,
    lo: (f64, f64),
    hi: (f64, f64),
    color: Rgb,
    hatched: bool,
) -> DrawResult {
    let top = hi.1.min(Y_MAX);
    if top <= lo.1 {
        return Ok(());
    }
    let corners = [(lo.0, lo.1), (hi.0, top)];
    let fill = RGBColor::from(color).mix(BAR_ALPHA).filled();
    panel.draw_series(std::iter::once(Rectangle::new(corners, fill)))?;
    panel.draw_series(std::iter::once(Rectangle::new(corners, WHITE.stroke_width(1))))?;

    if hatched {
        let (x0, y0) = panel.backend_coord(&(lo.0, top));
        let (x1, y1) = panel.backend_coord(&(hi.0, lo.1));
        for (a, b) in hatch_lines(x0, y0, x1, y1, HATCH_SPACING) {
            root.draw(&PathElement::new(vec![a, b], BLACK.mix(0.55).stroke_width(1)))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Legend
// ---------------------------------------------------------------------------

/// One row centred in `area`: an entry per instrument, then the timing key.
fn draw_legend(area: &Area<'_>, chart: &AggregatedChart, colors: &[Rgb]) -> DrawResult {
    let style = TextStyle::from((FONT, 17).into_font()).color(&BLACK);
    let key = Rgb(0x9a, 0x9a, 0x9a);

    let mut entries: Vec<(String, Rgb, bool)> = chart
        .instruments
        .iter()
        .zip(colors)
        .map(|(name, c)| (name.clone(), *c, false))
        .collect();
    entries.push((Timing::Early.to_string(), key, false));
    entries.push((Timing::Late.to_string(), key, true));

    let gap = 28;
    let mut widths = Vec::with_capacity(entries.len());
    for (label, _, _) in &entries {
        let (w, _) = area.estimate_text_size(label, &style)?;
        widths.push(SWATCH + 8 + w as i32);
    }
    let total: i32 = widths.iter().sum::<i32>() + gap * (entries.len() as i32 - 1);

    let (area_w, area_h) = area.dim_in_pixel();
    let y = (area_h as i32 - SWATCH) / 2;
    let mut x = ((area_w as i32 - total) / 2).max(4);

    area.draw(&Rectangle::new(
        [(x - 12, y - 10), (x + total + 12, y + SWATCH + 10)],
        BLACK.mix(0.3).stroke_width(1),
    ))?;

    for ((label, color, hatched), width) in entries.iter().zip(widths) {
        let corners = [(x, y), (x + SWATCH, y + SWATCH)];
        area.draw(&Rectangle::new(corners, RGBColor::from(*color).mix(BAR_ALPHA).filled()))?;
        if *hatched {
            for (a, b) in hatch_lines(x, y, x + SWATCH, y + SWATCH, 5) {
                area.draw(&PathElement::new(vec![a, b], BLACK.mix(0.55).stroke_width(1)))?;
            }
        }
        area.draw(&Text::new(label.clone(), (x + SWATCH + 8, y), style.clone()))?;
        x += width + gap;
    }
    Ok(())
}
