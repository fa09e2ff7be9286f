/// Pixel-space segment.
pub type PixelLine = ((i32, i32), (i32, i32));

/// `///` hatch lines clipped to the pixel rectangle `(x0, y0)`–`(x1, y1)`,
/// `(x0, y0)` being the top-left corner.
///
/// Every returned endpoint lies inside the rectangle.
pub fn hatch_lines(x0: i32, y0: i32, x1: i32, y1: i32, spacing: i32) -> Vec<PixelLine> {
    let (x0, x1) = (x0.min(x1), x0.max(x1));
    let (y0, y1) = (y0.min(y1), y0.max(y1));
    let spacing = spacing.max(1);

    // Pixel y grows downwards, so a rising "/" line satisfies x + y = c.
    let mut lines = Vec::new();
    let mut c = x0 + y0 + spacing;
    while c < x1 + y1 {
        let xa = x0.max(c - y1);
        let xb = x1.min(c - y0);
        if xa < xb {
            lines.push(((xa, c - xa), (xb, c - xb)));
        }
        c += spacing;
    }
    lines
}

/// Width of the band occupied by one variant's columns, in category units.
pub const GROUP_WIDTH: f64 = 0.8;

/// Width of a single stacked bar in the stacked layout.
pub const STACK_WIDTH: f64 = 0.5;

/// `(left, right)` of column `slot` out of `slots` side-by-side columns
/// centred on category `x`.
pub fn column_span(x: f64, slot: usize, slots: usize) -> (f64, f64) {
    let slots = slots.max(1);
    let width = GROUP_WIDTH / slots as f64;
    let left = x - GROUP_WIDTH / 2.0 + slot as f64 * width;
    (left, left + width)
}

/// Axis label of category `x` when it sits on a variant, empty otherwise.
pub fn category_label(x: f64, variants: &[u32]) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    variants
        .get(i as usize)
        .map(|v| crate::data::model::variant_label(*v))
        .unwrap_or_default()
}
