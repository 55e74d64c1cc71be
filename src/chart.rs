use std::fmt::Write as _;

const WIDTH: f64 = 900.0;
const LABEL_WIDTH: f64 = 260.0;
const BAR_HEIGHT: f64 = 28.0;
const BAR_GAP: f64 = 10.0;
const TOP: f64 = 60.0;
const BOTTOM: f64 = 50.0;
const RIGHT: f64 = 80.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

impl Bar {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Renders a horizontal bar chart as a standalone SVG document.
///
/// Bars are drawn top to bottom in the given order and scaled against the
/// largest value. `precision` controls the digits of the value annotations.
pub fn render_barh(title: &str, x_label: &str, bars: &[Bar], precision: usize) -> String {
    let plot_width = WIDTH - LABEL_WIDTH - RIGHT;
    let height = TOP + BOTTOM + bars.len() as f64 * (BAR_HEIGHT + BAR_GAP);
    let max = bars
        .iter()
        .map(|bar| bar.value)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    let scale = if max > 0.0 { plot_width / max } else { 0.0 };

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{height}" viewBox="0 0 {WIDTH} {height}" font-family="sans-serif">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="32" text-anchor="middle" font-size="18" font-weight="bold">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    );

    for (idx, bar) in bars.iter().enumerate() {
        let y = TOP + idx as f64 * (BAR_HEIGHT + BAR_GAP);
        let value = if bar.value.is_finite() { bar.value } else { 0.0 };
        let width = (value * scale).max(0.0);
        let text_y = y + BAR_HEIGHT / 2.0 + 5.0;

        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{text_y}" text-anchor="end" font-size="13">{}</text>"#,
            LABEL_WIDTH - 8.0,
            escape(&bar.label)
        );
        let _ = writeln!(
            svg,
            r##"<rect x="{LABEL_WIDTH}" y="{y}" width="{width:.1}" height="{BAR_HEIGHT}" fill="#4c72b0"/>"##
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{text_y}" font-size="12">{value:.precision$}</text>"#,
            LABEL_WIDTH + width + 6.0,
        );
    }

    let axis_y = height - BOTTOM + 10.0;
    let _ = writeln!(
        svg,
        r#"<line x1="{LABEL_WIDTH}" y1="{axis_y}" x2="{}" y2="{axis_y}" stroke="black"/>"#,
        LABEL_WIDTH + plot_width
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="13" font-weight="bold">{}</text>"#,
        LABEL_WIDTH + plot_width / 2.0,
        axis_y + 28.0,
        escape(x_label)
    );
    svg.push_str("</svg>\n");
    svg
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
