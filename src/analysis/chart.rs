//! Horizontal bar charts rendered as standalone SVG.

const WIDTH: f64 = 720.0;
const LABEL_WIDTH: f64 = 180.0;
const VALUE_WIDTH: f64 = 80.0;
const BAR_HEIGHT: f64 = 22.0;
const GAP: f64 = 6.0;
const TITLE_HEIGHT: f64 = 40.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub axis: String,
    pub bars: Vec<(String, f64)>,
}

impl BarChart {
    pub fn new(title: &str, axis: &str) -> Self {
        Self {
            title: title.to_string(),
            axis: axis.to_string(),
            bars: Vec::new(),
        }
    }

    pub fn push(&mut self, label: String, value: f64) {
        self.bars.push((label, value));
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

pub fn bar_chart_svg(chart: &BarChart) -> String {
    let plot_width = WIDTH - LABEL_WIDTH - VALUE_WIDTH;
    let max = chart
        .bars
        .iter()
        .map(|(_, v)| *v)
        .fold(0.0_f64, f64::max);
    let height = TITLE_HEIGHT + chart.bars.len() as f64 * (BAR_HEIGHT + GAP) + GAP;

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" \
         viewBox=\"0 0 {w} {h}\" font-family=\"sans-serif\" font-size=\"12\">\n",
        w = WIDTH,
        h = height
    );
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"24\" font-size=\"15\" font-weight=\"bold\">{} ({})</text>\n",
        GAP,
        escape(&chart.title),
        escape(&chart.axis)
    ));

    for (i, (label, value)) in chart.bars.iter().enumerate() {
        let y = TITLE_HEIGHT + i as f64 * (BAR_HEIGHT + GAP);
        let length = if max > 0.0 { value.max(0.0) / max * plot_width } else { 0.0 };
        let text_y = y + BAR_HEIGHT * 0.7;

        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\">{}</text>\n",
            LABEL_WIDTH - GAP,
            text_y,
            escape(label)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"#e10600\"/>\n",
            LABEL_WIDTH, y, length, BAR_HEIGHT
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\">{}</text>\n",
            LABEL_WIDTH + length + GAP,
            text_y,
            format_value(*value)
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.3}", value)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
