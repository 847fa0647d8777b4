//! SVG chart rendering: line charts, scatter plots and correlation heatmaps.

use crate::domain::derived::correlation::CorrelationMatrix;
use crate::domain::error::StockError;
use crate::domain::series::TimeSeries;
use crate::domain::table::Table;
use crate::ports::chart_port::ChartPort;
use log::info;
use std::fs;
use std::path::Path;

const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 400.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 150.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 40.0;
const HEATMAP_CELL: f64 = 60.0;

const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

#[derive(Debug, Default)]
pub struct SvgChartAdapter;

impl SvgChartAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn write_svg(output_path: &Path, svg: &str) -> Result<(), StockError> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, svg)?;
    info!("chart written to {}", output_path.display());
    Ok(())
}

impl ChartPort for SvgChartAdapter {
    fn line_chart(
        &self,
        table: &Table,
        columns: &[&str],
        title: &str,
        output_path: &Path,
    ) -> Result<(), StockError> {
        let svg = render_line_chart(table, columns, title)?;
        write_svg(output_path, &svg)
    }

    fn scatter_chart(
        &self,
        x: &TimeSeries,
        y: &TimeSeries,
        title: &str,
        output_path: &Path,
    ) -> Result<(), StockError> {
        write_svg(output_path, &render_scatter_chart(x, y, title))
    }

    fn heatmap(
        &self,
        matrix: &CorrelationMatrix,
        title: &str,
        output_path: &Path,
    ) -> Result<(), StockError> {
        write_svg(output_path, &render_heatmap(matrix, title))
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn svg_open(width: f64, height: f64, title: &str) -> String {
    let mut svg = format!(
        r##"<svg width="{w}" height="{h}" viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg">"##,
        w = width,
        h = height
    );
    svg.push_str("\n  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"22\" text-anchor=\"middle\" font-size=\"16\" fill=\"#333\">{}</text>\n",
        width / 2.0,
        escape(title)
    ));
    svg
}

/// (min, max) with a non-zero span.
fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min > max {
        return None;
    }
    if min == max {
        return Some((min - 1.0, max + 1.0));
    }
    Some((min, max))
}

fn axes(svg: &mut String) {
    svg.push_str(&format!(
        "  <line x1=\"{l}\" y1=\"{t}\" x2=\"{l}\" y2=\"{b}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = CHART_HEIGHT - MARGIN_BOTTOM
    ));
    svg.push_str(&format!(
        "  <line x1=\"{l}\" y1=\"{b}\" x2=\"{r}\" y2=\"{b}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        l = MARGIN_LEFT,
        b = CHART_HEIGHT - MARGIN_BOTTOM,
        r = CHART_WIDTH - MARGIN_RIGHT
    ));
}

fn y_labels(svg: &mut String, min: f64, max: f64) {
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-size=\"10\" fill=\"#666\">{:.2}</text>\n",
        MARGIN_LEFT - 5.0,
        MARGIN_TOP + 4.0,
        max
    ));
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-size=\"10\" fill=\"#666\">{:.2}</text>\n",
        MARGIN_LEFT - 5.0,
        CHART_HEIGHT - MARGIN_BOTTOM,
        min
    ));
}

fn no_data(svg: &mut String) {
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"12\" fill=\"#999\">No data</text>\n",
        CHART_WIDTH / 2.0,
        CHART_HEIGHT / 2.0
    ));
    svg.push_str("</svg>\n");
}

pub fn render_line_chart(table: &Table, columns: &[&str], title: &str) -> Result<String, StockError> {
    let series = columns
        .iter()
        .map(|&name| {
            table
                .column(name)
                .map(|values| (name, values))
                .ok_or_else(|| StockError::UnknownColumn(name.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut svg = svg_open(CHART_WIDTH, CHART_HEIGHT, title);
    let Some((min, max)) = bounds(series.iter().flat_map(|(_, v)| v.iter().flatten().copied()))
    else {
        no_data(&mut svg);
        return Ok(svg);
    };

    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let rows = table.len();
    let x_scale =
        |i: usize| -> f64 { MARGIN_LEFT + (i as f64 / (rows.saturating_sub(1)).max(1) as f64) * plot_width };
    let y_scale = |v: f64| -> f64 { MARGIN_TOP + plot_height - ((v - min) / (max - min)) * plot_height };

    axes(&mut svg);
    y_labels(&mut svg, min, max);

    let dates = table.dates();
    if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            MARGIN_LEFT,
            CHART_HEIGHT - MARGIN_BOTTOM + 15.0,
            first
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            CHART_WIDTH - MARGIN_RIGHT,
            CHART_HEIGHT - MARGIN_BOTTOM + 15.0,
            last
        ));
    }

    for (k, (name, values)) in series.iter().enumerate() {
        let color = PALETTE[k % PALETTE.len()];

        // a gap starts a new subpath
        let mut path_data = String::new();
        let mut pen_down = false;
        for (i, value) in values.iter().enumerate() {
            match value.filter(|v| v.is_finite()) {
                Some(v) => {
                    let cmd = if pen_down { 'L' } else { 'M' };
                    if !path_data.is_empty() {
                        path_data.push(' ');
                    }
                    path_data.push_str(&format!("{} {:.1} {:.1}", cmd, x_scale(i), y_scale(v)));
                    pen_down = true;
                }
                None => pen_down = false,
            }
        }

        if !path_data.is_empty() {
            svg.push_str(&format!(
                "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\"/>\n",
                path_data, color
            ));
        }

        let legend_y = MARGIN_TOP + 10.0 + k as f64 * 18.0;
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"12\" height=\"3\" fill=\"{}\"/>\n",
            CHART_WIDTH - MARGIN_RIGHT + 10.0,
            legend_y - 4.0,
            color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"11\" fill=\"#333\">{}</text>\n",
            CHART_WIDTH - MARGIN_RIGHT + 28.0,
            legend_y,
            escape(name)
        ));
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

pub fn render_scatter_chart(x: &TimeSeries, y: &TimeSeries, title: &str) -> String {
    let points: Vec<(f64, f64)> = x
        .points()
        .iter()
        .filter_map(|p| Some((p.value?, y.get(p.date)?)))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect();

    let mut svg = svg_open(CHART_WIDTH, CHART_HEIGHT, title);
    let (Some((x_min, x_max)), Some((y_min, y_max))) = (
        bounds(points.iter().map(|p| p.0)),
        bounds(points.iter().map(|p| p.1)),
    ) else {
        no_data(&mut svg);
        return svg;
    };

    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    axes(&mut svg);
    y_labels(&mut svg, y_min, y_max);
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"{}\" font-size=\"10\" fill=\"#666\">{:.2}</text>\n",
        MARGIN_LEFT,
        CHART_HEIGHT - MARGIN_BOTTOM + 15.0,
        x_min
    ));
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-size=\"10\" fill=\"#666\">{:.2}</text>\n",
        CHART_WIDTH - MARGIN_RIGHT,
        CHART_HEIGHT - MARGIN_BOTTOM + 15.0,
        x_max
    ));
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"11\" fill=\"#333\">{}</text>\n",
        MARGIN_LEFT + plot_width / 2.0,
        CHART_HEIGHT - 8.0,
        escape(x.name())
    ));
    svg.push_str(&format!(
        "  <text x=\"15\" y=\"{}\" font-size=\"11\" fill=\"#333\" transform=\"rotate(-90 15 {})\">{}</text>\n",
        MARGIN_TOP + plot_height / 2.0,
        MARGIN_TOP + plot_height / 2.0,
        escape(y.name())
    ));

    for (a, b) in &points {
        let cx = MARGIN_LEFT + (a - x_min) / (x_max - x_min) * plot_width;
        let cy = MARGIN_TOP + plot_height - (b - y_min) / (y_max - y_min) * plot_height;
        svg.push_str(&format!(
            "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"2.5\" fill=\"{}\" fill-opacity=\"0.6\"/>\n",
            cx, cy, PALETTE[0]
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

/// Diverging blue-white-red fill for a coefficient in [-1, 1].
fn heat_color(r: Option<f64>) -> String {
    let Some(r) = r.filter(|v| v.is_finite()) else {
        return "#dddddd".to_string();
    };
    let r = r.clamp(-1.0, 1.0);
    let (target, t) = if r >= 0.0 {
        ((178.0, 24.0, 43.0), r)
    } else {
        ((33.0, 102.0, 172.0), -r)
    };
    let mix = |c: f64| (255.0 + (c - 255.0) * t).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(target.0), mix(target.1), mix(target.2))
}

pub fn render_heatmap(matrix: &CorrelationMatrix, title: &str) -> String {
    let n = matrix.len();
    let label_space = 100.0;
    let width = (label_space + n as f64 * HEATMAP_CELL + 20.0).max(300.0);
    let height = label_space + n as f64 * HEATMAP_CELL + 20.0;

    let mut svg = svg_open(width, height, title);
    if matrix.is_empty() {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"12\" fill=\"#999\">No data</text>\n",
            width / 2.0,
            height / 2.0
        ));
        svg.push_str("</svg>\n");
        return svg;
    }

    for (i, name) in matrix.names().iter().enumerate() {
        let offset = label_space + i as f64 * HEATMAP_CELL + HEATMAP_CELL / 2.0;
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-size=\"11\" fill=\"#333\">{}</text>\n",
            label_space - 6.0,
            offset + 4.0,
            escape(name)
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"11\" fill=\"#333\">{}</text>\n",
            offset,
            label_space - 8.0,
            escape(name)
        ));
    }

    for (i, (_, row)) in matrix.rows().enumerate() {
        for (j, value) in row.iter().enumerate() {
            let x = label_space + j as f64 * HEATMAP_CELL;
            let y = label_space + i as f64 * HEATMAP_CELL;
            svg.push_str(&format!(
                "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" stroke=\"white\"/>\n",
                x,
                y,
                HEATMAP_CELL,
                HEATMAP_CELL,
                heat_color(*value)
            ));
            let label = match value {
                Some(v) => format!("{:.2}", v),
                None => "n/a".to_string(),
            };
            svg.push_str(&format!(
                "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"11\" fill=\"#222\">{}</text>\n",
                x + HEATMAP_CELL / 2.0,
                y + HEATMAP_CELL / 2.0 + 4.0,
                label
            ));
        }
    }

    svg.push_str("</svg>\n");
    svg
}
