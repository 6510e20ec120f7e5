//! Horizontal bar charts
//!
//! Ranked counts are cut into pages by the [`crate::bucket`] planner and each
//! page is handed to a [`ChartSink`]. The bundled [`SvgChartWriter`] writes one
//! standalone SVG file per page.

use crate::bucket::ChartLimit;
use crate::error::UsageError;
use crate::models::UsageCounts;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_COLOR: &str = "2792ea";

const ROW_HEIGHT: usize = 22;
const BAR_AREA: usize = 420;
const CHAR_WIDTH: usize = 7;
const MARGIN: usize = 16;
const TITLE_HEIGHT: usize = 36;
const AXIS_HEIGHT: usize = 44;
const TICKS: usize = 5;

/// One finished page of a ranked series.
#[derive(Debug, Clone, Copy)]
pub struct ChartPage<'a> {
    pub group: Option<&'a str>,
    pub index: usize,
    pub rows: &'a [(String, usize)],
}

/// Receives finished pages; knows nothing about ranking or paging.
pub trait ChartSink {
    fn render(&mut self, page: &ChartPage<'_>) -> Result<(), UsageError>;
}

/// Plans and renders every series of `counts`. Returns the number of pages rendered.
pub fn render_charts(counts: &UsageCounts, limit: ChartLimit, sink: &mut dyn ChartSink) -> Result<usize, UsageError> {
    let mut rendered = 0;
    for series in counts.series() {
        let plan = limit.plan(series.entries.len());
        tracing::debug!(
            group = series.group.as_deref().unwrap_or("-"),
            rows = series.entries.len(),
            pages = plan.len(),
            "Planned chart pages"
        );

        for (index, rows) in plan.pages(&series.entries).enumerate() {
            if rows.is_empty() {
                continue;
            }
            sink.render(&ChartPage {
                group: series.group.as_deref(),
                index,
                rows,
            })?;
            rendered += 1;
        }
    }
    Ok(rendered)
}

#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub title: String,
    pub x_label: String,
    /// Six hex digits, without the leading `#`.
    pub color: String,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            title: String::new(),
            x_label: String::new(),
            color: DEFAULT_COLOR.to_string(),
        }
    }
}

pub struct SvgChartWriter {
    output_dir: PathBuf,
    style: ChartStyle,
    written: Vec<PathBuf>,
}

impl SvgChartWriter {
    pub fn new(output_dir: impl Into<PathBuf>, style: ChartStyle) -> Self {
        Self {
            output_dir: output_dir.into(),
            style,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// `{index}_{last label}_{first label}.svg`, prefixed by the group, slashes removed.
    ///
    /// Labels are taken in rank order, the same order the bars are drawn in.
    pub fn file_name(page: &ChartPage<'_>) -> String {
        let first = page.rows.first().map(|(label, _)| label.as_str()).unwrap_or_default();
        let last = page.rows.last().map(|(label, _)| label.as_str()).unwrap_or_default();
        let name = match page.group {
            Some(group) => format!("{}_{}_{}_{}.svg", group, page.index, last, first),
            None => format!("{}_{}_{}.svg", page.index, last, first),
        };
        name.replace('/', "")
    }

    pub fn to_svg(&self, page: &ChartPage<'_>) -> String {
        let label_width = page
            .rows
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0)
            * CHAR_WIDTH
            + MARGIN;
        let max_value = page.rows.iter().map(|(_, value)| *value).max().unwrap_or(0).max(1);
        let step = tick_step(max_value);
        let axis_max = step * ((max_value + step - 1) / step);

        let width = label_width + BAR_AREA + 2 * MARGIN;
        let plot_top = TITLE_HEIGHT;
        let plot_height = page.rows.len() * ROW_HEIGHT;
        let height = plot_top + plot_height + AXIS_HEIGHT;
        let x0 = label_width + MARGIN;
        let scale = |value: usize| value as f64 * BAR_AREA as f64 / axis_max as f64;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
            w = width,
            h = height
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="14">{}</text>"#,
            width / 2,
            TITLE_HEIGHT / 2 + 4,
            escape_xml(&self.style.title)
        );

        for (row, (label, value)) in page.rows.iter().enumerate() {
            let y = plot_top + row * ROW_HEIGHT;
            let _ = writeln!(
                svg,
                r##"<rect x="{}" y="{}" width="{:.1}" height="{}" fill="#{}" stroke="white"/>"##,
                x0,
                y + 2,
                scale(*value),
                ROW_HEIGHT - 4,
                self.style.color
            );
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{}" text-anchor="end">{}</text>"#,
                x0 - 6,
                y + ROW_HEIGHT / 2 + 4,
                escape_xml(label)
            );
        }

        let axis_y = plot_top + plot_height;
        let _ = writeln!(
            svg,
            r#"<line x1="{x0}" y1="{y}" x2="{x1}" y2="{y}" stroke="black"/>"#,
            x0 = x0,
            x1 = x0 + BAR_AREA,
            y = axis_y
        );
        let mut tick = 0;
        while tick <= axis_max {
            let x = x0 as f64 + scale(tick);
            let _ = writeln!(
                svg,
                r#"<line x1="{x:.1}" y1="{y0}" x2="{x:.1}" y2="{y1}" stroke="black"/><text x="{x:.1}" y="{ty}" text-anchor="middle">{tick}</text>"#,
                x = x,
                y0 = axis_y,
                y1 = axis_y + 4,
                ty = axis_y + 16,
                tick = tick
            );
            tick += step;
        }
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
            x0 + BAR_AREA / 2,
            axis_y + 36,
            escape_xml(&self.style.x_label)
        );
        svg.push_str("</svg>\n");
        svg
    }
}

impl ChartSink for SvgChartWriter {
    fn render(&mut self, page: &ChartPage<'_>) -> Result<(), UsageError> {
        let path = self.output_dir.join(Self::file_name(page));
        write_file(&path, &self.to_svg(page))?;
        tracing::debug!(chart = %path.display(), rows = page.rows.len(), "Wrote chart");
        self.written.push(path);
        Ok(())
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), UsageError> {
    fs::write(path, content).map_err(|source| UsageError::Report {
        path: path.to_path_buf(),
        source,
    })
}

/// Integer tick spacing giving at most [`TICKS`] intervals.
fn tick_step(max_value: usize) -> usize {
    let raw = ((max_value + TICKS - 1) / TICKS).max(1);
    let mut magnitude = 1;
    while magnitude * 10 <= raw {
        magnitude *= 10;
    }
    [1, 2, 5, 10]
        .iter()
        .map(|m| m * magnitude)
        .find(|&step| step >= raw)
        .unwrap_or(10 * magnitude)
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
