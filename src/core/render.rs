//! Chart rendering.
//!
//! The chart is first described as an SVG scene. The same scene is
//! rasterised to PNG with `resvg` and embedded in the HTML view, so both
//! outputs always show the same picture.

use crate::core::reshape::{skill_lines, SkillLine};
use crate::domain::model::{Canvas, ChartData, PlotPoint, RenderSpec, RenderedChart, TimeScale};
use crate::utils::error::{Result, TimelineError};
use chrono::{Datelike, NaiveDate};
use resvg::{tiny_skia, usvg};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

const MARGIN_LEFT: f64 = 50.0;
const MARGIN_RIGHT: f64 = 50.0;
const MARGIN_TOP: f64 = 80.0;
const MARGIN_BOTTOM: f64 = 80.0;

const BACKGROUND: &str = "#FFFFFF";
const TITLE_COLOR: &str = "#2C3E50";
const GRID_COLOR: &str = "#ECF0F1";
const TICK_COLOR: &str = "#34495E";
const LABEL_COLOR: &str = "#FFFFFF";
const FONT_FAMILY: &str = "Arial, Helvetica, sans-serif";
/// Stand-ins for the generic `sans-serif` family, first installed one wins.
const SANS_SERIF_CANDIDATES: [&str; 6] = [
    "Arial",
    "Helvetica",
    "Liberation Sans",
    "DejaVu Sans",
    "Noto Sans",
    "FreeSans",
];

const TITLE_FONT_SIZE: f64 = 16.0;
const TICK_FONT_SIZE: f64 = 10.0;
const LABEL_FONT_SIZE: f64 = 7.0;
const DAYS_PER_YEAR: f64 = 365.25;

fn backend_error(path: &Path, message: impl std::fmt::Display) -> TimelineError {
    TimelineError::RenderBackendError {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Right edge of the axis: never left of the data or the configured floor.
pub fn resolve_domain_max(spec: &RenderSpec, lines: &[SkillLine<'_>]) -> NaiveDate {
    let data_max = lines.iter().map(|line| line.end.max(line.start)).max();
    let floor = spec.domain.min + chrono::Duration::days(1);
    [spec.domain.max, data_max, Some(floor)]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(floor)
}

/// January 1st of every `interval` years inside `[min, max]`.
pub fn year_ticks(min: NaiveDate, max: NaiveDate, interval: u32) -> Vec<NaiveDate> {
    let interval = interval.max(1) as i32;
    let mut year = if min.ordinal() == 1 {
        min.year()
    } else {
        min.year() + 1
    };

    let mut ticks = Vec::new();
    while let Some(tick) = NaiveDate::from_ymd_opt(year, 1, 1) {
        if tick > max {
            break;
        }
        ticks.push(tick);
        year += interval;
    }
    ticks
}

/// Maps dates to horizontal pixel positions.
pub struct TimeAxis {
    scale: TimeScale,
    today: NaiveDate,
    min: NaiveDate,
    low: f64,
    high: f64,
    x0: f64,
    x1: f64,
}

impl TimeAxis {
    pub fn new(spec: &RenderSpec, max: NaiveDate, x0: f64, x1: f64) -> Self {
        let mut axis = Self {
            scale: spec.scale,
            today: spec.today,
            min: spec.domain.min,
            low: 0.0,
            high: 1.0,
            x0,
            x1,
        };
        axis.low = axis.transform(spec.domain.min);
        axis.high = axis.transform(max);
        axis
    }

    fn transform(&self, date: NaiveDate) -> f64 {
        match self.scale {
            TimeScale::Linear => (date - self.min).num_days() as f64,
            TimeScale::Log => {
                // Recent years get more room; dates past today collapse onto it.
                let years_ago = ((self.today - date).num_days() as f64 / DAYS_PER_YEAR).max(0.0);
                -(years_ago + 1.0).ln()
            }
        }
    }

    /// Pixel position, clamped to the plot area.
    pub fn x(&self, date: NaiveDate) -> f64 {
        let span = self.high - self.low;
        let fraction = if span.abs() < f64::EPSILON {
            0.0
        } else {
            ((self.transform(date) - self.low) / span).clamp(0.0, 1.0)
        };
        self.x0 + fraction * (self.x1 - self.x0)
    }
}

fn tooltip(line: &SkillLine<'_>) -> String {
    let end = if line.ongoing {
        "present".to_string()
    } else {
        line.end.format("%b %Y").to_string()
    };
    format!(
        "{}\nStart: {}\nEnd: {}\nDuration: {:.1} years",
        line.name,
        line.start.format("%b %Y"),
        end,
        line.duration_years()
    )
}

fn write_scene(
    out: &mut String,
    lines: &[SkillLine<'_>],
    spec: &RenderSpec,
    interactive: bool,
) -> std::fmt::Result {
    let width = spec.canvas.width as f64;
    let height = spec.canvas.height as f64;
    let plot_top = MARGIN_TOP;
    let plot_bottom = height - MARGIN_BOTTOM;

    let max = resolve_domain_max(spec, lines);
    let axis = TimeAxis::new(spec, max, MARGIN_LEFT, width - MARGIN_RIGHT);

    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="{font}">"#,
        w = spec.canvas.width,
        h = spec.canvas.height,
        font = FONT_FAMILY
    )?;
    writeln!(out, r#"<rect width="{}" height="{}" fill="{}"/>"#, width, height, BACKGROUND)?;
    writeln!(
        out,
        r#"<text class="title" x="{:.1}" y="{:.1}" text-anchor="middle" font-size="{}" fill="{}">{}</text>"#,
        width / 2.0,
        MARGIN_TOP / 2.0,
        TITLE_FONT_SIZE,
        TITLE_COLOR,
        xml_escape(&spec.title)
    )?;

    writeln!(out, r#"<g class="grid">"#)?;
    for tick in year_ticks(spec.domain.min, max, spec.tick_interval_years) {
        let x = axis.x(tick);
        writeln!(
            out,
            r#"<line x1="{x:.2}" y1="{top:.2}" x2="{x:.2}" y2="{bottom:.2}" stroke="{color}" stroke-width="1"/>"#,
            top = plot_top,
            bottom = plot_bottom,
            color = GRID_COLOR
        )?;
        writeln!(
            out,
            r#"<text class="tick" transform="translate({x:.2} {y:.2}) rotate(45)" font-size="{size}" fill="{color}">{year}</text>"#,
            y = plot_bottom + 14.0,
            size = TICK_FONT_SIZE,
            color = TICK_COLOR,
            year = tick.year()
        )?;
    }
    writeln!(out, "</g>")?;

    let lane_count = spec.lanes.len().max(1) as f64;
    let lane_height = (plot_bottom - plot_top) / lane_count;

    writeln!(out, r#"<g class="lanes">"#)?;
    for (lane, record) in spec.lanes.iter().enumerate() {
        let Some(line) = lines.iter().find(|line| line.record == *record) else {
            continue;
        };
        let Some(encoding) = spec.encodings.get(*record) else {
            continue;
        };

        let y = plot_top + lane_height * (lane as f64 + 0.5);
        let x1 = axis.x(line.start);
        let x2 = axis.x(line.end).max(x1 + 1.0);
        let stroke_width = encoding.weight.min(lane_height * 0.9).max(0.5);

        writeln!(
            out,
            r#"<g class="skill" data-category="{}">"#,
            xml_escape(&encoding.category)
        )?;
        if interactive {
            writeln!(out, "<title>{}</title>", xml_escape(&tooltip(line)))?;
        }
        writeln!(
            out,
            r#"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{color}" stroke-width="{stroke_width:.2}"/>"#,
            color = encoding.color
        )?;
        writeln!(
            out,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="middle" dominant-baseline="central" font-size="{}" font-weight="bold" fill="{}">{}</text>"#,
            (x1 + x2) / 2.0,
            y,
            LABEL_FONT_SIZE,
            LABEL_COLOR,
            xml_escape(line.name)
        )?;
        writeln!(out, "</g>")?;
    }
    writeln!(out, "</g>")?;
    writeln!(out, "</svg>")
}

/// SVG scene for the chart. `interactive` adds hover tooltips.
pub fn render_svg(points: &[PlotPoint], spec: &RenderSpec, interactive: bool) -> Result<String> {
    let lines = skill_lines(points);
    let mut svg = String::new();
    write_scene(&mut svg, &lines, spec, interactive)
        .map_err(|e| backend_error(&spec.png_path, e))?;
    Ok(svg)
}

/// Loads system fonts and points the generic `sans-serif` family at a face
/// that is actually installed. usvg silently drops text it cannot shape.
fn font_options(path: &Path) -> Result<usvg::Options<'static>> {
    let mut options = usvg::Options::default();
    let fontdb = options.fontdb_mut();
    fontdb.load_system_fonts();

    let family = {
        let installed = |name: &str| {
            fontdb
                .faces()
                .any(|face| face.families.iter().any(|(family, _)| family == name))
        };
        SANS_SERIF_CANDIDATES
            .iter()
            .copied()
            .find(|name| installed(*name))
            .map(str::to_string)
            .or_else(|| {
                fontdb
                    .faces()
                    .find_map(|face| face.families.first().map(|(family, _)| family.clone()))
            })
    };
    let family = family.ok_or_else(|| backend_error(path, "no installed font can draw chart text"))?;

    tracing::debug!("Using '{}' for sans-serif text", family);
    fontdb.set_sans_serif_family(family);
    Ok(options)
}

fn paint(svg: &str, canvas: Canvas, path: &Path) -> Result<tiny_skia::Pixmap> {
    let options = font_options(path)?;
    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| backend_error(path, e))?;

    let scale = canvas.scale.max(1);
    let mut pixmap = tiny_skia::Pixmap::new(canvas.width * scale, canvas.height * scale)
        .ok_or_else(|| {
            backend_error(
                path,
                format!(
                    "cannot allocate a {}x{} image",
                    canvas.width * scale,
                    canvas.height * scale
                ),
            )
        })?;
    pixmap.fill(tiny_skia::Color::WHITE);

    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale as f32, scale as f32),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}

/// Rasterises an SVG scene to PNG bytes at `canvas.scale` pixel density.
pub fn rasterize(svg: &str, canvas: Canvas, path: &Path) -> Result<Vec<u8>> {
    paint(svg, canvas, path)?
        .encode_png()
        .map_err(|e| backend_error(path, e))
}

#[derive(Serialize)]
struct HtmlLine<'a> {
    name: &'a str,
    category: &'a str,
    color: &'a str,
    weight: f64,
    start: NaiveDate,
    end: NaiveDate,
    ongoing: bool,
}

/// Standalone HTML page around the interactive scene.
pub fn render_html(points: &[PlotPoint], spec: &RenderSpec, path: &Path) -> Result<String> {
    let svg = render_svg(points, spec, true)?;
    let lines = skill_lines(points);

    let data: Vec<HtmlLine<'_>> = spec
        .lanes
        .iter()
        .filter_map(|record| {
            let line = lines.iter().find(|line| line.record == *record)?;
            let encoding = spec.encodings.get(*record)?;
            Some(HtmlLine {
                name: line.name,
                category: &encoding.category,
                color: &encoding.color,
                weight: encoding.weight,
                start: line.start,
                end: line.end,
                ongoing: line.ongoing,
            })
        })
        .collect();
    let json = serde_json::to_string(&data)?.replace("</", "<\\/");

    let mut html = String::new();
    write_html(&mut html, spec, &svg, &json).map_err(|e| backend_error(path, e))?;
    Ok(html)
}

fn write_html(out: &mut String, spec: &RenderSpec, svg: &str, json: &str) -> std::fmt::Result {
    let title = xml_escape(&spec.title);
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, r#"<html lang="en">"#)?;
    writeln!(out, "<head>")?;
    writeln!(out, r#"<meta charset="utf-8">"#)?;
    writeln!(out, r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#)?;
    writeln!(out, "<title>{}</title>", title)?;
    writeln!(out, "<style>")?;
    writeln!(out, "body {{ margin: 0; background: {}; font-family: {}; }}", BACKGROUND, FONT_FAMILY)?;
    writeln!(out, "figure {{ margin: 0 auto; max-width: {}px; }}", spec.canvas.width)?;
    writeln!(out, "figure svg {{ width: 100%; height: auto; }}")?;
    writeln!(out, ".skill:hover line {{ opacity: 0.75; }}")?;
    writeln!(out, ".legend {{ display: flex; flex-wrap: wrap; gap: 1em; justify-content: center; list-style: none; padding: 0; color: {}; }}", TICK_COLOR)?;
    writeln!(out, ".legend span {{ display: inline-block; width: 1em; height: 0.6em; margin-right: 0.4em; }}")?;
    writeln!(out, "</style>")?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "<figure>")?;
    out.push_str(svg);
    writeln!(out, "</figure>")?;
    writeln!(out, r#"<ul class="legend">"#)?;
    for (category, color) in &spec.category_colors {
        writeln!(
            out,
            r#"<li><span style="background: {}"></span>{}</li>"#,
            color,
            xml_escape(category)
        )?;
    }
    writeln!(out, "</ul>")?;
    writeln!(out, r#"<script type="application/json" id="timeline-data">{}</script>"#, json)?;
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")
}

/// Renders every requested output in memory; nothing touches the disk here.
pub fn render(chart: &ChartData) -> Result<RenderedChart> {
    let spec = &chart.spec;

    let svg = render_svg(&chart.points, spec, false)?;
    let png = rasterize(&svg, spec.canvas, &spec.png_path)?;
    tracing::debug!(
        "Rasterised {}x{} chart ({} bytes)",
        spec.canvas.width * spec.canvas.scale.max(1),
        spec.canvas.height * spec.canvas.scale.max(1),
        png.len()
    );

    let html = match &spec.html_path {
        Some(path) => Some(render_html(&chart.points, spec, path)?),
        None => None,
    };

    Ok(RenderedChart { png, html })
}
