//! PNG rendering of [`Figure`]s with plotters.
//!
//! Figures are drawn into an in-memory RGB buffer and encoded before
//! anything touches the disk, so a failed render never leaves a partial
//! file behind.

use crate::analysis::{min_max, BoxStats, Density, Histogram, Summary};
use crate::config::RenderConfig;
use crate::error::{ReportError, Result};
use crate::report::figure::{
    format_thousands, BarPlot, BoxPlot, Figure, FigureSize, HistogramPlot, Plot, ViolinPlot,
};
use crate::report::theme::{self, Rgb};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use tracing::debug;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const TITLE_PT: f64 = 18.0;
const LABEL_PT: f64 = 16.0;
const TICK_PT: f64 = 13.0;

trait OrRender<T> {
    fn or_render(self) -> Result<T>;
}

impl<T, E: std::fmt::Display> OrRender<T> for std::result::Result<T, E> {
    fn or_render(self) -> Result<T> {
        self.map_err(ReportError::render)
    }
}

fn rgb(c: Rgb) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

/// Renders figures at a fixed resolution and font.
#[derive(Debug, Clone)]
pub struct Renderer {
    dpi: u32,
    font_family: String,
}

impl Renderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            dpi: config.dpi.max(1),
            font_family: config.font_family.clone(),
        }
    }

    /// Pixel dimensions of a figure: inches times DPI.
    pub fn pixel_size(&self, size: FigureSize) -> (u32, u32) {
        let dpi = self.dpi as f64;
        (
            (size.width_in * dpi).round().max(1.0) as u32,
            (size.height_in * dpi).round().max(1.0) as u32,
        )
    }

    /// Font size in pixels for a point size.
    fn font_px(&self, pt: f64) -> f64 {
        pt * self.dpi as f64 / 72.0
    }

    /// Scale a length given at 100 DPI to the configured resolution.
    fn px(&self, at_100dpi: f64) -> u32 {
        (at_100dpi * self.dpi as f64 / 100.0).round().max(1.0) as u32
    }

    fn font(&self, pt: f64) -> FontDesc<'_> {
        FontDesc::new(
            FontFamily::Name(&self.font_family),
            self.font_px(pt),
            FontStyle::Normal,
        )
    }

    fn line(&self) -> u32 {
        self.px(1.0)
    }

    /// Render a figure and encode it as PNG.
    pub fn render_png(&self, figure: &Figure) -> Result<Vec<u8>> {
        let (width, height) = self.pixel_size(figure.size);
        let mut buffer = vec![255u8; width as usize * height as usize * 3];

        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).or_render()?;

            let root = root
                .titled(&figure.title, self.font(TITLE_PT).style(FontStyle::Bold))
                .or_render()?;
            let root = match &figure.subtitle {
                Some(subtitle) => root.titled(subtitle, self.font(LABEL_PT)).or_render()?,
                None => root,
            };

            match &figure.plot {
                Plot::Histogram(plot) => self.draw_histogram(&root, figure, plot)?,
                Plot::Box(plot) => self.draw_boxes(&root, figure, plot)?,
                Plot::Violin(plot) => self.draw_violins(&root, figure, plot)?,
                Plot::Bar(plot) => self.draw_bars(&root, figure, plot)?,
            }

            root.present().or_render()?;
        }

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(&buffer, width, height, ColorType::Rgb8)
            .or_render()?;

        debug!(
            "Rendered {} '{}' ({}x{}, {} bytes)",
            figure.plot.kind(),
            figure.title,
            width,
            height,
            png.len()
        );
        Ok(png)
    }

    /// Render a figure and write it to `path` in a single write.
    pub fn save(&self, figure: &Figure, path: &Path) -> Result<()> {
        let png = self.render_png(figure)?;
        std::fs::write(path, png)?;
        Ok(())
    }

    fn draw_histogram(&self, area: &Area<'_>, figure: &Figure, plot: &HistogramPlot) -> Result<()> {
        // Log axes are drawn as a linear axis over log10 values.
        let transformed: Vec<Vec<f64>> = plot
            .series
            .iter()
            .map(|s| {
                s.values
                    .iter()
                    .copied()
                    .filter(|x| !plot.log_x || *x > 0.0)
                    .map(|x| if plot.log_x { x.log10() } else { x })
                    .collect()
            })
            .collect();

        let pooled: Vec<f64> = transformed.iter().flatten().copied().collect();
        let range = match min_max(&pooled) {
            Some(range) => range,
            // Everything fell outside the display range: draw empty bins.
            None if !plot.series.is_empty() => {
                let (lo, hi) = plot.window;
                if plot.log_x {
                    (lo.max(1.0).log10(), hi.max(1.0).log10())
                } else {
                    (lo, hi)
                }
            }
            None => {
                return Err(ReportError::EmptySeries {
                    what: figure.title.clone(),
                })
            }
        };

        // Overlaid series share one set of bin edges.
        let histograms: Vec<Histogram> = transformed
            .iter()
            .map(|values| Histogram::with_range(values, plot.bins, range))
            .collect();

        let edges = &histograms[0].edges;
        let (x_lo, x_hi) = (edges[0], edges[edges.len() - 1]);
        let max_count = histograms.iter().map(Histogram::max_count).max().unwrap_or(0);
        let headroom = if plot.annotation.is_empty() { 1.05 } else { 1.2 };
        let y_hi = (max_count.max(1) as f64) * headroom;

        let mut chart = ChartBuilder::on(area)
            .margin(self.px(15.0))
            .x_label_area_size(self.px(55.0))
            .y_label_area_size(self.px(75.0))
            .build_cartesian_2d(x_lo..x_hi, 0f64..y_hi)
            .or_render()?;

        let log_x = plot.log_x;
        let x_format = move |v: &f64| {
            if log_x {
                format_tick(10f64.powf(*v))
            } else {
                format_tick(*v)
            }
        };
        let y_format = |v: &f64| format_tick(*v);

        chart
            .configure_mesh()
            .light_line_style(TRANSPARENT)
            .bold_line_style(BLACK.mix(0.1))
            .x_desc(figure.x_label.as_str())
            .y_desc(figure.y_label.as_str())
            .axis_desc_style(self.font(LABEL_PT))
            .label_style(self.font(TICK_PT))
            .x_label_formatter(&x_format)
            .y_label_formatter(&y_format)
            .draw()
            .or_render()?;

        let alpha = if plot.series.len() > 1 { 0.6 } else { 0.7 };
        let swatch = self.px(8.0) as i32;

        for (series, histogram) in plot.series.iter().zip(&histograms) {
            let fill = rgb(series.color).mix(alpha).filled();
            let bars = || {
                histogram
                    .bins()
                    .filter(|(_, _, count)| *count > 0)
                    .map(|(left, right, count)| [(left, 0.0), (right, count as f64)])
            };

            let anno = chart
                .draw_series(bars().map(|corners| Rectangle::new(corners, fill)))
                .or_render()?;
            if plot.legend {
                anno.label(series.label.clone()).legend(move |(x, y)| {
                    Rectangle::new([(x, y - swatch), (x + 2 * swatch, y + swatch)], fill)
                });
            }

            let edge = BLACK.stroke_width(self.line());
            chart
                .draw_series(bars().map(|corners| Rectangle::new(corners, edge)))
                .or_render()?;
        }

        if plot.legend {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .label_font(self.font(TICK_PT))
                .draw()
                .or_render()?;
        }

        if !plot.annotation.is_empty() {
            let font_px = self.font_px(TICK_PT);
            let pad = self.px(10.0) as i32;
            let line_h = (font_px * 1.4).round() as i32;
            let widest = plot
                .annotation
                .iter()
                .map(|line| line.chars().count())
                .max()
                .unwrap_or(0);
            let box_w = (widest as f64 * font_px * 0.6).round() as i32 + 2 * pad;
            let box_h = line_h * plot.annotation.len() as i32 + pad;
            let corner = (x_hi, y_hi);

            chart
                .draw_series(std::iter::once(
                    EmptyElement::at(corner)
                        + Rectangle::new(
                            [(-box_w - pad, pad), (-pad, pad + box_h)],
                            rgb(theme::WHEAT).mix(0.5).filled(),
                        )
                        + Rectangle::new(
                            [(-box_w - pad, pad), (-pad, pad + box_h)],
                            BLACK.stroke_width(self.line()),
                        ),
                ))
                .or_render()?;

            let text = TextStyle::from(self.font(TICK_PT)).pos(Pos::new(HPos::Left, VPos::Top));
            chart
                .draw_series(plot.annotation.iter().enumerate().map(|(i, line)| {
                    EmptyElement::at(corner)
                        + Text::new(
                            line.clone(),
                            (-box_w, 2 * pad + line_h * i as i32),
                            text.clone(),
                        )
                }))
                .or_render()?;
        }

        Ok(())
    }

    fn draw_boxes(&self, area: &Area<'_>, figure: &Figure, plot: &BoxPlot) -> Result<()> {
        let to_axis = |v: f64| {
            if plot.log_y {
                v.max(f64::MIN_POSITIVE).log10()
            } else {
                v
            }
        };

        let boxes: Vec<(usize, Rgb, BoxStats)> = plot
            .series
            .iter()
            .filter_map(|s| BoxStats::of(&s.values).map(|b| (s.position, s.color, b)))
            .collect();
        if boxes.is_empty() {
            return Err(ReportError::EmptySeries {
                what: figure.title.clone(),
            });
        }

        let mut extent: Vec<f64> = Vec::new();
        for (_, _, b) in &boxes {
            extent.push(b.whisker_low);
            extent.push(b.whisker_high);
            if plot.show_outliers {
                extent.extend_from_slice(&b.outliers);
            }
        }
        let extent: Vec<f64> = extent.into_iter().map(to_axis).collect();
        let (y_lo, y_hi) = padded(min_max(&extent).unwrap_or((0.0, 1.0)));

        let n = plot.slots.len().max(1);
        let mut chart = ChartBuilder::on(area)
            .margin(self.px(15.0))
            .x_label_area_size(self.px(55.0))
            .y_label_area_size(self.px(75.0))
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_lo..y_hi)
            .or_render()?;

        let slots = plot.slots.clone();
        let x_format = move |v: &f64| slot_label(&slots, *v);
        let log_y = plot.log_y;
        let y_format = move |v: &f64| {
            if log_y {
                format_tick(10f64.powf(*v))
            } else {
                format_tick(*v)
            }
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(TRANSPARENT)
            .bold_line_style(BLACK.mix(0.1))
            .x_labels(n + 1)
            .x_desc(figure.x_label.as_str())
            .y_desc(figure.y_label.as_str())
            .axis_desc_style(self.font(LABEL_PT))
            .label_style(self.font(TICK_PT))
            .x_label_formatter(&x_format)
            .y_label_formatter(&y_format)
            .draw()
            .or_render()?;

        let half = 0.3;
        let edge = rgb(plot.edge).stroke_width(self.line() * 2);
        let median = rgb(plot.median).stroke_width(self.line() * 3);
        let radius = self.px(3.0);

        for (position, color, b) in &boxes {
            let x = *position as f64;
            let (q1, q3) = (to_axis(b.q1), to_axis(b.q3));
            let (low, high) = (to_axis(b.whisker_low), to_axis(b.whisker_high));
            let rect = [(x - half, q1), (x + half, q3)];

            chart
                .draw_series([
                    Rectangle::new(rect, rgb(*color).mix(0.7).filled()),
                    Rectangle::new(rect, edge),
                ])
                .or_render()?;

            chart
                .draw_series([
                    PathElement::new(vec![(x, q3), (x, high)], edge),
                    PathElement::new(vec![(x, q1), (x, low)], edge),
                    PathElement::new(vec![(x - half / 2.0, high), (x + half / 2.0, high)], edge),
                    PathElement::new(vec![(x - half / 2.0, low), (x + half / 2.0, low)], edge),
                    PathElement::new(
                        vec![(x - half, to_axis(b.median)), (x + half, to_axis(b.median))],
                        median,
                    ),
                ])
                .or_render()?;

            if plot.show_outliers {
                chart
                    .draw_series(
                        b.outliers
                            .iter()
                            .map(|o| Circle::new((x, to_axis(*o)), radius, edge)),
                    )
                    .or_render()?;
            }
        }

        Ok(())
    }

    fn draw_violins(&self, area: &Area<'_>, figure: &Figure, plot: &ViolinPlot) -> Result<()> {
        let pooled: Vec<f64> = plot.series.iter().flat_map(|s| s.values.iter().copied()).collect();
        let (y_lo, y_hi) = match plot.y_range {
            Some(range) => range,
            None => padded(min_max(&pooled).ok_or_else(|| ReportError::EmptySeries {
                what: figure.title.clone(),
            })?),
        };

        let n = plot.slots.len().max(1);
        let mut chart = ChartBuilder::on(area)
            .margin(self.px(15.0))
            .x_label_area_size(self.px(55.0))
            .y_label_area_size(self.px(75.0))
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_lo..y_hi)
            .or_render()?;

        let slots = plot.slots.clone();
        let x_format = move |v: &f64| slot_label(&slots, *v);
        let y_format = |v: &f64| format_tick(*v);

        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(TRANSPARENT)
            .bold_line_style(BLACK.mix(0.1))
            .x_labels(n + 1)
            .x_desc(figure.x_label.as_str())
            .y_desc(figure.y_label.as_str())
            .axis_desc_style(self.font(LABEL_PT))
            .label_style(self.font(TICK_PT))
            .x_label_formatter(&x_format)
            .y_label_formatter(&y_format)
            .draw()
            .or_render()?;

        let half = 0.35;
        let edge = rgb(plot.edge).stroke_width(self.line() * 2);

        for series in &plot.series {
            let Some(density) = Density::estimate(&series.values, 100) else {
                continue;
            };
            let x = series.position as f64;
            let peak = density.max_density();
            let width = |d: f64| if peak > 0.0 { half * d / peak } else { half };

            let mut outline: Vec<(f64, f64)> = density
                .points
                .iter()
                .map(|(y, d)| (x + width(*d), *y))
                .collect();
            outline.extend(density.points.iter().rev().map(|(y, d)| (x - width(*d), *y)));

            chart
                .draw_series(std::iter::once(Polygon::new(
                    outline.clone(),
                    rgb(series.color).mix(0.7).filled(),
                )))
                .or_render()?;
            if let Some(first) = outline.first().copied() {
                outline.push(first);
            }
            chart
                .draw_series(std::iter::once(PathElement::new(outline, edge)))
                .or_render()?;

            let Some((lo, hi)) = min_max(&series.values) else {
                continue;
            };
            let stats = Summary::of(&series.values);
            let bar = |y: f64, w: f64| PathElement::new(vec![(x - w, y), (x + w, y)], edge);
            let mut lines = vec![
                PathElement::new(vec![(x, lo), (x, hi)], edge),
                bar(lo, half / 3.0),
                bar(hi, half / 3.0),
            ];
            if let Some(stats) = stats {
                lines.push(bar(stats.median, half / 2.0));
                lines.push(PathElement::new(
                    vec![(x - half / 2.0, stats.mean), (x + half / 2.0, stats.mean)],
                    rgb(theme::RED).stroke_width(self.line() * 2),
                ));
            }
            chart.draw_series(lines).or_render()?;
        }

        Ok(())
    }

    fn draw_bars(&self, area: &Area<'_>, figure: &Figure, plot: &BarPlot) -> Result<()> {
        if plot.bars.is_empty() {
            return Err(ReportError::EmptySeries {
                what: figure.title.clone(),
            });
        }

        let n = plot.bars.len();
        let max_value = plot.bars.iter().map(|b| b.value).max().unwrap_or(0).max(1) as f64;
        let slots: Vec<String> = if plot.horizontal {
            // First bar on top.
            plot.bars.iter().rev().map(|b| b.label.clone()).collect()
        } else {
            plot.bars.iter().map(|b| b.label.clone()).collect()
        };
        let slot_format = move |v: &f64| slot_label(&slots, *v);
        let value_format = |v: &f64| format_tick(*v);
        let edge = BLACK.stroke_width(self.line());
        let pad = self.px(4.0) as i32;
        let value_font = TextStyle::from(self.font(TICK_PT));

        if plot.horizontal {
            let mut chart = ChartBuilder::on(area)
                .margin(self.px(15.0))
                .x_label_area_size(self.px(55.0))
                .y_label_area_size(self.px(160.0))
                .build_cartesian_2d(0f64..max_value * 1.15, -0.5f64..(n as f64 - 0.5))
                .or_render()?;

            chart
                .configure_mesh()
                .disable_y_mesh()
                .light_line_style(TRANSPARENT)
                .bold_line_style(BLACK.mix(0.1))
                .y_labels(n + 1)
                .x_desc(figure.x_label.as_str())
                .y_desc(figure.y_label.as_str())
                .axis_desc_style(self.font(LABEL_PT))
                .label_style(self.font(TICK_PT))
                .x_label_formatter(&value_format)
                .y_label_formatter(&slot_format)
                .draw()
                .or_render()?;

            let rects: Vec<([(f64, f64); 2], RGBColor)> = plot
                .bars
                .iter()
                .enumerate()
                .map(|(i, bar)| {
                    let y = (n - 1 - i) as f64;
                    ([(0.0, y - 0.4), (bar.value as f64, y + 0.4)], rgb(bar.color))
                })
                .collect();
            chart
                .draw_series(rects.iter().map(|(r, c)| Rectangle::new(*r, c.filled())))
                .or_render()?;
            chart
                .draw_series(rects.iter().map(|(r, _)| Rectangle::new(*r, edge)))
                .or_render()?;

            let style = value_font.pos(Pos::new(HPos::Left, VPos::Center));
            chart
                .draw_series(plot.bars.iter().enumerate().map(|(i, bar)| {
                    EmptyElement::at((bar.value as f64, (n - 1 - i) as f64))
                        + Text::new(format_thousands(bar.value), (pad, 0), style.clone())
                }))
                .or_render()?;
        } else {
            let mut chart = ChartBuilder::on(area)
                .margin(self.px(15.0))
                .x_label_area_size(self.px(55.0))
                .y_label_area_size(self.px(75.0))
                .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..max_value * 1.1)
                .or_render()?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .light_line_style(TRANSPARENT)
                .bold_line_style(BLACK.mix(0.1))
                .x_labels(n + 1)
                .x_desc(figure.x_label.as_str())
                .y_desc(figure.y_label.as_str())
                .axis_desc_style(self.font(LABEL_PT))
                .label_style(self.font(TICK_PT))
                .x_label_formatter(&slot_format)
                .y_label_formatter(&value_format)
                .draw()
                .or_render()?;

            let rects: Vec<([(f64, f64); 2], RGBColor)> = plot
                .bars
                .iter()
                .enumerate()
                .map(|(i, bar)| {
                    let x = i as f64;
                    ([(x - 0.4, 0.0), (x + 0.4, bar.value as f64)], rgb(bar.color))
                })
                .collect();
            chart
                .draw_series(rects.iter().map(|(r, c)| Rectangle::new(*r, c.filled())))
                .or_render()?;
            chart
                .draw_series(rects.iter().map(|(r, _)| Rectangle::new(*r, edge)))
                .or_render()?;

            let style = value_font.pos(Pos::new(HPos::Center, VPos::Bottom));
            chart
                .draw_series(plot.bars.iter().enumerate().map(|(i, bar)| {
                    EmptyElement::at((i as f64, bar.value as f64))
                        + Text::new(format_thousands(bar.value), (0, -pad), style.clone())
                }))
                .or_render()?;
        }

        Ok(())
    }
}

/// Label for a categorical slot; blank between slots.
fn slot_label(slots: &[String], v: f64) -> String {
    let nearest = v.round();
    if (v - nearest).abs() > 1e-6 || nearest < 0.0 {
        return String::new();
    }
    slots.get(nearest as usize).cloned().unwrap_or_default()
}

/// Axis range with 5% padding; a flat range is widened by one.
fn padded((lo, hi): (f64, f64)) -> (f64, f64) {
    if hi <= lo {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

/// Tick text: integers get thousands separators.
fn format_tick(v: f64) -> String {
    let rounded = v.round();
    if (v - rounded).abs() < 1e-9 {
        let sign = if rounded < 0.0 { "-" } else { "" };
        format!("{}{}", sign, format_thousands(rounded.abs() as usize))
    } else if v.abs() < 1.0 {
        format!("{:.2}", v)
    } else {
        format!("{:.1}", v)
    }
}
