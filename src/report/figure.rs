//! Renderer-independent description of a figure.
//!
//! The catalog builds these from computed metrics; the renderer turns them
//! into pixels. Keeping the two apart lets the catalog be tested without
//! producing images.

use crate::analysis::Summary;
use crate::report::theme::Rgb;

/// Physical size of a figure in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureSize {
    pub width_in: f64,
    pub height_in: f64,
}

impl FigureSize {
    pub const WIDE: FigureSize = FigureSize {
        width_in: 12.0,
        height_in: 8.0,
    };
    pub const NARROW: FigureSize = FigureSize {
        width_in: 10.0,
        height_in: 8.0,
    };
    pub const TALL: FigureSize = FigureSize {
        width_in: 12.0,
        height_in: 10.0,
    };
}

/// One named, colored series of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub color: Rgb,
    pub values: Vec<f64>,
    /// Slot index on a categorical axis (box and violin plots).
    pub position: usize,
}

impl Series {
    pub fn new(label: impl Into<String>, color: Rgb, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            color,
            values,
            position: 0,
        }
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramPlot {
    pub series: Vec<Series>,
    pub bins: usize,
    /// Axis extent used when no value falls inside the display range.
    pub window: (f64, f64),
    pub log_x: bool,
    /// Lines for a statistics box in the top-right corner.
    pub annotation: Vec<String>,
    pub legend: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlot {
    /// Axis labels, one per slot.
    pub slots: Vec<String>,
    pub series: Vec<Series>,
    pub show_outliers: bool,
    pub log_y: bool,
    pub edge: Rgb,
    pub median: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViolinPlot {
    pub slots: Vec<String>,
    pub series: Vec<Series>,
    /// Fixed y-axis range; derived from the data when `None`.
    pub y_range: Option<(f64, f64)>,
    pub edge: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: usize,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarPlot {
    pub bars: Vec<Bar>,
    pub horizontal: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Plot {
    Histogram(HistogramPlot),
    Box(BoxPlot),
    Violin(ViolinPlot),
    Bar(BarPlot),
}

impl Plot {
    pub fn kind(&self) -> &'static str {
        match self {
            Plot::Histogram(_) => "histogram",
            Plot::Box(_) => "box plot",
            Plot::Violin(_) => "violin plot",
            Plot::Bar(_) => "bar chart",
        }
    }
}

/// A complete figure ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    /// Second title line, typically "Median: … | Mean: …".
    pub subtitle: Option<String>,
    pub x_label: String,
    pub y_label: String,
    pub size: FigureSize,
    /// Statistics of the series the figure describes, for the run summary.
    pub stats: Option<Summary>,
    pub plot: Plot,
}

/// "Median: 5.0 | Mean: 4.0" at the given precision.
pub fn stats_line(summary: &Summary, precision: usize) -> String {
    format!(
        "Median: {:.*} | Mean: {:.*}",
        precision, summary.median, precision, summary.mean
    )
}

/// Integer with thousands separators, e.g. `12,345`.
pub fn format_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Axis label for an agent name: underscores become spaces.
pub fn display_label(name: &str) -> String {
    name.replace('_', " ")
}
