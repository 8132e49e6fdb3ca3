//! Chart data and PNG rendering.
//!
//! The report hands a [`Histogram`] of response times and a list of
//! [`StatusSlice`]s to a [`ChartRenderer`]. Rendering is best effort; the
//! report treats every [`RenderError`] as a skipped artifact.

use crate::error::RenderError;
use crate::i18n::Messages;
use plotters::prelude::*;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::style::{register_font, FontStyle};
use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, PI};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

pub const HISTOGRAM_BUCKETS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBucket {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width buckets over the observed range. The last bucket includes
/// its upper edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub buckets: Vec<HistogramBucket>,
}

impl Histogram {
    pub fn from_values(values: &[f64], bucket_count: usize) -> Self {
        let bucket_count = bucket_count.max(1);
        let (mut lo, mut hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if values.is_empty() {
            lo = 0.0;
            hi = 1.0;
        } else if hi - lo <= 0.0 {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bucket_count as f64;
        let mut buckets: Vec<HistogramBucket> = (0..bucket_count)
            .map(|i| HistogramBucket {
                start: lo + width * i as f64,
                end: lo + width * (i + 1) as f64,
                count: 0,
            })
            .collect();

        for &value in values {
            let idx = (((value - lo) / width) as usize).min(bucket_count - 1);
            buckets[idx].count += 1;
        }

        Self { buckets }
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn max_count(&self) -> usize {
        self.buckets.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSlice {
    pub status: i32,
    pub count: usize,
    pub percent: f64,
}

/// Count every observed status, most frequent first; ties by status code.
pub fn status_distribution(statuses: impl IntoIterator<Item = i32>) -> Vec<StatusSlice> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for status in statuses {
        *counts.entry(status).or_insert(0) += 1;
    }
    let total: usize = counts.values().sum();

    let mut slices: Vec<StatusSlice> = counts
        .into_iter()
        .map(|(status, count)| StatusSlice {
            status,
            count,
            percent: count as f64 / total as f64 * 100.0,
        })
        .collect();
    slices.sort_by(|a, b| b.count.cmp(&a.count).then(a.status.cmp(&b.status)));
    slices
}

pub trait ChartRenderer: Send + Sync {
    fn render_histogram(
        &self,
        histogram: &Histogram,
        messages: &Messages,
        path: &Path,
    ) -> Result<(), RenderError>;

    fn render_status_pie(
        &self,
        slices: &[StatusSlice],
        messages: &Messages,
        path: &Path,
    ) -> Result<(), RenderError>;
}

const HISTOGRAM_CHART: &str = "response time histogram";
const STATUS_CHART: &str = "status distribution";

const FONT_FAMILY: &str = "sans-serif";

const SLICE_COLORS: [RGBColor; 4] = [
    RGBColor(0x2e, 0xcc, 0x71),
    RGBColor(0xe7, 0x4c, 0x3c),
    RGBColor(0x34, 0x98, 0xdb),
    RGBColor(0xf1, 0xc4, 0x0f),
];

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Register the first usable system font for chart text, once per process.
fn font_available() -> bool {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    *REGISTERED.get_or_init(|| {
        for candidate in FONT_CANDIDATES {
            let Ok(bytes) = std::fs::read(candidate) else {
                continue;
            };
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            if register_font(FONT_FAMILY, FontStyle::Normal, bytes).is_ok() {
                debug!(font = candidate, "registered chart font");
                return true;
            }
        }
        debug!("no chart font found, charts will have no text");
        false
    })
}

/// Draws PNG charts with the plotters bitmap backend.
#[derive(Debug, Clone)]
pub struct PlottersRenderer {
    with_text: bool,
}

impl PlottersRenderer {
    pub fn new() -> Self {
        Self {
            with_text: font_available(),
        }
    }

    /// Renderer that only draws geometry.
    pub fn without_text() -> Self {
        Self { with_text: false }
    }
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render_histogram(
        &self,
        histogram: &Histogram,
        messages: &Messages,
        path: &Path,
    ) -> Result<(), RenderError> {
        let err = |e: DrawingAreaErrorKind<_>| RenderError::new(HISTOGRAM_CHART, e);

        let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
        root.fill(&WHITE).map_err(err)?;

        let (x_min, x_max) = match (histogram.buckets.first(), histogram.buckets.last()) {
            (Some(first), Some(last)) => (first.start, last.end),
            _ => (0.0, 1.0),
        };
        let y_max = histogram.max_count().max(1) as f64 * 1.1;

        let mut builder = ChartBuilder::on(&root);
        builder.margin(15);
        if self.with_text {
            builder
                .caption(messages.response_time_dist, (FONT_FAMILY, 24))
                .x_label_area_size(50)
                .y_label_area_size(60);
        }
        let mut chart = builder
            .build_cartesian_2d(x_min..x_max, 0f64..y_max)
            .map_err(err)?;

        if self.with_text {
            chart
                .configure_mesh()
                .x_desc(messages.response_time)
                .y_desc(messages.request_count)
                .x_label_formatter(&|x| format!("{:.3}", x))
                .y_label_formatter(&|y| format!("{:.0}", y))
                .draw()
                .map_err(err)?;
        } else {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(x_min, y_max), (x_min, 0.0), (x_max, 0.0)],
                    BLACK.stroke_width(1),
                )))
                .map_err(err)?;
        }

        chart
            .draw_series(histogram.buckets.iter().filter(|b| b.count > 0).map(|b| {
                Rectangle::new(
                    [(b.start, 0.0), (b.end, b.count as f64)],
                    BLUE.mix(0.6).filled(),
                )
            }))
            .map_err(err)?;

        root.present().map_err(err)?;
        Ok(())
    }

    fn render_status_pie(
        &self,
        slices: &[StatusSlice],
        messages: &Messages,
        path: &Path,
    ) -> Result<(), RenderError> {
        if slices.is_empty() {
            return Err(RenderError::new(STATUS_CHART, "no status values"));
        }
        let err = |e: DrawingAreaErrorKind<_>| RenderError::new(STATUS_CHART, e);

        let root = BitMapBackend::new(path, (800, 800)).into_drawing_area();
        root.fill(&WHITE).map_err(err)?;

        let center = (360.0_f64, 420.0_f64);
        let radius = 280.0_f64;
        let total: usize = slices.iter().map(|s| s.count).sum();

        let mut angle = FRAC_PI_2;
        for (idx, slice) in slices.iter().enumerate() {
            let sweep = 2.0 * PI * slice.count as f64 / total as f64;
            let steps = ((sweep.to_degrees()).ceil() as usize).max(2);
            let mut points = Vec::with_capacity(steps + 2);
            points.push((center.0 as i32, center.1 as i32));
            for step in 0..=steps {
                let a = angle + sweep * step as f64 / steps as f64;
                points.push((
                    (center.0 + radius * a.cos()) as i32,
                    (center.1 - radius * a.sin()) as i32,
                ));
            }
            let color = SLICE_COLORS[idx % SLICE_COLORS.len()];
            root.draw(&Polygon::new(points, color.filled())).map_err(err)?;

            let legend_y = 80 + idx as i32 * 28;
            root.draw(&Rectangle::new([(660, legend_y), (680, legend_y + 20)], color.filled()))
                .map_err(err)?;

            if self.with_text {
                let label = (FONT_FAMILY, 16).into_font();
                let mid = angle + sweep / 2.0;
                let text_pos = (
                    (center.0 + radius * 0.6 * mid.cos()) as i32 - 20,
                    (center.1 - radius * 0.6 * mid.sin()) as i32 - 8,
                );
                root.draw(&Text::new(format!("{:.1}%", slice.percent), text_pos, label.clone()))
                    .map_err(err)?;
                root.draw(&Text::new(slice.status.to_string(), (690, legend_y), label))
                    .map_err(err)?;
            }

            angle += sweep;
        }

        if self.with_text {
            root.draw(&Text::new(messages.status_dist, (40, 30), (FONT_FAMILY, 24).into_font()))
                .map_err(err)?;
        }

        root.present().map_err(err)?;
        Ok(())
    }
}
