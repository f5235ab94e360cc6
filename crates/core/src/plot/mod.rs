//! SVG forecast chart.
//!
//! The renderer only lays out numbers it is handed; it never refits or
//! rounds the forecast itself. Layout happens here, markup lives in the
//! `forecast.svg.tera` template.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::info;

use crate::domain::forecast::ForecastPoint;
use crate::domain::product::ProductId;
use crate::domain::sales::Observation;

const TEMPLATE_NAME: &str = "forecast.svg";
const DEFAULT_WIDTH: u32 = 900;
const DEFAULT_HEIGHT: u32 = 420;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 48.0;
const MARGIN_BOTTOM: f64 = 48.0;
const TICK_COUNT: usize = 5;
const HISTORY_COLOR: &str = "#111827";
const FORECAST_COLOR: &str = "#2563eb";

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("template error: {0}")]
    Template(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug)]
pub struct PlotRenderer {
    tera: Tera,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct Frame {
    left: String,
    right: String,
    top: String,
    bottom: String,
}

#[derive(Serialize)]
struct Tick {
    x: String,
    y: String,
    label: String,
}

#[derive(Serialize)]
struct Marker {
    x: String,
    y: String,
    color: &'static str,
}

struct Scale {
    origin: Option<NaiveDate>,
    span_days: f64,
    y_min: f64,
    y_max: f64,
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl Scale {
    fn fit(width: u32, height: u32, history: &[Observation], forecast: &[ForecastPoint]) -> Self {
        let dates = history.iter().map(|obs| obs.date).chain(forecast.iter().map(|p| p.date));
        let first = dates.clone().min();
        let last = dates.max();
        let (origin, span_days) = match (first, last) {
            (Some(first), Some(last)) => (Some(first), (last - first).num_days() as f64),
            _ => (None, 0.0),
        };

        let values = history
            .iter()
            .map(|obs| obs.quantity)
            .chain(forecast.iter().flat_map(|p| [p.lower_bound, p.point_estimate, p.upper_bound]))
            .filter(|value| value.is_finite());
        let (mut y_min, mut y_max) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), value| {
            (lo.min(value), hi.max(value))
        });
        if y_max - y_min < f64::EPSILON {
            y_max = y_min + 1.0;
        }
        y_max += (y_max - y_min) * 0.05;
        if y_min < 0.0 {
            y_min -= (y_max - y_min) * 0.05;
        }

        Self {
            origin,
            span_days,
            y_min,
            y_max,
            left: MARGIN_LEFT,
            right: f64::from(width) - MARGIN_RIGHT,
            top: MARGIN_TOP,
            bottom: f64::from(height) - MARGIN_BOTTOM,
        }
    }

    fn x(&self, date: NaiveDate) -> f64 {
        let Some(origin) = self.origin.filter(|_| self.span_days > 0.0) else {
            return (self.left + self.right) / 2.0;
        };
        let offset = (date - origin).num_days() as f64;
        self.left + (self.right - self.left) * offset / self.span_days
    }

    fn y(&self, value: f64) -> f64 {
        let value = if value.is_finite() { value } else { self.y_min };
        self.bottom - (self.bottom - self.top) * (value - self.y_min) / (self.y_max - self.y_min)
    }
}

fn coord(value: f64) -> String {
    format!("{value:.1}")
}

fn pair(x: f64, y: f64) -> String {
    format!("{},{}", coord(x), coord(y))
}

fn polyline<I>(points: I) -> String
where
    I: IntoIterator<Item = (f64, f64)>,
{
    points.into_iter().map(|(x, y)| pair(x, y)).collect::<Vec<_>>().join(" ")
}

/// File name of the chart for one product. Characters outside
/// `[A-Za-z0-9_-]` are replaced so the id can never escape the output dir.
pub fn artifact_file_name(product_id: &ProductId) -> String {
    let safe: String = product_id
        .0
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    format!("forecast_{safe}.svg")
}

impl PlotRenderer {
    pub fn new() -> Result<Self, PlotError> {
        Self::with_size(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    pub fn with_size(width: u32, height: u32) -> Result<Self, PlotError> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            TEMPLATE_NAME,
            include_str!("../../../../templates/plots/forecast.svg.tera"),
        )
        .map_err(|e| PlotError::Template(e.to_string()))?;
        Ok(Self { tera, width: width.max(200), height: height.max(150) })
    }

    /// Renders the chart to an SVG document.
    pub fn render(
        &self,
        title: &str,
        history: &[Observation],
        forecast: &[ForecastPoint],
    ) -> Result<String, PlotError> {
        let scale = Scale::fit(self.width, self.height, history, forecast);

        let history_line =
            polyline(history.iter().map(|obs| (scale.x(obs.date), scale.y(obs.quantity))));
        let forecast_line = polyline(
            forecast.iter().map(|point| (scale.x(point.date), scale.y(point.point_estimate))),
        );
        let band = if forecast.is_empty() {
            String::new()
        } else {
            let upper = forecast.iter().map(|p| (scale.x(p.date), scale.y(p.upper_bound)));
            let lower = forecast.iter().rev().map(|p| (scale.x(p.date), scale.y(p.lower_bound)));
            polyline(upper.chain(lower))
        };

        let mut markers: Vec<Marker> = history
            .iter()
            .map(|obs| Marker {
                x: coord(scale.x(obs.date)),
                y: coord(scale.y(obs.quantity)),
                color: HISTORY_COLOR,
            })
            .collect();
        markers.extend(forecast.iter().map(|point| Marker {
            x: coord(scale.x(point.date)),
            y: coord(scale.y(point.point_estimate)),
            color: FORECAST_COLOR,
        }));

        let y_ticks: Vec<Tick> = (0..TICK_COUNT)
            .map(|step| {
                let value = scale.y_min
                    + (scale.y_max - scale.y_min) * step as f64 / (TICK_COUNT - 1) as f64;
                Tick {
                    x: coord(scale.left - 6.0),
                    y: coord(scale.y(value)),
                    label: format!("{value:.1}"),
                }
            })
            .collect();
        let x_ticks = self.date_ticks(&scale);

        let mut context = Context::new();
        context.insert("width", &self.width);
        context.insert("height", &self.height);
        context.insert("center_x", &coord(f64::from(self.width) / 2.0));
        context.insert("legend_y", &coord(scale.top - 8.0));
        context.insert("axis_label_y", &coord(f64::from(self.height) - 6.0));
        context.insert("title", title);
        context.insert(
            "frame",
            &Frame {
                left: coord(scale.left),
                right: coord(scale.right),
                top: coord(scale.top),
                bottom: coord(scale.bottom),
            },
        );
        context.insert("y_ticks", &y_ticks);
        context.insert("x_ticks", &x_ticks);
        context.insert("band", &band);
        context.insert("history_line", &history_line);
        context.insert("forecast_line", &forecast_line);
        context.insert("markers", &markers);

        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| PlotError::Template(e.to_string()))
    }

    /// Renders the chart and writes it as `forecast_<product_id>.svg` under
    /// `output_dir`, creating the directory when needed.
    pub fn render_to_dir(
        &self,
        output_dir: &Path,
        product_id: &ProductId,
        title: &str,
        history: &[Observation],
        forecast: &[ForecastPoint],
    ) -> Result<PathBuf, PlotError> {
        let svg = self.render(title, history, forecast)?;
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(artifact_file_name(product_id));
        fs::write(&path, svg)?;

        info!(
            event_name = "core.plot.written",
            product_id = %product_id,
            path = %path.display(),
            history_points = history.len(),
            forecast_points = forecast.len(),
            "forecast chart written"
        );
        Ok(path)
    }

    fn date_ticks(&self, scale: &Scale) -> Vec<Tick> {
        let Some(origin) = scale.origin else {
            return Vec::new();
        };
        let label_y = coord(scale.bottom + 16.0);
        let span = scale.span_days as i64;
        let steps = (TICK_COUNT as i64 - 1).min(span).max(0);

        let mut ticks = Vec::new();
        let mut last_offset = None;
        for step in 0..=steps {
            let offset = if steps == 0 { 0 } else { span * step / steps };
            if last_offset == Some(offset) {
                continue;
            }
            last_offset = Some(offset);
            let date = origin + Duration::days(offset);
            ticks.push(Tick {
                x: coord(scale.x(date)),
                y: label_y.clone(),
                label: date.format("%Y-%m-%d").to_string(),
            });
        }
        ticks
    }
}
