//! SVG charts for evaluation runs, drawn with `plotters`.
//!
//! Every chart carries a caption, axis descriptions and a legend. Text is
//! written as SVG `<text>` elements, so no system font is needed at render
//! time.

use crate::error::{EvalError, Result};
use crate::metrics::{percentile, TrackingErrors, NIS_TARGET};
use plotters::coord::ranged1d::{KeyPointHint, NoDefaultFormatting, ValueFormatter};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::combinators::WithKeyPoints;
use plotters::prelude::*;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracker_core::Mode;

pub const WIDTH: u32 = 1000;
pub const HEIGHT: u32 = 600;

/// Bins of the NIS histogram.
pub const NIS_BINS: usize = 60;

type DrawResult = std::result::Result<(), Box<dyn Error>>;

fn mode_colour(mode: Mode) -> RGBColor {
    match mode {
        Mode::Baseline => RGBColor(0, 114, 178),
        Mode::A1 => RGBColor(230, 159, 0),
    }
}

/// `pos_rmse` then `vel_rmse`, per mode.
fn rmse_colours(mode: Mode) -> [RGBColor; 2] {
    match mode {
        Mode::Baseline => [RGBColor(0, 114, 178), RGBColor(86, 180, 233)],
        Mode::A1 => [RGBColor(213, 94, 0), RGBColor(230, 159, 0)],
    }
}

const REFERENCE: RGBColor = RGBColor(204, 0, 0);

fn finite_max<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    values
        .into_iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max)
}

/// Upper end of a value axis: never empty, with a little headroom.
fn axis_top(max: f64, headroom: f64) -> f64 {
    (max * headroom).max(1e-3)
}

/// Bin `values` into `bins` equal-width bins over `[0, upper]`; values above
/// `upper` go to the last bin, non-finite values are dropped.
pub fn histogram(values: &[f64], bins: usize, upper: f64) -> Vec<usize> {
    let mut counts = vec![0; bins];
    if bins == 0 || upper <= 0.0 {
        return counts;
    }
    for &v in values.iter().filter(|v| v.is_finite()) {
        let i = ((v.max(0.0) / upper) * bins as f64) as usize;
        counts[i.min(bins - 1)] += 1;
    }
    counts
}

fn draw_position_error(path: &Path, scenario: &str, series: &[(Mode, Vec<f64>)]) -> DrawResult {
    let len = series.iter().map(|(_, s)| s.len()).max().unwrap_or(0).max(2);
    let top = axis_top(finite_max(series.iter().flat_map(|(_, s)| s)), 1.05);

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{scenario}: position error per step"), ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..(len - 1) as f64, 0f64..top)?;

    chart.configure_mesh().x_desc("k").y_desc("pos_error").draw()?;

    for (mode, errors) in series {
        let colour = mode_colour(*mode);
        let points = errors
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_finite())
            .map(|(k, &e)| (k as f64, e));
        chart
            .draw_series(LineSeries::new(points, colour))?
            .label(mode.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], colour));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

fn draw_nis_histogram(path: &Path, scenario: &str, mode: Mode, nis: &[f64]) -> DrawResult {
    let mut sorted: Vec<f64> = nis.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    let upper = percentile(&sorted, 99.0).max(NIS_TARGET * 4.0);
    let counts = histogram(&sorted, NIS_BINS, upper);
    let top = axis_top(counts.iter().copied().max().unwrap_or(0).max(1) as f64, 1.1);
    let width = upper / NIS_BINS as f64;
    let colour = mode_colour(mode);

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{scenario} ({mode}): NIS histogram"), ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..upper, 0f64..top)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("NIS")
        .y_desc("count")
        .draw()?;

    chart
        .draw_series(counts.iter().enumerate().map(|(i, &count)| {
            let x0 = i as f64 * width;
            Rectangle::new([(x0, 0.0), (x0 + width, count as f64)], colour.mix(0.6).filled())
        }))?
        .label(format!("{mode}, {} samples", sorted.len()))
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 14, y + 5)], colour.filled()));

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(NIS_TARGET, 0.0), (NIS_TARGET, top)],
            REFERENCE,
        )))?
        .label("consistent mean (2)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], REFERENCE));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

fn draw_r_trajectory(path: &Path, scenario: &str, r: &[f64], r_true: f64) -> DrawResult {
    let len = r.len().max(2);
    let top = axis_top(finite_max(r.iter().chain(std::iter::once(&r_true))), 1.1);
    let colour = mode_colour(Mode::A1);

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{scenario} (a1): measurement noise r"), ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..(len - 1) as f64, 0f64..top)?;

    chart.configure_mesh().x_desc("k").y_desc("r").draw()?;

    let points = r
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(k, &v)| (k as f64, v));
    chart
        .draw_series(LineSeries::new(points, colour))?
        .label("r (a1)")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], colour));

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(0.0, r_true), ((len - 1) as f64, r_true)],
            REFERENCE,
        )))?
        .label("true sigma_z^2")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], REFERENCE));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// `WithKeyPoints<RangedCoordf64>` has no `ValueFormatter` impl in plotters
/// 0.3.7, which `configure_mesh` requires; this forwards everything to it.
struct KeyPointsAxis(WithKeyPoints<RangedCoordf64>);

impl Ranged for KeyPointsAxis {
    type FormatOption = NoDefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.0.map(value, limit)
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        self.0.key_points(hint)
    }

    fn range(&self) -> std::ops::Range<f64> {
        self.0.range()
    }

    fn axis_pixel_range(&self, limit: (i32, i32)) -> std::ops::Range<i32> {
        self.0.axis_pixel_range(limit)
    }
}

impl ValueFormatter<f64> for KeyPointsAxis {
    fn format(value: &f64) -> String {
        <RangedCoordf64 as ValueFormatter<f64>>::format(value)
    }
}

fn draw_rmse_bars(path: &Path, groups: &[(String, Vec<(Mode, TrackingErrors)>)]) -> DrawResult {
    let top = axis_top(
        finite_max(
            groups
                .iter()
                .flat_map(|(_, bars)| bars.iter().flat_map(|(_, e)| [&e.pos_rmse, &e.vel_rmse])),
        ),
        1.1,
    );
    let n = groups.len().max(1);
    let centres: Vec<f64> = (0..n).map(|g| g as f64 + 0.5).collect();
    let names = |x: &f64| {
        groups
            .get(x.floor().max(0.0) as usize)
            .map(|(name, _)| name.clone())
            .unwrap_or_default()
    };

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("RMSE per scenario", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(KeyPointsAxis((0f64..n as f64).with_key_points(centres)), 0f64..top)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("scenario")
        .y_desc("rmse")
        .x_label_formatter(&names)
        .draw()?;

    // One bar per (mode, metric) inside each scenario slot; the legend entry
    // is attached to the first scenario's bar only.
    let modes: Vec<Mode> = groups
        .first()
        .map(|(_, bars)| bars.iter().map(|(m, _)| *m).collect())
        .unwrap_or_default();
    let slots = (modes.len() * 2).max(1);
    let slot = 0.8 / slots as f64;

    for (b, &mode) in modes.iter().enumerate() {
        for (metric, name) in ["pos_rmse", "vel_rmse"].into_iter().enumerate() {
            let colour = rmse_colours(mode)[metric];
            let offset = 0.1 + (2 * b + metric) as f64 * slot;
            let rects = groups.iter().enumerate().filter_map(|(g, (_, bars))| {
                let errors = bars.iter().find(|(m, _)| *m == mode)?.1;
                let value = if metric == 0 { errors.pos_rmse } else { errors.vel_rmse };
                value.is_finite().then(|| {
                    let x0 = g as f64 + offset;
                    Rectangle::new([(x0, 0.0), (x0 + slot * 0.9, value)], colour.filled())
                })
            });
            chart
                .draw_series(rects)?
                .label(format!("{name} ({mode})"))
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 14, y + 5)], colour.filled()));
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Writes the evaluation charts into one directory.
#[derive(Clone, Debug)]
pub struct PlotWriter {
    dir: PathBuf,
    prefix: String,
}

impl PlotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: String::new(),
        }
    }

    /// Prefix every file name, e.g. `smoke_`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| EvalError::io(&self.dir, e))?;
        Ok(self.dir.join(format!("{}{name}", self.prefix)))
    }

    fn finish(path: PathBuf, drawn: DrawResult) -> Result<PathBuf> {
        drawn.map_err(|e| EvalError::Plot {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        debug!(path = %path.display(), "wrote chart");
        Ok(path)
    }

    /// Per-step position error, one line per mode.
    pub fn position_error(&self, scenario: &str, series: &[(Mode, Vec<f64>)]) -> Result<PathBuf> {
        let path = self.path(&format!("{scenario}_pos_error.svg"))?;
        let drawn = draw_position_error(&path, scenario, series);
        Self::finish(path, drawn)
    }

    /// NIS histogram with a marker at the consistent mean of 2.
    pub fn nis_histogram(&self, scenario: &str, mode: Mode, nis: &[f64]) -> Result<PathBuf> {
        let path = self.path(&format!("{scenario}_{mode}_nis_hist.svg"))?;
        let drawn = draw_nis_histogram(&path, scenario, mode, nis);
        Self::finish(path, drawn)
    }

    /// Measurement-noise trajectory of an adaptive run, with the true `σ²`.
    pub fn r_trajectory(&self, scenario: &str, r: &[f64], r_true: f64) -> Result<PathBuf> {
        let path = self.path(&format!("{scenario}_a1_r.svg"))?;
        let drawn = draw_r_trajectory(&path, scenario, r, r_true);
        Self::finish(path, drawn)
    }

    /// Position and velocity RMSE per scenario, one bar pair per mode.
    pub fn rmse_bars(&self, groups: &[(String, Vec<(Mode, TrackingErrors)>)]) -> Result<PathBuf> {
        let path = self.path("rmse_summary.svg")?;
        let drawn = draw_rmse_bars(&path, groups);
        Self::finish(path, drawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(pos_rmse: f64, vel_rmse: f64) -> TrackingErrors {
        TrackingErrors { pos_rmse, vel_rmse }
    }

    #[test]
    fn histogram_clamps_into_last_bin() {
        let counts = histogram(&[0.0, 0.5, 1.0, 9.0, 100.0, f64::NAN], 4, 8.0);
        assert_eq!(counts, vec![3, 0, 0, 2]);
        assert_eq!(counts.iter().sum::<usize>(), 5);
    }

    #[test]
    fn charts_carry_captions_axis_labels_and_legends() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PlotWriter::new(dir.path().join("plots")).with_prefix("smoke_");
        let read = |p: &Path| std::fs::read_to_string(p).unwrap();

        let pos: Vec<f64> = (0..50).map(|i| (i as f64 * 0.2).sin().abs()).collect();
        let p = writer
            .position_error("cv", &[(Mode::Baseline, pos.clone()), (Mode::A1, pos)])
            .unwrap();
        assert!(p.ends_with("smoke_cv_pos_error.svg"));
        let svg = read(&p);
        assert!(svg.contains("<svg"));
        for text in ["cv: position error per step", "pos_error", "baseline", "a1"] {
            assert!(svg.contains(text), "missing {text}");
        }

        let nis: Vec<f64> = (0..200).map(|i| (i % 7) as f64).collect();
        let svg = read(&writer.nis_histogram("cv", Mode::Baseline, &nis).unwrap());
        for text in ["NIS histogram", "count", "200 samples", "consistent mean"] {
            assert!(svg.contains(text), "missing {text}");
        }

        let svg = read(&writer.r_trajectory("cv", &[4.0, 4.5, 5.0], 4.0).unwrap());
        assert!(svg.contains("measurement noise r") && svg.contains("true sigma_z^2"));
    }

    #[test]
    fn rmse_summary_shows_position_and_velocity_bars() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PlotWriter::new(dir.path());
        let groups = vec![
            (
                "cv".to_string(),
                vec![(Mode::Baseline, errors(1.0, 0.5)), (Mode::A1, errors(0.9, f64::NAN))],
            ),
            (
                "clutter".to_string(),
                vec![(Mode::Baseline, errors(3.0, 2.0)), (Mode::A1, errors(2.5, 1.5))],
            ),
        ];
        let path = writer.rmse_bars(&groups).unwrap();
        assert!(path.ends_with("rmse_summary.svg"));

        let svg = std::fs::read_to_string(path).unwrap();
        for text in [
            "RMSE per scenario",
            "pos_rmse (baseline)",
            "vel_rmse (baseline)",
            "pos_rmse (a1)",
            "vel_rmse (a1)",
            "clutter",
        ] {
            assert!(svg.contains(text), "missing {text}");
        }
    }

    #[test]
    fn empty_series_still_render() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PlotWriter::new(dir.path());
        assert!(writer.position_error("cv", &[]).unwrap().is_file());
        assert!(writer.nis_histogram("cv", Mode::A1, &[]).unwrap().is_file());
        assert!(writer.rmse_bars(&[]).unwrap().is_file());
    }
}
