use crate::data::dataset::Dataset;
use crate::report::{ChartKind, ChartSpec};
use crate::{FieldfolioError, Result};
use plotters::prelude::*;
use std::collections::HashMap;

pub const CHART_WIDTH: u32 = 800;
pub const CHART_HEIGHT: u32 = 600;

/// Fixed bin count for histograms; a degenerate range (min == max)
/// collapses to a single bin instead of failing.
pub const HISTOGRAM_BINS: usize = 10;

/// Group limits carried over from the original report defaults.
pub const MAX_BAR_GROUPS: usize = 10;
pub const MAX_PIE_SLICES: usize = 8;

/// Render one chart to PNG bytes. Charts draw geometry only (bars,
/// wedges, points, axis lines); titles are typeset by the document
/// assembler, so no system fonts are needed here.
pub fn render(dataset: &Dataset, spec: &ChartSpec) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root =
            BitMapBackend::with_buffer(&mut buf, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;

        match spec.kind {
            ChartKind::Bar => draw_bar(&root, dataset, spec)?,
            ChartKind::Pie => draw_pie(&root, dataset, spec)?,
            ChartKind::Histogram => draw_histogram(&root, dataset, spec)?,
            ChartKind::Scatter => draw_scatter(&root, dataset, spec)?,
            ChartKind::Line => draw_line(&root, dataset, spec)?,
        }

        root.present().map_err(draw_error)?;
    }
    encode_png(buf)
}

fn draw_error<E: std::fmt::Display>(e: E) -> FieldfolioError {
    FieldfolioError::Chart(e.to_string())
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, plotters::coord::Shift>;

fn draw_bar(root: &Area, dataset: &Dataset, spec: &ChartSpec) -> Result<()> {
    let mut counts = aggregate_counts(dataset, &spec.x)?;
    counts.truncate(MAX_BAR_GROUPS);
    if counts.is_empty() {
        return Err(FieldfolioError::Chart(format!(
            "column '{}' has no values to chart",
            spec.x
        )));
    }

    let n = counts.len() as f64;
    let max = counts.iter().map(|c| c.1).max().unwrap_or(1) as f64;
    let mut chart = ChartBuilder::on(root)
        .margin(24)
        .build_cartesian_2d(0f64..n, 0f64..max * 1.1)
        .map_err(draw_error)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(i, (_, count))| {
            Rectangle::new(
                [(i as f64 + 0.15, 0.0), (i as f64 + 0.85, *count as f64)],
                Palette99::pick(i).filled(),
            )
        }))
        .map_err(draw_error)?;

    // Baseline under the bars.
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(0.0, 0.0), (n, 0.0)],
            BLACK.stroke_width(2),
        )))
        .map_err(draw_error)?;

    Ok(())
}

fn draw_pie(root: &Area, dataset: &Dataset, spec: &ChartSpec) -> Result<()> {
    let mut counts = aggregate_counts(dataset, &spec.x)?;
    counts.truncate(MAX_PIE_SLICES);
    let total: f64 = counts.iter().map(|c| c.1 as f64).sum();
    if total == 0.0 {
        return Err(FieldfolioError::Chart(format!(
            "column '{}' has no values to chart",
            spec.x
        )));
    }

    let mut chart = ChartBuilder::on(root)
        .margin(24)
        .build_cartesian_2d(-1.2f64..1.2, -1.2f64..1.2)
        .map_err(draw_error)?;

    let mut start = -std::f64::consts::FRAC_PI_2;
    for (i, (_, count)) in counts.iter().enumerate() {
        let fraction = *count as f64 / total;
        let end = start + fraction * std::f64::consts::TAU;
        let steps = ((fraction * 120.0).ceil() as usize).max(2);

        let mut points = vec![(0.0, 0.0)];
        for step in 0..=steps {
            let angle = start + (end - start) * step as f64 / steps as f64;
            points.push((angle.cos(), angle.sin()));
        }

        chart
            .draw_series(std::iter::once(Polygon::new(
                points,
                Palette99::pick(i).filled(),
            )))
            .map_err(draw_error)?;
        start = end;
    }

    Ok(())
}

fn draw_histogram(root: &Area, dataset: &Dataset, spec: &ChartSpec) -> Result<()> {
    let values = numeric_column(dataset, &spec.x)?;
    let bins = histogram_bins(&values, HISTOGRAM_BINS);
    if bins.is_empty() {
        return Err(FieldfolioError::Chart(format!(
            "column '{}' has no numeric values for a histogram",
            spec.x
        )));
    }

    let x_min = bins[0].0;
    let x_max = bins[bins.len() - 1].1.max(x_min + 1.0);
    let max_count = bins.iter().map(|b| b.2).max().unwrap_or(1) as f64;

    let mut chart = ChartBuilder::on(root)
        .margin(24)
        .build_cartesian_2d(x_min..x_max, 0f64..max_count * 1.1)
        .map_err(draw_error)?;

    chart
        .draw_series(bins.iter().map(|(low, high, count)| {
            Rectangle::new([(*low, 0.0), (*high, *count as f64)], BLUE.mix(0.6).filled())
        }))
        .map_err(draw_error)?;

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(x_min, 0.0), (x_max, 0.0)],
            BLACK.stroke_width(2),
        )))
        .map_err(draw_error)?;

    Ok(())
}

fn draw_scatter(root: &Area, dataset: &Dataset, spec: &ChartSpec) -> Result<()> {
    let points = paired_numeric(dataset, spec)?;
    let ((x_min, x_max), (y_min, y_max)) = bounds(&points)?;

    let mut chart = ChartBuilder::on(root)
        .margin(24)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(draw_error)?;

    chart
        .draw_series(
            points
                .iter()
                .map(|(x, y)| Circle::new((*x, *y), 3, BLUE.mix(0.7).filled())),
        )
        .map_err(draw_error)?;

    Ok(())
}

fn draw_line(root: &Area, dataset: &Dataset, spec: &ChartSpec) -> Result<()> {
    let mut points = paired_numeric(dataset, spec)?;
    points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let ((x_min, x_max), (y_min, y_max)) = bounds(&points)?;

    let mut chart = ChartBuilder::on(root)
        .margin(24)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(draw_error)?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(2)))
        .map_err(draw_error)?;

    Ok(())
}

/// Row counts grouped by the column's distinct values, descending count,
/// ties broken lexically for determinism. Nulls are not a group.
pub(crate) fn aggregate_counts(dataset: &Dataset, column: &str) -> Result<Vec<(String, usize)>> {
    let values = dataset.column_values(column).ok_or_else(|| {
        FieldfolioError::Chart(format!("column '{}' not present in dataset", column))
    })?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values.filter(|v| !v.is_null()) {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }

    let mut groups: Vec<(String, usize)> = counts.into_iter().collect();
    groups.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(groups)
}

fn numeric_column(dataset: &Dataset, column: &str) -> Result<Vec<f64>> {
    let values = dataset.column_values(column).ok_or_else(|| {
        FieldfolioError::Chart(format!("column '{}' not present in dataset", column))
    })?;
    Ok(values.filter_map(|v| v.as_f64()).collect())
}

/// Paired numeric values for scatter/line. Rows with a null or
/// non-numeric cell in either column are excluded from the chart only;
/// the dataset itself is untouched.
pub(crate) fn paired_numeric(dataset: &Dataset, spec: &ChartSpec) -> Result<Vec<(f64, f64)>> {
    let y_name = spec.y.as_deref().ok_or_else(|| {
        FieldfolioError::Chart(format!("{} chart '{}' is missing a y column", spec.kind, spec.x))
    })?;

    let x_idx = dataset.column_index(&spec.x).ok_or_else(|| {
        FieldfolioError::Chart(format!("column '{}' not present in dataset", spec.x))
    })?;
    let y_idx = dataset.column_index(y_name).ok_or_else(|| {
        FieldfolioError::Chart(format!("column '{}' not present in dataset", y_name))
    })?;

    let points: Vec<(f64, f64)> = dataset
        .rows()
        .iter()
        .filter_map(|row| match (row[x_idx].as_f64(), row[y_idx].as_f64()) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        })
        .collect();

    if points.is_empty() {
        return Err(FieldfolioError::Chart(format!(
            "no rows with numeric '{}' and '{}' values",
            spec.x, y_name
        )));
    }
    Ok(points)
}

fn bounds(points: &[(f64, f64)]) -> Result<((f64, f64), (f64, f64))> {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &(x, y) in points {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    // Pad degenerate ranges so the coordinate system stays non-empty.
    if x_min == x_max {
        x_max = x_min + 1.0;
    }
    if y_min == y_max {
        y_max = y_min + 1.0;
    }
    Ok(((x_min, x_max), (y_min, y_max)))
}

/// Fixed-width binning over [min, max]. Values on the top edge land in
/// the last bin. A degenerate range collapses to one bin holding
/// everything.
pub(crate) fn histogram_bins(values: &[f64], bin_count: usize) -> Vec<(f64, f64, usize)> {
    if values.is_empty() || bin_count == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![(min, max, values.len())];
    }

    let width = (max - min) / bin_count as f64;
    let mut bins = vec![0usize; bin_count];
    for &value in values {
        let idx = (((value - min) / width) as usize).min(bin_count - 1);
        bins[idx] += 1;
    }

    bins.iter()
        .enumerate()
        .map(|(i, &count)| {
            (
                min + i as f64 * width,
                min + (i + 1) as f64 * width,
                count,
            )
        })
        .collect()
}

fn encode_png(buf: Vec<u8>) -> Result<Vec<u8>> {
    let img = image::RgbImage::from_raw(CHART_WIDTH, CHART_HEIGHT, buf)
        .ok_or_else(|| FieldfolioError::Chart("chart buffer size mismatch".to_string()))?;

    let mut bytes = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut bytes);
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| FieldfolioError::Chart(e.to_string()))?;
    Ok(bytes)
}
