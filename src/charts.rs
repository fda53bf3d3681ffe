use crate::dashboard::{DashboardSnapshot, Overview, RegressionOutcome};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use plotters::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use survey_analytics::geo::MAP_CENTER;
use survey_analytics::metrics::ShareRow;
use survey_analytics::monthly::MonthlyTotal;
use survey_analytics::{AggregateRow, GeoPoint, RegressionReport};

/// One PNG the dashboard can produce.
pub enum Chart<'a> {
    /// Entity totals stacked by the second key of each row.
    Stacked { title: String, rows: &'a [AggregateRow] },
    Bars { title: String, y_desc: &'static str, bars: Vec<(String, f64)> },
    Monthly { title: String, months: &'a [MonthlyTotal] },
    Scatter(&'a RegressionReport),
    Map { title: &'static str, points: &'a [GeoPoint] },
}

/// The charts a snapshot supports, keyed by file stem. Sections that were
/// not built produce no chart.
pub fn plan(snapshot: &DashboardSnapshot) -> Vec<(&'static str, Chart<'_>)> {
    let mut charts = vec![
        ("expenses_by_entity", stacked("Expenses by entity and category", &snapshot.expense_overview)),
        ("income_by_entity", stacked("Income by entity and description", &snapshot.income_overview)),
    ];

    if let Some(extremes) = snapshot.profit.as_ref().and_then(|p| p.extremes.as_ref()) {
        let mut bars = Vec::new();
        for row in [&extremes.highest, &extremes.lowest] {
            bars.push((format!("{} income", row.entity), row.income));
            bars.push((format!("{} expenses", row.entity), row.expense));
            bars.push((format!("{} profit", row.entity), row.profit));
        }
        charts.push((
            "profit_extremes",
            Chart::Bars {
                title: "Highest and lowest profit".to_string(),
                y_desc: "Quarterly amount ($)",
                bars,
            },
        ));
    }

    if let Some(focus) = &snapshot.focus {
        let subject = format!("{} ({})", focus.entity, focus.year);
        let shares = |stem: &'static str, what: &str, rows: &[ShareRow]| {
            (
                stem,
                Chart::Bars {
                    title: format!("{}: {}", subject, what),
                    y_desc: "Quarterly amount ($)",
                    bars: rows.iter().map(|r| (r.key.clone(), r.amount)).collect(),
                },
            )
        };

        charts.push(shares("entity_expense_categories", "expenses by category", &focus.expense_by_category));
        charts.push(shares("entity_income_descriptions", "income by description", &focus.income_by_description));
        charts.push(shares("entity_places", "expenses by place of purchase", &focus.expense_by_place));
        charts.push(shares("entity_payment_methods", "expenses by payment method", &focus.expense_by_payment));
        if let Some(category) = &focus.selected_category {
            charts.push(shares(
                "category_descriptions",
                &format!("'{}' by description", category),
                &focus.category_descriptions,
            ));
        }
        charts.push((
            "monthly_income",
            Chart::Monthly {
                title: format!("{}: monthly income", subject),
                months: &focus.monthly_income,
            },
        ));
    }

    if let Some(comparison) = &snapshot.category_comparison {
        charts.push((
            "category_by_entity",
            Chart::Bars {
                title: format!("'{}' expenses by entity ({})", comparison.category, comparison.year),
                y_desc: "Quarterly expense ($)",
                bars: comparison
                    .by_entity
                    .iter()
                    .map(|r| (r.label().to_string(), r.amount))
                    .collect(),
            },
        ));
    }

    if let RegressionOutcome::Fitted(report) = &snapshot.regression {
        charts.push(("income_vs_expense", Chart::Scatter(report)));
    }

    if let Some(maps) = &snapshot.maps {
        charts.push(("map_expenses", Chart::Map { title: "Expenses by state", points: &maps.expenses }));
        charts.push(("map_income", Chart::Map { title: "Income by state", points: &maps.income }));
    }

    charts
}

fn stacked<'a>(title: &str, overview: &'a Overview) -> Chart<'a> {
    Chart::Stacked {
        title: title.to_string(),
        rows: &overview.by_entity_and_detail,
    }
}

pub struct ChartRenderer {
    output_dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Render every planned chart and return the written paths.
    pub fn render_all(&self, snapshot: &DashboardSnapshot) -> Result<Vec<PathBuf>> {
        let charts = plan(snapshot);

        let pb = ProgressBar::new(charts.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} - {msg}")?,
        );

        let mut written = Vec::with_capacity(charts.len());
        for (stem, chart) in &charts {
            pb.set_message(stem.to_string());
            let path = self.output_dir.join(format!("{}.png", stem));

            let drawn = match chart {
                Chart::Stacked { title, rows } => draw_stacked(&path, title, rows)?,
                Chart::Bars { title, y_desc, bars } => draw_bars(&path, title, y_desc, bars)?,
                Chart::Monthly { title, months } => draw_monthly(&path, title, months)?,
                Chart::Scatter(report) => draw_scatter(&path, report)?,
                Chart::Map { title, points } => draw_map(&path, title, points)?,
            };

            if drawn {
                written.push(path);
            } else {
                debug!("Skipped empty chart {}", stem);
            }
            pb.inc(1);
        }

        pb.finish_with_message(format!("{} charts written", written.len()));
        Ok(written)
    }
}

/// Value range padded by 10% and always including zero.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo == hi {
        (0.0, 1.0)
    } else {
        (lo * 1.1, hi * 1.1)
    }
}

fn category_label(labels: &[String], value: &SegmentValue<usize>) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

fn bar<C: Into<ShapeStyle>>(index: usize, lo: f64, hi: f64, style: C) -> Rectangle<(SegmentValue<usize>, f64)> {
    let mut rect = Rectangle::new(
        [(SegmentValue::Exact(index), lo), (SegmentValue::Exact(index + 1), hi)],
        style,
    );
    rect.set_margin(0, 0, 4, 4);
    rect
}

fn draw_stacked(path: &Path, title: &str, rows: &[AggregateRow]) -> Result<bool> {
    let mut entities: Vec<String> = Vec::new();
    let mut details: Vec<String> = Vec::new();
    let mut values: HashMap<(usize, usize), f64> = HashMap::new();

    for row in rows {
        let (entity, detail) = match row.keys.as_slice() {
            [entity, detail, ..] => (entity, detail),
            _ => continue,
        };
        let e = position_or_push(&mut entities, entity);
        let d = position_or_push(&mut details, detail);
        *values.entry((e, d)).or_insert(0.0) += row.amount;
    }

    if entities.is_empty() {
        return Ok(false);
    }

    let mut totals = vec![0.0; entities.len()];
    for (&(e, _), v) in &values {
        totals[e] += v;
    }
    let (y_min, y_max) = value_range(totals.iter().copied());

    let root = BitMapBackend::new(path, (1400, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(15)
        .x_label_area_size(140)
        .y_label_area_size(90)
        .build_cartesian_2d((0..entities.len()).into_segmented(), y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(entities.len())
        .x_label_formatter(&|v| category_label(&entities, v))
        .x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90))
        .y_desc("Quarterly amount ($)")
        .draw()?;

    let mut base = vec![0.0; entities.len()];
    for (d, detail) in details.iter().enumerate() {
        let color = Palette99::pick(d).to_rgba();
        let mut bars = Vec::new();
        for (e, offset) in base.iter_mut().enumerate() {
            if let Some(v) = values.get(&(e, d)) {
                bars.push(bar(e, *offset, *offset + v, color.filled()));
                *offset += v;
            }
        }

        chart
            .draw_series(bars)?
            .label(detail.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(true)
}

fn position_or_push(items: &mut Vec<String>, value: &str) -> usize {
    match items.iter().position(|item| item == value) {
        Some(i) => i,
        None => {
            items.push(value.to_string());
            items.len() - 1
        }
    }
}

fn draw_bars(path: &Path, title: &str, y_desc: &str, bars: &[(String, f64)]) -> Result<bool> {
    if bars.is_empty() {
        return Ok(false);
    }

    let labels: Vec<String> = bars.iter().map(|(label, _)| label.clone()).collect();
    let (y_min, y_max) = value_range(bars.iter().map(|(_, v)| *v));

    let root = BitMapBackend::new(path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26).into_font())
        .margin(15)
        .x_label_area_size(140)
        .y_label_area_size(90)
        .build_cartesian_2d((0..labels.len()).into_segmented(), y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|v| category_label(&labels, v))
        .x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90))
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
        let style = if *value >= 0.0 { BLUE.filled() } else { RED.filled() };
        bar(i, 0.0, *value, style)
    }))?;

    root.present()?;
    Ok(true)
}

fn draw_monthly(path: &Path, title: &str, months: &[MonthlyTotal]) -> Result<bool> {
    if months.is_empty() {
        return Ok(false);
    }

    let labels: Vec<String> = months.iter().map(|m| m.label.clone()).collect();
    let (y_min, y_max) = value_range(months.iter().map(|m| m.total));

    let root = BitMapBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 26).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d((0..labels.len()).into_segmented(), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|v| category_label(&labels, v))
        .x_desc("Month")
        .y_desc("Income ($)")
        .draw()?;

    let points: Vec<(SegmentValue<usize>, f64)> = months
        .iter()
        .enumerate()
        .map(|(i, m)| (SegmentValue::CenterOf(i), m.total))
        .collect();

    chart.draw_series(LineSeries::new(points.iter().cloned(), BLUE.stroke_width(2)))?;
    chart.draw_series(points.iter().map(|p| Circle::new(p.clone(), 4, BLUE.filled())))?;

    root.present()?;
    Ok(true)
}

fn draw_scatter(path: &Path, report: &RegressionReport) -> Result<bool> {
    if report.points.is_empty() {
        return Ok(false);
    }

    let (x_min, x_max) = padded(report.points.iter().map(|p| p.income));
    let (y_min, y_max) = padded(report.points.iter().map(|p| p.expense));

    let root = BitMapBackend::new(path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Total income vs total expense by entity", ("sans-serif", 28).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Total income ($)")
        .y_desc("Total expense ($)")
        .draw()?;

    chart
        .draw_series(
            report
                .points
                .iter()
                .map(|p| Circle::new((p.income, p.expense), 5, BLUE.filled())),
        )?
        .label("Entities")
        .legend(|(x, y)| Circle::new((x + 5, y), 5, BLUE.filled()));

    let fit = report.fit;
    chart
        .draw_series(LineSeries::new(
            [(x_min, fit.predict(x_min)), (x_max, fit.predict(x_max))],
            RED.stroke_width(2),
        ))?
        .label(format!("expense = {:.4} × income + {:.2}", fit.slope, fit.intercept))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], &RED));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(true)
}

/// Min/max with 5% padding on each side; a single value gets a unit band.
fn padded(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad, hi + pad)
}

fn draw_map(path: &Path, title: &str, points: &[GeoPoint]) -> Result<bool> {
    if points.is_empty() {
        return Ok(false);
    }

    let (center_lat, center_lng) = MAP_CENTER;
    let lat_span = points
        .iter()
        .map(|p| (p.latitude - center_lat).abs())
        .fold(5.0, f64::max)
        + 1.0;
    let lng_span = points
        .iter()
        .map(|p| (p.longitude - center_lng).abs())
        .fold(8.0, f64::max)
        + 1.0;
    let max_value = points.iter().map(|p| p.value).fold(0.0, f64::max);

    let root = BitMapBackend::new(path, (1100, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (center_lng - lng_span)..(center_lng + lng_span),
            (center_lat - lat_span)..(center_lat + lat_span),
        )?;

    chart
        .configure_mesh()
        .x_desc("Longitude")
        .y_desc("Latitude")
        .draw()?;

    chart.draw_series(points.iter().map(|p| {
        let radius = if max_value > 0.0 && p.value > 0.0 {
            4.0 + 26.0 * (p.value / max_value).sqrt()
        } else {
            3.0
        };
        let style = if p.matched {
            RGBColor(200, 80, 30).mix(0.6).filled()
        } else {
            BLACK.mix(0.3).filled()
        };
        Circle::new((p.longitude, p.latitude), radius as i32, style)
    }))?;

    chart.draw_series(points.iter().map(|p| {
        Text::new(
            p.label.clone(),
            (p.longitude, p.latitude),
            ("sans-serif", 11).into_font(),
        )
    }))?;

    root.present()?;
    Ok(true)
}
