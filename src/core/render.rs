//! Draws [`ChartSpec`]s onto any plotters backend.
//!
//! The same drawing code serves the SVG chart files and the PDF report pages.

use crate::core::charts::{ChartBody, ChartSpec, LegendPosition, PieSlice};
use crate::utils::error::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use std::f64::consts::PI;

pub const CHART_SIZE: (u32, u32) = (900, 450);

const TITLE_FONT_SIZE: f64 = 18.0;
const LABEL_FONT_SIZE: f64 = 13.0;
const EMPTY_MESSAGE: &str = "No data to show";

fn font(size: f64) -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, size, FontStyle::Normal)
}

/// Renders one chart to an SVG document.
pub fn render_svg(spec: &ChartSpec, size: (u32, u32)) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        draw_chart(&root, spec)?;
        root.present()?;
    }
    Ok(svg)
}

pub fn draw_chart<DB>(area: &DrawingArea<DB, Shift>, spec: &ChartSpec) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    area.fill(&WHITE)?;

    if spec.is_empty() {
        let (w, h) = area.dim_in_pixel();
        area.draw(&Text::new(
            spec.title.clone(),
            (10, 10),
            font(TITLE_FONT_SIZE).color(&BLACK),
        ))?;
        area.draw(&Text::new(
            EMPTY_MESSAGE,
            (w as i32 / 2 - 50, h as i32 / 2),
            font(LABEL_FONT_SIZE).color(&BLACK.mix(0.6)),
        ))?;
        return Ok(());
    }

    match &spec.body {
        ChartBody::Pie { slices } => draw_pie(area, spec, slices),
        ChartBody::Bars {
            categories,
            series,
            integer_values,
        } => draw_bars(area, spec, categories, series, *integer_values),
        ChartBody::Scatter { .. } => draw_scatter(area, spec),
    }
}

fn draw_pie<DB>(area: &DrawingArea<DB, Shift>, spec: &ChartSpec, slices: &[PieSlice]) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let body = area.titled(&spec.title, font(TITLE_FONT_SIZE).color(&BLACK))?;
    let (w, h) = body.dim_in_pixel();

    let legend_height = if spec.legend == LegendPosition::Top {
        draw_top_legend(
            &body,
            slices.iter().map(|s| (s.label.as_str(), s.color)),
            w,
        )?
    } else {
        0
    };

    let total: f64 = slices.iter().map(|s| s.value.max(0.0)).sum();
    let center = (w as i32 / 2, legend_height + (h as i32 - legend_height) / 2);
    let radius = ((w as i32).min(h as i32 - legend_height) / 2 - 10).max(10) as f64;

    if total <= 0.0 {
        body.draw(&Circle::new(center, radius as i32, BLACK.mix(0.2).stroke_width(1)))?;
        return Ok(());
    }

    // Clockwise from twelve o'clock.
    let mut angle = -PI / 2.0;
    for slice in slices {
        let sweep = slice.value.max(0.0) / total * 2.0 * PI;
        if sweep <= 0.0 {
            continue;
        }
        let steps = ((sweep / (2.0 * PI)) * 90.0).ceil().max(2.0) as usize;
        let mut points = vec![center];
        for step in 0..=steps {
            let a = angle + sweep * step as f64 / steps as f64;
            points.push((
                center.0 + (radius * a.cos()).round() as i32,
                center.1 + (radius * a.sin()).round() as i32,
            ));
        }
        body.draw(&Polygon::new(points, slice.color.filled()))?;

        let share = slice.value / total * 100.0;
        if share >= 4.0 {
            let mid = angle + sweep / 2.0;
            let label_pos = (
                center.0 + (radius * 0.6 * mid.cos()) as i32 - 14,
                center.1 + (radius * 0.6 * mid.sin()) as i32 - 6,
            );
            body.draw(&Text::new(
                format!("{:.1}%", share),
                label_pos,
                font(LABEL_FONT_SIZE).color(&WHITE),
            ))?;
        }
        angle += sweep;
    }

    Ok(())
}

/// Draws a single legend row across the top of `area`; returns its height.
fn draw_top_legend<'a, DB, I>(area: &DrawingArea<DB, Shift>, entries: I, width: u32) -> Result<i32>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
    I: Iterator<Item = (&'a str, RGBColor)>,
{
    let row_height = 20;
    let mut x = 10;
    let mut y = 4;
    for (label, color) in entries {
        let label_width = (label.chars().count() as f64 * LABEL_FONT_SIZE * 0.55) as i32 + 30;
        if x + label_width > width as i32 && x > 10 {
            x = 10;
            y += row_height;
        }
        area.draw(&Rectangle::new([(x, y + 2), (x + 14, y + 12)], color.filled()))?;
        area.draw(&Text::new(
            label.to_string(),
            (x + 18, y),
            font(LABEL_FONT_SIZE).color(&BLACK),
        ))?;
        x += label_width;
    }
    Ok(y + row_height + 4)
}

fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let span = (max - min).max(1.0);
    let lower = if min < 0.0 { min - span * 0.05 } else { 0.0 };
    (lower, max + span * 0.1)
}

/// Category label under the centre of its slot, blank between slots.
fn category_label(categories: &[String], v: f64) -> String {
    let slot = v.floor();
    if (v - slot - 0.5).abs() > 1e-6 || slot < 0.0 {
        return String::new();
    }
    categories.get(slot as usize).cloned().unwrap_or_default()
}

fn draw_bars<DB>(
    area: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    categories: &[String],
    series: &[crate::core::charts::BarSeries],
    integer_values: bool,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let n = categories.len().max(1);
    let (y_min, y_max) = value_range(series.iter().flat_map(|s| s.values.iter().copied()));

    let mut chart = ChartBuilder::on(area)
        .caption(&spec.title, font(TITLE_FONT_SIZE))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(0f64..n as f64, y_min..y_max)?;

    let x_formatter = |v: &f64| category_label(categories, *v);
    let y_formatter = |v: &f64| {
        if integer_values {
            format!("{:.0}", v)
        } else {
            format!("{}", (v * 100.0).round() / 100.0)
        }
    };

    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_labels(2 * n + 1)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .label_style(font(LABEL_FONT_SIZE).color(&BLACK.mix(0.85)));
    if integer_values {
        mesh.y_labels(((y_max - y_min).ceil() as usize + 1).clamp(2, 11));
    }
    if let Some(x_title) = &spec.x_title {
        mesh.x_desc(x_title.as_str());
    }
    if let Some(y_title) = &spec.y_title {
        mesh.y_desc(y_title.as_str());
    }
    mesh.draw()?;

    let group_width = 0.8;
    let bar_width = group_width / series.len().max(1) as f64;
    for (s, bar_series) in series.iter().enumerate() {
        let color = bar_series.color;
        let offset = (1.0 - group_width) / 2.0 + s as f64 * bar_width;
        chart
            .draw_series(bar_series.values.iter().enumerate().map(move |(i, v)| {
                let x0 = i as f64 + offset;
                Rectangle::new([(x0, 0.0), (x0 + bar_width, *v)], color.filled())
            }))?
            .label(bar_series.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 14, y + 5)], color.filled()));
    }

    if spec.legend == LegendPosition::Top {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperMiddle)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK.mix(0.3))
            .label_font(font(LABEL_FONT_SIZE).color(&BLACK))
            .draw()?;
    }

    Ok(())
}

fn draw_scatter<DB>(area: &DrawingArea<DB, Shift>, spec: &ChartSpec) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let series = match &spec.body {
        ChartBody::Scatter { series } => series,
        _ => return Ok(()),
    };

    let xs = || series.iter().flat_map(|s| s.points.iter().map(|p| p.0));
    let ys = || series.iter().flat_map(|s| s.points.iter().map(|p| p.1));
    let (x_min, x_max) = padded_range(xs());
    let (y_min, y_max) = padded_range(ys());

    let mut chart = ChartBuilder::on(area)
        .caption(&spec.title, font(TITLE_FONT_SIZE))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let mut mesh = chart.configure_mesh();
    mesh.label_style(font(LABEL_FONT_SIZE).color(&BLACK.mix(0.85)));
    if let Some(x_title) = &spec.x_title {
        mesh.x_desc(x_title.as_str());
    }
    if let Some(y_title) = &spec.y_title {
        mesh.y_desc(y_title.as_str());
    }
    mesh.draw()?;

    for point_series in series {
        let color = point_series.color;
        chart
            .draw_series(
                point_series
                    .points
                    .iter()
                    .map(move |(x, y, _)| Circle::new((*x, *y), 5, color.mix(0.8).filled())),
            )?
            .label(point_series.label.as_str())
            .legend(move |(x, y)| Circle::new((x + 7, y), 5, color.filled()));
    }

    if spec.legend == LegendPosition::Top {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperMiddle)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK.mix(0.3))
            .label_font(font(LABEL_FONT_SIZE).color(&BLACK))
            .draw()?;
    }

    Ok(())
}

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min > max {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.1).max(1.0);
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregation::{histogram, scatter_series, type_averages};
    use crate::core::charts::{
        histogram_chart, scatter_chart, type_averages_chart, type_distribution_chart,
    };
    use crate::domain::model::TypeCount;

    #[test]
    fn test_category_label_only_at_slot_centres() {
        let categories = vec!["Pump".to_string(), "Valve".to_string()];
        assert_eq!(category_label(&categories, 0.5), "Pump");
        assert_eq!(category_label(&categories, 1.5), "Valve");
        assert_eq!(category_label(&categories, 1.0), "");
        assert_eq!(category_label(&categories, 2.5), "");
    }

    #[test]
    fn test_value_range_includes_zero() {
        assert_eq!(value_range([5.0, 10.0].into_iter()), (0.0, 11.0));
        let (lo, hi) = value_range([-4.0, 6.0].into_iter());
        assert!(lo < -4.0 && hi > 6.0);
        assert_eq!(padded_range(std::iter::empty()), (0.0, 1.0));
    }

    #[test]
    fn test_render_svg_for_each_chart() {
        let names = vec!["A".to_string(), "B".to_string()];
        let types = vec!["Pump".to_string(), "Valve".to_string()];
        let specs = vec![
            type_distribution_chart(&[
                TypeCount {
                    equipment_type: "Pump".into(),
                    count: 1,
                },
                TypeCount {
                    equipment_type: "Valve".into(),
                    count: 1,
                },
            ]),
            type_averages_chart(&type_averages(&types, &[10.0, 20.0], &[1.0, 2.0], &[23.0, 35.0])),
            scatter_chart(&scatter_series(&[10.0, 20.0], &[1.0, 2.0], &names, &types)),
            histogram_chart(&histogram(&[23.0, 35.0], &names)),
        ];

        for spec in specs {
            let svg = render_svg(&spec, CHART_SIZE).unwrap();
            assert!(svg.starts_with("<svg"), "{} did not render", spec.id);
            assert!(svg.contains(&spec.title), "{} lacks its title", spec.id);
        }
    }

    #[test]
    fn test_render_svg_empty_chart() {
        let svg = render_svg(&type_distribution_chart(&[]), CHART_SIZE).unwrap();
        assert!(svg.contains(EMPTY_MESSAGE));
    }
}
