//! Fixed chart configurations. Each builder turns already-aggregated data into
//! a [`ChartSpec`]; nothing here groups or averages.

use crate::core::aggregation::{Histogram, ScatterSeries, TypeAverages};
use crate::domain::model::{RawRecords, TypeCount, UNKNOWN_TYPE};
use plotters::style::RGBColor;
use serde::Serialize;

pub const DEFAULT_SERIES_COLOR: RGBColor = RGBColor(0x3b, 0x82, 0xf6);

pub const PALETTE: [RGBColor; 8] = [
    RGBColor(0x4e, 0x73, 0xdf),
    RGBColor(0x1c, 0xc8, 0x8a),
    RGBColor(0x36, 0xb9, 0xcc),
    RGBColor(0xf6, 0xc2, 0x3e),
    RGBColor(0xe7, 0x4a, 0x3b),
    RGBColor(0x85, 0x87, 0x96),
    RGBColor(0x8e, 0x44, 0xad),
    RGBColor(0xfd, 0x7e, 0x14),
];

const AVERAGE_COLORS: [RGBColor; 3] = [
    RGBColor(0x4e, 0x73, 0xdf),
    RGBColor(0xe7, 0x4a, 0x3b),
    RGBColor(0xf6, 0xc2, 0x3e),
];

const COMPARISON_COLORS: [RGBColor; 3] = [
    RGBColor(0x34, 0x98, 0xdb),
    RGBColor(0xe7, 0x4c, 0x3c),
    RGBColor(0xf1, 0xc4, 0x0f),
];

const HISTOGRAM_COLOR: RGBColor = RGBColor(0x8e, 0x44, 0xad);

pub fn palette_color(index: usize) -> RGBColor {
    PALETTE.get(index % PALETTE.len()).copied().unwrap_or(DEFAULT_SERIES_COLOR)
}

pub fn hex(color: RGBColor) -> String {
    format!("#{:02x}{:02x}{:02x}", color.0, color.1, color.2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LegendPosition {
    Top,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    #[serde(serialize_with = "serialize_color")]
    pub color: RGBColor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub label: String,
    pub values: Vec<f64>,
    #[serde(serialize_with = "serialize_color")]
    pub color: RGBColor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSeries {
    pub label: String,
    pub points: Vec<(f64, f64, String)>,
    #[serde(serialize_with = "serialize_color")]
    pub color: RGBColor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartBody {
    Pie {
        slices: Vec<PieSlice>,
    },
    Bars {
        categories: Vec<String>,
        series: Vec<BarSeries>,
        /// Integer ticks on the value axis.
        integer_values: bool,
    },
    Scatter {
        series: Vec<PointSeries>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    /// Stable identifier, also the SVG file stem.
    pub id: &'static str,
    pub title: String,
    pub x_title: Option<String>,
    pub y_title: Option<String>,
    pub legend: LegendPosition,
    pub body: ChartBody,
    /// Hover text per data element, in drawing order.
    pub tooltips: Vec<Vec<String>>,
}

impl ChartSpec {
    pub fn is_empty(&self) -> bool {
        match &self.body {
            ChartBody::Pie { slices } => slices.is_empty(),
            ChartBody::Bars { categories, .. } => categories.is_empty(),
            ChartBody::Scatter { series } => series.iter().all(|s| s.points.is_empty()),
        }
    }
}

fn serialize_color<S: serde::Serializer>(color: &RGBColor, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hex(*color))
}

/// Formats a number the way a chart tooltip shows it: integers without a
/// fractional part, everything else as-is.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

pub fn pie_tooltip(label: &str, count: f64) -> String {
    format!("{}: {}", label, format_value(count))
}

pub fn scatter_tooltip(name: &str, x: f64, y: f64) -> String {
    format!(
        "{} | Flow: {}, Pressure: {}",
        name,
        format_value(x),
        format_value(y)
    )
}

pub fn histogram_tooltip(count: usize, names: &[Option<String>]) -> Vec<String> {
    let present: Vec<&str> = names.iter().flatten().map(String::as_str).collect();
    let equipment = if present.is_empty() {
        "Equipment: None".to_string()
    } else {
        format!("Equipment: {}", present.join(", "))
    };
    vec![format!("Count: {}", count), equipment]
}

fn bar_tooltips(categories: &[String], series: &[BarSeries]) -> Vec<Vec<String>> {
    categories
        .iter()
        .enumerate()
        .map(|(i, category)| {
            let mut lines = vec![category.clone()];
            for s in series {
                if let Some(v) = s.values.get(i) {
                    lines.push(format!("{}: {}", s.label, format_value(*v)));
                }
            }
            lines
        })
        .collect()
}

pub fn type_distribution_chart(distribution: &[TypeCount]) -> ChartSpec {
    let slices: Vec<PieSlice> = distribution
        .iter()
        .enumerate()
        .map(|(i, entry)| PieSlice {
            label: if entry.equipment_type.is_empty() {
                UNKNOWN_TYPE.to_string()
            } else {
                entry.equipment_type.clone()
            },
            value: entry.count as f64,
            color: palette_color(i),
        })
        .collect();
    let tooltips = slices
        .iter()
        .map(|s| vec![pie_tooltip(&s.label, s.value)])
        .collect();

    ChartSpec {
        id: "type_distribution",
        title: "Equipment Type Distribution".to_string(),
        x_title: None,
        y_title: None,
        legend: LegendPosition::Top,
        body: ChartBody::Pie { slices },
        tooltips,
    }
}

pub fn type_averages_chart(averages: &TypeAverages) -> ChartSpec {
    let series: Vec<BarSeries> = [
        ("Flowrate", &averages.avg_flow),
        ("Pressure", &averages.avg_pressure),
        ("Temperature", &averages.avg_temperature),
    ]
    .into_iter()
    .zip(AVERAGE_COLORS)
    .map(|((label, values), color)| BarSeries {
        label: label.to_string(),
        values: values.clone(),
        color,
    })
    .collect();
    let tooltips = bar_tooltips(&averages.labels, &series);

    ChartSpec {
        id: "average_by_type",
        title: "Average Flow / Pressure / Temperature by Equipment Type".to_string(),
        x_title: Some("Equipment Type".to_string()),
        y_title: Some("Average Value".to_string()),
        legend: LegendPosition::Top,
        body: ChartBody::Bars {
            categories: averages.labels.clone(),
            series,
            integer_values: false,
        },
        tooltips,
    }
}

pub fn scatter_chart(groups: &[ScatterSeries]) -> ChartSpec {
    let series: Vec<PointSeries> = groups
        .iter()
        .enumerate()
        .map(|(i, group)| PointSeries {
            label: group.equipment_type.clone(),
            points: group
                .points
                .iter()
                .map(|p| (p.x, p.y, p.name.clone()))
                .collect(),
            color: palette_color(i),
        })
        .collect();
    let tooltips = groups
        .iter()
        .flat_map(|g| g.points.iter())
        .map(|p| vec![scatter_tooltip(&p.name, p.x, p.y)])
        .collect();

    ChartSpec {
        id: "flow_vs_pressure",
        title: "Flowrate vs Pressure by Equipment".to_string(),
        x_title: Some("Flowrate".to_string()),
        y_title: Some("Pressure".to_string()),
        legend: LegendPosition::Top,
        body: ChartBody::Scatter { series },
        tooltips,
    }
}

pub fn histogram_chart(histogram: &Histogram) -> ChartSpec {
    let tooltips = histogram
        .buckets
        .iter()
        .map(|b| histogram_tooltip(b.count, &b.items))
        .collect();

    ChartSpec {
        id: "temperature_histogram",
        title: "Temperature Frequency Distribution".to_string(),
        x_title: Some("Temperature Range (°C)".to_string()),
        y_title: Some("Frequency".to_string()),
        legend: LegendPosition::Top,
        body: ChartBody::Bars {
            categories: histogram.labels(),
            series: vec![BarSeries {
                label: "Frequency".to_string(),
                values: histogram.buckets.iter().map(|b| b.count as f64).collect(),
                color: HISTOGRAM_COLOR,
            }],
            integer_values: true,
        },
        tooltips,
    }
}

pub fn equipment_comparison_chart(records: &RawRecords) -> ChartSpec {
    let series: Vec<BarSeries> = [
        ("Flow", &records.flowrates),
        ("Pressure", &records.pressures),
        ("Temp", &records.temperatures),
    ]
    .into_iter()
    .zip(COMPARISON_COLORS)
    .map(|((label, values), color)| BarSeries {
        label: label.to_string(),
        values: values.clone(),
        color,
    })
    .collect();
    let tooltips = bar_tooltips(&records.names, &series);

    ChartSpec {
        id: "equipment_comparison",
        title: "Equipment-wise Performance".to_string(),
        x_title: Some("Equipment Name".to_string()),
        y_title: Some("Value".to_string()),
        legend: LegendPosition::Top,
        body: ChartBody::Bars {
            categories: records.names.clone(),
            series,
            integer_values: false,
        },
        tooltips,
    }
}

/// Single-unit card: flow, pressure and temperature of one piece of equipment.
pub fn equipment_card_chart(detail: &crate::core::aggregation::EquipmentDetail) -> ChartSpec {
    let categories = vec![
        "Flow".to_string(),
        "Pressure".to_string(),
        "Temp".to_string(),
    ];
    let series = vec![BarSeries {
        label: detail.name.clone(),
        values: vec![detail.flow, detail.pressure, detail.temperature],
        color: AVERAGE_COLORS[0],
    }];
    let tooltips = bar_tooltips(&categories, &series);

    ChartSpec {
        id: "equipment_card",
        title: detail.name.clone(),
        x_title: None,
        y_title: None,
        legend: LegendPosition::Hidden,
        body: ChartBody::Bars {
            categories,
            series,
            integer_values: false,
        },
        tooltips,
    }
}
