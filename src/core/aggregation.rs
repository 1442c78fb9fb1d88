//! Pure transformations from raw per-unit arrays into the shapes the charts draw.
//!
//! Every function here is deterministic and side-effect free. Inputs are the
//! parallel arrays of [`RawRecords`]; a missing array is just an empty slice.

use crate::domain::model::{RawRecords, UNKNOWN_TYPE};
use crate::utils::error::{DashError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Per-type means, labels in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeAverages {
    pub labels: Vec<String>,
    pub avg_flow: Vec<f64>,
    pub avg_pressure: Vec<f64>,
    pub avg_temperature: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub label: String,
    pub start: i64,
    pub count: usize,
    /// Names in scan order. `None` where the names array had no entry.
    pub items: Vec<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Histogram {
    pub buckets: Vec<HistogramBucket>,
}

impl Histogram {
    pub fn labels(&self) -> Vec<String> {
        self.buckets.iter().map(|b| b.label.clone()).collect()
    }

    pub fn counts(&self) -> Vec<usize> {
        self.buckets.iter().map(|b| b.count).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub equipment_type: String,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total: usize,
    pub avg_flow: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquipmentDetail {
    pub index: usize,
    pub name: String,
    pub flow: f64,
    pub pressure: f64,
    pub temperature: f64,
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean with the report's divisor guard: `sum / max(len, 1)`.
pub fn guarded_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len().max(1) as f64
}

/// Groups indices by `types[i]` and averages flow, pressure and temperature
/// per group. A numeric array shorter than `types` simply contributes nothing
/// for the missing indices.
pub fn type_averages(
    types: &[String],
    flows: &[f64],
    pressures: &[f64],
    temps: &[f64],
) -> TypeAverages {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, (Vec<f64>, Vec<f64>, Vec<f64>)> = HashMap::new();

    for (i, equipment_type) in types.iter().enumerate() {
        let group = groups.entry(equipment_type.as_str()).or_insert_with(|| {
            order.push(equipment_type.as_str());
            (Vec::new(), Vec::new(), Vec::new())
        });
        if let Some(f) = flows.get(i) {
            group.0.push(*f);
        }
        if let Some(p) = pressures.get(i) {
            group.1.push(*p);
        }
        if let Some(t) = temps.get(i) {
            group.2.push(*t);
        }
    }

    let mut averages = TypeAverages::default();
    for label in order {
        let (f, p, t) = &groups[label];
        averages.labels.push(label.to_string());
        averages.avg_flow.push(mean(f));
        averages.avg_pressure.push(mean(p));
        averages.avg_temperature.push(mean(t));
    }
    averages
}

/// Temperatures beyond this magnitude get no bucket; their start would not
/// fit an `i64` exactly.
pub const MAX_BUCKET_TEMP: f64 = 1e15;

/// Start of the 10-degree bucket containing `temp`.
pub fn bucket_start(temp: f64) -> i64 {
    ((temp / 10.0).floor() * 10.0) as i64
}

pub fn bucket_label(start: i64) -> String {
    format!("{}-{}°C", start, start.saturating_add(9))
}

/// Buckets temperatures into 10-degree ranges, ordered by range start.
pub fn histogram(temps: &[f64], names: &[String]) -> Histogram {
    let mut bins: BTreeMap<i64, HistogramBucket> = BTreeMap::new();

    for (i, temp) in temps.iter().enumerate() {
        if !temp.is_finite() || temp.abs() > MAX_BUCKET_TEMP {
            tracing::debug!("Skipping out-of-range temperature {} at index {}", temp, i);
            continue;
        }
        let start = bucket_start(*temp);
        let bucket = bins.entry(start).or_insert_with(|| HistogramBucket {
            label: bucket_label(start),
            start,
            count: 0,
            items: Vec::new(),
        });
        bucket.count += 1;
        bucket.items.push(names.get(i).cloned());
    }

    Histogram {
        buckets: bins.into_values().collect(),
    }
}

/// One series per distinct type, first-seen order. Points are emitted for
/// every index that has both a flow and a pressure value.
pub fn scatter_series(
    flows: &[f64],
    pressures: &[f64],
    names: &[String],
    types: &[String],
) -> Vec<ScatterSeries> {
    let mut series: Vec<ScatterSeries> = Vec::new();
    let mut index_of: HashMap<String, usize> = HashMap::new();

    for (i, (x, y)) in flows.iter().zip(pressures.iter()).enumerate() {
        let equipment_type = types
            .get(i)
            .filter(|t| !t.is_empty())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_TYPE.to_string());

        let slot = *index_of.entry(equipment_type.clone()).or_insert_with(|| {
            series.push(ScatterSeries {
                equipment_type,
                points: Vec::new(),
            });
            series.len() - 1
        });

        series[slot].points.push(ScatterPoint {
            x: *x,
            y: *y,
            name: names.get(i).cloned().unwrap_or_default(),
        });
    }

    series
}

pub fn summary(flows: &[f64], pressures: &[f64], temps: &[f64], total: usize) -> SummaryStats {
    SummaryStats {
        total,
        avg_flow: guarded_mean(flows),
        avg_pressure: guarded_mean(pressures),
        avg_temperature: guarded_mean(temps),
    }
}

pub fn equipment_detail(records: &RawRecords, index: usize) -> Result<EquipmentDetail> {
    let out_of_range = || DashError::ValidationError {
        message: format!(
            "equipment index {} out of range (dataset has {} units)",
            index,
            records.names.len()
        ),
    };

    Ok(EquipmentDetail {
        index,
        name: records.names.get(index).cloned().ok_or_else(out_of_range)?,
        flow: records.flowrates.get(index).copied().ok_or_else(out_of_range)?,
        pressure: records.pressures.get(index).copied().ok_or_else(out_of_range)?,
        temperature: records
            .temperatures
            .get(index)
            .copied()
            .ok_or_else(out_of_range)?,
    })
}

impl RawRecords {
    pub fn type_averages(&self) -> TypeAverages {
        type_averages(&self.types, &self.flowrates, &self.pressures, &self.temperatures)
    }

    pub fn histogram(&self) -> Histogram {
        histogram(&self.temperatures, &self.names)
    }

    pub fn scatter_series(&self) -> Vec<ScatterSeries> {
        scatter_series(&self.flowrates, &self.pressures, &self.names, &self.types)
    }

    pub fn summary(&self) -> SummaryStats {
        summary(
            &self.flowrates,
            &self.pressures,
            &self.temperatures,
            self.names.len(),
        )
    }
}
