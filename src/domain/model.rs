use serde::{Deserialize, Deserializer, Serialize};

pub const UNKNOWN_TYPE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<u64>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Dataset as listed by the backend. Only `id` and `filename` are guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: u64,
    pub filename: String,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub avg_flowrate: Option<f64>,
    #[serde(default)]
    pub avg_pressure: Option<f64>,
    #[serde(default)]
    pub avg_temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: User,
    #[serde(default)]
    pub total_datasets: u64,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

/// One row of the per-unit listing returned with dataset details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    pub equipment_type: String,
    #[serde(default)]
    pub flowrate: f64,
    #[serde(default)]
    pub pressure: f64,
    #[serde(default)]
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDetails {
    #[serde(flatten)]
    pub dataset: Dataset,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(default = "unknown_type", deserialize_with = "type_or_unknown")]
    pub equipment_type: String,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDistribution {
    #[serde(default)]
    pub distribution: Vec<TypeCount>,
}

/// Parallel per-unit arrays for one dataset, aligned by index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecords {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub flowrates: Vec<f64>,
    #[serde(default)]
    pub pressures: Vec<f64>,
    #[serde(default)]
    pub temperatures: Vec<f64>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl RawRecords {
    /// Number of units, taken from the longest array.
    pub fn len(&self) -> usize {
        [
            self.names.len(),
            self.flowrates.len(),
            self.pressures.len(),
            self.temperatures.len(),
            self.types.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_aligned(&self) -> bool {
        let n = self.names.len();
        self.flowrates.len() == n
            && self.pressures.len() == n
            && self.temperatures.len() == n
            && self.types.len() == n
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub dataset: Option<Dataset>,
}

/// Client-side session, persisted between invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub selected_dataset: Option<u64>,
}

fn unknown_type() -> String {
    UNKNOWN_TYPE.to_string()
}

fn type_or_unknown<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_TYPE.to_string()))
}

fn count_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value: Option<u64> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_records_missing_arrays_are_empty() {
        let raw: RawRecords = serde_json::from_str(r#"{"names": ["A"]}"#).unwrap();
        assert_eq!(raw.names, vec!["A"]);
        assert!(raw.flowrates.is_empty());
        assert_eq!(raw.len(), 1);
        assert!(!raw.is_aligned());
    }

    #[test]
    fn test_type_count_defaults() {
        let dist: TypeDistribution = serde_json::from_str(
            r#"{"distribution": [{"equipment_type": null, "count": 3}, {"equipment_type": "Pump"}]}"#,
        )
        .unwrap();
        assert_eq!(dist.distribution[0].equipment_type, "Unknown");
        assert_eq!(dist.distribution[0].count, 3);
        assert_eq!(dist.distribution[1].count, 0);
    }

    #[test]
    fn test_dataset_details_flatten() {
        let details: DatasetDetails = serde_json::from_value(serde_json::json!({
            "id": 4,
            "filename": "plant.csv",
            "total_count": 1,
            "equipment": [{"id": 9, "name": "Valve-1", "equipment_type": "Valve",
                           "flowrate": 60.0, "pressure": 4.1, "temperature": 105.0}]
        }))
        .unwrap();
        assert_eq!(details.dataset.id, 4);
        assert_eq!(details.equipment[0].equipment_type, "Valve");
    }
}
