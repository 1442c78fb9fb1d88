use crate::utils::error::{DashError, Result};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Columns the backend reads from an uploaded dataset.
pub const REQUIRED_CSV_COLUMNS: [&str; 5] =
    ["Equipment Name", "Type", "Flowrate", "Pressure", "Temperature"];

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(DashError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(DashError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(DashError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(DashError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(DashError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(DashError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DashError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_file_extension(field_name: &str, file: &Path, allowed: &[&str]) -> Result<()> {
    let extension = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(()),
        Some(ext) => Err(DashError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.display().to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                ext,
                allowed.join(", ")
            ),
        }),
        None => Err(DashError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.display().to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        }),
    }
}

/// Checks an upload candidate before it leaves the machine: `.csv` extension
/// and a header row carrying every column in [`REQUIRED_CSV_COLUMNS`].
pub fn validate_upload_csv(path: &Path) -> Result<()> {
    validate_file_extension("upload.file", path, &["csv"])?;

    let mut reader = csv::Reader::from_path(path)?;
    let headers: HashSet<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let missing: Vec<&str> = REQUIRED_CSV_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.contains(*column))
        .collect();

    if !missing.is_empty() {
        return Err(DashError::ValidationError {
            message: format!(
                "{} is missing required columns: {}",
                path.display(),
                missing.join(", ")
            ),
        });
    }

    Ok(())
}
