pub mod aggregation;
pub mod auth;
pub mod charts;
pub mod dashboard;
pub mod pdf_backend;
pub mod render;
pub mod report;

pub use crate::domain::ports::{AnalyticsApi, ConfigProvider, SessionStore, Storage};
pub use crate::utils::error::Result;
