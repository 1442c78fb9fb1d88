//! Dashboard state and the orchestration around it.
//!
//! [`DashboardState`] is a plain value: every completed fetch replaces its
//! fields wholesale and all chart data is derived on demand through
//! [`DashboardState::view`]. [`Dashboard`] wires the state to the backend
//! API, the session store and artifact storage.

use crate::core::aggregation::{equipment_detail, EquipmentDetail, SummaryStats};
use crate::core::charts::{
    equipment_card_chart, equipment_comparison_chart, histogram_chart, scatter_chart,
    type_averages_chart, type_distribution_chart, ChartSpec,
};
use crate::core::render::{render_svg, CHART_SIZE};
use crate::core::report::{self, ReportData, ReportModel, REPORT_FILENAME};
use crate::domain::model::{
    Dataset, DatasetDetails, RawRecords, TypeDistribution, UploadResponse, User,
};
use crate::domain::ports::{AnalyticsApi, SessionStore, Storage};
use crate::utils::error::{DashError, Result};
use crate::utils::validation::validate_upload_csv;
use std::path::Path;

/// Identifies one dataset selection. Only the ticket of the most recent
/// selection may apply its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTicket {
    pub dataset_id: u64,
    generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub user: Option<User>,
    pub total_datasets: u64,
    pub datasets: Vec<Dataset>,
    pub selected: Option<u64>,
    pub distribution: Option<TypeDistribution>,
    pub raw: Option<RawRecords>,
    pub selected_equipment: Option<EquipmentDetail>,
    generation: u64,
}

impl DashboardState {
    /// Starts selecting `dataset_id`. The current selection stays in place
    /// until [`complete_selection`](Self::complete_selection) succeeds.
    pub fn begin_selection(&mut self, dataset_id: u64) -> SelectionTicket {
        self.generation += 1;
        SelectionTicket {
            dataset_id,
            generation: self.generation,
        }
    }

    /// Applies fetched data for `ticket`. Returns `false` and leaves the
    /// state untouched when a newer selection has started since.
    pub fn complete_selection(
        &mut self,
        ticket: SelectionTicket,
        distribution: TypeDistribution,
        raw: RawRecords,
    ) -> bool {
        if !self.is_current(&ticket) {
            tracing::debug!(
                "Discarding stale data for dataset {} (generation {} < {})",
                ticket.dataset_id,
                ticket.generation,
                self.generation
            );
            return false;
        }

        if !raw.is_aligned() {
            tracing::warn!(
                "Dataset {} returned arrays of different lengths",
                ticket.dataset_id
            );
        }

        self.selected = Some(ticket.dataset_id);
        self.distribution = Some(distribution);
        self.raw = Some(raw);
        self.selected_equipment = None;
        true
    }

    pub fn clear_selection(&mut self) {
        self.generation += 1;
        self.selected = None;
        self.distribution = None;
        self.raw = None;
        self.selected_equipment = None;
    }

    pub fn is_current(&self, ticket: &SelectionTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Everything the dashboard draws, or `None` while no raw data is loaded.
    pub fn view(&self) -> Option<DashboardView> {
        let raw = self.raw.as_ref()?;
        let distribution = self
            .distribution
            .as_ref()
            .map(|d| d.distribution.as_slice())
            .unwrap_or(&[]);

        Some(DashboardView {
            summary: raw.summary(),
            type_distribution: type_distribution_chart(distribution),
            type_averages: type_averages_chart(&raw.type_averages()),
            scatter: scatter_chart(&raw.scatter_series()),
            histogram: histogram_chart(&raw.histogram()),
            comparison: equipment_comparison_chart(raw),
            equipment_card: self.selected_equipment.as_ref().map(equipment_card_chart),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub summary: SummaryStats,
    pub type_distribution: ChartSpec,
    pub type_averages: ChartSpec,
    pub scatter: ChartSpec,
    pub histogram: ChartSpec,
    pub comparison: ChartSpec,
    pub equipment_card: Option<ChartSpec>,
}

impl DashboardView {
    /// All charts shown on screen, in display order.
    pub fn charts(&self) -> Vec<&ChartSpec> {
        let mut charts = vec![
            &self.type_distribution,
            &self.type_averages,
            &self.scatter,
            &self.histogram,
            &self.comparison,
        ];
        if let Some(card) = &self.equipment_card {
            charts.push(card);
        }
        charts
    }

    /// The charts that go into the exported report.
    pub fn report_charts(&self) -> Vec<ChartSpec> {
        vec![
            self.type_distribution.clone(),
            self.type_averages.clone(),
            self.scatter.clone(),
            self.histogram.clone(),
        ]
    }
}

pub struct Dashboard<A: AnalyticsApi, S: SessionStore> {
    api: A,
    sessions: S,
    state: DashboardState,
}

impl<A: AnalyticsApi, S: SessionStore> Dashboard<A, S> {
    pub fn new(api: A, sessions: S) -> Self {
        Self {
            api,
            sessions,
            state: DashboardState::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn view(&self) -> Option<DashboardView> {
        self.state.view()
    }

    /// Restores the stored token, then loads the profile and the dataset
    /// list. A selection remembered from a previous run is kept only if the
    /// dataset still exists; its data is fetched by [`Self::load_selected`].
    pub async fn mount(&mut self) -> Result<()> {
        let session = self.sessions.load()?;
        let token = session.token.clone().ok_or(DashError::NotAuthenticated)?;
        self.api.set_token(Some(token));

        let profile = self.api.profile().await?;
        tracing::info!(
            "👤 {} has {} dataset(s)",
            profile.user.username,
            profile.total_datasets
        );
        self.state.user = Some(profile.user);
        self.state.total_datasets = profile.total_datasets;

        self.refresh_datasets().await?;

        if let Some(id) = session.selected_dataset {
            if self.state.datasets.iter().any(|d| d.id == id) {
                self.state.selected = Some(id);
            } else {
                tracing::info!("Previously selected dataset {} no longer exists", id);
                self.persist_selection(None)?;
            }
        }
        Ok(())
    }

    pub async fn refresh_datasets(&mut self) -> Result<&[Dataset]> {
        let datasets = self.api.datasets().await?;
        tracing::debug!("Fetched {} dataset(s)", datasets.len());
        self.state.datasets = datasets;
        Ok(&self.state.datasets)
    }

    pub async fn load_selected(&mut self) -> Result<()> {
        let id = self.state.selected.ok_or(DashError::NoDatasetSelected)?;
        self.select_dataset(id).await
    }

    /// Fetches the type distribution and raw records of `id` and makes it the
    /// current dataset.
    pub async fn select_dataset(&mut self, id: u64) -> Result<()> {
        let ticket = self.state.begin_selection(id);
        tracing::info!("📊 Loading dataset {}", id);

        let distribution = self.api.type_distribution(id).await?;
        let raw = self.api.raw_records(id).await?;

        if self.state.complete_selection(ticket, distribution, raw) {
            self.persist_selection(Some(id))?;
        }
        Ok(())
    }

    pub async fn upload(&mut self, path: &Path, select_new: bool) -> Result<UploadResponse> {
        let response = match self.submit_upload(path).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Upload of {} failed: {}", path.display(), e);
                return Err(DashError::UploadFailed {
                    message: e.to_string(),
                });
            }
        };

        tracing::info!(
            "📤 {}",
            response.message.as_deref().unwrap_or("Upload successful")
        );
        self.refresh_datasets().await?;

        if select_new {
            if let Some(dataset) = &response.dataset {
                self.select_dataset(dataset.id).await?;
            }
        }
        Ok(response)
    }

    async fn submit_upload(&self, path: &Path) -> Result<UploadResponse> {
        validate_upload_csv(path)?;
        self.api.upload(path).await
    }

    pub async fn delete_selected(&mut self) -> Result<()> {
        let id = self.state.selected.ok_or(DashError::NoDatasetSelected)?;
        self.delete_dataset(id).await
    }

    pub async fn delete_dataset(&mut self, id: u64) -> Result<()> {
        self.api.delete_dataset(id).await?;
        tracing::info!("🗑️ Deleted dataset {}", id);

        let session_selection = self.sessions.load().ok().and_then(|s| s.selected_dataset);
        if self.state.selected == Some(id) || session_selection == Some(id) {
            self.state.clear_selection();
            self.persist_selection(None)?;
        }

        self.refresh_datasets().await?;
        Ok(())
    }

    /// Logs out on the server if possible, then always drops the local
    /// session and state.
    pub async fn logout(&mut self) -> Result<()> {
        if let Err(e) = self.api.logout().await {
            tracing::warn!("Server logout failed, clearing local session anyway: {}", e);
        }

        if let Err(e) = self.sessions.clear() {
            tracing::warn!("Could not remove stored session: {}", e);
        }
        self.api.set_token(None);
        self.state = DashboardState::default();
        Ok(())
    }

    pub fn select_equipment(&mut self, index: usize) -> Result<&EquipmentDetail> {
        let raw = self.state.raw.as_ref().ok_or(DashError::NoDataLoaded)?;
        let detail = equipment_detail(raw, index)?;
        Ok(self.state.selected_equipment.insert(detail))
    }

    /// Writes one SVG per chart and returns the written paths.
    pub async fn render_charts<St: Storage>(&self, storage: &St) -> Result<Vec<String>> {
        let view = self.view().ok_or(DashError::NoDataLoaded)?;

        let mut written = Vec::new();
        for chart in view.charts() {
            let svg = render_svg(chart, CHART_SIZE)?;
            let path = storage
                .write_file(&format!("{}.svg", chart.id), svg.as_bytes())
                .await?;
            written.push(path);
        }
        tracing::info!("🖼️ Rendered {} chart(s)", written.len());
        Ok(written)
    }

    pub fn report_model(&self) -> ReportModel {
        let user = self
            .state
            .user
            .as_ref()
            .map(|u| u.username.clone())
            .unwrap_or_default();
        let data = self.view().map(|view| ReportData {
            summary: view.summary,
            charts: view.report_charts(),
        });
        ReportModel::new(user, data)
    }

    /// Exports the report as `equipment_report.pdf`. Without loaded data the
    /// report holds only the header.
    pub async fn export_pdf<St: Storage>(&self, storage: &St) -> Result<String> {
        let bytes = report::export_pdf(&self.report_model())?;
        let path = storage.write_file(REPORT_FILENAME, &bytes).await?;
        tracing::info!("📄 Report saved to {}", path);
        Ok(path)
    }

    /// Saves the report the backend generates for dataset `id`.
    pub async fn download_server_report<St: Storage>(&self, id: u64, storage: &St) -> Result<String> {
        let bytes = self.api.download_report(id).await?;
        storage
            .write_file(&format!("dataset_{}_report.pdf", id), &bytes)
            .await
    }

    pub async fn dataset_details(&self, id: u64) -> Result<DatasetDetails> {
        self.api.dataset_details(id).await
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.api.health_check().await
    }

    fn persist_selection(&self, selected: Option<u64>) -> Result<()> {
        let mut session = self.sessions.load()?;
        session.selected_dataset = selected;
        self.sessions.save(&session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::session::MemorySessionStore;
    use crate::domain::model::{
        AuthResponse, Credentials, Registration, Session, TypeCount, UserProfile,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<tokio::sync::Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                DashError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "File not found",
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<String> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(path.to_string())
        }
    }

    #[derive(Default)]
    struct MockApi {
        token: Mutex<Option<String>>,
        datasets: Mutex<Vec<Dataset>>,
        deleted: Mutex<Vec<u64>>,
        fail_logout: bool,
        fail_raw_for: Option<u64>,
    }

    fn dataset(id: u64) -> Dataset {
        Dataset {
            id,
            filename: format!("plant_{}.csv", id),
            uploaded_at: None,
            total_count: Some(2),
            avg_flowrate: None,
            avg_pressure: None,
            avg_temperature: None,
        }
    }

    fn two_pumps() -> RawRecords {
        RawRecords {
            names: vec!["A".into(), "B".into()],
            flowrates: vec![10.0, 20.0],
            pressures: vec![1.0, 2.0],
            temperatures: vec![23.0, 35.0],
            types: vec!["Pump".into(), "Pump".into()],
        }
    }

    fn pump_distribution() -> TypeDistribution {
        TypeDistribution {
            distribution: vec![TypeCount {
                equipment_type: "Pump".into(),
                count: 2,
            }],
        }
    }

    #[async_trait]
    impl AnalyticsApi for MockApi {
        fn set_token(&self, token: Option<String>) {
            *self.token.lock().unwrap() = token;
        }

        fn token(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }

        async fn login(&self, _credentials: &Credentials) -> Result<AuthResponse> {
            Err(DashError::api(400, "Invalid Credentials"))
        }

        async fn register(&self, _registration: &Registration) -> Result<AuthResponse> {
            Err(DashError::api(400, "Username exists"))
        }

        async fn logout(&self) -> Result<()> {
            if self.fail_logout {
                Err(DashError::api(500, "logout exploded"))
            } else {
                Ok(())
            }
        }

        async fn profile(&self) -> Result<UserProfile> {
            Ok(UserProfile {
                user: User {
                    id: Some(1),
                    username: "alice".into(),
                    email: None,
                },
                total_datasets: self.datasets.lock().unwrap().len() as u64,
                datasets: vec![],
            })
        }

        async fn datasets(&self) -> Result<Vec<Dataset>> {
            Ok(self.datasets.lock().unwrap().clone())
        }

        async fn dataset_details(&self, id: u64) -> Result<DatasetDetails> {
            Ok(DatasetDetails {
                dataset: dataset(id),
                equipment: vec![],
            })
        }

        async fn type_distribution(&self, _id: u64) -> Result<TypeDistribution> {
            Ok(pump_distribution())
        }

        async fn raw_records(&self, id: u64) -> Result<RawRecords> {
            if self.fail_raw_for == Some(id) {
                return Err(DashError::api(500, "raw data unavailable"));
            }
            Ok(two_pumps())
        }

        async fn upload(&self, _file: &Path) -> Result<UploadResponse> {
            let new = dataset(42);
            self.datasets.lock().unwrap().push(new.clone());
            Ok(UploadResponse {
                message: Some("File uploaded successfully".into()),
                dataset: Some(new),
            })
        }

        async fn delete_dataset(&self, id: u64) -> Result<()> {
            self.datasets.lock().unwrap().retain(|d| d.id != id);
            self.deleted.lock().unwrap().push(id);
            Ok(())
        }

        async fn download_report(&self, _id: u64) -> Result<Vec<u8>> {
            Ok(b"%PDF-server".to_vec())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn logged_in(api: MockApi, selected: Option<u64>) -> Dashboard<MockApi, MemorySessionStore> {
        let sessions = MemorySessionStore::new(Session {
            token: Some("tok".into()),
            selected_dataset: selected,
        });
        Dashboard::new(api, sessions)
    }

    fn api_with(ids: &[u64]) -> MockApi {
        let api = MockApi::default();
        *api.datasets.lock().unwrap() = ids.iter().copied().map(dataset).collect();
        api
    }

    #[test]
    fn test_stale_selection_is_discarded() {
        let mut state = DashboardState::default();
        let first = state.begin_selection(1);
        let second = state.begin_selection(2);

        assert!(!state.complete_selection(first, pump_distribution(), two_pumps()));
        assert!(state.raw.is_none());
        assert!(!state.is_current(&first));
        assert_eq!(state.selected, None);

        let mut newer = two_pumps();
        newer.names = vec!["C".into(), "D".into()];
        assert!(state.complete_selection(second, pump_distribution(), newer));
        assert_eq!(state.selected, Some(2));
        assert_eq!(state.raw.as_ref().unwrap().names, vec!["C", "D"]);
    }

    #[test]
    fn test_view_none_without_raw_data() {
        let state = DashboardState::default();
        assert!(state.view().is_none());
    }

    #[test]
    fn test_view_derives_all_charts() {
        let mut state = DashboardState::default();
        let ticket = state.begin_selection(1);
        state.complete_selection(ticket, pump_distribution(), two_pumps());

        let view = state.view().unwrap();
        assert_eq!(view.summary.total, 2);
        assert_eq!(view.charts().len(), 5);
        assert_eq!(view.report_charts().len(), 4);
        assert_eq!(view.histogram.tooltips.len(), 2);
        assert!(view.equipment_card.is_none());
    }

    #[tokio::test]
    async fn test_mount_requires_token() {
        let mut dashboard = Dashboard::new(MockApi::default(), MemorySessionStore::default());
        let err = dashboard.mount().await.unwrap_err();
        assert!(matches!(err, DashError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_mount_restores_selection_and_token() {
        let mut dashboard = logged_in(api_with(&[1, 2]), Some(2));
        dashboard.mount().await.unwrap();

        assert_eq!(dashboard.api().token().as_deref(), Some("tok"));
        assert_eq!(dashboard.state().user.as_ref().unwrap().username, "alice");
        assert_eq!(dashboard.state().datasets.len(), 2);
        assert_eq!(dashboard.state().selected, Some(2));

        dashboard.load_selected().await.unwrap();
        assert!(dashboard.view().is_some());
    }

    #[tokio::test]
    async fn test_mount_drops_vanished_selection() {
        let mut dashboard = logged_in(api_with(&[1]), Some(9));
        dashboard.mount().await.unwrap();
        assert_eq!(dashboard.state().selected, None);
        assert_eq!(dashboard.sessions().snapshot().selected_dataset, None);
    }

    #[tokio::test]
    async fn test_select_persists_selection() {
        let mut dashboard = logged_in(api_with(&[1]), None);
        dashboard.select_dataset(1).await.unwrap();
        assert_eq!(dashboard.sessions().snapshot().selected_dataset, Some(1));
        assert_eq!(dashboard.state().raw.as_ref().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_select_keeps_previous_dataset() {
        let api = MockApi {
            fail_raw_for: Some(2),
            ..api_with(&[1, 2])
        };
        let mut dashboard = logged_in(api, None);
        dashboard.select_dataset(1).await.unwrap();

        let err = dashboard.select_dataset(2).await.unwrap_err();
        assert!(matches!(err, DashError::ApiError { status: 500, .. }));
        assert_eq!(dashboard.state().selected, Some(1));
        assert_eq!(dashboard.state().raw.as_ref().unwrap().names, vec!["A", "B"]);
        assert_eq!(dashboard.sessions().snapshot().selected_dataset, Some(1));

        dashboard.delete_selected().await.unwrap();
        assert_eq!(*dashboard.api().deleted.lock().unwrap(), vec![1]);
        assert_eq!(dashboard.state().datasets, vec![dataset(2)]);
    }

    #[tokio::test]
    async fn test_delete_requires_selection() {
        let mut dashboard = logged_in(api_with(&[1]), None);
        let err = dashboard.delete_selected().await.unwrap_err();
        assert_eq!(err.user_friendly_message(), "Select dataset first");
        assert!(dashboard.api().deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_clears_selection_and_refreshes() {
        let mut dashboard = logged_in(api_with(&[1, 2]), None);
        dashboard.select_dataset(1).await.unwrap();
        dashboard.delete_selected().await.unwrap();

        assert_eq!(*dashboard.api().deleted.lock().unwrap(), vec![1]);
        assert!(dashboard.state().raw.is_none());
        assert_eq!(dashboard.state().selected, None);
        assert_eq!(dashboard.state().datasets.len(), 1);
        assert_eq!(dashboard.sessions().snapshot().selected_dataset, None);
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_server_fails() {
        let api = MockApi {
            fail_logout: true,
            ..api_with(&[1])
        };
        let mut dashboard = logged_in(api, Some(1));
        dashboard.mount().await.unwrap();
        dashboard.logout().await.unwrap();

        assert!(dashboard.api().token().is_none());
        assert!(dashboard.sessions().snapshot().token.is_none());
        assert!(dashboard.state().user.is_none());
    }

    #[tokio::test]
    async fn test_upload_rejects_invalid_csv() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "name,kind\nA,Pump\n").unwrap();

        let mut dashboard = logged_in(api_with(&[]), None);
        let err = dashboard.upload(&path, false).await.unwrap_err();
        assert_eq!(err.user_friendly_message(), "Upload failed");
        assert!(dashboard.state().datasets.is_empty());
    }

    #[tokio::test]
    async fn test_upload_and_select_new_dataset() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("plant.csv");
        std::fs::write(
            &path,
            "Equipment Name,Type,Flowrate,Pressure,Temperature\nA,Pump,10,1,23\n",
        )
        .unwrap();

        let mut dashboard = logged_in(api_with(&[]), None);
        let response = dashboard.upload(&path, true).await.unwrap();

        assert_eq!(response.dataset.unwrap().id, 42);
        assert_eq!(dashboard.state().datasets.len(), 1);
        assert_eq!(dashboard.state().selected, Some(42));
        assert!(dashboard.view().is_some());
    }

    #[tokio::test]
    async fn test_select_equipment() {
        let mut dashboard = logged_in(api_with(&[1]), None);
        assert!(matches!(
            dashboard.select_equipment(0),
            Err(DashError::NoDataLoaded)
        ));

        dashboard.select_dataset(1).await.unwrap();
        let detail = dashboard.select_equipment(1).unwrap().clone();
        assert_eq!(detail.name, "B");
        assert!(dashboard.select_equipment(5).is_err());
        assert_eq!(dashboard.view().unwrap().charts().len(), 6);
    }

    #[tokio::test]
    async fn test_render_charts_and_export() {
        let storage = MockStorage::default();
        let mut dashboard = logged_in(api_with(&[1]), None);

        assert!(matches!(
            dashboard.render_charts(&storage).await,
            Err(DashError::NoDataLoaded)
        ));
        // Header-only report still exports.
        dashboard.export_pdf(&storage).await.unwrap();

        dashboard.mount().await.unwrap();
        dashboard.select_dataset(1).await.unwrap();
        let written = dashboard.render_charts(&storage).await.unwrap();
        assert_eq!(written.len(), 5);
        assert!(written.contains(&"temperature_histogram.svg".to_string()));

        let path = dashboard.export_pdf(&storage).await.unwrap();
        assert_eq!(path, REPORT_FILENAME);
        let pdf = storage.read_file(REPORT_FILENAME).await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));

        let model = dashboard.report_model();
        assert_eq!(model.user, "alice");
        assert_eq!(model.data.unwrap().charts.len(), 4);
    }

    #[tokio::test]
    async fn test_download_server_report() {
        let storage = MockStorage::default();
        let dashboard = logged_in(api_with(&[3]), None);
        let path = dashboard.download_server_report(3, &storage).await.unwrap();
        assert_eq!(path, "dataset_3_report.pdf");
        assert_eq!(storage.read_file(&path).await.unwrap(), b"%PDF-server");
    }
}
