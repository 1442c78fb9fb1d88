use anyhow::Context;
use clap::Parser;
use equipment_dash::core::aggregation::SummaryStats;
use equipment_dash::domain::ports::{AnalyticsApi, ConfigProvider, SessionStore};
use equipment_dash::utils::error::{DashError, ErrorSeverity, Result};
use equipment_dash::utils::{logger, validation::Validate};
use equipment_dash::{
    ApiClient, AuthFlow, CliConfig, Command, Dashboard, FileSessionStore, LocalStorage, Settings,
};
use std::io::BufRead;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    // 載入並驗證配置
    let settings = match cli.settings().and_then(|s| s.validate().map(|_| s)) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };
    tracing::debug!("Settings: {:?}", settings);

    if let Err(e) = run(cli.command, &settings).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(command: Command, settings: &Settings) -> Result<()> {
    let api = ApiClient::from_config(settings)?;
    let sessions = FileSessionStore::new(settings.session_path());
    api.set_token(sessions.load()?.token);

    let mut dashboard = Dashboard::new(api, sessions);
    let storage_for = |out: Option<PathBuf>| {
        LocalStorage::new(out.unwrap_or_else(|| settings.output_dir().to_path_buf()))
    };

    match command {
        Command::Login { username, password } => {
            let password = read_password(password)?;
            AuthFlow::new(dashboard.api(), dashboard.sessions())
                .login(&username, &password)
                .await?;
            println!("✅ Logged in as {}", username);
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let password = read_password(password)?;
            AuthFlow::new(dashboard.api(), dashboard.sessions())
                .register(&username, &email, &password)
                .await?;
            println!("✅ Registered and logged in as {}", username);
        }
        Command::Health => {
            if dashboard.health_check().await? {
                println!("✅ Backend is up at {}", dashboard.api().base_url());
            } else {
                return Err(DashError::api(503, "health check failed"));
            }
        }
        Command::Logout => {
            dashboard.logout().await?;
            println!("👋 Logged out");
        }
        Command::Profile => {
            dashboard.mount().await?;
            let state = dashboard.state();
            if let Some(user) = &state.user {
                println!("User: {}", user.username);
                if let Some(email) = &user.email {
                    println!("Email: {}", email);
                }
            }
            println!("Datasets: {}", state.total_datasets);
        }
        Command::Datasets => {
            dashboard.mount().await?;
            let state = dashboard.state();
            if state.datasets.is_empty() {
                println!("No datasets uploaded yet");
            }
            for dataset in &state.datasets {
                let marker = if state.selected == Some(dataset.id) { "*" } else { " " };
                println!(
                    "{} {:>4}  {}  {}",
                    marker,
                    dataset.id,
                    dataset.filename,
                    dataset.uploaded_at.as_deref().unwrap_or("")
                );
            }
        }
        Command::Dataset { id } => {
            let details = dashboard.dataset_details(id).await?;
            println!("{} (id {})", details.dataset.filename, details.dataset.id);
            for unit in &details.equipment {
                println!(
                    "  {:<20} {:<16} flow {:>8.2}  pressure {:>8.2}  temp {:>8.2}",
                    unit.name, unit.equipment_type, unit.flowrate, unit.pressure, unit.temperature
                );
            }
        }
        Command::Select { id } => {
            dashboard.mount().await?;
            dashboard.select_dataset(id).await?;
            println!("✅ Selected dataset {}", id);
            if let Some(view) = dashboard.view() {
                print_summary(&view.summary);
            }
        }
        Command::Upload { file, select } => {
            dashboard.mount().await?;
            let response = dashboard.upload(&file, select).await?;
            println!(
                "✅ {}",
                response.message.as_deref().unwrap_or("Upload successful")
            );
            if let Some(dataset) = response.dataset {
                println!("📁 Dataset {} ({})", dataset.id, dataset.filename);
            }
        }
        Command::Delete { id } => {
            dashboard.mount().await?;
            match id {
                Some(id) => dashboard.delete_dataset(id).await?,
                None => dashboard.delete_selected().await?,
            }
            println!("🗑️ Dataset deleted");
        }
        Command::Show { equipment } => {
            dashboard.mount().await?;
            dashboard.load_selected().await?;
            if let Some(view) = dashboard.view() {
                print_summary(&view.summary);
            }
            if let Some(index) = equipment {
                let detail = dashboard.select_equipment(index)?;
                println!("Equipment #{}: {}", detail.index, detail.name);
                println!("  Flowrate: {:.2}", detail.flow);
                println!("  Pressure: {:.2}", detail.pressure);
                println!("  Temperature: {:.2}", detail.temperature);
            }
        }
        Command::Charts { out, equipment } => {
            dashboard.mount().await?;
            dashboard.load_selected().await?;
            if let Some(index) = equipment {
                dashboard.select_equipment(index)?;
            }
            for path in dashboard.render_charts(&storage_for(out)).await? {
                println!("📁 {}", path);
            }
        }
        Command::Export { out } => {
            dashboard.mount().await?;
            if dashboard.state().selected.is_some() {
                dashboard.load_selected().await?;
            }
            let path = dashboard.export_pdf(&storage_for(out)).await?;
            println!("📄 Report saved to {}", path);
        }
        Command::DownloadReport { id, out } => {
            let path = dashboard
                .download_server_report(id, &storage_for(out))
                .await?;
            println!("📄 Server report saved to {}", path);
        }
    }

    Ok(())
}

fn print_summary(summary: &SummaryStats) {
    println!("Total Equipment: {}", summary.total);
    println!("Average Flow: {:.2}", summary.avg_flow);
    println!("Average Pressure: {:.2}", summary.avg_pressure);
    println!("Average Temperature: {:.2}", summary.avg_temperature);
}

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }

    read_line_from_stdin("Password: ").map_err(|e| DashError::ValidationError {
        message: format!("{:#}", e),
    })
}

fn read_line_from_stdin(prompt: &str) -> anyhow::Result<String> {
    eprint!("{}", prompt);
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("could not read password from stdin")?;

    let line = line.trim_end_matches(['\r', '\n']).to_string();
    anyhow::ensure!(!line.is_empty(), "password must not be empty");
    Ok(line)
}
