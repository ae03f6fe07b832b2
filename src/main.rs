//! urbanops - operator CLI for the UrbanOps gateway
//!
//! ## Usage
//! ```bash
//! urbanops login -u operator -p secret
//! urbanops dashboard
//! urbanops incidents list --status active --query burst
//! urbanops incidents create --title "Water main burst" --location "Main St"
//! urbanops geocode 18.52 73.85
//! ```

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use colored::*;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use urbanops_adapter::{
    dashboard::{load_analytics, load_dashboard, load_map_overview, IncidentFilter, StatusCounts},
    entities::{
        AlertDraft, CameraDraft, CameraStatus, IncidentDraft, IncidentStatus, Priority,
        SensorDraft, SensorKind, SensorStatus, Severity,
    },
    geocode::ReverseGeocoder,
    session::RegisterRequest,
    ApiClient, AppConfig, FileSessionStore, SessionContext,
};

#[derive(Parser, Debug)]
#[command(name = "urbanops")]
#[command(version, about = "Operator CLI for the UrbanOps smart-city gateway")]
struct Cli {
    /// Gateway base URL
    #[arg(long, env = "URBANOPS_API_URL", global = true)]
    api_url: Option<String>,

    /// Session file
    #[arg(long, env = "URBANOPS_SESSION_FILE", global = true)]
    session_file: Option<std::path::PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Print raw JSON instead of the summary view
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and persist the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        email: Option<String>,
        /// Repeatable
        #[arg(long = "role")]
        roles: Vec<String>,
    },
    /// Clear the session
    Logout,
    /// Show the current session
    Whoami,
    /// Fetch the profile from the gateway
    Profile,
    /// Change the account password
    ChangePassword {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    /// KPI counts and recent incidents
    Dashboard,
    /// Everything plotted on the map
    Map,
    /// Alert and incident breakdown
    Analytics,
    #[command(subcommand)]
    Incidents(IncidentCommand),
    #[command(subcommand)]
    Sensors(SensorCommand),
    #[command(subcommand)]
    Cameras(CameraCommand),
    #[command(subcommand)]
    Alerts(AlertCommand),
    /// Analytics predictions
    Predictions {
        /// JSON file to send instead of listing
        #[arg(long)]
        send: Option<std::path::PathBuf>,
    },
    /// Resolve coordinates to a place name
    Geocode {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lng: f64,
    },
}

#[derive(Subcommand, Debug)]
enum IncidentCommand {
    List {
        #[arg(long, value_parser = parse_incident_status)]
        status: Option<IncidentStatus>,
        #[arg(short, long)]
        query: Option<String>,
    },
    Get { id: String },
    Create(IncidentArgs),
    Update {
        id: String,
        #[command(flatten)]
        fields: IncidentArgs,
    },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct IncidentArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long, value_parser = parse_incident_status)]
    status: Option<IncidentStatus>,
    #[arg(long, value_parser = parse_severity)]
    severity: Option<Severity>,
}

#[derive(Subcommand, Debug)]
enum SensorCommand {
    List,
    Get { id: String },
    Create(SensorArgs),
    Update {
        id: String,
        #[command(flatten)]
        fields: SensorArgs,
    },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct SensorArgs {
    #[arg(long = "type")]
    kind: Option<String>,
    #[arg(long)]
    value: Option<f64>,
    #[arg(long)]
    status: Option<String>,
}

#[derive(Subcommand, Debug)]
enum CameraCommand {
    List,
    Get { id: String },
    Create(CameraArgs),
    Update {
        id: String,
        #[command(flatten)]
        fields: CameraArgs,
    },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct CameraArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long, value_parser = parse_camera_status)]
    status: Option<CameraStatus>,
    #[arg(long)]
    stream_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum AlertCommand {
    List,
    Get { id: String },
    Create(AlertArgs),
    Update {
        id: String,
        #[command(flatten)]
        fields: AlertArgs,
    },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct AlertArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    message: Option<String>,
    #[arg(long, value_parser = parse_priority)]
    priority: Option<Priority>,
}

fn parse_incident_status(s: &str) -> Result<IncidentStatus, String> {
    IncidentStatus::parse(s).ok_or_else(|| format!("unknown incident status '{}'", s))
}

fn parse_severity(s: &str) -> Result<Severity, String> {
    Severity::parse(s).ok_or_else(|| format!("unknown severity '{}'", s))
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::parse(s).ok_or_else(|| format!("unknown priority '{}'", s))
}

fn parse_camera_status(s: &str) -> Result<CameraStatus, String> {
    CameraStatus::parse(s).ok_or_else(|| format!("unknown camera status '{}'", s))
}

// Update commands fetch the stored record and overlay only the flags given,
// so unset fields keep their current values.

impl IncidentArgs {
    fn overlay(self, mut draft: IncidentDraft) -> IncidentDraft {
        match (self.title, self.description) {
            // The traffic service stores the title in `description`
            (Some(title), None) => {
                draft.description = Some(title.clone());
                draft.title = Some(title);
            }
            (title, description) => {
                draft.title = title.or(draft.title);
                draft.description = description.or(draft.description);
            }
        }
        if let Some(location) = self.location {
            draft.location = Some(location.as_str().into());
        }
        draft.status = self.status.or(draft.status);
        draft.severity = self.severity.or(draft.severity);
        draft
    }
}

impl SensorArgs {
    fn overlay(self, mut draft: SensorDraft) -> SensorDraft {
        if let Some(kind) = self.kind.as_deref() {
            draft.kind = Some(SensorKind::from(kind));
        }
        draft.value = self.value.or(draft.value);
        if let Some(status) = self.status.as_deref() {
            draft.status = Some(SensorStatus::from(status));
        }
        draft
    }
}

impl CameraArgs {
    fn overlay(self, mut draft: CameraDraft) -> CameraDraft {
        draft.name = self.name.or(draft.name);
        if let Some(location) = self.location {
            draft.location = Some(location.as_str().into());
        }
        draft.status = self.status.or(draft.status);
        draft.stream_url = self.stream_url.or(draft.stream_url);
        draft
    }
}

impl AlertArgs {
    fn overlay(self, mut draft: AlertDraft) -> AlertDraft {
        draft.title = self.title.or(draft.title);
        draft.message = self.message.or(draft.message);
        draft.priority = self.priority.or(draft.priority);
        draft
    }
}

impl From<IncidentArgs> for IncidentDraft {
    fn from(args: IncidentArgs) -> Self {
        args.overlay(Self::default())
    }
}

impl From<SensorArgs> for SensorDraft {
    fn from(args: SensorArgs) -> Self {
        args.overlay(Self::default())
    }
}

impl From<CameraArgs> for CameraDraft {
    fn from(args: CameraArgs) -> Self {
        args.overlay(Self::default())
    }
}

impl From<AlertArgs> for AlertDraft {
    fn from(args: AlertArgs) -> Self {
        args.overlay(Self::default())
    }
}

// ============================================================
// Output helpers
// ============================================================

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_created<T: Serialize>(kind: &str, echo: Option<T>) -> Result<()> {
    println!("{} {} saved", "✔".green(), kind);
    if let Some(ref record) = echo {
        print_json(record)?;
    }
    Ok(())
}

fn print_missing(kind: &str, id: &str) {
    println!("{} {} {} not found", "✘".yellow(), kind, id.bold());
}

fn header(title: &str) {
    println!("{}", title.bold().blue());
    println!("{}", "─".repeat(60).dimmed());
}

// ============================================================
// Commands
// ============================================================

async fn run_incidents(client: &ApiClient, command: IncidentCommand, json: bool) -> Result<()> {
    match command {
        IncidentCommand::List { status, query } => {
            let incidents = client.list_incidents().await;
            let filter = IncidentFilter { status, query };
            let shown = filter.apply(&incidents);
            if json {
                return print_json(&shown);
            }

            let counts = StatusCounts::from_incidents(&incidents);
            header(&format!(
                "Incidents (all {} | active {} | investigating {} | resolved {} | closed {})",
                counts.all, counts.active, counts.investigating, counts.resolved, counts.closed
            ));
            for incident in shown {
                println!(
                    "{:>6}  {:<13} {:<8} {}  {}",
                    incident.id.bold(),
                    incident.status.to_string().cyan(),
                    incident.severity.to_string(),
                    incident.title,
                    incident.location.address.dimmed()
                );
            }
        }
        IncidentCommand::Get { id } => match client.try_get_incident(&id).await? {
            Some(incident) => print_json(&incident)?,
            None => print_missing("incident", &id),
        },
        IncidentCommand::Create(fields) => {
            let echo = client.create_incident(&fields.into()).await?;
            print_created("incident", echo)?;
        }
        IncidentCommand::Update { id, fields } => {
            let Some(current) = client.try_get_incident(&id).await? else {
                print_missing("incident", &id);
                return Ok(());
            };
            let draft = fields.overlay(IncidentDraft::from(&current));
            let echo = client.update_incident(&id, &draft).await?;
            print_created("incident", echo)?;
        }
        IncidentCommand::Delete { id } => {
            client.delete_incident(&id).await?;
            println!("{} incident {} deleted", "✔".green(), id.bold());
        }
    }
    Ok(())
}

async fn run_sensors(client: &ApiClient, command: SensorCommand, json: bool) -> Result<()> {
    match command {
        SensorCommand::List => {
            let sensors = client.list_sensors().await;
            if json {
                return print_json(&sensors);
            }
            header(&format!("Sensors ({})", sensors.len()));
            for sensor in &sensors {
                let status = sensor
                    .status
                    .as_ref()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let status = if sensor.is_reporting() {
                    status.green()
                } else {
                    status.red()
                };
                println!(
                    "{:>6}  {:<12} {:<12} {} {}",
                    sensor.id.bold(),
                    sensor.kind.as_ref().map(|k| k.to_string()).unwrap_or_default(),
                    status,
                    sensor.last_reading.value,
                    sensor.last_reading.unit.dimmed()
                );
            }
        }
        SensorCommand::Get { id } => match client.try_get_sensor(&id).await? {
            Some(sensor) => print_json(&sensor)?,
            None => print_missing("sensor", &id),
        },
        SensorCommand::Create(fields) => {
            let echo = client.create_sensor(&fields.into()).await?;
            print_created("sensor", echo)?;
        }
        SensorCommand::Update { id, fields } => {
            let Some(current) = client.try_get_sensor(&id).await? else {
                print_missing("sensor", &id);
                return Ok(());
            };
            let draft = fields.overlay(SensorDraft::from(&current));
            let echo = client.update_sensor(&id, &draft).await?;
            print_created("sensor", echo)?;
        }
        SensorCommand::Delete { id } => {
            client.delete_sensor(&id).await?;
            println!("{} sensor {} deleted", "✔".green(), id.bold());
        }
    }
    Ok(())
}

async fn run_cameras(client: &ApiClient, command: CameraCommand, json: bool) -> Result<()> {
    match command {
        CameraCommand::List => {
            let cameras = client.list_cameras().await;
            if json {
                return print_json(&cameras);
            }
            header(&format!("Cameras ({})", cameras.len()));
            for camera in &cameras {
                let status = if camera.is_online() {
                    camera.status.to_string().green()
                } else {
                    camera.status.to_string().red()
                };
                println!(
                    "{:>6}  {:<24} {:<12} {}",
                    camera.id.bold(),
                    camera.name,
                    status,
                    camera.location.address.dimmed()
                );
            }
        }
        CameraCommand::Get { id } => match client.try_get_camera(&id).await? {
            Some(camera) => print_json(&camera)?,
            None => print_missing("camera", &id),
        },
        CameraCommand::Create(fields) => {
            let echo = client.create_camera(&fields.into()).await?;
            print_created("camera", echo)?;
        }
        CameraCommand::Update { id, fields } => {
            let Some(current) = client.try_get_camera(&id).await? else {
                print_missing("camera", &id);
                return Ok(());
            };
            let draft = fields.overlay(CameraDraft::from(&current));
            let echo = client.update_camera(&id, &draft).await?;
            print_created("camera", echo)?;
        }
        CameraCommand::Delete { id } => {
            client.delete_camera(&id).await?;
            println!("{} camera {} deleted", "✔".green(), id.bold());
        }
    }
    Ok(())
}

async fn run_alerts(client: &ApiClient, command: AlertCommand, json: bool) -> Result<()> {
    match command {
        AlertCommand::List => {
            let alerts = client.list_alerts().await;
            if json {
                return print_json(&alerts);
            }
            header(&format!("Alerts ({})", alerts.len()));
            for alert in &alerts {
                println!(
                    "{:>6}  {:<9} {}  {}",
                    alert.id.bold(),
                    alert.priority.to_string().yellow(),
                    alert.title,
                    alert.timestamp.to_rfc3339().dimmed()
                );
            }
        }
        AlertCommand::Get { id } => match client.try_get_alert(&id).await? {
            Some(alert) => print_json(&alert)?,
            None => print_missing("alert", &id),
        },
        AlertCommand::Create(fields) => {
            let echo = client.create_alert(&fields.into()).await?;
            print_created("alert", echo)?;
        }
        AlertCommand::Update { id, fields } => {
            let Some(current) = client.try_get_alert(&id).await? else {
                print_missing("alert", &id);
                return Ok(());
            };
            let draft = fields.overlay(AlertDraft::from(&current));
            let echo = client.update_alert(&id, &draft).await?;
            print_created("alert", echo)?;
        }
        AlertCommand::Delete { id } => {
            client.delete_alert(&id).await?;
            println!("{} alert {} deleted", "✔".green(), id.bold());
        }
    }
    Ok(())
}

async fn run_whoami(session: &SessionContext) -> Result<()> {
    let Some(record) = session.current().await else {
        println!("{} not logged in", "✘".yellow());
        return Ok(());
    };

    println!("{} {} ({})", "●".green(), record.username.bold(), record.role);
    if !record.roles.is_empty() {
        println!("   roles: {}", record.roles.join(", "));
    }
    match record.expires_at() {
        Some(exp) if record.is_expired_at(Utc::now()) => {
            println!("   token: {} at {}", "expired".red(), exp.to_rfc3339())
        }
        Some(exp) => println!("   token: valid until {}", exp.to_rfc3339()),
        None => println!("   token: {}", "no expiry claim".dimmed()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "urbanops_adapter=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::default();
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(path) = cli.session_file {
        config.session_file = path;
    }
    if let Some(secs) = cli.timeout.filter(|s| *s > 0) {
        config.request_timeout = Some(Duration::from_secs(secs));
    }
    tracing::debug!(api = %config.api_base(), session_file = %config.session_file.display(), "Configuration loaded");

    let session = Arc::new(SessionContext::new(Arc::new(FileSessionStore::new(
        config.session_file.clone(),
    ))));
    session
        .init()
        .await
        .context("Failed to load the saved session")?;

    let client = ApiClient::new(&config, session.clone())?;
    let json = cli.json;

    match cli.command {
        Command::Login { username, password } => {
            let record = client.login(&username, &password).await?;
            println!("{} logged in as {} ({})", "✔".green(), record.username.bold(), record.role);
        }
        Command::Register {
            username,
            password,
            email,
            roles,
        } => {
            let request = RegisterRequest::new(&username, &password, email.as_deref(), Some(roles));
            let response = client.register(&request).await?;
            if response.message.is_empty() {
                println!("{} registered {}", "✔".green(), response.username.bold());
            } else {
                println!("{} {}", "✔".green(), response.message);
            }
        }
        Command::Logout => {
            client.logout().await?;
            println!("{} logged out", "✔".green());
        }
        Command::Whoami => run_whoami(&session).await?,
        Command::Profile => match client.try_profile().await? {
            Some(profile) => print_json(&profile)?,
            None => println!("{} no profile", "✘".yellow()),
        },
        Command::ChangePassword { old, new } => {
            client.change_password(&old, &new).await?;
            println!("{} password changed", "✔".green());
        }
        Command::Dashboard => {
            let snapshot = load_dashboard(&client).await;
            if json {
                return print_json(&snapshot);
            }
            header("UrbanOps dashboard");
            println!("   active incidents: {}", snapshot.active_incidents.to_string().bold());
            println!("   online sensors:   {}", snapshot.online_sensors.to_string().bold());
            println!("   online cameras:   {}", snapshot.online_cameras.to_string().bold());
            println!();
            for incident in &snapshot.recent_incidents {
                println!(
                    "   {} {} [{}]",
                    incident.reported_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                    incident.title,
                    incident.severity
                );
            }
        }
        Command::Map => {
            let overview = load_map_overview(&client).await;
            if json {
                return print_json(&overview);
            }
            header("Map layers");
            println!("   incidents: {}", overview.incidents.len());
            println!("   sensors:   {}", overview.sensors.len());
            println!(
                "   cameras:   {} ({} with stream)",
                overview.cameras.len(),
                overview.cameras.iter().filter(|c| c.has_stream()).count()
            );
        }
        Command::Analytics => {
            let snapshot = load_analytics(&client).await;
            if json {
                return print_json(&snapshot);
            }
            let severity = snapshot.incidents_by_severity;
            header("Analytics");
            println!("   active alerts:   {}", snapshot.active_alerts.to_string().bold());
            println!("   incidents:       {}", snapshot.total_incidents);
            println!(
                "   by severity:     critical {} | high {} | medium {} | low {}",
                severity.critical, severity.high, severity.medium, severity.low
            );
        }
        Command::Incidents(command) => run_incidents(&client, command, json).await?,
        Command::Sensors(command) => run_sensors(&client, command, json).await?,
        Command::Cameras(command) => run_cameras(&client, command, json).await?,
        Command::Alerts(command) => run_alerts(&client, command, json).await?,
        Command::Predictions { send: Some(path) } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let body: Value = serde_json::from_str(&raw)?;
            client.send_predictions(&body).await?;
            println!("{} predictions sent", "✔".green());
        }
        Command::Predictions { send: None } => print_json(&client.predictions().await)?,
        Command::Geocode { lat, lng } => {
            let geocoder = ReverseGeocoder::new(&config)?;
            let place = geocoder
                .place_name(lat, lng)
                .await
                .ok_or_else(|| anyhow!("Could not resolve {}, {}", lat, lng))?;
            println!("{}", place);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use urbanops_adapter::entities::{
        normalize_camera, normalize_incident, normalize_sensor, CameraPayload, IncidentPayload,
        SensorPayload,
    };

    fn incident_args() -> IncidentArgs {
        IncidentArgs {
            title: None,
            description: None,
            location: None,
            status: None,
            severity: None,
        }
    }

    #[test]
    fn test_incident_status_update_keeps_stored_fields() {
        let current = normalize_incident(
            &json!({
                "id": 5,
                "description": "Flooding",
                "location": "Main St",
                "status": "INVESTIGATING",
                "severity": "HIGH"
            }),
            Utc::now(),
        );
        let args = IncidentArgs {
            status: Some(IncidentStatus::Resolved),
            ..incident_args()
        };

        let draft = args.overlay(IncidentDraft::from(&current));
        let payload = serde_json::to_value(IncidentPayload::from_draft(&draft)).unwrap();
        assert_eq!(
            payload,
            json!({
                "description": "Flooding",
                "location": "Main St",
                "status": "RESOLVED",
                "severity": "HIGH"
            })
        );
    }

    #[test]
    fn test_incident_title_update_rewrites_description() {
        let current = normalize_incident(
            &json!({"id": 5, "description": "Flooding", "severity": "LOW"}),
            Utc::now(),
        );
        let args = IncidentArgs {
            title: Some("Flooding on Main St".to_string()),
            ..incident_args()
        };

        let payload = IncidentPayload::from_draft(&args.overlay(IncidentDraft::from(&current)));
        assert_eq!(payload.description, "Flooding on Main St");
        assert_eq!(payload.severity, "LOW");
    }

    #[test]
    fn test_sensor_status_update_keeps_value_and_type() {
        let current = normalize_sensor(
            &json!({"id": 7, "type": "water", "status": "ONLINE", "value": 42}),
            Utc::now(),
        );
        let args = SensorArgs {
            kind: None,
            value: None,
            status: Some("offline".to_string()),
        };

        let payload =
            SensorPayload::from_draft(&args.overlay(SensorDraft::from(&current)), Utc::now());
        assert_eq!(payload.value, 42.0);
        assert_eq!(payload.kind, "water");
        assert_eq!(payload.status, "OFFLINE");
    }

    #[test]
    fn test_camera_rename_keeps_stream() {
        let current = normalize_camera(
            &json!({
                "id": 3,
                "name": "Gate",
                "location": "North Gate",
                "status": "ONLINE",
                "streamUrl": "rtsp://cam3"
            }),
            Utc::now(),
        );
        let args = CameraArgs {
            name: Some("North Gate PTZ".to_string()),
            location: None,
            status: None,
            stream_url: None,
        };

        let payload =
            CameraPayload::from_draft(&args.overlay(CameraDraft::from(&current)), Utc::now());
        assert_eq!(payload.name, "North Gate PTZ");
        assert_eq!(payload.location, "North Gate");
        assert_eq!(payload.status, "ONLINE");
        assert_eq!(payload.stream_url, "rtsp://cam3");
    }

    #[test]
    fn test_alert_overlay_keeps_timestamp() {
        let current = urbanops_adapter::entities::normalize_alert(
            &json!({"id": 1, "title": "Flood", "priority": "HIGH", "timestamp": "2024-05-01T08:00:00Z"}),
            Utc::now(),
        );
        let args = AlertArgs {
            title: None,
            message: Some("Water receding".to_string()),
            priority: None,
        };

        let draft = args.overlay(AlertDraft::from(&current));
        assert_eq!(draft.title.as_deref(), Some("Flood"));
        assert_eq!(draft.priority, Some(Priority::High));
        assert_eq!(draft.timestamp, Some(current.timestamp));
    }
}
