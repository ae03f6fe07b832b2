//! Dashboard aggregation
//!
//! Page-level loaders that issue several reads concurrently and settle each
//! independently, plus the incident list's client-side filtering.

use crate::api_client::ApiClient;
use crate::entities::{Alert, Camera, Incident, IncidentStatus, Sensor, Severity};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Incidents shown in the dashboard's recent list
pub const RECENT_INCIDENTS: usize = 5;

/// KPI cards and recent incidents
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub recent_incidents: Vec<Incident>,
    pub active_incidents: usize,
    pub online_sensors: usize,
    pub online_cameras: usize,
}

/// Everything plotted on the city map
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapOverview {
    pub incidents: Vec<Incident>,
    pub sensors: Vec<Sensor>,
    pub cameras: Vec<Camera>,
}

/// Load the dashboard.
///
/// Reads never fail, so a failing call yields its empty default while its
/// siblings complete.
pub async fn load_dashboard(client: &ApiClient) -> DashboardSnapshot {
    let (incidents, sensors, cameras) = tokio::join!(
        client.list_incidents(),
        client.list_sensors(),
        client.list_cameras()
    );

    let snapshot = DashboardSnapshot {
        active_incidents: incidents.iter().filter(|i| i.is_active()).count(),
        online_sensors: sensors.iter().filter(|s| s.is_reporting()).count(),
        online_cameras: cameras.iter().filter(|c| c.is_online()).count(),
        recent_incidents: incidents.into_iter().take(RECENT_INCIDENTS).collect(),
    };

    debug!(
        active_incidents = snapshot.active_incidents,
        online_sensors = snapshot.online_sensors,
        online_cameras = snapshot.online_cameras,
        "Dashboard loaded"
    );
    snapshot
}

/// Load the map layers
pub async fn load_map_overview(client: &ApiClient) -> MapOverview {
    let (incidents, sensors, cameras) = tokio::join!(
        client.list_incidents(),
        client.list_sensors(),
        client.list_cameras()
    );
    MapOverview {
        incidents,
        sensors,
        cameras,
    }
}

// ============================================================
// Analytics
// ============================================================

/// Incidents per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn from_incidents(incidents: &[Incident]) -> Self {
        incidents.iter().fold(Self::default(), |mut counts, incident| {
            match incident.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
            counts
        })
    }
}

/// Analytics page KPIs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    /// Critical and high priority alerts
    pub active_alerts: usize,
    pub total_incidents: usize,
    pub incidents_by_severity: SeverityCounts,
    pub incidents_by_status: StatusCounts,
}

impl AnalyticsSnapshot {
    pub fn from_parts(alerts: &[Alert], incidents: &[Incident]) -> Self {
        Self {
            active_alerts: alerts.iter().filter(|a| a.is_urgent()).count(),
            total_incidents: incidents.len(),
            incidents_by_severity: SeverityCounts::from_incidents(incidents),
            incidents_by_status: StatusCounts::from_incidents(incidents),
        }
    }
}

/// Load the analytics KPIs; alerts and incidents settle independently
pub async fn load_analytics(client: &ApiClient) -> AnalyticsSnapshot {
    let (alerts, incidents) = tokio::join!(client.list_alerts(), client.list_incidents());
    let snapshot = AnalyticsSnapshot::from_parts(&alerts, &incidents);

    debug!(
        active_alerts = snapshot.active_alerts,
        total_incidents = snapshot.total_incidents,
        "Analytics loaded"
    );
    snapshot
}

// ============================================================
// Incident filtering
// ============================================================

/// Status tab plus free-text search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentFilter {
    /// `None` is the "all" tab
    pub status: Option<IncidentStatus>,
    pub query: Option<String>,
}

impl IncidentFilter {
    pub fn matches(&self, incident: &Incident) -> bool {
        if let Some(status) = self.status {
            if incident.status != status {
                return false;
            }
        }

        match self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => {
                let query = query.to_lowercase();
                [&incident.title, &incident.description, &incident.incident_type]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&query))
            }
            None => true,
        }
    }

    /// Matching incidents, original order kept
    pub fn apply<'a>(&self, incidents: &'a [Incident]) -> Vec<&'a Incident> {
        incidents.iter().filter(|i| self.matches(i)).collect()
    }
}

/// Per-tab counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub all: usize,
    pub active: usize,
    pub investigating: usize,
    pub resolved: usize,
    pub closed: usize,
}

impl StatusCounts {
    pub fn from_incidents(incidents: &[Incident]) -> Self {
        incidents.iter().fold(
            Self {
                all: incidents.len(),
                ..Self::default()
            },
            |mut counts, incident| {
                match incident.status {
                    IncidentStatus::Active => counts.active += 1,
                    IncidentStatus::Investigating => counts.investigating += 1,
                    IncidentStatus::Resolved => counts.resolved += 1,
                    IncidentStatus::Closed => counts.closed += 1,
                }
                counts
            },
        )
    }
}
