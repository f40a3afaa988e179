//! Injected analytics capability.
//!
//! The core never talks to a telemetry vendor directly. Callers hand it an
//! [`Analytics`] implementation; every method is fire-and-forget and must not
//! fail or block the flow that emitted the event.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::points::ParkingPoint;

/// A named analytics event with an optional key-value payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsEvent {
    pub action: String,
    pub category: String,
    pub label: Option<String>,
    pub value: Option<f64>,
    pub payload: BTreeMap<String, Value>,
    pub occurred_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    #[must_use]
    pub fn new(action: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            category: category.into(),
            label: None,
            value: None,
            payload: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

pub trait Analytics: Send + Sync {
    fn track_event(&self, event: AnalyticsEvent);

    fn track_page_view(&self, page: &str);
}

pub type SharedAnalytics = Arc<dyn Analytics>;

/// Emits events as structured `tracing` records under the `hkmp::analytics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalytics;

impl Analytics for TracingAnalytics {
    fn track_event(&self, event: AnalyticsEvent) {
        let payload = serde_json::to_string(&event.payload).unwrap_or_default();
        tracing::info!(
            target: "hkmp::analytics",
            action = %event.action,
            category = %event.category,
            label = event.label.as_deref().unwrap_or(""),
            value = event.value,
            payload = %payload,
            "analytics event"
        );
    }

    fn track_page_view(&self, page: &str) {
        tracing::info!(target: "hkmp::analytics", page, "page view");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalytics;

impl Analytics for NoopAnalytics {
    fn track_event(&self, _event: AnalyticsEvent) {}

    fn track_page_view(&self, _page: &str) {}
}

/// Keeps every event in memory. Handy for tests and for dumping a session summary.
#[derive(Debug, Default)]
pub struct MemoryAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
    page_views: Mutex<Vec<String>>,
}

impl MemoryAnalytics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn actions(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.action).collect()
    }

    #[must_use]
    pub fn page_views(&self) -> Vec<String> {
        self.page_views
            .lock()
            .map(|pages| pages.clone())
            .unwrap_or_default()
    }
}

impl Analytics for MemoryAnalytics {
    fn track_event(&self, event: AnalyticsEvent) {
        // A poisoned lock drops the event rather than propagating the panic.
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn track_page_view(&self, page: &str) {
        if let Ok(mut pages) = self.page_views.lock() {
            pages.push(page.to_owned());
        }
    }
}

pub fn track_user_location(sink: &dyn Analytics, latitude: f64, longitude: f64) {
    sink.track_event(
        AnalyticsEvent::new("user_location", "geolocation")
            .with_label(format!("{latitude},{longitude}"))
            .with_field("lat", latitude)
            .with_field("lng", longitude),
    );
}

pub fn track_parking_search(sink: &dyn Analytics, search_term: &str) {
    sink.track_event(
        AnalyticsEvent::new("search", "parking_location")
            .with_label(search_term)
            .with_field("search_term", search_term),
    );
}

pub fn track_navigation_click(sink: &dyn Analytics, provider: &str, point: &ParkingPoint) {
    sink.track_event(
        AnalyticsEvent::new("navigation_click", "map_interaction")
            .with_label(provider)
            .with_field("app_name", provider)
            .with_field("lat", point.latitude)
            .with_field("lng", point.longitude),
    );
}

/// Records load duration and marker count as two events, matching how the
/// dashboards split them.
pub fn track_kml_load_performance(sink: &dyn Analytics, load_time_ms: f64, marker_count: usize) {
    sink.track_event(
        AnalyticsEvent::new("kml_load_time", "performance")
            .with_label("load_duration")
            .with_value(load_time_ms),
    );
    #[allow(clippy::cast_precision_loss)]
    let marker_count = marker_count as f64;
    sink.track_event(
        AnalyticsEvent::new("marker_count", "data_loading")
            .with_label("total_markers")
            .with_value(marker_count),
    );
}

pub fn track_error(sink: &dyn Analytics, error: &str, context: &str) {
    sink.track_event(
        AnalyticsEvent::new("error", "application")
            .with_label(format!("{context}: {error}"))
            .with_field("error", error)
            .with_field("context", context),
    );
}

pub fn track_performance(sink: &dyn Analytics, metric: &str, value: f64) {
    sink.track_event(
        AnalyticsEvent::new("performance", "timing")
            .with_label(metric)
            .with_value(value),
    );
}
