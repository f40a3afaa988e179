use std::time::Duration;

pub const DEFAULT_KML_URL: &str = "https://raw.githubusercontent.com/wingyeung0317/-HKOSMP-KML-Google-Maps-/refs/heads/Automatic/motorcycleParking.kml";

/// HK eMobility WFS query for on-street motorcycle spaces, as GeoJSON.
pub const DEFAULT_WFS_URL: &str = "https://www.hkemobility.gov.hk/api/drss/layer/map/?typeName=DRSS%3AVW_ON_STREET_PARKING&service=WFS&version=1.0.0&request=GetFeature&outputFormat=application%2Fjson&styles=OSP_Type_ALL&cql_filter=(VEHICLE_TYPE%20%3D%20'Motor%20Cycles')%20AND%20BBOX(SHAPE%2C%20113.7715210770302%2C22.09149645255427%2C114.56486620617868%2C22.58284043586623)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which analytics sink the binary wires into the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsMode {
    Tracing,
    Off,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub kml_url: String,
    /// Local path or `http(s)` URL tried once when the primary source fails.
    pub fallback_kml: String,
    /// GeoJSON feed that `generate-kml` turns into a KML document.
    pub wfs_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub app_fallback_delay_ms: u64,
    pub app_safety_timeout_ms: u64,
    pub amap_source_app: String,
    pub baidu_src: String,
    pub analytics: AnalyticsMode,
}

impl AppConfig {
    #[must_use]
    pub fn app_fallback_delay(&self) -> Duration {
        Duration::from_millis(self.app_fallback_delay_ms)
    }

    #[must_use]
    pub fn app_safety_timeout(&self) -> Duration {
        Duration::from_millis(self.app_safety_timeout_ms)
    }
}
