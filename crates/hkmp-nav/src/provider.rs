use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Map providers offered in every parking popup, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ProviderId {
    #[serde(rename = "waze")]
    Waze,
    #[serde(rename = "google-maps")]
    GoogleMaps,
    #[serde(rename = "apple-maps")]
    AppleMaps,
    #[serde(rename = "amap")]
    AMap,
    #[serde(rename = "baidu-map")]
    BaiduMap,
    #[serde(rename = "geo")]
    GenericGeoUri,
}

impl ProviderId {
    pub const ALL: [ProviderId; 6] = [
        ProviderId::Waze,
        ProviderId::GoogleMaps,
        ProviderId::AppleMaps,
        ProviderId::AMap,
        ProviderId::BaiduMap,
        ProviderId::GenericGeoUri,
    ];

    /// Stable identifier used on the command line and in analytics payloads.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            ProviderId::Waze => "waze",
            ProviderId::GoogleMaps => "google-maps",
            ProviderId::AppleMaps => "apple-maps",
            ProviderId::AMap => "amap",
            ProviderId::BaiduMap => "baidu-map",
            ProviderId::GenericGeoUri => "geo",
        }
    }

    /// Button label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ProviderId::Waze => "Waze",
            ProviderId::GoogleMaps => "Google Maps",
            ProviderId::AppleMaps => "Apple Maps",
            ProviderId::AMap => "高德地圖",
            ProviderId::BaiduMap => "百度地圖",
            ProviderId::GenericGeoUri => "地圖應用程式",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ProviderId::ALL
            .into_iter()
            .find(|p| p.slug() == needle)
            .ok_or_else(|| {
                let known: Vec<_> = ProviderId::ALL.iter().map(|p| p.slug()).collect();
                format!("unknown provider \"{s}\"; expected one of {}", known.join(", "))
            })
    }
}
