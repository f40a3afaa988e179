//! Deep-link and web-fallback URIs for each map provider.
//!
//! The URI shapes are fixed by the external apps; do not reformat them.

use std::collections::BTreeMap;

use hkmp_core::{AppConfig, ParkingPoint};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::device::DeviceClass;
use crate::provider::ProviderId;

/// Characters left alone by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationTarget {
    pub provider: ProviderId,
    pub app_uri: String,
    pub web_uri: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkResolver {
    /// `sourceApplication` reported to AMap.
    pub amap_source_application: String,
    /// `src` reported to Baidu Map.
    pub baidu_src: String,
}

impl Default for LinkResolver {
    fn default() -> Self {
        Self {
            amap_source_application: "hkmp".to_owned(),
            baidu_src: "webapp.baidu.openAPIdemo".to_owned(),
        }
    }
}

impl LinkResolver {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            amap_source_application: config.amap_source_app.clone(),
            baidu_src: config.baidu_src.clone(),
        }
    }

    /// Builds one target per provider. Pure: no I/O, no shared state.
    #[must_use]
    pub fn build_targets(
        &self,
        point: &ParkingPoint,
        display_name: &str,
        device: DeviceClass,
    ) -> BTreeMap<ProviderId, NavigationTarget> {
        ProviderId::ALL
            .into_iter()
            .map(|provider| (provider, self.build_target(provider, point, display_name, device)))
            .collect()
    }

    #[must_use]
    pub fn build_target(
        &self,
        provider: ProviderId,
        point: &ParkingPoint,
        display_name: &str,
        device: DeviceClass,
    ) -> NavigationTarget {
        let lat = point.latitude;
        let lng = point.longitude;
        let name = utf8_percent_encode(display_name, URI_COMPONENT).to_string();

        let (app_uri, web_uri) = match provider {
            ProviderId::Waze => (
                format!("waze://?ll={lat},{lng}&navigate=no"),
                format!("https://waze.com/ul?ll={lat},{lng}&navigate=no&z=17"),
            ),
            ProviderId::GoogleMaps => {
                let app = if device == DeviceClass::Ios {
                    format!("comgooglemaps://?center={lat},{lng}&zoom=14&views=traffic")
                } else {
                    format!("geo:<{lat},{lng}>?q={lat},{lng}({name})")
                };
                (app, format!("https://maps.google.com/maps?q={lat},{lng}"))
            }
            ProviderId::AppleMaps => (
                format!("maps://?q={lat},{lng}"),
                format!("https://maps.apple.com/?q={lat},{lng}"),
            ),
            ProviderId::AMap => {
                let scheme = if device == DeviceClass::Android {
                    "androidamap"
                } else {
                    "iosamap"
                };
                let source = utf8_percent_encode(&self.amap_source_application, URI_COMPONENT);
                (
                    format!(
                        "{scheme}://viewMap?sourceApplication={source}&poiname={name}&lat={lat}&lon={lng}&dev=0"
                    ),
                    format!(
                        "https://uri.amap.com/marker?position={lng},{lat},{name}&coordinate=wgs84&callnative=1"
                    ),
                )
            }
            ProviderId::BaiduMap => {
                let src = utf8_percent_encode(&self.baidu_src, URI_COMPONENT);
                (
                    format!(
                        "baidumap://map/marker?location={lat},{lng}&title={name}&content={name}&coord_type=wgs84&src={src}"
                    ),
                    format!(
                        "https://api.map.baidu.com/marker?location={lat},{lng}&title={name}&content={name}&coord_type=wgs84&output=html&src={src}"
                    ),
                )
            }
            ProviderId::GenericGeoUri => (
                geo_uri(lat, lng, &name),
                format!("https://www.openstreetmap.org/?mlat={lat}&mlon={lng}#map=17/{lat}/{lng}"),
            ),
        };

        NavigationTarget {
            provider,
            app_uri,
            web_uri,
            display_name: display_name.to_owned(),
        }
    }
}

/// RFC 5870 `geo:` URI with a labelled query.
fn geo_uri(lat: f64, lng: f64, encoded_name: &str) -> String {
    format!("geo:{lat},{lng}?q={lat},{lng}({encoded_name})")
}

/// [`LinkResolver::build_targets`] with default source identifiers.
#[must_use]
pub fn build_targets(
    point: &ParkingPoint,
    display_name: &str,
    device: DeviceClass,
) -> BTreeMap<ProviderId, NavigationTarget> {
    LinkResolver::default().build_targets(point, display_name, device)
}
