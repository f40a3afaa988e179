//! Builds the parking KML document from the HK eMobility WFS feed.
//!
//! The feed is GeoJSON: one `Point` feature per on-street motorcycle space,
//! named by its Traditional Chinese street name. Each feature becomes a
//! `Placemark` whose `coordinates` are written `lng,lat`, which is what
//! [`crate::parse_kml`] reads back.

use std::path::Path;
use std::time::{Duration, Instant};

use hkmp_core::AppConfig;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{KmlError, LoaderError};

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";
const EMOBILITY_ORIGIN: &str = "https://www.hkemobility.gov.hk";
const EMOBILITY_REFERER: &str = "https://www.hkemobility.gov.hk/tc/toll-rate/";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: FeatureProperties,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    /// `[lng, lat]` for points; nested arrays for other geometry types.
    #[serde(default)]
    pub coordinates: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureProperties {
    #[serde(rename = "STREET_NAME_TC")]
    pub street_name_tc: Option<String>,
}

impl Feature {
    /// `(lng, lat)` when the geometry is a point with finite coordinates.
    fn lng_lat(&self) -> Option<(f64, f64)> {
        let values = self.geometry.as_ref()?.coordinates.as_array()?;
        let lng = values.first()?.as_f64()?;
        let lat = values.get(1)?.as_f64()?;
        (lng.is_finite() && lat.is_finite()).then_some((lng, lat))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedKml {
    pub document: String,
    pub placemarks: usize,
    pub skipped: usize,
}

/// Serializes `collection` as a KML document.
///
/// Features without point coordinates are skipped. A feature without a street
/// name gets an empty `name`, which readers replace with a generated label.
///
/// # Errors
///
/// Returns [`KmlError`] if the XML writer fails.
pub fn write_kml(collection: &FeatureCollection) -> Result<GeneratedKml, KmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("kml").with_attributes([("xmlns", KML_NAMESPACE)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("Document")))?;

    let mut placemarks = 0;
    let mut skipped = 0;
    for (i, feature) in collection.features.iter().enumerate() {
        let Some((lng, lat)) = feature.lng_lat() else {
            tracing::debug!(feature = i, "feature without point coordinates skipped");
            skipped += 1;
            continue;
        };

        writer.write_event(Event::Start(BytesStart::new("Placemark")))?;
        let name = feature.properties.street_name_tc.as_deref().unwrap_or("");
        writer
            .create_element("name")
            .write_text_content(BytesText::new(name))?;
        writer.write_event(Event::Start(BytesStart::new("Point")))?;
        writer
            .create_element("coordinates")
            .write_text_content(BytesText::new(&format!("{lng},{lat}")))?;
        writer.write_event(Event::End(BytesEnd::new("Point")))?;
        writer.write_event(Event::End(BytesEnd::new("Placemark")))?;
        placemarks += 1;
    }

    writer.write_event(Event::End(BytesEnd::new("Document")))?;
    writer.write_event(Event::End(BytesEnd::new("kml")))?;

    Ok(GeneratedKml {
        document: String::from_utf8_lossy(&writer.into_inner()).into_owned(),
        placemarks,
        skipped,
    })
}

/// Fetches the WFS feed and turns it into KML.
pub struct KmlGenerator {
    client: Client,
}

impl KmlGenerator {
    /// # Errors
    ///
    /// Returns [`LoaderError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, LoaderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// # Errors
    ///
    /// See [`KmlGenerator::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, LoaderError> {
        Self::new(config.request_timeout_secs, &config.user_agent)
    }

    /// Requests the GeoJSON feed with the portal's `Origin` and `Referer`,
    /// which the WFS endpoint checks.
    ///
    /// # Errors
    ///
    /// - [`LoaderError::Http`] on transport failure or a body that is not
    ///   a GeoJSON feature collection.
    /// - [`LoaderError::UnexpectedStatus`] on a non-2xx response.
    pub async fn fetch_features(&self, url: &str) -> Result<FeatureCollection, LoaderError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ORIGIN, EMOBILITY_ORIGIN)
            .header(reqwest::header::REFERER, EMOBILITY_REFERER)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoaderError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        Ok(response.json::<FeatureCollection>().await?)
    }

    /// Fetches `url` and builds the KML document in memory.
    ///
    /// # Errors
    ///
    /// See [`KmlGenerator::fetch_features`]; also [`LoaderError::Build`] if
    /// serialization fails.
    pub async fn generate(&self, url: &str) -> Result<GeneratedKml, LoaderError> {
        let started = Instant::now();
        let collection = self.fetch_features(url).await?;
        let generated = write_kml(&collection).map_err(|e| LoaderError::Build {
            origin: url.to_owned(),
            source: e,
        })?;
        tracing::info!(
            url,
            placemarks = generated.placemarks,
            skipped = generated.skipped,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "generated KML from WFS feed"
        );
        Ok(generated)
    }

    /// [`KmlGenerator::generate`], then writes the document to `path`.
    ///
    /// # Errors
    ///
    /// See [`KmlGenerator::generate`]; also [`LoaderError::Io`] if the file
    /// cannot be written.
    pub async fn generate_to_file(
        &self,
        url: &str,
        path: &Path,
    ) -> Result<GeneratedKml, LoaderError> {
        let generated = self.generate(url).await?;
        tokio::fs::write(path, generated.document.as_bytes())
            .await
            .map_err(|e| LoaderError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        Ok(generated)
    }
}
