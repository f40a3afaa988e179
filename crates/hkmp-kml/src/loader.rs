//! Fetch-with-fallback loading of the parking KML document.
//!
//! [`KmlLoader::load`] never fails: a broken primary source falls back to the
//! configured local document once, and a broken fallback yields no points.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hkmp_core::analytics::{track_error, track_kml_load_performance};
use hkmp_core::{AppConfig, NoopAnalytics, ParkingPoint, SharedAnalytics};
use reqwest::Client;

use crate::error::LoaderError;
use crate::parse::parse_kml;
use crate::retry::{retry_with_backoff, Backoff};
use crate::source::DocumentSource;

pub struct KmlLoader {
    client: Client,
    fallback: DocumentSource,
    backoff: Backoff,
    analytics: SharedAnalytics,
}

impl KmlLoader {
    /// Creates a loader with no retries and analytics disabled.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        fallback: DocumentSource,
    ) -> Result<Self, LoaderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            fallback,
            backoff: Backoff {
                max_retries: 0,
                base_ms: 0,
            },
            analytics: Arc::new(NoopAnalytics),
        })
    }

    /// Creates a loader from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn from_config(config: &AppConfig, analytics: SharedAnalytics) -> Result<Self, LoaderError> {
        Ok(Self::new(
            config.request_timeout_secs,
            &config.user_agent,
            DocumentSource::parse(&config.fallback_kml),
        )?
        .with_retries(config.max_retries, config.retry_backoff_base_ms)
        .with_analytics(analytics))
    }

    /// Retries transient primary failures `max_retries` more times before falling back.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.backoff = Backoff {
            max_retries,
            base_ms: backoff_base_ms,
        };
        self
    }

    #[must_use]
    pub fn with_analytics(mut self, analytics: SharedAnalytics) -> Self {
        self.analytics = analytics;
        self
    }

    #[must_use]
    pub fn fallback(&self) -> &DocumentSource {
        &self.fallback
    }

    /// Loads points from `primary`, falling back to the local document on failure.
    ///
    /// Returns an empty vector when both sources fail.
    pub async fn load(&self, primary: &str) -> Vec<ParkingPoint> {
        let started = Instant::now();
        let primary = DocumentSource::parse(primary);
        tracing::info!(source = %primary, "loading KML");

        let source = &primary;
        let primary_result =
            retry_with_backoff(self.backoff, source, move || self.load_source(source)).await;

        match primary_result {
            Ok(points) => {
                self.record_success(started, points.len(), &primary);
                return points;
            }
            Err(err) => {
                tracing::warn!(source = %primary, error = %err, "primary KML source failed; trying fallback");
                track_error(self.analytics.as_ref(), &err.to_string(), "kml_primary");
            }
        }

        match self.load_source(&self.fallback).await {
            Ok(points) => {
                self.record_success(started, points.len(), &self.fallback);
                points
            }
            Err(err) => {
                tracing::error!(source = %self.fallback, error = %err, "fallback KML source also failed; no points loaded");
                track_error(self.analytics.as_ref(), &err.to_string(), "kml_fallback");
                Vec::new()
            }
        }
    }

    /// Fetches and parses a single source with no fallback.
    ///
    /// # Errors
    ///
    /// - [`LoaderError::Http`] on transport failure.
    /// - [`LoaderError::UnexpectedStatus`] on a non-2xx response.
    /// - [`LoaderError::Io`] if a local file cannot be read.
    /// - [`LoaderError::Parse`] if the document is not well-formed XML.
    pub async fn load_source(
        &self,
        source: &DocumentSource,
    ) -> Result<Vec<ParkingPoint>, LoaderError> {
        let body = self.fetch_document(source).await?;
        tracing::debug!(source = %source, bytes = body.len(), "fetched KML document");
        parse_kml(&body).map_err(|e| LoaderError::Parse {
            origin: source.to_string(),
            source: e,
        })
    }

    /// Reads the raw document text.
    ///
    /// # Errors
    ///
    /// See [`KmlLoader::load_source`].
    pub async fn fetch_document(&self, source: &DocumentSource) -> Result<String, LoaderError> {
        match source {
            DocumentSource::Url(url) => {
                let response = self
                    .client
                    .get(url)
                    .header(
                        reqwest::header::ACCEPT,
                        "application/vnd.google-earth.kml+xml,application/xml,text/xml;q=0.9,*/*;q=0.8",
                    )
                    .send()
                    .await?;
                let status = response.status();
                tracing::debug!(url, status = status.as_u16(), "KML fetch status");
                if !status.is_success() {
                    return Err(LoaderError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.clone(),
                    });
                }
                Ok(response.text().await?)
            }
            DocumentSource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| LoaderError::Io {
                        path: path.display().to_string(),
                        source: e,
                    })
            }
        }
    }

    fn record_success(&self, started: Instant, count: usize, source: &DocumentSource) {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(source = %source, count, elapsed_ms, "loaded parking points");
        track_kml_load_performance(self.analytics.as_ref(), elapsed_ms, count);
    }
}
