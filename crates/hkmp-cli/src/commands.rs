use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail};
use hkmp_core::analytics::{track_parking_search, track_performance, track_user_location};
use hkmp_core::{AppConfig, ParkingPoint, SharedAnalytics};
use hkmp_kml::{DocumentSource, KmlGenerator, KmlLoader, LatestLoad, LoadOutcome};
use hkmp_nav::{DeviceSignals, LinkResolver, Navigator, OpenTimings, ProviderId};

use crate::host::PrintingHost;
use crate::{DeviceArgs, LocationArgs, NearArgs};

impl LocationArgs {
    fn point(&self) -> anyhow::Result<ParkingPoint> {
        ParkingPoint::new(self.name.clone(), self.lat, self.lng)
            .ok_or_else(|| anyhow!("--lat and --lng must be finite numbers"))
    }
}

impl NearArgs {
    fn position(&self) -> Option<(f64, f64)> {
        self.near_lat.zip(self.near_lng)
    }
}

impl DeviceArgs {
    fn signals(&self) -> DeviceSignals {
        DeviceSignals {
            user_agent: self.user_agent.clone(),
            platform: self.platform.clone(),
            max_touch_points: self.max_touch_points,
            ms_stream: false,
        }
    }
}

pub(crate) async fn run_points(
    config: &AppConfig,
    analytics: SharedAnalytics,
    url: Option<String>,
    filter: Option<String>,
    near: &NearArgs,
    json: bool,
) -> anyhow::Result<()> {
    let loader = KmlLoader::from_config(config, Arc::clone(&analytics))?;
    let latest = LatestLoad::new(Arc::new(loader));
    let url = url.unwrap_or_else(|| config.kml_url.clone());

    if let LoadOutcome::Cancelled = latest.load(&url).await {
        tracing::warn!(url, "load was cancelled");
    }

    let points = latest.points();
    let mut selected = select_points(&points, filter.as_deref(), &analytics);
    let origin = near.position();
    if let Some((lat, lng)) = origin {
        track_user_location(analytics.as_ref(), lat, lng);
        sort_by_distance(&mut selected, lat, lng);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
    } else {
        for point in &selected {
            match origin {
                Some((lat, lng)) => println!(
                    "{:>7.0} m\t{}\t{}",
                    point.distance_m(lat, lng),
                    point.coordinate_label(),
                    point.name
                ),
                None => println!("{}\t{}", point.coordinate_label(), point.name),
            }
        }
        tracing::info!(shown = selected.len(), total = points.len(), "parking spaces");
    }
    Ok(())
}

fn sort_by_distance(points: &mut [&ParkingPoint], lat: f64, lng: f64) {
    points.sort_by(|a, b| a.distance_m(lat, lng).total_cmp(&b.distance_m(lat, lng)));
}

fn select_points<'a>(
    points: &'a [ParkingPoint],
    filter: Option<&str>,
    analytics: &SharedAnalytics,
) -> Vec<&'a ParkingPoint> {
    match filter {
        Some(term) => {
            track_parking_search(analytics.as_ref(), term);
            points.iter().filter(|p| p.matches_name(term)).collect()
        }
        None => points.iter().collect(),
    }
}

pub(crate) fn run_links(
    config: &AppConfig,
    location: &LocationArgs,
    device: &DeviceArgs,
    json: bool,
) -> anyhow::Result<()> {
    let point = location.point()?;
    let device_class = device.signals().classify();
    let targets =
        LinkResolver::from_config(config).build_targets(&point, &location.name, device_class);

    if json {
        let targets: Vec<_> = targets.values().collect();
        println!("{}", serde_json::to_string_pretty(&targets)?);
        return Ok(());
    }

    println!(
        "{} ({}), device: {device_class}",
        point.name,
        point.coordinate_label()
    );
    for target in targets.values() {
        println!("{:<14} app: {}", target.provider.label(), target.app_uri);
        println!("{:<14} web: {}", "", target.web_uri);
    }
    Ok(())
}

pub(crate) async fn run_open(
    config: &AppConfig,
    analytics: SharedAnalytics,
    location: &LocationArgs,
    device: &DeviceArgs,
    provider: ProviderId,
) -> anyhow::Result<()> {
    let point = location.point()?;
    let device_class = device.signals().classify();
    let target = LinkResolver::from_config(config).build_target(
        provider,
        &point,
        &location.name,
        device_class,
    );

    let navigator = Navigator::new(
        Arc::new(PrintingHost),
        OpenTimings::from_config(config),
        analytics,
    );
    // A terminal never loses focus to a native app, so only the timers can resolve.
    navigator
        .open(&point, &target, device_class, std::future::pending())
        .await;
    Ok(())
}

pub(crate) async fn run_generate_kml(
    config: &AppConfig,
    analytics: SharedAnalytics,
    url: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let output = match output {
        Some(path) => path,
        None => match DocumentSource::parse(&config.fallback_kml) {
            DocumentSource::File(path) => path,
            DocumentSource::Url(url) => {
                bail!("HKMP_FALLBACK_KML is a URL ({url}); pass --output to choose a file")
            }
        },
    };
    let url = url.unwrap_or_else(|| config.wfs_url.clone());

    let started = Instant::now();
    let generated = KmlGenerator::from_config(config)?
        .generate_to_file(&url, &output)
        .await?;
    track_performance(
        analytics.as_ref(),
        "kml_generate_time",
        started.elapsed().as_secs_f64() * 1000.0,
    );

    println!(
        "wrote {} placemarks to {} ({} skipped)",
        generated.placemarks,
        output.display(),
        generated.skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use hkmp_core::MemoryAnalytics;

    use super::*;

    fn points() -> Vec<ParkingPoint> {
        vec![
            ParkingPoint::new("彌敦道", 22.31, 114.17).unwrap(),
            ParkingPoint::new("Queen's Road", 22.28, 114.15).unwrap(),
        ]
    }

    #[test]
    fn select_without_filter_keeps_everything() {
        let analytics: SharedAnalytics = Arc::new(MemoryAnalytics::new());
        let points = points();
        assert_eq!(select_points(&points, None, &analytics).len(), 2);
    }

    #[test]
    fn filter_matches_names_and_records_search() {
        let memory = Arc::new(MemoryAnalytics::new());
        let analytics: SharedAnalytics = memory.clone();
        let points = points();
        let selected = select_points(&points, Some("queen"), &analytics);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "Queen's Road");
        assert_eq!(memory.actions(), vec!["search"]);
    }

    #[test]
    fn sorts_nearest_first() {
        let points = points();
        let mut selected: Vec<_> = points.iter().collect();
        // Central is closer to Queen's Road than to Nathan Road.
        sort_by_distance(&mut selected, 22.2819, 114.1582);
        assert_eq!(selected[0].name, "Queen's Road");
        sort_by_distance(&mut selected, 22.3193, 114.1694);
        assert_eq!(selected[0].name, "彌敦道");
    }

    #[test]
    fn near_position_needs_both_coordinates() {
        let near = NearArgs {
            near_lat: Some(22.3),
            near_lng: None,
        };
        assert_eq!(near.position(), None);
        let near = NearArgs {
            near_lat: Some(22.3),
            near_lng: Some(114.1),
        };
        assert_eq!(near.position(), Some((22.3, 114.1)));
    }

    #[test]
    fn location_rejects_non_finite_coordinates() {
        let location = LocationArgs {
            lat: f64::NAN,
            lng: 114.0,
            name: "x".to_owned(),
        };
        assert!(location.point().is_err());
    }

    #[test]
    fn device_args_map_to_signals() {
        let device = DeviceArgs {
            user_agent: "Android 14".to_owned(),
            platform: String::new(),
            max_touch_points: 0,
        };
        assert_eq!(
            device.signals().classify(),
            hkmp_nav::DeviceClass::Android
        );
    }
}
