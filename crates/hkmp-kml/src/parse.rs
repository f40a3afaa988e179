//! KML placemark extraction.
//!
//! Every `<Placemark>` is one record. Names fall back to `停車位 {n}` where `n`
//! is the 1-based position among all placemarks, skipped ones included.
//! KML stores `longitude,latitude[,altitude]`; points come out as
//! latitude/longitude.

use hkmp_core::ParkingPoint;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::KmlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Coordinates,
}

impl Field {
    fn tag(self) -> &'static [u8] {
        match self {
            Field::Name => b"name",
            Field::Coordinates => b"coordinates",
        }
    }
}

/// Text collected for the placemark currently being read. `None` means the
/// element has not been seen yet; only the first occurrence counts.
#[derive(Debug, Default)]
struct Placemark {
    name: Option<String>,
    coordinates: Option<String>,
}

impl Placemark {
    fn buffer(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Name => &mut self.name,
            Field::Coordinates => &mut self.coordinates,
        }
    }

    fn into_point(self, index: usize) -> Option<ParkingPoint> {
        let name = self
            .name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_name(index));

        let Some(text) = self.coordinates else {
            tracing::debug!(index, name = %name, "placemark has no coordinates; skipping");
            return None;
        };

        let Some((latitude, longitude)) = parse_coordinates(&text) else {
            tracing::debug!(index, name = %name, coordinates = %text, "invalid coordinates; skipping");
            return None;
        };

        ParkingPoint::new(name, latitude, longitude)
    }
}

/// Generated label for a placemark without a usable name.
#[must_use]
pub fn default_name(index: usize) -> String {
    format!("停車位 {index}")
}

/// Parses KML `coordinates` text into `(latitude, longitude)`.
///
/// Only the first whitespace-separated tuple is read, and only its first two
/// values; altitude and further tuples are ignored. Whitespace next to a comma
/// stays inside the tuple.
fn parse_coordinates(text: &str) -> Option<(f64, f64)> {
    let tuple = first_tuple(text);
    let mut values = tuple.split(',');
    let longitude = values.next()?.trim().parse::<f64>().ok()?;
    let latitude = values.next()?.trim().parse::<f64>().ok()?;
    (longitude.is_finite() && latitude.is_finite()).then_some((latitude, longitude))
}

fn first_tuple(text: &str) -> String {
    let mut tokens = text.split_whitespace().peekable();
    let mut tuple = String::new();
    while let Some(token) = tokens.next() {
        tuple.push_str(token);
        let joined = tuple.ends_with(',') || tokens.peek().is_some_and(|t| t.starts_with(','));
        if !joined {
            break;
        }
    }
    tuple
}

/// Parse a KML document into parking points, in document order.
///
/// # Errors
///
/// Returns [`KmlError::Xml`] if the document is not well-formed XML.
/// Individual malformed placemarks are skipped, not reported.
pub fn parse_kml(xml: &str) -> Result<Vec<ParkingPoint>, KmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut points = Vec::new();
    let mut index = 0usize;
    let mut current: Option<Placemark> = None;
    let mut capture: Option<Field> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"Placemark" => {
                        index += 1;
                        current = Some(Placemark::default());
                        capture = None;
                    }
                    tag if capture.is_none() => {
                        if let Some(field) = field_for(tag) {
                            if let Some(placemark) = current.as_mut() {
                                let buffer = placemark.buffer(field);
                                if buffer.is_none() {
                                    *buffer = Some(String::new());
                                    capture = Some(field);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"Placemark" => {
                        index += 1;
                        tracing::debug!(index, "empty placemark; skipping");
                    }
                    tag if capture.is_none() => {
                        if let (Some(field), Some(placemark)) = (field_for(tag), current.as_mut()) {
                            placemark.buffer(field).get_or_insert_with(String::new);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if let (Some(field), Some(placemark)) = (capture, current.as_mut()) {
                    let text = e.unescape()?;
                    if let Some(buffer) = placemark.buffer(field) {
                        buffer.push_str(&text);
                    }
                }
            }
            Event::CData(e) => {
                if let (Some(field), Some(placemark)) = (capture, current.as_mut()) {
                    let text = String::from_utf8_lossy(e.as_ref());
                    if let Some(buffer) = placemark.buffer(field) {
                        buffer.push_str(&text);
                    }
                }
            }
            Event::End(e) => {
                let local = e.local_name();
                let tag = local.as_ref();
                if capture.is_some_and(|field| field.tag() == tag) {
                    capture = None;
                } else if tag == b"Placemark" {
                    if let Some(placemark) = current.take() {
                        points.extend(placemark.into_point(index));
                    }
                    capture = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    tracing::debug!(placemarks = index, points = points.len(), "parsed KML document");
    Ok(points)
}

fn field_for(tag: &[u8]) -> Option<Field> {
    match tag {
        b"name" => Some(Field::Name),
        b"coordinates" => Some(Field::Coordinates),
        _ => None,
    }
}
