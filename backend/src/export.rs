use std::io::{Cursor, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use geo_types::Point as GeoPoint;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use quick_xml::events::Event;
use quick_xml::Reader;
use shared::{ExportFormat, Point, RouteDraft, RouteRecord, Segment, Status, SurfaceType};
use zip::{ZipWriter, write::SimpleFileOptions};

use crate::error::ServiceError;

const CREATOR: &str = "route-drafter";
const KMZ_ENTRY: &str = "route.kml";
pub const GPX_IMPORT_NAME: &str = "GPX import";
pub const KML_IMPORT_NAME: &str = "KML import";

pub fn export_route(route: &RouteRecord, format: ExportFormat) -> Result<Vec<u8>, ServiceError> {
    match format {
        ExportFormat::Gpx => encode_gpx(route),
        ExportFormat::Kml => Ok(encode_kml(route).into_bytes()),
        ExportFormat::Kmz => encode_kmz(route),
    }
}

/// One GPX track per segment.
pub fn encode_gpx(route: &RouteRecord) -> Result<Vec<u8>, ServiceError> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        ..Default::default()
    };

    for segment in &route.segments {
        let mut track = Track {
            name: Some(segment.name.clone()),
            ..Default::default()
        };
        let mut track_segment = TrackSegment::new();
        track_segment
            .points
            .extend(segment.points.iter().map(to_waypoint));
        track.segments.push(track_segment);
        gpx.tracks.push(track);
    }

    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(buffer)
}

/// KML document with one `LineString` placemark per segment.
pub fn encode_kml(route: &RouteRecord) -> String {
    let mut kml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    kml.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\"><Document>\n");
    kml.push_str(&format!("<name>{}</name>\n", escape_xml(&route.name)));
    for segment in &route.segments {
        kml.push_str(&format!(
            "<Placemark><name>{}</name><LineString><coordinates>\n",
            escape_xml(&segment.name)
        ));
        for point in &segment.points {
            kml.push_str(&format!("{},{},0 ", point.lng, point.lat));
        }
        kml.push_str("</coordinates></LineString></Placemark>\n");
    }
    kml.push_str("</Document></kml>");
    kml
}

/// The KML document zipped as a single `route.kml` entry.
pub fn encode_kmz(route: &RouteRecord) -> Result<Vec<u8>, ServiceError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(KMZ_ENTRY, SimpleFileOptions::default())?;
    zip.write_all(encode_kml(route).as_bytes())?;
    Ok(zip.finish()?.into_inner())
}

/// Decodes a base64 GPX payload into a preliminary single-segment draft.
/// Track points are used when present, route points otherwise.
pub fn import_gpx(base64_payload: &str) -> Result<RouteDraft, ServiceError> {
    let bytes = decode_payload(base64_payload)?;
    let gpx = gpx::read(bytes.as_slice())?;

    let mut points: Vec<Point> = gpx
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .map(from_waypoint)
        .collect();
    if points.is_empty() {
        points = gpx
            .routes
            .iter()
            .flat_map(|route| route.points.iter())
            .map(from_waypoint)
            .collect();
    }
    if points.is_empty() {
        return Err(ServiceError::InvalidData(
            "GPX document has no track or route points".to_string(),
        ));
    }

    tracing::info!("imported {} points from GPX", points.len());
    Ok(imported_draft(GPX_IMPORT_NAME, points))
}

/// Decodes a base64 KML payload into a preliminary single-segment draft.
/// Every `<coordinates>` element contributes its `lng,lat[,alt]` tuples in
/// document order.
pub fn import_kml(base64_payload: &str) -> Result<RouteDraft, ServiceError> {
    let bytes = decode_payload(base64_payload)?;
    let text = std::str::from_utf8(&bytes)
        .map_err(|e| ServiceError::InvalidData(format!("KML is not valid UTF-8: {e}")))?;
    let points = parse_kml_coordinates(text)?;
    if points.is_empty() {
        return Err(ServiceError::InvalidData(
            "KML document has no coordinates".to_string(),
        ));
    }

    tracing::info!("imported {} points from KML", points.len());
    Ok(imported_draft(KML_IMPORT_NAME, points))
}

fn parse_kml_coordinates(kml: &str) -> Result<Vec<Point>, ServiceError> {
    let mut reader = Reader::from_str(kml);
    reader.config_mut().trim_text(true);

    let mut points = Vec::new();
    let mut in_coordinates = false;
    let mut tuples = String::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"coordinates" => {
                in_coordinates = true;
                tuples.clear();
            }
            Event::Text(e) if in_coordinates => {
                let text = e
                    .xml_content()
                    .map_err(|e| ServiceError::InvalidData(format!("invalid KML text: {e}")))?;
                tuples.push_str(&text);
                tuples.push(' ');
            }
            Event::CData(e) if in_coordinates => {
                tuples.push_str(&String::from_utf8_lossy(&e));
                tuples.push(' ');
            }
            Event::End(e) if e.local_name().as_ref() == b"coordinates" => {
                in_coordinates = false;
                for tuple in tuples.split_whitespace() {
                    points.push(parse_tuple(tuple)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(points)
}

/// `lng,lat` with an optional altitude.
fn parse_tuple(tuple: &str) -> Result<Point, ServiceError> {
    let mut parts = tuple.split(',').map(str::trim);
    let (Some(lng), Some(lat)) = (parts.next(), parts.next()) else {
        return Err(ServiceError::InvalidData(format!(
            "KML coordinate {tuple:?} needs a longitude and a latitude"
        )));
    };
    match (lng.parse::<f64>(), lat.parse::<f64>()) {
        (Ok(lng), Ok(lat)) => Ok(Point::new(lat, lng)),
        _ => Err(ServiceError::InvalidData(format!(
            "KML coordinate {tuple:?} is not numeric"
        ))),
    }
}

fn decode_payload(base64_payload: &str) -> Result<Vec<u8>, ServiceError> {
    BASE64
        .decode(base64_payload.trim())
        .map_err(|e| ServiceError::InvalidData(format!("payload is not valid base64: {e}")))
}

fn imported_draft(name: &str, points: Vec<Point>) -> RouteDraft {
    let mut segment = Segment::new(format!("{name} track"), SurfaceType::UNKNOWN);
    segment.points = points;
    RouteDraft {
        name: name.to_string(),
        status: Status::Preliminary,
        segments: vec![segment],
    }
}

fn to_waypoint(point: &Point) -> Waypoint {
    Waypoint::new(GeoPoint::new(point.lng, point.lat))
}

fn from_waypoint(waypoint: &Waypoint) -> Point {
    let point = waypoint.point();
    Point::new(point.y(), point.x())
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use uuid::Uuid;

    fn route() -> RouteRecord {
        let mut forest = Segment::new("Forest <north>", SurfaceType::FOREST_TRAIL);
        forest.points = vec![Point::new(56.839, 60.605), Point::new(56.845, 60.62)];
        let mut field = Segment::new("Field", SurfaceType::FIELD_PATH);
        field.points = vec![Point::new(56.845, 60.62), Point::new(56.85, 60.64)];
        RouteRecord::from_draft(
            Uuid::new_v4(),
            RouteDraft {
                name: "Archive & co".to_string(),
                status: Status::Final,
                segments: vec![forest, field],
            },
        )
    }

    #[test]
    fn test_gpx_has_track_per_segment() {
        let bytes = encode_gpx(&route()).unwrap();
        let parsed = gpx::read(bytes.as_slice()).unwrap();

        assert_eq!(parsed.tracks.len(), 2);
        assert_eq!(parsed.tracks[0].name.as_deref(), Some("Forest <north>"));
        let first = parsed.tracks[0].segments[0].points[0].point();
        assert!((first.y() - 56.839).abs() < 1e-9);
        assert!((first.x() - 60.605).abs() < 1e-9);
    }

    #[test]
    fn test_kml_lists_lng_lat_pairs() {
        let kml = encode_kml(&route());

        assert!(kml.contains("<name>Archive &amp; co</name>"));
        assert!(kml.contains("<name>Forest &lt;north&gt;</name>"));
        assert!(kml.contains("60.605,56.839,0 "));
        assert_eq!(kml.matches("<Placemark>").count(), 2);
    }

    #[test]
    fn test_kmz_wraps_kml() {
        let route = route();
        let bytes = encode_kmz(&route).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name(KMZ_ENTRY).unwrap();
        let mut kml = String::new();
        entry.read_to_string(&mut kml).unwrap();
        assert_eq!(kml, encode_kml(&route));
    }

    #[test]
    fn test_import_reads_exported_gpx() {
        let payload = BASE64.encode(encode_gpx(&route()).unwrap());

        let draft = import_gpx(&payload).unwrap();

        assert_eq!(draft.status, Status::Preliminary);
        assert_eq!(draft.segments.len(), 1);
        let segment = &draft.segments[0];
        assert_eq!(segment.surface_type, SurfaceType::UNKNOWN);
        assert!(segment.preliminary);
        assert_eq!(segment.points.len(), 4);
    }

    #[test]
    fn test_import_reads_exported_kml() {
        let payload = BASE64.encode(encode_kml(&route()));

        let draft = import_kml(&payload).unwrap();

        assert_eq!(draft.name, KML_IMPORT_NAME);
        assert_eq!(draft.status, Status::Preliminary);
        assert_eq!(draft.segments.len(), 1);
        let segment = &draft.segments[0];
        assert_eq!(segment.name, "KML import track");
        assert_eq!(segment.surface_type, SurfaceType::UNKNOWN);
        assert_eq!(segment.points.len(), 4);
        assert_eq!(segment.points[0], Point::new(56.839, 60.605));
        assert_eq!(segment.points[3], Point::new(56.85, 60.64));
    }

    #[test]
    fn test_import_kml_accepts_prefixed_elements_without_altitude() {
        let kml = r#"<kml:kml xmlns:kml="http://www.opengis.net/kml/2.2"><kml:Placemark>
            <kml:LineString><kml:coordinates>
                60.6,56.8
                60.7,56.9
            </kml:coordinates></kml:LineString>
        </kml:Placemark></kml:kml>"#;

        let draft = import_kml(&BASE64.encode(kml)).unwrap();

        assert_eq!(
            draft.segments[0].points,
            vec![Point::new(56.8, 60.6), Point::new(56.9, 60.7)]
        );
    }

    #[test]
    fn test_import_kml_rejects_bad_payloads() {
        assert!(matches!(
            import_kml("not base64!"),
            Err(ServiceError::InvalidData(_))
        ));
        assert!(matches!(
            import_kml(&BASE64.encode("<kml><Document/></kml>")),
            Err(ServiceError::InvalidData(_))
        ));
        assert!(matches!(
            import_kml(&BASE64.encode("<coordinates>east,north</coordinates>")),
            Err(ServiceError::InvalidData(_))
        ));
        assert!(matches!(
            import_kml(&BASE64.encode("<coordinates>60.6</coordinates>")),
            Err(ServiceError::InvalidData(_))
        ));
    }

    #[test]
    fn test_import_rejects_bad_payloads() {
        assert!(matches!(
            import_gpx("not base64!"),
            Err(ServiceError::InvalidData(_))
        ));
        assert!(matches!(
            import_gpx(&BASE64.encode("<nope/>")),
            Err(ServiceError::Gpx(_))
        ));

        let empty = RouteRecord::from_draft(
            Uuid::new_v4(),
            RouteDraft {
                name: "empty".to_string(),
                ..RouteDraft::default()
            },
        );
        let payload = BASE64.encode(encode_gpx(&empty).unwrap());
        assert!(matches!(
            import_gpx(&payload),
            Err(ServiceError::InvalidData(_))
        ));
    }
}
