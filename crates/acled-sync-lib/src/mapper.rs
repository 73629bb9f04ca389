//! Conversion of raw ACLED events into ArcGIS feature JSON.
//!
//! The mapper is pure: it performs no I/O and the same [`RawEvent`] always
//! maps to the same [`MappedFeature`].
//!
//! Coercion is strict. Integer, float and date fields that are present but
//! cannot be parsed produce [`Error::Coercion`] instead of a silent default.
//! Absent, `null` or blank values become `null` attributes, except for
//! `latitude` and `longitude`, which the geometry needs and which therefore
//! raise [`Error::MissingField`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Spatial reference of ACLED coordinates (WGS 84).
pub const WGS84_WKID: u32 = 4326;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %B %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A single upstream field value, kept in its original JSON type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Flag(bool),
    Text(String),
}

impl Scalar {
    fn describe(&self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Flag(b) => b.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value.into())
    }
}

/// One event record as returned by the ACLED `read` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    pub data_id: Option<Scalar>,
    pub iso: Option<Scalar>,
    pub event_id_cnty: Option<Scalar>,
    pub event_id_no_cnty: Option<Scalar>,
    pub event_date: Option<Scalar>,
    pub year: Option<Scalar>,
    pub time_precision: Option<Scalar>,
    pub disorder_type: Option<Scalar>,
    pub event_type: Option<Scalar>,
    pub sub_event_type: Option<Scalar>,
    pub actor1: Option<Scalar>,
    pub assoc_actor_1: Option<Scalar>,
    pub inter1: Option<Scalar>,
    pub actor2: Option<Scalar>,
    pub assoc_actor_2: Option<Scalar>,
    pub inter2: Option<Scalar>,
    pub interaction: Option<Scalar>,
    pub civilian_targeting: Option<Scalar>,
    pub region: Option<Scalar>,
    pub country: Option<Scalar>,
    pub admin1: Option<Scalar>,
    pub admin2: Option<Scalar>,
    pub admin3: Option<Scalar>,
    pub location: Option<Scalar>,
    pub latitude: Option<Scalar>,
    pub longitude: Option<Scalar>,
    pub geo_precision: Option<Scalar>,
    pub source: Option<Scalar>,
    pub source_scale: Option<Scalar>,
    pub notes: Option<Scalar>,
    pub fatalities: Option<Scalar>,
    pub tags: Option<Scalar>,
    pub timestamp: Option<Scalar>,
    pub iso3: Option<Scalar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

/// Point geometry in ArcGIS JSON form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "spatialReference")]
    pub spatial_reference: SpatialReference,
}

/// Attribute set written to the feature layer for one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventAttributes {
    pub data_id: Option<i64>,
    pub iso: Option<Scalar>,
    pub event_id_cnty: Option<Scalar>,
    pub event_id_no_cnty: Option<Scalar>,
    pub event_date: Option<String>,
    pub year: Option<i64>,
    pub time_precision: Option<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disorder_type: Option<Scalar>,
    pub event_type: Option<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_event_type: Option<Scalar>,
    pub actor1: Option<Scalar>,
    pub assoc_actor_1: Option<Scalar>,
    pub inter1: Option<Scalar>,
    pub actor2: Option<Scalar>,
    pub assoc_actor_2: Option<Scalar>,
    pub inter2: Option<Scalar>,
    pub interaction: Option<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub civilian_targeting: Option<Scalar>,
    pub region: Option<Scalar>,
    pub country: Option<Scalar>,
    pub admin1: Option<Scalar>,
    pub admin2: Option<Scalar>,
    pub admin3: Option<Scalar>,
    pub location: Option<Scalar>,
    pub latitude: f64,
    pub longitude: f64,
    pub geo_precision: Option<Scalar>,
    pub source: Option<Scalar>,
    pub source_scale: Option<Scalar>,
    pub notes: Option<Scalar>,
    pub fatalities: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Scalar>,
    pub timestamp: Option<Scalar>,
    pub iso3: Option<Scalar>,
}

/// Feature record accepted by the layer's `addFeatures` operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedFeature {
    pub geometry: Point,
    pub attributes: EventAttributes,
}

/// Map a single event to its feature representation.
pub fn map_event(event: &RawEvent) -> Result<MappedFeature> {
    let latitude = coerce_coordinate("latitude", event.latitude.as_ref())?;
    let longitude = coerce_coordinate("longitude", event.longitude.as_ref())?;

    Ok(MappedFeature {
        geometry: Point {
            x: longitude,
            y: latitude,
            spatial_reference: SpatialReference { wkid: WGS84_WKID },
        },
        attributes: EventAttributes {
            data_id: coerce_integer("data_id", event.data_id.as_ref())?,
            iso: event.iso.clone(),
            event_id_cnty: event.event_id_cnty.clone(),
            event_id_no_cnty: event.event_id_no_cnty.clone(),
            event_date: normalize_date("event_date", event.event_date.as_ref())?,
            year: coerce_integer("year", event.year.as_ref())?,
            time_precision: event.time_precision.clone(),
            disorder_type: event.disorder_type.clone(),
            event_type: event.event_type.clone(),
            sub_event_type: event.sub_event_type.clone(),
            actor1: event.actor1.clone(),
            assoc_actor_1: event.assoc_actor_1.clone(),
            inter1: event.inter1.clone(),
            actor2: event.actor2.clone(),
            assoc_actor_2: event.assoc_actor_2.clone(),
            inter2: event.inter2.clone(),
            interaction: event.interaction.clone(),
            civilian_targeting: event.civilian_targeting.clone(),
            region: event.region.clone(),
            country: event.country.clone(),
            admin1: event.admin1.clone(),
            admin2: event.admin2.clone(),
            admin3: event.admin3.clone(),
            location: event.location.clone(),
            latitude,
            longitude,
            geo_precision: event.geo_precision.clone(),
            source: event.source.clone(),
            source_scale: event.source_scale.clone(),
            notes: event.notes.clone(),
            fatalities: coerce_integer("fatalities", event.fatalities.as_ref())?,
            tags: event.tags.clone(),
            timestamp: event.timestamp.clone(),
            iso3: event.iso3.clone(),
        },
    })
}

/// Map every event, preserving order. Stops at the first coercion failure.
pub fn map_events(events: &[RawEvent]) -> Result<Vec<MappedFeature>> {
    events.iter().map(map_event).collect()
}

fn coerce_integer(field: &'static str, value: Option<&Scalar>) -> Result<Option<i64>> {
    let value = match value {
        Some(v) if !v.is_blank() => v,
        _ => return Ok(None),
    };
    let parsed = match value {
        Scalar::Text(s) => s.trim().parse::<i64>().ok(),
        Scalar::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Scalar::Flag(_) => None,
    };
    parsed.map(Some).ok_or_else(|| Error::Coercion {
        field,
        value: value.describe(),
        expected: "integer",
    })
}

fn coerce_coordinate(field: &'static str, value: Option<&Scalar>) -> Result<f64> {
    let value = match value {
        Some(v) if !v.is_blank() => v,
        _ => return Err(Error::MissingField { field }),
    };
    let parsed = match value {
        Scalar::Text(s) => s.trim().parse::<f64>().ok(),
        Scalar::Number(n) => n.as_f64(),
        Scalar::Flag(_) => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| Error::Coercion {
            field,
            value: value.describe(),
            expected: "float",
        })
}

fn normalize_date(field: &'static str, value: Option<&Scalar>) -> Result<Option<String>> {
    let value = match value {
        Some(v) if !v.is_blank() => v,
        _ => return Ok(None),
    };
    let parsed = match value {
        Scalar::Text(s) => parse_date(s.trim()),
        _ => None,
    };
    parsed
        .map(|date| Some(date.format("%Y-%m-%d").to_string()))
        .ok_or_else(|| Error::Coercion {
            field,
            value: value.describe(),
            expected: "date",
        })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}
