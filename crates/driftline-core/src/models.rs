//! Canonical domain types shared across the driftline crates.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DriftlineError, Result};

/// A coordinate normalized to two decimal places, quantized to centidegrees.
///
/// This is the cache and deduplication key: two raw coordinates that round to
/// the same centidegree pair are the same place as far as resolution is
/// concerned. Quantizing to integers keeps `Eq`/`Hash` exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordKey {
    lat_cd: i32,
    lon_cd: i32,
}

impl CoordKey {
    /// Normalize a raw (latitude, longitude) pair in degrees.
    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        Self {
            lat_cd: quantize(lat),
            lon_cd: quantize(lon),
        }
    }

    /// Rounded latitude in degrees.
    pub fn lat(&self) -> f64 {
        f64::from(self.lat_cd) / 100.0
    }

    /// Rounded longitude in degrees.
    pub fn lon(&self) -> f64 {
        f64::from(self.lon_cd) / 100.0
    }
}

fn quantize(degrees: f64) -> i32 {
    (degrees * 100.0).round() as i32
}

fn fmt_centideg(cd: i32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if cd < 0 {
        write!(f, "-")?;
    }
    let cd = cd.abs();
    let (whole, frac) = (cd / 100, cd % 100);
    if frac == 0 {
        write!(f, "{whole}")
    } else if frac % 10 == 0 {
        write!(f, "{whole}.{}", frac / 10)
    } else {
        write!(f, "{whole}.{frac:02}")
    }
}

impl fmt::Display for CoordKey {
    /// Renders as `"lat,lon"` with trailing zeros trimmed, e.g. `-62.93,75.72`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_centideg(self.lat_cd, f)?;
        write!(f, ",")?;
        fmt_centideg(self.lon_cd, f)
    }
}

/// The resolved geographic identity of a coordinate.
///
/// Exactly one category applies. Serializes as a single-entry JSON map,
/// `{"country": "Brazil"}`, `{"ocean": "Indian Ocean"}` or
/// `{"unknown": "unknown"}`, which is the shape persisted to the cache seed
/// files and emitted in the output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceLabel {
    Country(String),
    WaterBody(String),
    Unknown,
}

impl PlaceLabel {
    /// The category tag used in serialized form and in the cache's
    /// `location_type` column.
    pub fn kind(&self) -> &'static str {
        match self {
            PlaceLabel::Country(_) => "country",
            PlaceLabel::WaterBody(_) => "ocean",
            PlaceLabel::Unknown => "unknown",
        }
    }

    /// The place name; `"unknown"` for the unknown label.
    pub fn name(&self) -> &str {
        match self {
            PlaceLabel::Country(name) | PlaceLabel::WaterBody(name) => name,
            PlaceLabel::Unknown => "unknown",
        }
    }

    /// Rebuild a label from its persisted (type, name) columns.
    ///
    /// Any type tag that is neither `country` nor `unknown` reads back as a
    /// water body; older cache rows carry the raw category reported by the
    /// nearby-feature service.
    pub fn from_parts(kind: &str, name: &str) -> Self {
        match kind {
            "country" => PlaceLabel::Country(name.to_string()),
            "unknown" => PlaceLabel::Unknown,
            _ => PlaceLabel::WaterBody(name.to_string()),
        }
    }
}

impl Serialize for PlaceLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.kind(), self.name())?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for PlaceLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct LabelVisitor;

        impl<'de> Visitor<'de> for LabelVisitor {
            type Value = PlaceLabel;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a single-entry map of place category to name")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let (kind, name): (String, String) = access
                    .next_entry()?
                    .ok_or_else(|| serde::de::Error::custom("empty place label"))?;
                Ok(PlaceLabel::from_parts(&kind, &name))
            }
        }

        deserializer.deserialize_map(LabelVisitor)
    }
}

/// One hour-slot file: an ordered sequence of `[lat, lon, extra]` triples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSnapshot(pub Vec<[f64; 3]>);

impl RawSnapshot {
    /// Read and parse an hour file. A missing or malformed file is fatal for
    /// the enrichment stage.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DriftlineError::Snapshot {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        serde_json::from_slice(&bytes).map_err(|e| DriftlineError::Snapshot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw (lat, lon) pairs in snapshot order.
    pub fn coordinates(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.0.iter().map(|triple| (triple[0], triple[1]))
    }
}

/// A start/end pairing of one balloon across the day, annotated with the
/// resolved place of each endpoint.
///
/// The field names `00.json` / `23.json` in serialized form name the hour
/// file each endpoint came from; downstream consumers key on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub start: [f64; 3],
    pub end: [f64; 3],
    #[serde(rename = "00.json")]
    pub start_place: PlaceLabel,
    #[serde(rename = "23.json")]
    pub end_place: PlaceLabel,
}

/// Complete mapping from rounded coordinate key to resolved label, as
/// returned by batch resolution.
pub type LabelMapping = HashMap<CoordKey, PlaceLabel>;
