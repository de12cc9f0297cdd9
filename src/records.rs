//! Typed records for the four datasets served by calwater.
//!
//! Each table row is an explicit struct with a fixed field set. The
//! [`Record`] trait exposes those fields by their column name so that the
//! query and aggregation engines can operate uniformly over any table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column names as they appear in the backing files and in API output
pub mod columns {
    pub const COUNTY_NAME: &str = "county_name";
    pub const TOTAL_POPULATION: &str = "total_population";
    pub const LEAD: &str = "lead_avg_ug_per_L";
    pub const ARSENIC: &str = "arsenic_avg_ug_per_L";
    pub const NITRATE: &str = "nitrate_avg_mg_per_L";
    pub const FACILITY_ID: &str = "facility_id";
    pub const COUNTY: &str = "county";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const PUBLIC_ACCESS: &str = "public_access";

    /// The three contaminant columns of the water quality table
    pub const CONTAMINANTS: [&str; 3] = [LEAD, ARSENIC, NITRATE];
}

/// A borrowed view of one field of a record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Integer(i64),
    Float(f64),
    Null,
}

impl<'a> FieldValue<'a> {
    /// Numeric value of the field; NaN counts as missing
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::Integer(v) => Some(v as f64),
            FieldValue::Float(v) if !v.is_nan() => Some(v),
            _ => None,
        }
    }

    /// Whether the value is missing
    pub fn is_null(&self) -> bool {
        match *self {
            FieldValue::Null => true,
            FieldValue::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Case-insensitive comparison against a textual value.
    ///
    /// Integers compare by their decimal representation, floats never match.
    pub fn matches_text(&self, value: &str) -> bool {
        match *self {
            FieldValue::Text(text) => keys_equal(text, value),
            FieldValue::Integer(v) => value.trim().parse::<i64>() == Ok(v),
            _ => false,
        }
    }

    /// Normalized join key, `None` for missing values
    pub fn join_key(&self) -> Option<String> {
        match *self {
            FieldValue::Text(text) if !text.is_empty() => Some(normalize_key(text)),
            FieldValue::Integer(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

impl From<FieldValue<'_>> for serde_json::Value {
    fn from(value: FieldValue<'_>) -> Self {
        match value {
            FieldValue::Text(text) => serde_json::Value::String(text.to_string()),
            FieldValue::Integer(v) => serde_json::Value::from(v),
            FieldValue::Float(v) => serde_json::Number::from_f64(v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Null => serde_json::Value::Null,
        }
    }
}

fn optional_float(value: Option<f64>) -> FieldValue<'static> {
    value.map(FieldValue::Float).unwrap_or(FieldValue::Null)
}

/// Lowercased form of a county name used for every key comparison
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Case-insensitive equality of two keys
pub fn keys_equal(a: &str, b: &str) -> bool {
    normalize_key(a) == normalize_key(b)
}

/// A table row with named fields
pub trait Record {
    /// Names of every field this record exposes, in output order
    fn field_names(&self) -> Vec<&str>;

    /// Value of a named field; `None` when the field is not part of the schema
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;
}

impl<R: Record + ?Sized> Record for &R {
    fn field_names(&self) -> Vec<&str> {
        (**self).field_names()
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        (**self).field(name)
    }
}

/// One row of the population table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub county_name: String,
    pub total_population: i64,
}

impl Record for PopulationRecord {
    fn field_names(&self) -> Vec<&str> {
        vec![columns::COUNTY_NAME, columns::TOTAL_POPULATION]
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            columns::COUNTY_NAME => Some(FieldValue::Text(&self.county_name)),
            columns::TOTAL_POPULATION => Some(FieldValue::Integer(self.total_population)),
            _ => None,
        }
    }
}

/// One row of the water quality table; contaminant levels may be missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterQualityRecord {
    pub county_name: String,
    #[serde(rename = "lead_avg_ug_per_L")]
    pub lead_avg_ug_per_l: Option<f64>,
    #[serde(rename = "arsenic_avg_ug_per_L")]
    pub arsenic_avg_ug_per_l: Option<f64>,
    #[serde(rename = "nitrate_avg_mg_per_L")]
    pub nitrate_avg_mg_per_l: Option<f64>,
}

impl Record for WaterQualityRecord {
    fn field_names(&self) -> Vec<&str> {
        vec![
            columns::COUNTY_NAME,
            columns::LEAD,
            columns::ARSENIC,
            columns::NITRATE,
        ]
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            columns::COUNTY_NAME => Some(FieldValue::Text(&self.county_name)),
            columns::LEAD => Some(optional_float(self.lead_avg_ug_per_l)),
            columns::ARSENIC => Some(optional_float(self.arsenic_avg_ug_per_l)),
            columns::NITRATE => Some(optional_float(self.nitrate_avg_mg_per_l)),
            _ => None,
        }
    }
}

/// A county with its population and water quality merged into one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyRecord {
    pub county_name: String,
    pub total_population: i64,
    #[serde(rename = "lead_avg_ug_per_L")]
    pub lead_avg_ug_per_l: Option<f64>,
    #[serde(rename = "arsenic_avg_ug_per_L")]
    pub arsenic_avg_ug_per_l: Option<f64>,
    #[serde(rename = "nitrate_avg_mg_per_L")]
    pub nitrate_avg_mg_per_l: Option<f64>,
}

impl CountyRecord {
    /// Combine matching population and water quality rows.
    ///
    /// The county name is taken from the population side.
    pub fn merge(population: &PopulationRecord, water_quality: &WaterQualityRecord) -> Self {
        Self {
            county_name: population.county_name.clone(),
            total_population: population.total_population,
            lead_avg_ug_per_l: water_quality.lead_avg_ug_per_l,
            arsenic_avg_ug_per_l: water_quality.arsenic_avg_ug_per_l,
            nitrate_avg_mg_per_l: water_quality.nitrate_avg_mg_per_l,
        }
    }
}

impl Record for CountyRecord {
    fn field_names(&self) -> Vec<&str> {
        vec![
            columns::COUNTY_NAME,
            columns::TOTAL_POPULATION,
            columns::LEAD,
            columns::ARSENIC,
            columns::NITRATE,
        ]
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            columns::COUNTY_NAME => Some(FieldValue::Text(&self.county_name)),
            columns::TOTAL_POPULATION => Some(FieldValue::Integer(self.total_population)),
            columns::LEAD => Some(optional_float(self.lead_avg_ug_per_l)),
            columns::ARSENIC => Some(optional_float(self.arsenic_avg_ug_per_l)),
            columns::NITRATE => Some(optional_float(self.nitrate_avg_mg_per_l)),
            _ => None,
        }
    }
}

/// Whether a treatment plant is open to the public
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicAccess {
    Yes,
    No,
}

impl PublicAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicAccess::Yes => "yes",
            PublicAccess::No => "no",
        }
    }
}

impl fmt::Display for PublicAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublicAccess {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(PublicAccess::Yes),
            "no" => Ok(PublicAccess::No),
            other => Err(format!("expected 'yes' or 'no', got '{}'", other)),
        }
    }
}

/// One row of the treatment plant table.
///
/// Columns beyond the five used by the query layer are carried through in
/// `attributes`, in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPlantRecord {
    pub facility_id: i64,
    pub county: String,
    pub latitude: f64,
    pub longitude: f64,
    pub public_access: PublicAccess,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl TreatmentPlantRecord {
    pub fn is_public(&self) -> bool {
        self.public_access == PublicAccess::Yes
    }
}

impl Record for TreatmentPlantRecord {
    fn field_names(&self) -> Vec<&str> {
        let mut names = vec![
            columns::FACILITY_ID,
            columns::COUNTY,
            columns::LATITUDE,
            columns::LONGITUDE,
            columns::PUBLIC_ACCESS,
        ];
        names.extend(self.attributes.keys().map(String::as_str));
        names
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            columns::FACILITY_ID => Some(FieldValue::Integer(self.facility_id)),
            columns::COUNTY => Some(FieldValue::Text(&self.county)),
            columns::LATITUDE => Some(FieldValue::Float(self.latitude)),
            columns::LONGITUDE => Some(FieldValue::Float(self.longitude)),
            columns::PUBLIC_ACCESS => Some(FieldValue::Text(self.public_access.as_str())),
            other => self.attributes.get(other).map(|value| match value {
                serde_json::Value::String(text) => FieldValue::Text(text),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => FieldValue::Integer(i),
                    None => n.as_f64().map(FieldValue::Float).unwrap_or(FieldValue::Null),
                },
                _ => FieldValue::Null,
            }),
        }
    }
}

/// County boundary geometry, kept as the raw GeoJSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountyBoundaries(pub serde_json::Value);

impl CountyBoundaries {
    /// Number of features in the collection (0 if it has no feature list)
    pub fn feature_count(&self) -> usize {
        self.0
            .get("features")
            .and_then(serde_json::Value::as_array)
            .map_or(0, Vec::len)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}
