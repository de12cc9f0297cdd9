//! Backing file loading.
//!
//! This module reads the CSV tables and the GeoJSON boundary document into
//! typed records. Every row is checked against the expected column schema; a
//! single bad row aborts the load of its dataset with a parse error.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::error::{CalWaterError, Result};
use crate::records::{
    columns, normalize_key, CountyBoundaries, PopulationRecord, PublicAccess,
    TreatmentPlantRecord, WaterQualityRecord,
};
use crate::store::DatasetKind;

/// Tokens treated as a missing value in nullable numeric columns
const NULL_TOKENS: [&str; 6] = ["", "na", "n/a", "nan", "null", "none"];

/// Bounds of the floats that convert to an i64 without saturating
const I64_MIN_F64: f64 = -9_223_372_036_854_775_808.0;
const I64_MAX_EXCLUSIVE_F64: f64 = 9_223_372_036_854_775_808.0;

/// Load the population table
pub fn load_population(path: &Path) -> Result<Vec<PopulationRecord>> {
    let kind = DatasetKind::Population;
    let schema = [columns::COUNTY_NAME, columns::TOTAL_POPULATION];
    let mut seen = HashSet::new();

    read_table(path, kind, &schema, false, |row| {
        let county_name = row.key(columns::COUNTY_NAME)?;
        row.ensure_unique(&mut seen, columns::COUNTY_NAME, normalize_key(county_name))?;

        Ok(PopulationRecord {
            county_name: county_name.to_string(),
            total_population: row.integer(columns::TOTAL_POPULATION)?,
        })
    })
}

/// Load the water quality table
pub fn load_water_quality(path: &Path) -> Result<Vec<WaterQualityRecord>> {
    let kind = DatasetKind::WaterQuality;
    let schema = [
        columns::COUNTY_NAME,
        columns::LEAD,
        columns::ARSENIC,
        columns::NITRATE,
    ];
    let mut seen = HashSet::new();

    read_table(path, kind, &schema, false, |row| {
        let county_name = row.key(columns::COUNTY_NAME)?;
        row.ensure_unique(&mut seen, columns::COUNTY_NAME, normalize_key(county_name))?;

        Ok(WaterQualityRecord {
            county_name: county_name.to_string(),
            lead_avg_ug_per_l: row.nullable_float(columns::LEAD)?,
            arsenic_avg_ug_per_l: row.nullable_float(columns::ARSENIC)?,
            nitrate_avg_mg_per_l: row.nullable_float(columns::NITRATE)?,
        })
    })
}

/// Load the treatment plant table; unknown columns are carried through
pub fn load_treatment_plants(path: &Path) -> Result<Vec<TreatmentPlantRecord>> {
    let kind = DatasetKind::TreatmentPlants;
    let schema = [
        columns::FACILITY_ID,
        columns::COUNTY,
        columns::LATITUDE,
        columns::LONGITUDE,
        columns::PUBLIC_ACCESS,
    ];
    let mut seen = HashSet::new();

    read_table(path, kind, &schema, true, |row| {
        let facility_id = row.integer(columns::FACILITY_ID)?;
        row.ensure_unique(&mut seen, columns::FACILITY_ID, facility_id.to_string())?;

        let public_access = row
            .text(columns::PUBLIC_ACCESS)?
            .parse::<PublicAccess>()
            .map_err(|message| row.error(columns::PUBLIC_ACCESS, &message))?;

        Ok(TreatmentPlantRecord {
            facility_id,
            county: row.key(columns::COUNTY)?.to_string(),
            latitude: row.float(columns::LATITUDE)?,
            longitude: row.float(columns::LONGITUDE)?,
            public_access,
            attributes: row.extra_attributes(),
        })
    })
}

/// Load the county boundary GeoJSON document without interpreting it
pub fn load_county_boundaries(path: &Path) -> Result<CountyBoundaries> {
    let kind = DatasetKind::CountyBoundaries;
    let file = open_backing_file(path, kind)?;

    let value: serde_json::Value =
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| {
            CalWaterError::Parse {
                dataset: kind.to_string(),
                message: format!("invalid GeoJSON in {}: {}", path.display(), e),
            }
        })?;

    Ok(CountyBoundaries(value))
}

/// Open a backing file, distinguishing a missing file from other failures
fn open_backing_file(path: &Path, kind: DatasetKind) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CalWaterError::NotFound {
            message: format!("{} file not found: {}", kind, path.display()),
        },
        _ => CalWaterError::Internal {
            message: format!("failed to open {} file {}: {}", kind, path.display(), e),
        },
    })
}

/// Column name to position lookup built from the header row
struct ColumnIndex {
    positions: HashMap<String, usize>,
    headers: Vec<String>,
    extra: Vec<usize>,
}

impl ColumnIndex {
    fn new(
        headers: &StringRecord,
        kind: DatasetKind,
        schema: &[&str],
        allow_extra: bool,
    ) -> Result<Self> {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let mut positions = HashMap::new();

        for (i, name) in headers.iter().enumerate() {
            if positions.insert(name.clone(), i).is_some() {
                return Err(CalWaterError::Parse {
                    dataset: kind.to_string(),
                    message: format!("duplicate column '{}'", name),
                });
            }
        }

        for column in schema {
            if !positions.contains_key(*column) {
                return Err(CalWaterError::Parse {
                    dataset: kind.to_string(),
                    message: format!("missing required column '{}'", column),
                });
            }
        }

        let extra: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| !schema.contains(&name.as_str()))
            .map(|(i, _)| i)
            .collect();

        if !allow_extra {
            if let Some(&i) = extra.first() {
                return Err(CalWaterError::Parse {
                    dataset: kind.to_string(),
                    message: format!("unexpected column '{}'", headers[i]),
                });
            }
        }

        Ok(Self {
            positions,
            headers,
            extra,
        })
    }
}

/// One CSV row with typed, schema-checked accessors
struct Row<'a> {
    kind: DatasetKind,
    line: u64,
    record: &'a StringRecord,
    columns: &'a ColumnIndex,
}

impl<'a> Row<'a> {
    fn error(&self, column: &str, message: &str) -> CalWaterError {
        CalWaterError::Parse {
            dataset: self.kind.to_string(),
            message: format!("line {}, column '{}': {}", self.line, column, message),
        }
    }

    fn text(&self, column: &str) -> Result<&'a str> {
        self.columns
            .positions
            .get(column)
            .and_then(|&i| self.record.get(i))
            .ok_or_else(|| self.error(column, "value is missing"))
    }

    /// A key column: present and non-empty
    fn key(&self, column: &str) -> Result<&'a str> {
        let value = self.text(column)?;
        if value.is_empty() {
            return Err(self.error(column, "key must not be empty"));
        }
        Ok(value)
    }

    fn integer(&self, column: &str) -> Result<i64> {
        let token = self.text(column)?;
        if let Ok(value) = token.parse::<i64>() {
            return Ok(value);
        }
        // Integral floats such as "1200.0" are accepted when they fit in an i64
        match token.parse::<f64>() {
            Ok(value)
                if value.fract() == 0.0
                    && (I64_MIN_F64..I64_MAX_EXCLUSIVE_F64).contains(&value) =>
            {
                Ok(value as i64)
            }
            _ => Err(self.error(column, &format!("expected an integer, got '{}'", token))),
        }
    }

    fn float(&self, column: &str) -> Result<f64> {
        let token = self.text(column)?;
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(self.error(column, &format!("expected a number, got '{}'", token))),
        }
    }

    fn nullable_float(&self, column: &str) -> Result<Option<f64>> {
        let token = self.text(column)?;
        if NULL_TOKENS.contains(&token.to_ascii_lowercase().as_str()) {
            return Ok(None);
        }
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(self.error(column, &format!("expected a number, got '{}'", token))),
        }
    }

    fn ensure_unique(&self, seen: &mut HashSet<String>, column: &str, key: String) -> Result<()> {
        if !seen.insert(key) {
            let value = self.text(column)?;
            return Err(self.error(column, &format!("duplicate key '{}'", value)));
        }
        Ok(())
    }

    /// Columns outside the schema, typed by inspection
    fn extra_attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        self.columns
            .extra
            .iter()
            .map(|&i| {
                let token = self.record.get(i).unwrap_or_default();
                (self.columns.headers[i].clone(), infer_value(token))
            })
            .collect()
    }
}

/// Type a pass-through cell: integer, finite float, null or text
fn infer_value(token: &str) -> serde_json::Value {
    if token.is_empty() {
        return serde_json::Value::Null;
    }
    if let Ok(value) = token.parse::<i64>() {
        return serde_json::Value::from(value);
    }
    if let Some(number) = token
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return serde_json::Value::Number(number);
    }
    serde_json::Value::String(token.to_string())
}

/// Read a CSV file, checking headers against `schema` and converting every row
fn read_table<T, F>(
    path: &Path,
    kind: DatasetKind,
    schema: &[&str],
    allow_extra: bool,
    mut convert: F,
) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> Result<T>,
{
    let file = open_backing_file(path, kind)?;
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);

    let csv_error = |e: csv::Error| CalWaterError::Parse {
        dataset: kind.to_string(),
        message: format!("malformed CSV in {}: {}", path.display(), e),
    };

    let headers = reader.headers().map_err(csv_error)?.clone();
    let columns = ColumnIndex::new(&headers, kind, schema, allow_extra)?;
    debug!(
        dataset = %kind,
        columns = %columns.headers.join(", "),
        "Read CSV header"
    );

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        let row = Row {
            kind,
            line: record.position().map_or(0, |p| p.line()),
            record: &record,
            columns: &columns,
        };
        records.push(convert(&row)?);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_file_not_found() {
        let result = load_population(Path::new("/nonexistent/population.csv"));
        match result.unwrap_err() {
            CalWaterError::NotFound { message } => assert!(message.contains("population")),
            other => panic!("Expected NotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_population_loading() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "population.csv",
            "county_name,total_population\nAlameda,1600000\n Butte , 210000.0\n",
        );

        let records = load_population(&path)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].county_name, "Alameda");
        assert_eq!(records[0].total_population, 1_600_000);
        assert_eq!(records[1].county_name, "Butte");
        assert_eq!(records[1].total_population, 210_000);
        Ok(())
    }

    #[test]
    fn test_missing_column() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "population.csv", "county_name\nAlameda\n");

        match load_population(&path).unwrap_err() {
            CalWaterError::Parse { dataset, message } => {
                assert_eq!(dataset, "population");
                assert!(message.contains("total_population"));
            }
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_column_in_fixed_schema() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "population.csv",
            "county_name,total_population,region\nAlameda,1600000,Bay Area\n",
        );

        assert!(matches!(
            load_population(&path),
            Err(CalWaterError::Parse { .. })
        ));
    }

    #[test]
    fn test_non_numeric_value() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "population.csv",
            "county_name,total_population\nAlameda,lots\n",
        );

        match load_population(&path).unwrap_err() {
            CalWaterError::Parse { message, .. } => {
                assert!(message.contains("line 2"));
                assert!(message.contains("lots"));
            }
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_integral_float_out_of_range_rejected() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "population.csv",
            "county_name,total_population\nAlameda,1200.0\n",
        );
        assert_eq!(load_population(&path).unwrap()[0].total_population, 1200);

        for token in ["1e30", "-1e30", "9223372036854775808.0"] {
            let path = write_file(
                dir.path(),
                "population.csv",
                &format!("county_name,total_population\nAlameda,{}\n", token),
            );
            match load_population(&path).unwrap_err() {
                CalWaterError::Parse { message, .. } => {
                    assert!(message.contains("expected an integer"), "{}", message)
                }
                other => panic!("Expected Parse error, got {:?}", other),
            }
        }

        let path = write_file(
            dir.path(),
            "plants.csv",
            "facility_id,county,latitude,longitude,public_access\n1e30,Kern,35.3,-119.0,yes\n",
        );
        assert!(matches!(
            load_treatment_plants(&path),
            Err(CalWaterError::Parse { .. })
        ));
    }

    #[test]
    fn test_empty_key_rejected() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "population.csv",
            "county_name,total_population\n,100\n",
        );

        assert!(matches!(
            load_population(&path),
            Err(CalWaterError::Parse { .. })
        ));
    }

    #[test]
    fn test_duplicate_county_rejected() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "population.csv",
            "county_name,total_population\nAlameda,1\nALAMEDA,2\n",
        );

        match load_population(&path).unwrap_err() {
            CalWaterError::Parse { message, .. } => assert!(message.contains("duplicate")),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_water_quality_nulls() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "wq.csv",
            "county_name,lead_avg_ug_per_L,arsenic_avg_ug_per_L,nitrate_avg_mg_per_L\n\
             Alameda,2.1,1.0,3.0\n\
             Butte,,NA,NaN\n",
        );

        let records = load_water_quality(&path)?;
        assert_eq!(records[0].lead_avg_ug_per_l, Some(2.1));
        assert_eq!(records[1].lead_avg_ug_per_l, None);
        assert_eq!(records[1].arsenic_avg_ug_per_l, None);
        assert_eq!(records[1].nitrate_avg_mg_per_l, None);
        Ok(())
    }

    #[test]
    fn test_water_quality_bad_number() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "wq.csv",
            "county_name,lead_avg_ug_per_L,arsenic_avg_ug_per_L,nitrate_avg_mg_per_L\n\
             Alameda,high,1.0,3.0\n",
        );

        assert!(matches!(
            load_water_quality(&path),
            Err(CalWaterError::Parse { .. })
        ));
    }

    #[test]
    fn test_treatment_plants_with_extra_columns() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "plants.csv",
            "facility_id,facility_name,county,latitude,longitude,public_access,capacity_mgd\n\
             101,East Bay Plant,Alameda,37.80,-122.27,Yes,54.5\n\
             102,Chico Plant,Butte,39.73,-121.84,no,\n",
        );

        let plants = load_treatment_plants(&path)?;
        assert_eq!(plants.len(), 2);
        assert_eq!(plants[0].facility_id, 101);
        assert_eq!(plants[0].public_access, PublicAccess::Yes);
        assert_eq!(plants[0].attributes["facility_name"], "East Bay Plant");
        assert_eq!(plants[0].attributes["capacity_mgd"], 54.5);
        assert_eq!(plants[1].attributes["capacity_mgd"], serde_json::Value::Null);

        let keys: Vec<&String> = plants[0].attributes.keys().collect();
        assert_eq!(keys, vec!["facility_name", "capacity_mgd"]);
        Ok(())
    }

    #[test]
    fn test_treatment_plants_invalid_access() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "plants.csv",
            "facility_id,county,latitude,longitude,public_access\n\
             101,Alameda,37.80,-122.27,sometimes\n",
        );

        assert!(matches!(
            load_treatment_plants(&path),
            Err(CalWaterError::Parse { .. })
        ));
    }

    #[test]
    fn test_treatment_plants_duplicate_id() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "plants.csv",
            "facility_id,county,latitude,longitude,public_access\n\
             101,Alameda,37.80,-122.27,yes\n\
             101,Butte,39.73,-121.84,no\n",
        );

        assert!(matches!(
            load_treatment_plants(&path),
            Err(CalWaterError::Parse { .. })
        ));
    }

    #[test]
    fn test_county_boundaries() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "counties.geojson",
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{"name":"Alameda"},"geometry":null}]}"#,
        );

        let boundaries = load_county_boundaries(&path)?;
        assert_eq!(boundaries.feature_count(), 1);
        assert_eq!(boundaries.as_json()["type"], "FeatureCollection");
        Ok(())
    }

    #[test]
    fn test_county_boundaries_invalid_json() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "counties.geojson", "{not json");

        assert!(matches!(
            load_county_boundaries(&path),
            Err(CalWaterError::Parse { .. })
        ));
    }

    #[test]
    fn test_infer_value() {
        assert_eq!(infer_value(""), serde_json::Value::Null);
        assert_eq!(infer_value("12"), serde_json::json!(12));
        assert_eq!(infer_value("1.5"), serde_json::json!(1.5));
        assert_eq!(infer_value("NaN"), serde_json::json!("NaN"));
        assert_eq!(infer_value("Oakland"), serde_json::json!("Oakland"));
    }
}
