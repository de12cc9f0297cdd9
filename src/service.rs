//! The read-only operations exposed by calwater.
//!
//! Each operation takes the shared [`Dataset`] by reference, pulls the tables
//! it needs from the store and composes the query, aggregation and geo
//! engines over them. Load failures propagate as errors; a lookup that finds
//! nothing is `Ok(None)`.

use serde::Serialize;

use crate::error::Result;
use crate::geo::{find_within_radius, GeoPoint, Nearby};
use crate::query::{self, filter_equals, filter_range, inner_join, lookup_by_key, sort, view};
use crate::query::{Comparison, KeyValue, SortOrder};
use crate::records::{
    columns, CountyBoundaries, CountyRecord, PopulationRecord, TreatmentPlantRecord,
    WaterQualityRecord,
};
use crate::stats::{describe, top_n, Summary};
use crate::store::Dataset;

/// A projected row of the worst-counties ranking
pub type RankedCounty = serde_json::Map<String, serde_json::Value>;

/// Optional upper bounds on contaminant levels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaterQualityFilter {
    pub max_lead: Option<f64>,
    pub max_arsenic: Option<f64>,
    pub max_nitrate: Option<f64>,
}

impl WaterQualityFilter {
    fn bounds(&self) -> [(&'static str, Option<f64>); 3] {
        [
            (columns::LEAD, self.max_lead),
            (columns::ARSENIC, self.max_arsenic),
            (columns::NITRATE, self.max_nitrate),
        ]
    }
}

/// Summary statistics for each contaminant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaterQualityStatistics {
    #[serde(rename = "lead_avg_ug_per_L")]
    pub lead: Summary,
    #[serde(rename = "arsenic_avg_ug_per_L")]
    pub arsenic: Summary,
    #[serde(rename = "nitrate_avg_mg_per_L")]
    pub nitrate: Summary,
}

/// Highest-level counties for each contaminant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorstCounties {
    pub highest_lead: Vec<RankedCounty>,
    pub highest_arsenic: Vec<RankedCounty>,
    pub highest_nitrate: Vec<RankedCounty>,
}

/// Every county present in both the population and water quality tables
pub fn list_counties(dataset: &Dataset) -> Result<Vec<CountyRecord>> {
    let population = dataset.population()?;
    let water_quality = dataset.water_quality()?;
    Ok(inner_join(
        population,
        water_quality,
        columns::COUNTY_NAME,
        columns::COUNTY_NAME,
        CountyRecord::merge,
    ))
}

/// One merged county record, matched case-insensitively
pub fn get_county(dataset: &Dataset, name: &str) -> Result<Option<CountyRecord>> {
    let counties = list_counties(dataset)?;
    Ok(lookup_by_key(&counties, columns::COUNTY_NAME, KeyValue::Text(name)).cloned())
}

pub fn get_county_boundaries(dataset: &Dataset) -> Result<&CountyBoundaries> {
    dataset.county_boundaries()
}

/// The population table sorted on `sort_by`; an unknown column leaves file order
pub fn list_population<'a>(
    dataset: &'a Dataset,
    sort_by: &str,
    order: SortOrder,
) -> Result<Vec<&'a PopulationRecord>> {
    let population = dataset.population()?;
    Ok(sort(&view(population), sort_by, order))
}

/// Water quality rows at or below every given bound.
///
/// A row with a missing value for a bounded contaminant is excluded.
pub fn list_water_quality(
    dataset: &Dataset,
    filter: WaterQualityFilter,
) -> Result<Vec<&WaterQualityRecord>> {
    let mut rows = view(dataset.water_quality()?);
    for (column, bound) in filter.bounds() {
        if let Some(bound) = bound {
            rows = filter_range(&rows, column, Comparison::LessOrEqual, bound);
        }
    }
    Ok(rows)
}

pub fn get_county_water_quality<'a>(
    dataset: &'a Dataset,
    name: &str,
) -> Result<Option<&'a WaterQualityRecord>> {
    let water_quality = dataset.water_quality()?;
    Ok(lookup_by_key(
        water_quality,
        columns::COUNTY_NAME,
        KeyValue::Text(name),
    ))
}

pub fn water_quality_statistics(dataset: &Dataset) -> Result<WaterQualityStatistics> {
    let rows = dataset.water_quality()?;
    Ok(WaterQualityStatistics {
        lead: describe(rows, columns::LEAD),
        arsenic: describe(rows, columns::ARSENIC),
        nitrate: describe(rows, columns::NITRATE),
    })
}

/// The `limit` counties with the highest level of each contaminant
pub fn worst_counties(dataset: &Dataset, limit: usize) -> Result<WorstCounties> {
    let rows = view(dataset.water_quality()?);
    let ranked = |column: &str| -> Vec<RankedCounty> {
        top_n(&rows, column, limit, SortOrder::Descending)
            .iter()
            .map(|row| query::project(row, &[columns::COUNTY_NAME, column]))
            .collect()
    };

    Ok(WorstCounties {
        highest_lead: ranked(columns::LEAD),
        highest_arsenic: ranked(columns::ARSENIC),
        highest_nitrate: ranked(columns::NITRATE),
    })
}

/// Treatment plants, optionally limited to one county and to public ones
pub fn list_treatment_plants<'a>(
    dataset: &'a Dataset,
    county: Option<&str>,
    public_access_only: bool,
) -> Result<Vec<&'a TreatmentPlantRecord>> {
    let mut plants = view(dataset.treatment_plants()?);
    if let Some(county) = county.filter(|c| !c.is_empty()) {
        plants = filter_equals(&plants, columns::COUNTY, county);
    }
    if public_access_only {
        plants = query::filter_by(&plants, |plant| plant.is_public());
    }
    Ok(plants)
}

pub fn get_treatment_plant(
    dataset: &Dataset,
    facility_id: i64,
) -> Result<Option<&TreatmentPlantRecord>> {
    let plants = dataset.treatment_plants()?;
    Ok(lookup_by_key(
        plants,
        columns::FACILITY_ID,
        KeyValue::Integer(facility_id),
    ))
}

pub fn treatment_plants_by_county<'a>(
    dataset: &'a Dataset,
    name: &str,
) -> Result<Vec<&'a TreatmentPlantRecord>> {
    let plants = view(dataset.treatment_plants()?);
    Ok(filter_equals(&plants, columns::COUNTY, name))
}

/// Treatment plants within `radius_km` of `center`, nearest first
pub fn nearby_treatment_plants(
    dataset: &Dataset,
    center: GeoPoint,
    radius_km: f64,
) -> Result<Vec<Nearby<&TreatmentPlantRecord>>> {
    let plants = view(dataset.treatment_plants()?);
    Ok(find_within_radius(
        &plants,
        center.latitude,
        center.longitude,
        radius_km,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use crate::error::CalWaterError;
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    fn fixture() -> (TempDir, Dataset) {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("population_by_county.csv"),
            "county_name,total_population\n\
             Alameda,1600000\n\
             Butte,210000\n\
             Colusa,21000\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("water_quality_by_county.csv"),
            "county_name,lead_avg_ug_per_L,arsenic_avg_ug_per_L,nitrate_avg_mg_per_L\n\
             alameda,2.1,1.0,3.0\n\
             Colusa,4.5,,6.0\n\
             Yolo,0.5,3.0,1.5\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("water_treatment_plants.csv"),
            "facility_id,county,latitude,longitude,public_access,name\n\
             101,Alameda,37.80,-122.27,yes,East Bay Plant\n\
             102,Alameda,37.55,-121.98,no,Fremont Plant\n\
             201,Butte,39.73,-121.84,Yes,Chico Plant\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("California_Counties.geojson"),
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{"name":"Alameda"},"geometry":null}]}"#,
        )
        .unwrap();
        let dataset = Dataset::new(DataConfig::with_data_dir(dir.path()));
        (dir, dataset)
    }

    #[test]
    fn test_list_counties_is_inner_join() {
        let (_dir, dataset) = fixture();
        let counties = list_counties(&dataset).unwrap();

        let names: Vec<&str> = counties.iter().map(|c| c.county_name.as_str()).collect();
        assert_eq!(names, vec!["Alameda", "Colusa"]);
        assert_eq!(counties[1].arsenic_avg_ug_per_l, None);
    }

    #[test]
    fn test_get_county_merges_both_tables() {
        let (_dir, dataset) = fixture();

        let alameda = get_county(&dataset, "ALAMEDA").unwrap().unwrap();
        assert_eq!(alameda.county_name, "Alameda");
        assert_eq!(alameda.total_population, 1_600_000);
        assert_eq!(alameda.lead_avg_ug_per_l, Some(2.1));

        // Butte has population but no water quality row
        assert_eq!(get_county(&dataset, "Butte").unwrap(), None);
    }

    #[test]
    fn test_list_population_sorting() {
        let (_dir, dataset) = fixture();

        let desc = list_population(&dataset, columns::TOTAL_POPULATION, SortOrder::Descending)
            .unwrap();
        assert_eq!(desc[0].county_name, "Alameda");
        assert_eq!(desc[2].county_name, "Colusa");

        let unknown = list_population(&dataset, "median_age", SortOrder::Descending).unwrap();
        assert_eq!(unknown[0].county_name, "Alameda");
        assert_eq!(unknown[1].county_name, "Butte");
    }

    #[test]
    fn test_list_water_quality_filters() {
        let (_dir, dataset) = fixture();

        let all = list_water_quality(&dataset, WaterQualityFilter::default()).unwrap();
        assert_eq!(all.len(), 3);

        let low_lead = list_water_quality(
            &dataset,
            WaterQualityFilter {
                max_lead: Some(2.1),
                ..Default::default()
            },
        )
        .unwrap();
        let names: Vec<&str> = low_lead.iter().map(|r| r.county_name.as_str()).collect();
        assert_eq!(names, vec!["alameda", "Yolo"]);

        // Colusa has no arsenic value and drops out under an arsenic bound
        let bounded = list_water_quality(
            &dataset,
            WaterQualityFilter {
                max_arsenic: Some(100.0),
                max_nitrate: Some(2.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(bounded.len(), 1);
        assert_eq!(bounded[0].county_name, "Yolo");
    }

    #[test]
    fn test_get_county_water_quality() {
        let (_dir, dataset) = fixture();
        let yolo = get_county_water_quality(&dataset, "yolo").unwrap().unwrap();
        assert_eq!(yolo.nitrate_avg_mg_per_l, Some(1.5));
        assert!(get_county_water_quality(&dataset, "Butte").unwrap().is_none());
    }

    #[test]
    fn test_water_quality_statistics() {
        let (_dir, dataset) = fixture();
        let stats = water_quality_statistics(&dataset).unwrap();

        assert_eq!(stats.lead.count, 3);
        assert_eq!(stats.lead.max, 4.5);
        assert_eq!(stats.arsenic.count, 2);
        assert_eq!(stats.arsenic.mean, 2.0);

        let json = serde_json::to_value(stats).unwrap();
        assert!(json.get("lead_avg_ug_per_L").is_some());
        assert!(json["nitrate_avg_mg_per_L"].get("stddev").is_some());
    }

    #[test]
    fn test_worst_counties() {
        let (_dir, dataset) = fixture();
        let worst = worst_counties(&dataset, 2).unwrap();

        assert_eq!(worst.highest_lead.len(), 2);
        assert_eq!(worst.highest_lead[0]["county_name"], "Colusa");
        assert_eq!(worst.highest_lead[0][columns::LEAD], 4.5);
        assert_eq!(worst.highest_lead[0].len(), 2);
        // Null arsenic is not ranked
        assert_eq!(worst.highest_arsenic.len(), 2);
        assert_eq!(worst.highest_arsenic[0]["county_name"], "Yolo");

        let empty = worst_counties(&dataset, 0).unwrap();
        assert!(empty.highest_nitrate.is_empty());
    }

    #[test]
    fn test_list_treatment_plants() {
        let (_dir, dataset) = fixture();

        assert_eq!(list_treatment_plants(&dataset, None, false).unwrap().len(), 3);
        assert_eq!(
            list_treatment_plants(&dataset, Some("alameda"), false)
                .unwrap()
                .len(),
            2
        );

        let public = list_treatment_plants(&dataset, Some("Alameda"), true).unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].facility_id, 101);

        let all_public = list_treatment_plants(&dataset, None, true).unwrap();
        let ids: Vec<i64> = all_public.iter().map(|p| p.facility_id).collect();
        assert_eq!(ids, vec![101, 201]);
    }

    #[test]
    fn test_get_treatment_plant() {
        let (_dir, dataset) = fixture();
        let plant = get_treatment_plant(&dataset, 201).unwrap().unwrap();
        assert_eq!(plant.county, "Butte");
        assert_eq!(plant.attributes["name"], "Chico Plant");
        assert!(get_treatment_plant(&dataset, 999).unwrap().is_none());
    }

    #[test]
    fn test_treatment_plants_by_county() {
        let (_dir, dataset) = fixture();
        assert_eq!(treatment_plants_by_county(&dataset, "BUTTE").unwrap().len(), 1);
        assert!(treatment_plants_by_county(&dataset, "Inyo")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_nearby_treatment_plants() {
        let (_dir, dataset) = fixture();
        let center = GeoPoint::new(37.80, -122.27).unwrap();

        let nearby = nearby_treatment_plants(&dataset, center, 50.0).unwrap();
        let ids: Vec<i64> = nearby.iter().map(|n| n.record.facility_id).collect();
        assert_eq!(ids, vec![101, 102]);
        assert!(nearby[0].distance_km.abs() < 1e-9);

        let far = nearby_treatment_plants(&dataset, center, 500.0).unwrap();
        assert_eq!(far.len(), 3);
    }

    #[test]
    fn test_boundaries_pass_through() {
        let (_dir, dataset) = fixture();
        let boundaries = get_county_boundaries(&dataset).unwrap();
        assert_eq!(boundaries.feature_count(), 1);
        assert_eq!(boundaries.as_json()["type"], "FeatureCollection");
    }

    #[test]
    fn test_load_failure_propagates() {
        let (dir, dataset) = fixture();
        std::fs::remove_file(dir.path().join("water_quality_by_county.csv")).unwrap();

        assert!(matches!(
            list_counties(&dataset),
            Err(CalWaterError::NotFound { .. })
        ));
        // Population alone still works
        assert_eq!(
            list_population(&dataset, columns::COUNTY_NAME, SortOrder::Ascending)
                .unwrap()
                .len(),
            3
        );
    }
}
