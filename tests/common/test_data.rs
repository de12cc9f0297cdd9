//! Test data generation utilities.
//!
//! Writes small data directories with known contents for the integration
//! tests. Coordinates are approximate county seats.

use std::io;
use std::path::Path;

pub const POPULATION_CSV: &str = "\
county_name,total_population
Alameda,1682353
Butte,211632
Fresno,1008654
Kern,909235
Los Angeles,10014009
San Francisco,873965
";

pub const WATER_QUALITY_CSV: &str = "\
county_name,lead_avg_ug_per_L,arsenic_avg_ug_per_L,nitrate_avg_mg_per_L
Alameda,1.2,2.0,1.1
Butte,,4.0,2.5
Fresno,3.4,9.8,8.2
Kern,2.9,12.1,6.4
Los Angeles,4.1,3.3,4.0
Imperial,0.8,6.5,3.9
";

pub const TREATMENT_PLANTS_CSV: &str = "\
facility_id,county,latitude,longitude,public_access,facility_name,capacity_mgd
1001,Alameda,37.8044,-122.2712,yes,Oakland East Bay,120
1002,Alameda,37.5485,-121.9886,no,Fremont Mission,45.5
1003,San Francisco,37.7749,-122.4194,Yes,SF Southeast,85
2001,Fresno,36.7378,-119.7871,no,Fresno Regional,80
3001,Los Angeles,34.0522,-118.2437,yes,Hyperion,450
";

pub const COUNTY_BOUNDARIES_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {"name": "Alameda"},
      "geometry": {"type": "Polygon", "coordinates": [[[-122.3, 37.9], [-121.5, 37.9], [-121.5, 37.4], [-122.3, 37.4], [-122.3, 37.9]]]}
    },
    {
      "type": "Feature",
      "properties": {"name": "Fresno"},
      "geometry": {"type": "Polygon", "coordinates": [[[-120.9, 37.6], [-118.4, 37.6], [-118.4, 35.9], [-120.9, 35.9], [-120.9, 37.6]]]}
    }
  ]
}
"#;

/// Write the four data files with their default names into `dir`
pub fn write_data_dir(dir: &Path) -> io::Result<()> {
    std::fs::write(dir.join("population_by_county.csv"), POPULATION_CSV)?;
    std::fs::write(dir.join("water_quality_by_county.csv"), WATER_QUALITY_CSV)?;
    std::fs::write(dir.join("water_treatment_plants.csv"), TREATMENT_PLANTS_CSV)?;
    std::fs::write(
        dir.join("California_Counties.geojson"),
        COUNTY_BOUNDARIES_GEOJSON,
    )?;
    Ok(())
}

/// Replace one file of a data directory
pub fn overwrite(dir: &Path, file_name: &str, contents: &str) -> io::Result<()> {
    std::fs::write(dir.join(file_name), contents)
}
