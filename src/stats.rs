//! Descriptive statistics and rankings over a numeric column.
//!
//! Null values are skipped. Statistics over fewer values than they need are
//! NaN rather than errors, so aggregates stay total over any valid table.

use serde::Serialize;

use crate::query::SortOrder;
use crate::records::Record;

/// Summary of one numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// Number of non-null values the summary was computed over
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub stddev: f64,
}

impl Summary {
    /// Summarize a set of values
    pub fn from_values(mut values: Vec<f64>) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                count,
                mean: f64::NAN,
                median: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                stddev: f64::NAN,
            };
        }

        values.sort_by(f64::total_cmp);
        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;

        let middle = count / 2;
        let median = if count % 2 == 0 {
            (values[middle - 1] + values[middle]) / 2.0
        } else {
            values[middle]
        };

        let stddev = if count < 2 {
            f64::NAN
        } else {
            let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (n - 1.0)).sqrt()
        };

        Self {
            count,
            mean,
            median,
            min: values[0],
            max: values[count - 1],
            stddev,
        }
    }
}

/// Non-null numeric values of `field`, in table order
pub fn column_values<R: Record>(rows: &[R], field: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| row.field(field).and_then(|v| v.as_f64()))
        .collect()
}

/// Describe the non-null values of `field`
pub fn describe<R: Record>(rows: &[R], field: &str) -> Summary {
    Summary::from_values(column_values(rows, field))
}

/// The `n` rows with the largest (descending) or smallest (ascending) value.
///
/// Ties keep table order. Rows whose value is null are not ranked.
pub fn top_n<R: Record + Clone>(rows: &[R], field: &str, n: usize, order: SortOrder) -> Vec<R> {
    let mut ranked: Vec<(usize, f64)> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| row.field(field).and_then(|v| v.as_f64()).map(|v| (i, v)))
        .collect();

    // sort_by is stable, so equal values stay in table order
    ranked.sort_by(|(_, a), (_, b)| match order {
        SortOrder::Ascending => a.total_cmp(b),
        SortOrder::Descending => b.total_cmp(a),
    });

    ranked
        .into_iter()
        .take(n)
        .map(|(i, _)| rows[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::view;
    use crate::records::{columns, WaterQualityRecord};

    fn water(name: &str, lead: Option<f64>) -> WaterQualityRecord {
        WaterQualityRecord {
            county_name: name.to_string(),
            lead_avg_ug_per_l: lead,
            arsenic_avg_ug_per_l: None,
            nitrate_avg_mg_per_l: None,
        }
    }

    #[test]
    fn test_describe_reference_values() {
        let rows = vec![
            water("A", Some(1.0)),
            water("B", Some(2.0)),
            water("C", Some(3.0)),
        ];
        let summary = describe(&rows, columns::LEAD);

        assert_eq!(summary.count, 3);
        assert_eq!(summary.mean, 2.0);
        assert_eq!(summary.median, 2.0);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 3.0);
        assert!((summary.stddev - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_describe_skips_nulls() {
        let rows = vec![
            water("A", Some(4.0)),
            water("B", None),
            water("C", Some(1.0)),
            water("D", Some(3.0)),
            water("E", Some(2.0)),
        ];
        let summary = describe(&rows, columns::LEAD);

        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 2.5);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
    }

    #[test]
    fn test_describe_single_value() {
        let rows = vec![water("A", Some(7.0))];
        let summary = describe(&rows, columns::LEAD);

        assert_eq!(summary.mean, 7.0);
        assert_eq!(summary.median, 7.0);
        assert!(summary.stddev.is_nan());
    }

    #[test]
    fn test_describe_all_null() {
        let rows = vec![water("A", None), water("B", None)];
        let summary = describe(&rows, columns::ARSENIC);

        assert_eq!(summary.count, 0);
        assert!(summary.mean.is_nan());
        assert!(summary.median.is_nan());
        assert!(summary.min.is_nan());
        assert!(summary.max.is_nan());
        assert!(summary.stddev.is_nan());

        // NaN is reported as null
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["mean"], serde_json::Value::Null);
    }

    #[test]
    fn test_top_n_descending() {
        let rows = vec![
            water("A", Some(1.0)),
            water("B", Some(9.0)),
            water("C", Some(5.0)),
            water("D", Some(7.0)),
        ];
        let top = top_n(&view(&rows), columns::LEAD, 2, SortOrder::Descending);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].county_name, "B");
        assert_eq!(top[1].county_name, "D");
    }

    #[test]
    fn test_top_n_ties_keep_order() {
        let rows = vec![
            water("A", Some(3.0)),
            water("B", Some(5.0)),
            water("C", Some(5.0)),
            water("D", Some(5.0)),
        ];
        let top = top_n(&rows, columns::LEAD, 2, SortOrder::Descending);
        let names: Vec<&str> = top.iter().map(|r| r.county_name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);

        let bottom = top_n(&rows, columns::LEAD, 1, SortOrder::Ascending);
        assert_eq!(bottom[0].county_name, "A");
    }

    #[test]
    fn test_top_n_short_table() {
        let rows = vec![water("A", Some(1.0))];
        assert_eq!(top_n(&rows, columns::LEAD, 2, SortOrder::Descending).len(), 1);

        let with_null = vec![water("A", Some(1.0)), water("B", None)];
        let top = top_n(&with_null, columns::LEAD, 5, SortOrder::Descending);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].county_name, "A");
    }
}
