//! Tabular data loading through an explicit column mapping
//!
//! Headers are normalised (trimmed, lower-cased) and then matched exactly
//! against a [`ColumnMapping`]; there is no guessing of column meaning.

use crate::error::{ForecastError, Result};
use crate::series::{Dataset, Observation, SeriesKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Which columns hold the period, the group key and the numeric values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Integer time index column, e.g. `tahun`
    pub period: String,
    /// Columns forming the series key, e.g. `provinsi`, `komoditas`
    pub groups: Vec<String>,
    /// Numeric columns: targets and covariates
    pub values: Vec<String>,
}

/// Column indices resolved against a header row
#[derive(Debug, Clone)]
struct ResolvedColumns {
    period: usize,
    groups: Vec<usize>,
    values: Vec<(String, usize)>,
}

/// Normalise a header or mapping name for matching
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ColumnMapping {
    /// Create a mapping
    pub fn new<S: Into<String>>(
        period: impl Into<String>,
        groups: impl IntoIterator<Item = S>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            period: period.into(),
            groups: groups.into_iter().map(Into::into).collect(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Check the mapping on its own: non-empty values, no column used twice
    pub fn validate(&self) -> Result<()> {
        if self.values.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Column mapping needs at least one value column".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let all = std::iter::once(&self.period)
            .chain(self.groups.iter())
            .chain(self.values.iter());
        for name in all {
            let normalized = normalize_header(name);
            if normalized.is_empty() {
                return Err(ForecastError::InvalidParameter(
                    "Column mapping contains an empty name".to_string(),
                ));
            }
            if !seen.insert(normalized) {
                return Err(ForecastError::InvalidParameter(format!(
                    "Column '{}' is mapped more than once",
                    name
                )));
            }
        }
        Ok(())
    }

    fn resolve(&self, headers: &[String]) -> Result<ResolvedColumns> {
        self.validate()?;
        let find = |name: &str| -> Result<usize> {
            let wanted = normalize_header(name);
            headers.iter().position(|h| *h == wanted).ok_or_else(|| {
                ForecastError::DataError(format!(
                    "Column '{}' not found; available columns: {}",
                    name,
                    headers.join(", ")
                ))
            })
        };

        Ok(ResolvedColumns {
            period: find(&self.period)?,
            groups: self
                .groups
                .iter()
                .map(|g| find(g))
                .collect::<Result<Vec<_>>>()?,
            values: self
                .values
                .iter()
                .map(|v| Ok((normalize_header(v), find(v)?)))
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

/// Data loader for tabular series data
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a dataset from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, mapping: &ColumnMapping) -> Result<Dataset> {
        let file = File::open(path.as_ref())?;
        let dataset = Self::from_reader(file, mapping)?;
        info!(
            path = %path.as_ref().display(),
            series = dataset.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Load a dataset from any CSV reader
    pub fn from_reader<R: Read>(reader: R, mapping: &ColumnMapping) -> Result<Dataset> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(normalize_header).collect();
        let columns = mapping.resolve(&headers)?;

        let mut records = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            // Header is line 1
            let line = index + 2;
            let cell = |i: usize| record.get(i).unwrap_or("");

            let period = parse_period(cell(columns.period), line)?;
            let key_parts = columns
                .groups
                .iter()
                .map(|&i| {
                    let value = cell(i);
                    if value.is_empty() {
                        Err(ForecastError::DataError(format!(
                            "Line {}: empty group value in column '{}'",
                            line, headers[i]
                        )))
                    } else {
                        Ok(value.to_string())
                    }
                })
                .collect::<Result<Vec<_>>>()?;

            let mut observation = Observation::new(period);
            for (name, i) in &columns.values {
                if let Some(value) = parse_value(cell(*i), name, line)? {
                    observation.set(name.clone(), value);
                }
            }
            records.push((SeriesKey::new(key_parts), observation));
        }

        if records.is_empty() {
            return Err(ForecastError::DataError("No data rows found".to_string()));
        }

        Dataset::from_records(records)
    }
}

fn parse_period(raw: &str, line: usize) -> Result<i64> {
    if let Ok(period) = raw.parse::<i64>() {
        return Ok(period);
    }
    // Spreadsheet exports often write years as floats
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(ForecastError::DataError(format!(
            "Line {}: '{}' is not an integer period",
            line, raw
        ))),
    }
}

fn parse_value(raw: &str, column: &str, line: usize) -> Result<Option<f64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Ok(None),
        Err(_) => Err(ForecastError::DataError(format!(
            "Line {}: '{}' in column '{}' is not a number",
            line, raw, column
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> ColumnMapping {
        ColumnMapping::new("Tahun", ["Provinsi", "Komoditas"], ["Produksi", "Konsumsi"])
    }

    #[test]
    fn test_from_reader_groups_series() {
        let csv = "\
 Tahun ,PROVINSI,Komoditas,Produksi,Konsumsi
2019,Aceh,Beras,100,80
2020,Aceh,Beras,110,
2019,Bali,Beras,50,70
";
        let dataset = DataLoader::from_reader(csv.as_bytes(), &mapping()).unwrap();
        assert_eq!(dataset.len(), 2);

        let aceh = dataset.get(&SeriesKey::new(["Aceh", "Beras"])).unwrap();
        assert_eq!(aceh.len(), 2);
        assert_eq!(aceh.observations()[1].value("produksi"), Some(110.0));
        assert_eq!(aceh.observations()[1].value("konsumsi"), None);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let csv = "tahun,provinsi,komoditas,produksi\n2019,Aceh,Beras,1\n";
        let err = DataLoader::from_reader(csv.as_bytes(), &mapping()).unwrap_err();
        assert!(err.to_string().contains("Konsumsi"));
    }

    #[test]
    fn test_float_period_and_bad_number() {
        assert_eq!(parse_period("2020.0", 2).unwrap(), 2020);
        assert!(parse_period("2020.5", 2).is_err());
        assert!(parse_value("abc", "produksi", 3).is_err());
        assert_eq!(parse_value("", "produksi", 3).unwrap(), None);
    }

    #[test]
    fn test_mapping_rejects_duplicates() {
        let m = ColumnMapping::new("tahun", ["tahun"], ["produksi"]);
        assert!(m.validate().is_err());
        let m = ColumnMapping::new("tahun", Vec::<String>::new(), Vec::new());
        assert!(m.validate().is_err());
    }
}
