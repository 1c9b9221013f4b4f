//! Series data model: observations grouped by key and ordered by period

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Group key of a series, e.g. `["Jawa Barat", "Beras"]` for province x commodity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesKey(Vec<String>);

impl SeriesKey {
    /// Create a key from its group values
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Group values in mapping order
    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" / "))
    }
}

/// One row of a series: a period and its named numeric values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    period: i64,
    values: BTreeMap<String, f64>,
}

impl Observation {
    /// Create an observation with no values
    pub fn new(period: i64) -> Self {
        Self {
            period,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style value setter
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Set a value
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Time index
    pub fn period(&self) -> i64 {
        self.period
    }

    /// Value of a named field, if present
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// All named values
    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }
}

/// Time-ordered observations for one group key.
///
/// Periods are strictly increasing; they need not be contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesRecord")]
pub struct Series {
    key: SeriesKey,
    observations: Vec<Observation>,
}

/// Unvalidated wire form of a [`Series`]
#[derive(Deserialize)]
struct SeriesRecord {
    key: SeriesKey,
    observations: Vec<Observation>,
}

impl TryFrom<SeriesRecord> for Series {
    type Error = ForecastError;

    fn try_from(record: SeriesRecord) -> Result<Self> {
        Series::new(record.key, record.observations)
    }
}

impl Series {
    /// Create a series, sorting by period and rejecting duplicate periods
    pub fn new(key: SeriesKey, mut observations: Vec<Observation>) -> Result<Self> {
        observations.sort_by_key(Observation::period);
        if let Some(pair) = observations
            .windows(2)
            .find(|w| w[0].period() == w[1].period())
        {
            return Err(ForecastError::DataError(format!(
                "Duplicate period {} in series {}",
                pair[0].period(),
                key
            )));
        }

        Ok(Self { key, observations })
    }

    /// Group key
    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    /// Observations in ascending period order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Check if the series has no observations
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Most recent observation, the forecasting anchor
    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Values of one field with their periods, skipping observations where it is missing
    pub fn field(&self, name: &str) -> Vec<(i64, f64)> {
        self.observations
            .iter()
            .filter_map(|o| o.value(name).map(|v| (o.period(), v)))
            .collect()
    }

    /// First `len` observations as a new series
    pub fn head(&self, len: usize) -> Series {
        Series {
            key: self.key.clone(),
            observations: self.observations[..len.min(self.observations.len())].to_vec(),
        }
    }

    /// Observations after the first `len`
    pub fn tail_after(&self, len: usize) -> &[Observation] {
        &self.observations[len.min(self.observations.len())..]
    }
}

/// A collection of series addressed by key, as produced by a tabular data source
///
/// Serialized as a list of series in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Series>", try_from = "Vec<Series>")]
pub struct Dataset {
    series: BTreeMap<SeriesKey, Series>,
}

impl From<Dataset> for Vec<Series> {
    fn from(dataset: Dataset) -> Self {
        dataset.series.into_values().collect()
    }
}

impl TryFrom<Vec<Series>> for Dataset {
    type Error = ForecastError;

    fn try_from(series: Vec<Series>) -> Result<Self> {
        let mut dataset = Dataset::new();
        for s in series {
            if dataset.series.contains_key(s.key()) {
                return Err(ForecastError::DataError(format!("Duplicate series {}", s.key())));
            }
            dataset.insert(s);
        }
        Ok(dataset)
    }
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Group loose `(key, observation)` pairs into validated series
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (SeriesKey, Observation)>,
    {
        let mut grouped: BTreeMap<SeriesKey, Vec<Observation>> = BTreeMap::new();
        for (key, observation) in records {
            grouped.entry(key).or_default().push(observation);
        }

        let mut dataset = Dataset::new();
        for (key, observations) in grouped {
            dataset.insert(Series::new(key, observations)?);
        }
        Ok(dataset)
    }

    /// Insert or replace a series
    pub fn insert(&mut self, series: Series) {
        self.series.insert(series.key().clone(), series);
    }

    /// Look up a series by key
    pub fn get(&self, key: &SeriesKey) -> Option<&Series> {
        self.series.get(key)
    }

    /// Iterate series in key order
    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.values()
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }

    /// Number of series
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Check if the dataset holds no series
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SeriesKey {
        SeriesKey::new(["Aceh", "Beras"])
    }

    #[test]
    fn test_series_sorts_by_period() {
        let series = Series::new(
            key(),
            vec![
                Observation::new(2020).with("y", 3.0),
                Observation::new(2018).with("y", 1.0),
                Observation::new(2019).with("y", 2.0),
            ],
        )
        .unwrap();

        let periods: Vec<i64> = series.observations().iter().map(|o| o.period()).collect();
        assert_eq!(periods, vec![2018, 2019, 2020]);
        assert_eq!(series.last().map(|o| o.period()), Some(2020));
    }

    #[test]
    fn test_series_rejects_duplicate_period() {
        let result = Series::new(
            key(),
            vec![Observation::new(2019), Observation::new(2019)],
        );
        assert!(matches!(result, Err(ForecastError::DataError(_))));
    }

    #[test]
    fn test_field_skips_missing() {
        let series = Series::new(
            key(),
            vec![
                Observation::new(2018).with("y", 1.0),
                Observation::new(2019),
                Observation::new(2020).with("y", 3.0),
            ],
        )
        .unwrap();
        assert_eq!(series.field("y"), vec![(2018, 1.0), (2020, 3.0)]);
    }

    #[test]
    fn test_dataset_groups_records() {
        let a = SeriesKey::new(["A"]);
        let b = SeriesKey::new(["B"]);
        let dataset = Dataset::from_records(vec![
            (b.clone(), Observation::new(2019)),
            (a.clone(), Observation::new(2019)),
            (a.clone(), Observation::new(2018)),
        ])
        .unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get(&a).map(Series::len), Some(2));
        let keys: Vec<String> = dataset.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[test]
    fn test_deserialize_validates_series() {
        let series: Series = serde_json::from_str(
            r#"{"key": ["Aceh", "Beras"], "observations": [
                {"period": 2020, "values": {"y": 3.0}},
                {"period": 2019, "values": {"y": 2.0}}
            ]}"#,
        )
        .unwrap();
        let periods: Vec<i64> = series.observations().iter().map(|o| o.period()).collect();
        assert_eq!(periods, vec![2019, 2020]);

        let duplicate = serde_json::from_str::<Series>(
            r#"{"key": ["Aceh"], "observations": [
                {"period": 2019, "values": {}},
                {"period": 2019, "values": {}}
            ]}"#,
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_dataset_json_round_trip() {
        let dataset = Dataset::from_records(vec![
            (SeriesKey::new(["B"]), Observation::new(2019).with("y", 1.0)),
            (SeriesKey::new(["A"]), Observation::new(2018).with("y", 2.0)),
        ])
        .unwrap();

        let json = serde_json::to_string(&dataset).unwrap();
        let back: Dataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dataset);

        let twice = format!("[{0},{0}]", serde_json::to_string(dataset.iter().next().unwrap()).unwrap());
        assert!(serde_json::from_str::<Dataset>(&twice).is_err());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(key().to_string(), "Aceh / Beras");
    }
}
