use lagcast::config::AppConfig;
use lagcast::data::{ColumnMapping, DataLoader};
use lagcast::error::ForecastError;
use lagcast::series::SeriesKey;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

const CSV: &str = "\
Tahun,Provinsi,Komoditas,Produksi,Konsumsi,Curah_Hujan
2018,Aceh,Beras,1200.5,900,210
2019,Aceh,Beras,1250,950,
2020,Aceh,Beras,1310.25,1002,198
2018,Bali,Jagung,400,380,150
2019,Bali,Jagung,410,395,160
";

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_csv_with_default_mapping() {
    let file = write_csv(CSV);
    let mapping = AppConfig::default().data.column_mapping();
    let dataset = DataLoader::from_csv(file.path(), &mapping).unwrap();

    assert_eq!(dataset.len(), 2);
    let keys: Vec<String> = dataset.keys().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["Aceh / Beras", "Bali / Jagung"]);

    let aceh = dataset.get(&SeriesKey::new(["Aceh", "Beras"])).unwrap();
    assert_eq!(
        aceh.field("produksi"),
        vec![(2018, 1200.5), (2019, 1250.0), (2020, 1310.25)]
    );
    // Unmapped column is ignored
    assert_eq!(aceh.observations()[0].value("curah_hujan"), None);
}

#[test]
fn test_missing_cells_become_missing_values() {
    let file = write_csv(CSV);
    let mapping = ColumnMapping::new(
        "tahun",
        ["provinsi", "komoditas"],
        ["konsumsi", "curah_hujan"],
    );
    let dataset = DataLoader::from_csv(file.path(), &mapping).unwrap();
    let aceh = dataset.get(&SeriesKey::new(["Aceh", "Beras"])).unwrap();

    assert_eq!(
        aceh.field("curah_hujan"),
        vec![(2018, 210.0), (2020, 198.0)]
    );
}

#[test]
fn test_unsorted_rows_are_ordered_by_period() {
    let file = write_csv(
        "tahun,provinsi,komoditas,produksi,konsumsi\n\
         2021,Aceh,Beras,3,3\n\
         2019,Aceh,Beras,1,1\n\
         2020,Aceh,Beras,2,2\n",
    );
    let dataset =
        DataLoader::from_csv(file.path(), &AppConfig::default().data.column_mapping()).unwrap();
    let aceh = dataset.get(&SeriesKey::new(["Aceh", "Beras"])).unwrap();
    let periods: Vec<i64> = aceh.observations().iter().map(|o| o.period()).collect();
    assert_eq!(periods, vec![2019, 2020, 2021]);
}

#[test]
fn test_duplicate_period_is_rejected() {
    let file = write_csv(
        "tahun,provinsi,komoditas,produksi,konsumsi\n\
         2019,Aceh,Beras,1,1\n\
         2019,Aceh,Beras,2,2\n",
    );
    let err = DataLoader::from_csv(file.path(), &AppConfig::default().data.column_mapping())
        .unwrap_err();
    assert!(matches!(err, ForecastError::DataError(_)));
}

#[test]
fn test_bad_number_reports_line() {
    let file = write_csv(
        "tahun,provinsi,komoditas,produksi,konsumsi\n\
         2019,Aceh,Beras,1,1\n\
         2020,Aceh,Beras,n/a,2\n",
    );
    let err = DataLoader::from_csv(file.path(), &AppConfig::default().data.column_mapping())
        .unwrap_err();
    assert!(err.to_string().contains("Line 3"), "{}", err);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = DataLoader::from_csv(
        "/definitely/not/here.csv",
        &AppConfig::default().data.column_mapping(),
    )
    .unwrap_err();
    assert!(matches!(err, ForecastError::IoError(_)));
}

#[test]
fn test_config_file_round_trip() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"forecast": {{"horizon": 4, "features": ["lag1", "period"]}}, "data": {{"values": ["produksi"]}}}}"#
    )
    .unwrap();

    let config = AppConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.forecast.horizon, 4);
    assert_eq!(config.forecast.features, vec!["lag1", "period"]);
    assert_eq!(config.data.values, vec!["produksi"]);
    assert_eq!(config.data.groups, vec!["provinsi", "komoditas"]);
}
