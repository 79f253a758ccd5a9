use approx::assert_relative_eq;
use chrono::NaiveDate;
use price_forecast::{
    evaluate_model, prepare_training_data, read_forecasts, run_batch, write_forecasts,
    write_prepared, DataLoader, ForecastConfig, ForecastError, PriceRegressor, TreeEnsemble,
};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// One split on the previous day's price: below 50 predicts 45, otherwise 55
const MODEL_JSON: &str = r#"{
    "name": "lag split",
    "feature_names": ["avg_price_lag_1", "month", "vegetable_tomato"],
    "base_score": 0.0,
    "trees": [
        {
            "nodeid": 0, "split": "avg_price_lag_1", "split_condition": 50.0,
            "yes": 1, "no": 2, "missing": 1,
            "children": [
                {"nodeid": 1, "leaf": 45.0},
                {"nodeid": 2, "leaf": 55.0}
            ]
        }
    ]
}"#;

struct Sheets {
    dir: TempDir,
}

impl Sheets {
    /// Thirty days of June 2023: onion flat at Rs 30, tomato rising from Rs 61
    fn write() -> Self {
        let dir = tempdir().unwrap();

        let mut prices = String::from("Date,Vegetable,Unit,Min_Price,Max_Price,Avg_Price\n");
        for day in 1..=30 {
            writeln!(prices, "2023-06-{:02},onion,Kg,Rs 25,Rs 35,Rs 30", day).unwrap();
            let tomato = 60 + day;
            writeln!(
                prices,
                "2023-06-{:02},tomato,Kg,Rs {},Rs {},Rs {}",
                day,
                tomato - 5,
                tomato + 5,
                tomato
            )
            .unwrap();
        }
        fs::write(dir.path().join("prices.csv"), prices).unwrap();

        let mut rainfall = String::from("date,rainfall_mm\n");
        for day in 1..=30 {
            writeln!(rainfall, "2023-06-{:02},{}", day, day % 3).unwrap();
        }
        fs::write(dir.path().join("rainfall.csv"), rainfall).unwrap();

        fs::write(
            dir.path().join("holidays.csv"),
            "date,name\n2023-06-20,Festival\n",
        )
        .unwrap();
        fs::write(dir.path().join("model.json"), MODEL_JSON).unwrap();

        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn prepare(&self) -> PathBuf {
        let dataset = prepare_training_data(
            self.path("prices.csv"),
            self.path("rainfall.csv"),
            self.path("holidays.csv"),
        )
        .unwrap();
        let out = self.path("prepared/final_training_data.csv");
        write_prepared(&out, &dataset).unwrap();
        out
    }
}

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, m, d).unwrap()
}

fn header(path: &Path) -> String {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .next()
        .unwrap()
        .to_string()
}

#[test]
fn test_prepare_writes_training_columns() {
    let sheets = Sheets::write();
    let prepared = sheets.prepare();

    assert_eq!(
        header(&prepared),
        "date,unit,min_price,max_price,avg_price,rainfall_mm,festival_flag,month,day_of_week,\
         is_monsoon,avg_price_lag_1,avg_price_lag_3,avg_price_lag_7,avg_price_lag_14,\
         avg_price_7d_mean,vegetable_onion,vegetable_tomato"
    );

    let histories = DataLoader::from_path(&prepared, "vegetable_").unwrap();
    assert_eq!(histories.item_names(), vec!["onion", "tomato"]);

    // Rows need fourteen earlier prices, so June 15 is the first kept day
    let tomato = histories.get("tomato").unwrap();
    assert_eq!(tomato.len(), 16);
    assert_eq!(tomato.records()[0].date, date(6, 15));
    assert_eq!(tomato.records()[0].avg_price, 75.0);
    assert_eq!(tomato.last_date(), Some(date(6, 30)));

    let festival: Vec<NaiveDate> = tomato
        .records()
        .iter()
        .filter(|r| r.festival_flag)
        .map(|r| r.date)
        .collect();
    assert_eq!(festival, vec![date(6, 20)]);
}

#[test]
fn test_full_forecast_workflow() {
    let sheets = Sheets::write();
    let prepared = sheets.prepare();

    let histories = DataLoader::from_path(&prepared, "vegetable_").unwrap();
    let model = TreeEnsemble::from_json_file(sheets.path("model.json")).unwrap();
    assert_eq!(model.name(), "lag split");

    let config = ForecastConfig {
        data_path: prepared,
        output_path: sheets.path("forecasts/next_7_days_forecast.csv"),
        ..ForecastConfig::default()
    };
    let report = run_batch(&model, &histories, &config, None).unwrap();
    write_forecasts(&config.output_path, &report.records()).unwrap();

    let written = read_forecasts(&config.output_path).unwrap();
    assert_eq!(written.len(), 14);
    assert_eq!(header(&config.output_path), "date,vegetable,predicted_price");

    for record in &written {
        let expected = if record.item == "tomato" { 55.0 } else { 45.0 };
        assert_eq!(record.predicted_price, expected);
    }

    let dates: Vec<NaiveDate> = written
        .iter()
        .filter(|r| r.item == "onion")
        .map(|r| r.date)
        .collect();
    let expected: Vec<NaiveDate> = (1..=7).map(|d| date(7, d)).collect();
    assert_eq!(dates, expected);
}

#[test]
fn test_rerun_overwrites_output() {
    let sheets = Sheets::write();
    let prepared = sheets.prepare();
    let histories = DataLoader::from_path(&prepared, "vegetable_").unwrap();
    let model = TreeEnsemble::from_json_file(sheets.path("model.json")).unwrap();
    let output = sheets.path("forecast.csv");

    let config = ForecastConfig::default();
    let all = run_batch(&model, &histories, &config, None).unwrap();
    write_forecasts(&output, &all.records()).unwrap();

    let single = run_batch(&model, &histories, &config, Some("onion")).unwrap();
    write_forecasts(&output, &single.records()).unwrap();

    let written = read_forecasts(&output).unwrap();
    assert_eq!(written.len(), 7);
    assert!(written.iter().all(|r| r.item == "onion"));
}

#[test]
fn test_evaluate_prepared_dataset() {
    let sheets = Sheets::write();
    let prepared = sheets.prepare();

    let df = DataLoader::read_frame(&prepared).unwrap();
    let model = TreeEnsemble::from_json_file(sheets.path("model.json")).unwrap();
    let report = evaluate_model(&model, &df, date(6, 25)).unwrap();

    assert_eq!(report.train_samples, 20);
    assert_eq!(report.test_samples, 12);
    // Onion is off by 15 every day, tomato by 30 to 35
    assert_relative_eq!(report.mae, 23.75, epsilon = 1e-9);
    assert!(report.rmse >= report.mae);
    assert!(report.r2.is_finite());

    let err = evaluate_model(&model, &df, date(8, 1)).unwrap_err();
    assert!(matches!(err, ForecastError::ValidationError(_)));
}

#[test]
fn test_missing_inputs_reported() {
    let dir = tempdir().unwrap();

    let err = DataLoader::from_path(dir.path().join("missing.csv"), "vegetable_").unwrap_err();
    assert!(matches!(err, ForecastError::IoError(_)));

    let err = TreeEnsemble::from_json_file(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, ForecastError::IoError(_)));

    let bad = dir.path().join("bad.json");
    fs::write(&bad, "{\"feature_names\": []}").unwrap();
    let err = TreeEnsemble::from_json_file(&bad).unwrap_err();
    assert!(matches!(err, ForecastError::ModelError(_)));
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{"horizon_days": 3, "parallel": true, "alignment": "strict", "start_date": "2024-05-01"}"#,
    )
    .unwrap();

    let config = ForecastConfig::from_file(&path).unwrap();
    assert_eq!(config.horizon_days, 3);
    assert!(config.parallel);
    assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2024, 5, 1));
    assert_eq!(config.history_days, 14);
    assert_eq!(config.min_history, 7);
}
