use liquidity_forecast::config::{CategoricalRule, FeatureConfig};
use liquidity_forecast::data::{write_forecasts, FORECAST_HEADER};
use liquidity_forecast::{
    ForecastConfig, ForecastError, ForecastRecord, LiquidityPipeline, MetadataTable,
    TransactionFeed,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

const METADATA: &str = "\
isin,issuer,market,amtIssued,issueDate,maturity
BOND1,issuer3,market1,500,01Jan2010,01Jan2030
BOND2,issuer1,market2,250,05Feb2012,05Feb2022
BOND3,issuer3,market1,,10Mar2014,10Mar2024
BOND4,issuer2,market3,100,01Jan2015,01Jan2025
";

fn small_config() -> ForecastConfig {
    let mut config = ForecastConfig {
        features: FeatureConfig {
            categorical_rules: vec![
                CategoricalRule::new("issuer", 6),
                CategoricalRule::new("market", 6),
            ],
            ..FeatureConfig::default()
        },
        ..ForecastConfig::default()
    };
    config.gradient_boosting.n_estimators = 30;
    config.gradient_boosting.learning_rate = 0.1;
    config.random_forest.n_trees = 15;
    config.random_forest.max_features = Some(3);
    config
}

// Helper to build a transaction feed with a few weeks of uneven trading
fn sample_transactions() -> String {
    let mut text = String::from("isin,side,price,volume,time,date\n");
    for day in 1..=20u32 {
        let date = format!("{:02}Mar2016", day);
        text.push_str(&format!("BOND1,B,100.0,{},10:00,{}\n", 100 + day * 5, date));
        if day % 2 == 0 {
            text.push_str(&format!("BOND1,S,99.5,{},11:00,{}\n", 40 + day, date));
            text.push_str(&format!("BOND2,B,101.0,{},12:00,{}\n", 20, date));
        }
        if day % 3 == 0 {
            text.push_str(&format!("BOND2,S,101.2,{},13:00,{}\n", 60 - day, date));
        }
        // Not in the metadata universe
        text.push_str(&format!("ORPHAN,B,90.0,1000,14:00,{}\n", date));
    }
    text
}

fn temp_csv(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", text).unwrap();
    file
}

fn run(transactions: &str, metadata: &str) -> liquidity_forecast::Result<Vec<ForecastRecord>> {
    let feed = TransactionFeed::from_reader(transactions.as_bytes())?;
    let meta = MetadataTable::from_reader(metadata.as_bytes())?;
    LiquidityPipeline::new(small_config()).run(&feed, &meta)
}

#[test]
fn test_full_forecast_workflow() {
    // 1. Write both feeds to disk
    let transactions = temp_csv(&sample_transactions());
    let metadata = temp_csv(METADATA);

    // 2. Load them back
    let feed = TransactionFeed::from_csv(transactions.path()).unwrap();
    let meta = MetadataTable::from_csv(metadata.path()).unwrap();
    assert_eq!(meta.rows().len(), 4);

    // 3. Forecast
    let forecasts = LiquidityPipeline::new(small_config())
        .run(&feed, &meta)
        .unwrap();
    let order: Vec<&str> = forecasts.iter().map(|f| f.isin.as_str()).collect();
    assert_eq!(order, vec!["BOND1", "BOND2", "BOND3", "BOND4"]);

    // 4. Write and re-read the output
    let dir = tempdir().unwrap();
    let output = dir.path().join("output_final.csv");
    write_forecasts(&output, &forecasts).unwrap();

    let written = fs::read_to_string(&output).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next().unwrap(), FORECAST_HEADER.join(","));
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 4);
    for (row, forecast) in rows.iter().zip(&forecasts) {
        assert_eq!(
            *row,
            format!(
                "{},{},{}",
                forecast.isin, forecast.buy_volume, forecast.sell_volume
            )
        );
    }
}

#[test]
fn test_active_bond_forecasts_exceed_idle_bond() {
    let forecasts = run(&sample_transactions(), METADATA).unwrap();
    // BOND1 buys between 105 and 200 every day
    assert!(forecasts[0].buy_volume > 0);
    assert!(forecasts[0].buy_volume >= forecasts[3].buy_volume);
    assert!(forecasts.iter().all(|f| f.isin != "ORPHAN"));
}

#[test]
fn test_runs_are_deterministic() {
    let first = run(&sample_transactions(), METADATA).unwrap();
    let second = run(&sample_transactions(), METADATA).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_constant_history_blends_to_known_value() {
    // Every bond trades 10 on both sides on each of 30 days, so every member
    // predicts 10 and the baseline is 300 / 30 = 10: (10 + 3 * 30) / 4 = 25
    let mut text = String::from("isin,side,date,volume\n");
    for day in 1..=30u32 {
        for isin in ["BOND1", "BOND2", "BOND3", "BOND4"] {
            for side in ["B", "S"] {
                text.push_str(&format!("{},{},{:02}Mar2016,10\n", isin, side, day));
            }
        }
    }

    let forecasts = run(&text, METADATA).unwrap();
    for forecast in &forecasts {
        assert_eq!(forecast.buy_volume, 25, "{}", forecast.isin);
        assert_eq!(forecast.sell_volume, 25, "{}", forecast.isin);
    }
}

#[test]
fn test_bond_without_trades_still_forecast() {
    let forecasts = run(&sample_transactions(), METADATA).unwrap();
    let idle = forecasts.iter().find(|f| f.isin == "BOND3").unwrap();
    // Zero lags and a zero baseline; only the static features drive the models
    assert!(idle.buy_volume < forecasts[0].buy_volume);
}

#[test]
fn test_malformed_category_aborts_run() {
    let metadata = METADATA.replace("market3", "LSE");
    let err = run(&sample_transactions(), &metadata).unwrap_err();
    assert!(matches!(err, ForecastError::Schema(_)));
    assert!(err.to_string().contains("BOND4"));
}

#[test]
fn test_single_day_history_is_data_error() {
    let text = "isin,side,date,volume\nBOND1,B,01Mar2016,10\nBOND2,S,01Mar2016,5\n";
    assert!(matches!(run(text, METADATA), Err(ForecastError::Data(_))));
}

#[test]
fn test_empty_feed_is_data_error() {
    let text = "isin,side,date,volume\n";
    assert!(matches!(run(text, METADATA), Err(ForecastError::Data(_))));
}

#[test]
fn test_default_rules_need_their_columns() {
    let feed = TransactionFeed::from_reader(sample_transactions().as_bytes()).unwrap();
    let meta = MetadataTable::from_reader(METADATA.as_bytes()).unwrap();
    let err = LiquidityPipeline::new(ForecastConfig::default())
        .run(&feed, &meta)
        .unwrap_err();
    assert!(matches!(err, ForecastError::Schema(_)));
}

#[test]
fn test_invalid_config_rejected_before_fitting() {
    let mut config = small_config();
    config.random_forest.n_trees = 0;
    let feed = TransactionFeed::from_reader(sample_transactions().as_bytes()).unwrap();
    let meta = MetadataTable::from_reader(METADATA.as_bytes()).unwrap();
    assert!(matches!(
        LiquidityPipeline::new(config).run(&feed, &meta),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_config_file_round_trip() {
    let config = small_config();
    let file = temp_csv(&serde_json::to_string_pretty(&config).unwrap());
    let loaded = ForecastConfig::from_json_file(file.path()).unwrap();
    assert_eq!(loaded, config);
}
