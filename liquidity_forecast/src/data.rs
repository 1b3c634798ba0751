//! Input feeds and forecast output
//!
//! Both feeds are CSV with a header row. The transaction feed needs the
//! columns `isin`, `side`, `date` and `volume`; any other columns are
//! ignored. The metadata feed is kept as text cells and decoded later by
//! [`crate::static_features`].

use crate::dates::parse_trade_date;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Trade side of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Client buy (`B`)
    Buy,
    /// Client sell (`S`)
    Sell,
    /// Any other code; ignored when building panels
    Other,
}

impl Side {
    /// Map a feed side code
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "B" => Side::Buy,
            "S" => Side::Sell,
            _ => Side::Other,
        }
    }
}

/// One tick-level transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// Bond identifier
    pub isin: String,
    /// Trade side
    pub side: Side,
    /// Trade date
    pub date: NaiveDate,
    /// Traded volume
    pub volume: f64,
}

impl TransactionRecord {
    /// Create a record, rejecting negative or non-finite volume
    pub fn new(isin: &str, side: Side, date: NaiveDate, volume: f64) -> Result<Self> {
        if !volume.is_finite() || volume < 0.0 {
            return Err(ForecastError::Parse(format!(
                "Invalid volume {} for bond '{}'",
                volume, isin
            )));
        }
        Ok(Self {
            isin: isin.to_string(),
            side,
            date,
            volume,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    isin: String,
    side: String,
    date: String,
    volume: String,
}

/// Parsed transaction feed
#[derive(Debug, Clone, Default)]
pub struct TransactionFeed {
    records: Vec<TransactionRecord>,
}

impl TransactionFeed {
    /// Wrap already-parsed records
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }

    /// Load the feed from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load the feed from any CSV source
    ///
    /// The first malformed row aborts the load.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for (row, raw) in csv_reader.deserialize::<RawTransaction>().enumerate() {
            let raw = raw?;
            let line = row + 2;
            let date = parse_trade_date(&raw.date).map_err(|e| at_line(line, e))?;
            let volume: f64 = raw.volume.trim().parse().map_err(|_| {
                ForecastError::Parse(format!(
                    "line {}: volume '{}' is not a number",
                    line, raw.volume
                ))
            })?;
            let record =
                TransactionRecord::new(raw.isin.trim(), Side::from_code(&raw.side), date, volume)
                    .map_err(|e| at_line(line, e))?;
            records.push(record);
        }

        Ok(Self { records })
    }

    /// All records in feed order
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the feed has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Trade dates of every record
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.records.iter().map(|r| r.date)
    }
}

fn at_line(line: usize, err: ForecastError) -> ForecastError {
    match err {
        ForecastError::Parse(msg) => ForecastError::Parse(format!("line {}: {}", line, msg)),
        other => other,
    }
}

/// Metadata feed as header plus text cells
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MetadataTable {
    /// Build from headers and rows; every row must match the header width
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((pos, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != headers.len()) {
            return Err(ForecastError::Schema(format!(
                "Metadata row {} has {} cells, header has {}",
                pos,
                row.len(),
                headers.len()
            )));
        }
        Ok(Self { headers, rows })
    }

    /// Load the metadata from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load the metadata from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(|c| c.trim().to_string()).collect());
        }

        Self::new(headers, rows)
    }

    /// Column names in file order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows in file order
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Position of a column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Unique bond identifiers in first-appearance order
    pub fn universe(&self, id_column: &str) -> Result<Vec<String>> {
        let id = self.column_index(id_column).ok_or_else(|| {
            ForecastError::Schema(format!("Metadata has no '{}' column", id_column))
        })?;

        let mut seen = HashSet::new();
        let mut universe = Vec::new();
        for row in &self.rows {
            let isin = &row[id];
            if isin.is_empty() {
                return Err(ForecastError::Schema(format!(
                    "Metadata row with empty '{}'",
                    id_column
                )));
            }
            if seen.insert(isin.as_str()) {
                universe.push(isin.clone());
            }
        }
        Ok(universe)
    }
}

/// Forecast for one bond
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastRecord {
    /// Bond identifier
    pub isin: String,
    /// Predicted buy volume
    #[serde(rename = "buyvolume")]
    pub buy_volume: u64,
    /// Predicted sell volume
    #[serde(rename = "sellvolume")]
    pub sell_volume: u64,
}

/// Header of the forecast file
pub const FORECAST_HEADER: [&str; 3] = ["isin", "buyvolume", "sellvolume"];

/// Write forecasts to a CSV file
pub fn write_forecasts<P: AsRef<Path>>(path: P, records: &[ForecastRecord]) -> Result<()> {
    let file = File::create(path)?;
    write_forecasts_to(file, records)
}

/// Write forecasts to any sink; the header is written even with no records
pub fn write_forecasts_to<W: Write>(writer: W, records: &[ForecastRecord]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(FORECAST_HEADER)?;
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FEED: &str = "\
isin,side,price,volume,dealer,time,date
X1,B,100.5,100,d1,10:00,16Mar2016
X1,S,100.1,25.5,d2,11:00,15Mar2016
X2,Q,99.0,10,d1,12:00,15Mar2016
";

    #[test]
    fn test_transaction_feed_ignores_extra_columns() {
        let feed = TransactionFeed::from_reader(FEED.as_bytes()).unwrap();
        assert_eq!(feed.len(), 3);

        let first = &feed.records()[0];
        assert_eq!(first.isin, "X1");
        assert_eq!(first.side, Side::Buy);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2016, 3, 16).unwrap());
        assert_eq!(first.volume, 100.0);
        assert_eq!(feed.records()[1].side, Side::Sell);
        assert_eq!(feed.records()[2].side, Side::Other);
    }

    #[test]
    fn test_transaction_feed_rejects_bad_date() {
        let text = "isin,side,date,volume\nX1,B,16Foo2016,10\n";
        let err = TransactionFeed::from_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(err, ForecastError::Parse(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_transaction_feed_rejects_negative_volume() {
        let text = "isin,side,date,volume\nX1,B,16Mar2016,-5\n";
        assert!(matches!(
            TransactionFeed::from_reader(text.as_bytes()),
            Err(ForecastError::Parse(_))
        ));
    }

    #[test]
    fn test_metadata_universe_is_unique_and_ordered() {
        let text = "isin,market\nB2,market1\nA1,market2\nB2,market3\n";
        let table = MetadataTable::from_reader(text.as_bytes()).unwrap();
        assert_eq!(table.headers(), &["isin".to_string(), "market".to_string()]);
        assert_eq!(table.universe("isin").unwrap(), vec!["B2", "A1"]);
        assert!(matches!(
            table.universe("bond"),
            Err(ForecastError::Schema(_))
        ));
    }

    #[test]
    fn test_write_forecasts_header_and_rows() {
        let records = vec![
            ForecastRecord {
                isin: "B2".to_string(),
                buy_volume: 12,
                sell_volume: 0,
            },
            ForecastRecord {
                isin: "A1".to_string(),
                buy_volume: 3,
                sell_volume: 40,
            },
        ];
        let mut out = Vec::new();
        write_forecasts_to(&mut out, &records).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "isin,buyvolume,sellvolume\nB2,12,0\nA1,3,40\n"
        );
    }

    #[test]
    fn test_write_forecasts_empty_still_has_header() {
        let mut out = Vec::new();
        write_forecasts_to(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "isin,buyvolume,sellvolume\n");
    }
}
