//! Numeric static attributes per bond
//!
//! Retained columns are every metadata column except the identifier and the
//! excluded date fields, in metadata header order. Categorical columns are
//! decoded with the configured [`CategoricalRule`]s; every other retained
//! column must already be numeric. Empty cells become 0.

use crate::config::{CategoricalRule, FeatureConfig};
use crate::data::MetadataTable;
use crate::error::{ForecastError, Result};
use ndarray::{Array2, ArrayView1};
use std::collections::HashMap;

/// Decode a `<prefix><integer>` category label into its integer code
pub fn decode_category(value: &str, rule: &CategoricalRule) -> Result<i64> {
    let malformed = || {
        ForecastError::Schema(format!(
            "Column '{}': value '{}' is not a {}-character prefix followed by an integer",
            rule.column, value, rule.prefix_len
        ))
    };

    let split = value
        .char_indices()
        .nth(rule.prefix_len)
        .map(|(pos, _)| pos)
        .ok_or_else(malformed)?;
    let (prefix, code) = value.split_at(split);

    if let Some(expected) = &rule.prefix {
        if prefix != expected {
            return Err(ForecastError::Schema(format!(
                "Column '{}': value '{}' does not start with '{}'",
                rule.column, value, expected
            )));
        }
    }

    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    code.parse().map_err(|_| malformed())
}

/// Cleaned, fully numeric static table, one row per bond in universe order
#[derive(Debug, Clone, PartialEq)]
pub struct StaticFeatureTable {
    bonds: Vec<String>,
    columns: Vec<String>,
    values: Array2<f64>,
}

struct RetainedColumn<'a> {
    name: &'a str,
    position: usize,
    rule: Option<&'a CategoricalRule>,
}

impl StaticFeatureTable {
    /// Build the table for `universe` from metadata rows
    ///
    /// When a bond has several metadata rows the last one is used. Bonds
    /// without a metadata row get zeros.
    pub fn build(
        metadata: &MetadataTable,
        universe: &[String],
        config: &FeatureConfig,
    ) -> Result<Self> {
        let id_position = metadata.column_index(&config.id_column).ok_or_else(|| {
            ForecastError::Schema(format!("Metadata has no '{}' column", config.id_column))
        })?;

        for rule in &config.categorical_rules {
            if metadata.column_index(&rule.column).is_none() {
                return Err(ForecastError::Schema(format!(
                    "Metadata has no '{}' column required by its categorical rule",
                    rule.column
                )));
            }
        }

        let retained: Vec<RetainedColumn> = metadata
            .headers()
            .iter()
            .enumerate()
            .filter(|(_, name)| config.is_retained(name))
            .map(|(position, name)| RetainedColumn {
                name,
                position,
                rule: config.rule_for(name),
            })
            .collect();

        let mut latest: HashMap<&str, &[String]> = HashMap::new();
        for row in metadata.rows() {
            latest.insert(row[id_position].as_str(), row.as_slice());
        }

        let mut values = Array2::zeros((universe.len(), retained.len()));
        for (r, isin) in universe.iter().enumerate() {
            let row = match latest.get(isin.as_str()) {
                Some(row) => row,
                None => continue,
            };

            for (c, column) in retained.iter().enumerate() {
                values[[r, c]] = decode_cell(&row[column.position], column)
                    .map_err(|e| with_bond(e, isin))?;
            }
        }

        Ok(Self {
            bonds: universe.to_vec(),
            columns: retained.iter().map(|c| c.name.to_string()).collect(),
            values,
        })
    }

    /// Bonds in row order
    pub fn bonds(&self) -> &[String] {
        &self.bonds
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Numeric values, rows = bonds
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Row of a bond
    pub fn row(&self, isin: &str) -> Option<ArrayView1<f64>> {
        self.bonds
            .iter()
            .position(|b| b == isin)
            .map(|r| self.values.row(r))
    }

    /// Value of a bond in a named column
    pub fn value(&self, isin: &str, column: &str) -> Option<f64> {
        let c = self.columns.iter().position(|name| name == column)?;
        self.row(isin).map(|row| row[c])
    }
}

fn decode_cell(cell: &str, column: &RetainedColumn) -> Result<f64> {
    if cell.is_empty() {
        return Ok(0.0);
    }

    if let Some(rule) = column.rule {
        return decode_category(cell, rule).map(|code| code as f64);
    }

    match cell.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ForecastError::Schema(format!(
            "Column '{}': value '{}' is not numeric",
            column.name, cell
        ))),
    }
}

fn with_bond(err: ForecastError, isin: &str) -> ForecastError {
    match err {
        ForecastError::Schema(msg) => ForecastError::Schema(format!("bond '{}': {}", isin, msg)),
        other => other,
    }
}
