use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::DataError;
use super::model::{Animal, CategoricalField, Furniture, NumericField, RentalDataset, RentalRecord};

/// Every column a source table must carry. Anything else is ignored.
pub fn required_columns() -> Vec<&'static str> {
    CategoricalField::ALL
        .iter()
        .map(|c| c.column_name())
        .chain(NumericField::ALL.iter().map(|n| n.column_name()))
        .collect()
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a rental table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – the source layout, one listing per row (recommended)
/// * `.json`    – `[{ "city": ..., "area": ..., "total (R$)": ..., ... }, ...]`
/// * `.parquet` – same column names as the CSV
pub fn load_file(path: &Path) -> Result<RentalDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(DataError::UnsupportedExtension(other.to_string()).into()),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!("Loaded {} listings from {}", dataset.len(), path.display());
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Memoized loading
// ---------------------------------------------------------------------------

/// Process-lifetime cache of loaded tables, keyed by path.
///
/// The source files are static while the dashboard runs, so entries are
/// never invalidated.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, Arc<RentalDataset>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, reading it on first use.
    /// A failed load is not cached.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<RentalDataset>> {
        if let Some(ds) = self.entries.get(path) {
            log::debug!("dataset cache hit for {}", path.display());
            return Ok(Arc::clone(ds));
        }
        let ds = Arc::new(load_file(path)?);
        self.entries.insert(path.to_path_buf(), Arc::clone(&ds));
        Ok(ds)
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with the source column names, one listing per row.
fn load_csv(path: &Path) -> Result<RentalDataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();

    for column in required_columns() {
        if !headers.iter().any(|h| h == column) {
            return Err(DataError::MissingColumn(column.to_string()).into());
        }
    }

    let mut records = Vec::new();
    for (row_no, result) in reader.deserialize::<RentalRecord>().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        records.push(record);
    }

    Ok(RentalDataset::new(records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "city": "São Paulo", "area": 70, "total (R$)": 5618,
///     "rent amount (R$)": 3300, "hoa (R$)": 2065, "property tax (R$)": 211,
///     "fire insurance (R$)": 42, "animal": "acept", "furniture": "furnished" },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<RentalDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        for column in required_columns() {
            match obj.get(column) {
                None => return Err(DataError::MissingColumn(column.to_string()).into()),
                Some(JsonValue::Null) => {
                    return Err(DataError::NullValue {
                        row: i,
                        column: column.to_string(),
                    }
                    .into())
                }
                Some(_) => {}
            }
        }

        let record: RentalRecord = serde_json::from_value(row.clone())
            .with_context(|| format!("JSON row {i}"))?;
        records.push(record);
    }

    Ok(RentalDataset::new(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with the source column names.
///
/// Numeric columns may be Int32, Int64, Float32 or Float64 (pandas writes
/// integer columns as Int64); text columns Utf8 or LargeUtf8.
fn load_parquet(path: &Path) -> Result<RentalDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        read_batch(&batch, records.len(), &mut records)?;
    }

    Ok(RentalDataset::new(records))
}

fn read_batch(batch: &RecordBatch, first_row: usize, out: &mut Vec<RentalRecord>) -> Result<()> {
    let column = |name: &str| -> Result<&ArrayRef> {
        let schema = batch.schema_ref();
        let idx = schema
            .index_of(name)
            .map_err(|_| DataError::MissingColumn(name.to_string()))?;
        Ok(batch.column(idx))
    };

    let city = column(CategoricalField::City.column_name())?;
    let animal = column(CategoricalField::Animal.column_name())?;
    let furniture = column(CategoricalField::Furniture.column_name())?;
    let area = column(NumericField::Area.column_name())?;
    let total = column(NumericField::Total.column_name())?;
    let rent = column(NumericField::Rent.column_name())?;
    let hoa = column(NumericField::Hoa.column_name())?;
    let property_tax = column(NumericField::PropertyTax.column_name())?;
    let fire_insurance = column(NumericField::FireInsurance.column_name())?;

    for row in 0..batch.num_rows() {
        let abs_row = first_row + row;
        let animal_text = extract_str(animal, "animal", abs_row, row)?;
        let furniture_text = extract_str(furniture, "furniture", abs_row, row)?;

        out.push(RentalRecord {
            city: extract_str(city, "city", abs_row, row)?,
            area: extract_f64(area, NumericField::Area.column_name(), abs_row, row)?,
            total: extract_f64(total, NumericField::Total.column_name(), abs_row, row)?,
            rent: extract_f64(rent, NumericField::Rent.column_name(), abs_row, row)?,
            hoa: extract_f64(hoa, NumericField::Hoa.column_name(), abs_row, row)?,
            property_tax: extract_f64(
                property_tax,
                NumericField::PropertyTax.column_name(),
                abs_row,
                row,
            )?,
            fire_insurance: extract_f64(
                fire_insurance,
                NumericField::FireInsurance.column_name(),
                abs_row,
                row,
            )?,
            animal: Animal::parse(&animal_text).ok_or_else(|| DataError::InvalidCategory {
                row: abs_row,
                column: "animal".to_string(),
                value: animal_text.clone(),
            })?,
            furniture: Furniture::parse(&furniture_text).ok_or_else(|| {
                DataError::InvalidCategory {
                    row: abs_row,
                    column: "furniture".to_string(),
                    value: furniture_text.clone(),
                }
            })?,
        });
    }
    Ok(())
}

// -- Parquet / Arrow helpers --

/// Read one numeric cell as `f64`, whatever the column's numeric width.
fn extract_f64(col: &ArrayRef, name: &str, abs_row: usize, row: usize) -> Result<f64> {
    if col.is_null(row) {
        return Err(DataError::NullValue {
            row: abs_row,
            column: name.to_string(),
        }
        .into());
    }
    let value = match col.data_type() {
        DataType::Float64 => downcast::<Float64Array>(col, name)?.value(row),
        DataType::Float32 => downcast::<Float32Array>(col, name)?.value(row) as f64,
        DataType::Int64 => downcast::<Int64Array>(col, name)?.value(row) as f64,
        DataType::Int32 => downcast::<Int32Array>(col, name)?.value(row) as f64,
        other => {
            return Err(DataError::UnexpectedType {
                column: name.to_string(),
                found: format!("{other:?}"),
                expected: "Int32, Int64, Float32 or Float64",
            }
            .into())
        }
    };
    Ok(value)
}

/// Read one text cell.
fn extract_str(col: &ArrayRef, name: &str, abs_row: usize, row: usize) -> Result<String> {
    if col.is_null(row) {
        return Err(DataError::NullValue {
            row: abs_row,
            column: name.to_string(),
        }
        .into());
    }
    let value = match col.data_type() {
        DataType::Utf8 => downcast::<StringArray>(col, name)?.value(row).to_string(),
        DataType::LargeUtf8 => downcast::<LargeStringArray>(col, name)?.value(row).to_string(),
        other => {
            return Err(DataError::UnexpectedType {
                column: name.to_string(),
                found: format!("{other:?}"),
                expected: "Utf8 or LargeUtf8",
            }
            .into())
        }
    };
    Ok(value)
}

fn downcast<'a, T: 'static>(col: &'a ArrayRef, name: &str) -> Result<&'a T> {
    col.as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("column '{name}' does not match its declared type"))
}
