use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Categorical values
// ---------------------------------------------------------------------------

/// Whether the listing accepts pets. Spelled exactly as in the source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Animal {
    #[serde(rename = "acept")]
    Accepted,
    #[serde(rename = "not acept")]
    NotAccepted,
}

impl Animal {
    pub fn label(self) -> &'static str {
        match self {
            Animal::Accepted => "acept",
            Animal::NotAccepted => "not acept",
        }
    }

    /// Parse the literal source spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "acept" => Some(Animal::Accepted),
            "not acept" => Some(Animal::NotAccepted),
            _ => None,
        }
    }
}

/// Furnishing status. Spelled exactly as in the source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Furniture {
    #[serde(rename = "furnished")]
    Furnished,
    #[serde(rename = "not furnished")]
    NotFurnished,
}

impl Furniture {
    pub fn label(self) -> &'static str {
        match self {
            Furniture::Furnished => "furnished",
            Furniture::NotFurnished => "not furnished",
        }
    }

    /// Parse the literal source spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "furnished" => Some(Furniture::Furnished),
            "not furnished" => Some(Furniture::NotFurnished),
            _ => None,
        }
    }
}

impl fmt::Display for Animal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Furniture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// RentalRecord – one row of the source table
// ---------------------------------------------------------------------------

/// A single rental listing.
///
/// The four cost components conceptually sum to `total`, but the source
/// does not guarantee it and nothing here enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalRecord {
    pub city: String,
    /// Floor area in m².
    pub area: f64,
    #[serde(rename = "total (R$)")]
    pub total: f64,
    #[serde(rename = "rent amount (R$)")]
    pub rent: f64,
    #[serde(rename = "hoa (R$)")]
    pub hoa: f64,
    #[serde(rename = "property tax (R$)")]
    pub property_tax: f64,
    #[serde(rename = "fire insurance (R$)")]
    pub fire_insurance: f64,
    pub animal: Animal,
    pub furniture: Furniture,
}

impl RentalRecord {
    /// Strictly positive area and a non-negative total. Every table leaving
    /// the outlier filter holds only valid records.
    pub fn is_valid(&self) -> bool {
        NumericField::Area.admits(self.area) && NumericField::Total.admits(self.total)
    }
}

// ---------------------------------------------------------------------------
// Field selectors
// ---------------------------------------------------------------------------

/// Numeric columns the pipeline can filter and aggregate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Area,
    Total,
    Rent,
    Hoa,
    PropertyTax,
    FireInsurance,
}

impl NumericField {
    pub const ALL: [NumericField; 6] = [
        NumericField::Area,
        NumericField::Total,
        NumericField::Rent,
        NumericField::Hoa,
        NumericField::PropertyTax,
        NumericField::FireInsurance,
    ];

    /// Column name in the source table.
    pub fn column_name(self) -> &'static str {
        match self {
            NumericField::Area => "area",
            NumericField::Total => "total (R$)",
            NumericField::Rent => "rent amount (R$)",
            NumericField::Hoa => "hoa (R$)",
            NumericField::PropertyTax => "property tax (R$)",
            NumericField::FireInsurance => "fire insurance (R$)",
        }
    }

    /// Whether `value` is possible for this column: area must be positive,
    /// money non-negative. NaN never is.
    pub fn admits(self, value: f64) -> bool {
        match self {
            NumericField::Area => value > 0.0,
            _ => value >= 0.0,
        }
    }

    pub fn value(self, record: &RentalRecord) -> f64 {
        match self {
            NumericField::Area => record.area,
            NumericField::Total => record.total,
            NumericField::Rent => record.rent,
            NumericField::Hoa => record.hoa,
            NumericField::PropertyTax => record.property_tax,
            NumericField::FireInsurance => record.fire_insurance,
        }
    }
}

/// Categorical columns usable as group-by keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    City,
    Animal,
    Furniture,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 3] = [
        CategoricalField::City,
        CategoricalField::Animal,
        CategoricalField::Furniture,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            CategoricalField::City => "city",
            CategoricalField::Animal => "animal",
            CategoricalField::Furniture => "furniture",
        }
    }

    /// Group key of a record: the literal source spelling of the value.
    pub fn key(self, record: &RentalRecord) -> &str {
        match self {
            CategoricalField::City => &record.city,
            CategoricalField::Animal => record.animal.label(),
            CategoricalField::Furniture => record.furniture.label(),
        }
    }
}

// ---------------------------------------------------------------------------
// RentalDataset – an ordered, immutable collection of records
// ---------------------------------------------------------------------------

/// The loaded table. Duplicate rows are allowed; order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RentalDataset {
    records: Vec<RentalRecord>,
}

impl RentalDataset {
    pub fn new(records: Vec<RentalRecord>) -> Self {
        RentalDataset { records }
    }

    pub fn records(&self) -> &[RentalRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Values of one numeric column, in record order.
    pub fn column(&self, field: NumericField) -> Vec<f64> {
        self.records.iter().map(|r| field.value(r)).collect()
    }

    /// Build a new dataset from the records matching `keep`.
    pub fn retain_where<F>(&self, mut keep: F) -> RentalDataset
    where
        F: FnMut(&RentalRecord) -> bool,
    {
        RentalDataset {
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Distinct cities in order of first appearance.
    pub fn cities(&self) -> Vec<String> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut cities = Vec::new();
        for record in &self.records {
            if seen.insert(record.city.as_str()) {
                cities.push(record.city.clone());
            }
        }
        cities
    }
}

impl FromIterator<RentalRecord> for RentalDataset {
    fn from_iter<I: IntoIterator<Item = RentalRecord>>(iter: I) -> Self {
        RentalDataset::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A record with only the fields most tests care about set.
    pub fn record(city: &str, area: f64, total: f64) -> RentalRecord {
        RentalRecord {
            city: city.to_string(),
            area,
            total,
            rent: total * 0.8,
            hoa: total * 0.1,
            property_tax: total * 0.05,
            fire_insurance: total * 0.05,
            animal: Animal::Accepted,
            furniture: Furniture::NotFurnished,
        }
    }

    pub fn dataset(rows: &[(&str, f64, f64)]) -> RentalDataset {
        rows.iter()
            .map(|&(city, area, total)| record(city, area, total))
            .collect()
    }
}
