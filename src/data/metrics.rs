//! Cost-per-area at two granularities.
//!
//! City granularity is a ratio of means, `mean(total) / mean(area)`.
//! Record granularity is `total / area` per listing. Averaging the
//! per-record column does not give the city figure back, so the two are
//! kept as separate outputs.

use std::collections::BTreeMap;

use super::aggregate::{classify_mean_of_means, GroupClassification};
use super::model::{CategoricalField, NumericField, RentalDataset};
use super::stats::{mean, ratio};

/// Per-city summary row.
#[derive(Debug, Clone, PartialEq)]
pub struct CityAggregate {
    pub city: String,
    pub count: usize,
    pub mean_total: f64,
    pub mean_area: f64,
    /// `mean_total / mean_area`; `None` if the city's mean area is zero.
    pub cost_per_area: Option<f64>,
}

/// One [`CityAggregate`] per city present in `dataset`, sorted by city.
pub fn city_aggregates(dataset: &RentalDataset) -> Vec<CityAggregate> {
    let mut groups: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for r in dataset.records() {
        let (totals, areas) = groups.entry(CategoricalField::City.key(r)).or_default();
        totals.push(NumericField::Total.value(r));
        areas.push(NumericField::Area.value(r));
    }

    groups
        .into_iter()
        .filter_map(|(city, (totals, areas))| {
            let mean_total = mean(&totals)?;
            let mean_area = mean(&areas)?;
            Some(CityAggregate {
                city: city.to_string(),
                count: totals.len(),
                mean_total,
                mean_area,
                cost_per_area: ratio(mean_total, mean_area),
            })
        })
        .collect()
}

/// `total / area` for every record, parallel to `dataset.records()`.
/// A zero area yields NaN. The outlier filter never lets such a record
/// through, and the classifiers leave NaN out of their thresholds.
pub fn cost_per_area_by_record(dataset: &RentalDataset) -> Vec<f64> {
    dataset
        .records()
        .iter()
        .map(|r| ratio(r.total, r.area).unwrap_or(f64::NAN))
        .collect()
}

/// Mean of the per-record ratio inside each city. Only for comparison with
/// [`CityAggregate::cost_per_area`]; the dashboard plots the latter.
pub fn mean_record_cost_per_area_by_city(dataset: &RentalDataset) -> BTreeMap<String, f64> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (r, v) in dataset.records().iter().zip(cost_per_area_by_record(dataset)) {
        if v.is_finite() {
            groups.entry(r.city.as_str()).or_default().push(v);
        }
    }
    groups
        .into_iter()
        .filter_map(|(city, values)| Some((city.to_string(), mean(&values)?)))
        .collect()
}

/// Label each city's cost-per-area against the mean of all cities' values.
/// Cities without a ratio take no part.
pub fn classify_city_cost_per_area(aggregates: &[CityAggregate]) -> Option<GroupClassification> {
    classify_mean_of_means(
        aggregates
            .iter()
            .filter_map(|a| Some((a.city.as_str(), a.cost_per_area?))),
    )
}
