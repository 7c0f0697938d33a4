use super::model::{NumericField, RentalDataset, RentalRecord};
use super::stats::quantile;

// ---------------------------------------------------------------------------
// Quartile-range outlier filter
// ---------------------------------------------------------------------------

/// Fence multiplier applied to the interquartile range. Deliberately wider
/// than the conventional 1.5.
pub const IQR_MULTIPLIER: f64 = 4.0;

/// Retained range for one field: `[q1 - k·iqr, q3 + k·iqr]`, both ends
/// inclusive, further limited to values the field admits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierBounds {
    pub field: NumericField,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    /// Compute the bounds of `field` over the admissible values of
    /// `dataset`. `None` when there are none.
    pub fn compute(dataset: &RentalDataset, field: NumericField, multiplier: f64) -> Option<Self> {
        let values: Vec<f64> = dataset
            .column(field)
            .into_iter()
            .filter(|&v| field.admits(v))
            .collect();
        let q1 = quantile(&values, 0.25)?;
        let q3 = quantile(&values, 0.75)?;
        let iqr = q3 - q1;
        Some(OutlierBounds {
            field,
            q1,
            q3,
            iqr,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    /// A negative lower fence does not let a zero area through. NaN is never inside.
    pub fn contains(&self, value: f64) -> bool {
        self.field.admits(value) && self.lower <= value && value <= self.upper
    }

    /// New dataset holding the records whose field lies inside the bounds.
    pub fn apply(&self, dataset: &RentalDataset) -> RentalDataset {
        let filtered = dataset.retain_where(|r| self.contains(self.field.value(r)));
        log::debug!(
            "outlier filter on '{}': [{:.2}, {:.2}] kept {}/{}",
            self.field.column_name(),
            self.lower,
            self.upper,
            filtered.len(),
            dataset.len()
        );
        filtered
    }
}

/// Records with a positive area and a non-negative total.
pub fn drop_invalid(dataset: &RentalDataset) -> RentalDataset {
    let valid = dataset.retain_where(RentalRecord::is_valid);
    if valid.len() < dataset.len() {
        log::debug!(
            "dropped {} listings with non-positive area or negative total",
            dataset.len() - valid.len()
        );
    }
    valid
}

/// Keep only the records whose `field` lies inside the quartile fences.
///
/// Returns a new dataset; the input is untouched. An empty input (or one
/// with no admissible values in `field`) yields an empty dataset.
///
/// This is a single pass. Filtering the result again recomputes the
/// quartiles on the smaller table, which for most tables changes nothing
/// but can tighten the fences when the quartiles sit on a run of equal
/// values (see the `second_pass_can_tighten_degenerate_fences` test).
pub fn filter_outliers(dataset: &RentalDataset, field: NumericField, multiplier: f64) -> RentalDataset {
    match OutlierBounds::compute(dataset, field, multiplier) {
        Some(bounds) => bounds.apply(dataset),
        None => {
            log::debug!("outlier filter on '{}': no admissible values", field.column_name());
            RentalDataset::default()
        }
    }
}

/// Drop invalid records, then apply [`filter_outliers`] once per field, in
/// order, each pass working on the output of the previous one. Not the same
/// as filtering each field against the raw table and intersecting.
pub fn filter_outliers_sequential(
    dataset: &RentalDataset,
    fields: &[NumericField],
    multiplier: f64,
) -> RentalDataset {
    fields
        .iter()
        .fold(drop_invalid(dataset), |current, &field| {
            filter_outliers(&current, field, multiplier)
        })
}

/// The bounds each pass of [`filter_outliers_sequential`] applies, in order.
/// Stops at the first pass that finds no admissible values, since every
/// later pass sees an empty table.
pub fn sequential_bounds(
    dataset: &RentalDataset,
    fields: &[NumericField],
    multiplier: f64,
) -> Vec<OutlierBounds> {
    let mut current = drop_invalid(dataset);
    let mut bounds = Vec::with_capacity(fields.len());
    for &field in fields {
        let Some(b) = OutlierBounds::compute(&current, field, multiplier) else {
            break;
        };
        current = b.apply(&current);
        bounds.push(b);
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::{dataset, record};

    #[test]
    fn bounds_use_multiplier_four() {
        let ds = dataset(&[
            ("A", 1.0, 0.0),
            ("A", 2.0, 0.0),
            ("A", 3.0, 0.0),
            ("A", 4.0, 0.0),
            ("A", 5.0, 0.0),
        ]);
        let b = OutlierBounds::compute(&ds, NumericField::Area, IQR_MULTIPLIER).unwrap();
        assert_eq!(b.q1, 2.0);
        assert_eq!(b.q3, 4.0);
        assert_eq!(b.iqr, 2.0);
        assert_eq!(b.lower, -6.0);
        assert_eq!(b.upper, 12.0);
    }

    #[test]
    fn removes_extreme_area_and_keeps_boundary() {
        // q1 = 2, q3 = 4, upper fence = 12, so 12 stays and 13 goes.
        let ds = dataset(&[
            ("A", 1.0, 0.0),
            ("A", 2.0, 0.0),
            ("A", 3.0, 0.0),
            ("A", 4.0, 0.0),
            ("A", 5.0, 0.0),
        ]);
        let b = OutlierBounds::compute(&ds, NumericField::Area, IQR_MULTIPLIER).unwrap();
        assert!(b.contains(12.0));
        assert!(!b.contains(12.000_001));
        assert!(!b.contains(f64::NAN));

        let big = dataset(&[
            ("A", 10.0, 0.0),
            ("A", 20.0, 0.0),
            ("A", 30.0, 0.0),
            ("A", 40.0, 0.0),
            ("A", 50.0, 0.0),
            ("A", 60.0, 0.0),
            ("A", 70.0, 0.0),
            ("A", 80.0, 0.0),
            ("A", 90.0, 0.0),
            ("A", 10_000.0, 0.0),
        ]);
        let out = filter_outliers(&big, NumericField::Area, IQR_MULTIPLIER);
        assert_eq!(out.len(), 9);
        assert!(out.records().iter().all(|r| r.area < 100.0));
    }

    #[test]
    fn result_is_a_subset_in_original_order() {
        let ds = dataset(&[
            ("A", 50.0, 1000.0),
            ("B", 55.0, 1100.0),
            ("C", 60.0, 1200.0),
            ("D", 5000.0, 1300.0),
            ("E", 65.0, 1400.0),
        ]);
        let out = filter_outliers(&ds, NumericField::Area, IQR_MULTIPLIER);
        let cities: Vec<&str> = out.records().iter().map(|r| r.city.as_str()).collect();
        assert_eq!(cities, vec!["A", "B", "C", "E"]);
        for r in out.records() {
            assert!(ds.records().contains(r));
        }
    }

    #[test]
    fn filtering_twice_changes_nothing() {
        let ds = dataset(&[
            ("A", 50.0, 1000.0),
            ("B", 55.0, 1100.0),
            ("C", 60.0, 1200.0),
            ("D", 5000.0, 1300.0),
            ("E", 65.0, 1400.0),
            ("F", 70.0, 1500.0),
        ]);
        let once = filter_outliers(&ds, NumericField::Area, IQR_MULTIPLIER);
        let twice = filter_outliers(&once, NumericField::Area, IQR_MULTIPLIER);
        assert_eq!(once, twice);
    }

    #[test]
    fn sequential_differs_from_independent_intersection() {
        // Area pass drops row "X"; with it gone, the quartiles of total
        // tighten enough to also drop row "Y".
        let ds = dataset(&[
            ("A", 50.0, 100.0),
            ("B", 50.0, 100.0),
            ("C", 50.0, 100.0),
            ("D", 50.0, 110.0),
            ("E", 50.0, 110.0),
            ("F", 50.0, 110.0),
            ("Y", 50.0, 190.0),
            ("X", 9_000.0, 1_000.0),
        ]);

        let sequential = filter_outliers_sequential(
            &ds,
            &[NumericField::Area, NumericField::Total],
            IQR_MULTIPLIER,
        );

        let by_area = filter_outliers(&ds, NumericField::Area, IQR_MULTIPLIER);
        let by_total = filter_outliers(&ds, NumericField::Total, IQR_MULTIPLIER);
        let independent = by_area.retain_where(|r| by_total.records().contains(r));

        let names = |d: &RentalDataset| -> Vec<String> {
            d.records().iter().map(|r| r.city.clone()).collect()
        };
        assert_eq!(names(&sequential), vec!["A", "B", "C", "D", "E", "F"]);
        assert_eq!(names(&independent), vec!["A", "B", "C", "D", "E", "F", "Y"]);
    }

    #[test]
    fn empty_input_is_empty_output() {
        let out = filter_outliers(&RentalDataset::default(), NumericField::Area, IQR_MULTIPLIER);
        assert!(out.is_empty());
        let seq = filter_outliers_sequential(
            &RentalDataset::default(),
            &[NumericField::Area, NumericField::Total],
            IQR_MULTIPLIER,
        );
        assert!(seq.is_empty());
    }

    #[test]
    fn second_pass_can_tighten_degenerate_fences() {
        // q1 = 50, q3 = 50.25, so 51 survives the first pass. Without 500 both
        // quartiles are 50 and the second pass drops 51.
        let ds = dataset(&[
            ("A", 50.0, 100.0),
            ("A", 50.0, 100.0),
            ("A", 50.0, 100.0),
            ("A", 50.0, 100.0),
            ("A", 50.0, 100.0),
            ("A", 50.0, 100.0),
            ("B", 51.0, 100.0),
            ("C", 500.0, 100.0),
        ]);
        let once = filter_outliers(&ds, NumericField::Area, IQR_MULTIPLIER);
        let twice = filter_outliers(&once, NumericField::Area, IQR_MULTIPLIER);
        assert_eq!(once.len(), 7);
        assert_eq!(twice.len(), 6);
    }

    #[test]
    fn filtered_records_have_positive_area_and_non_negative_total() {
        let ds = dataset(&[
            ("A", 30.0, 1000.0),
            ("A", 45.0, 1100.0),
            ("A", 60.0, 1200.0),
            ("A", 80.0, 1300.0),
            ("A", 100.0, 1400.0),
            ("A", 120.0, 1500.0),
            ("Zero", 0.0, 1200.0),
            ("Negative", -10.0, 1100.0),
            ("Refund", 60.0, -5.0),
        ]);

        // The area fence is [-97.5, 240] here; admissibility still drops 0 and -10.
        let by_area = filter_outliers(&ds, NumericField::Area, IQR_MULTIPLIER);
        let names: Vec<&str> = by_area.records().iter().map(|r| r.city.as_str()).collect();
        assert_eq!(names, vec!["A", "A", "A", "A", "A", "A", "Refund"]);

        for fields in [&[NumericField::Area, NumericField::Total][..], &[][..]] {
            let out = filter_outliers_sequential(&ds, fields, IQR_MULTIPLIER);
            assert_eq!(out.len(), 6);
            assert!(out.records().iter().all(|r| r.area > 0.0 && r.total >= 0.0));
        }
    }

    #[test]
    fn sequential_bounds_follow_each_pass() {
        let ds = dataset(&[
            ("A", 50.0, 100.0),
            ("B", 50.0, 100.0),
            ("C", 50.0, 100.0),
            ("D", 50.0, 110.0),
            ("E", 50.0, 110.0),
            ("F", 50.0, 110.0),
            ("Y", 50.0, 190.0),
            ("X", 9_000.0, 1_000.0),
        ]);
        let fields = [NumericField::Area, NumericField::Total];
        let bounds = sequential_bounds(&ds, &fields, IQR_MULTIPLIER);
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds[0].field, NumericField::Area);
        // The total quartiles come from the seven rows left after the area pass.
        assert_eq!(bounds[1].q1, 100.0);
        assert_eq!(bounds[1].q3, 110.0);

        let by_hand = bounds.iter().fold(ds.clone(), |d, b| b.apply(&d));
        assert_eq!(by_hand, filter_outliers_sequential(&ds, &fields, IQR_MULTIPLIER));
        assert!(sequential_bounds(&RentalDataset::default(), &fields, IQR_MULTIPLIER).is_empty());
    }

    #[test]
    fn nan_field_is_dropped() {
        let ds: RentalDataset = vec![
            record("A", 50.0, 100.0),
            record("B", f64::NAN, 100.0),
            record("C", 60.0, 100.0),
        ]
        .into_iter()
        .collect();
        let out = filter_outliers(&ds, NumericField::Area, IQR_MULTIPLIER);
        assert_eq!(out.len(), 2);
    }
}
