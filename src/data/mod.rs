/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RentalDataset (memoized per path)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  quartile-range outlier passes (area, then total)
///   └──────────┘
///        │
///        ├──────────────────┐
///        ▼                  ▼
///   ┌───────────┐     ┌──────────┐
///   │ aggregate  │     │ metrics   │  counts, means, joint groups,
///   └───────────┘     └──────────┘  cost-per-area, thresholds
/// ```
///
/// Every stage takes a `&RentalDataset` and returns a new value.

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod stats;
