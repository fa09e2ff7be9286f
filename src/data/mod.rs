/// Data layer: core types, loading, and cleaning.
///
/// Architecture:
/// ```text
///  early_late_var<N>.csv / .tsv / .parquet / .json      workbook (.xlsx / .ods)
///        │                                                   │
///        ▼                                                   ▼
///   ┌──────────┐                                        ┌──────────┐
///   │  loader   │  one table per variant                 │  loader   │  early/late var<N> columns
///   └──────────┘                                        └──────────┘
///        └──────────────────────┬────────────────────────────┘
///                               ▼
///                      ┌────────────────┐
///                      │ VariantDataset  │  instruments × variants × {early, late}
///                      └────────────────┘
///                               │
///                               ▼
///                      ┌──────────┐
///                      │  clean    │  -1 (not measured) → 0 → CleanDataset
///                      └──────────┘
/// ```
pub mod clean;
pub mod loader;
pub mod model;
