//! On-disk segment files produced by tablet writers.

/// Parquet segment writer and sealed-segment descriptors.
pub mod segment;
