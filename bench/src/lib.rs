//! Benchmark utilities for the lifecycle registries.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p rusty_lifecycle_bench
//!
//! # Run specific benchmark group
//! cargo bench -p rusty_lifecycle_bench -- singleton_scan
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports for visualization.

pub mod fixtures;
