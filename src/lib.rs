//! Omsetku: bookkeeping core for small merchants.
//!
//! The HPP (cost of goods) calculator in [`domain::hpp`] is the pure core;
//! catalog, checkout and ledger build on it, and [`infra::advisor`] adds
//! best-effort AI pricing suggestions.

pub mod domain;
pub mod infra;
pub mod util;
