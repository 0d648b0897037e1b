//! Remote catalogs: registry, listing fetch/parse and size labels.
//!
//! # Overview
//!
//! - [`CatalogRegistry`] - static `(category, key)` → [`CatalogSource`] map
//! - [`CatalogFetcher`] - cached listing fetch, degrading to empty on failure
//! - [`parse_listing`] - HTML directory index → [`CatalogEntry`] list
//! - [`parse_size_label`] / [`format_bytes`] - size label helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use romifleur_core::catalog::{CatalogFetcher, CatalogRegistry};
//! use romifleur_core::download::HttpClient;
//! use romifleur_core::filter::SearchOptions;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(CatalogRegistry::builtin()?);
//! let fetcher = CatalogFetcher::new(registry, HttpClient::new());
//! let options = SearchOptions { query: "mario".to_string(), ..SearchOptions::default() };
//! for entry in fetcher.search("Nintendo", "NES", &options).await {
//!     println!("{} ({})", entry.name, entry.size);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod fetcher;
mod listing;
mod registry;
mod size;

pub use error::CatalogError;
pub use fetcher::CatalogFetcher;
pub use listing::{CatalogEntry, parse_listing};
pub use registry::{BUILTIN_REGISTRY, CatalogRegistry, CatalogSource};
pub use size::{UNKNOWN_SIZE, format_bytes, parse_size_label};
