//! # recap-storage
//!
//! Storage abstraction for the recap service.
//!
//! This crate defines the [`RecapRecord`] model and the [`RecapStore`] trait
//! that persistent backends implement. It contains no backend of its own;
//! the PostgreSQL implementation lives in `recap-db-postgres`.
//!
//! ## Example
//!
//! ```ignore
//! use recap_storage::{RecapStore, StoreError};
//!
//! async fn user_name(store: &dyn RecapStore, user_id: u32) -> Result<Option<String>, StoreError> {
//!     let record = store.fetch_recap(user_id, None).await?;
//!     Ok(record.map(|r| r.user_name))
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::StoreError;
pub use traits::{DEFAULT_QUERY_TIMEOUT, RecapStore, effective_deadline};
pub use types::RecapRecord;
