//! PostgREST adapters for tablesync.
//!
//! [`PostgrestClient`] reads whole tables as a source store;
//! [`PostgrestDestination`] wraps a client to delete and insert as a
//! destination store.

mod client;
mod error;
mod types;

pub use client::{PostgrestClient, PostgrestDestination};
pub use error::{PostgrestError, Result};
pub use types::ApiErrorResponse;
