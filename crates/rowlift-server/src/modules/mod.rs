//! Built-in import modules
//!
//! Each import type implements [`crate::import::ImportModule`]. The
//! contacts module ships as the reference implementation; deployments
//! register their own modules alongside it.

pub mod contacts;

pub use contacts::{ContactsModule, CONTACTS_TYPE_ID};
