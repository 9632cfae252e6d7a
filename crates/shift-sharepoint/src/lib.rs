//! SharePoint implementation of the shift platform services.
//!
//! [`SharePointClient`] talks to the SharePoint REST API with a bearer token
//! and OData `nometadata` JSON. Failures map onto [`shift_core::ShiftError`]
//! so the engine's retry policy can classify them: a response status becomes
//! `Http`, and a failed connection becomes `Network`.

mod client;
mod path;
mod wire;

pub use client::SharePointClient;
pub use path::encode_path_parameter;
