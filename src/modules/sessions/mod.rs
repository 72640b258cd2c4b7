// src/modules/sessions/mod.rs
// Read side of the auth provider's sessions; this crate never signs anyone in.

pub mod database;
pub use database::SessionDatabase;
