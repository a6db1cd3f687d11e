//! Settings for the controller, each backend, the UI and logging.
//!
//! `schema` holds the typed sections and their defaults, `load` the layered
//! environment/file loader and validation.

mod load;
mod schema;

pub use schema::*;
