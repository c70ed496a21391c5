#[macro_use]
extern crate diesel;

pub mod db;
pub mod importer;
pub mod models;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;

pub use importer::{import, ImportOptions, ImportReport};
pub use query::DieselSession;
pub use store::{Session, StoreError};
