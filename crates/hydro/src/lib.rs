pub mod dates;
pub mod db;
mod error;
pub mod file_access;
pub mod registry;
pub mod routes;
pub mod seasonal;
mod startup;
mod station_data;
mod utils;

pub use db::{DateRange, Measurement, SeriesAccess, SeriesStore};
pub use error::{Error, ErrorBody};
pub use file_access::{FileAccess, FileData};
pub use registry::{Field, Registry, RegistryError, Station};
pub use routes::*;
pub use seasonal::{reshape_for_chart, PercentileRecord};
pub use startup::*;
pub use station_data::*;
pub use utils::*;
