//! Getting tract data into a joinable shape.
//! - Tract identifier and field-name normalisation
//! - CSV dataset loading (one file per data category)
//! - GeoJSON tract registry loading

pub mod normalise;
pub mod dataset_loader;
pub mod registry_loader;

pub use normalise::{normalise_field_name, IdentifierNormaliser};
pub use dataset_loader::SourceSpec;
pub use registry_loader::RegistrySpec;
