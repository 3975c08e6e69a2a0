//! Persistent stores

pub mod registry;

pub use registry::{LookupMethod, RegistryMatch, StoredOwner, StoredVehicle, VehicleRegistry};
