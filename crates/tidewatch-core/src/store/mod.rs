// In-memory caches shared across the console.

mod catalog;
mod collection;

pub use catalog::{DeviceCatalog, SerialOption, serial_label};
pub use collection::Keyed;
