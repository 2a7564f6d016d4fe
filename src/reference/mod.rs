pub mod catalog;

pub use catalog::{RangeOverlap, ReferenceCatalog};
