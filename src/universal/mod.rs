//! Universal package model.
//!
//! The conversion engine talks to a universal package only through the
//! [`UniversalPackage`] trait. [`MemoryPackage`] is the bundled
//! implementation.

mod memory;
mod traits;

pub use memory::MemoryPackage;
pub use traits::UniversalPackage;
