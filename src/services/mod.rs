//! Business logic services.
//!
//! Services orchestrate the container, storage, and conversion layers and
//! provide the caller-facing [`VendorPackage`].

pub mod cloze;
mod collector;
pub mod convert;
mod id_reconciler;
mod package;

pub use collector::IssueCollector;
pub use id_reconciler::{IdReconciler, IdSpace, ORIGINAL_VENDOR_ID_KEY, derive_vendor_id};
pub use package::VendorPackage;
