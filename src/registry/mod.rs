//! Registry Module
//!
//! Tracks which objects are open and coordinates access to them.
//!
//! ## Responsibilities
//! - Share one open handle per object id across concurrent operations
//! - Serialize appends per object, never across objects
//! - Refuse exclusive creation of anything already open or on disk
//! - Let deletes wait out every in-flight borrower before closing
//! - Close idle handles on demand

mod handle;
#[allow(clippy::module_inception)]
mod registry;

pub use handle::{HandleRef, ObjectHandle, OpenMode};
pub use registry::{validate_object_id, ObjectRegistry, MAX_OBJECT_ID_LEN};
