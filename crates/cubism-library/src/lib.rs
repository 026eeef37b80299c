//! Derived-artifact library for imported assets.
//!
//! Every imported asset owns a set of artifacts in the library, addressed by
//! the asset's uuid and an extension (`.live2d` for the raw copy, `.json` for
//! the serialized meta). Importers never write into the live layout directly:
//! they write into a per-asset staging area which the host commits as a unit
//! once the import succeeded.

pub mod storage;

pub use storage::{
    check_extension, hash_source, LibraryBackend, LibraryConfig, LibraryError, LocalLibrary,
};
