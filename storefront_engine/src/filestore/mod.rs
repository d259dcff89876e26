//! `FileStoreDatabase` is the flat-file fallback backend, used when no database URL is configured. One JSON
//! array-of-objects file per collection, rewritten wholesale on every write.

mod filestore_impl;

pub use filestore_impl::FileStoreDatabase;
