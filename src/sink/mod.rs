//! Output sinks. The local sink keeps the nested bundle, the cloud sink the flattened table.

pub mod azure;
pub mod cloud;
pub mod local;

pub use azure::AzureBlobStore;
pub use cloud::{blob_path, CloudSink};
pub use local::LocalSink;
