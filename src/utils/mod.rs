// src/utils/mod.rs
pub mod gdal_ext;
pub mod stats;

pub use gdal_ext::TypedBuffer;
