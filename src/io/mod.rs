// src/io/mod.rs
pub mod aoi;
pub mod reader;
pub mod srs;
pub mod writer;

pub use aoi::Aoi;
pub use reader::{read_scene, GeoInfo};
pub use writer::write_composite;
