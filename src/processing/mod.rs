// src/processing/mod.rs
pub mod composite;
pub mod indices;
pub mod mask;
pub mod parallel;

// Re-export main components
pub use composite::{CompositeRaster, TemporalCompositor};
pub use indices::SpectralIndices;
pub use mask::CloudMasker;
pub use parallel::{ParallelProcessor, SceneStages};
