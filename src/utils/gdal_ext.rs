// src/utils/gdal_ext.rs
use std::borrow::Cow;

use gdal::raster::Buffer;

use crate::error::{Error, Result};

/// A GDAL buffer tagged with its pixel type
#[derive(Debug, Clone)]
pub enum TypedBuffer {
    U8(Buffer<u8>),
    F32(Buffer<f32>),
    F64(Buffer<f64>),
}

impl TypedBuffer {
    /// (width, height) of the buffer
    pub fn shape(&self) -> (usize, usize) {
        match self {
            TypedBuffer::U8(b) => b.shape(),
            TypedBuffer::F32(b) => b.shape(),
            TypedBuffer::F64(b) => b.shape(),
        }
    }

    pub fn len(&self) -> usize {
        let (w, h) = self.shape();
        w * h
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// GDAL name of the pixel type, as printed in band type listings
    pub fn type_name(&self) -> &'static str {
        match self {
            TypedBuffer::U8(_) => "Byte",
            TypedBuffer::F32(_) => "Float32",
            TypedBuffer::F64(_) => "Float64",
        }
    }

    pub fn as_u8(&self) -> Option<&Buffer<u8>> {
        match self {
            TypedBuffer::U8(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&Buffer<f32>> {
        match self {
            TypedBuffer::F32(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&Buffer<f64>> {
        match self {
            TypedBuffer::F64(b) => Some(b),
            _ => None,
        }
    }

    /// Floating-point view of the pixels. Float64 data is borrowed,
    /// Float32 is widened. Byte buffers hold class codes and are refused.
    pub fn values_f64(&self, operation: &'static str) -> Result<Cow<'_, [f64]>> {
        match self {
            TypedBuffer::F64(b) => Ok(Cow::Borrowed(b.data())),
            TypedBuffer::F32(b) => Ok(Cow::Owned(b.data().iter().map(|&v| v as f64).collect())),
            TypedBuffer::U8(_) => Err(Error::UnsupportedBufferType {
                operation,
                found: self.type_name(),
            }),
        }
    }
}
