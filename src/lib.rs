//! Conversion of mesh simulation datasets into per-timestep VTK files.
//!
//! The conversion is a linear pipeline:
//!
//! 1. [`dataset::Dataset`] opens one split of a dataset and yields its samples,
//! 2. [`materialize::materialize`] buffers every field of every sample in memory,
//! 3. [`writer::write`] writes one tetrahedral mesh per instance and timestep.
//!
//! [`pipeline::convert`] runs all three from a [`config::ConversionConfig`].

pub mod config;
pub mod connectivity;
pub mod dataset;
pub mod error;
pub mod field;
pub mod io;
pub mod materialize;
pub mod mesh;
pub mod pipeline;
pub mod progress;
pub mod writer;

pub use error::ConversionError;

pub extern crate nalgebra;
pub extern crate ndarray;
pub extern crate vtkio;
