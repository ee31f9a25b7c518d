//! Backend abstraction.
//!
//! The pipeline is a single-threaded, synchronous run and trains on the
//! portable NdArray CPU backend. Training wraps it in `Autodiff` for
//! gradient tracking; validation and export use the inner backend.

use burn::backend::Autodiff;

/// The default inference backend
pub type DefaultBackend = burn_ndarray::NdArray<f32>;

/// The default autodiff backend for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Get the default device
pub fn default_device() -> <DefaultBackend as burn::tensor::backend::Backend>::Device {
    burn_ndarray::NdArrayDevice::default()
}

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    "NdArray (CPU)"
}
