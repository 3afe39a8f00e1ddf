use ndarray::{ArrayD, ArrayViewD};

#[cfg(feature = "ort-backend")]
pub mod ort;

/// Graph outputs in the order the backend was configured with.
pub type InferenceOutput = Vec<ArrayD<f32>>;

/// Executes a loaded model graph on an NCHW input tensor.
///
/// Implementations are not required to be reentrant: callers hold exclusive
/// access for the duration of a call.
pub trait InferenceBackend: Send {
    fn infer(&mut self, input: ArrayViewD<'_, f32>) -> anyhow::Result<InferenceOutput>;
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    fn infer(&mut self, input: ArrayViewD<'_, f32>) -> anyhow::Result<InferenceOutput> {
        (**self).infer(input)
    }
}
