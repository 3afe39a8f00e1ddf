use super::{InferenceBackend, InferenceOutput};
use anyhow::Context;
use ndarray::ArrayViewD;
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl ExecutionProvider {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "cpu" => Ok(ExecutionProvider::Cpu),
            "cuda" | "gpu" => Ok(ExecutionProvider::Cuda),
            other => Err(format!(
                "{} is not a supported execution provider. Use either `cpu` or `cuda`.",
                other
            )),
        }
    }
}

/// How to open a session and which tensors to exchange with it.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub provider: ExecutionProvider,
    pub intra_threads: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            provider: ExecutionProvider::Cpu,
            intra_threads: 4,
        }
    }
}

pub struct OrtBackend {
    session: Session,
    input_name: String,
    output_names: Vec<String>,
}

impl OrtBackend {
    pub fn load(
        path: &Path,
        input_name: &str,
        output_names: &[&str],
        options: &SessionOptions,
    ) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(options.intra_threads)?;

        match options.provider {
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::debug!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("failed to load ONNX model from {}", path.display()))?;

        tracing::info!(path = %path.display(), "Model loaded");
        Ok(Self {
            session,
            input_name: input_name.to_string(),
            output_names: output_names.iter().map(|name| name.to_string()).collect(),
        })
    }
}

impl InferenceBackend for OrtBackend {
    fn infer(&mut self, input: ArrayViewD<'_, f32>) -> anyhow::Result<InferenceOutput> {
        let outputs = self.session.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(input)?
        ])?;

        self.output_names
            .iter()
            .map(|name| {
                let tensor = outputs
                    .get(name.as_str())
                    .with_context(|| format!("model produced no output named {name}"))?;
                Ok(tensor.try_extract_array::<f32>()?.into_owned())
            })
            .collect()
    }
}
