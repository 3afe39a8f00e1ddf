pub mod backend;
pub mod catalog;
pub mod classes;
pub mod detection;
pub mod detector;
pub mod dispatcher;
pub mod error;
pub mod normalize;
pub mod processing;
pub mod registry;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use catalog::{ModelSpec, default_catalog};
pub use detection::{Detection, DetectionOutcome, ModelDescriptor, ModelKind};
pub use detector::{Detector, TransformerDetector, YoloDetector};
pub use dispatcher::Dispatcher;
pub use error::DetectError;
pub use registry::{RegisteredModel, Registry};

#[cfg(feature = "ort-backend")]
pub use registry::LoadOptions;
