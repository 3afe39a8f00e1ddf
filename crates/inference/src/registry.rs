use crate::detection::{Detection, ModelDescriptor};
use crate::detector::Detector;
use crate::error::DetectError;
use anyhow::bail;
use image::RgbImage;
use std::collections::HashMap;
use std::sync::Mutex;

#[cfg(feature = "ort-backend")]
pub use self::loading::LoadOptions;

/// A ready-to-use model. The detector sits behind a mutex so one call at a
/// time reaches its session.
pub struct RegisteredModel {
    descriptor: ModelDescriptor,
    detector: Mutex<Box<dyn Detector>>,
}

impl RegisteredModel {
    pub fn new(descriptor: ModelDescriptor, detector: Box<dyn Detector>) -> Self {
        Self {
            descriptor,
            detector: Mutex::new(detector),
        }
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectError> {
        // Detectors keep no state between calls, so a panic mid-call leaves
        // nothing half-written behind the lock.
        let mut detector = self.detector.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(
                model = %self.descriptor.name,
                "Recovering model after a panic in a previous call"
            );
            self.detector.clear_poison();
            poisoned.into_inner()
        });
        detector.detect(image)
    }
}

/// Every model loaded at startup, in listing order. Immutable once built.
pub struct Registry {
    models: Vec<RegisteredModel>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn from_detectors(
        entries: Vec<(ModelDescriptor, Box<dyn Detector>)>,
    ) -> anyhow::Result<Self> {
        let mut models = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());

        for (descriptor, detector) in entries {
            if detector.kind() != descriptor.kind {
                bail!(
                    "model {} is registered as {:?} but its detector is {:?}",
                    descriptor.name,
                    descriptor.kind,
                    detector.kind()
                );
            }
            if index.insert(descriptor.name.clone(), models.len()).is_some() {
                bail!("model {} is registered twice", descriptor.name);
            }
            models.push(RegisteredModel::new(descriptor, detector));
        }

        Ok(Self { models, index })
    }

    pub fn list(&self) -> Vec<ModelDescriptor> {
        self.models.iter().map(|m| m.descriptor.clone()).collect()
    }

    pub fn resolve(&self, name: &str) -> Result<&RegisteredModel, DetectError> {
        self.index
            .get(name)
            .map(|&i| &self.models[i])
            .ok_or_else(|| DetectError::UnknownModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(feature = "ort-backend")]
mod loading {
    use super::Registry;
    use crate::backend::ort::{OrtBackend, SessionOptions};
    use crate::catalog::{InputGeometry, ModelSpec};
    use crate::detector::{
        DEFAULT_SCORE_THRESHOLD, Detector, TRANSFORMER_INPUT, TRANSFORMER_OUTPUTS,
        TransformerDetector, YOLO_INPUT, YOLO_OUTPUTS, YoloDetector,
    };
    use anyhow::{Context, ensure};
    use std::path::Path;
    use std::time::Instant;

    #[derive(Debug, Clone)]
    pub struct LoadOptions {
        pub session: SessionOptions,
        /// Transformer score cutoff
        pub score_threshold: f32,
    }

    impl Default for LoadOptions {
        fn default() -> Self {
            Self {
                session: SessionOptions::default(),
                score_threshold: DEFAULT_SCORE_THRESHOLD,
            }
        }
    }

    impl Registry {
        /// Loads every model eagerly. Any failure aborts the whole load.
        pub fn load(
            specs: &[ModelSpec],
            model_dir: &Path,
            options: &LoadOptions,
        ) -> anyhow::Result<Self> {
            ensure!(!specs.is_empty(), "no models configured");

            let mut entries = Vec::with_capacity(specs.len());
            for spec in specs {
                let start = Instant::now();
                let detector = load_detector(spec, model_dir, options)
                    .with_context(|| format!("failed to load model {}", spec.name))?;
                tracing::info!(
                    model = spec.name,
                    kind = spec.kind().as_str(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Model ready"
                );
                entries.push((spec.descriptor(), detector));
            }

            Registry::from_detectors(entries)
        }
    }

    fn load_detector(
        spec: &ModelSpec,
        model_dir: &Path,
        options: &LoadOptions,
    ) -> anyhow::Result<Box<dyn Detector>> {
        let path = model_dir.join(spec.file);
        ensure!(path.is_file(), "model file {} not found", path.display());

        match spec.geometry {
            InputGeometry::Letterbox { size } => {
                let backend = OrtBackend::load(&path, YOLO_INPUT, &YOLO_OUTPUTS, &options.session)?;
                Ok(Box::new(YoloDetector::new(backend, size)))
            }
            InputGeometry::ShortestEdge { shortest, longest } => {
                let backend = OrtBackend::load(
                    &path,
                    TRANSFORMER_INPUT,
                    &TRANSFORMER_OUTPUTS,
                    &options.session,
                )?;
                Ok(Box::new(TransformerDetector::new(
                    backend,
                    shortest,
                    longest,
                    options.score_threshold,
                )))
            }
        }
    }
}
