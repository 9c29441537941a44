use tracing::info;

use crate::error::Result;
use crate::gpu;
use crate::imaging::{DiffusionBackend, DiffusionPipeline, GenerationMode};

/// Holds at most one loaded model variant
///
/// Asking for a different mode drops the current pipeline before the new
/// one is loaded, so the two variants never share GPU memory. Dropping the
/// slot drops whatever it holds.
pub struct ModelSlot<'a> {
    backend: &'a dyn DiffusionBackend,
    current: Option<Box<dyn DiffusionPipeline>>,
    loads: usize,
}

impl<'a> ModelSlot<'a> {
    pub fn new(backend: &'a dyn DiffusionBackend) -> Self {
        Self {
            backend,
            current: None,
            loads: 0,
        }
    }

    /// Mode of the loaded pipeline, if any
    pub fn mode(&self) -> Option<GenerationMode> {
        self.current.as_ref().map(|p| p.mode())
    }

    /// Number of times a variant was loaded
    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Make sure the `mode` variant is loaded and return it
    pub async fn ensure(&mut self, mode: GenerationMode) -> Result<&dyn DiffusionPipeline> {
        let pipeline = match self.current.take() {
            Some(pipeline) if pipeline.mode() == mode => pipeline,
            previous => {
                info!("Switching pipeline to: {}", mode);
                if let Some(previous) = previous {
                    drop(previous);
                    info!("Previous pipeline released.");
                }

                let pipeline = self.backend.load(mode).await?;
                self.loads += 1;
                gpu::log_memory_usage(&format!("[{} loaded]", mode)).await;
                pipeline
            }
        };

        Ok(&**self.current.insert(pipeline))
    }

    /// Drop the loaded pipeline and report memory
    pub async fn release(&mut self) {
        if let Some(pipeline) = self.current.take() {
            let mode = pipeline.mode();
            drop(pipeline);
            gpu::log_memory_usage(&format!("[{} released]", mode)).await;
            info!("{} pipeline released.", mode);
        }
    }
}
