//! Background dispatch of color-pipeline renders.
//!
//! Renders are CPU-bound, so each one runs on tokio's blocking pool. Every
//! submission gets a generation number; callers compare it against
//! [`RenderWorker::latest_generation`] to drop results a newer request has
//! superseded. The worker itself never cancels or suppresses a render.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glaze_core::{ColorPipeline, ImageId, PipelineError, RenderOutput, RenderRequest};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("render task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// The newest finished render seen so far.
#[derive(Debug, Clone)]
pub struct Published {
    pub generation: u64,
    pub output: RenderOutput,
}

/// Handle to one in-flight render.
#[derive(Debug)]
pub struct RenderTicket {
    generation: u64,
    handle: JoinHandle<Result<RenderOutput, PipelineError>>,
}

impl RenderTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the render to finish.
    pub async fn wait(self) -> Result<RenderOutput, WorkerError> {
        Ok(self.handle.await??)
    }
}

/// Runs renders of a shared [`ColorPipeline`] off the caller's thread.
#[derive(Debug)]
pub struct RenderWorker {
    pipeline: Arc<ColorPipeline>,
    runtime: Handle,
    generation: AtomicU64,
    published: Arc<watch::Sender<Option<Published>>>,
}

impl RenderWorker {
    pub fn new(pipeline: Arc<ColorPipeline>, runtime: Handle) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            pipeline,
            runtime,
            generation: AtomicU64::new(0),
            published: Arc::new(published),
        }
    }

    /// Worker bound to the runtime the caller is running on.
    pub fn current(pipeline: Arc<ColorPipeline>) -> Result<Self, WorkerError> {
        Ok(Self::new(pipeline, Handle::try_current()?))
    }

    pub fn pipeline(&self) -> &Arc<ColorPipeline> {
        &self.pipeline
    }

    /// Generation of the most recent submission (0 before any).
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// True if nothing was submitted after `generation`.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest_generation()
    }

    /// Receiver of the newest finished render. Older results that finish
    /// late never overwrite a newer one.
    pub fn subscribe(&self) -> watch::Receiver<Option<Published>> {
        self.published.subscribe()
    }

    /// Full render, bypassing the preview cache.
    pub fn submit(&self, request: RenderRequest) -> RenderTicket {
        self.dispatch(move |pipeline| pipeline.run_request(&request))
    }

    /// Preview render of base image `image_id` through the preview cache.
    pub fn submit_preview(&self, image_id: ImageId, request: RenderRequest) -> RenderTicket {
        self.dispatch(move |pipeline| pipeline.run_cached(image_id, &request))
    }

    fn dispatch<F>(&self, render: F) -> RenderTicket
    where
        F: FnOnce(&ColorPipeline) -> Result<RenderOutput, PipelineError> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let pipeline = Arc::clone(&self.pipeline);
        let published = Arc::clone(&self.published);

        tracing::debug!(generation, "render submitted");
        let handle = self.runtime.spawn_blocking(move || {
            let result = render(&pipeline);
            match &result {
                Ok(output) => {
                    published.send_if_modified(|slot| {
                        if slot.as_ref().is_some_and(|p| p.generation > generation) {
                            tracing::debug!(generation, "stale render not published");
                            return false;
                        }
                        *slot = Some(Published {
                            generation,
                            output: output.clone(),
                        });
                        true
                    });
                }
                Err(e) => tracing::warn!(generation, error = %e, "render rejected"),
            }
            result
        });

        RenderTicket { generation, handle }
    }
}
