//! Debounced preview rendering.
//!
//! Each [`PreviewScheduler::trigger`] restarts the quiet period; only the
//! last document of a burst is rendered. Published previews are PDF files in
//! the preview directory, and a file is removed as soon as a newer preview
//! replaces it.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::DEFAULT_DEBOUNCE_MS;
use crate::error::RenderError;
use crate::render::{DocumentRenderer, PdfRenderer, PlanDocument};

/// A published preview file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHandle {
    pub generation: u64,
    pub path: PathBuf,
}

pub struct PreviewScheduler {
    inner: Arc<Inner>,
    debounce: Duration,
}

struct Inner {
    renderer: PdfRenderer,
    directory: PathBuf,
    generation: AtomicU64,
    renders: AtomicU64,
    closed: AtomicBool,
    pending: Mutex<Option<JoinHandle<()>>>,
    last_error: Mutex<Option<String>>,
    published: watch::Sender<Option<PreviewHandle>>,
}

impl PreviewScheduler {
    /// Scheduler with the default 800 ms quiet period.
    pub fn new(renderer: PdfRenderer, directory: impl Into<PathBuf>) -> Self {
        Self::with_debounce(
            renderer,
            directory,
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        )
    }

    pub fn with_debounce(
        renderer: PdfRenderer,
        directory: impl Into<PathBuf>,
        debounce: Duration,
    ) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                renderer,
                directory: directory.into(),
                generation: AtomicU64::new(0),
                renders: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                pending: Mutex::new(None),
                last_error: Mutex::new(None),
                published,
            }),
            debounce,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn directory(&self) -> &Path {
        &self.inner.directory
    }

    /// Schedule a render of `document` after the quiet period, replacing any
    /// render that has not started yet. Must be called inside a tokio runtime.
    pub fn trigger(&self, document: PlanDocument) -> u64 {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self.inner.closed.load(Ordering::SeqCst) {
            return generation;
        }

        let inner = Arc::clone(&self.inner);
        let debounce = self.debounce;
        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // Past this point the render runs to completion even if retriggered.
            tokio::spawn(render_and_publish(inner, generation, document));
        });

        if let Some(previous) = self.inner.pending.lock().replace(task) {
            previous.abort();
        }
        tracing::trace!(generation, "preview scheduled");
        generation
    }

    /// The most recently published preview.
    pub fn current(&self) -> Option<PreviewHandle> {
        self.inner.published.borrow().clone()
    }

    /// Receiver notified on every publish and revoke.
    pub fn subscribe(&self) -> watch::Receiver<Option<PreviewHandle>> {
        self.inner.published.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().clone()
    }

    /// Number of renders that actually ran.
    pub fn render_count(&self) -> u64 {
        self.inner.renders.load(Ordering::SeqCst)
    }

    /// Cancel pending work and revoke the current preview file.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Some(pending) = self.inner.pending.lock().take() {
            pending.abort();
        }
        let previous = self.inner.published.send_replace(None);
        if let Some(handle) = previous {
            revoke(&handle);
        }
    }
}

impl Drop for PreviewScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn render_and_publish(inner: Arc<Inner>, generation: u64, document: PlanDocument) {
    let worker = Arc::clone(&inner);
    let outcome =
        tokio::task::spawn_blocking(move || render_to_file(&worker, generation, &document)).await;

    match outcome {
        Ok(Ok(Some(handle))) => {
            tracing::debug!(generation, path = %handle.path.display(), "preview published");
        }
        Ok(Ok(None)) => {
            tracing::debug!(generation, "preview superseded before publish");
        }
        Ok(Err(err)) => {
            tracing::warn!(generation, error = %err, "preview render failed");
            *inner.last_error.lock() = Some(err.to_string());
        }
        Err(err) => {
            tracing::warn!(generation, error = %err, "preview task failed");
            *inner.last_error.lock() = Some(RenderError::Task(err.to_string()).to_string());
        }
    }
}

fn render_to_file(
    inner: &Inner,
    generation: u64,
    document: &PlanDocument,
) -> Result<Option<PreviewHandle>, RenderError> {
    inner.renders.fetch_add(1, Ordering::SeqCst);
    let bytes = inner.renderer.render(document)?;

    std::fs::create_dir_all(&inner.directory)?;
    let path = inner.directory.join(format!("preview-{generation}.pdf"));

    let mut published = None;
    let mut previous = None;
    inner.published.send_if_modified(|current| {
        let newer = current
            .as_ref()
            .is_none_or(|handle| handle.generation < generation);
        if !newer || inner.closed.load(Ordering::SeqCst) {
            return false;
        }
        if let Err(err) = std::fs::write(&path, &bytes) {
            *inner.last_error.lock() = Some(RenderError::Io(err).to_string());
            return false;
        }
        let handle = PreviewHandle {
            generation,
            path: path.clone(),
        };
        previous = current.replace(handle.clone());
        published = Some(handle);
        true
    });

    if let Some(old) = previous {
        revoke(&old);
    }
    if published.is_some() {
        *inner.last_error.lock() = None;
    }
    Ok(published)
}

fn revoke(handle: &PreviewHandle) {
    if let Err(err) = std::fs::remove_file(&handle.path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %handle.path.display(), error = %err, "failed to remove preview file");
        }
    }
}
