//! Single-slot model cache.
//!
//! Holds at most one loaded [`EngineHandle`], keyed by the identifier it was
//! requested under.  Asking for the same identifier again is free; asking
//! for a different one releases the current handle before loading the next,
//! so two models are never resident at once.
//!
//! The cache is owned by the worker; nothing else mutates it.

use std::sync::Arc;

use crate::stt::{EngineHandle, ModelLoadError, ModelLoader};

pub struct ModelCache {
    loader: Arc<dyn ModelLoader>,
    entry: Option<(String, Arc<dyn EngineHandle>)>,
}

impl ModelCache {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            entry: None,
        }
    }

    /// Identifier of the cached model, if any.
    pub fn loaded_model(&self) -> Option<&str> {
        self.entry.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn is_loaded(&self, model_id: &str) -> bool {
        self.loaded_model() == Some(model_id)
    }

    /// Return a handle for `model_id`, loading it only when the cache holds
    /// nothing or a different model.
    ///
    /// On failure the cache is left empty and the error is returned as-is;
    /// there is no retry.
    pub async fn ensure(&mut self, model_id: &str) -> Result<Arc<dyn EngineHandle>, ModelLoadError> {
        if let Some((id, handle)) = &self.entry {
            if id == model_id {
                log::debug!("model-cache: {model_id} already loaded, skipping reload");
                return Ok(Arc::clone(handle));
            }
        }

        if let Some((old, _)) = self.entry.take() {
            log::info!("model-cache: releasing '{old}' before loading '{model_id}'");
        }

        log::info!("model-cache: loading '{model_id}'");
        match self.loader.load(model_id).await {
            Ok(handle) => {
                self.entry = Some((model_id.to_string(), Arc::clone(&handle)));
                Ok(handle)
            }
            Err(e) => {
                log::warn!("model-cache: {e}");
                Err(e)
            }
        }
    }

    /// Drop the cached handle.
    pub fn clear(&mut self) {
        if let Some((id, _)) = self.entry.take() {
            log::info!("model-cache: released '{id}'");
        }
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("loaded_model", &self.loaded_model())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::{EngineError, EngineRequest, TranscriptionResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Handle that counts its own drops.
    struct TrackedHandle {
        id: String,
        released: Arc<AtomicUsize>,
    }

    impl Drop for TrackedHandle {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl EngineHandle for TrackedHandle {
        fn model_id(&self) -> &str {
            &self.id
        }

        fn run(&self, _request: &EngineRequest) -> Result<TranscriptionResult, EngineError> {
            Ok(TranscriptionResult::default())
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        loads: AtomicUsize,
        released: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ModelLoader for CountingLoader {
        async fn load(&self, model_id: &str) -> Result<Arc<dyn EngineHandle>, ModelLoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if model_id == "broken" {
                return Err(ModelLoadError::new(model_id, "checksum mismatch"));
            }
            Ok(Arc::new(TrackedHandle {
                id: model_id.to_string(),
                released: Arc::clone(&self.released),
            }))
        }
    }

    fn cache() -> (ModelCache, Arc<CountingLoader>) {
        let loader = Arc::new(CountingLoader::default());
        (ModelCache::new(loader.clone()), loader)
    }

    #[tokio::test]
    async fn same_identifier_loads_once() {
        let (mut cache, loader) = cache();

        let a = cache.ensure("small").await.unwrap();
        let b = cache.ensure("small").await.unwrap();

        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.loaded_model(), Some("small"));
    }

    #[tokio::test]
    async fn different_identifier_reloads_and_releases_previous() {
        let (mut cache, loader) = cache();

        drop(cache.ensure("small").await.unwrap());
        let medium = cache.ensure("medium").await.unwrap();

        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        assert_eq!(loader.released.load(Ordering::SeqCst), 1, "old handle must be dropped");
        assert_eq!(medium.model_id(), "medium");
        assert!(cache.is_loaded("medium"));
    }

    #[tokio::test]
    async fn failed_load_leaves_cache_empty() {
        let (mut cache, loader) = cache();
        drop(cache.ensure("small").await.unwrap());

        let err = cache.ensure("broken").await.err().unwrap();

        assert_eq!(err.model, "broken");
        assert!(cache.loaded_model().is_none());
        assert_eq!(loader.released.load(Ordering::SeqCst), 1);
        // No automatic retry.
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn load_after_failure_works() {
        let (mut cache, loader) = cache();
        assert!(cache.ensure("broken").await.is_err());

        cache.ensure("tiny").await.unwrap();
        assert_eq!(cache.loaded_model(), Some("tiny"));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn clear_releases_handle() {
        let (mut cache, loader) = cache();
        drop(cache.ensure("base").await.unwrap());

        cache.clear();
        assert!(cache.loaded_model().is_none());
        assert_eq!(loader.released.load(Ordering::SeqCst), 1);
    }
}
