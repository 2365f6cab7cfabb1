use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::camera_roll::{canonical_uuid, CameraRollPhoto, RenderHandle, RenderState};
use crate::error::{RollError, RollResult};
use crate::file_cache::{FileCache, FileCacheConfig};
use crate::file_store::FileStore;
use crate::local_time::local_time_display;

type Dimensions = (Option<u32>, Option<u32>);
type SharedResolve = Shared<BoxFuture<'static, RollResult<PathBuf>>>;
type InFlight = Arc<Mutex<HashMap<String, SharedResolve>>>;

/// Gives photos a local, renderable image path without blocking the caller.
///
/// `resolve` attaches a [`RenderHandle`] right away with an empty `src`; the path is
/// filled in by a background task once the file has been located or copied.
/// Resolves of an id that is already being resolved join the pending work.
pub struct ImageResolver {
    store: Arc<dyn FileStore>,
    cache: Arc<FileCache>,
    dimensions: Mutex<HashMap<String, Dimensions>>,
    in_flight: InFlight,
}

impl ImageResolver {
    pub fn new(store: Arc<dyn FileStore>, cache: Arc<FileCache>) -> Self {
        Self {
            store,
            cache,
            dimensions: Mutex::new(HashMap::new()),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Builds the file cache so that evicted ids are deleted from `store`.
    pub fn with_store(store: Arc<dyn FileStore>, config: FileCacheConfig) -> Self {
        let remover = Arc::clone(&store);
        let cache = FileCache::new(
            config,
            Arc::new(move |id: &str| {
                let runtime = Handle::try_current().map_err(|e| {
                    RollError::Io(format!("no runtime to remove {}: {}", id, e))
                })?;
                let store = Arc::clone(&remover);
                let id = id.to_string();
                runtime.spawn(async move {
                    if let Err(e) = store.remove(&id).await {
                        warn!("Failed to delete cached file for {}: {}", id, e);
                    }
                });
                Ok(())
            }),
        );
        Self::new(store, Arc::new(cache))
    }

    pub fn cache(&self) -> &Arc<FileCache> {
        &self.cache
    }

    /// Dimensions to render `id` with, recording them the first time it is seen.
    fn dimensions_for(&self, id: &str, requested: Dimensions) -> Dimensions {
        let mut dimensions = match self.dimensions.lock() {
            Ok(dimensions) => dimensions,
            Err(_) => {
                warn!("Failed to acquire dimensions lock");
                return requested;
            }
        };

        if self.cache.is_cached(id) {
            if let Some(recorded) = dimensions.get(id) {
                return *recorded;
            }
        } else if let Err(e) = self.cache.cache(id) {
            warn!("Failed to mark {} as cached: {}", id, e);
        }

        if dimensions.len() > self.cache.config().max {
            dimensions.retain(|known, _| self.cache.is_cached(known));
        }
        dimensions.insert(id.to_string(), requested);
        requested
    }

    /// Attaches a render descriptor to `photo` and starts resolving its local file.
    ///
    /// `width`/`height` default to the photo's own size. Must be called from within a
    /// Tokio runtime. The returned handle yields the path, or the error that left `src`
    /// empty; dropping it does not cancel the work.
    pub fn resolve(
        &self,
        photo: &mut CameraRollPhoto,
        width: Option<u32>,
        height: Option<u32>,
    ) -> JoinHandle<RollResult<PathBuf>> {
        let id = canonical_uuid(&photo.uuid).to_string();
        let requested = (width.or(Some(photo.width)), height.or(Some(photo.height)));
        let (width, height) = self.dimensions_for(&id, requested);

        let local_time = match local_time_display(&photo.local_time) {
            Ok(display) => Some(display),
            Err(e) => {
                debug!("No display time for {}: {}", id, e);
                None
            }
        };

        let render = RenderHandle::new(RenderState {
            src: String::new(),
            width,
            height,
            local_time,
        });
        photo.render = Some(render.clone());

        let pending = self.pending_or_start(&id);
        tokio::spawn(async move {
            let resolved = pending.await;
            if let Ok(path) = &resolved {
                render.set_src(path.display().to_string());
            }
            resolved
        })
    }

    /// The pending resolution of `id`, starting one when none is running.
    fn pending_or_start(&self, id: &str) -> SharedResolve {
        let mut in_flight = match self.in_flight.lock() {
            Ok(in_flight) => in_flight,
            Err(_) => {
                warn!("Failed to acquire image resolution lock");
                return futures::future::ready(Err(RollError::Poisoned("image resolution")))
                    .boxed()
                    .shared();
            }
        };

        if let Some(pending) = in_flight.get(id) {
            debug!("Joining pending image resolution for {}", id);
            return pending.clone();
        }

        let task = tokio::spawn(resolve_file(
            Arc::clone(&self.store),
            Arc::clone(&self.cache),
            Arc::clone(&self.in_flight),
            id.to_string(),
        ));
        let pending = async move {
            match task.await {
                Ok(resolved) => resolved,
                Err(e) => Err(RollError::CopyFailed(e.to_string())),
            }
        }
        .boxed()
        .shared();

        in_flight.insert(id.to_string(), pending.clone());
        pending
    }
}

/// Locates the file for `id`, copying it once when it is missing. On failure the
/// id is cleared from the file cache so a later attempt is not suppressed.
async fn resolve_file(
    store: Arc<dyn FileStore>,
    cache: Arc<FileCache>,
    in_flight: InFlight,
    id: String,
) -> RollResult<PathBuf> {
    let located = match store.locate(&id).await {
        Err(RollError::NotFound(_)) => store.materialize(&id).await,
        other => other,
    };

    if let Ok(mut in_flight) = in_flight.lock() {
        in_flight.remove(&id);
    }

    if let Err(e) = &located {
        warn!("Failed to resolve image for {}: {}", id, e);
        if let Err(clear_err) = cache.clear(&id) {
            warn!("Failed to clear {} from file cache: {}", id, clear_err);
        }
    }
    located
}
