use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

pub mod filter;
pub mod photo;
pub mod sort;
pub mod source;

pub use filter::{FilterSpec, LocationPredicate, Near};
pub use photo::{
    canonical_uuid, CameraRollPhoto, MediaSubtype, MediaType, Position, RawPhotoRecord,
    RenderHandle, RenderState,
};
pub use sort::{SortKey, SortSpec, SortValue};
pub use source::{
    photo_source_for, JsonPhotoSource, PhotoQuery, PhotoSource, UnavailablePhotoSource,
};

use crate::error::{RollError, RollResult};
use filter::FilterPass;

/// Page size used when the caller has no preference.
pub const DEFAULT_PAGE_SIZE: usize = 10;

type PhotoSet = Arc<Vec<CameraRollPhoto>>;
type SharedFetch = Shared<BoxFuture<'static, RollResult<PhotoSet>>>;

#[derive(Default)]
struct RollState {
    photos: PhotoSet,
    filter: FilterSpec,
    filtered_photos: Option<Vec<CameraRollPhoto>>,
    in_flight: Option<(u64, SharedFetch)>,
    generation: u64,
    applied_generation: u64,
}

/// The device camera roll with location-aware filtering.
///
/// Clones share the same photo set, filter and in-flight fetch. At most one
/// fetch per roll is pending at a time; concurrent `query_photos` calls join it.
#[derive(Clone)]
pub struct CameraRollWithLoc {
    source: Arc<dyn PhotoSource>,
    state: Arc<Mutex<RollState>>,
}

impl CameraRollWithLoc {
    pub fn new(source: Arc<dyn PhotoSource>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(RollState::default())),
        }
    }

    /// A roll that starts out with `records` already loaded.
    pub fn with_photos(source: Arc<dyn PhotoSource>, records: Vec<RawPhotoRecord>) -> Self {
        let photos: Vec<CameraRollPhoto> =
            records.into_iter().map(CameraRollPhoto::from_raw).collect();
        let state = RollState {
            photos: Arc::new(photos),
            ..Default::default()
        };
        Self {
            source,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Sorted copy of `photos` on the first `SortSpec`; ascending `dateTaken` when none is given.
    pub fn sorted(photos: &[CameraRollPhoto], options: &[SortSpec]) -> Vec<CameraRollPhoto> {
        let sort = options
            .first()
            .copied()
            .unwrap_or_else(|| SortSpec::ascending(SortKey::DateTaken));
        let mut sorted = photos.to_vec();
        sort::sort_by_spec(&mut sorted, &sort);
        sorted
    }

    fn lock_state(&self) -> RollResult<MutexGuard<'_, RollState>> {
        self.state
            .lock()
            .map_err(|_| RollError::Poisoned("camera roll"))
    }

    /// Fetches photos from the source, reusing the cached set by default.
    ///
    /// * nothing pending, photos loaded, no `options`, `force == false`: cached set.
    /// * a fetch pending and no `options`/`force`: the pending fetch is joined and
    ///   every caller gets the same `Arc`.
    /// * otherwise a new fetch starts and replaces the photo set when it lands.
    ///
    /// Must be called from within a Tokio runtime. The fetch runs to completion
    /// even if every caller stops waiting for it.
    pub async fn query_photos(
        &self,
        options: Option<PhotoQuery>,
        force: bool,
    ) -> RollResult<PhotoSet> {
        let fetch = {
            let mut state = self.lock_state()?;
            let overridden = options.is_some() || force;
            let pending = match &state.in_flight {
                Some((generation, fetch)) if !overridden => Some((*generation, fetch.clone())),
                _ => None,
            };

            match pending {
                Some((generation, fetch)) => {
                    debug!("Joining pending photo fetch #{}", generation);
                    fetch
                }
                None if !overridden && !state.photos.is_empty() => {
                    debug!("Using {} cached photos", state.photos.len());
                    return Ok(Arc::clone(&state.photos));
                }
                None => self.start_fetch(&mut state, options.unwrap_or_default()),
            }
        };

        fetch.await
    }

    fn start_fetch(&self, state: &mut RollState, query: PhotoQuery) -> SharedFetch {
        state.generation += 1;
        let generation = state.generation;
        let query = query.resolved();
        let source = Arc::clone(&self.source);
        let roll_state = Arc::downgrade(&self.state);

        info!(
            "Fetching photos from {} source (fetch #{})",
            source.name(),
            generation
        );

        let task = {
            let roll_state = roll_state.clone();
            tokio::spawn(async move {
                let result = source.fetch(&query).await.map(|records| {
                    records
                        .into_iter()
                        .map(CameraRollPhoto::from_raw)
                        .collect::<Vec<_>>()
                });
                finish_fetch(&roll_state, generation, result)
            })
        };

        let fetch = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Photo fetch #{} did not complete: {}", generation, e);
                    let failed = Err(RollError::SourceUnavailable(e.to_string()));
                    finish_fetch(&roll_state, generation, failed)
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight = Some((generation, fetch.clone()));
        fetch
    }

    /// Recomputes the filtered view.
    ///
    /// With `replace == true` the options are merged into the current filter
    /// (field-wise overwrite); with `false` they replace it wholesale.
    pub fn filter_photos(&self, options: FilterSpec, replace: bool) -> RollResult<&Self> {
        let mut guard = self.lock_state()?;
        let state = &mut *guard;

        if replace {
            state.filter.merge(options);
        } else {
            state.filter = options;
        }

        let pass = FilterPass::new(&state.filter);
        let filtered: Vec<CameraRollPhoto> = state
            .photos
            .iter()
            .filter(|photo| pass.accepts(photo))
            .cloned()
            .collect();

        debug!(
            "Filter kept {} of {} photos",
            filtered.len(),
            state.photos.len()
        );
        state.filtered_photos = Some(filtered);
        Ok(self)
    }

    /// Sorts the filtered view on the first `SortSpec`; descending `dateTaken` when none
    /// is given. Without a prior filter the whole photo set is sorted into the view.
    pub fn sort_photos(&self, options: &[SortSpec]) -> RollResult<&Self> {
        let sort = options
            .first()
            .copied()
            .unwrap_or_else(|| SortSpec::descending(SortKey::DateTaken));

        let mut guard = self.lock_state()?;
        let state = &mut *guard;
        let view = state
            .filtered_photos
            .get_or_insert_with(|| state.photos.as_ref().clone());
        sort::sort_by_spec(view, &sort);
        Ok(self)
    }

    /// Up to `limit` photos from the filtered view, or from the full set when no
    /// filter has run.
    pub fn get_photos(&self, limit: usize) -> RollResult<Vec<CameraRollPhoto>> {
        let state = self.lock_state()?;
        let result: &[CameraRollPhoto] = match &state.filtered_photos {
            Some(filtered) => filtered,
            None => &state.photos,
        };

        if result.is_empty() {
            warn!("CameraRoll: no photos found. check query/filter");
        }
        Ok(result.iter().take(limit).cloned().collect())
    }

    pub fn filter(&self) -> RollResult<FilterSpec> {
        Ok(self.lock_state()?.filter.clone())
    }

    /// Number of photos in the last fetched set.
    pub fn len(&self) -> usize {
        self.lock_state().map(|s| s.photos.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_fetching(&self) -> bool {
        self.lock_state()
            .map(|s| s.in_flight.is_some())
            .unwrap_or(false)
    }
}

/// Clears the in-flight marker if it still belongs to `generation` and installs
/// the fetched photos unless a newer fetch already landed.
fn finish_fetch(
    state: &Weak<Mutex<RollState>>,
    generation: u64,
    result: RollResult<Vec<CameraRollPhoto>>,
) -> RollResult<PhotoSet> {
    let state = match state.upgrade() {
        Some(state) => state,
        None => return result.map(Arc::new),
    };
    let mut state = state
        .lock()
        .map_err(|_| RollError::Poisoned("camera roll"))?;

    if matches!(state.in_flight, Some((pending, _)) if pending == generation) {
        state.in_flight = None;
    }

    let photos = match result {
        Ok(photos) => Arc::new(photos),
        Err(e) => {
            error!("Photo fetch #{} failed: {}", generation, e);
            return Err(e);
        }
    };

    if generation > state.applied_generation {
        state.applied_generation = generation;
        state.photos = Arc::clone(&photos);
        info!("Loaded {} photos (fetch #{})", photos.len(), generation);
    } else {
        debug!(
            "Fetch #{} superseded by #{}, keeping newer photos",
            generation, state.applied_generation
        );
    }
    Ok(photos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::GeoJsonPoint;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSource {
        calls: AtomicUsize,
        records: Vec<RawPhotoRecord>,
        delay: Duration,
    }

    impl CountingSource {
        fn new(records: Vec<RawPhotoRecord>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                records,
                delay: Duration::from_millis(20),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PhotoSource for CountingSource {
        async fn fetch(&self, _query: &PhotoQuery) -> RollResult<Vec<RawPhotoRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.records.clone())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn record(uuid: &str, local_time: &str, lon: f64, lat: f64) -> RawPhotoRecord {
        RawPhotoRecord {
            uuid: uuid.to_string(),
            filename: format!("{}.jpg", uuid),
            location: Some(json!({"type": "Point", "coordinates": [lon, lat]})),
            date_taken: local_time.replace(' ', "T"),
            local_time: local_time.to_string(),
            media_type: MediaType::Image,
            ..Default::default()
        }
    }

    fn records() -> Vec<RawPhotoRecord> {
        vec![
            record("a", "2016-01-10 10:00:00.000", -122.0862515, 37.4220041),
            record("b", "2016-03-10 10:00:00.000", 2.2945, 48.8584),
            record("c", "2016-02-10 10:00:00.000", -122.0860, 37.4221),
        ]
    }

    fn uuids(photos: &[CameraRollPhoto]) -> Vec<&str> {
        photos.iter().map(|p| p.uuid.as_str()).collect()
    }

    #[tokio::test]
    async fn test_query_then_cached() {
        let source = CountingSource::new(records());
        let roll = CameraRollWithLoc::new(source.clone());
        assert!(roll.is_empty());

        let first = roll.query_photos(None, false).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(source.calls(), 1);
        assert!(!roll.is_fetching());

        let second = roll.query_photos(None, false).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_force_and_options_refetch() {
        let source = CountingSource::new(records());
        let roll = CameraRollWithLoc::new(source.clone());

        roll.query_photos(None, false).await.unwrap();
        roll.query_photos(None, true).await.unwrap();
        roll.query_photos(Some(PhotoQuery::default()), false)
            .await
            .unwrap();
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_queries_coalesce() {
        let source = CountingSource::new(records());
        let roll = CameraRollWithLoc::new(source.clone());

        let (a, b) = tokio::join!(
            roll.query_photos(None, false),
            roll.query_photos(None, false)
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_fetch_completes_when_caller_gives_up() {
        let source = CountingSource::new(records());
        let roll = CameraRollWithLoc::new(source.clone());

        let abandoned = tokio::time::timeout(
            Duration::from_millis(1),
            roll.query_photos(None, false),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(roll.len(), 3);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_source_unavailable_is_surfaced() {
        let roll = CameraRollWithLoc::new(Arc::new(UnavailablePhotoSource));
        let result = roll.query_photos(None, false).await;

        assert!(matches!(result, Err(RollError::SourceUnavailable(_))));
        assert!(!roll.is_fetching());
        assert!(roll.is_empty());
    }

    #[test]
    fn test_get_photos_without_filter_uses_all() {
        let roll = CameraRollWithLoc::with_photos(Arc::new(UnavailablePhotoSource), records());
        assert_eq!(uuids(&roll.get_photos(2).unwrap()), vec!["a", "b"]);
        assert_eq!(roll.get_photos(DEFAULT_PAGE_SIZE).unwrap().len(), 3);
    }

    #[test]
    fn test_filter_merge_vs_replace() {
        let roll = CameraRollWithLoc::with_photos(Arc::new(UnavailablePhotoSource), records());
        let near = Near {
            point: GeoJsonPoint::new(-122.0862515, 37.4220041),
            distance_meters: 500.0,
        };

        roll.filter_photos(
            FilterSpec {
                near: Some(near),
                ..Default::default()
            },
            true,
        )
        .unwrap();
        assert_eq!(uuids(&roll.get_photos(10).unwrap()), vec!["a", "c"]);

        // merged: near is kept alongside the new media type
        roll.filter_photos(
            FilterSpec {
                media_types: Some(vec![MediaType::Image]),
                ..Default::default()
            },
            true,
        )
        .unwrap();
        assert!(roll.filter().unwrap().near.is_some());
        assert_eq!(roll.get_photos(10).unwrap().len(), 2);

        // replaced: near is gone
        roll.filter_photos(
            FilterSpec {
                media_types: Some(vec![MediaType::Image]),
                ..Default::default()
            },
            false,
        )
        .unwrap();
        assert!(roll.filter().unwrap().near.is_none());
        assert_eq!(roll.get_photos(10).unwrap().len(), 3);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let roll = CameraRollWithLoc::with_photos(Arc::new(UnavailablePhotoSource), records());
        let filter = FilterSpec {
            media_types: Some(vec![MediaType::Image]),
            near: Some(Near {
                point: GeoJsonPoint::new(-122.0862515, 37.4220041),
                distance_meters: 500.0,
            }),
            ..Default::default()
        };

        let first = roll
            .filter_photos(filter.clone(), true)
            .unwrap()
            .get_photos(10)
            .unwrap();
        let second = roll
            .filter_photos(filter, true)
            .unwrap()
            .get_photos(10)
            .unwrap();
        assert_eq!(uuids(&first), uuids(&second));
        assert_eq!(uuids(&first), vec!["a", "c"]);
    }

    #[test]
    fn test_sort_default_directions() {
        let photos: Vec<CameraRollPhoto> =
            records().into_iter().map(CameraRollPhoto::from_raw).collect();
        assert_eq!(
            uuids(&CameraRollWithLoc::sorted(&photos, &[])),
            vec!["a", "c", "b"]
        );

        let roll = CameraRollWithLoc::with_photos(Arc::new(UnavailablePhotoSource), records());
        let newest_first = roll
            .filter_photos(FilterSpec::default(), true)
            .unwrap()
            .sort_photos(&[])
            .unwrap()
            .get_photos(10)
            .unwrap();
        assert_eq!(uuids(&newest_first), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_sort_only_first_spec_counts() {
        let roll = CameraRollWithLoc::with_photos(Arc::new(UnavailablePhotoSource), records());
        let photos = roll
            .sort_photos(&[
                SortSpec::ascending(SortKey::Uuid),
                SortSpec::descending(SortKey::DateTaken),
            ])
            .unwrap()
            .get_photos(10)
            .unwrap();
        assert_eq!(uuids(&photos), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_get_photos_empty_filter_result() {
        let roll = CameraRollWithLoc::with_photos(Arc::new(UnavailablePhotoSource), records());
        let photos = roll
            .filter_photos(
                FilterSpec {
                    location_name: Some("Nowhere".to_string()),
                    ..Default::default()
                },
                true,
            )
            .unwrap()
            .get_photos(10)
            .unwrap();
        assert!(photos.is_empty());
    }
}
