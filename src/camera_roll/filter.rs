use chrono::NaiveDateTime;
use log::warn;
use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use super::photo::{CameraRollPhoto, MediaType};
use crate::gps_region::{CircularGpsRegion, GpsRegion};
use crate::local_time::local_time_as_date;
use crate::location::GeoJsonPoint;

/// Custom location test, e.g. "is this inside the visible map bounds".
/// Photos without a location never pass it.
pub type LocationPredicate = Arc<dyn Fn(&GeoJsonPoint) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Near {
    pub point: GeoJsonPoint,
    pub distance_meters: f64,
}

/// Photo filter. Every field that is set must pass; unset fields are ignored.
#[derive(Clone, Default)]
pub struct FilterSpec {
    /// Lower bound on the parsed `localTime`.
    pub start_date: Option<NaiveDateTime>,
    /// Upper bound on the parsed `localTime`.
    pub end_date: Option<NaiveDateTime>,
    /// Prefix of `momentLocationName`.
    pub location_name: Option<String>,
    pub media_types: Option<Vec<MediaType>>,
    pub is_favorite: Option<bool>,
    pub near: Option<Near>,
    pub contains: Option<LocationPredicate>,
}

impl FilterSpec {
    /// Overwrites every field that is set in `other`.
    pub fn merge(&mut self, other: FilterSpec) {
        if other.start_date.is_some() {
            self.start_date = other.start_date;
        }
        if other.end_date.is_some() {
            self.end_date = other.end_date;
        }
        if other.location_name.is_some() {
            self.location_name = other.location_name;
        }
        if other.media_types.is_some() {
            self.media_types = other.media_types;
        }
        if other.is_favorite.is_some() {
            self.is_favorite = other.is_favorite;
        }
        if other.near.is_some() {
            self.near = other.near;
        }
        if other.contains.is_some() {
            self.contains = other.contains;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.location_name.is_none()
            && self.media_types.is_none()
            && self.is_favorite.is_none()
            && self.near.is_none()
            && self.contains.is_none()
    }
}

impl fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSpec")
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("location_name", &self.location_name)
            .field("media_types", &self.media_types)
            .field("is_favorite", &self.is_favorite)
            .field("near", &self.near)
            .field("contains", &self.contains.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

/// One filtering pass over a photo list.
///
/// The `near` region is built on first use and reused for the rest of the pass.
pub(crate) struct FilterPass<'a> {
    filter: &'a FilterSpec,
    region: OnceCell<Option<CircularGpsRegion>>,
}

impl<'a> FilterPass<'a> {
    pub(crate) fn new(filter: &'a FilterSpec) -> Self {
        Self {
            filter,
            region: OnceCell::new(),
        }
    }

    pub(crate) fn accepts(&self, photo: &CameraRollPhoto) -> bool {
        let filter = self.filter;

        if filter.start_date.is_some() || filter.end_date.is_some() {
            let local_time = match local_time_as_date(&photo.local_time) {
                Ok(local_time) => local_time,
                Err(e) => {
                    warn!("Skipping photo {} in date filter: {}", photo.uuid, e);
                    return false;
                }
            };
            if matches!(filter.start_date, Some(from) if local_time < from) {
                return false;
            }
            if matches!(filter.end_date, Some(to) if local_time > to) {
                return false;
            }
        }

        if let Some(prefix) = &filter.location_name {
            match &photo.moment_location_name {
                Some(name) if name.starts_with(prefix.as_str()) => {}
                _ => return false,
            }
        }

        if let Some(media_types) = &filter.media_types {
            if !media_types.contains(&photo.media_type) {
                return false;
            }
        }

        if filter.is_favorite == Some(true) && photo.is_favorite == Some(false) {
            return false;
        }

        if filter.near.is_some() {
            let location = match &photo.location {
                Some(location) => location,
                None => return false,
            };
            let region = self.region.get_or_init(|| {
                filter
                    .near
                    .map(|near| CircularGpsRegion::new(near.point, near.distance_meters))
            });
            if let Some(region) = region {
                if !region.contains(location) {
                    return false;
                }
            }
        }

        if let Some(contains) = &filter.contains {
            match &photo.location {
                Some(location) if contains(location) => {}
                _ => return false,
            }
        }

        true
    }
}
