pub mod camera_roll;
pub mod config;
pub mod error;
pub mod file_cache;
pub mod file_store;
pub mod gps_region;
pub mod image_resolver;
pub mod local_time;
pub mod location;

pub use camera_roll::{CameraRollPhoto, CameraRollWithLoc, FilterSpec, PhotoQuery, SortSpec};
pub use config::Config;
pub use error::{RollError, RollResult};
pub use file_cache::{FileCache, FileCacheConfig};
pub use file_store::{file_store_for, FileStore, LocalFileStore, PlaceholderFileStore};
pub use gps_region::{CircularGpsRegion, GpsRegion, RectangularGpsRegion};
pub use image_resolver::ImageResolver;
pub use location::GeoJsonPoint;
