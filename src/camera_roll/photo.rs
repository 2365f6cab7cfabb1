use log::warn;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::sync::{Arc, RwLock};

use crate::location::GeoJsonPoint;

/// Length of the canonical asset identifier.
pub const CANONICAL_UUID_LEN: usize = 36;

/// First 36 characters of an asset identifier.
///
/// Device identifiers may carry a sub-resource suffix
/// (`"0A929779-BFA0-4C1C-877C-28F353BB0EB3/L0/001"`) that file operations reject.
pub fn canonical_uuid(id: &str) -> &str {
    match id.char_indices().nth(CANONICAL_UUID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum MediaType {
    #[default]
    Unknown,
    Image,
    Video,
    Audio,
}

impl From<u8> for MediaType {
    fn from(value: u8) -> Self {
        match value {
            1 => MediaType::Image,
            2 => MediaType::Video,
            3 => MediaType::Audio,
            _ => MediaType::Unknown,
        }
    }
}

impl From<MediaType> for u8 {
    fn from(value: MediaType) -> Self {
        match value {
            MediaType::Unknown => 0,
            MediaType::Image => 1,
            MediaType::Video => 2,
            MediaType::Audio => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum MediaSubtype {
    #[default]
    None,
    PhotoPanorama,
    PhotoHdr,
    PhotoScreenshot,
    PhotoLive,
    VideoStreamed,
    VideoHighFrameRate,
    VideoTimelapse,
}

impl From<u8> for MediaSubtype {
    fn from(value: u8) -> Self {
        match value {
            1 => MediaSubtype::PhotoPanorama,
            2 => MediaSubtype::PhotoHdr,
            3 => MediaSubtype::PhotoScreenshot,
            4 => MediaSubtype::PhotoLive,
            5 => MediaSubtype::VideoStreamed,
            6 => MediaSubtype::VideoHighFrameRate,
            7 => MediaSubtype::VideoTimelapse,
            _ => MediaSubtype::None,
        }
    }
}

impl From<MediaSubtype> for u8 {
    fn from(value: MediaSubtype) -> Self {
        match value {
            MediaSubtype::None => 0,
            MediaSubtype::PhotoPanorama => 1,
            MediaSubtype::PhotoHdr => 2,
            MediaSubtype::PhotoScreenshot => 3,
            MediaSubtype::PhotoLive => 4,
            MediaSubtype::VideoStreamed => 5,
            MediaSubtype::VideoHighFrameRate => 6,
            MediaSubtype::VideoTimelapse => 7,
        }
    }
}

/// Device position reported alongside the asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

/// A record as returned by the photo source, before its location is normalized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPhotoRecord {
    pub uuid: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub date_taken: String,
    #[serde(default)]
    pub local_time: String,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub media_subtype: MediaSubtype,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub moment_id: Option<String>,
    #[serde(default)]
    pub moment_location_name: Option<String>,
    #[serde(default)]
    pub is_favorite: Option<bool>,
}

/// Lazily filled image descriptor. An empty `src` means "not yet available".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderState {
    pub src: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_time: Option<String>,
}

/// Shared handle on a photo's [`RenderState`], updated by background resolution.
#[derive(Debug, Clone, Default)]
pub struct RenderHandle(Arc<RwLock<RenderState>>);

impl RenderHandle {
    pub fn new(state: RenderState) -> Self {
        Self(Arc::new(RwLock::new(state)))
    }

    pub fn snapshot(&self) -> RenderState {
        match self.0.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn src(&self) -> String {
        self.snapshot().src
    }

    pub fn is_available(&self) -> bool {
        !self.src().is_empty()
    }

    pub fn set_src(&self, src: String) {
        let mut state = match self.0.write() {
            Ok(state) => state,
            Err(poisoned) => {
                warn!("Render state lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        state.src = src;
    }
}

impl Serialize for RenderHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraRollPhoto {
    pub uuid: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoJsonPoint>,
    pub date_taken: String,
    pub local_time: String,
    pub media_type: MediaType,
    pub media_subtype: MediaSubtype,
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moment_location_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderHandle>,
}

impl CameraRollPhoto {
    /// Normalizes a raw record. A location that cannot be read as a point is
    /// logged and dropped; the photo is kept.
    pub fn from_raw(raw: RawPhotoRecord) -> Self {
        let location = match raw.location {
            None | Some(Value::Null) => None,
            Some(value) => match GeoJsonPoint::from_value(&value) {
                Ok(point) => Some(point),
                Err(e) => {
                    warn!("Dropping location of photo {}: {}", raw.uuid, e);
                    None
                }
            },
        };

        Self {
            uuid: raw.uuid,
            filename: raw.filename,
            location,
            date_taken: raw.date_taken,
            local_time: raw.local_time,
            media_type: raw.media_type,
            media_subtype: raw.media_subtype,
            width: raw.width,
            height: raw.height,
            duration: raw.duration,
            position: raw.position,
            moment_id: raw.moment_id,
            moment_location_name: raw.moment_location_name,
            is_favorite: raw.is_favorite,
            render: None,
        }
    }

    pub fn canonical_uuid(&self) -> &str {
        canonical_uuid(&self.uuid)
    }
}

impl From<RawPhotoRecord> for CameraRollPhoto {
    fn from(raw: RawPhotoRecord) -> Self {
        Self::from_raw(raw)
    }
}
