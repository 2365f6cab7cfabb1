use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::photo::CameraRollPhoto;

/// Record fields a photo list can be sorted on, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    Uuid,
    Filename,
    DateTaken,
    LocalTime,
    MediaType,
    MediaSubtype,
    Width,
    Height,
    Duration,
    MomentId,
    MomentLocationName,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Uuid => "uuid",
            SortKey::Filename => "filename",
            SortKey::DateTaken => "dateTaken",
            SortKey::LocalTime => "localTime",
            SortKey::MediaType => "mediaType",
            SortKey::MediaSubtype => "mediaSubtype",
            SortKey::Width => "width",
            SortKey::Height => "height",
            SortKey::Duration => "duration",
            SortKey::MomentId => "momentId",
            SortKey::MomentLocationName => "momentLocationName",
        }
    }
}

impl FromStr for SortKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uuid" => Ok(SortKey::Uuid),
            "filename" => Ok(SortKey::Filename),
            "dateTaken" => Ok(SortKey::DateTaken),
            "localTime" => Ok(SortKey::LocalTime),
            "mediaType" => Ok(SortKey::MediaType),
            "mediaSubtype" => Ok(SortKey::MediaSubtype),
            "width" => Ok(SortKey::Width),
            "height" => Ok(SortKey::Height),
            "duration" => Ok(SortKey::Duration),
            "momentId" => Ok(SortKey::MomentId),
            "momentLocationName" => Ok(SortKey::MomentLocationName),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub descending: bool,
}

impl SortSpec {
    pub fn ascending(key: SortKey) -> Self {
        Self {
            key,
            descending: false,
        }
    }

    pub fn descending(key: SortKey) -> Self {
        Self {
            key,
            descending: true,
        }
    }
}

/// Value of a record field under a sort key. Numbers sort before text,
/// missing values sort last.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue<'a> {
    Number(f64),
    Text(&'a str),
    Missing,
}

impl SortValue<'_> {
    fn rank(&self) -> u8 {
        match self {
            SortValue::Number(_) => 0,
            SortValue::Text(_) => 1,
            SortValue::Missing => 2,
        }
    }

    pub fn compare(&self, other: &SortValue<'_>) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl CameraRollPhoto {
    pub fn sort_value(&self, key: SortKey) -> SortValue<'_> {
        match key {
            SortKey::Uuid => SortValue::Text(&self.uuid),
            SortKey::Filename => SortValue::Text(&self.filename),
            SortKey::DateTaken => SortValue::Text(&self.date_taken),
            SortKey::LocalTime => SortValue::Text(&self.local_time),
            SortKey::MediaType => SortValue::Number(u8::from(self.media_type) as f64),
            SortKey::MediaSubtype => SortValue::Number(u8::from(self.media_subtype) as f64),
            SortKey::Width => SortValue::Number(self.width as f64),
            SortKey::Height => SortValue::Number(self.height as f64),
            SortKey::Duration => SortValue::Number(self.duration),
            SortKey::MomentId => self
                .moment_id
                .as_deref()
                .map_or(SortValue::Missing, SortValue::Text),
            SortKey::MomentLocationName => self
                .moment_location_name
                .as_deref()
                .map_or(SortValue::Missing, SortValue::Text),
        }
    }
}

/// Stable sort on the first `SortSpec` only, reversed afterwards when descending.
pub(crate) fn sort_by_spec(photos: &mut [CameraRollPhoto], sort: &SortSpec) {
    photos.sort_by(|a, b| a.sort_value(sort.key).compare(&b.sort_value(sort.key)));
    if sort.descending {
        photos.reverse();
    }
}
