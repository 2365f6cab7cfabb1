use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;

use crate::error::{RollError, RollResult};

const DIRECT_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y:%m:%d"];

/// Converts a device `localTime` string (e.g. `"2014-10-24 04:45:04.000"`) to a
/// wall-clock timestamp in the device's local time.
///
/// Some date parsers mishandle the `<date> <HH>:<MM>:<SS>.<fraction>` form, so after
/// a direct parse fails the date part is parsed on its own and the time of day is
/// set from the captured hour, minute and second. The fraction is dropped.
pub fn local_time_as_date(local_time: &str) -> RollResult<NaiveDateTime> {
    let trimmed = local_time.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }
    for format in DIRECT_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive);
        }
    }

    debug!("Direct parse failed for localTime={}, splitting date and time", local_time);
    split_date_and_time(trimmed)
        .ok_or_else(|| RollError::InvalidTimestamp(local_time.to_string()))
}

/// Matches `(.*)\s(\d*):(\d*):(\d*)\.` and rebuilds the timestamp from its groups.
///
/// The date is everything before the last whitespace that is followed by an
/// `H:M:S.` group; anything after the fraction point is ignored.
fn split_date_and_time(value: &str) -> Option<NaiveDateTime> {
    let (date_part, (hour, minute, second)) = value
        .char_indices()
        .rev()
        .filter(|(_, c)| c.is_whitespace())
        .find_map(|(idx, c)| {
            let hms = time_group(&value[idx + c.len_utf8()..])?;
            Some((&value[..idx], hms))
        })?;

    let date = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part.trim(), format).ok())?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;

    Some(date.and_time(time))
}

/// Leading `H:M:S.` of `text`.
fn time_group(text: &str) -> Option<(u32, u32, u32)> {
    let (hms, _rest) = text.split_once('.')?;
    let mut fields = hms.splitn(3, ':');
    let hour = parse_group(fields.next()?)?;
    let minute = parse_group(fields.next()?)?;
    let second = parse_group(fields.next()?)?;
    Some((hour, minute, second))
}

fn parse_group(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Human readable form of a `localTime`, e.g. `"Fri Oct 24 2014 04:45:04"`.
pub fn local_time_display(local_time: &str) -> RollResult<String> {
    let dt = local_time_as_date(local_time)?;
    Ok(dt.format("%a %b %d %Y %H:%M:%S").to_string())
}
