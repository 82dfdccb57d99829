//! Pure derivations from a reading: season classification and day/night phase.

use crate::model::Season;

/// Latitude band, in degrees, inside which the binary wet/dry classification
/// applies instead of the four temperate seasons.
const TROPIC_LATITUDE_DEG: f64 = 23.5;

const NORTHERN_ROTATION: [Season; 4] =
    [Season::Winter, Season::Spring, Season::Summer, Season::Autumn];
const SOUTHERN_ROTATION: [Season; 4] =
    [Season::Summer, Season::Autumn, Season::Winter, Season::Spring];

/// Classify the season for a latitude and calendar month (1–12).
///
/// Tropical latitudes get wet (May–October) or dry; everywhere else rotates
/// through the four seasons on 3-month boundaries, with December–February as
/// the first block, mirrored between hemispheres.
pub fn season_for(latitude_deg: f64, month: u32) -> Season {
    if latitude_deg.abs() < TROPIC_LATITUDE_DEG {
        return if (5..=10).contains(&month) { Season::Wet } else { Season::Dry };
    }

    let rotation =
        if latitude_deg >= 0.0 { &NORTHERN_ROTATION } else { &SOUTHERN_ROTATION };
    rotation[((month % 12) / 3) as usize]
}

/// Whether the reading counts as night.
///
/// An explicit day flag from the source wins regardless of hour (`0` means
/// night). Without one, the local hour decides: before 06:00 or from 18:00.
pub fn is_night(hour: u32, api_is_day: Option<i64>) -> bool {
    match api_is_day {
        Some(flag) => flag == 0,
        None => hour < 6 || hour >= 18,
    }
}

/// Pull (month, hour) out of a "YYYY-MM-DD HH:MM" local-time string.
///
/// Tolerates non-zero-padded fields, which the remote API emits for single
/// digit hours. Returns `None` on any structural deviation.
pub fn parse_localtime(local_time: &str) -> Option<(u32, u32)> {
    let (date, time) = local_time.trim().split_once(' ')?;

    let month: u32 = date.split('-').nth(1)?.parse().ok()?;
    let hour: u32 = time.split(':').next()?.parse().ok()?;

    if !(1..=12).contains(&month) || hour > 23 {
        return None;
    }

    Some((month, hour))
}
