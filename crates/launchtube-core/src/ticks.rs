//! Conversion between seconds and 100-nanosecond "ticks".
//!
//! Media servers in the Jellyfin/Emby family report playback positions in
//! ticks; webhook body templates use the same convention.

const TICKS_PER_SECOND: f64 = 10_000_000.0;

/// Convert a position in seconds to ticks, truncating sub-tick precision.
pub fn seconds_to_ticks(seconds: f64) -> i64 {
    (seconds * TICKS_PER_SECOND).floor() as i64
}

/// Convert ticks back to seconds.
pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_position() {
        assert_eq!(seconds_to_ticks(125.5), 1_255_000_000);
        assert_eq!(seconds_to_ticks(0.0), 0);
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        for x in [0.0, 1.0, 30.0, 125.5, 7200.25, 0.0000001] {
            let back = ticks_to_seconds(seconds_to_ticks(x));
            assert!((back - x).abs() < 1e-6, "{} round-tripped to {}", x, back);
        }
    }

    #[test]
    fn test_truncates_sub_tick() {
        // 1.23456789 s = 12_345_678.9 ticks, floored
        assert_eq!(seconds_to_ticks(1.23456789), 12_345_678);
    }
}
