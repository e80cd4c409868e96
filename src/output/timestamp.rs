//! SubRip timestamp formatting.

/// Format a seconds offset as a SubRip timestamp, `HH:MM:SS,mmm`.
///
/// The value is rounded to the nearest millisecond *before* it is split into
/// fields, so a fraction that rounds up to a whole second carries into the
/// seconds field instead of printing `1000` milliseconds.  Hours widen past
/// two digits only from 100 h on.
///
/// Negative and non-finite inputs are clamped to zero in every build.
///
/// ```
/// use media_transcriber::output::format_srt_timestamp;
///
/// assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
/// assert_eq!(format_srt_timestamp(3661.5), "01:01:01,500");
/// assert_eq!(format_srt_timestamp(1.9996), "00:00:02,000");
/// ```
pub fn format_srt_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };

    let total_ms = (seconds * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inverse of the formatter, for round-trip checks.
    fn parse(ts: &str) -> f64 {
        let (hms, ms) = ts.split_once(',').unwrap();
        let mut parts = hms.split(':').map(|p| p.parse::<u64>().unwrap());
        let (h, m, s) = (
            parts.next().unwrap(),
            parts.next().unwrap(),
            parts.next().unwrap(),
        );
        (h * 3600 + m * 60 + s) as f64 + ms.parse::<u64>().unwrap() as f64 / 1000.0
    }

    fn has_srt_shape(ts: &str) -> bool {
        let b = ts.as_bytes();
        b.len() == 12
            && b.iter().enumerate().all(|(i, c)| match i {
                2 | 5 => *c == b':',
                8 => *c == b',',
                _ => c.is_ascii_digit(),
            })
    }

    #[test]
    fn zero() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
    }

    #[test]
    fn hour_minute_second_half() {
        assert_eq!(format_srt_timestamp(3661.5), "01:01:01,500");
    }

    #[test]
    fn quarter_second() {
        assert_eq!(format_srt_timestamp(1.25), "00:00:01,250");
    }

    #[test]
    fn millisecond_carry_is_normalised() {
        assert_eq!(format_srt_timestamp(1.9996), "00:00:02,000");
        assert_eq!(format_srt_timestamp(59.9999), "00:01:00,000");
        assert_eq!(format_srt_timestamp(3599.9997), "01:00:00,000");
    }

    #[test]
    fn hours_widen_past_99() {
        assert_eq!(format_srt_timestamp(360_000.0), "100:00:00,000");
    }

    #[test]
    fn non_finite_is_clamped() {
        assert_eq!(format_srt_timestamp(f64::NAN), "00:00:00,000");
        assert_eq!(format_srt_timestamp(f64::INFINITY), "00:00:00,000");
    }

    #[test]
    fn negative_is_clamped() {
        assert_eq!(format_srt_timestamp(-0.25), "00:00:00,000");
        assert_eq!(format_srt_timestamp(-3600.0), "00:00:00,000");
    }

    #[test]
    fn shape_and_round_trip_over_a_day() {
        // Irregular stride so fractional parts vary.
        let mut s = 0.0_f64;
        while s < 86_400.0 {
            let ts = format_srt_timestamp(s);
            assert!(has_srt_shape(&ts), "bad shape {ts} for {s}");
            let back = parse(&ts);
            assert!((back - s).abs() <= 0.001, "{s} → {ts} → {back}");
            s += 7.777_3;
        }
    }

    #[test]
    fn round_trip_near_upper_bound() {
        let s = 86_399.9994;
        let ts = format_srt_timestamp(s);
        assert_eq!(ts, "23:59:59,999");
        assert!((parse(&ts) - s).abs() <= 0.001);
    }
}
