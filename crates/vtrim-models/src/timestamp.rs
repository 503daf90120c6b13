//! Timestamp parsing utilities.
//!
//! Clip boundaries arrive as human-readable strings. Supported forms are
//! `H:MM:SS`, `MM:SS` and a bare number of seconds; every component may
//! carry a fractional part (`00:01:02.250`).

/// Parse a timestamp string to total seconds.
///
/// No range check: negative or very large values are returned as-is and
/// the caller decides whether the resulting clip range makes sense.
///
/// # Examples
/// ```
/// use vtrim_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:02:03").unwrap(), 3723.0);
/// assert_eq!(parse_timestamp("02:03").unwrap(), 123.0);
/// assert_eq!(parse_timestamp("45").unwrap(), 45.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    let total = match parts.as_slice() {
        [seconds] => parse_component("seconds", seconds)?,
        [minutes, seconds] => {
            let minutes = parse_component("minutes", minutes)?;
            let seconds = parse_component("seconds", seconds)?;
            minutes * 60.0 + seconds
        }
        [hours, minutes, seconds] => {
            let hours = parse_component("hours", hours)?;
            let minutes = parse_component("minutes", minutes)?;
            let seconds = parse_component("seconds", seconds)?;
            hours * 3600.0 + minutes * 60.0 + seconds
        }
        _ => return Err(TimestampError::InvalidFormat(ts.to_string())),
    };

    // Finite components can still overflow once scaled.
    if !total.is_finite() {
        return Err(TimestampError::InvalidValue("timestamp", ts.to_string()));
    }
    Ok(total)
}

fn parse_component(component: &'static str, raw: &str) -> Result<f64, TimestampError> {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(TimestampError::InvalidValue(component, raw.to_string())),
    }
}

/// Format seconds into HH:MM:SS or HH:MM:SS.mmm string.
pub fn format_seconds(total_secs: f64) -> String {
    let sign = if total_secs < 0.0 { "-" } else { "" };
    let total_secs = total_secs.abs();
    let hours = (total_secs / 3600.0).floor() as u64;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u64;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{}{:02}:{:02}:{:06.3}", sign, hours, mins, secs)
    } else {
        format!("{}{:02}:{:02}:{:02}", sign, hours, mins, secs.floor() as u64)
    }
}

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampError {
    /// Timestamp string is empty
    Empty,
    /// A component is not a finite number
    InvalidValue(&'static str, String),
    /// More than three `:`-separated components
    InvalidFormat(String),
}

impl std::fmt::Display for TimestampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Timestamp cannot be empty"),
            Self::InvalidValue(component, value) => {
                write!(f, "Invalid {} value: '{}'", component, value)
            }
            Self::InvalidFormat(ts) => write!(
                f,
                "Invalid timestamp format '{}'. Use H:MM:SS, MM:SS, or a number of seconds",
                ts
            ),
        }
    }
}

impl std::error::Error for TimestampError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_h_mm_ss() {
        assert_eq!(parse_timestamp("01:02:03").unwrap(), 3723.0);
        assert_eq!(parse_timestamp("0:00:00").unwrap(), 0.0);
        assert_eq!(parse_timestamp("1:30:45").unwrap(), 5445.0);
    }

    #[test]
    fn test_parse_timestamp_mm_ss() {
        assert_eq!(parse_timestamp("02:03").unwrap(), 123.0);
        assert_eq!(parse_timestamp("0:10").unwrap(), 10.0);
        assert_eq!(parse_timestamp("1:05").unwrap(), 65.0);
    }

    #[test]
    fn test_parse_timestamp_raw_seconds() {
        assert_eq!(parse_timestamp("45").unwrap(), 45.0);
        assert_eq!(parse_timestamp(" 90 ").unwrap(), 90.0);
    }

    #[test]
    fn test_parse_timestamp_fractional() {
        let result = parse_timestamp("00:00:30.500").unwrap();
        assert!((result - 30.5).abs() < 0.001);
    }

    #[test]
    fn test_parse_timestamp_passes_through_out_of_range_values() {
        assert_eq!(parse_timestamp("-5").unwrap(), -5.0);
        assert_eq!(parse_timestamp("999:00:00").unwrap(), 3_596_400.0);
    }

    #[test]
    fn test_parse_timestamp_errors() {
        assert!(matches!(parse_timestamp(""), Err(TimestampError::Empty)));
        assert!(matches!(parse_timestamp("  "), Err(TimestampError::Empty)));
        assert!(matches!(
            parse_timestamp("abc"),
            Err(TimestampError::InvalidValue("seconds", _))
        ));
        assert!(matches!(
            parse_timestamp("01:xx:03"),
            Err(TimestampError::InvalidValue("minutes", _))
        ));
        assert!(matches!(
            parse_timestamp("1:"),
            Err(TimestampError::InvalidValue("seconds", _))
        ));
        assert!(matches!(
            parse_timestamp("inf"),
            Err(TimestampError::InvalidValue(_, _))
        ));
        assert!(matches!(
            parse_timestamp("1:2:3:4"),
            Err(TimestampError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_timestamp_rejects_overflowing_total() {
        assert!(matches!(
            parse_timestamp("1e308:00:00"),
            Err(TimestampError::InvalidValue("timestamp", _))
        ));
        assert!(matches!(
            parse_timestamp("1e307:00"),
            Err(TimestampError::InvalidValue("timestamp", _))
        ));
        assert!(parse_timestamp("1e300").unwrap().is_finite());
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "00:00:00");
        assert_eq!(format_seconds(90.0), "00:01:30");
        assert_eq!(format_seconds(3661.0), "01:01:01");
        assert_eq!(format_seconds(30.5), "00:00:30.500");
        assert_eq!(format_seconds(-5.0), "-00:00:05");
    }
}
