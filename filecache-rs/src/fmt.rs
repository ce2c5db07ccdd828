//! Provides parsing and formatting helpers for durations.
use std::fmt::Write;
use std::time::Duration;

/// Provides a separator line which is used by all text reports.
pub static SEPARATOR: &str =
    "-------------------------------------------------------------------------------\n";

/// Parses a duration from a given string.
///
/// This string can have the following suffixes:
/// * **ms**: treats the value as milliseconds
/// * **s** or no suffix: treats the value as seconds
/// * **m**: treats the value as minutes
/// * **h**: treats the value as hours
/// * **d**: treats the value as days
///
/// Suffixes are case insensitive. Returns an **Err** if either a non-integer value or an unknown
/// suffix was given.
///
/// # Examples
///
/// ```
/// # use std::time::Duration;
/// assert_eq!(filecache::fmt::parse_duration("250 ms").unwrap(), Duration::from_millis(250));
/// assert_eq!(filecache::fmt::parse_duration("30").unwrap(), Duration::from_secs(30));
/// assert_eq!(filecache::fmt::parse_duration("10m").unwrap(), Duration::from_secs(10 * 60));
/// assert_eq!(filecache::fmt::parse_duration("2 H").unwrap(), Duration::from_secs(2 * 60 * 60));
/// assert_eq!(filecache::fmt::parse_duration("1d").unwrap(), Duration::from_secs(24 * 60 * 60));
///
/// // Decimal or negative numbers as well as unknown suffixes result in an error...
/// assert_eq!(filecache::fmt::parse_duration("1.5s").is_err(), true);
/// assert_eq!(filecache::fmt::parse_duration("-1m").is_err(), true);
/// assert_eq!(filecache::fmt::parse_duration("3 w").is_err(), true);
///
/// // So do durations which cannot be represented...
/// assert_eq!(filecache::fmt::parse_duration("300000000000000d").is_err(), true);
/// ```
pub fn parse_duration(str: impl AsRef<str>) -> anyhow::Result<Duration> {
    lazy_static::lazy_static! {
        static ref NUMBER_AND_UNIT: regex::Regex =
            regex::Regex::new(r"^ *(\d+) *((?i:ms|s|m|h|d))? *$").unwrap();
    }

    let captures = NUMBER_AND_UNIT.captures(str.as_ref()).ok_or_else(|| {
        anyhow::anyhow!(
            "Cannot parse '{}' into a duration. \
             Expected a positive number and optionally 'ms', 's', 'm', 'h' or 'd' as suffix.",
            str.as_ref()
        )
    })?;

    let number = captures[1].parse::<u64>()?;
    let unit = captures
        .get(2)
        .map(|unit| unit.as_str().to_lowercase())
        .unwrap_or_default();

    let factor = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(number)),
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        _ => 1,
    };

    number
        .checked_mul(factor)
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow::anyhow!("The duration '{}' is too large.", str.as_ref()))
}

/// Formats a duration into a string like "1d 3h 17m 2s 12ms".
///
/// Units which are zero are skipped. A zero duration is rendered as "0ms".
///
/// # Examples
///
/// ```
/// # use std::time::Duration;
/// assert_eq!(filecache::fmt::format_duration(Duration::ZERO), "0ms");
/// assert_eq!(filecache::fmt::format_duration(Duration::from_millis(1013)), "1s 13ms");
/// assert_eq!(filecache::fmt::format_duration(Duration::from_secs(60 * 61)), "1h 1m");
/// assert_eq!(filecache::fmt::format_duration(Duration::from_secs(24 * 60 * 60 + 59)), "1d 59s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    const UNITS: [(u128, &str); 5] = [
        (1000 * 60 * 60 * 24, "d"),
        (1000 * 60 * 60, "h"),
        (1000 * 60, "m"),
        (1000, "s"),
        (1, "ms"),
    ];

    let mut remainder = duration.as_millis();
    if remainder == 0 {
        return "0ms".to_owned();
    }

    let mut result = String::new();
    for (millis, unit) in UNITS {
        let amount = remainder / millis;
        if amount > 0 {
            if !result.is_empty() {
                result.push(' ');
            }
            let _ = write!(result, "{}{}", amount, unit);
            remainder %= millis;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use crate::fmt::parse_duration;
    use std::time::Duration;

    #[test]
    fn overflowing_durations_are_rejected() {
        assert_eq!(parse_duration("300000000000000d").is_err(), true);
        assert_eq!(parse_duration("18446744073709551615h").is_err(), true);
        assert_eq!(parse_duration("18446744073709551616").is_err(), true);

        // The largest representable values still work...
        assert_eq!(
            parse_duration("18446744073709551615").unwrap(),
            Duration::from_secs(u64::MAX)
        );
        assert_eq!(
            parse_duration("18446744073709551615ms").unwrap(),
            Duration::from_millis(u64::MAX)
        );
    }
}
