//! Canonical cache keys for weather queries.

use std::fmt::Write;

/// Builds the cache key for a weather query.
///
/// Coordinates are rounded to 4 decimal places and the variable list is
/// sorted, so logically identical queries always map to the same key. The
/// key is a form-encoded string, e.g.
/// `lat=47.5&lon=19.1&start=a&end=b&vars=x&vars=y&granularity=historical`.
///
/// # Examples
///
/// ```
/// use energy_forecast::fingerprint;
///
/// let a = fingerprint(47.5, 19.1, "a", "b", &["x", "y"], "historical");
/// let b = fingerprint(47.50001, 19.1, "a", "b", &["y", "x"], "historical");
/// assert_eq!(a, b);
/// ```
pub fn fingerprint<V: AsRef<str>>(
    latitude: f64,
    longitude: f64,
    start: &str,
    end: &str,
    variables: &[V],
    granularity: &str,
) -> String {
    let mut vars: Vec<&str> = variables.iter().map(AsRef::as_ref).collect();
    vars.sort_unstable();

    let mut pairs: Vec<(&str, String)> = vec![
        ("lat", format!("{:?}", round4(latitude))),
        ("lon", format!("{:?}", round4(longitude))),
        ("start", start.to_string()),
        ("end", end.to_string()),
    ];
    pairs.extend(vars.into_iter().map(|v| ("vars", v.to_string())));
    pairs.push(("granularity", granularity.to_string()));

    let mut key = String::new();
    for (i, (name, value)) in pairs.iter().enumerate() {
        if i > 0 {
            key.push('&');
        }
        encode_component(&mut key, name);
        key.push('=');
        encode_component(&mut key, value);
    }
    key
}

fn round4(value: f64) -> f64 {
    let rounded = (value * 1e4).round() / 1e4;
    // -0.0 and 0.0 must share a key
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn encode_component(out: &mut String, raw: &str) {
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_order_does_not_matter() {
        let a = fingerprint(47.5, 19.1, "a", "b", &["x", "y"], "historical");
        let b = fingerprint(47.5, 19.1, "a", "b", &["y", "x"], "historical");
        assert_eq!(a, b);
        assert_eq!(
            a,
            "lat=47.5&lon=19.1&start=a&end=b&vars=x&vars=y&granularity=historical"
        );
    }

    #[test]
    fn test_repeated_calls_are_byte_identical() {
        let vars = vec!["temperature_2m".to_string(), "cloud_cover".to_string()];
        let first = fingerprint(52.52, 13.405, "2024-01-01", "2024-01-31", &vars, "historical");
        for _ in 0..10 {
            assert_eq!(
                fingerprint(52.52, 13.405, "2024-01-01", "2024-01-31", &vars, "historical"),
                first
            );
        }
    }

    #[test]
    fn test_coordinates_round_to_four_decimals() {
        let vars = ["temperature_2m"];
        let base = fingerprint(47.12344, -19.00001, "s", "e", &vars, "historical");
        assert_eq!(base, fingerprint(47.1234, -19.0, "s", "e", &vars, "historical"));
        assert_ne!(base, fingerprint(47.1236, -19.0, "s", "e", &vars, "historical"));
        assert!(base.starts_with("lat=47.1234&lon=-19.0&"));
    }

    #[test]
    fn test_granularity_and_dates_separate_keys() {
        let vars = ["x"];
        let historical = fingerprint(1.0, 2.0, "next-3", "next-3", &vars, "historical");
        let forecast = fingerprint(1.0, 2.0, "next-3", "next-3", &vars, "forecast");
        assert_ne!(historical, forecast);
        assert_ne!(
            fingerprint(1.0, 2.0, "2024-01-01", "2024-01-02", &vars, "historical"),
            fingerprint(1.0, 2.0, "2024-01-01", "2024-01-03", &vars, "historical")
        );
    }

    #[test]
    fn test_reserved_characters_are_escaped() {
        let key = fingerprint(0.0, -0.0, "a b", "c&d", &["e=f"], "historical");
        assert_eq!(
            key,
            "lat=0.0&lon=0.0&start=a+b&end=c%26d&vars=e%3Df&granularity=historical"
        );
    }
}
