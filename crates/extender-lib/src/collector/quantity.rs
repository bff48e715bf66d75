//! Kubernetes CPU quantity parsing
//!
//! Covers the forms the API server and metrics-server emit for CPU:
//! plain cores ("4", "1.5"), milli/micro/nanocores ("3500m", "250u",
//! "1234567n") and the decimal SI multipliers k, M, G.

/// Parse a CPU quantity into cores
pub fn parse_cpu_quantity(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (number, multiplier) = match raw.char_indices().last() {
        Some((idx, suffix)) if suffix.is_ascii_alphabetic() => {
            let multiplier = match suffix {
                'n' => 1e-9,
                'u' => 1e-6,
                'm' => 1e-3,
                'k' => 1e3,
                'M' => 1e6,
                'G' => 1e9,
                _ => return None,
            };
            (&raw[..idx], multiplier)
        }
        _ => (raw, 1.0),
    };

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value * multiplier)
}
