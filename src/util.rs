use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn format_count(count: u64) -> String {
    const UNITS: [&str; 4] = ["", "k", "M", "G"];

    let mut value = count as f64;
    let mut unit = 0usize;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        count.to_string()
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}

/// Last path segment of a route-like label, used for compact endpoint captions.
pub fn short_label(label: &str) -> &str {
    label
        .trim_end_matches('/')
        .rsplit_once('/')
        .map(|(_, rest)| rest)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(label)
}

fn stable_hash(id: &str) -> u64 {
    // DefaultHasher::new() uses fixed keys, so the result is stable within a build.
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

/// Stable value in `[0, 1)` derived from an id.
pub fn stable_unit(id: &str) -> f64 {
    let hash = stable_hash(id);
    (hash >> 11) as f64 / (1u64 << 53) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_count_scales_units() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_500), "1.5k");
        assert_eq!(format_count(2_000_000), "2.0M");
    }

    #[test]
    fn short_label_takes_last_route_segment() {
        assert_eq!(short_label("/api/v1/orders"), "orders");
        assert_eq!(short_label("/api/v1/orders/"), "orders");
        assert_eq!(short_label("health"), "health");
    }

    #[test]
    fn stable_values_are_repeatable_and_bounded() {
        let unit = stable_unit("billing");
        assert_eq!(unit, stable_unit("billing"));
        assert!((0.0..1.0).contains(&unit));
    }
}
