use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic pseudo-random point in `[-1, 1]^2` derived from an id.
pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

pub fn format_accuracy(accuracy: f32) -> String {
    if accuracy.fract().abs() < f32::EPSILON {
        format!("{accuracy:.0}%")
    } else {
        format!("{accuracy:.1}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let first = stable_pair("10.0.0.5");
        assert_eq!(first, stable_pair("10.0.0.5"));
        assert!((-1.0..=1.0).contains(&first.0));
        assert!((-1.0..=1.0).contains(&first.1));
    }

    #[test]
    fn accuracy_drops_trailing_zeroes() {
        assert_eq!(format_accuracy(96.0), "96%");
        assert_eq!(format_accuracy(87.5), "87.5%");
    }
}
