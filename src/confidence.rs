//! Sample-size confidence weighting

/// Confidence weight for a statistic backed by `n` observations.
///
/// `1 - 1/(1 + sqrt(n))`: 0 at `n = 0`, 0.5 at `n = 1`, rising towards but
/// never reaching 1. Discounts thin evidence without a hard cutoff.
pub fn confidence(n: u32) -> f64 {
    if n == 0 {
        return 0.0;
    }
    1.0 - 1.0 / (1.0 + f64::from(n).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.001
    }

    #[test]
    fn test_known_values() {
        assert_eq!(confidence(0), 0.0);
        assert!(close(confidence(1), 0.5));
        assert!(close(confidence(10), 0.760));
        assert!(close(confidence(20), 0.817));
        assert!(close(confidence(100), 0.909));
        assert!(close(confidence(1000), 0.969));
    }

    #[test]
    fn test_never_reaches_one() {
        assert!(confidence(u32::MAX) < 1.0);
    }
}
