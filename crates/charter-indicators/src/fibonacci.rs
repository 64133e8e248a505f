//! Fibonacci retracement and extension levels.

pub const FIBONACCI_RATIOS: [(f64, &str); 9] = [
    (0.0, "0%"),
    (0.236, "23.6%"),
    (0.382, "38.2%"),
    (0.5, "50%"),
    (0.618, "61.8%"),
    (0.786, "78.6%"),
    (1.0, "100%"),
    (1.618, "161.8%"),
    (2.618, "261.8%"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct FibonacciLevel {
    pub ratio: f64,
    pub price: f64,
    pub label: String,
}

/// Levels measured up from `low` across the `high - low` span.
pub fn fibonacci_levels(high: f64, low: f64) -> Vec<FibonacciLevel> {
    let span = high - low;
    FIBONACCI_RATIOS
        .iter()
        .map(|&(ratio, label)| FibonacciLevel {
            ratio,
            price: low + span * ratio,
            label: label.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        let levels = fibonacci_levels(200.0, 100.0);
        assert_eq!(levels.len(), 9);
        assert_eq!(levels[0].price, 100.0);
        assert_eq!(levels[3].price, 150.0);
        assert_eq!(levels[6].price, 200.0);
        assert_eq!(levels[3].label, "50%");
        assert_eq!(levels[1].label, "23.6%");
        assert!((levels[8].price - 361.8).abs() < 1e-9);
    }
}
