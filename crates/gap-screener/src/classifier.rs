//! MA240 position classification

use crate::models::{GapResult, MaPosition};

/// Close against the 240-session average.
///
/// Equal, missing or non-positive averages leave the row unclassified.
pub fn classify_ma_position(close: f64, ma240: Option<f64>) -> Option<MaPosition> {
    let ma = ma240.filter(|m| m.is_finite() && *m > 0.0)?;
    if close > ma {
        Some(MaPosition::Above)
    } else if close < ma {
        Some(MaPosition::Below)
    } else {
        None
    }
}

/// Annotates scan results; never removes rows
#[derive(Debug, Default)]
pub struct MaPositionClassifier;

impl MaPositionClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn annotate(&self, results: &mut [GapResult]) {
        for result in results.iter_mut() {
            result.ma_position = classify_ma_position(result.close, result.ma240);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(classify_ma_position(100.0, Some(90.0)), Some(MaPosition::Above));
        assert_eq!(classify_ma_position(90.0, Some(100.0)), Some(MaPosition::Below));
        assert_eq!(classify_ma_position(100.0, Some(100.0)), None);
        assert_eq!(classify_ma_position(100.0, None), None);
        assert_eq!(classify_ma_position(100.0, Some(0.0)), None);
        assert_eq!(classify_ma_position(100.0, Some(-5.0)), None);
    }
}
