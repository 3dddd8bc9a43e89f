//! Threshold decision rule
//!
//! A text is labelled positive (class 1) only when the probability of class
//! index 1 is strictly greater than the threshold. The argmax of the
//! distribution is reported alongside but never decides the label.

use polguard_core::{Error, Prediction, Result};

/// Index of the most probable class; the first one wins ties
pub fn argmax(probabilities: &[f32]) -> usize {
    probabilities
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (idx, &p)| match best {
            Some((_, best_p)) if best_p >= p => best,
            _ => Some((idx, p)),
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Apply the threshold rule to a class distribution
pub fn decide(probabilities: &[f32], threshold: f32) -> Result<Prediction> {
    let positive_probability = *probabilities.get(1).ok_or_else(|| {
        Error::classifier(format!(
            "expected at least 2 class probabilities, got {}",
            probabilities.len()
        ))
    })?;

    if probabilities.iter().any(|p| !p.is_finite()) {
        return Err(Error::classifier("class probabilities contain non-finite values"));
    }

    let predicted_class = if positive_probability > threshold { 1 } else { 0 };

    Ok(Prediction {
        predicted_class,
        argmax: argmax(probabilities),
        positive_probability,
        probabilities: probabilities.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strict() {
        let at = decide(&[0.2, 0.8], 0.8).unwrap();
        assert_eq!(at.predicted_class, 0);

        let above = decide(&[0.1999999, 0.8000001], 0.8).unwrap();
        assert_eq!(above.predicted_class, 1);
    }

    #[test]
    fn test_threshold_overrides_argmax() {
        // Class 1 is the most probable but not confident enough.
        let prediction = decide(&[0.3, 0.7], 0.8).unwrap();
        assert_eq!(prediction.argmax, 1);
        assert_eq!(prediction.predicted_class, 0);
        assert!(!prediction.is_positive());
    }

    #[test]
    fn test_confident_positive() {
        let prediction = decide(&[0.05, 0.95], 0.8).unwrap();
        assert_eq!(prediction.argmax, 1);
        assert_eq!(prediction.predicted_class, 1);
        assert_eq!(prediction.positive_probability, 0.95);
    }

    #[test]
    fn test_single_class_rejected() {
        assert!(matches!(decide(&[1.0], 0.8), Err(Error::Classifier(_))));
        assert!(decide(&[], 0.8).is_err());
    }

    #[test]
    fn test_nan_rejected() {
        assert!(decide(&[f32::NAN, 0.9], 0.8).is_err());
    }

    #[test]
    fn test_argmax_ties_and_empty() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.2, 0.7]), 2);
        assert_eq!(argmax(&[]), 0);
    }
}
