/// Rectified linear unit, applied element-wise after the convolution and
/// first dense stages.
pub fn relu(x: f64) -> f64 {
    if x > 0.0 { x } else { 0.0 }
}

/// Converts a logit vector into a probability distribution.
///
/// The maximum logit is subtracted before exponentiation so large scores
/// cannot overflow; the result is unchanged because softmax is shift
/// invariant. Outputs sum to 1 for any finite input.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&z| (z - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_clamps_negatives() {
        assert_eq!(relu(-3.5), 0.0);
        assert_eq!(relu(0.0), 0.0);
        assert_eq!(relu(2.25), 2.25);
    }

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0, -1.0]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum was {sum}");
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn softmax_survives_large_logits() {
        let probs = softmax(&[1000.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!(probs[0] > probs[1]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn softmax_orders_by_logit() {
        let probs = softmax(&[0.1, 2.0, -0.5]);
        assert!(probs[1] > probs[0] && probs[0] > probs[2]);
    }

    #[test]
    fn softmax_uniform_for_equal_logits() {
        let probs = softmax(&[0.5; 10]);
        for p in probs {
            assert!((p - 0.1).abs() < 1e-12);
        }
    }
}
