//! Stacking-penalty algebra. A pure function, independent of
//! holders, modifiers, or the calculation engine — kept in its own
//! module so it can be tested and benchmarked in isolation, the way the
//! teacher keeps its pure numeric helpers (`math.rs`) apart from the
//! stateful calculator.

/// `P = 1 / e^((1/2.67)^2)`. The k-th best factor in a penalized chain
/// is weighted by `P^(k^2)`.
pub const PENALTY_BASE: f64 = 0.869_120_0;

/// Factors beyond this position in a sorted chain contribute no
/// observable weight (`P^(11^2)` is below 1e-53).
const MAX_PENALIZED_FACTORS: usize = 11;

/// Apply the stacking penalty to a list of multiplicative factors
/// (values already normalized to the "1.0 = no change" convention).
///
/// Positives and negatives are penalized in separate chains so that
/// mixing a gain and a loss doesn't let one cancel the other's penalty
/// rank. Returns `1.0` for an empty list and `f` for
/// a single-element list.
pub fn penalize(factors: &[f64]) -> f64 {
    let mut positives: Vec<f64> = Vec::new();
    let mut negatives: Vec<f64> = Vec::new();

    for &f in factors {
        let delta = f - 1.0;
        if delta >= 0.0 {
            positives.push(delta);
        } else {
            negatives.push(delta);
        }
    }

    // Most significant factor first: largest magnitude delta leads.
    positives.sort_by(|a, b| b.partial_cmp(a).unwrap());
    negatives.sort_by(|a, b| a.partial_cmp(b).unwrap());

    penalize_chain(&positives) * penalize_chain(&negatives)
}

fn penalize_chain(deltas: &[f64]) -> f64 {
    let mut result = 1.0;
    for (i, delta) in deltas.iter().enumerate().take(MAX_PENALIZED_FACTORS) {
        let weight = PENALTY_BASE.powi((i * i) as i32);
        result *= 1.0 + delta * weight;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_is_identity() {
        assert_eq!(penalize(&[]), 1.0);
    }

    #[test]
    fn single_factor_passes_through() {
        assert_eq!(penalize(&[1.5]), 1.5);
        assert_eq!(penalize(&[0.7]), 0.7);
    }

    #[test]
    fn permutation_invariant() {
        let a = [1.5, 1.3, 1.1, 0.9];
        let mut b = a;
        b.reverse();
        assert!((penalize(&a) - penalize(&b)).abs() < 1e-12);
    }

    #[test]
    fn permutation_invariant_under_random_shuffles() {
        use rand::seq::SliceRandom;

        let base: Vec<f64> = vec![1.62, 1.3, 0.85, 1.05, 0.7, 1.18, 0.95];
        let baseline = penalize(&base);
        let mut rng = rand::rng();

        for _ in 0..50 {
            let mut shuffled = base.clone();
            shuffled.shuffle(&mut rng);
            assert!(
                (penalize(&shuffled) - baseline).abs() < 1e-9,
                "shuffled order changed the result: {shuffled:?}"
            );
        }
    }

    #[test]
    fn two_shield_extenders_match_worked_example() {
        // worked example: two post_percent +50% factors.
        let factors = [1.5, 1.5];
        let expected = 1.5 * (1.0 + 0.5 * PENALTY_BASE);
        assert!((penalize(&factors) - expected).abs() < 1e-9);
    }

    #[test]
    fn twelfth_factor_contributes_negligibly() {
        let mut eleven = vec![1.1; 11];
        let with_twelfth = {
            let mut v = eleven.clone();
            v.push(1.1);
            v
        };
        eleven.sort_by(|a, b| b.partial_cmp(a).unwrap());
        let r11 = penalize(&eleven);
        let r12 = penalize(&with_twelfth);
        assert!((r11 - r12).abs() < 1e-12);
    }

    #[test]
    fn signed_chains_penalized_independently() {
        // A +50% and a -20% should not cancel into a single chain rank.
        let mixed = penalize(&[1.5, 0.8]);
        let pos_only = penalize(&[1.5]);
        let neg_only = penalize(&[0.8]);
        assert!((mixed - pos_only * neg_only).abs() < 1e-12);
    }
}
