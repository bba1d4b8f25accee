//! Two-point comparisons used by condition evaluation.

/// Line `a` moved from at-or-below `b` to strictly above it.
pub(crate) fn crossed_above(prev_a: f64, cur_a: f64, prev_b: f64, cur_b: f64) -> bool {
    prev_a <= prev_b && cur_a > cur_b
}

/// Line `a` moved from at-or-above `b` to strictly below it.
pub(crate) fn crossed_below(prev_a: f64, cur_a: f64, prev_b: f64, cur_b: f64) -> bool {
    prev_a >= prev_b && cur_a < cur_b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_needs_a_change_of_side() {
        assert!(crossed_above(9.0, 11.0, 10.0, 10.0));
        assert!(crossed_above(10.0, 10.5, 10.0, 10.0));
        assert!(!crossed_above(11.0, 12.0, 10.0, 10.0));
        assert!(!crossed_above(9.0, 10.0, 10.0, 10.0));

        assert!(crossed_below(11.0, 9.0, 10.0, 10.0));
        assert!(!crossed_below(9.0, 8.0, 10.0, 10.0));
    }
}
