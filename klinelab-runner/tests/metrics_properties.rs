//! Property tests for metric functions and override typing.

use klinelab_runner::config::ParamValue;
use klinelab_runner::metrics::{max_drawdown_pct, sharpe_ratio};
use proptest::prelude::*;

proptest! {
    #[test]
    fn drawdown_is_a_percentage(values in prop::collection::vec(1.0..1e6f64, 0..200)) {
        let dd = max_drawdown_pct(&values);
        prop_assert!((0.0..100.0).contains(&dd));
    }

    #[test]
    fn monotone_curve_has_no_drawdown(start in 1.0..1e4f64, steps in prop::collection::vec(0.0..10.0f64, 1..100)) {
        let mut v = start;
        let curve: Vec<f64> = steps.iter().map(|s| { v += s; v }).collect();
        prop_assert_eq!(max_drawdown_pct(&curve), 0.0);
    }

    #[test]
    fn sharpe_ignores_capital_scale(
        values in prop::collection::vec(50.0..150.0f64, 3..100),
        scale in 0.1..100.0f64,
    ) {
        let scaled: Vec<f64> = values.iter().map(|v| v * scale).collect();
        match (sharpe_ratio(&values, 365.0), sharpe_ratio(&scaled, 365.0)) {
            (Some(a), Some(b)) => prop_assert!((a - b).abs() < 1e-6 * a.abs().max(1.0)),
            (None, None) => {}
            (a, b) => prop_assert!(false, "mismatch: {:?} vs {:?}", a, b),
        }
    }

    #[test]
    fn integers_auto_type_as_int(i in any::<i64>().prop_filter("bool literals", |i| *i != 0 && *i != 1)) {
        prop_assert_eq!(ParamValue::auto_type(&i.to_string()), ParamValue::Int(i));
    }
}
