//! AlphaTuner: effectiveness signals to a bounded mixing weight
//!
//! alpha = dense_eff / (dense_eff + sparse_eff), clamped to
//! [min_alpha, max_alpha]. The fallback is `dense_weight_default`, returned
//! unclamped, whenever tuning is disabled, the scorer came back unscored,
//! or both signals are exactly zero.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::HybridConfig;
use crate::scoring::Effectiveness;
use crate::types::ChannelKind;

/// Where an alpha came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphaSource {
    Dynamic,
    Fallback,
}

/// Mixing weight for one request; 1 favors dense fully, 0 favors sparse fully
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaResult {
    pub alpha: f64,
    pub source: AlphaSource,
}

impl AlphaResult {
    pub fn fallback(alpha: f64) -> Self {
        Self {
            alpha,
            source: AlphaSource::Fallback,
        }
    }

    /// Weight forced entirely onto the surviving channel
    pub fn single_channel(surviving: ChannelKind) -> Self {
        let alpha = match surviving {
            ChannelKind::Dense => 1.0,
            ChannelKind::Sparse => 0.0,
        };
        Self::fallback(alpha)
    }
}

/// Tuning parameters, copied out of the immutable configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaTuner {
    use_dynamic_tuning: bool,
    default_alpha: f64,
    min_alpha: f64,
    max_alpha: f64,
}

impl AlphaTuner {
    pub fn new(config: &HybridConfig) -> Self {
        Self {
            use_dynamic_tuning: config.retrieval.use_dynamic_tuning,
            default_alpha: config.weights.dense_weight_default,
            min_alpha: config.weights.min_alpha,
            max_alpha: config.weights.max_alpha,
        }
    }

    pub fn default_alpha(&self) -> f64 {
        self.default_alpha
    }

    /// Compute the mixing weight for one request
    pub fn tune(&self, effectiveness: &Effectiveness) -> AlphaResult {
        if !self.use_dynamic_tuning {
            debug!(alpha = self.default_alpha, "dynamic tuning disabled, using default alpha");
            return AlphaResult::fallback(self.default_alpha);
        }

        let (dense, sparse) = match effectiveness {
            Effectiveness::Scored { dense, sparse } => (*dense, *sparse),
            Effectiveness::Unscored(reason) => {
                debug!(?reason, alpha = self.default_alpha, "unscored, using default alpha");
                return AlphaResult::fallback(self.default_alpha);
            }
        };

        // 0/0 and NaN from a misbehaving judge
        let total = dense + sparse;
        if !total.is_finite() || total <= 0.0 {
            debug!(dense, sparse, alpha = self.default_alpha, "degenerate effectiveness, using default alpha");
            return AlphaResult::fallback(self.default_alpha);
        }

        let alpha = (dense / total).clamp(self.min_alpha, self.max_alpha);
        debug!(dense, sparse, alpha, "dynamic alpha");

        AlphaResult {
            alpha,
            source: AlphaSource::Dynamic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::UnscoredReason;
    use quickcheck_macros::quickcheck;

    fn tuner() -> AlphaTuner {
        AlphaTuner::new(&HybridConfig::default())
    }

    fn scored(dense: f64, sparse: f64) -> Effectiveness {
        Effectiveness::Scored { dense, sparse }
    }

    #[test]
    fn test_proportional_weighting() {
        let result = tuner().tune(&scored(0.8, 0.6));
        assert_eq!(result.source, AlphaSource::Dynamic);
        assert!((result.alpha - 0.8 / 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_is_not_rounded_or_case_split() {
        // 1/3 stays 1/3; a perfect dense score does not force alpha to 1
        assert!((tuner().tune(&scored(0.2, 0.4)).alpha - 1.0 / 3.0).abs() < 1e-12);
        assert!((tuner().tune(&scored(1.0, 0.6)).alpha - 1.0 / 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_sparse_zero_gives_full_dense() {
        let result = tuner().tune(&scored(0.4, 0.0));
        assert_eq!(result.alpha, 1.0);
        assert_eq!(result.source, AlphaSource::Dynamic);
    }

    #[test]
    fn test_dense_zero_gives_full_sparse() {
        assert_eq!(tuner().tune(&scored(0.0, 0.2)).alpha, 0.0);
    }

    #[test]
    fn test_both_zero_falls_back() {
        let result = tuner().tune(&scored(0.0, 0.0));
        assert_eq!(result, AlphaResult::fallback(0.5));
    }

    #[test]
    fn test_unscored_falls_back_unchanged() {
        let mut config = HybridConfig::default();
        config.weights.dense_weight_default = 0.7;
        config.weights.sparse_weight_default = 0.3;
        config.weights.min_alpha = 0.8;
        let tuner = AlphaTuner::new(&config);

        let result = tuner.tune(&Effectiveness::Unscored(UnscoredReason::Timeout));
        assert_eq!(result.alpha, 0.7);
        assert_eq!(result.source, AlphaSource::Fallback);
    }

    #[test]
    fn test_disabled_tuning_ignores_scores() {
        let mut config = HybridConfig::default();
        config.retrieval.use_dynamic_tuning = false;
        let result = AlphaTuner::new(&config).tune(&scored(1.0, 0.0));
        assert_eq!(result, AlphaResult::fallback(0.5));
    }

    #[test]
    fn test_clamps_apply_to_dynamic_alpha() {
        let mut config = HybridConfig::default();
        config.weights.min_alpha = 0.2;
        config.weights.max_alpha = 0.9;
        let tuner = AlphaTuner::new(&config);

        assert_eq!(tuner.tune(&scored(1.0, 0.0)).alpha, 0.9);
        assert_eq!(tuner.tune(&scored(0.0, 1.0)).alpha, 0.2);
    }

    #[test]
    fn test_nan_falls_back() {
        let result = tuner().tune(&scored(f64::NAN, 0.5));
        assert_eq!(result.source, AlphaSource::Fallback);
    }

    #[test]
    fn test_single_channel_alpha() {
        assert_eq!(AlphaResult::single_channel(ChannelKind::Dense).alpha, 1.0);
        assert_eq!(AlphaResult::single_channel(ChannelKind::Sparse).alpha, 0.0);
    }

    #[quickcheck]
    fn prop_alpha_always_in_unit_interval(dense: u8, sparse: u8) -> bool {
        let eff = scored(f64::from(dense % 6) / 5.0, f64::from(sparse % 6) / 5.0);
        let alpha = tuner().tune(&eff).alpha;
        (0.0..=1.0).contains(&alpha)
    }

    #[quickcheck]
    fn prop_more_dense_effectiveness_never_lowers_alpha(dense: u8, sparse: u8) -> bool {
        let d = f64::from(dense % 5) / 5.0;
        let s = f64::from(sparse % 6) / 5.0;
        let lower = tuner().tune(&scored(d, s));
        let higher = tuner().tune(&scored(d + 0.2, s));
        lower.source == AlphaSource::Fallback || higher.alpha >= lower.alpha
    }
}
