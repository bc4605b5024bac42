use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionParams {
    /// Per-day exponential decay rate applied to the recall ratio.
    pub lambda_decay: f64,
    /// Pseudo-count added to `recall_failures` when the user needed a lookup.
    pub lookup_penalty: f64,
    /// Beta-prior defaults for newly created entries.
    pub default_alpha: f64,
    pub default_beta: f64,
    /// Retention assigned to an entry before its first review.
    pub initial_retention: f64,
}

impl Default for RetentionParams {
    fn default() -> Self {
        Self {
            lambda_decay: 0.1,
            lookup_penalty: 2.0,
            default_alpha: 1.0,
            default_beta: 10.0,
            initial_retention: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InertiaParams {
    /// Inertia assumed for cards that have never been reviewed.
    pub default_inertia: f64,
    /// Half-life (days) of the blending weight between old inertia and the
    /// failure-derived target.
    pub blend_half_life_days: f64,
}

impl Default for InertiaParams {
    fn default() -> Self {
        Self {
            default_inertia: 0.8,
            blend_half_life_days: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Queue size when the caller does not pass an explicit limit.
    pub default_daily_limit: usize,
    /// Weight used in place of `1 - recall` for cards never scored.
    pub unseen_weight: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            default_daily_limit: 10,
            unseen_weight: 0.8,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SrsConfig {
    pub retention: RetentionParams,
    pub inertia: InertiaParams,
    pub selector: SelectorConfig,
}

impl SrsConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SRS_LAMBDA_DECAY") {
            config.retention.lambda_decay = val.parse().unwrap_or(config.retention.lambda_decay);
        }
        if let Ok(val) = std::env::var("SRS_LOOKUP_PENALTY") {
            config.retention.lookup_penalty = val.parse().unwrap_or(config.retention.lookup_penalty);
        }
        if let Ok(val) = std::env::var("SRS_DEFAULT_INERTIA") {
            config.inertia.default_inertia = val.parse().unwrap_or(config.inertia.default_inertia);
        }
        if let Ok(val) = std::env::var("SRS_DAILY_LIMIT") {
            config.selector.default_daily_limit =
                val.parse().unwrap_or(config.selector.default_daily_limit);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_model_constants() {
        let config = SrsConfig::default();
        assert!((config.retention.lambda_decay - 0.1).abs() < 1e-12);
        assert!((config.retention.lookup_penalty - 2.0).abs() < 1e-12);
        assert!((config.retention.default_alpha - 1.0).abs() < 1e-12);
        assert!((config.retention.default_beta - 10.0).abs() < 1e-12);
        assert!((config.inertia.default_inertia - 0.8).abs() < 1e-12);
        assert!((config.inertia.blend_half_life_days - 30.0).abs() < 1e-12);
        assert_eq!(config.selector.default_daily_limit, 10);
    }

    #[test]
    fn env_overrides_apply_and_garbage_falls_back() {
        std::env::set_var("SRS_LAMBDA_DECAY", "0.25");
        std::env::set_var("SRS_DAILY_LIMIT", "20");
        let config = SrsConfig::from_env();
        assert!((config.retention.lambda_decay - 0.25).abs() < 1e-12);
        assert_eq!(config.selector.default_daily_limit, 20);
        // untouched knobs keep their defaults
        assert!((config.retention.lookup_penalty - 2.0).abs() < 1e-12);

        std::env::set_var("SRS_LAMBDA_DECAY", "not-a-number");
        let config = SrsConfig::from_env();
        assert!((config.retention.lambda_decay - 0.1).abs() < 1e-12);

        std::env::remove_var("SRS_LAMBDA_DECAY");
        std::env::remove_var("SRS_DAILY_LIMIT");
    }
}
