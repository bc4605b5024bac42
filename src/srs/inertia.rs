//! Learning-inertia forgetting model, used by the memorization-card queue.
//!
//! Recall decays as e^(−(1 − a) × t) over t days; the inertia `a` is itself
//! re-blended toward 1/(1 + failures) with a weight that halves every
//! `blend_half_life_days`. Callers apply `update_recall` only for successful
//! reviews; that gating lives at the call site, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::InertiaParams;
use crate::error::SrsError;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InertiaState {
    pub learning_inertia: Option<f64>,
    pub recall: Option<f64>,
    pub last_viewed: Option<DateTime<Utc>>,
}

impl InertiaState {
    pub fn unseen() -> Self {
        Self {
            learning_inertia: None,
            recall: None,
            last_viewed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InertiaModel {
    params: InertiaParams,
}

impl InertiaModel {
    pub fn new(params: InertiaParams) -> Self {
        Self { params }
    }

    fn elapsed_days(last_viewed: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        last_viewed
            .map(|prev| ((now - prev).num_milliseconds() as f64 / MILLIS_PER_DAY).max(0.0))
            .unwrap_or(0.0)
    }

    fn inertia_of(&self, state: &InertiaState) -> Result<f64, SrsError> {
        let a = state.learning_inertia.unwrap_or(self.params.default_inertia);
        if !a.is_finite() || a <= 0.0 || a > 1.0 {
            return Err(SrsError::InvalidParameter(format!(
                "learning_inertia must lie in (0, 1], got {a}"
            )));
        }
        Ok(a)
    }

    /// Registers a review: recomputes recall from the elapsed time, blends
    /// the inertia toward the failure-derived target, stamps `last_viewed`.
    /// Returns the new recall.
    pub fn update_recall(
        &self,
        state: &mut InertiaState,
        failures: i64,
        now: DateTime<Utc>,
    ) -> Result<f64, SrsError> {
        if failures < 0 {
            return Err(SrsError::InvalidParameter(format!(
                "failures must be non-negative, got {failures}"
            )));
        }

        let t_days = Self::elapsed_days(state.last_viewed, now);
        let a = self.inertia_of(state)?;

        let recall = (-(1.0 - a) * t_days).exp().clamp(0.0, 1.0);
        let lambda_t = 2.0_f64.powf(-t_days / self.params.blend_half_life_days);
        let target = 1.0 / (1.0 + failures as f64);
        let blended = lambda_t * a + (1.0 - lambda_t) * target;

        state.recall = Some(recall);
        state.learning_inertia = Some(blended);
        state.last_viewed = Some(now);

        Ok(recall)
    }

    /// Read-time refresh: ages the displayed recall without registering a
    /// review. Inertia and `last_viewed` stay untouched; a never-viewed
    /// card is left alone and yields `None`.
    pub fn recompute_recall(
        &self,
        state: &mut InertiaState,
        now: DateTime<Utc>,
    ) -> Result<Option<f64>, SrsError> {
        let Some(last_viewed) = state.last_viewed else {
            return Ok(None);
        };

        let t_days = Self::elapsed_days(Some(last_viewed), now);
        let a = self.inertia_of(state)?;
        let recall = (-(1.0 - a) * t_days).exp().clamp(0.0, 1.0);

        state.recall = Some(recall);
        Ok(Some(recall))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn model() -> InertiaModel {
        InertiaModel::new(InertiaParams::default())
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn first_review_yields_full_recall_and_keeps_inertia() {
        // unseen card, zero failures: t = 0 so recall = 1 and the blend
        // weight is 1, leaving the default inertia in place
        let mut state = InertiaState::unseen();
        let recall = model()
            .update_recall(&mut state, 0, ts(1_700_000_000))
            .unwrap();

        assert!((recall - 1.0).abs() < EPSILON);
        assert!((state.learning_inertia.unwrap() - 0.8).abs() < EPSILON);
        assert_eq!(state.last_viewed, Some(ts(1_700_000_000)));
    }

    #[test]
    fn recall_decays_with_elapsed_days() {
        let model = model();
        let mut state = InertiaState::unseen();
        model.update_recall(&mut state, 0, ts(1_700_000_000)).unwrap();

        let recall = model
            .update_recall(&mut state, 0, ts(1_700_000_000 + 10 * 86_400))
            .unwrap();

        // exp(-(1 - 0.8) * 10) = exp(-2)
        assert!((recall - (-2.0_f64).exp()).abs() < 1e-6);
    }

    #[test]
    fn failures_pull_inertia_down_over_time() {
        let model = model();
        let mut state = InertiaState::unseen();
        model.update_recall(&mut state, 0, ts(1_700_000_000)).unwrap();

        model
            .update_recall(&mut state, 4, ts(1_700_000_000 + 30 * 86_400))
            .unwrap();

        // lambda = 2^-1 = 0.5, target = 1/5: a' = 0.5*0.8 + 0.5*0.2 = 0.5
        assert!((state.learning_inertia.unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn recompute_is_noop_for_unseen_cards() {
        let mut state = InertiaState::unseen();
        let result = model().recompute_recall(&mut state, ts(1_700_000_000)).unwrap();

        assert!(result.is_none());
        assert!(state.recall.is_none());
        assert!(state.last_viewed.is_none());
    }

    #[test]
    fn recompute_ages_recall_without_registering_a_review() {
        let model = model();
        let mut state = InertiaState::unseen();
        model.update_recall(&mut state, 0, ts(1_700_000_000)).unwrap();
        let inertia_before = state.learning_inertia;

        let recall = model
            .recompute_recall(&mut state, ts(1_700_000_000 + 5 * 86_400))
            .unwrap()
            .unwrap();

        assert!((recall - (-1.0_f64).exp()).abs() < 1e-6);
        assert_eq!(state.learning_inertia, inertia_before);
        assert_eq!(state.last_viewed, Some(ts(1_700_000_000)));
    }

    #[test]
    fn rejects_negative_failures() {
        let mut state = InertiaState::unseen();
        assert!(matches!(
            model().update_recall(&mut state, -1, ts(0)),
            Err(SrsError::InvalidParameter(_))
        ));
        assert!(state.last_viewed.is_none(), "state mutated on rejection");
    }

    #[test]
    fn rejects_out_of_range_inertia() {
        let mut state = InertiaState {
            learning_inertia: Some(1.5),
            recall: None,
            last_viewed: Some(ts(1_700_000_000)),
        };
        assert!(matches!(
            model().update_recall(&mut state, 0, ts(1_700_086_400)),
            Err(SrsError::InvalidParameter(_))
        ));
    }
}
