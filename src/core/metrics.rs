//! Metrics engine: closed-form growth and unit-economics figures for one
//! startup, plus the Good/Risky viability rule.
//!
//! Everything here is pure. The same input always yields a bit-identical
//! report.

use crate::domain::model::{DomainError, StartupInput, StartupReport, Viability};
use serde::{Deserialize, Serialize};

pub const HORIZON_MONTHS: u32 = 60;
pub const HORIZON_YEARS: u32 = 5;
pub const RATIO_THRESHOLD: f64 = 3.0;
pub const MARGIN_THRESHOLD: f64 = 0.4;
pub const CAGR_THRESHOLD: f64 = 0.20;

/// Horizon and decision thresholds. Defaults are the standard business rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsPolicy {
    pub horizon_months: u32,
    pub horizon_years: u32,
    pub ratio_threshold: f64,
    pub margin_threshold: f64,
    pub cagr_threshold: f64,
}

impl Default for MetricsPolicy {
    fn default() -> Self {
        Self {
            horizon_months: HORIZON_MONTHS,
            horizon_years: HORIZON_YEARS,
            ratio_threshold: RATIO_THRESHOLD,
            margin_threshold: MARGIN_THRESHOLD,
            cagr_threshold: CAGR_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitEconomics {
    pub ratio: f64,
    pub healthy: bool,
}

/// Monthly revenue after `horizon_months` of compounding at
/// `growth_rate_pct` percent per month. Large results are not clamped.
pub fn project_revenue(monthly_revenue: f64, growth_rate_pct: f64, horizon_months: u32) -> f64 {
    let monthly_factor = 1.0 + growth_rate_pct / 100.0;
    let growth = match i32::try_from(horizon_months) {
        Ok(months) => monthly_factor.powi(months),
        Err(_) => monthly_factor.powf(f64::from(horizon_months)),
    };
    monthly_revenue * growth
}

/// Compound annual growth rate from `start_value` to `end_value` over `years`.
pub fn compute_cagr(start_value: f64, end_value: f64, years: u32) -> Result<f64, DomainError> {
    if years == 0 {
        return Err(DomainError::ZeroHorizon);
    }
    if !start_value.is_finite() {
        return Err(DomainError::NonFinite {
            what: "start value",
            value: start_value,
        });
    }
    if start_value <= 0.0 {
        return Err(DomainError::NonPositiveStart { start: start_value });
    }

    let multiple = end_value / start_value;
    if multiple < 0.0 {
        return Err(DomainError::NegativeGrowthBase {
            start: start_value,
            end: end_value,
        });
    }

    let cagr = multiple.powf(1.0 / f64::from(years)) - 1.0;
    if !cagr.is_finite() {
        return Err(DomainError::NonFinite {
            what: "CAGR",
            value: cagr,
        });
    }
    Ok(cagr)
}

/// LTV/CAC ratio and the health flag. A non-positive CAC yields a ratio of 0.
pub fn evaluate_unit_economics(
    cac: f64,
    ltv: f64,
    gross_margin: f64,
    ratio_threshold: f64,
    margin_threshold: f64,
) -> UnitEconomics {
    let ratio = if cac > 0.0 { ltv / cac } else { 0.0 };
    UnitEconomics {
        ratio,
        healthy: ratio > ratio_threshold && gross_margin > margin_threshold,
    }
}

/// `Good` only when unit economics are healthy and CAGR strictly exceeds the threshold.
pub fn classify_viability(cagr: f64, healthy: bool, cagr_threshold: f64) -> Viability {
    if healthy && cagr > cagr_threshold {
        Viability::Good
    } else {
        Viability::Risky
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsEngine {
    policy: MetricsPolicy,
}

impl MetricsEngine {
    pub fn new(policy: MetricsPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MetricsPolicy {
        &self.policy
    }

    pub fn assess(&self, input: &StartupInput) -> Result<StartupReport, DomainError> {
        let projected = project_revenue(
            input.monthly_revenue,
            input.expected_growth_rate_pct,
            self.policy.horizon_months,
        );
        let cagr = compute_cagr(input.monthly_revenue, projected, self.policy.horizon_years)?;
        let economics = evaluate_unit_economics(
            input.cac,
            input.ltv,
            input.gross_margin,
            self.policy.ratio_threshold,
            self.policy.margin_threshold,
        );
        let viability = classify_viability(cagr, economics.healthy, self.policy.cagr_threshold);

        Ok(StartupReport {
            projected_revenue_5y: projected,
            cagr,
            ltv_to_cac_ratio: economics.ratio,
            healthy_unit_economics: economics.healthy,
            investment_viability: viability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(revenue: f64, growth: f64, cac: f64, ltv: f64, margin: f64) -> StartupInput {
        StartupInput {
            monthly_revenue: revenue,
            expected_growth_rate_pct: growth,
            cac,
            ltv,
            gross_margin: margin,
        }
    }

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {} ± {}, got {}",
            expected,
            tolerance,
            actual
        );
    }

    #[test]
    fn test_project_revenue_compounds_monthly() {
        assert_close(project_revenue(10_000.0, 5.0, 60), 186_791.86, 0.01);
        assert_eq!(project_revenue(1_000.0, 0.0, 60), 1_000.0);
        assert!(project_revenue(8_000.0, -2.0, 60) < 8_000.0);
    }

    #[test]
    fn test_project_revenue_passes_overflow_through() {
        assert_eq!(project_revenue(1.0e300, 1_000.0, 60), f64::INFINITY);
    }

    #[test]
    fn test_cagr_rejects_non_positive_start() {
        assert_eq!(
            compute_cagr(0.0, 100.0, 5),
            Err(DomainError::NonPositiveStart { start: 0.0 })
        );
        assert!(matches!(
            compute_cagr(-10.0, 100.0, 5),
            Err(DomainError::NonPositiveStart { .. })
        ));
    }

    #[test]
    fn test_cagr_rejects_negative_multiple() {
        assert!(matches!(
            compute_cagr(100.0, -5.0, 5),
            Err(DomainError::NegativeGrowthBase { .. })
        ));
    }

    #[test]
    fn test_cagr_of_total_loss_is_minus_one() {
        assert_eq!(compute_cagr(100.0, 0.0, 5), Ok(-1.0));
    }

    #[test]
    fn test_cagr_rejects_infinite_end_value() {
        assert!(matches!(
            compute_cagr(1.0, f64::INFINITY, 5),
            Err(DomainError::NonFinite { .. })
        ));
        assert!(matches!(
            compute_cagr(1.0, f64::NAN, 5),
            Err(DomainError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_cagr_rejects_zero_year_horizon() {
        assert_eq!(compute_cagr(100.0, 200.0, 0), Err(DomainError::ZeroHorizon));
    }

    #[test]
    fn test_project_revenue_handles_horizons_beyond_i32() {
        assert_eq!(project_revenue(1_000.0, 0.0, u32::MAX), 1_000.0);
        assert_eq!(project_revenue(1_000.0, 5.0, u32::MAX), f64::INFINITY);
        assert_eq!(project_revenue(1_000.0, -5.0, u32::MAX), 0.0);
    }

    #[test]
    fn test_assess_with_unvalidated_zero_year_policy() {
        let policy = MetricsPolicy {
            horizon_years: 0,
            ..MetricsPolicy::default()
        };
        let err = MetricsEngine::new(policy)
            .assess(&input(10_000.0, 5.0, 200.0, 1_000.0, 0.5))
            .unwrap_err();
        assert_eq!(err, DomainError::ZeroHorizon);
    }

    #[test]
    fn test_cagr_doubling() {
        assert_close(compute_cagr(100.0, 200.0, 1).unwrap(), 1.0, 1e-12);
        assert_close(compute_cagr(100.0, 100.0, 5).unwrap(), 0.0, 1e-12);
    }

    #[test]
    fn test_zero_or_negative_cac_gives_zero_ratio() {
        for cac in [0.0, -1.0, -500.0] {
            let economics =
                evaluate_unit_economics(cac, 10_000.0, 0.9, RATIO_THRESHOLD, MARGIN_THRESHOLD);
            assert_eq!(economics.ratio, 0.0);
            assert!(!economics.healthy);
        }
    }

    #[test]
    fn test_low_margin_is_never_healthy() {
        for margin in [0.0, 0.2, 0.4] {
            let economics =
                evaluate_unit_economics(1.0, 1_000.0, margin, RATIO_THRESHOLD, MARGIN_THRESHOLD);
            assert_eq!(economics.ratio, 1_000.0);
            assert!(!economics.healthy);
        }
    }

    #[test]
    fn test_ratio_threshold_is_strict() {
        let at = evaluate_unit_economics(100.0, 300.0, 0.5, RATIO_THRESHOLD, MARGIN_THRESHOLD);
        assert_eq!(at.ratio, 3.0);
        assert!(!at.healthy);

        let above = evaluate_unit_economics(100.0, 301.0, 0.5, RATIO_THRESHOLD, MARGIN_THRESHOLD);
        assert!(above.healthy);
    }

    #[test]
    fn test_viability_boundary() {
        assert_eq!(classify_viability(0.20, true, CAGR_THRESHOLD), Viability::Risky);
        assert_eq!(classify_viability(0.2000001, true, CAGR_THRESHOLD), Viability::Good);
        assert_eq!(classify_viability(5.0, false, CAGR_THRESHOLD), Viability::Risky);
    }

    #[test]
    fn test_assess_fast_growing_healthy_startup() {
        let report = MetricsEngine::default()
            .assess(&input(10_000.0, 5.0, 200.0, 1_000.0, 0.5))
            .unwrap();

        assert_eq!(report.ltv_to_cac_ratio, 5.0);
        assert!(report.healthy_unit_economics);
        assert_close(report.projected_revenue_5y, 186_791.86, 0.01);
        assert_close(report.cagr, 0.7959, 1e-4);
        assert_eq!(report.investment_viability, Viability::Good);
    }

    #[test]
    fn test_assess_weak_unit_economics() {
        let report = MetricsEngine::default()
            .assess(&input(5_000.0, 1.0, 500.0, 800.0, 0.3))
            .unwrap();

        assert_close(report.ltv_to_cac_ratio, 1.6, 1e-12);
        assert!(!report.healthy_unit_economics);
        assert_eq!(report.investment_viability, Viability::Risky);
    }

    #[test]
    fn test_assess_zero_revenue_fails() {
        let err = MetricsEngine::default()
            .assess(&input(0.0, 10.0, 100.0, 500.0, 0.6))
            .unwrap_err();
        assert_eq!(err, DomainError::NonPositiveStart { start: 0.0 });
    }

    #[test]
    fn test_assess_declining_startup() {
        let report = MetricsEngine::default()
            .assess(&input(8_000.0, -2.0, 300.0, 1_200.0, 0.45))
            .unwrap();

        assert!(report.projected_revenue_5y < 8_000.0);
        assert!(report.cagr < 0.0);
        assert_eq!(report.ltv_to_cac_ratio, 4.0);
        assert!(report.healthy_unit_economics);
        assert_eq!(report.investment_viability, Viability::Risky);
    }

    #[test]
    fn test_assess_is_deterministic() {
        let engine = MetricsEngine::default();
        let startup = input(12_345.6, 3.3, 210.0, 990.0, 0.55);
        let first = engine.assess(&startup).unwrap();
        let second = engine.assess(&startup).unwrap();
        assert_eq!(first.projected_revenue_5y.to_bits(), second.projected_revenue_5y.to_bits());
        assert_eq!(first.cagr.to_bits(), second.cagr.to_bits());
        assert_eq!(first, second);
    }

    #[test]
    fn test_assess_with_custom_policy() {
        let policy = MetricsPolicy {
            cagr_threshold: 0.9,
            ..MetricsPolicy::default()
        };
        let report = MetricsEngine::new(policy)
            .assess(&input(10_000.0, 5.0, 200.0, 1_000.0, 0.5))
            .unwrap();
        assert_eq!(report.investment_viability, Viability::Risky);
    }
}
