use analysis_core::{FundamentalsRecord, ValuationError};
use serde::{Deserialize, Serialize};

/// Constants of the simplified discounted-cash-flow model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfAssumptions {
    /// Discount rate (weighted average cost of capital)
    pub wacc: f64,
    /// Perpetual growth after the projection horizon
    pub terminal_growth: f64,
    pub projection_years: u32,
    /// Share of operating profit that converts to free cash flow
    pub fcf_conversion: f64,
    /// Revenue proxy as a fraction of market capitalization
    pub revenue_to_market_cap: f64,
}

impl Default for DcfAssumptions {
    fn default() -> Self {
        Self {
            wacc: 0.08,
            terminal_growth: 0.03,
            projection_years: 5,
            fcf_conversion: 0.8,
            revenue_to_market_cap: 0.5,
        }
    }
}

impl DcfAssumptions {
    pub fn validate(&self) -> Result<(), ValuationError> {
        let finite = [
            ("wacc", self.wacc),
            ("terminal_growth", self.terminal_growth),
            ("fcf_conversion", self.fcf_conversion),
            ("revenue_to_market_cap", self.revenue_to_market_cap),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ValuationError::InvalidAssumption(format!("{name} must be finite, got {value}")));
        }
        if self.wacc <= -1.0 {
            return Err(ValuationError::InvalidAssumption(format!(
                "wacc must be greater than -100%, got {}",
                self.wacc
            )));
        }
        if self.projection_years == 0 {
            return Err(ValuationError::InvalidAssumption(
                "projection_years must be at least 1".to_string(),
            ));
        }
        self.horizon()?;
        if self.wacc <= self.terminal_growth {
            return Err(ValuationError::NonConvergentTerminal {
                wacc: self.wacc,
                terminal_growth: self.terminal_growth,
            });
        }
        Ok(())
    }

    /// Projection horizon as a `powi` exponent
    fn horizon(&self) -> Result<i32, ValuationError> {
        i32::try_from(self.projection_years).map_err(|_| {
            ValuationError::InvalidAssumption(format!(
                "projection_years must be at most {}, got {}",
                i32::MAX,
                self.projection_years
            ))
        })
    }
}

/// Inputs the model actually used, reported alongside the estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfInputs {
    pub wacc: f64,
    pub terminal_growth: f64,
    pub revenue_growth: f64,
    pub operating_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfValuation {
    pub value_per_share: f64,
    pub current_price: f64,
    /// (value_per_share - current_price) / current_price, percent
    pub upside_pct: f64,
    pub pv_cash_flows: f64,
    pub pv_terminal_value: f64,
    pub enterprise_value: f64,
    pub shares_outstanding: f64,
    pub assumptions: DcfInputs,
}

/// Simplified DCF: revenue and free cash flow are estimated from market cap
/// and operating margin, grown at the reported revenue growth, and discounted
/// at the configured WACC with a Gordon-growth terminal value.
pub fn discounted_cash_flow(
    current_price: f64,
    fundamentals: &FundamentalsRecord,
    assumptions: &DcfAssumptions,
) -> Result<DcfValuation, ValuationError> {
    assumptions.validate()?;

    let market_cap = fundamentals.market_cap;
    let growth = fundamentals.revenue_growth;
    let wacc = assumptions.wacc;
    let tg = assumptions.terminal_growth;
    let years = assumptions.horizon()?;

    let estimated_revenue = market_cap * assumptions.revenue_to_market_cap;
    let base_fcf = estimated_revenue * fundamentals.operating_margin * assumptions.fcf_conversion;

    let pv_cash_flows: f64 = (1..=years)
        .map(|year| base_fcf * (1.0 + growth).powi(year) / (1.0 + wacc).powi(year))
        .sum();

    let terminal_fcf = base_fcf * (1.0 + growth).powi(years) * (1.0 + tg);
    let terminal_value = terminal_fcf / (wacc - tg);
    let pv_terminal_value = terminal_value / (1.0 + wacc).powi(years);

    let enterprise_value = pv_cash_flows + pv_terminal_value;

    let shares_outstanding = if current_price > 0.0 {
        market_cap / current_price
    } else {
        tracing::warn!(current_price, "Non-positive price in DCF, assuming a single share");
        1.0
    };
    let value_per_share = if shares_outstanding > 0.0 {
        enterprise_value / shares_outstanding
    } else {
        0.0
    };
    let upside_pct = if current_price > 0.0 {
        (value_per_share - current_price) / current_price * 100.0
    } else {
        0.0
    };

    Ok(DcfValuation {
        value_per_share,
        current_price,
        upside_pct,
        pv_cash_flows,
        pv_terminal_value,
        enterprise_value,
        shares_outstanding,
        assumptions: DcfInputs {
            wacc,
            terminal_growth: tg,
            revenue_growth: growth,
            operating_margin: fundamentals.operating_margin,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fundamentals(margin: f64, growth: f64) -> FundamentalsRecord {
        FundamentalsRecord {
            market_cap: 1_000_000_000.0,
            operating_margin: margin,
            revenue_growth: growth,
            ..Default::default()
        }
    }

    #[test]
    fn test_known_values_zero_growth() {
        // revenue 500M, fcf 500M * 0.2 * 0.8 = 80M
        let result = discounted_cash_flow(10.0, &fundamentals(0.2, 0.0), &DcfAssumptions::default()).unwrap();

        let annuity: f64 = (1..=5).map(|y| 80e6 / 1.08f64.powi(y)).sum();
        let terminal = 80e6 * 1.03 / 0.05 / 1.08f64.powi(5);
        assert!((result.pv_cash_flows - annuity).abs() < 1e-3);
        assert!((result.pv_terminal_value - terminal).abs() < 1e-3);
        assert!((result.shares_outstanding - 1e8).abs() < 1e-6);
        assert!((result.value_per_share - (annuity + terminal) / 1e8).abs() < 1e-9);
        assert_eq!(result.assumptions.operating_margin, 0.2);
    }

    #[test]
    fn test_monotonic_in_operating_margin() {
        let assumptions = DcfAssumptions::default();
        let mut previous = f64::NEG_INFINITY;
        for margin in [-0.1, 0.0, 0.05, 0.1, 0.2, 0.35, 0.5] {
            let value = discounted_cash_flow(25.0, &fundamentals(margin, 0.04), &assumptions)
                .unwrap()
                .value_per_share;
            assert!(value > previous, "margin {margin} did not increase value");
            previous = value;
        }
    }

    #[test]
    fn test_terminal_growth_must_be_below_wacc() {
        for tg in [0.08, 0.09] {
            let assumptions = DcfAssumptions {
                terminal_growth: tg,
                ..Default::default()
            };
            let err = discounted_cash_flow(10.0, &fundamentals(0.2, 0.05), &assumptions).unwrap_err();
            assert!(matches!(err, ValuationError::NonConvergentTerminal { .. }));
        }
    }

    #[test]
    fn test_invalid_assumptions() {
        let nan = DcfAssumptions {
            wacc: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(nan.validate(), Err(ValuationError::InvalidAssumption(_))));

        let no_years = DcfAssumptions {
            projection_years: 0,
            ..Default::default()
        };
        assert!(matches!(no_years.validate(), Err(ValuationError::InvalidAssumption(_))));
    }

    #[test]
    fn test_horizon_beyond_i32_rejected() {
        let too_long = DcfAssumptions {
            projection_years: i32::MAX as u32 + 1,
            ..Default::default()
        };
        assert!(matches!(too_long.validate(), Err(ValuationError::InvalidAssumption(_))));
        assert!(matches!(
            discounted_cash_flow(10.0, &fundamentals(0.2, 0.05), &too_long),
            Err(ValuationError::InvalidAssumption(_))
        ));
    }

    #[test]
    fn test_non_positive_price_uses_single_share() {
        let result = discounted_cash_flow(0.0, &fundamentals(0.2, 0.0), &DcfAssumptions::default()).unwrap();
        assert_eq!(result.shares_outstanding, 1.0);
        assert_eq!(result.value_per_share, result.enterprise_value);
        assert_eq!(result.upside_pct, 0.0);
    }

    #[test]
    fn test_missing_market_cap_values_zero() {
        let record = FundamentalsRecord {
            operating_margin: 0.3,
            ..Default::default()
        };
        let result = discounted_cash_flow(10.0, &record, &DcfAssumptions::default()).unwrap();
        assert_eq!(result.value_per_share, 0.0);
    }
}
