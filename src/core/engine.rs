use tracing::{debug, warn};

use super::types::{
    BesParameters, BesProjection, BesYearRecord, ComparisonMetrics, ComparisonResult,
    EtfParameters, EtfProjection, EtfYearRecord,
};

const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug, Clone, Copy)]
struct SubBalanceYear {
    start: f64,
    end: f64,
    contributions: f64,
}

/// Deposits `monthly_deposit` then grows by `annual_net_rate / 12`, twelve times.
fn compound_sub_balance_year(
    balance: f64,
    monthly_deposit: f64,
    annual_net_rate: f64,
) -> SubBalanceYear {
    let monthly_rate = annual_net_rate / f64::from(MONTHS_PER_YEAR);
    let mut end = balance;
    let mut contributions = 0.0;
    for _ in 0..MONTHS_PER_YEAR {
        end += monthly_deposit;
        contributions += monthly_deposit;
        end *= 1.0 + monthly_rate;
    }
    SubBalanceYear {
        start: balance,
        end,
        contributions,
    }
}

fn withholding_tax_on_gain(year_gain: f64, withholding_tax_rate: f64) -> f64 {
    if year_gain > 0.0 {
        year_gain * withholding_tax_rate
    } else {
        0.0
    }
}

pub fn project_etf(params: &EtfParameters) -> EtfProjection {
    let net_rate = params.annual_return_rate - params.management_fee_rate;
    let mut balance = 0.0;
    let mut monthly_payment = params.initial_monthly_payment;
    let mut total_contributions = 0.0;
    let mut total_withholding_tax = 0.0;
    let mut yearly_details = Vec::new();

    for year in 1..=params.years {
        let grown = compound_sub_balance_year(balance, monthly_payment, net_rate);
        let year_gain = grown.end - grown.start - grown.contributions;
        let withholding_tax = withholding_tax_on_gain(year_gain, params.withholding_tax_rate);

        balance = grown.end - withholding_tax;
        total_contributions += grown.contributions;
        total_withholding_tax += withholding_tax;

        yearly_details.push(EtfYearRecord {
            year,
            monthly_payment,
            year_contributions: grown.contributions,
            year_start_balance: grown.start,
            year_end_balance_before_tax: grown.end,
            year_gain,
            withholding_tax,
            year_end_balance: balance,
        });

        monthly_payment *= 1.0 + params.annual_increase_rate;
    }

    debug!(
        years = params.years,
        total_balance = balance,
        total_withholding_tax,
        "etf projection complete"
    );

    EtfProjection {
        total_balance: balance,
        total_contributions,
        total_withholding_tax,
        total_gain: balance - total_contributions,
        yearly_details,
    }
}

pub fn project_bes(params: &BesParameters) -> BesProjection {
    let personal_rate = params.annual_return_rate - params.management_fee_rate;
    let government_rate = params.government_fund_return_rate - params.management_fee_rate;
    let mut personal = 0.0;
    let mut government = 0.0;
    let mut monthly_payment = params.initial_monthly_payment;
    let mut total_personal_contributions = 0.0;
    let mut total_government_contributions = 0.0;
    let mut yearly_details = Vec::new();

    for year in 1..=params.years {
        let personal_year = compound_sub_balance_year(personal, monthly_payment, personal_rate);
        let government_year = compound_sub_balance_year(
            government,
            monthly_payment * params.government_contribution_rate,
            government_rate,
        );

        personal = personal_year.end;
        government = government_year.end;
        total_personal_contributions += personal_year.contributions;
        total_government_contributions += government_year.contributions;

        yearly_details.push(BesYearRecord {
            year,
            monthly_payment,
            year_personal_contributions: personal_year.contributions,
            year_government_contributions: government_year.contributions,
            year_start_personal: personal_year.start,
            year_start_government: government_year.start,
            year_end_personal: personal,
            year_end_government: government,
            year_end_total: personal + government,
        });

        monthly_payment *= 1.0 + params.annual_increase_rate;
    }

    let total_balance = personal + government;
    let total_contributions = total_personal_contributions + total_government_contributions;

    debug!(
        years = params.years,
        total_balance,
        total_government_contributions,
        "bes projection complete"
    );

    BesProjection {
        total_balance,
        personal_balance: personal,
        government_balance: government,
        total_personal_contributions,
        total_government_contributions,
        total_contributions,
        total_gain: total_balance - total_contributions,
        yearly_details,
    }
}

pub fn compare(etf_params: &EtfParameters, bes_params: &BesParameters) -> ComparisonResult {
    let etf = project_etf(etf_params);
    let bes = project_bes(bes_params);

    let bes_advantage = bes.total_balance - etf.total_balance;
    let bes_advantage_percentage = (bes.total_balance / etf.total_balance - 1.0) * 100.0;
    if !bes_advantage_percentage.is_finite() {
        warn!(
            etf_total = etf.total_balance,
            "etf ending balance is zero; advantage percentage is undefined"
        );
    }

    let comparison = ComparisonMetrics {
        bes_advantage,
        bes_advantage_percentage,
        total_personal_contributions: etf.total_contributions,
        total_government_contributions: bes.total_government_contributions,
        etf_withholding_tax: etf.total_withholding_tax,
    };

    ComparisonResult {
        etf,
        bes,
        comparison,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IndexChoice, default_parameters};
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_etf() -> EtfParameters {
        EtfParameters {
            initial_monthly_payment: 1_000.0,
            annual_return_rate: 0.10,
            management_fee_rate: 0.02,
            withholding_tax_rate: 0.15,
            years: 1,
            annual_increase_rate: 0.0,
        }
    }

    fn sample_bes() -> BesParameters {
        BesParameters {
            initial_monthly_payment: 1_000.0,
            annual_return_rate: 0.10,
            management_fee_rate: 0.02,
            government_contribution_rate: 0.30,
            government_fund_return_rate: 0.10,
            years: 1,
            annual_increase_rate: 0.0,
        }
    }

    fn etf_from(
        payment: f64,
        return_bp: i32,
        fee_bp: i32,
        tax_bp: u32,
        years: u32,
        increase_bp: i32,
    ) -> EtfParameters {
        EtfParameters {
            initial_monthly_payment: payment,
            annual_return_rate: f64::from(return_bp) / 10_000.0,
            management_fee_rate: f64::from(fee_bp) / 10_000.0,
            withholding_tax_rate: f64::from(tax_bp) / 10_000.0,
            years,
            annual_increase_rate: f64::from(increase_bp) / 10_000.0,
        }
    }

    fn bes_from(
        payment: f64,
        return_bp: i32,
        fee_bp: i32,
        gov_rate_bp: u32,
        gov_return_bp: i32,
        years: u32,
        increase_bp: i32,
    ) -> BesParameters {
        BesParameters {
            initial_monthly_payment: payment,
            annual_return_rate: f64::from(return_bp) / 10_000.0,
            management_fee_rate: f64::from(fee_bp) / 10_000.0,
            government_contribution_rate: f64::from(gov_rate_bp) / 10_000.0,
            government_fund_return_rate: f64::from(gov_return_bp) / 10_000.0,
            years,
            annual_increase_rate: f64::from(increase_bp) / 10_000.0,
        }
    }

    #[test]
    fn compound_sub_balance_year_with_zero_rate_only_adds_deposits() {
        let year = compound_sub_balance_year(500.0, 100.0, 0.0);
        assert_approx(year.start, 500.0);
        assert_approx(year.end, 1_700.0);
        assert_approx(year.contributions, 1_200.0);
    }

    #[test]
    fn oracle_single_etf_year_matches_hand_calculation() {
        // 1000 * sum_{k=1..12} (1 + 0.08/12)^k = 12532.9255...
        let result = project_etf(&sample_etf());
        let year = result.yearly_details[0];

        assert_eq!(year.year, 1);
        assert_approx(year.year_contributions, 12_000.0);
        assert_approx(year.year_start_balance, 0.0);
        assert_approx_tol(year.year_end_balance_before_tax, 12_532.925_528, 1e-5);
        assert_approx_tol(year.year_gain, 532.925_528, 1e-5);
        assert_approx_tol(year.withholding_tax, 79.938_829, 1e-5);
        assert_approx_tol(year.year_end_balance, 12_452.986_699, 1e-5);

        assert_approx(result.total_balance, year.year_end_balance);
        assert_approx(result.total_contributions, 12_000.0);
        assert_approx(result.total_withholding_tax, year.withholding_tax);
        assert_approx(result.total_gain, result.total_balance - 12_000.0);
        assert_approx(result.gross_gain(), year.year_gain);
    }

    #[test]
    fn oracle_single_bes_year_splits_personal_and_government() {
        let result = project_bes(&sample_bes());
        let year = result.yearly_details[0];

        // Government sub-balance is 0.3 of the personal one when rates match.
        assert_approx_tol(year.year_end_personal, 12_532.925_528, 1e-5);
        assert_approx_tol(year.year_end_government, 3_759.877_658, 1e-5);
        assert_approx(year.year_personal_contributions, 12_000.0);
        assert_approx(year.year_government_contributions, 3_600.0);
        assert_eq!(year.year_end_total, year.year_end_personal + year.year_end_government);

        assert_approx(result.total_contributions, 15_600.0);
        assert_approx(result.total_gain, result.total_balance - 15_600.0);
        assert_approx(result.personal_balance, year.year_end_personal);
        assert_approx(result.government_balance, year.year_end_government);
    }

    #[test]
    fn government_fund_rate_applies_independently() {
        let mut params = sample_bes();
        params.government_fund_return_rate = params.management_fee_rate;
        let result = project_bes(&params);

        assert_approx(result.government_balance, 3_600.0);
        assert_approx_tol(result.personal_balance, 12_532.925_528, 1e-5);
    }

    #[test]
    fn etf_losses_are_not_taxed_or_rebated() {
        let mut params = sample_etf();
        params.annual_return_rate = -0.10;
        params.years = 3;
        let result = project_etf(&params);

        assert_approx(result.total_withholding_tax, 0.0);
        for year in &result.yearly_details {
            assert!(year.year_gain < 0.0);
            assert_approx(year.withholding_tax, 0.0);
            assert_eq!(year.year_end_balance, year.year_end_balance_before_tax);
        }
        assert!(result.total_balance < result.total_contributions);
        assert!(result.total_gain < 0.0);
    }

    #[test]
    fn zero_horizon_returns_empty_projections() {
        let mut etf = sample_etf();
        etf.years = 0;
        let mut bes = sample_bes();
        bes.years = 0;

        let result = compare(&etf, &bes);
        assert!(result.etf.yearly_details.is_empty());
        assert!(result.bes.yearly_details.is_empty());
        assert_eq!(result.etf.total_balance, 0.0);
        assert_eq!(result.etf.total_contributions, 0.0);
        assert_eq!(result.etf.total_withholding_tax, 0.0);
        assert_eq!(result.etf.total_gain, 0.0);
        assert_eq!(result.bes.total_balance, 0.0);
        assert_eq!(result.bes.total_contributions, 0.0);
        assert_eq!(result.bes.total_gain, 0.0);
        assert!(result.yearly_balances().is_empty());
    }

    #[test]
    fn zero_etf_balance_yields_undefined_advantage_ratio() {
        let mut etf = sample_etf();
        etf.years = 0;
        let bes = sample_bes();

        let result = compare(&etf, &bes);
        assert!(result.comparison.bes_advantage > 0.0);
        assert!(result.comparison.bes_advantage_percentage.is_infinite());
        assert_eq!(result.comparison.advantage_ratio(), None);

        let mut bes_empty = bes;
        bes_empty.years = 0;
        let both_empty = compare(&etf, &bes_empty);
        assert!(both_empty.comparison.bes_advantage_percentage.is_nan());
        assert_eq!(both_empty.comparison.advantage_ratio(), None);
        assert!(!both_empty.comparison.bes_outperforms());
    }

    #[test]
    fn comparison_passes_through_reporting_totals() {
        let defaults = default_parameters();
        let etf = defaults.etf_parameters(IndexChoice::Nasdaq);
        let bes = defaults.bes_parameters(IndexChoice::Nasdaq);
        let result = compare(&etf, &bes);

        assert_eq!(
            result.comparison.total_personal_contributions,
            result.etf.total_contributions
        );
        assert_eq!(
            result.comparison.total_government_contributions,
            result.bes.total_government_contributions
        );
        assert_eq!(
            result.comparison.etf_withholding_tax,
            result.etf.total_withholding_tax
        );
        assert_eq!(
            result.comparison.bes_advantage,
            result.bes.total_balance - result.etf.total_balance
        );
        let ratio = result.comparison.advantage_ratio().expect("finite ratio");
        assert_approx(
            ratio,
            (result.bes.total_balance / result.etf.total_balance - 1.0) * 100.0,
        );
    }

    #[test]
    fn yearly_balances_pair_etf_and_bes_year_ends() {
        let defaults = default_parameters();
        let result = compare(
            &defaults.etf_parameters(IndexChoice::Sp500),
            &defaults.bes_parameters(IndexChoice::Sp500),
        );
        let points = result.yearly_balances();

        assert_eq!(points.len(), 31);
        for (idx, point) in points.iter().enumerate() {
            assert_eq!(point.year, idx as u32 + 1);
            assert_eq!(point.etf, result.etf.yearly_details[idx].year_end_balance);
            assert_eq!(point.bes, result.bes.yearly_details[idx].year_end_total);
        }
    }

    #[test]
    fn yearly_balances_fill_missing_bes_years_with_zero() {
        let mut etf = sample_etf();
        etf.years = 3;
        let mut bes = sample_bes();
        bes.years = 1;

        let points = compare(&etf, &bes).yearly_balances();
        assert_eq!(points.len(), 3);
        assert!(points[0].bes > 0.0);
        assert_eq!(points[1].bes, 0.0);
        assert_eq!(points[2].bes, 0.0);
    }

    #[test]
    fn repeated_projections_are_identical() {
        let defaults = default_parameters();
        let etf = defaults.etf_parameters(IndexChoice::Nasdaq);
        let bes = defaults.bes_parameters(IndexChoice::Nasdaq);

        assert_eq!(project_etf(&etf), project_etf(&etf));
        assert_eq!(project_bes(&bes), project_bes(&bes));
        assert_eq!(compare(&etf, &bes), compare(&etf, &bes));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_etf_year_records_are_contiguous_and_consistent(
            payment in 1u32..20_000,
            return_bp in -2_000i32..3_000,
            fee_bp in 0i32..500,
            tax_bp in 0u32..5_000,
            years in 0u32..45,
            increase_bp in -5_000i32..3_000
        ) {
            let params = etf_from(f64::from(payment), return_bp, fee_bp, tax_bp, years, increase_bp);
            let result = project_etf(&params);

            prop_assert_eq!(result.yearly_details.len(), years as usize);
            let mut contribution_sum = 0.0;
            let mut tax_sum = 0.0;
            for (idx, record) in result.yearly_details.iter().enumerate() {
                prop_assert_eq!(record.year, idx as u32 + 1);
                prop_assert_eq!(
                    record.year_end_balance,
                    record.year_end_balance_before_tax - record.withholding_tax
                );
                if record.year_gain <= 0.0 {
                    prop_assert_eq!(record.withholding_tax, 0.0);
                } else {
                    prop_assert_eq!(
                        record.withholding_tax,
                        record.year_gain * params.withholding_tax_rate
                    );
                }
                contribution_sum += record.year_contributions;
                tax_sum += record.withholding_tax;
            }
            prop_assert_eq!(result.total_contributions, contribution_sum);
            prop_assert_eq!(result.total_withholding_tax, tax_sum);
            prop_assert_eq!(result.total_gain, result.total_balance - result.total_contributions);
        }

        #[test]
        fn prop_bes_year_records_are_contiguous_and_consistent(
            payment in 1u32..20_000,
            return_bp in -2_000i32..3_000,
            fee_bp in 0i32..500,
            gov_rate_bp in 0u32..5_000,
            gov_return_bp in -1_000i32..3_000,
            years in 0u32..45,
            increase_bp in -5_000i32..3_000
        ) {
            let params = bes_from(
                f64::from(payment), return_bp, fee_bp, gov_rate_bp, gov_return_bp, years, increase_bp,
            );
            let result = project_bes(&params);

            prop_assert_eq!(result.yearly_details.len(), years as usize);
            let mut personal_sum = 0.0;
            let mut government_sum = 0.0;
            for (idx, record) in result.yearly_details.iter().enumerate() {
                prop_assert_eq!(record.year, idx as u32 + 1);
                prop_assert_eq!(
                    record.year_end_total,
                    record.year_end_personal + record.year_end_government
                );
                personal_sum += record.year_personal_contributions;
                government_sum += record.year_government_contributions;
            }
            prop_assert_eq!(result.total_personal_contributions, personal_sum);
            prop_assert_eq!(result.total_government_contributions, government_sum);
            prop_assert_eq!(result.total_balance, result.personal_balance + result.government_balance);
            prop_assert_eq!(
                result.total_contributions,
                result.total_personal_contributions + result.total_government_contributions
            );
            prop_assert_eq!(result.total_gain, result.total_balance - result.total_contributions);
        }

        #[test]
        fn prop_monthly_payment_escalates_once_per_year(
            payment in 1u32..20_000,
            increase_bp in -5_000i32..3_000,
            years in 2u32..40
        ) {
            let etf = etf_from(f64::from(payment), 1_000, 200, 1_500, years, increase_bp);
            let bes = bes_from(f64::from(payment), 1_000, 200, 3_000, 1_000, years, increase_bp);
            let factor = 1.0 + f64::from(increase_bp) / 10_000.0;
            let result = compare(&etf, &bes);

            prop_assert_eq!(result.etf.yearly_details[0].monthly_payment, f64::from(payment));
            for pair in result.etf.yearly_details.windows(2) {
                prop_assert_eq!(pair[1].monthly_payment, pair[0].monthly_payment * factor);
            }
            for pair in result.bes.yearly_details.windows(2) {
                prop_assert_eq!(pair[1].monthly_payment, pair[0].monthly_payment * factor);
            }
        }

        #[test]
        fn prop_advantage_sign_matches_balance_order(
            payment in 1u32..20_000,
            return_bp in -500i32..3_000,
            fee_bp in 0i32..500,
            tax_bp in 0u32..5_000,
            gov_rate_bp in 0u32..5_000,
            gov_return_bp in -500i32..3_000,
            years in 1u32..45
        ) {
            let etf = etf_from(f64::from(payment), return_bp, fee_bp, tax_bp, years, 1_000);
            let bes = bes_from(
                f64::from(payment), return_bp, fee_bp, gov_rate_bp, gov_return_bp, years, 1_000,
            );
            let result = compare(&etf, &bes);

            prop_assert_eq!(
                result.comparison.bes_outperforms(),
                result.bes.total_balance > result.etf.total_balance
            );
            prop_assert_eq!(
                result.comparison.bes_advantage < 0.0,
                result.bes.total_balance < result.etf.total_balance
            );
            prop_assert!(result.comparison.bes_advantage_percentage.is_finite() == (result.etf.total_balance != 0.0));
        }
    }
}
