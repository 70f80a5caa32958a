use super::types::DefaultParameters;

pub fn default_parameters() -> DefaultParameters {
    let current_age = 25;
    let retirement_age = 56;
    DefaultParameters {
        current_age,
        retirement_age,
        initial_monthly_payment: 1_000.0,
        years: retirement_age - current_age,
        annual_increase_rate: 0.10,
        management_fee_rate: 0.02,
        withholding_tax_rate: 0.15,
        government_contribution_rate: 0.30,
        government_fund_return_rate: 0.10,
        nasdaq_return_rate: 0.15,
        sp500_return_rate: 0.10,
    }
}
