use serde::Serialize;

/// Which index return assumption feeds `annual_return_rate`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexChoice {
    Nasdaq,
    Sp500,
}

/// Inputs for the taxable index-tracking account. All rates are fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtfParameters {
    pub initial_monthly_payment: f64,
    pub annual_return_rate: f64,
    pub management_fee_rate: f64,
    pub withholding_tax_rate: f64,
    pub years: u32,
    pub annual_increase_rate: f64,
}

/// Inputs for the state-subsidized retirement account. All rates are fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BesParameters {
    pub initial_monthly_payment: f64,
    pub annual_return_rate: f64,
    pub management_fee_rate: f64,
    pub government_contribution_rate: f64,
    pub government_fund_return_rate: f64,
    pub years: u32,
    pub annual_increase_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EtfYearRecord {
    pub year: u32,
    pub monthly_payment: f64,
    pub year_contributions: f64,
    pub year_start_balance: f64,
    pub year_end_balance_before_tax: f64,
    pub year_gain: f64,
    pub withholding_tax: f64,
    pub year_end_balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BesYearRecord {
    pub year: u32,
    pub monthly_payment: f64,
    pub year_personal_contributions: f64,
    pub year_government_contributions: f64,
    pub year_start_personal: f64,
    pub year_start_government: f64,
    pub year_end_personal: f64,
    pub year_end_government: f64,
    pub year_end_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EtfProjection {
    pub total_balance: f64,
    pub total_contributions: f64,
    pub total_withholding_tax: f64,
    pub total_gain: f64,
    pub yearly_details: Vec<EtfYearRecord>,
}

impl EtfProjection {
    /// Growth before withholding tax was taken out.
    pub fn gross_gain(&self) -> f64 {
        self.total_gain + self.total_withholding_tax
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BesProjection {
    pub total_balance: f64,
    pub personal_balance: f64,
    pub government_balance: f64,
    pub total_personal_contributions: f64,
    pub total_government_contributions: f64,
    pub total_contributions: f64,
    /// Government contributions count as principal here, not as gain.
    pub total_gain: f64,
    pub yearly_details: Vec<BesYearRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonMetrics {
    pub bes_advantage: f64,
    /// Non-finite when the ETF ending balance is zero.
    pub bes_advantage_percentage: f64,
    pub total_personal_contributions: f64,
    pub total_government_contributions: f64,
    pub etf_withholding_tax: f64,
}

impl ComparisonMetrics {
    pub fn bes_outperforms(&self) -> bool {
        self.bes_advantage > 0.0
    }

    /// The advantage percentage, or `None` when it must not be displayed.
    pub fn advantage_ratio(&self) -> Option<f64> {
        self.bes_advantage_percentage
            .is_finite()
            .then_some(self.bes_advantage_percentage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyBalancePoint {
    pub year: u32,
    pub etf: f64,
    pub bes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub etf: EtfProjection,
    pub bes: BesProjection,
    pub comparison: ComparisonMetrics,
}

impl ComparisonResult {
    /// Year-end balances of both vehicles side by side, keyed on the ETF years.
    pub fn yearly_balances(&self) -> Vec<YearlyBalancePoint> {
        self.etf
            .yearly_details
            .iter()
            .enumerate()
            .map(|(idx, etf_year)| YearlyBalancePoint {
                year: etf_year.year,
                etf: etf_year.year_end_balance,
                bes: self
                    .bes
                    .yearly_details
                    .get(idx)
                    .map_or(0.0, |bes_year| bes_year.year_end_total),
            })
            .collect()
    }
}

/// Illustrative seed assumptions. Not financial advice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultParameters {
    pub current_age: u32,
    pub retirement_age: u32,
    pub initial_monthly_payment: f64,
    pub years: u32,
    pub annual_increase_rate: f64,
    pub management_fee_rate: f64,
    pub withholding_tax_rate: f64,
    pub government_contribution_rate: f64,
    pub government_fund_return_rate: f64,
    pub nasdaq_return_rate: f64,
    pub sp500_return_rate: f64,
}

impl DefaultParameters {
    pub fn return_rate(&self, index: IndexChoice) -> f64 {
        match index {
            IndexChoice::Nasdaq => self.nasdaq_return_rate,
            IndexChoice::Sp500 => self.sp500_return_rate,
        }
    }

    pub fn etf_parameters(&self, index: IndexChoice) -> EtfParameters {
        EtfParameters {
            initial_monthly_payment: self.initial_monthly_payment,
            annual_return_rate: self.return_rate(index),
            management_fee_rate: self.management_fee_rate,
            withholding_tax_rate: self.withholding_tax_rate,
            years: self.years,
            annual_increase_rate: self.annual_increase_rate,
        }
    }

    pub fn bes_parameters(&self, index: IndexChoice) -> BesParameters {
        BesParameters {
            initial_monthly_payment: self.initial_monthly_payment,
            annual_return_rate: self.return_rate(index),
            management_fee_rate: self.management_fee_rate,
            government_contribution_rate: self.government_contribution_rate,
            government_fund_return_rate: self.government_fund_return_rate,
            years: self.years,
            annual_increase_rate: self.annual_increase_rate,
        }
    }
}
