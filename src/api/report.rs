use std::fmt;

use super::CompareRequest;
use crate::core::{ComparisonResult, IndexChoice};
use crate::format::{format_currency, format_percentage};

fn index_label(index: IndexChoice) -> &'static str {
    match index {
        IndexChoice::Nasdaq => "Nasdaq",
        IndexChoice::Sp500 => "S&P 500",
    }
}

/// Plain-text summary and yearly table for terminal output.
pub fn render_report(request: &CompareRequest, result: &ComparisonResult) -> String {
    Report { request, result }.to_string()
}

struct Report<'a> {
    request: &'a CompareRequest,
    result: &'a ComparisonResult,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let etf = &self.result.etf;
        let bes = &self.result.bes;
        let metrics = &self.result.comparison;

        writeln!(
            f,
            "ETF vs BES over {} years ({} return {})",
            self.request.etf.years,
            index_label(self.request.index),
            format_percentage(self.request.etf.annual_return_rate * 100.0, 1),
        )?;
        writeln!(f)?;
        for (label, amount) in [
            ("ETF ending balance", etf.total_balance),
            ("  contributions", etf.total_contributions),
            ("  gross gain", etf.gross_gain()),
            ("  withholding tax", etf.total_withholding_tax),
            ("  net gain", etf.total_gain),
            ("BES ending balance", bes.total_balance),
            ("  personal contributions", bes.total_personal_contributions),
            ("  government contributions", bes.total_government_contributions),
            ("  net gain", bes.total_gain),
        ] {
            writeln!(f, "{label:<28}{:>16}", format_currency(amount))?;
        }
        writeln!(f)?;

        let leader = if metrics.bes_outperforms() { "BES" } else { "ETF" };
        let gap = format_currency(metrics.bes_advantage.abs());
        match metrics.advantage_ratio() {
            Some(ratio) => writeln!(
                f,
                "{leader} ahead by {gap} ({})",
                format_percentage(ratio.abs(), 1)
            )?,
            None => writeln!(
                f,
                "{leader} ahead by {gap} (ratio undefined: ETF balance is zero)"
            )?,
        }

        let yearly_balances = self.result.yearly_balances();
        if yearly_balances.is_empty() {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(
            f,
            "{:>4}  {:>16}  {:>16}  {:>14}",
            "Year", "ETF", "BES", "Monthly"
        )?;
        for (point, etf_year) in yearly_balances.iter().zip(&etf.yearly_details) {
            writeln!(
                f,
                "{:>4}  {:>16}  {:>16}  {:>14}",
                point.year,
                format_currency(point.etf),
                format_currency(point.bes),
                format_currency(etf_year.monthly_payment),
            )?;
        }
        Ok(())
    }
}
