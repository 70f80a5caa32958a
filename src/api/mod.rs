use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    BesParameters, BesProjection, ComparisonMetrics, ComparisonResult, DefaultParameters,
    EtfParameters, EtfProjection, IndexChoice, YearlyBalancePoint, compare, default_parameters,
};

mod report;

pub use report::render_report;

const MAX_AGE: u32 = 120;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("--retirement-age ({retirement_age}) must be >= --current-age ({current_age})")]
    RetirementBeforeCurrentAge {
        current_age: u32,
        retirement_age: u32,
    },
    #[error("{name} must be <= {}, got {value}", MAX_AGE)]
    AgeAboveLimit { name: &'static str, value: u32 },
    #[error("--initial-monthly-payment must be a positive amount, got {0}")]
    NonPositivePayment(f64),
    #[error("{name} must be between 0 and 100, got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },
    #[error("{name} must be > -100, got {value}")]
    RateBelowTotalLoss { name: &'static str, value: f64 },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliIndexChoice {
    Nasdaq,
    Sp500,
}

impl From<CliIndexChoice> for IndexChoice {
    fn from(value: CliIndexChoice) -> Self {
        match value {
            CliIndexChoice::Nasdaq => IndexChoice::Nasdaq,
            CliIndexChoice::Sp500 => IndexChoice::Sp500,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiIndexChoice {
    #[serde(alias = "NASDAQ")]
    Nasdaq,
    #[serde(alias = "s&p500", alias = "sp-500", alias = "SP500")]
    Sp500,
}

impl From<ApiIndexChoice> for CliIndexChoice {
    fn from(value: ApiIndexChoice) -> Self {
        match value {
            ApiIndexChoice::Nasdaq => CliIndexChoice::Nasdaq,
            ApiIndexChoice::Sp500 => CliIndexChoice::Sp500,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    initial_monthly_payment: Option<f64>,
    annual_increase_rate: Option<f64>,
    selected_index: Option<ApiIndexChoice>,
    nasdaq_return_rate: Option<f64>,
    sp500_return_rate: Option<f64>,
    management_fee_rate: Option<f64>,
    withholding_tax_rate: Option<f64>,
    government_contribution_rate: Option<f64>,
    government_fund_return_rate: Option<f64>,
}

/// Rates are entered in percent and converted to fractions in `build_request`.
#[derive(Parser, Debug)]
#[command(
    name = "etfbes",
    about = "Compare a taxable ETF account with a government-matched BES account"
)]
struct Cli {
    #[arg(long, default_value_t = 25)]
    current_age: u32,
    #[arg(long, default_value_t = 56)]
    retirement_age: u32,
    #[arg(long, default_value_t = 1000.0, help = "Contribution in the first month")]
    initial_monthly_payment: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Yearly escalation of the monthly contribution in percent"
    )]
    annual_increase_rate: f64,
    #[arg(long, value_enum, default_value_t = CliIndexChoice::Nasdaq)]
    selected_index: CliIndexChoice,
    #[arg(long, default_value_t = 15.0, help = "Expected Nasdaq annual return in percent")]
    nasdaq_return_rate: f64,
    #[arg(long, default_value_t = 10.0, help = "Expected S&P 500 annual return in percent")]
    sp500_return_rate: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Annual management fee in percent, charged on both accounts"
    )]
    management_fee_rate: f64,
    #[arg(
        long,
        default_value_t = 15.0,
        help = "Withholding tax on positive yearly ETF gain in percent"
    )]
    withholding_tax_rate: f64,
    #[arg(
        long,
        default_value_t = 30.0,
        help = "Government match on each BES contribution in percent"
    )]
    government_contribution_rate: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Annual return of the government sub-balance in percent"
    )]
    government_fund_return_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareRequest {
    pub index: IndexChoice,
    pub etf: EtfParameters,
    pub bes: BesParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    selected_index: IndexChoice,
    years: u32,
    etf: EtfProjection,
    bes: BesProjection,
    comparison: ComparisonMetrics,
    advantage_ratio_defined: bool,
    yearly_balances: Vec<YearlyBalancePoint>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn check_percent_range(name: &'static str, value: f64) -> Result<(), InputError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(InputError::RateOutOfRange { name, value });
    }
    Ok(())
}

fn check_above_total_loss(name: &'static str, value: f64) -> Result<(), InputError> {
    if !value.is_finite() || value <= -100.0 {
        return Err(InputError::RateBelowTotalLoss { name, value });
    }
    Ok(())
}

fn build_request(cli: Cli) -> Result<CompareRequest, InputError> {
    for (name, value) in [
        ("--current-age", cli.current_age),
        ("--retirement-age", cli.retirement_age),
    ] {
        if value > MAX_AGE {
            return Err(InputError::AgeAboveLimit { name, value });
        }
    }

    if cli.retirement_age < cli.current_age {
        return Err(InputError::RetirementBeforeCurrentAge {
            current_age: cli.current_age,
            retirement_age: cli.retirement_age,
        });
    }

    if !cli.initial_monthly_payment.is_finite() || cli.initial_monthly_payment <= 0.0 {
        return Err(InputError::NonPositivePayment(cli.initial_monthly_payment));
    }

    check_percent_range("--management-fee-rate", cli.management_fee_rate)?;
    check_percent_range("--withholding-tax-rate", cli.withholding_tax_rate)?;
    check_percent_range(
        "--government-contribution-rate",
        cli.government_contribution_rate,
    )?;
    check_above_total_loss("--annual-increase-rate", cli.annual_increase_rate)?;
    check_above_total_loss("--nasdaq-return-rate", cli.nasdaq_return_rate)?;
    check_above_total_loss("--sp500-return-rate", cli.sp500_return_rate)?;
    check_above_total_loss(
        "--government-fund-return-rate",
        cli.government_fund_return_rate,
    )?;

    let defaults = DefaultParameters {
        current_age: cli.current_age,
        retirement_age: cli.retirement_age,
        initial_monthly_payment: cli.initial_monthly_payment,
        years: cli.retirement_age - cli.current_age,
        annual_increase_rate: cli.annual_increase_rate / 100.0,
        management_fee_rate: cli.management_fee_rate / 100.0,
        withholding_tax_rate: cli.withholding_tax_rate / 100.0,
        government_contribution_rate: cli.government_contribution_rate / 100.0,
        government_fund_return_rate: cli.government_fund_return_rate / 100.0,
        nasdaq_return_rate: cli.nasdaq_return_rate / 100.0,
        sp500_return_rate: cli.sp500_return_rate / 100.0,
    };
    let index = cli.selected_index.into();

    Ok(CompareRequest {
        index,
        etf: defaults.etf_parameters(index),
        bes: defaults.bes_parameters(index),
    })
}

fn default_cli() -> Cli {
    let defaults = default_parameters();
    Cli {
        current_age: defaults.current_age,
        retirement_age: defaults.retirement_age,
        initial_monthly_payment: defaults.initial_monthly_payment,
        annual_increase_rate: defaults.annual_increase_rate * 100.0,
        selected_index: CliIndexChoice::Nasdaq,
        nasdaq_return_rate: defaults.nasdaq_return_rate * 100.0,
        sp500_return_rate: defaults.sp500_return_rate * 100.0,
        management_fee_rate: defaults.management_fee_rate * 100.0,
        withholding_tax_rate: defaults.withholding_tax_rate * 100.0,
        government_contribution_rate: defaults.government_contribution_rate * 100.0,
        government_fund_return_rate: defaults.government_fund_return_rate * 100.0,
    }
}

fn compare_request_from_payload(payload: ComparePayload) -> Result<CompareRequest, InputError> {
    let mut cli = default_cli();

    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }
    if let Some(v) = payload.initial_monthly_payment {
        cli.initial_monthly_payment = v;
    }
    if let Some(v) = payload.annual_increase_rate {
        cli.annual_increase_rate = v;
    }
    if let Some(v) = payload.selected_index {
        cli.selected_index = v.into();
    }
    if let Some(v) = payload.nasdaq_return_rate {
        cli.nasdaq_return_rate = v;
    }
    if let Some(v) = payload.sp500_return_rate {
        cli.sp500_return_rate = v;
    }
    if let Some(v) = payload.management_fee_rate {
        cli.management_fee_rate = v;
    }
    if let Some(v) = payload.withholding_tax_rate {
        cli.withholding_tax_rate = v;
    }
    if let Some(v) = payload.government_contribution_rate {
        cli.government_contribution_rate = v;
    }
    if let Some(v) = payload.government_fund_return_rate {
        cli.government_fund_return_rate = v;
    }

    build_request(cli)
}

fn build_compare_response(request: &CompareRequest, result: ComparisonResult) -> CompareResponse {
    let yearly_balances = result.yearly_balances();
    CompareResponse {
        selected_index: request.index,
        years: request.etf.years,
        advantage_ratio_defined: result.comparison.advantage_ratio().is_some(),
        etf: result.etf,
        bes: result.bes,
        comparison: result.comparison,
        yearly_balances,
    }
}

/// Parses command-line flags, runs one comparison and renders a text report.
pub fn run_cli<I, T>(args: I) -> Result<String, InputError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let request = build_request(Cli::parse_from(args))?;
    let result = compare(&request.etf, &request.bes);
    Ok(render_report(&request, &result))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/compare", get(compare_get_handler).post(compare_post_handler))
        .route("/api/defaults", get(defaults_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "ETF/BES comparison API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn defaults_handler() -> Response {
    json_response(StatusCode::OK, default_parameters())
}

async fn compare_get_handler(Query(payload): Query<ComparePayload>) -> Response {
    compare_handler_impl(payload)
}

async fn compare_post_handler(Json(payload): Json<ComparePayload>) -> Response {
    compare_handler_impl(payload)
}

fn compare_handler_impl(payload: ComparePayload) -> Response {
    let request = match compare_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "rejected comparison request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let result = compare(&request.etf, &request.bes);
    info!(
        years = request.etf.years,
        index = ?request.index,
        bes_advantage = result.comparison.bes_advantage,
        "comparison computed"
    );
    json_response(StatusCode::OK, build_compare_response(&request, result))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn compare_request_from_json(json: &str) -> Result<CompareRequest, String> {
    let payload = serde_json::from_str::<ComparePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    compare_request_from_payload(payload).map_err(|e| e.to_string())
}
