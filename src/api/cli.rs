use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::{
    DEFAULT_BASE_CVR, DEFAULT_CTR, DEFAULT_MARKETING_BUDGET, DEFAULT_PROJECTION_MONTHS,
    FunnelInputs, ProjectionInputs,
};

pub const MAX_PROJECTION_MONTHS: u32 = 1_200;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "catona",
    version,
    about = "Tiered marketing funnel and monthly MRR/NPV projection engine"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        env = "LOG_FORMAT",
        default_value_t = LogFormat::Text,
        help = "Log output format (logs go to stderr)"
    )]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the projection HTTP API
    Serve(ServeArgs),
    /// Run a monthly projection and print it as JSON
    Project(ProjectionArgs),
    /// Print per-tier funnel metrics as JSON
    Tiers(FunnelArgs),
    /// Print the tier benchmark audit as JSON
    Audit(FunnelArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, env = "PORT", default_value_t = 8001)]
    pub port: u16,
    #[arg(
        long,
        env = "CORS_ALLOW_ORIGINS",
        default_value = "*",
        help = "Comma-separated allowed origins, or * for any"
    )]
    pub cors_allow_origins: String,
    #[arg(
        long,
        env = "CORS_ALLOW_METHODS",
        default_value = "*",
        help = "Comma-separated allowed methods, or * for any"
    )]
    pub cors_allow_methods: String,
    #[arg(
        long,
        env = "CORS_ALLOW_HEADERS",
        default_value = "*",
        help = "Comma-separated allowed request headers, or * for any"
    )]
    pub cors_allow_headers: String,
}

#[derive(Args, Debug, Clone)]
#[command(allow_negative_numbers = true)]
pub struct ProjectionArgs {
    #[arg(long, help = "Monthly marketing spend")]
    pub marketing_budget: f64,
    #[arg(long, default_value_t = DEFAULT_PROJECTION_MONTHS, help = "Number of monthly periods")]
    pub months: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_BASE_CVR,
        help = "Base conversion rate in percent, e.g. 2.75"
    )]
    pub base_cvr: f64,
    #[arg(long, default_value_t = DEFAULT_CTR, help = "Click-through rate in percent")]
    pub ctr: f64,
}

#[derive(Args, Debug, Clone)]
#[command(allow_negative_numbers = true)]
pub struct FunnelArgs {
    #[arg(
        long,
        default_value_t = DEFAULT_BASE_CVR,
        help = "Base conversion rate in percent, e.g. 2.75"
    )]
    pub base_cvr: f64,
    #[arg(long, default_value_t = DEFAULT_MARKETING_BUDGET, help = "Budget split across tiers")]
    pub total_budget: f64,
    #[arg(long, default_value_t = DEFAULT_CTR, help = "Click-through rate in percent")]
    pub ctr: f64,
}

pub fn default_projection_args() -> ProjectionArgs {
    ProjectionArgs {
        marketing_budget: DEFAULT_MARKETING_BUDGET,
        months: DEFAULT_PROJECTION_MONTHS,
        base_cvr: DEFAULT_BASE_CVR,
        ctr: DEFAULT_CTR,
    }
}

pub fn default_funnel_args() -> FunnelArgs {
    FunnelArgs {
        base_cvr: DEFAULT_BASE_CVR,
        total_budget: DEFAULT_MARKETING_BUDGET,
        ctr: DEFAULT_CTR,
    }
}

// Negative budgets and out-of-range rates are accepted here; the engine
// degrades them numerically and the guardrails report them.
pub fn build_projection_inputs(args: ProjectionArgs) -> Result<ProjectionInputs, String> {
    require_finite([
        ("--marketing-budget", args.marketing_budget),
        ("--base-cvr", args.base_cvr),
        ("--ctr", args.ctr),
    ])?;

    if args.months > MAX_PROJECTION_MONTHS {
        return Err(format!("--months must be <= {MAX_PROJECTION_MONTHS}"));
    }

    Ok(ProjectionInputs {
        marketing_budget: args.marketing_budget,
        months: args.months,
        base_cvr: args.base_cvr,
        ctr: args.ctr,
    })
}

pub fn build_funnel_inputs(args: FunnelArgs) -> Result<FunnelInputs, String> {
    require_finite([
        ("--base-cvr", args.base_cvr),
        ("--total-budget", args.total_budget),
        ("--ctr", args.ctr),
    ])?;

    Ok(FunnelInputs {
        base_cvr: args.base_cvr,
        total_budget: args.total_budget,
        ctr: args.ctr,
    })
}

pub(crate) fn require_finite<const N: usize>(values: [(&str, f64); N]) -> Result<(), String> {
    for (name, value) in values {
        if !value.is_finite() {
            return Err(format!("{name} must be a finite number"));
        }
    }
    Ok(())
}
