use std::fmt;

use serde::{Serialize, Serializer};

pub const TIER_COUNT: usize = 4;

pub const DEFAULT_MARKETING_BUDGET: f64 = 10_000.0;
pub const DEFAULT_BASE_CVR: f64 = 2.75;
pub const DEFAULT_CTR: f64 = 18.0;
pub const DEFAULT_PROJECTION_MONTHS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    // Published with the benchmarks only; CPL is derived from budget and leads.
    pub cpl_factor: f64,
    pub cvr_factor: f64,
    pub ctr_factor: f64,
    pub budget_split: f64,
    pub cpl_benchmark: (f64, f64),
    pub cvr_benchmark: (f64, f64),
    pub monthly_price: f64,
    pub adoption: f64,
    pub blend_weight: f64,
}

// CVR and CTR are percents, every other rate is a fraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub tiers: [Tier; TIER_COUNT],
    pub cost_per_mille: f64,
    pub cvr_floor_pct: f64,
    pub base_cvr_range_pct: (f64, f64),
    pub monthly_churn: f64,
    pub operating_expense_rate: f64,
    pub fixed_costs: f64,
    pub annual_discount_rate: f64,
    pub initial_investment: f64,
    pub audit_tolerance: f64,
}

pub const DEFAULT_MODEL: ModelConfig = ModelConfig {
    tiers: [
        Tier {
            cpl_factor: 1.0,
            cvr_factor: 1.0,
            ctr_factor: 1.0,
            budget_split: 0.4,
            cpl_benchmark: (100.0, 200.0),
            cvr_benchmark: (2.0, 4.0),
            monthly_price: 500.0,
            adoption: 0.45,
            blend_weight: 0.4,
        },
        Tier {
            cpl_factor: 1.6,
            cvr_factor: 0.65,
            ctr_factor: 0.8,
            budget_split: 0.3,
            cpl_benchmark: (225.0, 350.0),
            cvr_benchmark: (1.0, 2.0),
            monthly_price: 1_200.0,
            adoption: 0.3,
            blend_weight: 0.3,
        },
        Tier {
            cpl_factor: 2.5,
            cvr_factor: 0.35,
            ctr_factor: 0.6,
            budget_split: 0.2,
            cpl_benchmark: (350.0, 600.0),
            cvr_benchmark: (0.5, 1.0),
            monthly_price: 3_000.0,
            adoption: 0.15,
            blend_weight: 0.2,
        },
        Tier {
            cpl_factor: 4.0,
            cvr_factor: 0.15,
            ctr_factor: 0.4,
            budget_split: 0.1,
            cpl_benchmark: (600.0, 1_200.0),
            cvr_benchmark: (0.2, 0.6),
            monthly_price: 7_500.0,
            adoption: 0.1,
            blend_weight: 0.1,
        },
    ],
    cost_per_mille: 8.0,
    cvr_floor_pct: 0.1,
    base_cvr_range_pct: (0.1, 6.0),
    monthly_churn: 0.10,
    operating_expense_rate: 0.15,
    fixed_costs: 1_500.0,
    annual_discount_rate: 0.08,
    initial_investment: 200_000.0,
    audit_tolerance: 0.2,
};

impl Default for ModelConfig {
    fn default() -> Self {
        DEFAULT_MODEL
    }
}

impl ModelConfig {
    pub fn tier_cvr(&self, base_cvr: f64, tier: &Tier) -> f64 {
        (base_cvr * tier.cvr_factor).max(self.cvr_floor_pct)
    }

    pub fn monthly_discount_rate(&self) -> f64 {
        self.annual_discount_rate / 12.0
    }

    pub fn average_price(&self) -> f64 {
        self.tiers
            .iter()
            .map(|tier| tier.monthly_price * tier.adoption)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunnelInputs {
    pub base_cvr: f64,
    pub total_budget: f64,
    pub ctr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionInputs {
    pub marketing_budget: f64,
    pub months: u32,
    pub base_cvr: f64,
    pub ctr: f64,
}

impl Default for ProjectionInputs {
    fn default() -> Self {
        Self {
            marketing_budget: DEFAULT_MARKETING_BUDGET,
            months: DEFAULT_PROJECTION_MONTHS,
            base_cvr: DEFAULT_BASE_CVR,
            ctr: DEFAULT_CTR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierMetrics {
    pub budget: [f64; TIER_COUNT],
    pub impressions: [f64; TIER_COUNT],
    pub ctr: [f64; TIER_COUNT],
    pub cpl: [f64; TIER_COUNT],
    pub cvr: [f64; TIER_COUNT],
    pub clicks: [f64; TIER_COUNT],
    pub leads: [f64; TIER_COUNT],
    pub new_customers: [f64; TIER_COUNT],
    pub total_impressions: f64,
    pub total_clicks: f64,
    pub total_leads: f64,
    pub total_new_customers: f64,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum GuardrailFlag {
    BaseCvrOutOfRange,
    // 1-indexed
    TierCvrOutOfRange(usize),
}

impl fmt::Display for GuardrailFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardrailFlag::BaseCvrOutOfRange => f.write_str("base_cvr_out_of_range"),
            GuardrailFlag::TierCvrOutOfRange(tier) => write!(f, "tier{tier}_cvr_out_of_range"),
        }
    }
}

impl Serialize for GuardrailFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthPoint {
    pub impressions: f64,
    pub clicks: f64,
    pub leads: f64,
    pub new_customers: f64,
    pub active_customers: f64,
    pub total_mrr: f64,
    pub gross_profit: f64,
    pub cac: f64,
    pub free_cash_flow: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectionSeries {
    pub impressions: Vec<f64>,
    pub clicks: Vec<f64>,
    pub leads: Vec<f64>,
    pub new_customers: Vec<f64>,
    pub active_customers: Vec<f64>,
    pub total_mrr: Vec<f64>,
    pub gross_profit: Vec<f64>,
    pub cac: Vec<f64>,
    pub free_cash_flow: Vec<f64>,
}

impl ProjectionSeries {
    pub fn with_capacity(months: usize) -> Self {
        let make = || Vec::with_capacity(months);
        Self {
            impressions: make(),
            clicks: make(),
            leads: make(),
            new_customers: make(),
            active_customers: make(),
            total_mrr: make(),
            gross_profit: make(),
            cac: make(),
            free_cash_flow: make(),
        }
    }

    pub fn push(&mut self, point: MonthPoint) {
        self.impressions.push(point.impressions);
        self.clicks.push(point.clicks);
        self.leads.push(point.leads);
        self.new_customers.push(point.new_customers);
        self.active_customers.push(point.active_customers);
        self.total_mrr.push(point.total_mrr);
        self.gross_profit.push(point.gross_profit);
        self.cac.push(point.cac);
        self.free_cash_flow.push(point.free_cash_flow);
    }

    pub fn months(&self) -> usize {
        self.active_customers.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionKpis {
    pub npv: f64,
    pub payback_months: f64,
    pub subscriber_ltv: f64,
    pub blended_cvr: f64,
    pub blended_cpl: f64,
    pub average_mrr: f64,
    pub annual_revenue: f64,
    pub break_even_month: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    #[serde(flatten)]
    pub series: ProjectionSeries,
    pub kpis: ProjectionKpis,
    pub flags: Vec<GuardrailFlag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRow {
    pub tier: usize,
    pub cpl: f64,
    pub cpl_range: (f64, f64),
    pub cpl_median: f64,
    pub cpl_flag: bool,
    pub cvr: f64,
    pub cvr_range: (f64, f64),
    pub cvr_median: f64,
    pub cvr_flag: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuickKpiInputs {
    pub mrr: f64,
    pub arpu: f64,
    pub churn_rate: f64,
    pub marketing_spend: f64,
    pub cost_per_lead: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuickKpis {
    pub annual_revenue: f64,
    pub ltv: f64,
    pub cac: f64,
}
