mod finance;
mod guardrails;
mod marketing;
mod projection;
mod types;

pub use finance::quick_kpis;
pub use guardrails::guardrail_flags;
pub use marketing::{calculate_tier_metrics, export_audit};
pub use projection::{break_even_month, net_present_value, run_projection};
pub use types::{
    AuditRow, DEFAULT_BASE_CVR, DEFAULT_CTR, DEFAULT_MARKETING_BUDGET, DEFAULT_MODEL,
    DEFAULT_PROJECTION_MONTHS, FunnelInputs, GuardrailFlag, ModelConfig, MonthPoint,
    ProjectionInputs, ProjectionKpis, ProjectionResult, ProjectionSeries, QuickKpiInputs,
    QuickKpis, TIER_COUNT, Tier, TierMetrics,
};
