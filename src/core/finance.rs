use super::types::{QuickKpiInputs, QuickKpis};

const MIN_DIVISOR: f64 = 1e-6;

pub fn quick_kpis(inputs: &QuickKpiInputs) -> QuickKpis {
    let conversions =
        inputs.marketing_spend / inputs.cost_per_lead.max(MIN_DIVISOR) * inputs.conversion_rate;

    QuickKpis {
        annual_revenue: inputs.mrr * 12.0,
        ltv: inputs.arpu / inputs.churn_rate.max(MIN_DIVISOR),
        cac: inputs.marketing_spend / conversions.max(MIN_DIVISOR),
    }
}
