use super::types::{AuditRow, ModelConfig, TIER_COUNT, TierMetrics};

pub fn calculate_tier_metrics(
    model: &ModelConfig,
    base_cvr: f64,
    total_budget: f64,
    ctr: f64,
) -> TierMetrics {
    let mut budget = [0.0; TIER_COUNT];
    let mut impressions = [0.0; TIER_COUNT];
    let mut tier_ctr = [0.0; TIER_COUNT];
    let mut cpl = [0.0; TIER_COUNT];
    let mut cvr = [0.0; TIER_COUNT];
    let mut clicks = [0.0; TIER_COUNT];
    let mut leads = [0.0; TIER_COUNT];

    for (idx, tier) in model.tiers.iter().enumerate() {
        budget[idx] = total_budget * tier.budget_split;
        tier_ctr[idx] = ctr * tier.ctr_factor;
        cvr[idx] = model.tier_cvr(base_cvr, tier);
        impressions[idx] = budget[idx] / model.cost_per_mille * 1000.0;
        clicks[idx] = impressions[idx] * tier_ctr[idx] / 100.0;
        leads[idx] = clicks[idx] * cvr[idx] / 100.0;
        cpl[idx] = if leads[idx] != 0.0 {
            budget[idx] / leads[idx]
        } else {
            0.0
        };
    }

    TierMetrics {
        budget,
        impressions,
        ctr: tier_ctr,
        cpl,
        cvr,
        clicks,
        leads,
        new_customers: leads,
        total_impressions: impressions.iter().sum(),
        total_clicks: clicks.iter().sum(),
        total_leads: leads.iter().sum(),
        total_new_customers: leads.iter().sum(),
    }
}

pub fn export_audit(
    model: &ModelConfig,
    base_cvr: f64,
    total_budget: f64,
    ctr: f64,
) -> Vec<AuditRow> {
    let metrics = calculate_tier_metrics(model, base_cvr, total_budget, ctr);
    model
        .tiers
        .iter()
        .enumerate()
        .map(|(idx, tier)| {
            let cpl_median = range_median(tier.cpl_benchmark);
            let cvr_median = range_median(tier.cvr_benchmark);
            let cpl = metrics.cpl[idx];
            let cvr = metrics.cvr[idx];
            AuditRow {
                tier: idx + 1,
                cpl,
                cpl_range: tier.cpl_benchmark,
                cpl_median,
                cpl_flag: deviates(cpl, cpl_median, model.audit_tolerance),
                cvr,
                cvr_range: tier.cvr_benchmark,
                cvr_median,
                cvr_flag: deviates(cvr, cvr_median, model.audit_tolerance),
            }
        })
        .collect()
}

fn range_median((low, high): (f64, f64)) -> f64 {
    (low + high) / 2.0
}

fn deviates(value: f64, median: f64, tolerance: f64) -> bool {
    (value - median).abs() > tolerance * median
}
