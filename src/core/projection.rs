use super::guardrails::guardrail_flags;
use super::marketing::calculate_tier_metrics;
use super::types::{
    ModelConfig, MonthPoint, ProjectionInputs, ProjectionKpis, ProjectionResult,
    ProjectionSeries, TierMetrics,
};

pub fn run_projection(model: &ModelConfig, inputs: &ProjectionInputs) -> ProjectionResult {
    let flags = guardrail_flags(model, inputs.base_cvr);
    let funnel = calculate_tier_metrics(
        model,
        inputs.base_cvr,
        inputs.marketing_budget,
        inputs.ctr,
    );

    // The funnel is replayed unchanged; only active customers carry over.
    let months = inputs.months as usize;
    let mut series = ProjectionSeries::with_capacity(months);
    let mut active_customers = 0.0_f64;

    for _ in 0..months {
        let point = advance_month(model, inputs.marketing_budget, &funnel, active_customers);
        active_customers = point.active_customers;
        series.push(point);
    }

    let kpis = summarize(model, &funnel, &series);
    ProjectionResult {
        series,
        kpis,
        flags,
    }
}

fn advance_month(
    model: &ModelConfig,
    marketing_budget: f64,
    funnel: &TierMetrics,
    active_customers: f64,
) -> MonthPoint {
    let new_customers = funnel.total_new_customers;
    let churned = active_customers * model.monthly_churn;
    let active_customers = (active_customers + new_customers - churned).max(0.0);

    let total_mrr = monthly_recurring_revenue(model, active_customers);
    let gross_profit = total_mrr * (1.0 - model.operating_expense_rate);
    let free_cash_flow = gross_profit - model.fixed_costs - marketing_budget;
    let cac = if new_customers != 0.0 {
        marketing_budget / new_customers
    } else {
        0.0
    };

    MonthPoint {
        impressions: funnel.total_impressions,
        clicks: funnel.total_clicks,
        leads: funnel.total_leads,
        new_customers,
        active_customers,
        total_mrr,
        gross_profit,
        cac,
        free_cash_flow,
    }
}

fn monthly_recurring_revenue(model: &ModelConfig, active_customers: f64) -> f64 {
    model
        .tiers
        .iter()
        .map(|tier| active_customers * tier.adoption * tier.monthly_price)
        .sum()
}

fn summarize(model: &ModelConfig, funnel: &TierMetrics, series: &ProjectionSeries) -> ProjectionKpis {
    let net_price = model.average_price() * (1.0 - model.operating_expense_rate);

    let subscriber_ltv = if model.monthly_churn != 0.0 {
        net_price / model.monthly_churn
    } else {
        0.0
    };
    let payback_months = match series.cac.last() {
        Some(&cac) if net_price != 0.0 => cac / net_price,
        _ => 0.0,
    };

    let blended_cvr: f64 = model
        .tiers
        .iter()
        .zip(funnel.cvr)
        .map(|(tier, cvr)| tier.blend_weight * cvr)
        .sum();
    let blended_cpl: f64 = model
        .tiers
        .iter()
        .zip(funnel.cpl)
        .map(|(tier, cpl)| tier.blend_weight * cpl)
        .sum();

    let average_mrr = match series.months() {
        0 => 0.0,
        months => series.total_mrr.iter().sum::<f64>() / months as f64,
    };
    let annual_revenue = series.total_mrr.last().map_or(0.0, |mrr| mrr * 12.0);

    ProjectionKpis {
        npv: net_present_value(
            &series.free_cash_flow,
            model.monthly_discount_rate(),
            model.initial_investment,
        ),
        payback_months,
        subscriber_ltv,
        blended_cvr,
        blended_cpl,
        average_mrr,
        annual_revenue,
        break_even_month: break_even_month(&series.free_cash_flow, model.initial_investment),
    }
}

pub fn net_present_value(cash_flows: &[f64], rate: f64, initial_investment: f64) -> f64 {
    let mut discount = 1.0;
    let mut present_value = 0.0;
    for cash_flow in cash_flows {
        discount *= 1.0 + rate;
        present_value += cash_flow / discount;
    }
    present_value - initial_investment
}

pub fn break_even_month(cash_flows: &[f64], initial_investment: f64) -> Option<u32> {
    let mut cumulative = -initial_investment;
    for (idx, cash_flow) in cash_flows.iter().enumerate() {
        cumulative += cash_flow;
        if cumulative > 0.0 {
            return Some(idx as u32 + 1);
        }
    }
    None
}
