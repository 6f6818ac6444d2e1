use super::types::{GuardrailFlag, ModelConfig};

pub fn guardrail_flags(model: &ModelConfig, base_cvr: f64) -> Vec<GuardrailFlag> {
    let mut flags = Vec::new();

    let (low, high) = model.base_cvr_range_pct;
    if !(low..=high).contains(&base_cvr) {
        flags.push(GuardrailFlag::BaseCvrOutOfRange);
    }

    for (idx, tier) in model.tiers.iter().enumerate() {
        let cvr = model.tier_cvr(base_cvr, tier);
        let (low, high) = tier.cvr_benchmark;
        if !(low..=high).contains(&cvr) {
            flags.push(GuardrailFlag::TierCvrOutOfRange(idx + 1));
        }
    }

    flags
}
