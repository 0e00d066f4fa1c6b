use rust_decimal::Decimal;

use transpak_core::pricing::{format_usd, CostBreakdown};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
    Degrade { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

/// Keeps LLM narratives from contradicting the deterministic pricing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub llm_can_set_prices: bool,
    pub max_narrative_chars: usize,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { llm_can_set_prices: false, max_narrative_chars: 20_000 }
    }
}

impl GuardrailPolicy {
    pub fn evaluate(&self, narrative: &str, breakdown: &CostBreakdown) -> GuardrailDecision {
        let trimmed = narrative.trim();
        if trimmed.is_empty() {
            return GuardrailDecision::Deny {
                reason_code: "empty_narrative",
                user_message: "The quote narrative was empty.".to_string(),
                fallback_path: "deterministic_quote",
            };
        }
        if trimmed.chars().count() > self.max_narrative_chars {
            return GuardrailDecision::Deny {
                reason_code: "narrative_too_long",
                user_message: "The quote narrative exceeded the allowed length.".to_string(),
                fallback_path: "deterministic_quote",
            };
        }
        if self.llm_can_set_prices {
            return GuardrailDecision::Allow;
        }

        let expected = format_usd(breakdown.total);
        if stated_totals(trimmed).any(|stated| stated != expected) {
            return GuardrailDecision::Deny {
                reason_code: "conflicting_total",
                user_message: format!("The narrative stated a total other than {expected}."),
                fallback_path: "deterministic_quote",
            };
        }
        if !trimmed.contains(&expected) {
            return GuardrailDecision::Degrade {
                reason_code: "missing_total",
                user_message: format!("The narrative did not state the total {expected}."),
                fallback_path: "append_cost_breakdown",
            };
        }
        GuardrailDecision::Allow
    }
}

/// Amounts on `TOTAL QUOTE:` lines, normalised through `format_usd`.
fn stated_totals(narrative: &str) -> impl Iterator<Item = String> + '_ {
    narrative.lines().filter_map(|line| {
        let upper = line.to_ascii_uppercase();
        let at = upper.find("TOTAL QUOTE:")?;
        let amount: String = line[at + "TOTAL QUOTE:".len()..]
            .chars()
            .filter(|ch| ch.is_ascii_digit() || *ch == '.')
            .collect();
        amount.parse::<Decimal>().ok().map(format_usd)
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use transpak_core::pricing::CostBreakdown;

    use super::{GuardrailDecision, GuardrailPolicy};

    fn breakdown() -> CostBreakdown {
        CostBreakdown {
            packaging_crating: Decimal::new(150000, 2),
            transportation: Decimal::new(74907, 2),
            insurance_documentation: Decimal::new(50000, 2),
            special_handling: Decimal::new(38560, 2),
            total: Decimal::new(313467, 2),
            calculation_method: "enhanced_real_time".to_string(),
            fuel_rate_applied: Decimal::new(189, 3),
            labor_rate_applied: Decimal::from(52),
            market_timestamp: Utc::now(),
        }
    }

    #[test]
    fn narrative_with_the_deterministic_total_is_allowed() {
        let decision = GuardrailPolicy::default()
            .evaluate("Your crate ships for a total of $3,134.67.\n", &breakdown());
        assert_eq!(decision, GuardrailDecision::Allow);
    }

    #[test]
    fn narrative_without_a_total_degrades_to_cost_block() {
        let decision =
            GuardrailPolicy::default().evaluate("We will ship it carefully.", &breakdown());

        let (reason_code, fallback_path) = match decision {
            GuardrailDecision::Degrade { reason_code, fallback_path, .. } => {
                (reason_code, fallback_path)
            }
            _ => ("", ""),
        };
        assert_eq!(reason_code, "missing_total");
        assert_eq!(fallback_path, "append_cost_breakdown");
    }

    #[test]
    fn invented_total_is_denied_even_if_real_total_appears() {
        let narrative = "Estimate $3,134.67 before discounts.\nTOTAL QUOTE: $2,900.00";
        let decision = GuardrailPolicy::default().evaluate(narrative, &breakdown());
        assert!(matches!(
            decision,
            GuardrailDecision::Deny {
                reason_code: "conflicting_total",
                fallback_path: "deterministic_quote",
                ..
            }
        ));

        let agreeing = "TOTAL QUOTE: $3,134.67";
        assert_eq!(
            GuardrailPolicy::default().evaluate(agreeing, &breakdown()),
            GuardrailDecision::Allow
        );
    }

    #[test]
    fn empty_narrative_is_denied() {
        let decision = GuardrailPolicy::default().evaluate("  \n", &breakdown());
        assert!(matches!(decision, GuardrailDecision::Deny { reason_code: "empty_narrative", .. }));
    }
}
