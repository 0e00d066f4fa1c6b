use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommodityPrices {
    pub diesel_fuel_per_gallon: Decimal,
    pub steel_per_ton: Decimal,
    pub wood_lumber_per_bf: Decimal,
    pub foam_materials_per_cf: Decimal,
    pub labor_index_multiplier: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierPerformance {
    pub carrier: String,
    pub on_time_delivery: Decimal,
    pub damage_rate: Decimal,
    pub price_competitiveness: Decimal,
}

/// Static market snapshot used by the pricing narrative and the logistics skills.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub commodities: CommodityPrices,
    pub carriers: Vec<CarrierPerformance>,
}

impl MarketSnapshot {
    pub fn current() -> Self {
        Self {
            commodities: CommodityPrices {
                diesel_fuel_per_gallon: Decimal::new(385, 2),
                steel_per_ton: Decimal::from(800),
                wood_lumber_per_bf: Decimal::new(120, 2),
                foam_materials_per_cf: Decimal::new(1550, 2),
                labor_index_multiplier: Decimal::new(108, 2),
            },
            carriers: vec![
                carrier("FedEx", 96, 2, 105),
                carrier("UPS", 94, 3, 100),
                carrier("DHL", 92, 4, 115),
            ],
        }
    }

    pub fn carrier(&self, name: &str) -> Option<&CarrierPerformance> {
        self.carriers.iter().find(|carrier| carrier.carrier.eq_ignore_ascii_case(name))
    }

    /// Highest on-time rate; ties keep the earlier carrier.
    pub fn most_reliable_carrier(&self) -> Option<&CarrierPerformance> {
        self.carriers.iter().fold(None, |best: Option<&CarrierPerformance>, candidate| {
            match best {
                Some(current) if current.on_time_delivery >= candidate.on_time_delivery => {
                    Some(current)
                }
                _ => Some(candidate),
            }
        })
    }
}

fn carrier(
    name: &str,
    on_time_pct: i64,
    damage_per_mille: i64,
    price_idx: i64,
) -> CarrierPerformance {
    CarrierPerformance {
        carrier: name.to_string(),
        on_time_delivery: Decimal::new(on_time_pct, 2),
        damage_rate: Decimal::new(damage_per_mille, 3),
        price_competitiveness: Decimal::new(price_idx, 2),
    }
}
