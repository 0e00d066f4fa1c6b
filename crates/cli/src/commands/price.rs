use chrono::Utc;
use serde_json::json;
use transpak_core::domain::shipment::ShipmentRequest;
use transpak_core::errors::DomainError;
use transpak_core::pricing::{format_usd, EnhancedPricingEngine, PricingEngine};

use crate::commands::{CommandResult, EXIT_INVALID_INPUT};

/// Offline price inputs; mirrors the shipment form fields.
#[derive(Clone, Debug, Default)]
pub struct PriceArgs {
    pub dimensions: String,
    pub weight: String,
    pub origin: String,
    pub destination: String,
    pub fragility: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
}

impl PriceArgs {
    fn into_request(self) -> ShipmentRequest {
        ShipmentRequest {
            item_description: self.description.unwrap_or_else(|| "General freight".to_string()),
            dimensions: self.dimensions,
            weight: self.weight,
            origin: self.origin,
            destination: self.destination,
            fragility: self.fragility.unwrap_or_default(),
            special_requirements: self.requirements.unwrap_or_default(),
            ..ShipmentRequest::default()
        }
    }
}

pub fn run(args: PriceArgs) -> CommandResult {
    let shipment = match args.into_request().validate() {
        Ok(shipment) => shipment,
        Err(error) => {
            let error_class = match error {
                DomainError::Validation { .. } => "missing_fields",
                DomainError::UnsupportedFragility(_) => "unsupported_fragility",
                _ => "invalid_measurement",
            };
            let message = error.to_string();
            return CommandResult::failure("price", error_class, message, EXIT_INVALID_INPUT);
        }
    };

    let priced = EnhancedPricingEngine.price(&shipment, Utc::now());
    let message = format!(
        "{} -> {}: estimated total {}",
        shipment.origin,
        shipment.destination,
        format_usd(priced.breakdown.total)
    );
    let data = json!({
        "breakdown": priced.breakdown,
        "trace": priced.trace,
        "route": priced.route,
    });

    CommandResult::success_with_data("price", message, Some(data))
}
