use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use transpak_core::domain::shipment::{ShipmentRequest, ValidatedShipment};
use transpak_core::pricing::{price_shipment_with_trace, PricedShipment};

pub const PACKAGING_TOOL: &str = "calculate_packaging_cost";
pub const SHIPPING_TOOL: &str = "calculate_shipping_rate";
pub const INSURANCE_TOOL: &str = "calculate_insurance_cost";
pub const HANDLING_TOOL: &str = "calculate_special_handling";

/// A deterministic calculator the crew can consult. Input is a shipment as JSON.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: Value) -> Result<Value>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry holding the four pricing calculators.
    pub fn pricing() -> Self {
        let mut registry = Self::default();
        registry.register(PackagingTool);
        registry.register(ShippingTool);
        registry.register(InsuranceTool);
        registry.register(HandlingTool);
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub async fn execute(&self, name: &str, input: Value) -> Result<Value> {
        let tool = self.tools.get(name).ok_or_else(|| anyhow!("unknown tool `{name}`"))?;
        tool.execute(input).await.with_context(|| format!("tool `{name}` failed"))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub fn shipment_input(shipment: &ValidatedShipment) -> Value {
    json!({
        "item_description": shipment.item_description,
        "dimensions": shipment.dimensions,
        "weight": shipment.weight,
        "origin": shipment.origin,
        "destination": shipment.destination,
        "fragility": shipment.fragility.label(),
        "special_requirements": shipment.special_requirements,
        "timeline": shipment.timeline,
        "declared_value": shipment.declared_value,
    })
}

fn price(input: Value) -> Result<PricedShipment> {
    let request: ShipmentRequest =
        serde_json::from_value(input).context("tool input is not a shipment")?;
    let shipment = request.validate().map_err(|error| anyhow!(error.to_string()))?;
    Ok(price_shipment_with_trace(&shipment, Utc::now()))
}

struct PackagingTool;

#[async_trait]
impl Tool for PackagingTool {
    fn name(&self) -> &'static str {
        PACKAGING_TOOL
    }

    fn description(&self) -> &'static str {
        "Crate materials, fabrication and regional labor cost"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        Ok(serde_json::to_value(price(input)?.packaging)?)
    }
}

struct ShippingTool;

#[async_trait]
impl Tool for ShippingTool {
    fn name(&self) -> &'static str {
        SHIPPING_TOOL
    }

    fn description(&self) -> &'static str {
        "Freight, regional fuel surcharge and fragile handling for the lane"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let priced = price(input)?;
        Ok(json!({ "rate": priced.shipping, "route": priced.route }))
    }
}

struct InsuranceTool;

#[async_trait]
impl Tool for InsuranceTool {
    fn name(&self) -> &'static str {
        INSURANCE_TOOL
    }

    fn description(&self) -> &'static str {
        "Insurance coverage on the declared value plus documentation and permits"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        Ok(serde_json::to_value(price(input)?.insurance)?)
    }
}

struct HandlingTool;

#[async_trait]
impl Tool for HandlingTool {
    fn name(&self) -> &'static str {
        HANDLING_TOOL
    }

    fn description(&self) -> &'static str {
        "Loading, unloading and coordination for special requirements"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        Ok(serde_json::to_value(price(input)?.handling)?)
    }
}
