use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;
use crate::errors::DomainError;

const MAX_TEXT_LEN: usize = 1000;
const KG_TO_LBS: Decimal = Decimal::from_parts(220462, 0, 0, false, 5);
/// Largest accepted side length, in inches (about 83 ft, a full trailer).
pub const MAX_DIMENSION_IN: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
/// Largest accepted declared value, in dollars.
pub const MAX_DECLARED_VALUE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);
/// Largest accepted weight, in pounds.
pub const MAX_WEIGHT_LBS: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipmentId(pub i64);

impl fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fragility {
    #[default]
    Standard,
    Fragile,
    #[serde(rename = "High Value")]
    HighValue,
    #[serde(rename = "Extremely Fragile")]
    ExtremelyFragile,
}

impl Fragility {
    pub const ALL: [Fragility; 4] =
        [Self::Standard, Self::Fragile, Self::HighValue, Self::ExtremelyFragile];

    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Fragile => "Fragile",
            Self::HighValue => "High Value",
            Self::ExtremelyFragile => "Extremely Fragile",
        }
    }

    /// Whether the label reads as "fragile" for protective packaging purposes.
    pub fn needs_extra_protection(self) -> bool {
        matches!(self, Self::Fragile | Self::ExtremelyFragile)
    }
}

impl fmt::Display for Fragility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Fragility {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "" | "standard" => Ok(Self::Standard),
            "fragile" => Ok(Self::Fragile),
            "high value" => Ok(Self::HighValue),
            "extremely fragile" => Ok(Self::ExtremelyFragile),
            _ => Err(DomainError::UnsupportedFragility(value.trim().to_string())),
        }
    }
}

/// Raw shipment input as submitted through the form or the JSON API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipmentRequest {
    pub item_description: String,
    pub dimensions: String,
    pub weight: String,
    pub origin: String,
    pub destination: String,
    pub fragility: String,
    pub special_requirements: String,
    pub timeline: String,
    pub declared_value: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurements {
    pub length_in: Decimal,
    pub width_in: Decimal,
    pub height_in: Decimal,
    pub weight_lbs: Decimal,
}

impl Measurements {
    pub fn cubic_inches(&self) -> Decimal {
        self.length_in * self.width_in * self.height_in
    }

    pub fn cubic_feet(&self) -> Decimal {
        self.cubic_inches() / Decimal::from(1728)
    }
}

/// A shipment whose required fields are present and whose measurements parse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedShipment {
    pub item_description: String,
    pub dimensions: String,
    pub weight: String,
    pub origin: String,
    pub destination: String,
    pub fragility: Fragility,
    pub special_requirements: String,
    pub timeline: String,
    pub declared_value: Option<String>,
    pub measurements: Measurements,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub user_id: Option<UserId>,
    pub item_description: String,
    pub dimensions: String,
    pub weight: String,
    pub origin: String,
    pub destination: String,
    pub fragility: Fragility,
    pub special_requirements: String,
    pub timeline: String,
    pub declared_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Shipment {
    /// Rebuilds the request a stored shipment was created from.
    pub fn to_request(&self) -> ShipmentRequest {
        ShipmentRequest {
            item_description: self.item_description.clone(),
            dimensions: self.dimensions.clone(),
            weight: self.weight.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            fragility: self.fragility.label().to_string(),
            special_requirements: self.special_requirements.clone(),
            timeline: self.timeline.clone(),
            declared_value: self.declared_value.clone(),
        }
    }
}

impl ShipmentRequest {
    pub const REQUIRED_FIELDS: [(&'static str, &'static str); 5] = [
        ("item_description", "Item Description"),
        ("dimensions", "Dimensions"),
        ("weight", "Weight"),
        ("origin", "Origin"),
        ("destination", "Destination"),
    ];

    /// Display names of required fields that are empty, in form order.
    pub fn missing_fields(&self) -> Vec<String> {
        Self::REQUIRED_FIELDS
            .iter()
            .filter(|(key, _)| self.field(key).map(|value| value.trim().is_empty()).unwrap_or(true))
            .map(|(_, label)| (*label).to_string())
            .collect()
    }

    fn field(&self, key: &str) -> Option<&str> {
        match key {
            "item_description" => Some(&self.item_description),
            "dimensions" => Some(&self.dimensions),
            "weight" => Some(&self.weight),
            "origin" => Some(&self.origin),
            "destination" => Some(&self.destination),
            _ => None,
        }
    }

    pub fn sanitized(&self) -> Self {
        Self {
            item_description: sanitize_text(&self.item_description),
            dimensions: sanitize_text(&self.dimensions),
            weight: sanitize_text(&self.weight),
            origin: sanitize_text(&self.origin),
            destination: sanitize_text(&self.destination),
            fragility: sanitize_text(&self.fragility),
            special_requirements: sanitize_text(&self.special_requirements),
            timeline: sanitize_text(&self.timeline),
            declared_value: self
                .declared_value
                .as_deref()
                .map(sanitize_text)
                .filter(|value| !value.is_empty()),
        }
    }

    pub fn validate(&self) -> Result<ValidatedShipment, DomainError> {
        let clean = self.sanitized();

        let missing_fields = clean.missing_fields();
        if !missing_fields.is_empty() {
            return Err(DomainError::Validation { missing_fields });
        }

        let fragility = clean.fragility.parse::<Fragility>()?;
        let weight_lbs = parse_weight(&clean.weight)?;
        let [length_in, width_in, height_in] = parse_dimensions(&clean.dimensions)?;
        check_declared_value(clean.declared_value.as_deref())?;

        Ok(ValidatedShipment {
            item_description: clean.item_description,
            dimensions: clean.dimensions,
            weight: clean.weight,
            origin: clean.origin,
            destination: clean.destination,
            fragility,
            special_requirements: clean.special_requirements,
            timeline: clean.timeline,
            declared_value: clean.declared_value,
            measurements: Measurements { length_in, width_in, height_in, weight_lbs },
        })
    }
}

/// Keeps printable characters, newlines and tabs, then trims and truncates.
pub fn sanitize_text(value: &str) -> String {
    let filtered: String =
        value.chars().filter(|ch| !ch.is_control() || *ch == '\n' || *ch == '\t').collect();
    filtered.trim().chars().take(MAX_TEXT_LEN).collect()
}

/// Parses `350`, `350 lbs` or `20 kg` into pounds.
pub fn parse_weight(raw: &str) -> Result<Decimal, DomainError> {
    let lowered = raw.trim().to_ascii_lowercase();
    let is_kg = lowered.contains("kg");
    let numeric =
        lowered.replace("lbs", "").replace("lb", "").replace("kg", "").replace(',', "");
    let value = Decimal::from_str(numeric.trim()).map_err(|_| DomainError::InvalidMeasurement {
        field: "weight",
        detail: format!("`{raw}` is not a number of lbs or kg"),
    })?;

    if value <= Decimal::ZERO {
        return Err(DomainError::InvalidMeasurement {
            field: "weight",
            detail: "weight must be greater than zero".to_string(),
        });
    }

    let pounds = if is_kg { value * KG_TO_LBS } else { value };
    if pounds > MAX_WEIGHT_LBS {
        return Err(DomainError::InvalidMeasurement {
            field: "weight",
            detail: format!("weight must not exceed {MAX_WEIGHT_LBS} lbs"),
        });
    }

    Ok(pounds)
}

/// Unparseable values are allowed through (insurance estimates them); oversized ones are not.
fn check_declared_value(raw: Option<&str>) -> Result<(), DomainError> {
    let Some(value) = raw.and_then(|raw| Decimal::from_str(raw.replace(['$', ','], "").trim()).ok())
    else {
        return Ok(());
    };
    if value > MAX_DECLARED_VALUE {
        return Err(DomainError::InvalidMeasurement {
            field: "declared_value",
            detail: format!("declared value must not exceed ${MAX_DECLARED_VALUE}"),
        });
    }
    Ok(())
}

/// Parses `48x36x24`, `48 x 36 x 24 inches` or `48, 36, 24` into inches. The first three
/// tokens must be numbers; anything after them (a unit) is ignored.
pub fn parse_dimensions(raw: &str) -> Result<[Decimal; 3], DomainError> {
    let spaced = raw.replace(['x', 'X', '×', '*', ','], " ");
    let tokens: Vec<&str> = spaced.split_whitespace().take(3).collect();

    let invalid = || DomainError::InvalidMeasurement {
        field: "dimensions",
        detail: format!("`{raw}` must contain length, width and height (e.g. 48x36x24)"),
    };
    if tokens.len() != 3 {
        return Err(invalid());
    }
    let mut sides = [Decimal::ZERO; 3];
    for (side, token) in sides.iter_mut().zip(tokens) {
        *side = Decimal::from_str(token).map_err(|_| invalid())?;
    }

    if sides.iter().any(|value| *value <= Decimal::ZERO) {
        return Err(DomainError::InvalidMeasurement {
            field: "dimensions",
            detail: "every dimension must be greater than zero".to_string(),
        });
    }
    if sides.iter().any(|value| *value > MAX_DIMENSION_IN) {
        return Err(DomainError::InvalidMeasurement {
            field: "dimensions",
            detail: format!("no dimension may exceed {MAX_DIMENSION_IN} inches"),
        });
    }

    Ok(sides)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{parse_dimensions, parse_weight, sanitize_text, Fragility, ShipmentRequest};
    use crate::errors::DomainError;

    fn request() -> ShipmentRequest {
        ShipmentRequest {
            item_description: "Industrial printer".to_string(),
            dimensions: "48x36x24".to_string(),
            weight: "350 lbs".to_string(),
            origin: "San Jose, CA".to_string(),
            destination: "Austin, TX".to_string(),
            fragility: "Fragile".to_string(),
            ..ShipmentRequest::default()
        }
    }

    #[test]
    fn missing_fields_are_reported_by_display_name_in_order() {
        let mut request = request();
        request.item_description = "   ".to_string();
        request.destination.clear();

        let error = request.validate().expect_err("incomplete request must fail");
        assert_eq!(
            error,
            DomainError::Validation {
                missing_fields: vec!["Item Description".to_string(), "Destination".to_string()]
            }
        );
    }

    #[test]
    fn validated_shipment_carries_parsed_measurements() {
        let shipment = request().validate().expect("valid request");

        assert_eq!(shipment.fragility, Fragility::Fragile);
        assert_eq!(shipment.measurements.weight_lbs, Decimal::from(350));
        assert_eq!(shipment.measurements.cubic_inches(), Decimal::from(41472));
        assert_eq!(shipment.measurements.cubic_feet(), Decimal::from(24));
    }

    #[test]
    fn empty_fragility_defaults_to_standard_and_unknown_is_rejected() {
        let mut request = request();
        request.fragility.clear();
        assert_eq!(request.validate().expect("valid").fragility, Fragility::Standard);

        request.fragility = "Mostly Harmless".to_string();
        assert!(matches!(request.validate(), Err(DomainError::UnsupportedFragility(_))));
    }

    #[test]
    fn fragility_labels_parse_case_insensitively() {
        assert_eq!("high value".parse::<Fragility>(), Ok(Fragility::HighValue));
        assert_eq!("EXTREMELY_FRAGILE".parse::<Fragility>(), Ok(Fragility::ExtremelyFragile));
        assert_eq!(Fragility::HighValue.to_string(), "High Value");
    }

    #[test]
    fn kilograms_convert_to_pounds() {
        assert_eq!(parse_weight("10 kg").expect("kg"), Decimal::new(220462, 4));
        assert_eq!(parse_weight("1,200 lbs").expect("lbs"), Decimal::from(1200));
        assert!(parse_weight("heavy").is_err());
        assert!(parse_weight("0").is_err());
    }

    #[test]
    fn dimensions_accept_common_separators() {
        let expected = [Decimal::from(24), Decimal::from(18), Decimal::from(12)];
        assert_eq!(parse_dimensions("24 x 18 x 12 inches").expect("spaced"), expected);
        assert_eq!(parse_dimensions("24X18X12").expect("upper"), expected);
        assert_eq!(parse_dimensions("24, 18, 12").expect("commas"), expected);
        assert!(parse_dimensions("24x18").is_err());
    }

    #[test]
    fn dimensions_reject_non_numeric_sides() {
        assert!(parse_dimensions("foo 1 2 3").is_err());
        assert!(parse_dimensions("1x2xabcx3").is_err());
        assert!(parse_dimensions("1x2x3 ft").is_ok());
    }

    #[test]
    fn oversized_measurements_are_rejected_before_pricing() {
        let huge = "99999999999999x99999999999999x99999999999999";
        assert!(matches!(
            parse_dimensions(huge),
            Err(DomainError::InvalidMeasurement { field: "dimensions", .. })
        ));
        assert!(parse_dimensions("1000x1000x1000").is_ok());
        assert!(parse_weight("100001 lbs").is_err());
        assert!(parse_weight("50000 kg").is_err());

        let request = ShipmentRequest { dimensions: huge.to_string(), ..request() };
        assert!(matches!(request.validate(), Err(DomainError::InvalidMeasurement { .. })));

        let request = ShipmentRequest {
            declared_value: Some("$79,228,162,514,264,337,593,543,950,335".to_string()),
            ..self::request()
        };
        assert!(matches!(
            request.validate(),
            Err(DomainError::InvalidMeasurement { field: "declared_value", .. })
        ));
    }

    #[test]
    fn sanitize_strips_control_characters_and_truncates() {
        assert_eq!(sanitize_text("  fine\u{0007} art\n "), "fine art");
        assert_eq!(sanitize_text(&"a".repeat(1500)).len(), 1000);
    }
}
