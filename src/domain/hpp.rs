//! Cost-of-goods (HPP) calculation.
//!
//! Turns the itemized raw materials and operating costs of one production
//! batch into a per-unit cost and a margin-adjusted selling price. All
//! arithmetic stays in `Decimal`; rounding is left to the presentation layer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One ingredient consumed by a production batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawMaterialLine {
    pub name: String,
    pub unit_cost: Decimal,
    pub quantity_used: Decimal,
    #[serde(default)]
    pub unit: String,
}

/// Overhead bought in bulk, of which only `quantity_consumed` belongs to this batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperatingCostLine {
    pub name: String,
    pub amount_paid: Decimal,
    pub quantity_purchased: Decimal,
    #[serde(default)]
    pub unit: String,
    pub quantity_consumed: Decimal,
}

impl OperatingCostLine {
    /// Share of `amount_paid` attributed to the batch. Zero when nothing was purchased.
    fn allocation(&self) -> Option<Decimal> {
        if self.quantity_purchased <= Decimal::ZERO {
            return Some(Decimal::ZERO);
        }
        // Multiply first: a non-terminating ratio would be cut at 28 digits.
        self.quantity_consumed
            .checked_mul(self.amount_paid)?
            .checked_div(self.quantity_purchased)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostCalculationInput {
    #[serde(default)]
    pub raw_materials: Vec<RawMaterialLine>,
    #[serde(default)]
    pub operating_costs: Vec<OperatingCostLine>,
    pub target_units: Decimal,
    #[serde(default)]
    pub margin_percent: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostCalculationResult {
    /// HPP: batch cost divided by the units produced.
    pub unit_cost: Decimal,
    pub recommended_price: Decimal,
    pub raw_material_total: Decimal,
    pub operating_cost_total: Decimal,
    pub batch_cost: Decimal,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CostCalculationError {
    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },
}

impl CostCalculationError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    fn overflow(field: impl Into<String>) -> Self {
        Self::invalid(field, "value out of range")
    }
}

pub fn compute_unit_cost(
    input: &CostCalculationInput,
) -> Result<CostCalculationResult, CostCalculationError> {
    // Checked first so a zero batch size is reported regardless of the lines.
    if input.target_units <= Decimal::ZERO {
        return Err(CostCalculationError::invalid(
            "target_units",
            "must be greater than zero",
        ));
    }
    validate(input)?;

    let mut raw_material_total = Decimal::ZERO;
    for (index, line) in input.raw_materials.iter().enumerate() {
        let field = format!("raw_materials[{index}]");
        raw_material_total = line
            .unit_cost
            .checked_mul(line.quantity_used)
            .and_then(|cost| raw_material_total.checked_add(cost))
            .ok_or_else(|| CostCalculationError::overflow(field))?;
    }

    let mut operating_cost_total = Decimal::ZERO;
    for (index, line) in input.operating_costs.iter().enumerate() {
        let field = format!("operating_costs[{index}]");
        operating_cost_total = line
            .allocation()
            .and_then(|share| operating_cost_total.checked_add(share))
            .ok_or_else(|| CostCalculationError::overflow(field))?;
    }

    let batch_cost = raw_material_total
        .checked_add(operating_cost_total)
        .ok_or_else(|| CostCalculationError::overflow("batch_cost"))?;
    let unit_cost = batch_cost
        .checked_div(input.target_units)
        .ok_or_else(|| CostCalculationError::overflow("target_units"))?;

    let markup = Decimal::ONE
        .checked_add(input.margin_percent / Decimal::ONE_HUNDRED)
        .ok_or_else(|| CostCalculationError::overflow("margin_percent"))?;
    let recommended_price = unit_cost
        .checked_mul(markup)
        .ok_or_else(|| CostCalculationError::overflow("margin_percent"))?;

    Ok(CostCalculationResult {
        unit_cost,
        recommended_price,
        raw_material_total,
        operating_cost_total,
        batch_cost,
    })
}

fn validate(input: &CostCalculationInput) -> Result<(), CostCalculationError> {
    if input.margin_percent < Decimal::ZERO {
        return Err(CostCalculationError::invalid(
            "margin_percent",
            "must not be negative",
        ));
    }

    for (index, line) in input.raw_materials.iter().enumerate() {
        ensure_non_negative(&format!("raw_materials[{index}].unit_cost"), line.unit_cost)?;
        ensure_non_negative(
            &format!("raw_materials[{index}].quantity_used"),
            line.quantity_used,
        )?;
    }

    for (index, line) in input.operating_costs.iter().enumerate() {
        ensure_non_negative(
            &format!("operating_costs[{index}].amount_paid"),
            line.amount_paid,
        )?;
        ensure_non_negative(
            &format!("operating_costs[{index}].quantity_purchased"),
            line.quantity_purchased,
        )?;
        ensure_non_negative(
            &format!("operating_costs[{index}].quantity_consumed"),
            line.quantity_consumed,
        )?;
    }

    Ok(())
}

fn ensure_non_negative(field: &str, value: Decimal) -> Result<(), CostCalculationError> {
    if value < Decimal::ZERO {
        Err(CostCalculationError::invalid(field, "must not be negative"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn material(unit_cost: Decimal, quantity_used: Decimal) -> RawMaterialLine {
        RawMaterialLine {
            name: "Tepung".to_string(),
            unit_cost,
            quantity_used,
            unit: "kg".to_string(),
        }
    }

    fn overhead(paid: Decimal, purchased: Decimal, consumed: Decimal) -> OperatingCostLine {
        OperatingCostLine {
            name: "Listrik".to_string(),
            amount_paid: paid,
            quantity_purchased: purchased,
            unit: "kWh".to_string(),
            quantity_consumed: consumed,
        }
    }

    fn input(
        raw_materials: Vec<RawMaterialLine>,
        operating_costs: Vec<OperatingCostLine>,
        target_units: Decimal,
        margin_percent: Decimal,
    ) -> CostCalculationInput {
        CostCalculationInput {
            raw_materials,
            operating_costs,
            target_units,
            margin_percent,
        }
    }

    #[test]
    fn raw_materials_only() {
        let result = compute_unit_cost(&input(
            vec![material(dec!(5000), dec!(2))],
            vec![],
            dec!(10),
            dec!(40),
        ))
        .unwrap();

        assert_eq!(result.raw_material_total, dec!(10000));
        assert_eq!(result.unit_cost, dec!(1000));
        assert_eq!(result.recommended_price, dec!(1400));
    }

    #[test]
    fn operating_cost_is_allocated_by_consumed_share() {
        let result = compute_unit_cost(&input(
            vec![],
            vec![overhead(dec!(50000), dec!(100), dec!(10))],
            dec!(5),
            dec!(0),
        ))
        .unwrap();

        assert_eq!(result.operating_cost_total, dec!(5000));
        assert_eq!(result.unit_cost, dec!(1000));
        assert_eq!(result.recommended_price, dec!(1000));
    }

    #[test]
    fn empty_batch_costs_nothing() {
        let result = compute_unit_cost(&input(vec![], vec![], dec!(1), dec!(25))).unwrap();
        assert_eq!(result.unit_cost, Decimal::ZERO);
        assert_eq!(result.recommended_price, Decimal::ZERO);
    }

    #[test]
    fn mixed_batch() {
        let result = compute_unit_cost(&input(
            vec![material(dec!(12000), dec!(1.5)), material(dec!(800), dec!(10))],
            vec![
                overhead(dec!(150000), dec!(100), dec!(4)),
                overhead(dec!(20000), dec!(0), dec!(3)),
            ],
            dec!(20),
            dec!(50),
        ))
        .unwrap();

        // 18000 + 8000 materials, 6000 electricity, nothing from the zero-lot line.
        assert_eq!(result.batch_cost, dec!(32000));
        assert_eq!(result.unit_cost, dec!(1600));
        assert_eq!(result.recommended_price, dec!(2400));
    }

    #[test]
    fn allocation_with_non_terminating_share_stays_exact() {
        // 3 / 900 has no finite decimal form; 3 * 150000 / 900 does.
        let result = compute_unit_cost(&input(
            vec![],
            vec![overhead(dec!(150000), dec!(900), dec!(3))],
            dec!(1),
            dec!(0),
        ))
        .unwrap();

        assert_eq!(result.operating_cost_total, dec!(500));
        assert_eq!(result.unit_cost, dec!(500));
        assert_eq!(result.recommended_price, dec!(500));
    }

    #[test]
    fn zero_target_units_is_rejected_before_anything_else() {
        let err = compute_unit_cost(&input(
            vec![material(dec!(-1), dec!(2))],
            vec![],
            dec!(0),
            dec!(-10),
        ))
        .unwrap_err();

        assert_eq!(
            err,
            CostCalculationError::InvalidInput {
                field: "target_units".to_string(),
                reason: "must be greater than zero".to_string(),
            }
        );
    }

    #[test]
    fn negative_target_units_is_rejected() {
        let result = compute_unit_cost(&input(vec![], vec![], dec!(-3), dec!(0)));
        assert!(matches!(
            result,
            Err(CostCalculationError::InvalidInput { ref field, .. }) if field == "target_units"
        ));
    }

    #[test]
    fn negative_fields_are_rejected() {
        let cases = vec![
            input(vec![material(dec!(-5), dec!(1))], vec![], dec!(1), dec!(0)),
            input(vec![material(dec!(5), dec!(-1))], vec![], dec!(1), dec!(0)),
            input(vec![], vec![overhead(dec!(-1), dec!(1), dec!(1))], dec!(1), dec!(0)),
            input(vec![], vec![overhead(dec!(1), dec!(-1), dec!(1))], dec!(1), dec!(0)),
            input(vec![], vec![overhead(dec!(1), dec!(1), dec!(-1))], dec!(1), dec!(0)),
            input(vec![], vec![], dec!(1), dec!(-0.5)),
        ];

        for case in cases {
            assert!(compute_unit_cost(&case).is_err(), "accepted {case:?}");
        }
    }

    #[test]
    fn error_names_offending_line() {
        let err = compute_unit_cost(&input(
            vec![material(dec!(1), dec!(1)), material(dec!(1), dec!(-2))],
            vec![],
            dec!(1),
            dec!(0),
        ))
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid input for raw_materials[1].quantity_used: must not be negative"
        );
    }

    #[test]
    fn recommended_price_never_below_unit_cost() {
        let margins = [dec!(0), dec!(0.01), dec!(12.5), dec!(100), dec!(350)];
        for margin in margins {
            let result = compute_unit_cost(&input(
                vec![material(dec!(3333), dec!(3))],
                vec![overhead(dec!(10000), dec!(7), dec!(2))],
                dec!(3),
                margin,
            ))
            .unwrap();
            assert!(result.recommended_price >= result.unit_cost);
        }
    }

    #[test]
    fn deterministic() {
        let request = input(
            vec![material(dec!(7000), dec!(0.25))],
            vec![overhead(dec!(45000), dec!(12), dec!(5))],
            dec!(7),
            dec!(33),
        );
        assert_eq!(
            compute_unit_cost(&request).unwrap(),
            compute_unit_cost(&request).unwrap()
        );
    }

    #[test]
    fn overflow_is_reported_as_invalid_input() {
        let result = compute_unit_cost(&input(
            vec![material(Decimal::MAX, dec!(2))],
            vec![],
            dec!(1),
            dec!(0),
        ));
        assert!(matches!(result, Err(CostCalculationError::InvalidInput { .. })));
    }

    #[test]
    fn deserializes_form_payload() {
        let json = r#"{
            "raw_materials": [{"name": "Gula", "unit_cost": 5000, "quantity_used": "2"}],
            "target_units": 10,
            "margin_percent": 40
        }"#;
        let parsed: CostCalculationInput = serde_json::from_str(json).unwrap();
        assert!(parsed.operating_costs.is_empty());
        assert_eq!(compute_unit_cost(&parsed).unwrap().recommended_price, dec!(1400));
    }
}
