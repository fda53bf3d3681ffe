use crate::aggregator::{distinct_values, extrema, group_sum, mode};
use crate::filter::Selection;
use crate::models::{Dimension, ExpenseRecord};
use serde::{Deserialize, Serialize};

/// Highest and lowest spending category of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionPattern {
    pub entity: String,
    pub top_category: String,
    pub bottom_category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionReport {
    pub patterns: Vec<ConsumptionPattern>,
    pub most_common_top: Option<String>,
    pub most_common_bottom: Option<String>,
}

impl ConsumptionReport {
    /// Whether a category cell should be highlighted as matching either mode.
    pub fn is_highlighted(&self, category: &str) -> bool {
        self.most_common_top.as_deref() == Some(category)
            || self.most_common_bottom.as_deref() == Some(category)
    }
}

/// Scan every entity of an (already year-filtered) expense view.
pub fn scan_patterns(rows: &[&ExpenseRecord]) -> ConsumptionReport {
    let mut patterns = Vec::new();

    for entity in distinct_values(rows.iter().copied(), Dimension::Entity) {
        let entity_rows = Selection::new()
            .with_value(Dimension::Entity, entity.as_str())
            .apply(rows.iter().copied());

        if let Some(found) = extrema(&group_sum(entity_rows, &[Dimension::Category])) {
            patterns.push(ConsumptionPattern {
                entity,
                top_category: found.max.key,
                bottom_category: found.min.key,
            });
        }
    }

    let most_common_top = mode(patterns.iter().map(|p| p.top_category.as_str()));
    let most_common_bottom = mode(patterns.iter().map(|p| p.bottom_category.as_str()));

    ConsumptionReport {
        patterns,
        most_common_top,
        most_common_bottom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(entity: &str, category: &str, amount: f64) -> ExpenseRecord {
        ExpenseRecord {
            region: Some("Centro".to_string()),
            year: Some(2022),
            entity_name: Some(entity.to_string()),
            category: Some(category.to_string()),
            description: None,
            place_of_purchase: None,
            payment_method: None,
            quarterly_amount: amount,
        }
    }

    #[test]
    fn test_patterns_per_entity() {
        let rows = vec![
            expense("Puebla", "Alimentos", 500.0),
            expense("Puebla", "Salud", 20.0),
            expense("Puebla", "Vivienda", 300.0),
            expense("Tlaxcala", "Alimentos", 400.0),
            expense("Tlaxcala", "Salud", 50.0),
            expense("Morelos", "Vivienda", 900.0),
            expense("Morelos", "Transporte", 10.0),
        ];
        let view: Vec<&ExpenseRecord> = rows.iter().collect();

        let report = scan_patterns(&view);

        let entities: Vec<&str> = report.patterns.iter().map(|p| p.entity.as_str()).collect();
        assert_eq!(entities, vec!["Puebla", "Tlaxcala", "Morelos"]);
        assert_eq!(report.patterns[0].top_category, "Alimentos");
        assert_eq!(report.patterns[0].bottom_category, "Salud");
        assert_eq!(report.patterns[2].bottom_category, "Transporte");

        assert_eq!(report.most_common_top.as_deref(), Some("Alimentos"));
        assert_eq!(report.most_common_bottom.as_deref(), Some("Salud"));
        assert!(report.is_highlighted("Salud"));
        assert!(!report.is_highlighted("Vivienda"));
    }

    #[test]
    fn test_empty_view() {
        let report = scan_patterns(&[]);
        assert!(report.patterns.is_empty());
        assert!(report.most_common_top.is_none());
    }
}
