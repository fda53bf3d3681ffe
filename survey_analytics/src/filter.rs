use crate::models::{Dimension, SurveyRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Set-membership predicates over record dimensions, combined with AND.
///
/// A dimension without an entry is unconstrained. A dimension mapped to an
/// empty set matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    allowed: BTreeMap<Dimension, BTreeSet<String>>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Multi-select: permit any of `values` for `dimension`.
    pub fn with_values<I, S>(mut self, dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed
            .insert(dimension, values.into_iter().map(Into::into).collect());
        self
    }

    /// Single-select: permit exactly `value` for `dimension`.
    pub fn with_value(self, dimension: Dimension, value: impl Into<String>) -> Self {
        self.with_values(dimension, [value.into()])
    }

    pub fn allowed(&self, dimension: Dimension) -> Option<&BTreeSet<String>> {
        self.allowed.get(&dimension)
    }

    pub fn matches<R: SurveyRecord>(&self, record: &R) -> bool {
        self.allowed.iter().all(|(dimension, values)| {
            record
                .key(*dimension)
                .is_some_and(|value| values.contains(value.as_ref()))
        })
    }

    /// Rows of `rows` matching every predicate, in their original order.
    pub fn apply<'a, R, I>(&self, rows: I) -> Vec<&'a R>
    where
        R: SurveyRecord + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        rows.into_iter().filter(|r| self.matches(*r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExpenseRecord;

    fn expense(region: &str, year: i64, entity: &str, amount: f64) -> ExpenseRecord {
        ExpenseRecord {
            region: Some(region.to_string()),
            year: Some(year),
            entity_name: Some(entity.to_string()),
            category: Some("Alimentos".to_string()),
            description: None,
            place_of_purchase: None,
            payment_method: None,
            quarterly_amount: amount,
        }
    }

    fn sample() -> Vec<ExpenseRecord> {
        vec![
            expense("Norte", 2020, "Sonora", 10.0),
            expense("Norte", 2022, "Chihuahua", 20.0),
            expense("Sur", 2020, "Oaxaca", 30.0),
            expense("Centro", 2022, "Puebla", 40.0),
        ]
    }

    #[test]
    fn test_filters_compose_as_and() {
        let rows = sample();
        let selection = Selection::new()
            .with_values(Dimension::Region, ["Norte", "Sur"])
            .with_values(Dimension::Year, ["2020"]);

        let filtered = selection.apply(&rows);

        assert!(filtered.len() <= rows.len());
        let entities: Vec<_> = filtered.iter().map(|r| r.entity_name.as_deref().unwrap()).collect();
        assert_eq!(entities, vec!["Sonora", "Oaxaca"]);
        for row in filtered {
            assert!(["Norte", "Sur"].contains(&row.region.as_deref().unwrap()));
            assert_eq!(row.year, Some(2020));
        }
    }

    #[test]
    fn test_empty_permitted_set_yields_empty_result() {
        let rows = sample();
        let selection = Selection::new().with_values(Dimension::Region, Vec::<String>::new());

        assert!(selection.apply(&rows).is_empty());
    }

    #[test]
    fn test_no_constraints_is_identity() {
        let rows = sample();
        assert_eq!(Selection::new().apply(&rows).len(), rows.len());
    }

    #[test]
    fn test_null_values_never_match() {
        let mut rows = sample();
        rows[0].region = None;

        let selection = Selection::new().with_value(Dimension::Region, "Norte");
        let filtered = selection.apply(&rows);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].entity_name.as_deref(), Some("Chihuahua"));
    }
}
