use crate::models::{IncomeRecord, MonthlyColumn};
use serde::{Deserialize, Serialize};

/// Month labels paired with the income column each one reads.
///
/// Labels run forward through the survey window while the columns run from
/// `ing_6` down to `ing_1`. The pairing is kept exactly as declared.
pub const DEFAULT_MONTH_MAPPING: [(&str, u8); 6] = [
    ("abril", 6),
    ("mayo", 5),
    ("junio", 4),
    ("julio", 3),
    ("agosto", 2),
    ("septiembre", 1),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    pub label: String,
    pub column: MonthlyColumn,
    pub total: f64,
}

pub fn default_mapping() -> Vec<(String, MonthlyColumn)> {
    DEFAULT_MONTH_MAPPING
        .iter()
        .filter_map(|(label, number)| MonthlyColumn::new(*number).map(|c| (label.to_string(), c)))
        .collect()
}

/// Sum each mapped monthly column over `rows`, in the declared label order.
pub fn monthly_series<'a, I>(rows: I, mapping: &[(String, MonthlyColumn)]) -> Vec<MonthlyTotal>
where
    I: IntoIterator<Item = &'a IncomeRecord>,
{
    let mut totals = vec![0.0; mapping.len()];
    for row in rows {
        for (total, (_, column)) in totals.iter_mut().zip(mapping) {
            *total += row.monthly_amount(*column);
        }
    }

    mapping
        .iter()
        .zip(totals)
        .map(|((label, column), total)| MonthlyTotal {
            label: label.clone(),
            column: *column,
            total,
        })
        .collect()
}
