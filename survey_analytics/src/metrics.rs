use crate::aggregator::{extrema, group_sum, shares};
use crate::filter::Selection;
use crate::models::{Dimension, ExpenseRecord, IncomeRecord, Metric, RankedExtremum, SurveyRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One line of a breakdown together with its share of the breakdown total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRow {
    pub key: String,
    pub amount: f64,
    pub share: Metric,
}

/// How one entity's total splits over a second dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityBreakdown {
    pub entity: RankedExtremum,
    pub rows: Vec<ShareRow>,
    pub top: Option<RankedExtremum>,
    pub bottom: Option<RankedExtremum>,
}

/// The highest and lowest entity of a view, each broken down further.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremeEntities {
    pub highest: EntityBreakdown,
    pub lowest: EntityBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitRow {
    pub entity: String,
    pub income: f64,
    pub expense: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitExtremes {
    pub highest: ProfitRow,
    pub lowest: ProfitRow,
}

/// Group by `dimension` and attach each row's percentage of the total.
pub fn breakdown<'a, R, I>(rows: I, dimension: Dimension) -> Vec<ShareRow>
where
    R: SurveyRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let grouped = group_sum(rows, &[dimension]);
    let pct = shares(&grouped);

    grouped
        .into_iter()
        .zip(pct)
        .map(|(row, share)| ShareRow {
            key: row.label().to_string(),
            amount: row.amount,
            share,
        })
        .collect()
}

/// Largest share in a breakdown, first row winning ties.
pub fn leading_share(rows: &[ShareRow]) -> Option<&ShareRow> {
    rows.iter().fold(None, |best: Option<&ShareRow>, row| match best {
        Some(b) if b.amount >= row.amount => Some(b),
        _ => Some(row),
    })
}

/// Find the entities with the largest and smallest totals and break each of
/// them down by `detail`.
pub fn extreme_entities<R: SurveyRecord>(rows: &[&R], detail: Dimension) -> Option<ExtremeEntities> {
    let found = extrema(&group_sum(rows.iter().copied(), &[Dimension::Entity]))?;

    let describe = |entity: RankedExtremum| {
        let entity_rows = Selection::new()
            .with_value(Dimension::Entity, entity.key.as_str())
            .apply(rows.iter().copied());
        let detail_rows = group_sum(entity_rows.iter().copied(), &[detail]);
        let detail_extrema = extrema(&detail_rows);

        EntityBreakdown {
            rows: breakdown(entity_rows, detail),
            top: detail_extrema.as_ref().map(|e| e.max.clone()),
            bottom: detail_extrema.map(|e| e.min),
            entity,
        }
    };

    Some(ExtremeEntities {
        highest: describe(found.max),
        lowest: describe(found.min),
    })
}

/// Income minus expense per entity, for entities present on both sides.
pub fn profit_by_entity(income: &[&IncomeRecord], expenses: &[&ExpenseRecord]) -> Vec<ProfitRow> {
    let expense_by_entity: BTreeMap<String, f64> = group_sum(expenses.iter().copied(), &[Dimension::Entity])
        .into_iter()
        .map(|row| (row.label().to_string(), row.amount))
        .collect();

    group_sum(income.iter().copied(), &[Dimension::Entity])
        .into_iter()
        .filter_map(|row| {
            let expense = *expense_by_entity.get(row.label())?;
            Some(ProfitRow {
                entity: row.label().to_string(),
                income: row.amount,
                expense,
                profit: row.amount - expense,
            })
        })
        .collect()
}

pub fn profit_extremes(rows: &[ProfitRow]) -> Option<ProfitExtremes> {
    let first = rows.first()?;
    let mut highest = first;
    let mut lowest = first;

    for row in &rows[1..] {
        if row.profit > highest.profit {
            highest = row;
        }
        if row.profit < lowest.profit {
            lowest = row;
        }
    }

    Some(ProfitExtremes {
        highest: highest.clone(),
        lowest: lowest.clone(),
    })
}

/// `$` followed by the amount, sign included: `$-3.00` for a loss.
pub fn format_currency(value: f64) -> String {
    format!("${:.2}", value)
}

pub fn format_percent(metric: Metric) -> String {
    match metric {
        Metric::Value(v) => format!("{:.2} %", v),
        Metric::Undefined => "n/a".to_string(),
    }
}

/// Two decimals with comma thousands separators, e.g. `-1,234,567.89`.
pub fn format_thousands(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}
