use crate::models::{AggregateRow, Dimension, Extrema, Metric, RankedExtremum, SurveyRecord};
use std::collections::{BTreeMap, HashSet};

/// Group `rows` by `keys` and sum the quarterly measure of each group.
///
/// Rows with a null value in any grouping column are left out. Output is
/// ordered by key, which is also the order extremum ties are resolved in.
pub fn group_sum<'a, R, I>(rows: I, keys: &[Dimension]) -> Vec<AggregateRow>
where
    R: SurveyRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut groups: BTreeMap<Vec<String>, f64> = BTreeMap::new();

    'rows: for row in rows {
        let mut group = Vec::with_capacity(keys.len());
        for dimension in keys {
            match row.key(*dimension) {
                Some(value) => group.push(value.into_owned()),
                None => continue 'rows,
            }
        }
        *groups.entry(group).or_insert(0.0) += row.amount();
    }

    groups
        .into_iter()
        .map(|(keys, amount)| AggregateRow { keys, amount })
        .collect()
}

/// Sum of the measure over every row.
pub fn total<'a, R, I>(rows: I) -> f64
where
    R: SurveyRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    rows.into_iter().map(|r| r.amount()).sum()
}

/// Distinct non-null values of `dimension`, in first-appearance order.
pub fn distinct_values<'a, R, I>(rows: I, dimension: Dimension) -> Vec<String>
where
    R: SurveyRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut seen = HashSet::new();
    let mut values = Vec::new();

    for row in rows {
        if let Some(value) = row.key(dimension) {
            if seen.insert(value.to_string()) {
                values.push(value.into_owned());
            }
        }
    }

    values
}

/// Percentage of the breakdown total each row represents.
///
/// A zero total leaves every share undefined instead of producing NaN.
pub fn shares(rows: &[AggregateRow]) -> Vec<Metric> {
    let sum: f64 = rows.iter().map(|r| r.amount).sum();
    rows.iter().map(|r| percentage(r.amount, sum)).collect()
}

pub fn percentage(part: f64, whole: f64) -> Metric {
    if whole == 0.0 {
        Metric::Undefined
    } else {
        Metric::Value(100.0 * part / whole)
    }
}

/// Arg-max and arg-min over the summed measure. The first row in breakdown
/// order wins ties; a single group is both the max and the min.
pub fn extrema(rows: &[AggregateRow]) -> Option<Extrema> {
    let first = rows.first()?;
    let sum: f64 = rows.iter().map(|r| r.amount).sum();

    let mut max = first;
    let mut min = first;
    for row in &rows[1..] {
        if row.amount > max.amount {
            max = row;
        }
        if row.amount < min.amount {
            min = row;
        }
    }

    let rank = |row: &AggregateRow| RankedExtremum {
        key: row.label().to_string(),
        value: row.amount,
        share: percentage(row.amount, sum),
    };

    Some(Extrema {
        max: rank(max),
        min: rank(min),
    })
}

/// Most frequent value; ties go to the smallest value in sorted order.
pub fn mode<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }

    best.map(|(value, _)| value.to_string())
}
