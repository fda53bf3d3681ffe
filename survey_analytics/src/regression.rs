//! Ordinary least squares of total expense on total income, one point per
//! entity, evaluated on a seeded hold-out split.

use crate::aggregator::group_sum;
use crate::error::{AnalyticsError, Result};
use crate::models::{Dimension, ExpenseRecord, IncomeRecord, Metric};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;

/// Income and expense totals of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTotals {
    pub entity: String,
    pub income: f64,
    pub expense: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub fit: LinearFit,
    pub r2: Metric,
    pub mse: Metric,
    pub train_size: usize,
    pub test_size: usize,
    pub points: Vec<EntityTotals>,
}

/// Inner join of income and expense totals per entity, in entity order.
pub fn entity_totals(income: &[IncomeRecord], expenses: &[ExpenseRecord]) -> Vec<EntityTotals> {
    let expense_by_entity: BTreeMap<String, f64> = group_sum(expenses, &[Dimension::Entity])
        .into_iter()
        .map(|row| (row.label().to_string(), row.amount))
        .collect();

    group_sum(income, &[Dimension::Entity])
        .into_iter()
        .filter_map(|row| {
            let entity = row.label().to_string();
            expense_by_entity.get(&entity).map(|&expense| EntityTotals {
                entity,
                income: row.amount,
                expense,
            })
        })
        .collect()
}

/// Shuffle `0..n` with a fixed seed and cut off `ceil(n * test_fraction)`
/// indices for evaluation. Returns `(train, test)`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_size = ((n as f64) * test_fraction).ceil() as usize;
    let test = indices.split_off(n - test_size.min(n));
    (indices, test)
}

pub fn fit_ols(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    if x.len() != y.len() {
        return Err(AnalyticsError::InsufficientData(format!(
            "{} x values for {} y values",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(AnalyticsError::InsufficientData(format!(
            "least squares needs at least 2 points, got {}",
            x.len()
        )));
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        sxx += (xi - mean_x).powi(2);
        sxy += (xi - mean_x) * (yi - mean_y);
    }

    if sxx == 0.0 {
        return Err(AnalyticsError::InsufficientData(
            "all income totals are identical".to_string(),
        ));
    }

    let slope = sxy / sxx;
    Ok(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Coefficient of determination of `predicted` against `actual`.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> Metric {
    if actual.len() < 2 {
        return Metric::Undefined;
    }

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();

    if ss_tot == 0.0 {
        Metric::Undefined
    } else {
        Metric::Value(1.0 - ss_res / ss_tot)
    }
}

pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Metric {
    if actual.is_empty() {
        return Metric::Undefined;
    }

    let sum: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    Metric::Value(sum / actual.len() as f64)
}

/// Fit on a seeded split of the per-entity totals and score the held-out part.
pub fn estimate(points: Vec<EntityTotals>, test_fraction: f64, seed: u64) -> Result<RegressionReport> {
    let (train, test) = train_test_split(points.len(), test_fraction, seed);

    let pick = |indices: &[usize], f: fn(&EntityTotals) -> f64| -> Vec<f64> {
        indices.iter().map(|&i| f(&points[i])).collect()
    };

    let fit = fit_ols(&pick(&train, |p| p.income), &pick(&train, |p| p.expense))?;

    let actual = pick(&test, |p| p.expense);
    let predicted: Vec<f64> = pick(&test, |p| p.income)
        .into_iter()
        .map(|x| fit.predict(x))
        .collect();

    Ok(RegressionReport {
        fit,
        r2: r_squared(&actual, &predicted),
        mse: mean_squared_error(&actual, &predicted),
        train_size: train.len(),
        test_size: test.len(),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INCOME: [f64; 5] = [10.0, 20.0, 30.0, 40.0, 50.0];
    const EXPENSE: [f64; 5] = [8.0, 19.0, 33.0, 38.0, 47.0];

    #[test]
    fn test_fit_beats_constant_baseline() {
        let fit = fit_ols(&INCOME, &EXPENSE).unwrap();
        let predicted: Vec<f64> = INCOME.iter().map(|&x| fit.predict(x)).collect();

        let mean = EXPENSE.iter().sum::<f64>() / EXPENSE.len() as f64;
        let baseline = vec![mean; EXPENSE.len()];

        let model_r2 = r_squared(&EXPENSE, &predicted).value().unwrap();
        let baseline_r2 = r_squared(&EXPENSE, &baseline).value().unwrap();

        assert!((1.0 - model_r2).abs() < (1.0 - baseline_r2).abs());
        assert!(model_r2 > 0.95);
        assert!((fit.slope - 0.97).abs() < 1e-9);
    }

    #[test]
    fn test_split_is_reproducible_and_disjoint() {
        let (train_a, test_a) = train_test_split(10, 0.2, DEFAULT_SEED);
        let (train_b, test_b) = train_test_split(10, 0.2, DEFAULT_SEED);

        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 2);
        assert_eq!(train_a.len(), 8);

        let mut all: Vec<usize> = train_a.into_iter().chain(test_a).collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rounds_test_size_up() {
        let (train, test) = train_test_split(5, 0.2, DEFAULT_SEED);
        assert_eq!(test.len(), 1);
        assert_eq!(train.len(), 4);

        let (train, test) = train_test_split(6, 0.2, DEFAULT_SEED);
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 4);
    }

    #[test]
    fn test_too_few_points() {
        assert!(matches!(fit_ols(&[1.0], &[2.0]), Err(AnalyticsError::InsufficientData(_))));
        assert!(matches!(
            fit_ols(&[3.0, 3.0], &[1.0, 2.0]),
            Err(AnalyticsError::InsufficientData(_))
        ));

        let points = vec![EntityTotals { entity: "A".to_string(), income: 1.0, expense: 1.0 }];
        assert!(estimate(points, DEFAULT_TEST_FRACTION, DEFAULT_SEED).is_err());
    }

    #[test]
    fn test_single_holdout_point_has_undefined_r2() {
        let points: Vec<EntityTotals> = INCOME
            .iter()
            .zip(EXPENSE)
            .enumerate()
            .map(|(i, (&income, expense))| EntityTotals {
                entity: format!("E{}", i),
                income,
                expense,
            })
            .collect();

        let report = estimate(points, DEFAULT_TEST_FRACTION, DEFAULT_SEED).unwrap();

        assert_eq!(report.train_size, 4);
        assert_eq!(report.test_size, 1);
        assert_eq!(report.r2, Metric::Undefined);
        assert!(report.mse.is_defined());
        assert!(report.fit.slope > 0.0);
    }

    #[test]
    fn test_entity_totals_inner_join() {
        let income = vec![
            IncomeRecord {
                region: None,
                year: Some(2022),
                entity_name: Some("Colima".to_string()),
                description: None,
                quarterly_amount: 100.0,
                monthly: [0.0; 6],
            },
            IncomeRecord {
                region: None,
                year: Some(2022),
                entity_name: Some("Nayarit".to_string()),
                description: None,
                quarterly_amount: 70.0,
                monthly: [0.0; 6],
            },
        ];
        let expenses = vec![ExpenseRecord {
            region: None,
            year: Some(2020),
            entity_name: Some("Colima".to_string()),
            category: None,
            description: None,
            place_of_purchase: None,
            payment_method: None,
            quarterly_amount: 60.0,
        }];

        let totals = entity_totals(&income, &expenses);
        assert_eq!(
            totals,
            vec![EntityTotals { entity: "Colima".to_string(), income: 100.0, expense: 60.0 }]
        );
    }
}
