use crate::config::SelectionConfig;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use survey_analytics::aggregator::{distinct_values, group_sum, total};
use survey_analytics::consumption::scan_patterns;
use survey_analytics::geo::join_coordinates;
use survey_analytics::metrics::{
    breakdown, extreme_entities, leading_share, profit_by_entity, profit_extremes, ExtremeEntities,
    ProfitExtremes, ProfitRow, ShareRow,
};
use survey_analytics::monthly::{default_mapping, monthly_series, MonthlyTotal};
use survey_analytics::regression::{self, DEFAULT_SEED, DEFAULT_TEST_FRACTION};
use survey_analytics::{
    AggregateRow, ConsumptionReport, CoordinateEntry, Dimension, ExpenseRecord, GeoPoint,
    IncomeRecord, RegressionReport, Selection, SurveyData,
};

/// Region and year multi-select as applied to the overview sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFilters {
    pub regions: Vec<String>,
    pub years: Vec<String>,
}

/// Per-entity totals split by a second dimension plus the entity extremes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub detail: Dimension,
    pub by_entity_and_detail: Vec<AggregateRow>,
    pub totals_by_entity: Vec<AggregateRow>,
    pub extremes: Option<ExtremeEntities>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitSection {
    pub year: i64,
    pub rows: Vec<ProfitRow>,
    pub extremes: Option<ProfitExtremes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFocus {
    pub year: i64,
    pub entity: String,
    pub expense_by_category: Vec<ShareRow>,
    pub selected_category: Option<String>,
    pub category_descriptions: Vec<ShareRow>,
    pub income_by_description: Vec<ShareRow>,
    pub expense_by_place: Vec<ShareRow>,
    pub expense_by_payment: Vec<ShareRow>,
    pub monthly_income: Vec<MonthlyTotal>,
    pub main_expense_category: Option<ShareRow>,
    pub main_income_description: Option<ShareRow>,
    pub total_income: f64,
    pub total_expense: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryComparison {
    pub year: i64,
    pub category: String,
    pub by_entity: Vec<AggregateRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegressionOutcome {
    Fitted(RegressionReport),
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSection {
    pub expenses: Vec<GeoPoint>,
    pub income: Vec<GeoPoint>,
}

/// Everything the dashboard shows for one set of choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub filters: AppliedFilters,
    pub expense_overview: Overview,
    pub income_overview: Overview,
    pub profit: Option<ProfitSection>,
    pub focus: Option<EntityFocus>,
    pub category_comparison: Option<CategoryComparison>,
    pub consumption: Option<ConsumptionReport>,
    pub regression: RegressionOutcome,
    pub maps: Option<MapSection>,
}

pub struct Dashboard<'a> {
    data: &'a SurveyData,
    choices: &'a SelectionConfig,
}

impl<'a> Dashboard<'a> {
    pub fn new(data: &'a SurveyData, choices: &'a SelectionConfig) -> Self {
        Self { data, choices }
    }

    /// Build every section except the maps, which need the coordinate file.
    pub fn build(&self) -> DashboardSnapshot {
        let expenses = &self.data.expenses;
        let income = &self.data.income;

        let filters = self.applied_filters();
        let selection = self.overview_selection();

        let filtered_expenses = selection.apply(expenses);
        let filtered_income = selection.apply(income);
        if filtered_expenses.is_empty() {
            warn!("Region/year selection matches no expense rows");
        }

        info!("Building overview sections");
        let expense_overview = overview(&filtered_expenses, Dimension::Category);
        let income_overview = overview(&filtered_income, Dimension::Description);

        let profit = self.profit_year().map(|year| self.profit_section(year));

        let focus_year = self.focus_year();
        let focus = focus_year.and_then(|year| self.entity_focus(year));
        let category_comparison = focus_year.and_then(|year| self.category_comparison(year));

        let consumption = focus_year.map(|year| {
            let year_rows = Selection::new()
                .with_value(Dimension::Year, year.to_string())
                .apply(expenses);
            scan_patterns(&year_rows)
        });

        info!("Fitting income/expense regression");
        let regression = match regression::estimate(
            regression::entity_totals(income, expenses),
            DEFAULT_TEST_FRACTION,
            DEFAULT_SEED,
        ) {
            Ok(report) => RegressionOutcome::Fitted(report),
            Err(e) => {
                warn!("Regression skipped: {}", e);
                RegressionOutcome::Skipped { reason: e.to_string() }
            }
        };

        DashboardSnapshot {
            filters,
            expense_overview,
            income_overview,
            profit,
            focus,
            category_comparison,
            consumption,
            regression,
            maps: None,
        }
    }

    /// Join unfiltered per-entity totals with the coordinate table.
    pub fn maps(&self, coords: &[CoordinateEntry]) -> MapSection {
        let expense_totals = group_sum(&self.data.expenses, &[Dimension::Entity]);
        let income_totals = group_sum(&self.data.income, &[Dimension::Entity]);

        MapSection {
            expenses: join_coordinates(coords, &expense_totals),
            income: join_coordinates(coords, &income_totals),
        }
    }

    /// Unset region or year choices leave that dimension unconstrained, so
    /// rows with a null region or year still count.
    fn overview_selection(&self) -> Selection {
        let mut selection = Selection::new();
        if !self.choices.regions.is_empty() {
            selection = selection.with_values(Dimension::Region, self.choices.regions.clone());
        }
        if !self.choices.years.is_empty() {
            selection = selection.with_values(
                Dimension::Year,
                self.choices.years.iter().map(i64::to_string),
            );
        }
        selection
    }

    fn applied_filters(&self) -> AppliedFilters {
        let regions = if self.choices.regions.is_empty() {
            distinct_values(&self.data.expenses, Dimension::Region)
        } else {
            self.choices.regions.clone()
        };

        let years = if self.choices.years.is_empty() {
            distinct_values(&self.data.expenses, Dimension::Year)
        } else {
            self.choices.years.iter().map(i64::to_string).collect()
        };

        AppliedFilters { regions, years }
    }

    /// Years in the order they first appear in the expense table.
    fn years(&self) -> Vec<i64> {
        let mut years = Vec::new();
        for record in &self.data.expenses {
            if let Some(year) = record.year {
                if !years.contains(&year) {
                    years.push(year);
                }
            }
        }
        years
    }

    fn profit_year(&self) -> Option<i64> {
        self.choices
            .profit_year
            .or_else(|| self.years().first().copied())
    }

    fn focus_year(&self) -> Option<i64> {
        self.choices
            .focus_year
            .or_else(|| self.years().into_iter().min())
    }

    fn profit_section(&self, year: i64) -> ProfitSection {
        let year_filter = Selection::new().with_value(Dimension::Year, year.to_string());
        let income = year_filter.apply(&self.data.income);
        let expenses = year_filter.apply(&self.data.expenses);

        let rows = profit_by_entity(&income, &expenses);
        let extremes = profit_extremes(&rows);
        ProfitSection { year, rows, extremes }
    }

    fn entity_focus(&self, year: i64) -> Option<EntityFocus> {
        let year_filter = Selection::new().with_value(Dimension::Year, year.to_string());
        let year_expenses = year_filter.apply(&self.data.expenses);

        let entity = match &self.choices.entity {
            Some(entity) => entity.clone(),
            None => match distinct_values(year_expenses.iter().copied(), Dimension::Entity)
                .into_iter()
                .next()
            {
                Some(entity) => entity,
                None => {
                    warn!("No expense rows in {}, entity focus skipped", year);
                    return None;
                }
            },
        };
        info!("Focusing on {} ({})", entity, year);

        let entity_filter = year_filter.with_value(Dimension::Entity, entity.as_str());
        let expenses: Vec<&ExpenseRecord> = entity_filter.apply(&self.data.expenses);
        let income: Vec<&IncomeRecord> = entity_filter.apply(&self.data.income);
        if expenses.is_empty() && income.is_empty() {
            warn!("No survey rows for {} in {}", entity, year);
        }

        let expense_by_category = breakdown(expenses.iter().copied(), Dimension::Category);
        let selected_category = self
            .choices
            .focus_category
            .clone()
            .or_else(|| expense_by_category.first().map(|r| r.key.clone()));

        let category_descriptions = match &selected_category {
            Some(category) => {
                let rows = Selection::new()
                    .with_value(Dimension::Category, category.as_str())
                    .apply(expenses.iter().copied());
                breakdown(rows, Dimension::Description)
            }
            None => Vec::new(),
        };

        let income_by_description = breakdown(income.iter().copied(), Dimension::Description);
        let total_income = total(income.iter().copied());
        let total_expense = total(expenses.iter().copied());

        Some(EntityFocus {
            year,
            entity,
            main_expense_category: leading_share(&expense_by_category).cloned(),
            main_income_description: leading_share(&income_by_description).cloned(),
            expense_by_place: breakdown(expenses.iter().copied(), Dimension::PlaceOfPurchase),
            expense_by_payment: breakdown(expenses.iter().copied(), Dimension::PaymentMethod),
            monthly_income: monthly_series(income.iter().copied(), &default_mapping()),
            expense_by_category,
            selected_category,
            category_descriptions,
            income_by_description,
            total_income,
            total_expense,
            profit: total_income - total_expense,
        })
    }

    fn category_comparison(&self, year: i64) -> Option<CategoryComparison> {
        let category = match &self.choices.compare_category {
            Some(category) => category.clone(),
            None => distinct_values(&self.data.expenses, Dimension::Category)
                .into_iter()
                .next()?,
        };

        let rows = Selection::new()
            .with_value(Dimension::Year, year.to_string())
            .with_value(Dimension::Category, category.as_str())
            .apply(&self.data.expenses);

        Some(CategoryComparison {
            year,
            by_entity: group_sum(rows, &[Dimension::Entity]),
            category,
        })
    }
}

fn overview<R: survey_analytics::SurveyRecord>(rows: &[&R], detail: Dimension) -> Overview {
    Overview {
        detail,
        by_entity_and_detail: group_sum(rows.iter().copied(), &[Dimension::Entity, detail]),
        totals_by_entity: group_sum(rows.iter().copied(), &[Dimension::Entity]),
        extremes: extreme_entities(rows, detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(region: &str, year: i64, entity: &str, category: &str, amount: f64) -> ExpenseRecord {
        ExpenseRecord {
            region: Some(region.to_string()),
            year: Some(year),
            entity_name: Some(entity.to_string()),
            category: Some(category.to_string()),
            description: Some(format!("{} varios", category)),
            place_of_purchase: Some("Mercado".to_string()),
            payment_method: Some("Efectivo".to_string()),
            quarterly_amount: amount,
        }
    }

    fn income(region: &str, year: i64, entity: &str, amount: f64) -> IncomeRecord {
        IncomeRecord {
            region: Some(region.to_string()),
            year: Some(year),
            entity_name: Some(entity.to_string()),
            description: Some("Sueldos".to_string()),
            quarterly_amount: amount,
            monthly: [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        }
    }

    fn sample() -> SurveyData {
        SurveyData {
            expenses: vec![
                expense("Occidente", 2022, "Jalisco", "Alimentos", 300.0),
                expense("Occidente", 2022, "Jalisco", "Vivienda", 100.0),
                expense("Noroeste", 2020, "Sonora", "Alimentos", 50.0),
                expense("Noroeste", 2020, "Sonora", "Salud", 80.0),
                expense("Occidente", 2020, "Jalisco", "Salud", 20.0),
            ],
            income: vec![
                income("Occidente", 2022, "Jalisco", 900.0),
                income("Noroeste", 2020, "Sonora", 100.0),
                income("Occidente", 2020, "Jalisco", 60.0),
            ],
        }
    }

    #[test]
    fn test_defaults_follow_first_year_and_entity() {
        let data = sample();
        let choices = SelectionConfig::default();

        let snapshot = Dashboard::new(&data, &choices).build();

        assert_eq!(snapshot.filters.years, vec!["2022", "2020"]);
        assert_eq!(snapshot.profit.as_ref().unwrap().year, 2022);

        let focus = snapshot.focus.as_ref().unwrap();
        assert_eq!(focus.year, 2020);
        assert_eq!(focus.entity, "Sonora");
        assert_eq!(focus.selected_category.as_deref(), Some("Alimentos"));
        assert_eq!(focus.total_expense, 130.0);
        assert_eq!(focus.profit, -30.0);
        assert_eq!(focus.main_expense_category.as_ref().unwrap().key, "Salud");
        assert_eq!(focus.monthly_income[0].label, "abril");
        assert_eq!(focus.monthly_income[0].total, 6.0);

        let comparison = snapshot.category_comparison.as_ref().unwrap();
        assert_eq!(comparison.category, "Alimentos");
        assert_eq!(comparison.by_entity.len(), 1);
        assert_eq!(comparison.by_entity[0].label(), "Sonora");
    }

    #[test]
    fn test_region_filter_narrows_overview() {
        let data = sample();
        let choices = SelectionConfig {
            regions: vec!["Occidente".to_string()],
            ..SelectionConfig::default()
        };

        let snapshot = Dashboard::new(&data, &choices).build();

        let totals = &snapshot.expense_overview.totals_by_entity;
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].amount, 420.0);

        let extremes = snapshot.expense_overview.extremes.as_ref().unwrap();
        assert_eq!(extremes.highest.entity.key, "Jalisco");
        assert_eq!(extremes.highest.entity, extremes.lowest.entity);
    }

    #[test]
    fn test_default_selection_keeps_rows_without_region_or_year() {
        let mut data = sample();
        let mut unlabeled = expense("Noroeste", 2020, "Sonora", "Salud", 50.0);
        unlabeled.region = None;
        data.expenses.push(unlabeled);
        let mut undated = expense("Noroeste", 2020, "Sonora", "Salud", 25.0);
        undated.year = None;
        data.expenses.push(undated);
        let choices = SelectionConfig::default();

        let snapshot = Dashboard::new(&data, &choices).build();

        let totals = &snapshot.expense_overview.totals_by_entity;
        let sonora = totals.iter().find(|r| r.label() == "Sonora").unwrap();
        assert_eq!(sonora.amount, 205.0);
        let whole: f64 = data.expenses.iter().map(|r| r.quarterly_amount).sum();
        let parts: f64 = totals.iter().map(|r| r.amount).sum();
        assert_eq!(parts, whole);
    }

    #[test]
    fn test_focus_year_without_rows_skips_focus() {
        let data = sample();
        let choices = SelectionConfig {
            focus_year: Some(1999),
            ..SelectionConfig::default()
        };

        let snapshot = Dashboard::new(&data, &choices).build();
        assert!(snapshot.focus.is_none());
    }

    #[test]
    fn test_regression_skipped_with_too_few_entities() {
        let data = sample();
        let choices = SelectionConfig::default();

        let snapshot = Dashboard::new(&data, &choices).build();
        assert!(matches!(snapshot.regression, RegressionOutcome::Skipped { .. }));
    }

    #[test]
    fn test_maps_zero_fill_missing_states() {
        let data = sample();
        let choices = SelectionConfig::default();
        let coords = vec![
            CoordinateEntry { label: "Jalisco".to_string(), lat: 20.6, lng: -103.3 },
            CoordinateEntry { label: "Yucatán".to_string(), lat: 20.9, lng: -89.6 },
        ];

        let maps = Dashboard::new(&data, &choices).maps(&coords);

        assert_eq!(maps.expenses[0].value, 420.0);
        assert_eq!(maps.expenses[1].value, 0.0);
        assert!(!maps.income[1].matched);
    }
}
