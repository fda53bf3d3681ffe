use crate::cleaner::coerce_numeric;
use crate::error::{AnalyticsError, Result};
use crate::models::*;
use log::{debug, info};
use polars::prelude::*;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const EXPENSE_TEXT_COLUMNS: [&str; 6] = [
    COL_REGION,
    COL_ENTITY,
    COL_CATEGORY,
    COL_DESCRIPTION,
    COL_PLACE,
    COL_PAYMENT,
];

const INCOME_TEXT_COLUMNS: [&str; 3] = [COL_REGION, COL_ENTITY, COL_DESCRIPTION];

/// Both survey tables after cleaning.
#[derive(Debug, Clone, Default)]
pub struct SurveyData {
    pub expenses: Vec<ExpenseRecord>,
    pub income: Vec<IncomeRecord>,
}

pub struct DataLoader {
    expenses_path: PathBuf,
    income_path: PathBuf,
    coordinates_path: PathBuf,
}

impl DataLoader {
    pub fn new(
        expenses_path: impl Into<PathBuf>,
        income_path: impl Into<PathBuf>,
        coordinates_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            expenses_path: expenses_path.into(),
            income_path: income_path.into(),
            coordinates_path: coordinates_path.into(),
        }
    }

    /// Load and clean both survey tables.
    ///
    /// Both files are checked before either is read, so a missing income file
    /// fails the run without parsing the expense file first.
    pub fn load_survey(&self) -> Result<SurveyData> {
        for path in [&self.expenses_path, &self.income_path] {
            if !path.exists() {
                return Err(AnalyticsError::MissingInput(path.clone()));
            }
        }

        let expenses = load_expenses(&self.expenses_path)?;
        let income = load_income(&self.income_path)?;
        info!(
            "Loaded {} expense rows and {} income rows",
            expenses.len(),
            income.len()
        );

        Ok(SurveyData { expenses, income })
    }

    /// Load the state coordinate table. Checked separately from the survey
    /// tables since only the map section needs it.
    pub fn load_coordinates(&self) -> Result<Vec<CoordinateEntry>> {
        load_coordinates(&self.coordinates_path)
    }
}

pub fn load_expenses(path: &Path) -> Result<Vec<ExpenseRecord>> {
    let df = read_csv(path)?;
    require_columns(&df, "expense", &EXPENSE_TEXT_COLUMNS)?;
    require_columns(&df, "expense", &[COL_YEAR])?;

    let df = coerce_numeric(df, "expense", COL_EXPENSE_AMOUNT)?;
    let df = normalize_columns(df, &EXPENSE_TEXT_COLUMNS, &[])?;

    let regions = df.column(COL_REGION)?.str()?;
    let years = df.column(COL_YEAR)?.i64()?;
    let entities = df.column(COL_ENTITY)?.str()?;
    let categories = df.column(COL_CATEGORY)?.str()?;
    let descriptions = df.column(COL_DESCRIPTION)?.str()?;
    let places = df.column(COL_PLACE)?.str()?;
    let payments = df.column(COL_PAYMENT)?.str()?;
    let amounts = df.column(COL_EXPENSE_AMOUNT)?.f64()?;

    let mut records = Vec::with_capacity(df.height());
    let mut non_finite = 0;

    for idx in 0..df.height() {
        let Some(amount) = amounts.get(idx) else {
            continue;
        };
        if !amount.is_finite() {
            non_finite += 1;
            continue;
        }

        records.push(ExpenseRecord {
            region: regions.get(idx).map(str::to_string),
            year: years.get(idx),
            entity_name: entities.get(idx).map(str::to_string),
            category: categories.get(idx).map(str::to_string),
            description: descriptions.get(idx).map(str::to_string),
            place_of_purchase: places.get(idx).map(str::to_string),
            payment_method: payments.get(idx).map(str::to_string),
            quarterly_amount: amount,
        });
    }

    if non_finite > 0 {
        debug!("expense table: dropped {} rows with non-finite amounts", non_finite);
    }

    Ok(records)
}

pub fn load_income(path: &Path) -> Result<Vec<IncomeRecord>> {
    let monthly_columns: Vec<String> = MonthlyColumn::ALL.iter().map(|c| c.column_name()).collect();
    let monthly_refs: Vec<&str> = monthly_columns.iter().map(String::as_str).collect();

    let df = read_csv(path)?;
    require_columns(&df, "income", &INCOME_TEXT_COLUMNS)?;
    require_columns(&df, "income", &[COL_YEAR])?;
    require_columns(&df, "income", &monthly_refs)?;

    let df = coerce_numeric(df, "income", COL_INCOME_AMOUNT)?;
    let df = normalize_columns(df, &INCOME_TEXT_COLUMNS, &monthly_refs)?;

    let regions = df.column(COL_REGION)?.str()?;
    let years = df.column(COL_YEAR)?.i64()?;
    let entities = df.column(COL_ENTITY)?.str()?;
    let descriptions = df.column(COL_DESCRIPTION)?.str()?;
    let amounts = df.column(COL_INCOME_AMOUNT)?.f64()?;
    let monthly = monthly_refs
        .iter()
        .map(|name| df.column(name).and_then(|s| s.f64()))
        .collect::<PolarsResult<Vec<_>>>()?;

    let mut records = Vec::with_capacity(df.height());
    let mut non_finite = 0;

    for idx in 0..df.height() {
        let Some(amount) = amounts.get(idx) else {
            continue;
        };
        if !amount.is_finite() {
            non_finite += 1;
            continue;
        }

        let mut months = [0.0; 6];
        for (slot, column) in months.iter_mut().zip(&monthly) {
            *slot = column.get(idx).unwrap_or(0.0);
        }

        records.push(IncomeRecord {
            region: regions.get(idx).map(str::to_string),
            year: years.get(idx),
            entity_name: entities.get(idx).map(str::to_string),
            description: descriptions.get(idx).map(str::to_string),
            quarterly_amount: amount,
            monthly: months,
        });
    }

    if non_finite > 0 {
        debug!("income table: dropped {} rows with non-finite amounts", non_finite);
    }

    Ok(records)
}

pub fn load_coordinates(path: &Path) -> Result<Vec<CoordinateEntry>> {
    if !path.exists() {
        return Err(AnalyticsError::MissingInput(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let entries: Vec<CoordinateEntry> = serde_json::from_reader(BufReader::new(file))?;
    info!("Loaded {} coordinate entries", entries.len());
    Ok(entries)
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

fn require_columns(df: &DataFrame, table: &'static str, columns: &[&str]) -> Result<()> {
    for column in columns {
        if df.column(column).is_err() {
            return Err(AnalyticsError::MissingColumn {
                table,
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Cast categorical columns to strings, the year to integers and the
/// monthly columns to floats with nulls read as zero.
fn normalize_columns(df: DataFrame, text_columns: &[&str], monthly_columns: &[&str]) -> Result<DataFrame> {
    let mut exprs: Vec<Expr> = text_columns
        .iter()
        .map(|name| col(*name).cast(DataType::String))
        .collect();
    exprs.push(col(COL_YEAR).cast(DataType::Int64));
    exprs.extend(
        monthly_columns
            .iter()
            .map(|name| col(*name).cast(DataType::Float64).fill_null(lit(0.0))),
    );

    Ok(df.lazy().with_columns(exprs).collect()?)
}
