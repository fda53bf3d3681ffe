use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

// Source column names in the unified survey exports
pub const COL_REGION: &str = "region";
pub const COL_YEAR: &str = "anio";
pub const COL_ENTITY: &str = "nombreEntidad2";
pub const COL_CATEGORY: &str = "categoria";
pub const COL_DESCRIPTION: &str = "descripcion";
pub const COL_PLACE: &str = "lugar_comp";
pub const COL_PAYMENT: &str = "forma_pag1";
pub const COL_EXPENSE_AMOUNT: &str = "gasto_tri";
pub const COL_INCOME_AMOUNT: &str = "ing_tri";

/// Columns a record can be grouped or filtered by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Region,
    Year,
    Entity,
    Category,
    Description,
    PlaceOfPurchase,
    PaymentMethod,
}

impl Dimension {
    pub fn column_name(&self) -> &'static str {
        match self {
            Dimension::Region => COL_REGION,
            Dimension::Year => COL_YEAR,
            Dimension::Entity => COL_ENTITY,
            Dimension::Category => COL_CATEGORY,
            Dimension::Description => COL_DESCRIPTION,
            Dimension::PlaceOfPurchase => COL_PLACE,
            Dimension::PaymentMethod => COL_PAYMENT,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Uniform access to the categorical keys and the quarterly measure of a row.
pub trait SurveyRecord {
    /// Value of `dimension` for this row, `None` when the column is null or
    /// the record kind does not carry it.
    fn key(&self, dimension: Dimension) -> Option<Cow<'_, str>>;

    fn amount(&self) -> f64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub region: Option<String>,
    pub year: Option<i64>,
    pub entity_name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub place_of_purchase: Option<String>,
    pub payment_method: Option<String>,
    pub quarterly_amount: f64,
}

impl SurveyRecord for ExpenseRecord {
    fn key(&self, dimension: Dimension) -> Option<Cow<'_, str>> {
        match dimension {
            Dimension::Region => self.region.as_deref().map(Cow::Borrowed),
            Dimension::Year => self.year.map(|y| Cow::Owned(y.to_string())),
            Dimension::Entity => self.entity_name.as_deref().map(Cow::Borrowed),
            Dimension::Category => self.category.as_deref().map(Cow::Borrowed),
            Dimension::Description => self.description.as_deref().map(Cow::Borrowed),
            Dimension::PlaceOfPurchase => self.place_of_purchase.as_deref().map(Cow::Borrowed),
            Dimension::PaymentMethod => self.payment_method.as_deref().map(Cow::Borrowed),
        }
    }

    fn amount(&self) -> f64 {
        self.quarterly_amount
    }
}

/// One of the six monthly income columns, `ing_1` through `ing_6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MonthlyColumn(u8);

impl MonthlyColumn {
    pub const ALL: [MonthlyColumn; 6] = [
        MonthlyColumn(1),
        MonthlyColumn(2),
        MonthlyColumn(3),
        MonthlyColumn(4),
        MonthlyColumn(5),
        MonthlyColumn(6),
    ];

    /// Returns `None` outside `1..=6`.
    pub fn new(number: u8) -> Option<Self> {
        (1..=6).contains(&number).then_some(Self(number))
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize - 1
    }

    pub fn column_name(&self) -> String {
        format!("ing_{}", self.0)
    }
}

impl TryFrom<u8> for MonthlyColumn {
    type Error = String;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Self::new(number).ok_or_else(|| format!("monthly column must be 1..=6, got {}", number))
    }
}

impl From<MonthlyColumn> for u8 {
    fn from(column: MonthlyColumn) -> u8 {
        column.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub region: Option<String>,
    pub year: Option<i64>,
    pub entity_name: Option<String>,
    pub description: Option<String>,
    pub quarterly_amount: f64,
    /// `monthly[k]` holds column `ing_{k+1}`; nulls are stored as zero.
    pub monthly: [f64; 6],
}

impl IncomeRecord {
    pub fn monthly_amount(&self, column: MonthlyColumn) -> f64 {
        self.monthly[column.index()]
    }
}

impl SurveyRecord for IncomeRecord {
    fn key(&self, dimension: Dimension) -> Option<Cow<'_, str>> {
        match dimension {
            Dimension::Region => self.region.as_deref().map(Cow::Borrowed),
            Dimension::Year => self.year.map(|y| Cow::Owned(y.to_string())),
            Dimension::Entity => self.entity_name.as_deref().map(Cow::Borrowed),
            Dimension::Description => self.description.as_deref().map(Cow::Borrowed),
            Dimension::Category | Dimension::PlaceOfPurchase | Dimension::PaymentMethod => None,
        }
    }

    fn amount(&self) -> f64 {
        self.quarterly_amount
    }
}

/// Static state coordinate, as stored in `mexico.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateEntry {
    pub label: String,
    pub lat: f64,
    pub lng: f64,
}

/// Result of summing the measure over one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub keys: Vec<String>,
    pub amount: f64,
}

impl AggregateRow {
    /// Innermost grouping key, or the single key for one-column groupings.
    pub fn label(&self) -> &str {
        self.keys.last().map(String::as_str).unwrap_or("")
    }
}

/// A derived number that may have no meaningful value, e.g. a share of a
/// zero total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Metric {
    Value(f64),
    Undefined,
}

impl Metric {
    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            Metric::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Metric::Value(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedExtremum {
    pub key: String,
    pub value: f64,
    pub share: Metric,
}

/// Both sides of an extremum lookup over one breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extrema {
    pub max: RankedExtremum,
    pub min: RankedExtremum,
}
