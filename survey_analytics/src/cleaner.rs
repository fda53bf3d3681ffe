use crate::error::{AnalyticsError, Result};
use log::debug;
use polars::prelude::*;

/// Coerce `column` to `Float64` and drop every row where it ends up null.
///
/// Unparseable entries become null under the non-strict cast, so they are
/// discarded here without surfacing an error. The drop count is logged.
pub fn coerce_numeric(df: DataFrame, table: &'static str, column: &str) -> Result<DataFrame> {
    if df.column(column).is_err() {
        return Err(AnalyticsError::MissingColumn {
            table,
            column: column.to_string(),
        });
    }

    let before = df.height();
    let cleaned = df
        .lazy()
        .with_column(col(column).cast(DataType::Float64))
        .filter(col(column).is_not_null())
        .collect()?;

    let dropped = before - cleaned.height();
    if dropped > 0 {
        debug!(
            "{} table: dropped {} of {} rows with non-numeric `{}`",
            table, dropped, before, column
        );
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparseable_amounts_are_dropped() {
        let df = df!(
            "nombreEntidad2" => &["Jalisco", "Sonora", "Yucatán", "Colima"],
            "gasto_tri" => &["100", "abc", "2.5", ""]
        )
        .unwrap();

        let cleaned = coerce_numeric(df, "expense", "gasto_tri").unwrap();

        assert_eq!(cleaned.height(), 2);
        let amounts: Vec<Option<f64>> = cleaned.column("gasto_tri").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(amounts, vec![Some(100.0), Some(2.5)]);
    }

    #[test]
    fn test_numeric_column_is_kept_intact() {
        let df = df!(
            "ing_tri" => &[1i64, 2, 3]
        )
        .unwrap();

        let cleaned = coerce_numeric(df, "income", "ing_tri").unwrap();
        assert_eq!(cleaned.height(), 3);
        assert_eq!(cleaned.column("ing_tri").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let df = df!("region" => &["Norte"]).unwrap();

        let err = coerce_numeric(df, "expense", "gasto_tri").unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingColumn { column, .. } if column == "gasto_tri"));
    }
}
