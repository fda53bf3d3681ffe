use survey_analytics::data_loader::load_expenses;
use survey_analytics::metrics::{breakdown, format_currency, format_percent};
use survey_analytics::{Dimension, Selection};
use std::path::PathBuf;

/// Print one entity's expenses by category for a single survey year.
///
/// cargo run -p survey_analytics --example category_breakdown -- gastosUnificados.csv Jalisco 2022
fn main() -> survey_analytics::Result<()> {
    let mut args = std::env::args().skip(1);
    let path = PathBuf::from(args.next().unwrap_or_else(|| "gastosUnificados.csv".to_string()));
    let entity = args.next().unwrap_or_else(|| "Jalisco".to_string());
    let year = args.next().unwrap_or_else(|| "2022".to_string());

    let expenses = load_expenses(&path)?;
    let view = Selection::new()
        .with_value(Dimension::Entity, entity.as_str())
        .with_value(Dimension::Year, year.as_str())
        .apply(&expenses);

    println!("{} ({}) - {} expense rows", entity, year, view.len());
    for row in breakdown(view, Dimension::Category) {
        println!(
            "  {:<40} {:>14} {:>10}",
            row.key,
            format_currency(row.amount),
            format_percent(row.share)
        );
    }

    Ok(())
}
