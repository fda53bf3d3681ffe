use crate::dashboard::{DashboardSnapshot, EntityFocus, Overview, RegressionOutcome};
use std::io::{self, Write};
use survey_analytics::metrics::{
    format_currency, format_percent, format_thousands, EntityBreakdown, ShareRow,
};
use survey_analytics::Metric;

/// Console rendering of the dashboard.
pub fn print_summary(snapshot: &DashboardSnapshot) {
    println!("💵 Household income and expenses in Mexico");
    println!("{}", "=".repeat(80));
    println!("Regions: {}", snapshot.filters.regions.join(", "));
    println!("Years:   {}", snapshot.filters.years.join(", "));

    println!("\n📊 Total expenses by entity");
    print_overview(&snapshot.expense_overview);

    println!("\n📊 Total income by entity");
    print_overview(&snapshot.income_overview);

    if let Some(profit) = &snapshot.profit {
        println!("\n💹 Profit analysis ({})", profit.year);
        match &profit.extremes {
            Some(extremes) => {
                for (marker, row) in [("🟢", &extremes.highest), ("🔴", &extremes.lowest)] {
                    println!(
                        "  {} {}: {} (income {}, expenses {})",
                        marker,
                        row.entity,
                        format_currency(row.profit),
                        format_currency(row.income),
                        format_currency(row.expense)
                    );
                }
            }
            None => println!("  No entity has both income and expense data"),
        }
    }

    if let Some(focus) = &snapshot.focus {
        print_focus(focus);
    }

    if let Some(comparison) = &snapshot.category_comparison {
        println!(
            "\n🏷️  Expenses in '{}' by entity ({})",
            comparison.category, comparison.year
        );
        for row in &comparison.by_entity {
            println!("  {:<32} {}", row.label(), format_currency(row.amount));
        }
    }

    if let Some(consumption) = &snapshot.consumption {
        println!("\n🛒 Consumption patterns by entity");
        for pattern in &consumption.patterns {
            println!(
                "  {:<32} top: {:<24} bottom: {}",
                pattern.entity, pattern.top_category, pattern.bottom_category
            );
        }
        println!(
            "  Most repeated top category:    {}",
            consumption.most_common_top.as_deref().unwrap_or("-")
        );
        println!(
            "  Most repeated bottom category: {}",
            consumption.most_common_bottom.as_deref().unwrap_or("-")
        );
    }

    println!("\n📈 Income vs expense regression");
    match &snapshot.regression {
        RegressionOutcome::Fitted(report) => {
            println!(
                "  expense = {:.4} × income + {:.2}",
                report.fit.slope, report.fit.intercept
            );
            println!("  R²:  {}", format_metric(report.r2, 4));
            println!("  MSE: {}", format_metric(report.mse, 2));
            println!(
                "  ({} entities for training, {} held out)",
                report.train_size, report.test_size
            );
        }
        RegressionOutcome::Skipped { reason } => println!("  Skipped: {}", reason),
    }

    if let Some(maps) = &snapshot.maps {
        let unmatched = maps.expenses.iter().filter(|p| !p.matched).count();
        println!(
            "\n🗺️  {} states mapped ({} without survey totals)",
            maps.expenses.len(),
            unmatched
        );
    }
}

fn print_overview(overview: &Overview) {
    for row in &overview.totals_by_entity {
        println!("  {:<32} {}", row.label(), format_currency(row.amount));
    }

    if let Some(extremes) = &overview.extremes {
        for (marker, side) in [("🟢", &extremes.highest), ("🔴", &extremes.lowest)] {
            println!(
                "  {} {} {}",
                marker,
                side.entity.key,
                format_currency(side.entity.value)
            );
            if let (Some(top), Some(bottom)) = (&side.top, &side.bottom) {
                println!("      ▲ {}: {}", top.key, format_percent(top.share));
                println!("      ▼ {}: {}", bottom.key, format_percent(bottom.share));
            }
        }
    }
}

fn print_focus(focus: &EntityFocus) {
    println!("\n🔎 {} ({})", focus.entity, focus.year);
    print_shares("Expenses by category", &focus.expense_by_category);
    if let Some(category) = &focus.selected_category {
        print_shares(&format!("'{}' by description", category), &focus.category_descriptions);
    }
    print_shares("Income by description", &focus.income_by_description);
    print_shares("Expenses by place of purchase", &focus.expense_by_place);
    print_shares("Expenses by payment method", &focus.expense_by_payment);

    println!("  Monthly income:");
    for month in &focus.monthly_income {
        println!("    {:<12} {}", month.label, format_currency(month.total));
    }

    if let Some(main) = &focus.main_income_description {
        println!("  🟦 Main income source: {} {}", main.key, format_percent(main.share));
    }
    if let Some(main) = &focus.main_expense_category {
        println!("  🟧 Main expense category: {} {}", main.key, format_percent(main.share));
    }
    println!("  🏦 Profit: {}", format_thousands(focus.profit));
}

fn print_shares(title: &str, rows: &[ShareRow]) {
    println!("  {}:", title);
    for row in rows {
        println!(
            "    {:<40} {:>14} {:>10}",
            row.key,
            format_currency(row.amount),
            format_percent(row.share)
        );
    }
}

fn format_metric(metric: Metric, decimals: usize) -> String {
    match metric {
        Metric::Value(v) => format!("{:.*}", decimals, v),
        Metric::Undefined => "n/a".to_string(),
    }
}

/// Markdown rendering of the dashboard, one section per dashboard block.
pub fn write_markdown<W: Write>(snapshot: &DashboardSnapshot, out: &mut W) -> io::Result<()> {
    writeln!(out, "# Household income and expenses in Mexico")?;
    writeln!(out)?;
    writeln!(out, "- **Regions**: {}", snapshot.filters.regions.join(", "))?;
    writeln!(out, "- **Years**: {}", snapshot.filters.years.join(", "))?;
    writeln!(out)?;

    writeln!(out, "## Total expenses by entity")?;
    writeln!(out)?;
    write_overview(out, &snapshot.expense_overview)?;

    writeln!(out, "## Total income by entity")?;
    writeln!(out)?;
    write_overview(out, &snapshot.income_overview)?;

    if let Some(profit) = &snapshot.profit {
        writeln!(out, "## Profit analysis ({})", profit.year)?;
        writeln!(out)?;
        writeln!(out, "| Entity | Income | Expenses | Profit |")?;
        writeln!(out, "|--------|--------|----------|--------|")?;
        for row in &profit.rows {
            writeln!(
                out,
                "| {} | {} | {} | {} |",
                row.entity,
                format_currency(row.income),
                format_currency(row.expense),
                format_currency(row.profit)
            )?;
        }
        writeln!(out)?;
        if let Some(extremes) = &profit.extremes {
            writeln!(
                out,
                "- **Highest profit**: {} ({})",
                extremes.highest.entity,
                format_currency(extremes.highest.profit)
            )?;
            writeln!(
                out,
                "- **Lowest profit**: {} ({})",
                extremes.lowest.entity,
                format_currency(extremes.lowest.profit)
            )?;
            writeln!(out)?;
        }
    }

    if let Some(focus) = &snapshot.focus {
        writeln!(out, "## {} ({})", focus.entity, focus.year)?;
        writeln!(out)?;
        write_share_table(out, "Expenses by category", &focus.expense_by_category)?;
        if let Some(category) = &focus.selected_category {
            write_share_table(
                out,
                &format!("'{}' by description", category),
                &focus.category_descriptions,
            )?;
        }
        write_share_table(out, "Income by description", &focus.income_by_description)?;
        write_share_table(out, "Expenses by place of purchase", &focus.expense_by_place)?;
        write_share_table(out, "Expenses by payment method", &focus.expense_by_payment)?;

        writeln!(out, "### Monthly income")?;
        writeln!(out)?;
        writeln!(out, "| Month | Column | Total |")?;
        writeln!(out, "|-------|--------|-------|")?;
        for month in &focus.monthly_income {
            writeln!(
                out,
                "| {} | {} | {} |",
                month.label,
                month.column.column_name(),
                format_currency(month.total)
            )?;
        }
        writeln!(out)?;

        if let Some(main) = &focus.main_income_description {
            writeln!(out, "- **Main income source**: {} ({})", main.key, format_percent(main.share))?;
        }
        if let Some(main) = &focus.main_expense_category {
            writeln!(out, "- **Main expense category**: {} ({})", main.key, format_percent(main.share))?;
        }
        writeln!(out, "- **Profit**: {}", format_thousands(focus.profit))?;
        writeln!(out)?;
    }

    if let Some(comparison) = &snapshot.category_comparison {
        writeln!(out, "## '{}' by entity ({})", comparison.category, comparison.year)?;
        writeln!(out)?;
        writeln!(out, "| Entity | Expenses |")?;
        writeln!(out, "|--------|----------|")?;
        for row in &comparison.by_entity {
            writeln!(out, "| {} | {} |", row.label(), format_currency(row.amount))?;
        }
        writeln!(out)?;
    }

    if let Some(consumption) = &snapshot.consumption {
        writeln!(out, "## Consumption patterns by entity")?;
        writeln!(out)?;
        writeln!(out, "| Entity | Top category | Bottom category |")?;
        writeln!(out, "|--------|--------------|-----------------|")?;
        let cell = |category: &str| {
            if consumption.is_highlighted(category) {
                format!("**{}**", category)
            } else {
                category.to_string()
            }
        };
        for pattern in &consumption.patterns {
            writeln!(
                out,
                "| {} | {} | {} |",
                pattern.entity,
                cell(&pattern.top_category),
                cell(&pattern.bottom_category)
            )?;
        }
        writeln!(out)?;
        writeln!(
            out,
            "- **Most repeated top category**: {}",
            consumption.most_common_top.as_deref().unwrap_or("-")
        )?;
        writeln!(
            out,
            "- **Most repeated bottom category**: {}",
            consumption.most_common_bottom.as_deref().unwrap_or("-")
        )?;
        writeln!(out)?;
    }

    writeln!(out, "## Income vs expense regression")?;
    writeln!(out)?;
    match &snapshot.regression {
        RegressionOutcome::Fitted(report) => {
            writeln!(out, "| Metric | Value |")?;
            writeln!(out, "|--------|-------|")?;
            writeln!(out, "| Slope | {:.4} |", report.fit.slope)?;
            writeln!(out, "| Intercept | {:.2} |", report.fit.intercept)?;
            writeln!(out, "| R² | {} |", format_metric(report.r2, 4))?;
            writeln!(out, "| MSE | {} |", format_metric(report.mse, 2))?;
            writeln!(out, "| Training entities | {} |", report.train_size)?;
            writeln!(out, "| Held-out entities | {} |", report.test_size)?;
        }
        RegressionOutcome::Skipped { reason } => writeln!(out, "Skipped: {}", reason)?,
    }
    writeln!(out)?;

    if let Some(maps) = &snapshot.maps {
        writeln!(out, "## Totals by state")?;
        writeln!(out)?;
        writeln!(out, "| State | Latitude | Longitude | Expenses | Income |")?;
        writeln!(out, "|-------|----------|-----------|----------|--------|")?;
        for (expense, income) in maps.expenses.iter().zip(&maps.income) {
            writeln!(
                out,
                "| {} | {:.4} | {:.4} | {} | {} |",
                expense.label,
                expense.latitude,
                expense.longitude,
                format_currency(expense.value),
                format_currency(income.value)
            )?;
        }
        writeln!(out)?;
    }

    Ok(())
}

fn write_overview<W: Write>(out: &mut W, overview: &Overview) -> io::Result<()> {
    writeln!(out, "| Entity | Total |")?;
    writeln!(out, "|--------|-------|")?;
    for row in &overview.totals_by_entity {
        writeln!(out, "| {} | {} |", row.label(), format_currency(row.amount))?;
    }
    writeln!(out)?;

    if let Some(extremes) = &overview.extremes {
        write_extreme(out, "Highest", &extremes.highest)?;
        write_extreme(out, "Lowest", &extremes.lowest)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_extreme<W: Write>(out: &mut W, title: &str, side: &EntityBreakdown) -> io::Result<()> {
    writeln!(
        out,
        "- **{}**: {} ({})",
        title,
        side.entity.key,
        format_currency(side.entity.value)
    )?;
    if let (Some(top), Some(bottom)) = (&side.top, &side.bottom) {
        writeln!(out, "  - largest: {} ({})", top.key, format_percent(top.share))?;
        writeln!(out, "  - smallest: {} ({})", bottom.key, format_percent(bottom.share))?;
    }
    Ok(())
}

fn write_share_table<W: Write>(out: &mut W, title: &str, rows: &[ShareRow]) -> io::Result<()> {
    writeln!(out, "### {}", title)?;
    writeln!(out)?;
    writeln!(out, "| Key | Amount | Share |")?;
    writeln!(out, "|-----|--------|-------|")?;
    for row in rows {
        writeln!(
            out,
            "| {} | {} | {} |",
            row.key,
            format_currency(row.amount),
            format_percent(row.share)
        )?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectionConfig;
    use crate::dashboard::Dashboard;
    use survey_analytics::{ExpenseRecord, IncomeRecord, SurveyData};

    fn data() -> SurveyData {
        let expense = |entity: &str, category: &str, amount: f64| ExpenseRecord {
            region: Some("Sureste".to_string()),
            year: Some(2022),
            entity_name: Some(entity.to_string()),
            category: Some(category.to_string()),
            description: Some("Varios".to_string()),
            place_of_purchase: Some("Tianguis".to_string()),
            payment_method: Some("Efectivo".to_string()),
            quarterly_amount: amount,
        };
        let income = |entity: &str, amount: f64| IncomeRecord {
            region: Some("Sureste".to_string()),
            year: Some(2022),
            entity_name: Some(entity.to_string()),
            description: Some("Sueldos".to_string()),
            quarterly_amount: amount,
            monthly: [10.0; 6],
        };

        SurveyData {
            expenses: vec![
                expense("Yucatán", "Alimentos", 700.0),
                expense("Yucatán", "Salud", 100.0),
                expense("Quintana Roo", "Alimentos", 400.0),
                expense("Quintana Roo", "Salud", 50.0),
            ],
            income: vec![income("Yucatán", 1500.0), income("Quintana Roo", 300.0)],
        }
    }

    #[test]
    fn test_markdown_highlights_repeated_categories() {
        let data = data();
        let choices = SelectionConfig::default();
        let snapshot = Dashboard::new(&data, &choices).build();

        let mut out = Vec::new();
        write_markdown(&snapshot, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("## Consumption patterns by entity"));
        assert!(text.contains("| Yucatán | **Alimentos** | **Salud** |"));
        assert!(text.contains("- **Highest profit**: Yucatán ($700.00)"));
        assert!(text.contains("| abril | ing_6 | $10.00 |"));
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let data = data();
        let choices = SelectionConfig::default();
        let snapshot = Dashboard::new(&data, &choices).build();

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: DashboardSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.filters, snapshot.filters);
        assert_eq!(back.consumption, snapshot.consumption);
    }
}
