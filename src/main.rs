use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use survey_analytics::DataLoader;

mod charts;
mod config;
mod dashboard;
mod report;

use config::DashboardConfig;
use dashboard::Dashboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
    Markdown,
}

/// Household income and expense dashboard for the Mexican household survey.
///
/// Flags override values from the configuration file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to dashboard.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Unified expense table
    #[arg(long, value_name = "CSV")]
    expenses: Option<PathBuf>,

    /// Unified income table
    #[arg(long, value_name = "CSV")]
    income: Option<PathBuf>,

    /// State coordinate table used by the maps
    #[arg(long, value_name = "JSON")]
    coordinates: Option<PathBuf>,

    /// Directory for charts and the Markdown report
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Region to include (repeatable; all regions when omitted)
    #[arg(long = "region", value_name = "REGION")]
    regions: Vec<String>,

    /// Survey year to include (repeatable; all years when omitted)
    #[arg(long = "year", value_name = "YEAR")]
    years: Vec<i64>,

    #[arg(long, value_name = "YEAR")]
    profit_year: Option<i64>,

    #[arg(long, value_name = "YEAR")]
    focus_year: Option<i64>,

    /// Entity shown in the focus section
    #[arg(long, value_name = "NAME")]
    entity: Option<String>,

    /// Expense category broken down by description in the focus section
    #[arg(long, value_name = "CATEGORY")]
    focus_category: Option<String>,

    /// Expense category compared across entities
    #[arg(long, value_name = "CATEGORY")]
    compare_category: Option<String>,

    #[arg(short, long, value_enum, default_value = "summary")]
    format: OutputFormat,

    /// Skip PNG chart rendering
    #[arg(long)]
    no_charts: bool,
}

impl Args {
    fn apply(&self, config: &mut DashboardConfig) {
        if let Some(path) = &self.expenses {
            config.inputs.expenses = path.clone();
        }
        if let Some(path) = &self.income {
            config.inputs.income = path.clone();
        }
        if let Some(path) = &self.coordinates {
            config.inputs.coordinates = path.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if self.no_charts {
            config.output.charts = false;
        }

        let selection = &mut config.selection;
        if !self.regions.is_empty() {
            selection.regions = self.regions.clone();
        }
        if !self.years.is_empty() {
            selection.years = self.years.clone();
        }
        selection.profit_year = self.profit_year.or(selection.profit_year);
        selection.focus_year = self.focus_year.or(selection.focus_year);
        if self.entity.is_some() {
            selection.entity = self.entity.clone();
        }
        if self.focus_category.is_some() {
            selection.focus_category = self.focus_category.clone();
        }
        if self.compare_category.is_some() {
            selection.compare_category = self.compare_category.clone();
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    run(Args::parse())
}

/// Build and render the dashboard. A missing coordinate file fails the run
/// only after every other section has been printed and saved.
fn run(args: Args) -> Result<()> {
    let mut config = DashboardConfig::load(args.config.as_deref())?;
    args.apply(&mut config);

    let loader = DataLoader::new(
        &config.inputs.expenses,
        &config.inputs.income,
        &config.inputs.coordinates,
    );
    let data = loader
        .load_survey()
        .context("Survey tables could not be loaded")?;

    let dashboard = Dashboard::new(&data, &config.selection);
    let mut snapshot = dashboard.build();

    let coordinates = loader.load_coordinates();
    match &coordinates {
        Ok(coords) => snapshot.maps = Some(dashboard.maps(coords)),
        Err(e) => error!("Maps unavailable: {}", e),
    }

    match args.format {
        OutputFormat::Summary => report::print_summary(&snapshot),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Markdown => report::write_markdown(&snapshot, &mut std::io::stdout().lock())?,
    }

    let output_dir = &config.output.dir;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let report_path = output_dir.join("dashboard_report.md");
    let mut file = BufWriter::new(File::create(&report_path)?);
    report::write_markdown(&snapshot, &mut file)?;
    file.flush()?;
    info!("Report saved to {}", report_path.display());

    if config.output.charts {
        let renderer = charts::ChartRenderer::new(output_dir)?;
        let written = renderer.render_all(&snapshot)?;
        info!("Rendered {} charts into {}", written.len(), output_dir.display());
    }

    coordinates
        .map(|_| ())
        .with_context(|| format!("Coordinate file {}", config.inputs.coordinates.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "household_dashboard",
            "--income",
            "ingresos.csv",
            "--year",
            "2020",
            "--year",
            "2022",
            "--entity",
            "Oaxaca",
            "--no-charts",
            "--format",
            "json",
        ]);

        let mut config = DashboardConfig::default();
        config.selection.focus_year = Some(2018);
        args.apply(&mut config);

        assert_eq!(config.inputs.income, PathBuf::from("ingresos.csv"));
        assert_eq!(config.inputs.expenses, PathBuf::from("gastosUnificados.csv"));
        assert_eq!(config.selection.years, vec![2020, 2022]);
        assert_eq!(config.selection.entity.as_deref(), Some("Oaxaca"));
        assert_eq!(config.selection.focus_year, Some(2018));
        assert!(!config.output.charts);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_defaults_leave_config_untouched() {
        let args = Args::parse_from(["household_dashboard"]);
        let mut config = DashboardConfig::default();
        args.apply(&mut config);

        assert_eq!(config, DashboardConfig::default());
        assert_eq!(args.format, OutputFormat::Summary);
    }

    #[test]
    fn test_missing_coordinates_fail_after_report_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = |name: &str| dir.path().join(name);

        std::fs::write(
            path("gastos.csv"),
            "region,anio,nombreEntidad2,categoria,descripcion,lugar_comp,forma_pag1,gasto_tri\n\
             Occidente,2022,Jalisco,Alimentos,Tortilla,Tienda,Efectivo,150\n\
             Noroeste,2022,Sonora,Salud,Consulta,Clinica,Tarjeta,80\n",
        )
        .unwrap();
        std::fs::write(
            path("ingresos.csv"),
            "region,anio,nombreEntidad2,descripcion,ing_tri,ing_1,ing_2,ing_3,ing_4,ing_5,ing_6\n\
             Occidente,2022,Jalisco,Sueldos,600,100,100,100,100,100,100\n\
             Noroeste,2022,Sonora,Negocio,300,50,50,50,50,50,50\n",
        )
        .unwrap();
        std::fs::write(path("dashboard.toml"), "").unwrap();

        let args = Args::parse_from([
            "household_dashboard".to_string(),
            "--config".to_string(),
            path("dashboard.toml").display().to_string(),
            "--expenses".to_string(),
            path("gastos.csv").display().to_string(),
            "--income".to_string(),
            path("ingresos.csv").display().to_string(),
            "--coordinates".to_string(),
            path("mexico.json").display().to_string(),
            "--output-dir".to_string(),
            path("out").display().to_string(),
            "--format".to_string(),
            "json".to_string(),
            "--no-charts".to_string(),
        ]);

        let result = run(args);

        assert!(result.is_err());
        let report = std::fs::read_to_string(path("out").join("dashboard_report.md")).unwrap();
        assert!(report.contains("## Total expenses by entity"));
        assert!(report.contains("| Jalisco | $150.00 |"));
        assert!(!report.contains("## Totals by state"));
    }
}
