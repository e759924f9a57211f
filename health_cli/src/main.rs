use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use health_core::food_intake;
use health_core::report::{format_value, SourceStatus, SourceSummary, COVERAGE_METRICS};
use health_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "healthmerge")]
#[command(about = "Merge personal health exports into one daily table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse all sources and write the merged daily table (default)
    Merge {
        /// Food/exercise diary CSV
        #[arg(long)]
        diary: Option<PathBuf>,

        /// Directory holding the wearable-device CSV export
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Strength workout log CSV
        #[arg(long)]
        strength: Option<PathBuf>,

        /// Directory for output files
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// First day kept in the merged table (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day kept in the merged table (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Fail when a source file exists but cannot be read
        #[arg(long)]
        strict: bool,

        /// Parse and merge without writing output files
        #[arg(long)]
        dry_run: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert a food-intake export into a daily calorie CSV
    FoodIntake {
        /// Food-intake export; auto-detected in the export directory if omitted
        input: Option<PathBuf>,

        /// Output CSV (defaults to mfp_daily_calories.csv next to the input)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Write a config file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        health_core::logging::init_with_level("debug");
    } else {
        health_core::logging::init();
    }

    match cli.command {
        Some(Commands::InitConfig { force }) => cmd_init_config(cli.config, force),
        Some(Commands::FoodIntake { input, output }) => {
            let config = load_config(cli.config.as_deref())?;
            cmd_food_intake(&config, input, output)
        }
        Some(Commands::Merge {
            diary,
            export_dir,
            strength,
            output_dir,
            from,
            to,
            strict,
            dry_run,
            json,
        }) => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(path) = diary {
                config.paths.diary = path;
            }
            if let Some(dir) = export_dir {
                config.paths.export_dir = dir;
            }
            if let Some(path) = strength {
                config.paths.strength = path;
            }
            if let Some(dir) = output_dir {
                config.paths.output_dir = dir;
            }
            if let Some(start) = from {
                config.window.start = start;
            }
            if let Some(end) = to {
                config.window.end = end;
            }
            config.run.strict |= strict;
            cmd_merge(&config, dry_run, json)
        }
        None => {
            // Default to "merge" command
            let config = load_config(cli.config.as_deref())?;
            cmd_merge(&config, false, false)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => {
            let config = Config::load()?;
            config.validate()?;
            Ok(config)
        }
    }
}

fn cmd_merge(config: &Config, dry_run: bool, json: bool) -> Result<()> {
    let output = health_core::run(config, dry_run)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output.summary)?);
        return Ok(());
    }

    display_summary(&output.summary, config);

    if dry_run {
        println!("\n[Dry run - no files written]");
    }

    Ok(())
}

fn cmd_food_intake(config: &Config, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let input = match input {
        Some(path) => path,
        None => match food_intake::find_food_intake(&config.paths.export_dir)? {
            Some(path) => path,
            None => {
                return Err(Error::Other(format!(
                    "No food intake export found in {}. Pass the file explicitly.",
                    config.paths.export_dir.display()
                )));
            }
        },
    };
    let output = output.unwrap_or_else(|| food_intake::default_output(&input));

    let summary = food_intake::convert(&input, &output)?;

    println!("✓ Wrote {} days to {}", summary.days, summary.output.display());
    if let (Some(first), Some(last)) = (summary.first_day, summary.last_day) {
        println!("  Date range: {} → {}", first, last);
    }
    if let Some(avg) = summary.average_calories {
        println!("  Avg daily:  {:.0} kcal", avg);
    }

    Ok(())
}

fn cmd_init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(Config::default_config_path);
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    Config::default().save_to(&path)?;
    println!("✓ Wrote default config to {}", path.display());
    Ok(())
}

fn rule(title: &str) {
    println!("{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}

fn display_summary(summary: &RunSummary, config: &Config) {
    rule("Sources");
    for source in &summary.sources {
        display_source(source);
    }

    println!();
    rule("Merged");
    let merged = &summary.merged;
    println!(
        "  Window: {} → {}",
        config.window.start, config.window.end
    );
    println!("  Total days: {}", merged.days);
    for (metric, label) in COVERAGE_METRICS {
        if let Some(days) = merged.days_with.get(metric) {
            println!("  Days with {}: {}", label, days);
        }
    }

    for path in &summary.outputs {
        println!("  Saved → {}", path.display());
    }

    if merged.recent.is_empty() {
        return;
    }

    let shown: Vec<Metric> = [
        Metric::MfpCalories,
        Metric::ProteinG,
        Metric::WeightKg,
        Metric::StrengthSets,
        Metric::StrengthVolumeLbs,
        Metric::ExerciseMinutes,
        Metric::MeditationMinutes,
    ]
    .into_iter()
    .filter(|m| merged.columns.contains(m))
    .collect();

    println!("\n  Last {} days:", merged.recent.len());
    let mut header = format!("  {:<10}", "Date");
    for metric in &shown {
        header.push_str(&format!(" {:>width$}", metric.column_name(), width = metric.column_name().len()));
    }
    println!("{}", header);

    for record in &merged.recent {
        let mut line = format!("  {:<10}", record.date.to_string());
        for metric in &shown {
            line.push_str(&format!(
                " {:>width$}",
                format_value(record.get(*metric)),
                width = metric.column_name().len()
            ));
        }
        println!("{}", line);
    }
}

fn display_source(source: &SourceSummary) {
    match source.status {
        SourceStatus::Loaded => {}
        SourceStatus::Unavailable => {
            println!(
                "  {:<11} unavailable: {}",
                source.source,
                source.detail.as_deref().unwrap_or("no data")
            );
            return;
        }
        SourceStatus::Failed => {
            println!(
                "  {:<11} FAILED: {}",
                source.source,
                source.detail.as_deref().unwrap_or("unknown error")
            );
            return;
        }
    }

    let range = match (source.first_day, source.last_day) {
        (Some(first), Some(last)) => format!(" | Range: {} → {}", first, last),
        _ => String::new(),
    };
    println!("  {:<11} Days: {}{}", source.source, source.days, range);

    let stats = &source.stats;
    if stats.rows_skipped > 0 || stats.rows_excluded > 0 {
        println!(
            "    Rows: {} read, {} skipped, {} excluded",
            stats.rows_read, stats.rows_skipped, stats.rows_excluded
        );
    }

    let avg = |metric: Metric| source.averages.get(&metric).copied();
    match source.source {
        Source::Diary => {
            if let (Some(cal), Some(p), Some(c), Some(f)) = (
                avg(Metric::MfpCalories),
                avg(Metric::ProteinG),
                avg(Metric::CarbsG),
                avg(Metric::FatG),
            ) {
                println!(
                    "    Avg cal: {:.0} | P: {:.0}g C: {:.0}g F: {:.0}g",
                    cal, p, c, f
                );
            }
        }
        Source::Weight => {
            if let Some(latest) = source.latest {
                println!("    Latest: {:.1} kg", latest);
            }
        }
        Source::Exercise => {
            if let Some(minutes) = avg(Metric::ExerciseMinutes) {
                println!("    Avg minutes/day: {:.0}", minutes);
            }
        }
        Source::Meditation => {
            if let Some(minutes) = avg(Metric::MeditationMinutes) {
                println!("    Avg minutes/day: {:.0}", minutes);
            }
        }
        Source::Strength => {
            if let (Some(sets), Some(volume)) =
                (avg(Metric::StrengthSets), avg(Metric::StrengthVolumeLbs))
            {
                println!(
                    "    Avg sets/day: {:.0} | Avg volume: {:.0} lbs",
                    sets, volume
                );
            }
        }
    }
}
