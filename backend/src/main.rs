//! Profiles CLI - Build pipeline profile dashboard data
//!
//! # Main Commands
//!
//! ```bash
//! profiles build ngtl --test                       # Every section of a profile
//! profiles incidents --company "NOVA Gas Transmission Ltd."
//! profiles conditions --company "Alliance Pipeline Ltd." --lang fr
//! profiles traffic --commodity gas --frequency daily --sql
//! profiles tolls --pipeline Alliance
//! profiles cache import traffic export.csv        # Manage cached extracts
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! profiles parse input.csv                       # Just parse CSV to JSON
//! profiles most-common input.csv --column Substance --top 2
//! profiles profiles                              # List known profiles
//! ```

use clap::{Args, Parser, Subcommand};
use profiles::models::{Commodity, CompanyScope, Domain, Frequency, Lang};
use profiles::profiles::PROFILES;
use profiles::{
    build_profile, most_common, parse_csv_file_auto, run_conditions, run_incidents, run_tolls,
    run_traffic, BuildOptions, ConditionRequest, ExtractCache, IncidentRequest, OutputConfig,
    SourceConfig, TableLoader, TollsRequest, TrafficRequest,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "profiles")]
#[command(about = "Build JSON data for pipeline company profile dashboards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where rows come from
#[derive(Args)]
struct SourceArgs {
    /// Company to include (repeatable; all companies when omitted)
    #[arg(short, long = "company")]
    companies: Vec<String>,

    /// Query the warehouse and refresh the cached extract
    #[arg(long)]
    remote: bool,

    /// Use the bundled sample data
    #[arg(long)]
    test: bool,
}

/// Where artifacts go
#[derive(Args)]
struct OutputArgs {
    /// Output directory (default: $PROFILES_OUT_DIR or dist)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Skip schema validation
    #[arg(long)]
    no_validate: bool,
}

impl OutputArgs {
    fn config(&self) -> OutputConfig {
        let config = match &self.out_dir {
            Some(dir) => OutputConfig::new(dir),
            None => OutputConfig::from_env(),
        };
        if self.no_validate {
            config.without_validation()
        } else {
            config
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the incidents artifact
    Incidents {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Build the conditions artifact
    Conditions {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: OutputArgs,
        /// Label language
        #[arg(long, value_enum, default_value = "en")]
        lang: Lang,
    },

    /// Build the traffic artifact
    Traffic {
        /// Company to include (repeatable; all companies when omitted)
        #[arg(short, long = "company")]
        companies: Vec<String>,
        /// Query the warehouse and refresh the cached extract
        #[arg(long)]
        sql: bool,
        /// Use the bundled sample data
        #[arg(long)]
        test: bool,
        #[arg(long, value_enum, default_value = "gas")]
        commodity: Commodity,
        #[arg(long, value_enum, default_value = "monthly")]
        frequency: Frequency,
        /// Trend text language
        #[arg(long, value_enum, default_value = "en")]
        lang: Lang,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Build tolls artifacts, one per pipeline
    Tolls {
        /// Pipeline to include (repeatable; all pipelines when omitted)
        #[arg(short, long = "pipeline")]
        pipelines: Vec<String>,
        /// Query the warehouse and refresh the cached extract
        #[arg(long)]
        remote: bool,
        /// Use the bundled sample data
        #[arg(long)]
        test: bool,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Build every section of a company profile
    Build {
        /// Profile id (see `profiles profiles`)
        profile: String,
        /// Query the warehouse and refresh the cached extracts
        #[arg(long)]
        remote: bool,
        /// Use the bundled sample data
        #[arg(long)]
        test: bool,
        #[arg(long, value_enum, default_value = "en")]
        lang: Lang,
        #[arg(long, value_enum, default_value = "monthly")]
        frequency: Frequency,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List known company profiles
    Profiles,

    /// Parse a CSV file and output JSON rows
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Most common values of a CSV column
    MostCommon {
        /// Input CSV file
        input: PathBuf,
        /// Column to count
        #[arg(short, long)]
        column: String,
        /// Number of values to keep
        #[arg(short, long, default_value = "1")]
        top: usize,
    },

    /// Manage cached extracts
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached extracts
    List,

    /// Import a CSV export as the extract of a domain
    Import {
        /// incidents, conditions, traffic or tolls
        domain: Domain,
        /// CSV file to import
        file: PathBuf,
    },

    /// Delete the cached extract of a domain
    Delete {
        /// incidents, conditions, traffic or tolls
        domain: Domain,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let loader = TableLoader::new(SourceConfig::from_env());

    let result: CliResult = match cli.command {
        Commands::Incidents { source, output } => {
            let request = IncidentRequest {
                remote: source.remote,
                test: source.test,
                companies: CompanyScope::new(source.companies),
            };
            run_incidents(&loader, &request, &output.config())
                .await
                .map(|path| report(&[path]))
                .map_err(Into::into)
        }

        Commands::Conditions {
            source,
            output,
            lang,
        } => {
            let request = ConditionRequest {
                remote: source.remote,
                test: source.test,
                companies: CompanyScope::new(source.companies),
                lang,
            };
            run_conditions(&loader, &request, &output.config())
                .await
                .map(|path| report(&[path]))
                .map_err(Into::into)
        }

        Commands::Traffic {
            companies,
            sql,
            test,
            commodity,
            frequency,
            lang,
            output,
        } => {
            let request = TrafficRequest {
                test,
                sql,
                commodity,
                frequency,
                companies: CompanyScope::new(companies),
                lang,
            };
            run_traffic(&loader, &request, &output.config())
                .await
                .map(|path| report(&[path]))
                .map_err(Into::into)
        }

        Commands::Tolls {
            pipelines,
            remote,
            test,
            output,
        } => {
            let request = TollsRequest {
                remote,
                test,
                pipelines: CompanyScope::new(pipelines),
            };
            run_tolls(&loader, &request, &output.config())
                .await
                .map(|paths| report(&paths))
                .map_err(Into::into)
        }

        Commands::Build {
            profile,
            remote,
            test,
            lang,
            frequency,
            output,
        } => {
            let options = BuildOptions {
                test,
                remote,
                lang,
                frequency,
            };
            build_profile(&loader, &profile, &options, &output.config())
                .await
                .map(|built| {
                    for warning in &built.warnings {
                        eprintln!("⚠️  {}", warning);
                    }
                    report(&built.artifacts)
                })
                .map_err(Into::into)
        }

        Commands::Profiles => cmd_profiles(),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::MostCommon { input, column, top } => cmd_most_common(&input, &column, top),

        Commands::Cache { action } => cmd_cache(&loader, action),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn report(paths: &[PathBuf]) {
    for path in paths {
        println!("{}", path.display());
    }
    eprintln!("✨ Done! {} artifact(s) written", paths.len());
}

fn cmd_profiles() -> CliResult {
    for profile in PROFILES {
        let mut sections = vec!["safety"];
        if profile.sections.traffic {
            sections.push("traffic");
        }
        if profile.sections.apportion {
            sections.push("apportion");
        }
        if profile.sections.tolls {
            sections.push("tolls");
        }
        println!(
            "{:<20} {:<4} {:<50} {}",
            profile.id,
            profile.commodity.as_str(),
            profile.company,
            sections.join(", ")
        );
    }
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file_auto(input)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.table.headers().join(", "));
    eprintln!("✅ Parsed {} records", result.table.len());

    let json = serde_json::to_string_pretty(result.table.rows())?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_most_common(input: &Path, column: &str, top: usize) -> CliResult {
    let result = parse_csv_file_auto(input)?;
    match most_common(&result.table, column, top)? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => eprintln!("⚠️  Column '{}' has no values", column),
    }
    Ok(())
}

fn cmd_cache(loader: &TableLoader, action: CacheAction) -> CliResult {
    let cache: &ExtractCache = loader.cache();

    match action {
        CacheAction::List => {
            let extracts = cache.list();
            if extracts.is_empty() {
                eprintln!("📋 No cached extracts in {}", cache.dir().display());
                eprintln!("   Use 'profiles cache import <domain> <file>' or --remote to add one.");
                return Ok(());
            }

            eprintln!("📋 Cached extracts ({}):\n", extracts.len());
            for extract in extracts {
                println!("  📄 {}", extract.domain);
                println!("     Rows: {}", extract.rows);
                println!("     Source: {}", extract.source);
                println!("     Fetched: {}", extract.fetched_at);
                println!();
            }
        }

        CacheAction::Import { domain, file } => {
            eprintln!("📥 Importing {} extract from: {}", domain, file.display());
            let rows = cache.import(domain, &file)?;
            eprintln!("✅ Cached {} rows", rows);
        }

        CacheAction::Delete { domain } => {
            cache.delete(domain)?;
            eprintln!("🗑️  Extract deleted: {}", domain);
        }
    }

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
