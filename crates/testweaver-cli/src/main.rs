//! testweaver CLI: generate C# test skeletons from analysed source.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

use testweaver_core::config::{GeneratorConfig, CONFIG_FILE_NAME};
use testweaver_core::model::GenerationResult;
use testweaver_core::output::{build_report, json_report_requested, report_path, write_output};
use testweaver_core::pipeline::{self, GenerationRequest, TestGeneratorEngine};
use testweaver_core::scanner::analyze_project_structure;
use testweaver_core::CancellationToken;

#[derive(Parser)]
#[command(
    name = "testweaver",
    version,
    about = "testweaver - Generate test skeletons for C# projects"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a project and write generated test files
    Generate {
        /// Project root directory
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Output directory for generated tests
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (defaults to testweaver.config.json in the project)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Comma-separated file types or extensions, e.g. csharp,.cs
        #[arg(short, long)]
        types: Option<String>,

        /// Generate only for these source files
        #[arg(short, long, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Overwrite existing generated files
        #[arg(long)]
        overwrite: bool,

        /// Do not back up the output directory before purging it
        #[arg(long)]
        no_backup: bool,

        /// Do not look for existing tests
        #[arg(long)]
        ignore_existing: bool,

        /// Skip validation of the generated files
        #[arg(long)]
        skip_validation: bool,

        /// Suppress all output except errors
        #[arg(long)]
        silent: bool,

        /// Show debug logging and per-phase timings
        #[arg(short, long)]
        verbose: bool,
    },

    /// Write a default configuration file for a project
    Init {
        /// Project root directory
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Replace an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Check a configuration file for errors
    Validate {
        /// Configuration file to check
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: PathBuf,

        /// Print the findings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the tests one source file would receive, without writing anything
    Preview {
        /// Source file to preview
        file: PathBuf,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {message}", style("✗").red().bold());
    std::process::exit(1);
}

/// Split `csharp, .cs` into trimmed, non-empty entries.
fn parse_types(types: Option<&str>) -> Vec<String> {
    types
        .map(|t| {
            t.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Explicit config file, else the project's config file, else defaults
/// derived from the project structure.
fn load_config(project: &Path, explicit: Option<&Path>) -> Result<GeneratorConfig, String> {
    if let Some(path) = explicit {
        return GeneratorConfig::load(path).map_err(|e| e.to_string());
    }
    let in_project = project.join(CONFIG_FILE_NAME);
    if in_project.is_file() {
        return GeneratorConfig::load(&in_project).map_err(|e| e.to_string());
    }
    let structure = analyze_project_structure(project).map_err(|e| e.to_string())?;
    Ok(GeneratorConfig::default_for_project(project, &structure))
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            project,
            output,
            config,
            types,
            files,
            overwrite,
            no_backup,
            ignore_existing,
            skip_validation,
            silent,
            verbose,
        } => {
            let project = project.canonicalize().unwrap_or(project);
            let mut config = match load_config(&project, config.as_deref()) {
                Ok(c) => c,
                Err(e) => fail(format!("Failed to load configuration: {e}")),
            };
            let level = if verbose {
                LevelFilter::Debug
            } else if silent {
                LevelFilter::Error
            } else {
                config.logging.level_filter()
            };
            init_logging(level);

            config.project.root_path = project.to_string_lossy().to_string();
            if overwrite {
                config.output.overwrite_existing = true;
            }
            if no_backup {
                config.output.create_backups = false;
            }

            let request = GenerationRequest {
                project_path: project.clone(),
                output_path: output,
                files,
                file_types: parse_types(types.as_deref()),
                ignore_existing_tests: ignore_existing,
                skip_validation,
            };
            run_generate(config, &request, silent, verbose);
        }
        Commands::Init { project, force } => {
            init_logging(LevelFilter::Warn);
            run_init(&project, force);
        }
        Commands::Validate { config, json } => {
            init_logging(LevelFilter::Warn);
            run_validate(&config, json);
        }
        Commands::Preview { file, config } => {
            init_logging(LevelFilter::Warn);
            let project = file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let config = match load_config(&project, config.as_deref()) {
                Ok(c) => c,
                Err(e) => fail(format!("Failed to load configuration: {e}")),
            };
            let engine = TestGeneratorEngine::new(config);
            match engine.preview_file(&file) {
                Ok(Some(content)) => println!("{content}"),
                Ok(None) => println!("No tests would be generated for {}", file.display()),
                Err(e) => fail(format!("Preview failed: {e}")),
            }
        }
    }
}

fn run_generate(config: GeneratorConfig, request: &GenerationRequest, silent: bool, verbose: bool) {
    let write_report =
        config.output.generate_reports && json_report_requested(&config.output.report_formats);
    let engine = TestGeneratorEngine::new(config);
    let cancel = CancellationToken::new();

    let result = if silent {
        engine.run(request, None, &cancel)
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.blue} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.set_message("Initialising...");
        pb.enable_steady_tick(std::time::Duration::from_millis(80));

        let progress: pipeline::ProgressCallback = {
            let pb = pb.clone();
            Box::new(move |_name, label| {
                pb.set_message(label.to_string());
            })
        };
        let result = engine.run(request, Some(progress), &cancel);
        pb.finish_and_clear();
        result
    };

    let output_dir = engine.output_dir(request);
    if write_report && result.success {
        let path = report_path(&output_dir);
        if let Err(e) = write_output(&build_report(&result, &request.project_path), &path) {
            eprintln!("Error writing report: {e}");
        }
    }

    if !silent {
        print_summary(&result, &output_dir, verbose);
    }
    if !result.success {
        for error in &result.errors {
            eprintln!("{} {error}", style("✗").red().bold());
        }
        std::process::exit(1);
    }
}

fn print_summary(result: &GenerationResult, output_dir: &Path, verbose: bool) {
    let stats = &result.statistics;
    let mark = if result.success {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };
    println!("\n{mark}  Test generation: {}", style(output_dir.display()).bold());
    println!("  {:<18} {}", "Files analyzed:", stats.files_analyzed);
    println!("  {:<18} {}", "Files skipped:", stats.files_skipped);
    println!("  {:<18} {}", "Test files:", result.generated_files.len());
    println!("  {:<18} {}", "Test cases:", stats.test_cases_generated);
    println!("  {:<18} {}", "Classes covered:", stats.classes_covered);
    println!("  {:<18} {}", "Mocks:", stats.mocks_generated);
    println!("  {:<18} {:.1}%", "Coverage estimate:", stats.coverage_estimate);
    println!("  {:<18} {:.1}ms", "Duration:", result.duration_ms);

    if verbose {
        println!("\n  Phase Timings:");
        let mut timings: Vec<_> = stats.phase_timings.iter().collect();
        timings.sort_by(|a, b| a.0.cmp(b.0));
        for (phase, secs) in timings {
            println!("    {:<16} {:.1}ms", phase, secs * 1000.0);
        }
        for file in &result.generated_files {
            println!("  {} {}", style("+").green(), file.file_path.display());
        }
    }

    for warning in &result.warnings {
        println!("  {} {warning}", style("!").yellow());
    }
}

fn run_init(project: &Path, force: bool) {
    let path = project.join(CONFIG_FILE_NAME);
    if path.exists() && !force {
        fail(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    let structure = match analyze_project_structure(project) {
        Ok(s) => s,
        Err(e) => fail(format!("Failed to analyze project: {e}")),
    };
    let root = project.canonicalize().unwrap_or_else(|_| project.to_path_buf());
    let config = GeneratorConfig::default_for_project(&root, &structure);
    if let Err(e) = config.save(&path) {
        fail(format!("Failed to write configuration: {e}"));
    }
    println!(
        "{} {} {}",
        style("✓").green().bold(),
        style("Configuration written to:").green(),
        path.display()
    );
}

fn run_validate(path: &Path, json: bool) {
    let config = match GeneratorConfig::load(path) {
        Ok(c) => c,
        Err(e) => fail(format!("Failed to load configuration: {e}")),
    };
    let report = config.validate();
    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => fail(format!("Failed to serialise findings: {e}")),
        }
        if !report.is_valid() {
            std::process::exit(1);
        }
        return;
    }
    for error in &report.errors {
        println!("  {} {error}", style("error:").red().bold());
    }
    for warning in &report.warnings {
        println!("  {} {warning}", style("warning:").yellow());
    }
    if !report.is_valid() {
        std::process::exit(1);
    }
    println!("{} Configuration is valid", style("✓").green().bold());
}
