//! Rampart service-config compiler CLI.
//!
//! Provides `compile` and `validate` subcommands. Inputs come either from a
//! project manifest (`rampart.yaml`) or from explicit `--model`/`--config`
//! flags.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use rampart_compiler::{
    compile_files, compile_with_manifest, CollectionSummary, CompileError, CompileOptions,
    CompileResult, Diagnostic, ProjectManifest, SourceFile, SubsumptionPolicy, MANIFEST_FILE,
};
use rampart_telemetry::{log_config_written, LogFormat, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "rampart", about = "Service configuration compiler", version)]
struct Cli {
    /// Log level (RUST_LOG takes precedence).
    #[arg(long, global = true, default_value = "warn", env = "RAMPART_LOG_LEVEL")]
    log_level: String,

    /// Log format: pretty or json. Logs always go to stderr.
    #[arg(long, global = true, default_value = "pretty", value_parser = parse_log_format)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a model and service configs into a normalized service config.
    Compile {
        #[command(flatten)]
        input: InputArgs,

        /// Output file (default: stdout).
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },

    /// Check inputs and report diagnostics without emitting a config.
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Report format.
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Project manifest (default: ./rampart.yaml when --model is not given).
    #[arg(long, conflicts_with_all = ["model", "configs"])]
    manifest: Option<PathBuf>,

    /// Model file.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Service config file(s), merged in order.
    #[arg(short = 'c', long = "config", num_args = 1.., requires = "model")]
    configs: Vec<PathBuf>,

    /// Silence a warning: RULE or RULE@SELECTOR. Repeatable.
    #[arg(long)]
    suppress: Vec<String>,

    /// Shorten REST collection names where unambiguous.
    #[arg(long)]
    shorten_collection_names: bool,

    /// Wildcard subsumption direction: broader or reversed.
    #[arg(long, value_parser = parse_subsumption)]
    subsumption: Option<SubsumptionPolicy>,

    /// Abort once more than this many errors were reported.
    #[arg(long)]
    max_errors: Option<usize>,
}

impl InputArgs {
    /// Command-line flags win over manifest options.
    fn apply(&self, options: &mut CompileOptions) {
        options.suppress.extend(self.suppress.iter().cloned());
        if self.shorten_collection_names {
            options.shorten_collection_names = true;
        }
        if let Some(policy) = self.subsumption {
            options.subsumption = policy;
        }
        if let Some(max) = self.max_errors {
            options.max_errors = max;
        }
    }

    fn compile(&self) -> Result<CompileResult, CompileError> {
        if let Some(model) = &self.model {
            let mut options = CompileOptions::default();
            self.apply(&mut options);
            let configs: Vec<&Path> = self.configs.iter().map(PathBuf::as_path).collect();
            return compile_files(model, &configs, &options);
        }

        let path = self
            .manifest
            .clone()
            .unwrap_or_else(|| PathBuf::from(MANIFEST_FILE));
        let mut project = ProjectManifest::load(&path)?;
        self.apply(&mut project.options);
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        compile_with_manifest(&project, base)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

impl OutputFormat {
    fn render<T: Serialize>(self, value: &T) -> Result<String, CompileError> {
        Ok(match self {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(value)?;
                json.push('\n');
                json
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// Machine-readable `validate` output.
#[derive(Debug, Serialize)]
struct ValidationReport<'a> {
    valid: bool,
    errors: usize,
    warnings: usize,
    diagnostics: &'a [Diagnostic],
    collections: &'a [CollectionSummary],
    sources: &'a [SourceFile],
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    LogFormat::parse(s).ok_or_else(|| format!("unknown log format '{}' (pretty or json)", s))
}

fn parse_subsumption(s: &str) -> Result<SubsumptionPolicy, String> {
    match s {
        "broader" => Ok(SubsumptionPolicy::Broader),
        "reversed" => Ok(SubsumptionPolicy::Reversed),
        other => Err(format!(
            "unknown subsumption policy '{}' (broader or reversed)",
            other
        )),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry = TelemetryConfig::new()
        .with_log_level(&cli.log_level)
        .with_log_format(cli.log_format);
    if let Err(e) = rampart_telemetry::init(&telemetry) {
        eprintln!("warning: {}", e);
    }

    match cli.command {
        Command::Compile {
            input,
            output,
            format,
        } => run_compile(&input, output.as_deref(), format),
        Command::Validate { input, format } => run_validate(&input, format),
    }
}

/// Exit codes: 1 = diagnostics or invalid input, 2 = manifest error, 3 = I/O error.
fn exit_code(err: &CompileError) -> ExitCode {
    match err {
        CompileError::ManifestError(_) => ExitCode::from(2),
        CompileError::Io(_) => ExitCode::from(3),
        _ => ExitCode::from(1),
    }
}

fn run_compile(input: &InputArgs, output: Option<&Path>, format: OutputFormat) -> ExitCode {
    let result = match input.compile() {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {}", e);
            return exit_code(&e);
        }
    };
    print_diagnostics(&result);

    let Some(config) = &result.config else {
        return ExitCode::from(1);
    };
    let rendered = match format.render(config) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("error: {}", e);
            return exit_code(&e);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &rendered) {
                eprintln!("error: failed to write {}: {}", path.display(), e);
                return ExitCode::from(3);
            }
            log_config_written!(path = %path.display(), bytes = rendered.len());
            eprintln!("config written to: {}", path.display());
        }
        None => {
            print!("{}", rendered);
            log_config_written!(path = "-", bytes = rendered.len());
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(input: &InputArgs, format: ReportFormat) -> ExitCode {
    let result = match input.compile() {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {}", e);
            return exit_code(&e);
        }
    };

    match format {
        ReportFormat::Text => {
            print_diagnostics(&result);
            if result.success() {
                println!(
                    "valid: {} collection(s), {} warning(s)",
                    result.collections.len(),
                    result.warnings
                );
                for collection in &result.collections {
                    let methods: Vec<&str> =
                        collection.methods.keys().map(String::as_str).collect();
                    println!(
                        "  {} [{}]{}",
                        collection.name,
                        methods.join(", "),
                        collection
                            .resource_type
                            .as_ref()
                            .map(|t| format!(" -> {}", t))
                            .unwrap_or_default()
                    );
                }
            }
        }
        ReportFormat::Json => {
            let report = ValidationReport {
                valid: result.success(),
                errors: result.errors,
                warnings: result.warnings,
                diagnostics: &result.diagnostics,
                collections: &result.collections,
                sources: &result.sources,
            };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::from(1);
                }
            }
        }
    }

    if result.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn print_diagnostics(result: &CompileResult) {
    for diag in &result.diagnostics {
        eprintln!("{}", diag);
    }
    let hidden = (result.errors + result.warnings).saturating_sub(result.diagnostics.len());
    if hidden > 0 {
        eprintln!("note: {} more diagnostic(s) not shown", hidden);
    }
    if result.errors + result.warnings > 0 {
        eprintln!("{} error(s), {} warning(s)", result.errors, result.warnings);
    }
}
