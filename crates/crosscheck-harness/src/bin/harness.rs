//! CLI entrypoint for the crosscheck conformance harness.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use crosscheck_harness::codec::encode_all;
use crosscheck_harness::name_filter::apply_filter;
use crosscheck_harness::structured_log::{LogEmitter, validate_log_file};
use crosscheck_harness::{
    CancelSignal, Caller, InvocationError, Invoker, InvokerConfig, TestCaseFilter,
    TestCaseLibrary, WireCodec,
};
use crosscheck_model::{ClientCompatRequest, ClientResponseResult, ConfigCase, TestMode, TestSuite};
use serde::Serialize;

/// Conformance case tooling.
#[derive(Debug, Parser)]
#[command(name = "harness")]
#[command(about = "Build and exercise protocol conformance test cases")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Client,
    Server,
}

impl From<ModeArg> for TestMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Client => Self::Client,
            ModeArg::Server => Self::Server,
        }
    }
}

#[derive(Debug, clap::Args)]
struct BuildArgs {
    /// Suite JSON files.
    #[arg(long = "suites", required = true, num_args = 1..)]
    suites: Vec<PathBuf>,
    /// JSON array of supported configuration points.
    #[arg(long)]
    config_cases: PathBuf,
    #[arg(long, value_enum, default_value = "client")]
    mode: ModeArg,
    /// Only keep cases matching this pattern (repeatable).
    #[arg(long)]
    run: Vec<String>,
    /// Drop cases matching this pattern (repeatable).
    #[arg(long)]
    skip: Vec<String>,
    /// Also emit cases for the alternate gRPC client.
    #[arg(long)]
    alt_client: bool,
    /// Also emit cases for the alternate gRPC server.
    #[arg(long)]
    alt_server: bool,
    /// Structured JSONL log path.
    #[arg(long)]
    log: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Expand suites into concrete cases and write a JSON report.
    Expand {
        #[command(flatten)]
        build: BuildArgs,
        /// Output path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Drive the expanded requests through the invoker, answering each with
    /// its expected response, and write the response records.
    Replay {
        #[command(flatten)]
        build: BuildArgs,
        #[arg(long, value_enum, default_value = "json")]
        codec: WireCodec,
        /// Maximum calls in flight (defaults to four per core).
        #[arg(long)]
        parallelism: Option<usize>,
        /// Output path for response records.
        #[arg(long)]
        output: PathBuf,
    },
    /// Validate a structured JSONL log file.
    ValidateLog {
        #[arg(long)]
        log: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct ServerSummary {
    server: String,
    cases: usize,
}

#[derive(Debug, Serialize)]
struct ExpansionReport {
    fingerprint: String,
    total_cases: usize,
    servers: Vec<ServerSummary>,
    cases: Vec<crosscheck_model::TestCase>,
}

/// Answers every request with the response the library predicted for it.
struct ReplayCaller {
    expected: BTreeMap<String, ClientResponseResult>,
}

impl Caller for ReplayCaller {
    fn call(
        &self,
        request: &ClientCompatRequest,
        _connect_timeout: Duration,
    ) -> impl Future<Output = Result<ClientResponseResult, InvocationError>> + Send {
        let result = self
            .expected
            .get(&request.test_name)
            .cloned()
            .ok_or_else(|| {
                InvocationError::Call(format!("no expectation for {}", request.test_name))
            });
        std::future::ready(result)
    }
}

fn load_suites(paths: &[PathBuf]) -> Result<Vec<TestSuite>, Box<dyn std::error::Error>> {
    paths
        .iter()
        .map(|path| {
            TestSuite::from_file(path).map_err(|err| format!("{}: {err}", path.display()).into())
        })
        .collect()
}

fn load_config_cases(path: &Path) -> Result<Vec<ConfigCase>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn build(
    args: &BuildArgs,
) -> Result<(TestCaseLibrary, Vec<crosscheck_model::TestCase>), Box<dyn std::error::Error>> {
    let suites = load_suites(&args.suites)?;
    let config_cases = load_config_cases(&args.config_cases)?;
    let mode = TestMode::from(args.mode);
    let library = match &args.log {
        Some(path) => {
            let mut log = LogEmitter::to_file(path, "crosscheck", "expand")?;
            let library = TestCaseLibrary::new_with_log(&suites, &config_cases, mode, &mut log)?;
            log.flush()?;
            library
        }
        None => TestCaseLibrary::new(&suites, &config_cases, mode)?,
    };
    let filter = TestCaseFilter::from_patterns(&args.run, &args.skip);
    let cases = apply_filter(
        filter.as_ref(),
        library.all_permutations(args.alt_client, args.alt_server),
    );
    eprintln!(
        "Expanded {} suites into {} cases ({} selected)",
        suites.len(),
        library.len(),
        cases.len()
    );
    Ok((library, cases))
}

fn write_output(output: Option<&Path>, content: &str) -> std::io::Result<()> {
    match output {
        Some(path) => std::fs::write(path, content),
        None => {
            println!("{content}");
            Ok(())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Expand { build: args, output } => {
            let (library, cases) = build(&args)?;
            let report = ExpansionReport {
                fingerprint: library.fingerprint(),
                total_cases: cases.len(),
                servers: library
                    .cases_by_server
                    .iter()
                    .map(|(server, names)| ServerSummary {
                        server: server.to_string(),
                        cases: names.len(),
                    })
                    .collect(),
                cases,
            };
            write_output(output.as_deref(), &serde_json::to_string_pretty(&report)?)?;
        }
        Command::Replay {
            build: args,
            codec,
            parallelism,
            output,
        } => {
            let (_library, cases) = build(&args)?;
            let mut config = InvokerConfig::default().with_codec(codec);
            if let Some(parallelism) = parallelism {
                config = config.with_parallelism(parallelism);
            }
            let caller = Arc::new(ReplayCaller {
                expected: cases
                    .iter()
                    .map(|case| {
                        (
                            case.request.test_name.clone(),
                            case.expected_response.clone().unwrap_or_default(),
                        )
                    })
                    .collect(),
            });
            let requests: Vec<ClientCompatRequest> =
                cases.into_iter().map(|case| case.request).collect();

            let runtime = tokio::runtime::Runtime::new()?;
            let summary = runtime.block_on(async {
                let input = encode_all(&requests, codec).await?;
                let file = tokio::fs::File::create(&output).await?;
                let invoker = match &args.log {
                    Some(path) => {
                        let log_path = path.with_extension("invoke.jsonl");
                        let log = LogEmitter::to_file(&log_path, "crosscheck", "replay")?;
                        Invoker::new(config)?.with_log(log.shared())
                    }
                    None => Invoker::new(config)?,
                };
                invoker
                    .run(input.as_slice(), file, caller, &CancelSignal::new())
                    .await
                    .map_err(Box::<dyn std::error::Error>::from)
            })?;
            eprintln!(
                "Replayed {} requests ({} case errors) to {}",
                summary.dispatched,
                summary.case_errors,
                output.display()
            );
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            for err in &errors {
                eprintln!("{err}");
            }
            if !errors.is_empty() {
                return Err(format!("{} validation errors in {lines} log lines", errors.len()).into());
            }
            eprintln!("{lines} log lines valid");
        }
    }

    Ok(())
}
