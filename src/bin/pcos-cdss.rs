//! pcos-cdss CLI - Command-line interface for the PCOS decision support core
//!
//! Commands:
//! - assess: Predict risk for one questionnaire submission, optionally explained
//! - questions: Print the questionnaire definition
//! - doctor: Check that the artifacts load and agree with each other

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pcos_cdss::questionnaire::{PatientForm, QUESTIONS};
use pcos_cdss::{
    CdssConfig, CdssError, CdssPipeline, Classifier, RawAnswers, Session, CDSS_VERSION,
    PRODUCER_NAME,
};

/// PCOS risk clinical decision support
#[derive(Parser)]
#[command(name = "pcos-cdss")]
#[command(version = CDSS_VERSION)]
#[command(about = "Assess and explain PCOS risk from questionnaire answers", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Artifact directory; overrides the configured artifact paths
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict risk for one submission
    Assess {
        /// Answers file: a JSON object keyed by feature name (use - for stdin).
        /// Without it the default form is assessed.
        #[arg(short, long)]
        answers: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Also explain the prediction
        #[arg(long)]
        explain: bool,

        /// Write the explanation report as HTML to this path
        #[arg(long)]
        explain_html: Option<PathBuf>,

        /// Seed for reproducible explanations
        #[arg(long)]
        seed: Option<u64>,

        /// Number of features in the explanation
        #[arg(long)]
        top_k: Option<usize>,

        /// Skip answer range checks
        #[arg(long)]
        no_range_check: bool,
    },

    /// Print the questionnaire definition
    Questions {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose artifact health and configuration
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// One-line summary
    Text,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CdssCliError> {
    let mut config = load_config(cli.config.as_deref(), cli.artifacts.as_deref())?;

    match cli.command {
        Commands::Assess {
            answers,
            format,
            explain,
            explain_html,
            seed,
            top_k,
            no_range_check,
        } => {
            if seed.is_some() {
                config.explainer.seed = seed;
            }
            if let Some(top_k) = top_k {
                config.explainer.top_k = top_k;
            }
            if no_range_check {
                config.validate_ranges = false;
            }
            cmd_assess(
                config,
                answers.as_deref(),
                format,
                explain,
                explain_html.as_deref(),
            )
        }

        Commands::Questions { json } => cmd_questions(json),

        Commands::Doctor { json } => cmd_doctor(config, json),
    }
}

fn load_config(path: Option<&Path>, artifacts: Option<&Path>) -> Result<CdssConfig, CdssCliError> {
    let mut config = match path {
        Some(path) => CdssConfig::from_json_file(path)?,
        None => CdssConfig::default(),
    };
    if let Some(dir) = artifacts {
        config.artifacts = pcos_cdss::ArtifactPaths::in_dir(dir);
    }
    Ok(config)
}

fn read_answers(path: Option<&Path>) -> Result<RawAnswers, CdssCliError> {
    let Some(path) = path else {
        return Ok(PatientForm::default().to_raw_answers());
    };

    let content = if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&content)?)
}

fn cmd_assess(
    config: CdssConfig,
    answers: Option<&Path>,
    format: OutputFormat,
    explain: bool,
    explain_html: Option<&Path>,
) -> Result<(), CdssCliError> {
    let answers = read_answers(answers)?;
    let pipeline = CdssPipeline::from_config(config)?;
    let mut session = Session::new(pipeline);

    let prediction = session.predict(&answers)?;
    let explanation = if explain || explain_html.is_some() {
        Some(session.explain()?)
    } else {
        None
    };

    if let (Some(path), Some(explanation)) = (explain_html, &explanation) {
        let html = session.pipeline().renderer().render_html(explanation);
        fs::write(path, html)?;
    }

    match format {
        OutputFormat::Text => {
            println!("{}", prediction.summary());
            if let (true, Some(explanation)) = (explain, &explanation) {
                println!("\nTop contributions:");
                for contribution in &explanation.contributions {
                    println!("  {:+.3}  {}", contribution.weight, contribution.condition);
                }
                println!("\nLocal fit R^2: {:.3}", explanation.score);
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let output = AssessOutput {
                summary: prediction.summary(),
                prediction,
                explanation: explanation.filter(|_| explain),
            };
            let json = if matches!(format, OutputFormat::JsonPretty) {
                serde_json::to_string_pretty(&output)?
            } else {
                serde_json::to_string(&output)?
            };
            println!("{json}");
        }
    }

    Ok(())
}

fn cmd_questions(json: bool) -> Result<(), CdssCliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(&QUESTIONS[..])?);
        return Ok(());
    }

    println!("PCOS Risk Questionnaire");
    println!("=======================");
    for question in QUESTIONS.iter() {
        println!(
            "  {:<28} {:<22} {}",
            question.label,
            question.key,
            serde_json::to_string(&question.kind)?
        );
    }
    Ok(())
}

fn cmd_doctor(config: CdssConfig, json: bool) -> Result<(), CdssCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "cdss_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} version {}", PRODUCER_NAME, CDSS_VERSION),
    });

    match config.validate() {
        Ok(()) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "top_k {}, {} samples, frame height {}px",
                config.explainer.top_k, config.explainer.num_samples, config.report.frame_height
            ),
        }),
        Err(e) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    match CdssPipeline::from_config(config.clone()) {
        Ok(pipeline) => {
            let store = pipeline.artifacts();
            checks.push(DoctorCheck {
                name: "artifacts".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "{} model, {} features",
                    store.classifier().kind(),
                    store.schema().len()
                ),
            });

            let origin = vec![0.0; store.schema().len()];
            let probability = if store.classifier().predict_proba(&origin).is_some() {
                DoctorCheck {
                    name: "probability".to_string(),
                    status: CheckStatus::Ok,
                    message: "Model exposes probability estimates".to_string(),
                }
            } else {
                DoctorCheck {
                    name: "probability".to_string(),
                    status: CheckStatus::Warning,
                    message: "Model has no probability output; explanations unavailable"
                        .to_string(),
                }
            };
            checks.push(probability);

            let unknown: Vec<&str> = store
                .schema()
                .iter()
                .filter(|name| pcos_cdss::questionnaire::question(name).is_none())
                .collect();
            checks.push(if unknown.is_empty() {
                DoctorCheck {
                    name: "schema".to_string(),
                    status: CheckStatus::Ok,
                    message: "Every model feature has a question".to_string(),
                }
            } else {
                DoctorCheck {
                    name: "schema".to_string(),
                    status: CheckStatus::Warning,
                    message: format!("Features without a question (always 0): {}", unknown.join(", ")),
                }
            });

            checks.push(if store.has_background() {
                DoctorCheck {
                    name: "background".to_string(),
                    status: CheckStatus::Ok,
                    message: "Background sample loaded".to_string(),
                }
            } else {
                DoctorCheck {
                    name: "background".to_string(),
                    status: CheckStatus::Warning,
                    message: "No background sample; explanations use the zero-row fallback"
                        .to_string(),
                }
            });
        }
        Err(e) => checks.push(DoctorCheck {
            name: "artifacts".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: CDSS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("PCOS CDSS Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CdssCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum CdssCliError {
    Io(io::Error),
    Cdss(CdssError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for CdssCliError {
    fn from(e: io::Error) -> Self {
        CdssCliError::Io(e)
    }
}

impl From<CdssError> for CdssCliError {
    fn from(e: CdssError) -> Self {
        CdssCliError::Cdss(e)
    }
}

impl From<serde_json::Error> for CdssCliError {
    fn from(e: serde_json::Error) -> Self {
        CdssCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CdssCliError> for CliError {
    fn from(e: CdssCliError) -> Self {
        match e {
            CdssCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CdssCliError::Cdss(e) => {
                let hint = match &e {
                    CdssError::StartupFailure { .. } => {
                        Some("Run 'pcos-cdss doctor' to check the artifacts".to_string())
                    }
                    CdssError::InvalidAnswer { .. } | CdssError::UnknownCategory { .. } => {
                        Some("Run 'pcos-cdss questions' for accepted answers".to_string())
                    }
                    CdssError::ProbabilityUnavailable => {
                        Some("Use a model with probability output to explain".to_string())
                    }
                    _ => None,
                };
                CliError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    hint,
                }
            }
            CdssCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CdssCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct AssessOutput {
    summary: String,
    prediction: pcos_cdss::PredictionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<pcos_cdss::Explanation>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
