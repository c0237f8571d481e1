//! FormAssist - Scanned form filling and eligibility checks
//!
//! Recognizes the fields of a scanned form, lets the user fill them in and
//! writes the values back onto the image. Also runs the rule-based
//! eligibility checks and keeps a local log of every result.

mod app;
mod config;
mod eligibility;
mod forms;
mod shared;
mod storage;
mod vision;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::FormAssistApp;
use crate::config::AppConfig;
use crate::eligibility::{
    CasteCategory, CreditCardCheck, EligibilityCheck, InsuranceClaim, LoanCheck, SchemeCheck,
    VisaCheck,
};
use crate::forms::{FormField, FormStep, SourceDocument};
use crate::shared::Notice;
use crate::storage::drafts::{load_draft, save_draft, FormDraft};
use crate::storage::Database;
use crate::vision::{validate_upload, OcrWord};

/// FormAssist - fill scanned forms and check eligibility
#[derive(Parser, Debug)]
#[command(name = "form-assist")]
#[command(about = "Fill scanned forms and run eligibility checks")]
struct Args {
    /// Configuration file (defaults to config.toml in the config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recognize a scanned form and list its fields
    Scan {
        /// Image (JPG, PNG, WEBP) or PDF file
        file: PathBuf,

        /// Save the detected fields as a draft
        #[arg(short, long)]
        draft: Option<PathBuf>,

        /// Print fields as JSON
        #[arg(long)]
        json: bool,
    },

    /// Detect fields in already recognized text ("-" reads stdin)
    Detect {
        text: PathBuf,

        /// JSON array of word boxes used for fill positions
        #[arg(short, long)]
        words: Option<PathBuf>,
    },

    /// Fill a form and write the result
    Fill {
        /// Form to recognize (omit when resuming a draft)
        #[arg(required_unless_present = "draft")]
        file: Option<PathBuf>,

        /// Resume from a saved draft instead of recognizing again
        #[arg(short, long, conflicts_with = "file")]
        draft: Option<PathBuf>,

        /// Field value as LABEL=VALUE (repeatable)
        #[arg(short = 's', long = "set", value_parser = parse_assignment)]
        values: Vec<(String, String)>,

        /// Prompt for each field
        #[arg(short, long)]
        interactive: bool,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Write a filled form from a draft without recording it
    Export {
        draft: PathBuf,

        /// Image to annotate (defaults to the draft's source)
        #[arg(long)]
        image: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Run an eligibility check
    #[command(subcommand)]
    Check(CheckCommand),

    /// Show recent eligibility log entries
    History {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CheckCommand {
    /// Visa application
    Visa {
        #[arg(long)]
        country: String,
        /// Monthly income in rupees
        #[arg(long)]
        income: f64,
    },
    /// Bank loan
    Loan {
        #[arg(long)]
        income: f64,
        #[arg(long)]
        credit_score: i64,
    },
    /// Credit card
    CreditCard {
        #[arg(long)]
        salary: f64,
        #[arg(long, default_value = "0")]
        existing_cards: u32,
    },
    /// Insurance claim
    Insurance {
        #[arg(long)]
        amount: f64,
    },
    /// Government schemes
    Schemes {
        /// General, OBC or SC/ST
        #[arg(long)]
        caste: CasteCategory,
        /// Annual income in rupees
        #[arg(long)]
        income: f64,
        #[arg(long)]
        age: u32,
    },
}

impl CheckCommand {
    fn into_check(self) -> Box<dyn EligibilityCheck> {
        match self {
            CheckCommand::Visa { country, income } => Box::new(VisaCheck { country, income }),
            CheckCommand::Loan {
                income,
                credit_score,
            } => Box::new(LoanCheck {
                income,
                credit_score,
            }),
            CheckCommand::CreditCard {
                salary,
                existing_cards,
            } => Box::new(CreditCardCheck {
                salary,
                existing_cards,
            }),
            CheckCommand::Insurance { amount } => Box::new(InsuranceClaim {
                claim_amount: amount,
            }),
            CheckCommand::Schemes { caste, income, age } => Box::new(SchemeCheck {
                caste,
                annual_income: income,
                age,
            }),
        }
    }
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (label, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=VALUE, got '{}'", s))?;
    let label = label.trim();
    if label.is_empty() {
        return Err("label must not be empty".to_string());
    }
    Ok((label.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_or_create_config(args.config.as_deref())?;

    match args.command {
        Command::Scan { file, draft, json } => run_scan(config, &file, draft.as_deref(), json).await,
        Command::Detect { text, words } => run_detect(&text, words.as_deref()),
        Command::Fill {
            file,
            draft,
            values,
            interactive,
            out,
        } => run_fill(config, file.as_deref(), draft.as_deref(), &values, interactive, &out).await,
        Command::Export { draft, image, out } => run_export(&config, &draft, image.as_deref(), &out),
        Command::Check(check) => run_check(config, check),
        Command::History { limit, json } => run_history(&config, limit, json),
    }
}

/// Load configuration from file or create default.
///
/// A fresh default is written back so the generated user id stays stable.
fn load_or_create_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        let config = config::load_config(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    let config_path = storage::get_config_dir()?.join("config.toml");
    if config_path.exists() {
        match config::load_config(&config_path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", config_path);
                return Ok(config);
            }
            Err(e) => warn!("Ignoring unreadable configuration {:?}: {:#}", config_path, e),
        }
        return Ok(AppConfig::default());
    }

    let config = AppConfig::default();
    if let Err(e) = config::save_config(&config, &config_path) {
        warn!("Failed to save default configuration: {:#}", e);
    } else {
        info!("Created default configuration at {:?}", config_path);
    }
    Ok(config)
}

/// Print notices, failing on the first error
fn report(notices: &[Notice]) -> Result<()> {
    for notice in notices {
        println!("{}", notice);
    }
    match notices.iter().find(|n| n.is_error()) {
        Some(notice) => bail!("{}", notice.title),
        None => Ok(()),
    }
}

fn print_fields(fields: &[FormField]) {
    for (index, field) in fields.iter().enumerate() {
        let marker = if field.required { "*" } else { " " };
        println!("{:>3}{} {}: {}", index, marker, field.label, field.value);
    }
}

async fn run_scan(config: AppConfig, file: &Path, draft: Option<&Path>, json: bool) -> Result<()> {
    let mut app = FormAssistApp::open(config)?;
    report(&app.upload(file).await)?;

    let session = app.session();
    if json {
        println!("{}", serde_json::to_string_pretty(session.fields())?);
    } else {
        print_fields(session.fields());
    }

    if let Some(path) = draft {
        let draft = FormDraft {
            source: Some(file.to_path_buf()),
            extracted_text: session.extracted_text().to_string(),
            fields: session.fields().to_vec(),
        };
        save_draft(&draft, path)?;
        info!("Saved draft to {:?}", path);
    }
    Ok(())
}

fn run_detect(text: &Path, words: Option<&Path>) -> Result<()> {
    let text = if text == Path::new("-") {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(text).with_context(|| format!("Failed to read {:?}", text))?
    };

    let words: Option<Vec<OcrWord>> = match words {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read word boxes {:?}", path))?;
            Some(serde_json::from_str(&content).context("Invalid word box JSON")?)
        }
        None => None,
    };

    let fields = forms::detect_fields(&text, words.as_deref());
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

async fn run_fill(
    config: AppConfig,
    file: Option<&Path>,
    draft: Option<&Path>,
    values: &[(String, String)],
    interactive: bool,
    out: &Path,
) -> Result<()> {
    let mut app = FormAssistApp::open(config)?;

    match (file, draft) {
        (_, Some(path)) => {
            let draft = load_draft(path)?;
            let document = match draft.source {
                Some(source) if source.exists() => {
                    let kind = validate_upload(&source, app.config().upload.max_size_mb)?;
                    Some(SourceDocument { path: source, kind })
                }
                _ => None,
            };
            app.session_mut()
                .resume(document, draft.extracted_text, draft.fields)?;
        }
        (Some(file), None) => report(&app.upload(file).await)?,
        (None, None) => bail!("no form given"),
    }

    for label in app.fill(values)? {
        warn!("No field labeled {:?}", label);
    }

    if interactive {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        while prompt_fields(&mut app, &mut input)? {
            print_fields(app.session().fields());
            match ask(&mut input, "Submit these values? [Y/n] ")? {
                Some(answer) if answer.eq_ignore_ascii_case("n") => {
                    app.back_to_review()?;
                    println!("Back to review, editing again");
                    app.fill(&[])?;
                }
                _ => break,
            }
        }
    }

    report(&[app.submit()])?;

    std::fs::create_dir_all(out)?;
    let written = match app.download(out) {
        Ok(path) => path,
        Err(e) => {
            report(&[Notice::export_failed()]).ok();
            return Err(e);
        }
    };
    let file_name = written
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    report(&[Notice::downloaded(&file_name)])?;

    app.reset()?;
    Ok(())
}

/// Print `prompt` and read one trimmed answer; `None` at end of input
fn ask(input: &mut impl BufRead, prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask for every field value; an empty answer keeps the current value.
///
/// Returns `false` when input ran out before every field was asked.
fn prompt_fields(app: &mut FormAssistApp, input: &mut impl BufRead) -> Result<bool> {
    debug_assert_eq!(app.session().step(), FormStep::Fill);

    for index in 0..app.session().fields().len() {
        let field = &app.session().fields()[index];
        let marker = if field.required { " *" } else { "" };
        let prompt = format!("{}{} [{}]: ", field.label, marker, field.value);

        let Some(answer) = ask(input, &prompt)? else {
            return Ok(false);
        };
        if !answer.is_empty() {
            app.session_mut().update_field(index, answer)?;
        }
    }
    Ok(true)
}

fn run_export(config: &AppConfig, draft: &Path, image: Option<&Path>, out: &Path) -> Result<()> {
    let draft = load_draft(draft)?;

    let source = image.map(Path::to_path_buf).or(draft.source);
    let source = match source {
        Some(path) => {
            let kind = validate_upload(&path, config.upload.max_size_mb)?;
            Some((path, kind))
        }
        None => None,
    };

    std::fs::create_dir_all(out)?;
    let written = app::export_fields(
        &draft.fields,
        source.as_ref().map(|(path, kind)| (path.as_path(), *kind)),
        &config.export,
        out,
    )?;
    println!("{}", written.display());
    Ok(())
}

fn run_check(config: AppConfig, check: CheckCommand) -> Result<()> {
    let app = FormAssistApp::open(config)?;
    let check = check.into_check();
    report(&app.run_check(check.as_ref()))
}

fn run_history(config: &AppConfig, limit: usize, json: bool) -> Result<()> {
    let db = Database::open(&storage::get_database_path(&config.storage)?)?;
    let entries = db.recent(&config.general.user_id, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No eligibility checks recorded yet");
    }
    for entry in &entries {
        println!(
            "{}  {:<17} {}",
            entry.created_at, entry.log.service_type, entry.log.result
        );
    }
    Ok(())
}
