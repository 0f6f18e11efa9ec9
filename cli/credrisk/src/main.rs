use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use credrisk_core::{
    Contribution, NormalizationPolicy, RawInput, RiskError, RiskLabel, ScoredResult, SCHEMA,
};
use credrisk_model::{load_artifact, LoadedModel};
use log::debug;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

/// Exit status when the model cannot be loaded or configured.
const EXIT_STARTUP: i32 = 1;
/// Exit status when a single request cannot be scored.
const EXIT_REQUEST: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputMode {
    Text,
    Json,
}

/// Which normalization the pipeline applies before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum NormalizationArg {
    /// Whatever the model artifact was trained with
    #[default]
    Artifact,
    /// Pass the feature vector through unchanged
    #[value(name = "none")]
    Disabled,
    /// Standardize each request against its own mean and deviation
    PerVector,
    /// Standardize against the training statistics stored in the artifact
    Population,
}

#[derive(Debug, Parser)]
#[command(
    name = "credrisk",
    version,
    about = "Score credit risk and explain which applicant attributes drove it",
    long_about = "credrisk loads a trained credit risk model once, scores an applicant's ten\n\
        attributes and ranks how much each attribute pushed the score up or down.\n\n\
        EXAMPLES:\n\
        \n  credrisk score applicant.json                       Score a JSON object\n\
        \n  credrisk score -f applicant_age=45 -f late_90=0 ...  Score field=value pairs\n\
        \n  echo '{...}' | credrisk --format json score        Read from stdin, print JSON\n\
        \n  credrisk schema                                     List the expected fields\n\
        \n  credrisk inspect                                    Describe the loaded model"
)]
struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Trained model artifact
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "CREDRISK_MODEL",
        default_value = "models/credit_risk_model.json"
    )]
    model: PathBuf,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputMode::Text)]
    format: OutputMode,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score one applicant and rank the feature contributions
    #[command(
        long_about = "Score one applicant and rank the feature contributions.\n\n\
            Input is a JSON object keyed by field name, read from FILE or stdin.\n\
            Values may be numbers or numeric strings. --field pairs are applied on\n\
            top of the JSON object; when only --field is given stdin is not read."
    )]
    Score(ScoreArgs),

    /// Print the expected input fields and the training columns they feed
    Schema,

    /// Print the loaded model's metadata
    Inspect,
}

#[derive(Debug, Args, Clone, Default)]
struct ScoreArgs {
    /// JSON file with the applicant's fields ("-" for stdin)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// A single field as name=value; may be repeated
    #[arg(short = 'f', long = "field", value_name = "NAME=VALUE")]
    fields: Vec<String>,

    /// Normalization applied before scoring
    #[arg(long, value_enum, default_value_t = NormalizationArg::Artifact)]
    normalization: NormalizationArg,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .try_init();
}

fn read_text(path: Option<&Path>) -> Result<String, String> {
    match path {
        Some(p) if p != Path::new("-") => {
            fs::read_to_string(p).map_err(|e| format!("failed to read '{}': {e}", p.display()))
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read from stdin: {e}"))?;
            Ok(buf)
        }
    }
}

fn parse_input_json(text: &str) -> Result<RawInput, String> {
    let value: JsonValue =
        serde_json::from_str(text).map_err(|e| format!("input is not valid JSON: {e}"))?;
    RawInput::from_json(&value).ok_or_else(|| "input must be a JSON object".to_string())
}

fn apply_field_args(input: &mut RawInput, fields: &[String]) -> Result<(), String> {
    for pair in fields {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=VALUE, got '{pair}'"))?;
        input.insert(name.trim(), value);
    }
    Ok(())
}

fn collect_input(args: &ScoreArgs) -> Result<RawInput, String> {
    let mut input = if args.input.is_some() || args.fields.is_empty() {
        parse_input_json(&read_text(args.input.as_deref())?)?
    } else {
        RawInput::new()
    };
    apply_field_args(&mut input, &args.fields)?;
    Ok(input)
}

fn resolve_normalization(
    arg: NormalizationArg,
    model: &LoadedModel,
) -> Result<Option<NormalizationPolicy>, String> {
    Ok(match arg {
        NormalizationArg::Artifact => None,
        NormalizationArg::Disabled => Some(NormalizationPolicy::Disabled),
        NormalizationArg::PerVector => Some(NormalizationPolicy::PerVector),
        NormalizationArg::Population => {
            let stats = model.population_stats().ok_or_else(|| {
                format!(
                    "model {} records no population statistics",
                    model.metadata.id
                )
            })?;
            Some(NormalizationPolicy::Population(stats.clone()))
        }
    })
}

#[derive(Debug, Serialize)]
struct ScoreReport<'a> {
    label: &'static str,
    high_risk: bool,
    probability: f64,
    probability_percent: f64,
    contributions: &'a [Contribution],
}

impl<'a> From<&'a ScoredResult> for ScoreReport<'a> {
    fn from(result: &'a ScoredResult) -> Self {
        Self {
            label: result.label.as_str(),
            high_risk: result.label == RiskLabel::HighRisk,
            probability: result.probability,
            probability_percent: result.probability_percent(),
            contributions: &result.contributions,
        }
    }
}

fn render_text(result: &ScoredResult) -> String {
    let mut out = format!("{} ({:.2}%)\n", result.label, result.probability_percent());
    let width = SCHEMA.order().map(str::len).max().unwrap_or(0);
    for c in &result.contributions {
        out.push_str(&format!("  {:<width$}  {:+.6}\n", c.feature, c.value));
    }
    out
}

fn render_failure(err: &RiskError, mode: OutputMode) -> String {
    match mode {
        OutputMode::Text => format!("error: {} stage: {err}", err.stage()),
        OutputMode::Json => json!({
            "error": {
                "stage": err.stage().as_str(),
                "field": err.field(),
                "message": err.to_string(),
            }
        })
        .to_string(),
    }
}

fn load_model(path: &Path) -> Result<LoadedModel, i32> {
    load_artifact(path).map_err(|e| {
        eprintln!("error: {e}");
        EXIT_STARTUP
    })
}

fn run_score(model_path: &Path, mode: OutputMode, args: &ScoreArgs) -> i32 {
    let model = match load_model(model_path) {
        Ok(m) => m,
        Err(rc) => return rc,
    };
    let normalization = match resolve_normalization(args.normalization, &model) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_STARTUP;
        }
    };
    let pipeline = model.pipeline(normalization);

    let input = match collect_input(args) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_REQUEST;
        }
    };
    debug!("scoring request with {} fields", input.len());

    match pipeline.score_and_explain(&input) {
        Ok(result) => {
            match mode {
                OutputMode::Text => print!("{}", render_text(&result)),
                OutputMode::Json => match serde_json::to_string_pretty(&ScoreReport::from(&result)) {
                    Ok(s) => println!("{s}"),
                    Err(e) => {
                        eprintln!("error: failed to serialize JSON: {e}");
                        return EXIT_REQUEST;
                    }
                },
            }
            0
        }
        Err(err) => {
            match mode {
                OutputMode::Text => eprintln!("{}", render_failure(&err, mode)),
                OutputMode::Json => println!("{}", render_failure(&err, mode)),
            }
            EXIT_REQUEST
        }
    }
}

fn render_schema(mode: OutputMode) -> String {
    match mode {
        OutputMode::Text => {
            let width = SCHEMA.order().map(str::len).max().unwrap_or(0);
            SCHEMA
                .features()
                .iter()
                .enumerate()
                .map(|(i, f)| format!("{i:>2}  {:<width$}  {}\n", f.field, f.column))
                .collect()
        }
        OutputMode::Json => {
            let entries: Vec<JsonValue> = SCHEMA
                .features()
                .iter()
                .enumerate()
                .map(|(i, f)| json!({ "index": i, "field": f.field, "column": f.column }))
                .collect();
            format!("{:#}\n", JsonValue::Array(entries))
        }
    }
}

fn render_inspect(model: &LoadedModel, mode: OutputMode) -> String {
    let meta = &model.metadata;
    match mode {
        OutputMode::Text => {
            let mut out = format!("model:          {} v{}\n", meta.id, meta.version);
            if let Some(desc) = &meta.description {
                out.push_str(&format!("description:    {desc}\n"));
            }
            out.push_str(&format!("scorer:         {}\n", model.scorer.name()));
            out.push_str(&format!("explainer:      {}\n", model.explainer.name()));
            out.push_str(&format!("normalization:  {}\n", model.normalization.as_str()));
            out.push_str(&format!("features:       {}\n", meta.feature_names.join(", ")));
            out
        }
        OutputMode::Json => format!(
            "{:#}\n",
            json!({
                "id": meta.id,
                "version": meta.version.to_string(),
                "description": meta.description,
                "scorer": model.scorer.name(),
                "explainer": model.explainer.name(),
                "normalization": model.normalization.as_str(),
                "feature_names": meta.feature_names,
            })
        ),
    }
}

fn run_inspect(model_path: &Path, mode: OutputMode) -> i32 {
    match load_model(model_path) {
        Ok(model) => {
            print!("{}", render_inspect(&model, mode));
            0
        }
        Err(rc) => rc,
    }
}

fn run_cli() -> i32 {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command.unwrap_or(Command::Score(ScoreArgs::default())) {
        Command::Score(args) => run_score(&cli.model, cli.format, &args),
        Command::Schema => {
            print!("{}", render_schema(cli.format));
            0
        }
        Command::Inspect => run_inspect(&cli.model, cli.format),
    }
}

fn main() {
    std::process::exit(run_cli());
}
