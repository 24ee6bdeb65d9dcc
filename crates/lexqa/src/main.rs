//! lexqa: ask questions against a legal corpus.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lexqa_core::config::{Config, LogFormat};
use lexqa_core::corpus::Corpus;
use lexqa_core::error::format_error_with_remediation;
use lexqa_core::logging::init_logging;
use lexqa_core::{QueryOutcome, RetrievalService, ServiceHandle};

mod render;

use render::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "lexqa",
    version,
    about = "Find the law paragraphs closest to a question"
)]
struct Cli {
    /// Path to lexqa.toml
    #[arg(long, global = true, env = "LEXQA_CONFIG")]
    config: Option<PathBuf>,

    /// Corpus JSON file (overrides `corpus` in the config)
    #[arg(long, global = true, env = "LEXQA_CORPUS")]
    corpus: Option<PathBuf>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a single question
    Ask {
        /// The question
        query: String,

        /// Number of passages to return
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Read questions from stdin until EOF or `:quit`
    Repl {
        /// Number of passages per answer
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },

    /// List the flattened passages with their positions
    Passages {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Corpus and embedder summary
    Stats {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<lexqa_core::Error>() {
                Some(core) => eprint!("{}", format_error_with_remediation(core)),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).map_err(lexqa_core::Error::from)?;
    if let Some(corpus) = &cli.corpus {
        config.corpus = Some(corpus.clone());
    }
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    init_logging(&config.logging).context("failed to initialize logging")?;
    tracing::debug!(
        corpus = ?config.corpus,
        embedder = ?config.embedder.kind,
        top_k = config.retrieval.top_k,
        "Configuration resolved"
    );

    match cli.command {
        Command::Ask {
            query,
            top_k,
            format,
        } => ask(&config, &query, top_k, format),
        Command::Repl { top_k } => repl(&config, top_k),
        Command::Passages { format } => passages(&config, format),
        Command::Stats { format } => stats(&config, format),
    }
}

fn ask(config: &Config, query: &str, top_k: Option<usize>, format: OutputFormat) -> anyhow::Result<()> {
    let service = RetrievalService::from_config(config)?;
    let k = top_k.unwrap_or(service.default_k());

    // Errors go through `?` so they print with remediation.
    let answers = service.answer(query, k)?;
    let outcome = QueryOutcome::from_answers(query, answers);

    match format {
        OutputFormat::Plain => print!("{}", render::outcome_plain(&outcome)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }
    Ok(())
}

fn repl(config: &Config, top_k: Option<usize>) -> anyhow::Result<()> {
    let handle = ServiceHandle::new(RetrievalService::from_config(config)?);
    let interactive = io::stdin().is_terminal();
    let stdout = io::stdout();

    if interactive {
        eprintln!(
            "lexqa {} | {} passages | :reload to rebuild, :quit to exit",
            lexqa_core::VERSION,
            handle.current().passage_count()
        );
    }

    let mut lines = io::stdin().lock().lines();
    loop {
        if interactive {
            eprint!("> ");
            io::stderr().flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();

        match input {
            "" => continue,
            ":quit" | ":q" => break,
            ":reload" => {
                match handle.rebuild(|| RetrievalService::from_config(config)) {
                    Ok(()) => eprintln!(
                        "Reloaded: {} passages",
                        handle.current().passage_count()
                    ),
                    Err(err) => {
                        tracing::warn!(error = %err, "Reload failed; keeping the current service");
                        eprint!("{}", format_error_with_remediation(&err));
                    }
                }
                continue;
            }
            _ => {}
        }

        let service = handle.current();
        let k = top_k.unwrap_or(service.default_k());
        let outcome = service.respond(input, k);
        let mut out = stdout.lock();
        write!(out, "{}", render::outcome_plain(&outcome))?;
        out.flush()?;
    }
    Ok(())
}

fn passages(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let corpus = Corpus::load(config.corpus_path().map_err(lexqa_core::Error::from)?)
        .map_err(lexqa_core::Error::from)?;
    let flat = lexqa_core::corpus::flatten(&corpus.laws);
    match format {
        OutputFormat::Plain => print!("{}", render::passages_plain(&flat.metadata)),
        OutputFormat::Json => println!("{}", render::passages_json(&flat.metadata)?),
    }
    Ok(())
}

fn stats(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let corpus = Corpus::load(config.corpus_path().map_err(lexqa_core::Error::from)?)
        .map_err(lexqa_core::Error::from)?;
    let service = RetrievalService::from_corpus(&corpus, config.embedder()?, &config.retrieval)?;
    let info = service.embedder_info();
    let stats = render::Stats {
        laws: corpus.laws.len(),
        articles: corpus.article_count(),
        passages: service.passage_count(),
        embedder: info.name,
        tier: info.tier.to_string(),
        dimension: info.dimension,
        default_k: service.default_k(),
    };
    match format {
        OutputFormat::Plain => print!("{}", render::stats_plain(&stats)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
    }
    Ok(())
}
