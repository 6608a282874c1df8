//! Lexicon Generator CLI
//!
//! Loads a lexicon tree, synthesizes declarations per namespace group and
//! writes them as JSON for a rendering backend.

use anyhow::Context;
use clap::{Parser, Subcommand};
use lexicon_codegen::codegen::{generate, CodegenContext, GeneratedOutput};
use lexicon_codegen::config::{GeneratorConfig, OutputFormat};
use lexicon_codegen::graph::{load_from_directory, LoadedCorpus};
use lexicon_codegen::lock::{LockFile, LOCK_FILE_NAME};
use lexicon_codegen::LexiconError;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lexgen")]
#[command(about = "Generate type and client declarations from lexicon schemas")]
struct Cli {
    /// Config file (layered over lexgen.toml and LEXGEN__* variables)
    #[arg(short, long)]
    config: Option<String>,

    /// Lexicon directory (overrides [input] lexicons)
    #[arg(short, long)]
    lexicons: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one declaration file per namespace group
    Generate {
        /// Output directory (overrides [output] dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,

        /// Also refresh the lock file
        #[arg(long)]
        lock: bool,
    },

    /// Run the pipeline without writing anything
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Show namespace groups and their documents
    Groups,

    /// Export the type reference graph as DOT
    Graph {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record the corpus checksum in the lock file
    Lock,

    /// Write a default lexgen.toml
    Init {
        #[arg(default_value = "lexgen.toml")]
        path: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        if let Some(LexiconError::Rejected(diagnostics)) = e.downcast_ref::<LexiconError>() {
            eprintln!("{}", diagnostics.format_all());
        }
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = GeneratorConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let lexicons = cli.lexicons.clone().unwrap_or_else(|| config.input.lexicons.clone());

    match cli.command {
        Commands::Generate { output, compact, lock } => {
            let corpus = load(&lexicons, &config)?;
            let generated = generate(&corpus, &config.codegen)?;
            report_warnings(&generated);

            let out_dir = output.unwrap_or_else(|| config.output.dir.clone());
            let format = if compact { OutputFormat::Compact } else { config.output.format };
            write_modules(&generated, &out_dir, format)?;
            println!(
                "✅ Generated {} declarations in {} modules → {}",
                generated.declaration_count(),
                generated.modules.len(),
                out_dir.display()
            );

            if lock {
                write_lock(&corpus)?;
            }
            Ok(())
        }

        Commands::Check { strict } => {
            let corpus = load(&lexicons, &config)?;
            let generated = generate(&corpus, &config.codegen)?;
            report_warnings(&generated);

            let lock_path = Path::new(LOCK_FILE_NAME);
            if lock_path.exists() {
                let lock = LockFile::load(lock_path)?;
                if lock.is_current(&corpus) {
                    println!("  ✅ {} is current", LOCK_FILE_NAME);
                } else {
                    println!("  ⚠️  {} is stale (corpus changed since {})", LOCK_FILE_NAME, lock.generated_at);
                }
            }

            if strict && generated.diagnostics.warning_count() > 0 {
                eprintln!("❌ {} warning(s) in strict mode", generated.diagnostics.warning_count());
                std::process::exit(1);
            }
            println!("✅ {} documents OK ({})", corpus.len(), generated.checksum);
            Ok(())
        }

        Commands::Groups => {
            let corpus = load(&lexicons, &config)?;
            let context = CodegenContext::build(&corpus.documents, &config.codegen)?;
            for (prefix, ids) in context.groups().groups() {
                println!("📦 {} ({})", prefix, config.codegen.module_name_for(prefix));
                for id in ids {
                    println!("    {}", id);
                }
            }
            Ok(())
        }

        Commands::Graph { output } => {
            let corpus = load(&lexicons, &config)?;
            let context = CodegenContext::build(&corpus.documents, &config.codegen)?;
            let dot = context.to_dot()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, dot)?;
                    println!("✅ Exported DOT to: {:?}", path);
                }
                None => print!("{}", dot),
            }
            Ok(())
        }

        Commands::Lock => {
            let corpus = load(&lexicons, &config)?;
            write_lock(&corpus)
        }

        Commands::Init { path } => {
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            GeneratorConfig::default().save(&path)?;
            println!("✅ Wrote {}", path.display());
            Ok(())
        }
    }
}

fn load(lexicons: &Path, config: &GeneratorConfig) -> anyhow::Result<LoadedCorpus> {
    println!("🔍 Loading lexicons from: {}", lexicons.display());
    let corpus = load_from_directory(lexicons, &config.load_config())
        .with_context(|| format!("loading lexicons from {}", lexicons.display()))?;
    println!("  {} documents, checksum {}", corpus.len(), corpus.checksum);
    Ok(corpus)
}

fn report_warnings(generated: &GeneratedOutput) {
    for warning in generated.diagnostics.warnings() {
        println!("  ⚠️  {}", warning);
    }
}

fn write_modules(generated: &GeneratedOutput, out_dir: &Path, format: OutputFormat) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)?;
    for module in &generated.modules {
        let path = out_dir.join(format!("{}.json", module.module_name));
        std::fs::write(&path, format.to_json(module)?)?;
    }
    Ok(())
}

/// Keep locked source revisions, refresh the checksum
fn write_lock(corpus: &LoadedCorpus) -> anyhow::Result<()> {
    let path = Path::new(LOCK_FILE_NAME);
    let mut lock = LockFile::for_corpus(corpus);
    if path.exists() {
        lock.sources = LockFile::load(path)?.sources;
    }
    lock.save(path)?;
    println!("🔒 Wrote {}", path.display());
    Ok(())
}
