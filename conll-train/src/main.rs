//! Linha de comando: converte corpora CoNLL-2003, treina o NER e pós-processa a saída etiquetada.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use conll_core::{postprocess, trainer, ConvertOptions, Converter, TagMatch, TrainConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "conll-train")]
#[command(about = "Converte, treina e pós-processa corpora CoNLL-2003")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Converte um arquivo CoNLL em sentenças anotadas (uma por linha, JSON)
    Convert {
        /// Arquivo CoNLL-2003
        #[arg(env = "CONLL_INPUT")]
        input: PathBuf,
        /// Arquivo de saída; sem ele, escreve na saída padrão
        #[arg(short, long, env = "CONLL_OUTPUT")]
        output: Option<PathBuf>,
        /// Também grava o texto concatenado de todas as sentenças
        #[arg(long, env = "CONLL_PLAIN_TEXT")]
        plain_text: Option<PathBuf>,
        #[command(flatten)]
        convert: ConvertArgs,
    },
    /// Treina o NER, avalia no conjunto de teste e salva o modelo
    Train(TrainArgs),
    /// Limpa um arquivo `token\ttag` em `<arquivo>.tsv`
    Postprocess {
        /// Arquivo etiquetado
        #[arg(env = "CONLL_TAGGED_FILE")]
        tagged_file: PathBuf,
    },
}

#[derive(Args)]
struct ConvertArgs {
    /// Compara a coluna de tag por igualdade em vez de por substring
    #[arg(long, env = "CONLL_EXACT_TAGS")]
    exact_tags: bool,
    /// Emite os tokens depois da última linha vazia como uma sentença
    #[arg(long, env = "CONLL_FLUSH_TRAILING")]
    flush_trailing: bool,
}

impl From<&ConvertArgs> for ConvertOptions {
    fn from(args: &ConvertArgs) -> Self {
        ConvertOptions {
            tag_match: if args.exact_tags {
                TagMatch::Exact
            } else {
                TagMatch::Substring
            },
            flush_trailing_sentence: args.flush_trailing,
        }
    }
}

#[derive(Args)]
struct TrainArgs {
    /// Modelo salvo para continuar o treino
    #[arg(short, long, env = "CONLL_MODEL")]
    model: Option<PathBuf>,
    /// Diretório onde o modelo treinado é salvo
    #[arg(short, long, env = "CONLL_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,
    /// Número de épocas
    #[arg(short = 'n', long, env = "CONLL_N_ITER", default_value_t = 5)]
    n_iter: usize,
    /// Probabilidade de dropout das features
    #[arg(long, env = "CONLL_DROP", default_value_t = 0.5)]
    drop: f64,
    /// Semente do embaralhamento e do dropout
    #[arg(long, env = "CONLL_SEED", default_value_t = 42)]
    seed: u64,
    #[arg(long, env = "CONLL_TRAIN", default_value = "data/conll03/eng.train")]
    train: PathBuf,
    #[arg(long, env = "CONLL_TEST", default_value = "data/conll03/eng.testa")]
    test: PathBuf,
    /// Arquivo etiquetado gerado pela avaliação
    #[arg(long, env = "CONLL_TAGGED_OUTPUT", default_value = "tagged_output")]
    tagged_output: PathBuf,
    #[command(flatten)]
    convert: ConvertArgs,
}

impl From<TrainArgs> for TrainConfig {
    fn from(args: TrainArgs) -> Self {
        TrainConfig {
            model: args.model,
            output_dir: args.output_dir,
            n_iter: args.n_iter,
            drop: args.drop,
            seed: args.seed,
            train_path: args.train,
            test_path: args.test,
            tagged_output: args.tagged_output,
            convert: ConvertOptions::from(&args.convert),
        }
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn convert(input: &Path, output: Option<&Path>, plain_text: Option<&Path>, options: ConvertOptions) -> Result<()> {
    let corpus = Converter::new(input)
        .with_options(options)
        .convert()
        .with_context(|| format!("Failed to convert {}", input.display()))?;

    let mut out = open_output(output)?;
    for sentence in &corpus.sentences {
        serde_json::to_writer(&mut out, sentence)?;
        writeln!(out)?;
    }
    out.flush()?;

    if let Some(path) = plain_text {
        std::fs::write(path, &corpus.plain_text)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    info!(sentences = corpus.sentences.len(), "sentences written");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            plain_text,
            convert: args,
        } => convert(&input, output.as_deref(), plain_text.as_deref(), (&args).into())?,
        Commands::Train(args) => {
            let config = TrainConfig::from(args);
            let report = trainer::run(&config).context("Training failed")?;
            info!(
                accuracy = report.evaluation.accuracy(),
                tsv = %report.tsv_output.display(),
                "training done"
            );
        }
        Commands::Postprocess { tagged_file } => {
            let out = postprocess(&tagged_file)
                .with_context(|| format!("Failed to postprocess {}", tagged_file.display()))?;
            println!("{}", out.display());
        }
    }

    Ok(())
}
