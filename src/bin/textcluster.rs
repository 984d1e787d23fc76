//! textcluster CLI
//!
//! # Commands
//!
//! - `fit`: cluster a JSON corpus, print metrics and top terms, save the model
//! - `predict`: load a saved model and print the cluster id of each text

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use textcluster::{Corpus, CorpusFile, FittedModel, Pipeline, PipelineConfig};

/// Topic clustering of text documents with k-means.
#[derive(Parser)]
#[command(name = "textcluster")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Default log level; `RUST_LOG` takes precedence when set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a model on a corpus file (`{"documents": [...], "labels": [...]}`).
    Fit(FitArgs),
    /// Assign texts to the clusters of a saved model.
    Predict {
        /// Directory written by `fit`.
        #[arg(long, default_value = "model")]
        model: PathBuf,
        /// Texts to assign.
        #[arg(required = true)]
        texts: Vec<String>,
    },
}

#[derive(clap::Args)]
struct FitArgs {
    /// Corpus JSON file.
    corpus: PathBuf,
    /// Pipeline config JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory to save the fitted model into.
    #[arg(long, default_value = "model")]
    output: PathBuf,
    /// Preprocess documents with latent semantic analysis.
    #[arg(long, value_name = "N")]
    lsa: Option<usize>,
    /// Use ordinary k-means instead of mini-batch.
    #[arg(long)]
    no_minibatch: bool,
    /// Disable inverse document frequency weighting.
    #[arg(long)]
    no_idf: bool,
    /// Use a hashing feature vectorizer.
    #[arg(long)]
    use_hashing: bool,
    /// Maximum number of features (dimensions) to extract.
    #[arg(long, value_name = "N")]
    n_features: Option<usize>,
    /// Number of clusters; defaults to the number of distinct labels.
    #[arg(long, short = 'k')]
    n_clusters: Option<usize>,
    /// Random seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Report per-iteration progress.
    #[arg(long, short)]
    verbose: bool,
}

impl FitArgs {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_path(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if self.lsa.is_some() {
            config.n_components = self.lsa;
        }
        if self.no_minibatch {
            config.minibatch = false;
        }
        if self.no_idf {
            config.use_idf = false;
        }
        if self.use_hashing {
            config.use_hashing = true;
        }
        if let Some(n) = self.n_features {
            config.n_features = n;
        }
        if self.n_clusters.is_some() {
            config.n_clusters = self.n_clusters;
        }
        if self.seed.is_some() {
            config.random_state = self.seed;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match &cli.command {
        Commands::Fit(args) if args.verbose => "debug",
        _ => cli.log_level.as_str(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fit(args) => fit(&args),
        Commands::Predict { model, texts } => predict(&model, &texts),
    }
}

fn fit(args: &FitArgs) -> Result<()> {
    let config = args.pipeline_config()?;

    let reader = BufReader::new(
        File::open(&args.corpus)
            .with_context(|| format!("opening corpus {}", args.corpus.display()))?,
    );
    let file: CorpusFile = serde_json::from_reader(reader).context("parsing corpus file")?;
    let corpus = Corpus::try_from(file)?;
    info!(
        n_documents = corpus.len(),
        n_categories = corpus.n_categories(),
        "corpus loaded"
    );

    let run = Pipeline::new(config).fit(&corpus)?;
    run.model
        .save(&args.output)
        .with_context(|| format!("saving model to {}", args.output.display()))?;

    let top_terms: Option<Vec<_>> = run.top_terms.as_ref().map(|clusters| {
        clusters
            .iter()
            .map(|c| {
                json!({
                    "cluster": c.cluster,
                    "terms": c.terms.iter().map(|(t, _)| t).collect::<Vec<_>>(),
                })
            })
            .collect()
    });
    let out = json!({
        "report": run.report.to_map(),
        "cluster_sizes": run.model.clustering().cluster_sizes(),
        "explained_variance": run.explained_variance,
        "skipped": run.skipped,
        "top_terms": top_terms,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn predict(model: &Path, texts: &[String]) -> Result<()> {
    let model = FittedModel::load(model)
        .with_context(|| format!("loading model from {}", model.display()))?;
    for text in texts {
        let cluster = model.transform_and_predict(text)?;
        println!("{cluster}\t{text}");
    }
    Ok(())
}
