use std::error::Error;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use reflow::extractor::Extractor;
use reflow::get_version;
use reflow::restorer::Restorer;
use reflow::trainer::Trainer;

#[derive(Debug, Args)]
#[clap(
    author,
    about = "Extract labeled features from an annotated corpus",
    version = get_version(),
)]
struct ExtractArgs {
    corpus_path: PathBuf,
    features_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Train a paragraph restoration model",
    version = get_version(),
)]
struct TrainArgs {
    #[arg(short, long, default_value = "0.0005")]
    learning_rate: f64,

    #[arg(short = 'i', long, default_value = "5000")]
    num_iterations: usize,

    #[arg(short, long, default_value = "1e-6")]
    threshold: f64,

    #[arg(short = 'm', long)]
    load_model_file: Option<PathBuf>,

    features_file: PathBuf,
    model_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Restore paragraphs in text read from stdin",
    version = get_version(),
)]
struct RestoreArgs {
    model_file: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Extract(ExtractArgs),
    Train(TrainArgs),
    Restore(RestoreArgs),
}

#[derive(Debug, Parser)]
#[clap(
    name = "reflow",
    author,
    about = "A paragraph restoration command line interface",
    version = get_version(),
)]
struct CommandArgs {
    #[clap(subcommand)]
    command: Commands,
}

fn extract(args: ExtractArgs) -> Result<(), Box<dyn Error>> {
    let extractor = Extractor::new();

    let written = extractor.extract(args.corpus_path.as_path(), args.features_file.as_path())?;

    println!(
        "Feature extraction completed successfully, {} examples written.",
        written
    );
    Ok(())
}

fn train(args: TrainArgs) -> Result<(), Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        if r.load(Ordering::SeqCst) {
            r.store(false, Ordering::SeqCst);
        } else {
            std::process::exit(0);
        }
    })
    .expect("Error setting Ctrl-C handler");

    let mut trainer = Trainer::new(
        args.learning_rate,
        args.num_iterations,
        args.threshold,
        args.features_file.as_path(),
    )?;

    if let Some(model_path) = &args.load_model_file {
        trainer.load_model(model_path.as_path())?;
    }

    let metrics = trainer.train(running, args.model_file.as_path())?;

    println!("Training completed successfully.");
    println!(
        "Accuracy: {:.2}%, Precision: {:.2}%, Recall: {:.2}%",
        metrics.accuracy, metrics.precision, metrics.recall
    );
    println!(
        "Confusion Matrix: TP: {}, FP: {}, FN: {}, TN: {}",
        metrics.true_positives,
        metrics.false_positives,
        metrics.false_negatives,
        metrics.true_negatives
    );
    Ok(())
}

fn restore(args: RestoreArgs) -> Result<(), Box<dyn Error>> {
    let restorer = Restorer::from_model_path(args.model_file.as_path())?;

    // the whole document at once: glue decisions need surrounding lines
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;

    let restored = restorer.restore_text(&text)?;

    let stdout = io::stdout();
    let mut writer = io::BufWriter::new(stdout.lock());
    writeln!(writer, "{}", restored)?;

    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = CommandArgs::parse();

    match args.command {
        Commands::Extract(args) => extract(args),
        Commands::Train(args) => train(args),
        Commands::Restore(args) => restore(args),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
