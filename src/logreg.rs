use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ReflowError;
use crate::features::{LabeledLine, LineFeatures};
use crate::restorer::Classifier;

/// The three length features plus the four previous-last-char flags.
const NUM_BASE_FEATURES: usize = 7;

/// Logistic regression for the line-glue decision.
/// This implementation trains with full-batch gradient descent and is
/// designed for small annotated corpora. It is not optimized for large
/// datasets.
#[derive(Debug)]
pub struct LogisticRegression {
    pub learning_rate: f64,
    pub num_iterations: usize,
    pub threshold: f64,
    weights: Vec<f64>,
    bias: f64,
    vocabulary: Vec<String>,
    examples: Vec<LabeledLine>,
}

/// On-disk form of a trained model.
#[derive(Debug, Serialize, Deserialize)]
struct SavedModel {
    weights: Vec<f64>,
    bias: f64,
    vocabulary: Vec<String>,
}

/// Training-set quality numbers reported after a training run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegression {
    /// Creates a new instance of [`LogisticRegression`].
    ///
    /// # Arguments
    /// * `learning_rate`: Step size of the gradient descent updates.
    /// * `num_iterations`: The maximum number of iterations for training.
    /// * `threshold`: Training stops early once the loss improvement per
    ///   iteration falls below this value.
    pub fn new(learning_rate: f64, num_iterations: usize, threshold: f64) -> Self {
        LogisticRegression {
            learning_rate,
            num_iterations,
            threshold,
            weights: vec![],
            bias: 0.0,
            vocabulary: vec![],
            examples: vec![],
        }
    }

    /// Adds a labeled training example.
    pub fn add_example(&mut self, example: LabeledLine) {
        self.examples.push(example);
    }

    pub fn num_examples(&self) -> usize {
        self.examples.len()
    }

    /// Trains the model on the stored examples.
    ///
    /// The loop checks `running` every iteration so that Ctrl-C leaves a
    /// usable, partially trained model, and stops early once the loss
    /// improvement falls below the configured threshold.
    ///
    /// # Arguments
    /// * `running`: An `Arc<AtomicBool>` to control the running state of
    ///   the training process.
    pub fn train(&mut self, running: Arc<AtomicBool>) {
        // a warm-started model keeps its vocabulary and weights
        if self.vocabulary.is_empty() {
            self.build_vocabulary();
        }
        let dim = NUM_BASE_FEATURES + self.vocabulary.len();
        if self.weights.len() != dim {
            self.weights = vec![0.0; dim];
            self.bias = 0.0;
        }

        let encoded: Vec<(Vec<f64>, f64)> = self
            .examples
            .iter()
            .map(|e| {
                let y = if e.glue_with_previous { 1.0 } else { 0.0 };
                (self.encode(&e.features), y)
            })
            .collect();
        if encoded.is_empty() {
            return;
        }
        let n = encoded.len() as f64;

        let mut prev_loss = f64::INFINITY;
        for t in 0..self.num_iterations {
            if !running.load(Ordering::SeqCst) {
                break;
            }

            // gradient terms accumulate per example; the last slot is the
            // bias gradient
            let (grad, loss_sum) = encoded
                .par_iter()
                .fold(
                    || (vec![0.0f64; dim + 1], 0.0f64),
                    |(mut acc, mut loss), item| {
                        let (x, y) = item;
                        let y = *y;
                        let p = sigmoid(self.score(x));
                        let err = p - y;
                        for (a, xi) in acc.iter_mut().zip(x.iter()) {
                            *a += err * xi;
                        }
                        acc[dim] += err;
                        loss -= y * p.max(1e-12).ln() + (1.0 - y) * (1.0 - p).max(1e-12).ln();
                        (acc, loss)
                    },
                )
                .reduce(
                    || (vec![0.0f64; dim + 1], 0.0f64),
                    |(mut a, la), (b, lb)| {
                        for (ai, bi) in a.iter_mut().zip(b.iter()) {
                            *ai += bi;
                        }
                        (a, la + lb)
                    },
                );

            for (w, g) in self.weights.iter_mut().zip(grad.iter()) {
                *w -= self.learning_rate * g / n;
            }
            self.bias -= self.learning_rate * grad[dim] / n;

            let loss = loss_sum / n;
            eprint!("\rIteration {} - loss: {:.6}", t, loss);
            if (prev_loss - loss).abs() < self.threshold {
                break;
            }
            prev_loss = loss;
        }
        eprintln!();
    }

    /// Scores a single feature vector; a non-negative score means glue.
    pub fn predict_one(&self, features: &LineFeatures) -> bool {
        self.score(&self.encode(features)) >= 0.0
    }

    /// Saves the trained model to a file as JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written to.
    pub fn save_model(&self, filename: &Path) -> Result<(), ReflowError> {
        let file = File::create(filename)?;
        let saved = SavedModel {
            weights: self.weights.clone(),
            bias: self.bias,
            vocabulary: self.vocabulary.clone(),
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &saved)?;
        Ok(())
    }

    /// Loads a model saved by [`LogisticRegression::save_model`].
    ///
    /// # Errors
    /// A missing or unparsable file is an immediate error; nothing is
    /// retried.
    pub fn load_model(&mut self, filename: &Path) -> Result<(), ReflowError> {
        let file = File::open(filename)?;
        self.read_model(BufReader::new(file))
    }

    /// Loads a model from any byte stream in the [`LogisticRegression::save_model`] format.
    ///
    /// # Errors
    /// An unparsable stream is an immediate error.
    pub fn read_model<R: io::Read>(&mut self, reader: R) -> Result<(), ReflowError> {
        let saved: SavedModel = serde_json::from_reader(reader)?;
        self.weights = saved.weights;
        self.bias = saved.bias;
        self.vocabulary = saved.vocabulary;
        Ok(())
    }

    /// Computes accuracy, precision, recall and the confusion matrix of
    /// the current weights over the stored training examples.
    pub fn get_metrics(&self) -> Metrics {
        let mut pp = 0;
        let mut pn = 0;
        let mut np = 0;
        let mut nn = 0;

        for e in &self.examples {
            match (self.predict_one(&e.features), e.glue_with_previous) {
                (true, true) => pp += 1,
                (true, false) => pn += 1,
                (false, true) => np += 1,
                (false, false) => nn += 1,
            }
        }

        let total = self.examples.len().max(1);
        Metrics {
            accuracy: (pp + nn) as f64 / total as f64 * 100.0,
            precision: pp as f64 / (pp + pn).max(1) as f64 * 100.0,
            recall: pp as f64 / (pp + np).max(1) as f64 * 100.0,
            true_positives: pp,
            false_positives: pn,
            false_negatives: np,
            true_negatives: nn,
        }
    }

    /// Collects the `FirstChars` vocabulary from the stored examples in
    /// sorted order, so that feature indices are stable across runs.
    fn build_vocabulary(&mut self) {
        let set: BTreeSet<String> = self
            .examples
            .iter()
            .map(|e| e.features.first_chars.clone())
            .collect();
        self.vocabulary = set.into_iter().collect();
    }

    /// Dense encoding: the three lengths, the four boolean flags as 0/1,
    /// then a one-hot block for `FirstChars`. A value unseen at training
    /// time encodes as an all-zero block.
    fn encode(&self, f: &LineFeatures) -> Vec<f64> {
        let mut x = Vec::with_capacity(NUM_BASE_FEATURES + self.vocabulary.len());
        x.push(f.this_len as f64);
        x.push(f.mean_len as f64);
        x.push(f.prev_len as f64);
        x.push(f.prev_last_is_alpha as u8 as f64);
        x.push(f.prev_last_is_digit as u8 as f64);
        x.push(f.prev_last_is_lower as u8 as f64);
        x.push(f.prev_last_is_punct as u8 as f64);
        let hot = self.vocabulary.binary_search(&f.first_chars).ok();
        for v in 0..self.vocabulary.len() {
            x.push(if Some(v) == hot { 1.0 } else { 0.0 });
        }
        x
    }

    fn score(&self, x: &[f64]) -> f64 {
        self.bias
            + x.iter()
                .zip(self.weights.iter())
                .map(|(xi, wi)| xi * wi)
                .sum::<f64>()
    }
}

impl Classifier for LogisticRegression {
    fn predict(&self, features: &[LineFeatures]) -> Vec<bool> {
        features.iter().map(|f| self.predict_one(f)).collect()
    }
}
