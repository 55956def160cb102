use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::error::ReflowError;
use crate::features::LabeledLine;
use crate::logreg::{LogisticRegression, Metrics};

/// Trainer wires a features file to the logistic-regression learner: it
/// loads the labeled examples, drives the training loop and saves the
/// resulting model.
pub struct Trainer {
    learner: LogisticRegression,
}

impl Trainer {
    /// Creates a new instance of [`Trainer`] and loads the JSON-lines
    /// features file into the learner.
    ///
    /// # Arguments
    /// * `learning_rate` - Step size of the gradient descent updates.
    /// * `num_iterations` - The maximum number of iterations for training.
    /// * `threshold` - Early-stop threshold on the loss improvement.
    /// * `features_path` - The path to the features file.
    ///
    /// # Errors
    /// Returns an error if the features file cannot be read or parsed.
    pub fn new(
        learning_rate: f64,
        num_iterations: usize,
        threshold: f64,
        features_path: &Path,
    ) -> Result<Self, ReflowError> {
        let mut learner = LogisticRegression::new(learning_rate, num_iterations, threshold);

        let file = File::open(features_path)?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let example: LabeledLine = serde_json::from_str(&line)?;
            learner.add_example(example);
        }

        Ok(Trainer { learner })
    }

    /// Warm-starts the learner from a previously saved model.
    ///
    /// # Errors
    /// Returns an error if the model cannot be loaded.
    pub fn load_model(&mut self, model_path: &Path) -> Result<(), ReflowError> {
        self.learner.load_model(model_path)
    }

    /// Trains the learner and saves the model.
    ///
    /// # Arguments
    /// * `running` - An `Arc<AtomicBool>` to control the running state of
    ///   the training process.
    /// * `model_path` - The path to save the trained model.
    ///
    /// # Returns
    /// Training-set metrics of the saved model.
    ///
    /// # Errors
    /// Returns an error if the model cannot be saved.
    pub fn train(
        &mut self,
        running: Arc<AtomicBool>,
        model_path: &Path,
    ) -> Result<Metrics, ReflowError> {
        self.learner.train(running);
        self.learner.save_model(model_path)?;

        Ok(self.learner.get_metrics())
    }

    pub fn num_examples(&self) -> usize {
        self.learner.num_examples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use tempfile::NamedTempFile;

    use crate::features::Vectorizer;

    fn create_features_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file for features");
        let vectorizer = Vectorizer::new();
        let examples = vectorizer
            .featurize_with_annotation("*Hello world\n+goes on\n*Next paragraph")
            .expect("corpus should be annotated");
        for example in &examples {
            let json = serde_json::to_string(example).expect("Failed to serialize example");
            writeln!(file, "{}", json).expect("Failed to write features");
        }
        file
    }

    #[test]
    fn trains_from_a_features_file() -> Result<(), Box<dyn std::error::Error>> {
        let features_file = create_features_file();
        let mut trainer = Trainer::new(0.1, 50, 0.0, features_file.path())?;
        assert_eq!(trainer.num_examples(), 3);

        let model_out = NamedTempFile::new()?;
        let running = Arc::new(AtomicBool::new(true));
        let metrics = trainer.train(running, model_out.path())?;

        assert!(metrics.accuracy >= 0.0);
        assert!(metrics.precision >= 0.0);
        assert!(metrics.recall >= 0.0);

        // the saved model must be loadable again
        let mut reloaded = Trainer::new(0.1, 50, 0.0, features_file.path())?;
        reloaded.load_model(model_out.path())?;
        Ok(())
    }

    #[test]
    fn cleared_running_flag_skips_the_training_loop() -> Result<(), Box<dyn std::error::Error>> {
        let features_file = create_features_file();
        let mut trainer = Trainer::new(0.1, 5, 0.0, features_file.path())?;

        let model_out = NamedTempFile::new()?;
        let running = Arc::new(AtomicBool::new(false));
        let metrics = trainer.train(running, model_out.path())?;
        assert!(metrics.accuracy >= 0.0);
        Ok(())
    }

    #[test]
    fn missing_features_file_is_an_error() {
        assert!(Trainer::new(0.1, 5, 0.0, Path::new("no/such/features.jsonl")).is_err());
    }
}
