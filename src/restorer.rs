use std::io;
use std::path::Path;

use crate::error::ReflowError;
use crate::features::{LineFeatures, Vectorizer};
use crate::logreg::LogisticRegression;

/// Hyphen variants that can end a line when a word was split by layout.
pub const HYPHEN_CHARS: [char; 4] = [
    '\u{002D}', // HYPHEN-MINUS
    '\u{00AD}', // SOFT HYPHEN
    '\u{2010}', // HYPHEN
    '\u{2011}', // NON-BREAKING HYPHEN
];

/// Binary line-glue classifier boundary.
///
/// Implementations must return one label per input vector, index-aligned,
/// as a pure function of the trained state and the input sequence.
pub trait Classifier {
    fn predict(&self, features: &[LineFeatures]) -> Vec<bool>;
}

/// Inference facade: vectorizes a raw document, asks the classifier for
/// per-line glue decisions and reassembles the paragraphs.
pub struct Restorer {
    model: Box<dyn Classifier>,
    vectorizer: Vectorizer,
}

impl Restorer {
    /// Creates a restorer around an already loaded classifier.
    pub fn new(model: Box<dyn Classifier>) -> Self {
        Restorer {
            model,
            vectorizer: Vectorizer::new(),
        }
    }

    /// Loads the logistic-regression model stored at `path`.
    ///
    /// # Errors
    /// Fails immediately when the model file is missing or malformed.
    pub fn from_model_path(path: &Path) -> Result<Self, ReflowError> {
        let mut learner = LogisticRegression::new(0.0005, 5000, 1e-6);
        learner.load_model(path)?;
        Ok(Self::new(Box::new(learner)))
    }

    /// Loads the logistic-regression model from a byte stream.
    ///
    /// # Errors
    /// Fails immediately when the stream is malformed.
    pub fn from_model_reader<R: io::Read>(reader: R) -> Result<Self, ReflowError> {
        let mut learner = LogisticRegression::new(0.0005, 5000, 1e-6);
        learner.read_model(reader)?;
        Ok(Self::new(Box::new(learner)))
    }

    /// Restores paragraph structure in `text`: layout-induced line breaks
    /// are removed (undoing hyphenated word splits), paragraph breaks are
    /// kept as single newlines.
    ///
    /// # Errors
    /// Returns [`ReflowError::PredictionMismatch`] if the classifier
    /// violates its one-label-per-line contract.
    pub fn restore_text(&self, text: &str) -> Result<String, ReflowError> {
        let (features, lines) = self.vectorizer.featurize_without_annotation(text);
        let predictions = self.model.predict(&features);
        reconstruct(&lines, &predictions)
    }
}

/// Reassembles reflowed text from lines and per-line glue predictions.
///
/// A line whose prediction is `false` starts a new paragraph; a line whose
/// successor is predicted to glue gets its trailing edge prepared first: a
/// trailing hyphen variant is dropped, any other ending gains a single
/// space.
pub fn reconstruct(lines: &[String], predictions: &[bool]) -> Result<String, ReflowError> {
    if lines.len() != predictions.len() {
        return Err(ReflowError::PredictionMismatch {
            lines: lines.len(),
            predictions: predictions.len(),
        });
    }

    let mut res = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 && !predictions[i] {
            res.push('\n');
        }
        if i + 1 < lines.len() && predictions[i + 1] {
            match line.chars().last() {
                Some(c) if HYPHEN_CHARS.contains(&c) => {
                    res.push_str(&line[..line.len() - c.len_utf8()]);
                }
                Some(_) => {
                    res.push_str(line);
                    res.push(' ');
                }
                // an empty line has no word to continue
                None => {}
            }
        } else {
            res.push_str(line);
        }
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dehyphenates_across_a_glued_break() {
        let lines = lines(&[
            "The bat-",
            "tery lasts long.",
            "New paragraph starts here.",
        ]);
        let restored = reconstruct(&lines, &[false, true, false]).unwrap();
        assert_eq!(restored, "The battery lasts long.\nNew paragraph starts here.");
    }

    #[test]
    fn joins_a_continuation_with_a_single_space() {
        let lines = lines(&["Hello", "world.", "Bye."]);
        let restored = reconstruct(&lines, &[false, true, false]).unwrap();
        assert_eq!(restored, "Hello world.\nBye.");
    }

    #[test]
    fn keeps_all_breaks_when_nothing_glues() {
        let lines = lines(&["one", "two", "three", "four"]);
        let restored = reconstruct(&lines, &[false, false, false, false]).unwrap();
        assert_eq!(restored, "one\ntwo\nthree\nfour");
    }

    #[test]
    fn strips_every_hyphen_variant_before_gluing() {
        for hyphen in HYPHEN_CHARS {
            let lines = vec![format!("con{}", hyphen), "tinued".to_string()];
            let restored = reconstruct(&lines, &[false, true]).unwrap();
            assert_eq!(restored, "continued", "hyphen {:?}", hyphen);
        }
    }

    #[test]
    fn non_hyphen_endings_get_exactly_one_space() {
        // an em dash is not a layout hyphen
        let lines = lines(&["ends with em dash \u{2014}", "next"]);
        let restored = reconstruct(&lines, &[false, true]).unwrap();
        assert_eq!(restored, "ends with em dash \u{2014} next");
    }

    #[test]
    fn empty_line_glues_without_adding_a_space() {
        let lines = lines(&["", "abc"]);
        let restored = reconstruct(&lines, &[false, true]).unwrap();
        assert_eq!(restored, "abc");
    }

    #[test]
    fn reconstruction_is_deterministic() {
        let lines = lines(&["a-", "b", "c"]);
        let predictions = [false, true, false];
        let first = reconstruct(&lines, &predictions).unwrap();
        let second = reconstruct(&lines, &predictions).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn prediction_count_must_match_line_count() {
        let lines = lines(&["a", "b"]);
        let err = reconstruct(&lines, &[false]).unwrap_err();
        assert!(matches!(
            err,
            ReflowError::PredictionMismatch {
                lines: 2,
                predictions: 1
            }
        ));
    }

    #[test]
    fn restorer_composes_vectorizer_classifier_and_reconstruction() {
        struct FixedClassifier(Vec<bool>);
        impl Classifier for FixedClassifier {
            fn predict(&self, features: &[LineFeatures]) -> Vec<bool> {
                assert_eq!(features.len(), self.0.len());
                self.0.clone()
            }
        }

        let restorer = Restorer::new(Box::new(FixedClassifier(vec![false, true, false])));
        let restored = restorer
            .restore_text("The bat-\ntery lasts long.\nNew paragraph starts here.")
            .unwrap();
        assert_eq!(restored, "The battery lasts long.\nNew paragraph starts here.");
    }

    #[test]
    fn misaligned_classifier_is_rejected() {
        struct ShortClassifier;
        impl Classifier for ShortClassifier {
            fn predict(&self, _features: &[LineFeatures]) -> Vec<bool> {
                vec![false]
            }
        }

        let restorer = Restorer::new(Box::new(ShortClassifier));
        assert!(restorer.restore_text("one\ntwo\nthree").is_err());
    }

    #[test]
    fn restorer_loads_a_model_from_a_byte_stream() {
        let json = br#"{"weights":[],"bias":0.0,"vocabulary":[]}"#;
        let restorer = Restorer::from_model_reader(&json[..]).unwrap();
        // an untrained model scores zero, which means glue everywhere
        assert_eq!(restorer.restore_text("one\ntwo\nthree").unwrap(), "one two three");
    }

    #[test]
    fn empty_input_restores_to_empty_output() {
        struct GlueAll;
        impl Classifier for GlueAll {
            fn predict(&self, features: &[LineFeatures]) -> Vec<bool> {
                vec![true; features.len()]
            }
        }

        let restorer = Restorer::new(Box::new(GlueAll));
        assert_eq!(restorer.restore_text("").unwrap(), "");
    }
}
