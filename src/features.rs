use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ReflowError;

/// Number of neighbouring lines on each side of a line that contribute to
/// its windowed mean length.
const WINDOW_RADIUS: usize = 5;

/// Per-line feature record consumed by the classifier.
///
/// Serialized field names follow the training-interchange schema, so
/// records on disk are PascalCase (`ThisLen`, `FirstChars`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineFeatures {
    pub this_len: f32,
    pub mean_len: f32,
    pub prev_len: f32,
    pub first_chars: String,
    pub prev_last_is_alpha: bool,
    pub prev_last_is_digit: bool,
    pub prev_last_is_lower: bool,
    pub prev_last_is_punct: bool,
}

/// A feature record together with its ground-truth glue label, built from
/// an annotated corpus line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledLine {
    #[serde(flatten)]
    pub features: LineFeatures,
    /// True if the line should be glued with the previous one instead of
    /// starting a new paragraph.
    #[serde(rename = "GlueWithPrevious")]
    pub glue_with_previous: bool,
}

/// Splits a document into physical lines, accepting CRLF, CR and LF.
pub fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::to_string)
        .collect()
}

/// Line-boundary featurizer.
///
/// Converts an ordered line sequence into per-line feature vectors, either
/// from an annotated corpus (training, emits labels) or from raw text
/// (inference).
pub struct Vectorizer {
    digit: Regex,
    punct: Regex,
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Vectorizer {
    /// Creates a new instance of [`Vectorizer`] with its character-class
    /// patterns compiled.
    pub fn new() -> Self {
        Vectorizer {
            digit: Regex::new(r"\p{Nd}").unwrap(),
            punct: Regex::new(r"\p{P}").unwrap(),
        }
    }

    /// Canonical character class: decimal digits collapse to `'0'`,
    /// letters to `'a'` or `'A'` by case, anything else passes through
    /// unchanged.
    pub fn classify_char(&self, c: char) -> char {
        if self.is_digit(c) {
            '0'
        } else if c.is_alphabetic() {
            if c.is_lowercase() {
                'a'
            } else {
                'A'
            }
        } else {
            c
        }
    }

    /// Featurizes an annotated corpus document.
    ///
    /// Every line must begin with `'*'` (paragraph break) or `'+'`
    /// (continuation); the marker is stripped before feature computation
    /// and becomes the glue label.
    ///
    /// # Errors
    /// Returns [`ReflowError::MissingAnnotation`] for a line that does not
    /// carry a recognized marker.
    pub fn featurize_with_annotation(&self, text: &str) -> Result<Vec<LabeledLine>, ReflowError> {
        let lines = split_lines(text.trim());
        let mut res = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let glue_with_previous = match line.chars().next() {
                Some('+') => true,
                Some('*') => false,
                _ => return Err(ReflowError::MissingAnnotation { line: i + 1 }),
            };
            let txt_line = &line[1..];
            let features = self.line_to_features(txt_line, i, &lines);
            res.push(LabeledLine {
                features,
                glue_with_previous,
            });
        }
        Ok(res)
    }

    /// Featurizes a raw document for inference. No markers are expected or
    /// stripped. Returns the feature vectors together with the split lines
    /// for later reconstruction.
    pub fn featurize_without_annotation(&self, text: &str) -> (Vec<LineFeatures>, Vec<String>) {
        let lines = split_lines(text.trim());
        let features = lines
            .iter()
            .enumerate()
            .map(|(i, line)| self.line_to_features(line, i, &lines))
            .collect();
        (features, lines)
    }

    /// Computes the feature vector for one line. `line` is the annotated
    /// mode's marker-stripped text; `lines` is the raw line storage the
    /// neighbour lengths are read from.
    pub fn line_to_features(&self, line: &str, i: usize, lines: &[String]) -> LineFeatures {
        let mut prev_len = 0.0;
        let mut last_prev_char = ' ';
        if i > 0 {
            // stored length minus the one-char annotation marker prefix
            prev_len = lines[i - 1].chars().count() as f32 - 1.0;
            last_prev_char = last_char(&lines[i - 1]);
        }
        LineFeatures {
            this_len: line.chars().count() as f32,
            mean_len: mean_in_window(lines, i),
            prev_len,
            first_chars: self.first_chars(line),
            prev_last_is_alpha: last_prev_char.is_alphabetic(),
            prev_last_is_digit: self.is_digit(last_prev_char),
            prev_last_is_lower: last_prev_char.is_lowercase(),
            prev_last_is_punct: self.is_punct(last_prev_char),
        }
    }

    /// First one or two characters of the line in canonical classes; an
    /// empty line yields a single space.
    fn first_chars(&self, line: &str) -> String {
        if line.is_empty() {
            return " ".to_string();
        }
        line.chars().take(2).map(|c| self.classify_char(c)).collect()
    }

    fn is_digit(&self, c: char) -> bool {
        let mut buf = [0u8; 4];
        self.digit.is_match(c.encode_utf8(&mut buf))
    }

    fn is_punct(&self, c: char) -> bool {
        let mut buf = [0u8; 4];
        self.punct.is_match(c.encode_utf8(&mut buf))
    }
}

fn last_char(line: &str) -> char {
    line.chars().last().unwrap_or(' ')
}

/// Mean neighbour length around line `i`.
///
/// The upper window bound is exclusive: the line at `min(i + 5, N - 1)` is
/// never part of its own window. Each term is the stored length minus the
/// one-char marker prefix, and the sum divides as an integer before
/// widening.
fn mean_in_window(lines: &[String], i: usize) -> f32 {
    let start = i.saturating_sub(WINDOW_RADIUS);
    let finish = (i + WINDOW_RADIUS).min(lines.len() - 1);
    let mut sum: i64 = 0;
    let mut count: i64 = 0;
    for line in &lines[start..finish] {
        sum += line.chars().count() as i64 - 1;
        count += 1;
    }
    (sum / count.max(1)) as f32
}
