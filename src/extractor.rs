use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ReflowError;
use crate::features::Vectorizer;

/// Extractor turns an annotated corpus into a features file: one JSON
/// record per line boundary, ready for training.
pub struct Extractor {
    vectorizer: Vectorizer,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// Creates a new instance of [`Extractor`].
    pub fn new() -> Self {
        Extractor {
            vectorizer: Vectorizer::new(),
        }
    }

    /// Extracts labeled features from `corpus_path` into `features_path`.
    ///
    /// `corpus_path` may be a single text file or a directory, in which
    /// case every `*.txt` file in it is visited in sorted path order. A
    /// corpus file counts as annotated when its very first character is an
    /// annotation marker; other files are reported and skipped.
    ///
    /// # Returns
    /// The number of feature records written.
    ///
    /// # Errors
    /// Fails on IO errors and on annotated files with unmarked lines.
    pub fn extract(&self, corpus_path: &Path, features_path: &Path) -> Result<usize, ReflowError> {
        let files = corpus_files(corpus_path)?;

        let features_file = File::create(features_path)?;
        let mut out = BufWriter::new(features_file);
        let mut written = 0;

        for path in files {
            let text = fs::read_to_string(&path)?;
            if !is_annotated(&text) {
                eprintln!("File '{}' doesn't have annotations, skipped.", path.display());
                continue;
            }
            eprintln!("File '{}' has annotations, process it.", path.display());
            for example in self.vectorizer.featurize_with_annotation(&text)? {
                serde_json::to_writer(&mut out, &example)?;
                out.write_all(b"\n")?;
                written += 1;
            }
        }
        out.flush()?;

        Ok(written)
    }
}

/// A file counts as annotated when its first character is a line marker.
fn is_annotated(text: &str) -> bool {
    matches!(text.chars().next(), Some('*') | Some('+'))
}

fn corpus_files(corpus_path: &Path) -> Result<Vec<PathBuf>, ReflowError> {
    if !corpus_path.is_dir() {
        return Ok(vec![corpus_path.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = fs::read_dir(corpus_path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == "txt"))
        .collect();
    // deterministic extraction order
    files.sort();
    Ok(files)
}
