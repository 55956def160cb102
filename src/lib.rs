pub mod error;
pub mod extractor;
pub mod features;
pub mod logreg;
pub mod restorer;
pub mod trainer;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn get_version() -> &'static str {
    VERSION
}
