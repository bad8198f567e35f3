//! Output module for reporting on the collected corpus

mod stats;

pub use stats::{load_statistics, print_statistics, CityStatistics, CorpusStatistics};
