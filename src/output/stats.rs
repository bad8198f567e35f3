//! Statistics over the on-disk corpus
//!
//! Counts what each city directory holds, for `--stats` and for comparing
//! two cities before running analysis on them.

use crate::storage::CorpusStore;
use crate::Result;

/// Per-city corpus counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityStatistics {
    pub slug: String,
    /// Number of recorded search pages
    pub pages: usize,
    /// Highest recorded page, where a resumed crawl continues from
    pub last_page: u32,
    /// Number of stored listing documents
    pub listings: usize,
}

/// Corpus statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusStatistics {
    pub cities: Vec<CityStatistics>,
}

impl CorpusStatistics {
    pub fn total_listings(&self) -> usize {
        self.cities.iter().map(|c| c.listings).sum()
    }

    pub fn total_pages(&self) -> usize {
        self.cities.iter().map(|c| c.pages).sum()
    }
}

/// Loads statistics for every city directory under the corpus root
pub fn load_statistics(corpus: &CorpusStore) -> Result<CorpusStatistics> {
    let mut cities = Vec::new();

    for slug in corpus.list_cities()? {
        let city = corpus.city(&slug);
        cities.push(CityStatistics {
            pages: city.count_pages()?,
            last_page: city.last_page()?,
            listings: city.count_listings()?,
            slug,
        });
    }

    Ok(CorpusStatistics { cities })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CorpusStatistics) {
    println!("=== Corpus Statistics ===\n");

    if stats.cities.is_empty() {
        println!("No city has been crawled yet.");
        return;
    }

    println!("{:<32} {:>8} {:>10} {:>10}", "City", "Pages", "Last page", "Listings");
    for city in &stats.cities {
        println!(
            "{:<32} {:>8} {:>10} {:>10}",
            city.slug, city.pages, city.last_page, city.listings
        );
    }
    println!();

    println!(
        "Total: {} listings over {} pages in {} cities",
        stats.total_listings(),
        stats.total_pages(),
        stats.cities.len()
    );
}
