//! PE-ranked, sector-capped candidate selection.

use crate::domain::fundamentals::Candidate;
use crate::domain::sector::SectorCache;
use std::collections::HashMap;

/// Select up to `top_n` tickers, lowest PE first, admitting at most
/// `max_per_sector` tickers from any one sector.
///
/// The sort is stable, so equal PEs keep their input order. A candidate whose
/// sector is already full is skipped for good, which can leave the selection
/// shorter than `top_n`.
pub fn select(
    candidates: &[Candidate],
    top_n: usize,
    max_per_sector: usize,
    sectors: &mut SectorCache<'_>,
) -> Vec<String> {
    let mut ranked: Vec<&Candidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| a.pe.total_cmp(&b.pe));

    let mut selected = Vec::with_capacity(top_n.min(ranked.len()));
    let mut per_sector: HashMap<String, usize> = HashMap::new();

    for candidate in ranked {
        if selected.len() >= top_n {
            break;
        }
        let sector = sectors.resolve(&candidate.ticker);
        let count = per_sector.entry(sector.to_string()).or_insert(0);
        if *count < max_per_sector {
            *count += 1;
            selected.push(candidate.ticker.clone());
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::sector_port::SectorPort;

    struct MapSectors(HashMap<&'static str, &'static str>);

    impl SectorPort for MapSectors {
        fn lookup(&self, ticker: &str) -> String {
            self.0
                .get(ticker)
                .copied()
                .unwrap_or(crate::domain::sector::UNKNOWN_SECTOR)
                .to_string()
        }
    }

    fn sectors() -> MapSectors {
        MapSectors(HashMap::from([
            ("A", "Tech"),
            ("B", "Tech"),
            ("C", "Tech"),
            ("D", "Energy"),
            ("E", "Energy"),
            ("F", "Health"),
        ]))
    }

    #[test]
    fn lowest_pe_first() {
        let port = sectors();
        let mut cache = SectorCache::new(&port);
        let candidates = vec![
            Candidate::new("D", 18.0),
            Candidate::new("F", 9.0),
            Candidate::new("A", 12.0),
        ];
        assert_eq!(select(&candidates, 3, 5, &mut cache), vec!["F", "A", "D"]);
    }

    #[test]
    fn stops_at_top_n() {
        let port = sectors();
        let mut cache = SectorCache::new(&port);
        let candidates = vec![
            Candidate::new("A", 1.0),
            Candidate::new("D", 2.0),
            Candidate::new("F", 3.0),
        ];
        assert_eq!(select(&candidates, 2, 5, &mut cache), vec!["A", "D"]);
        // F was never examined
        assert_eq!(cache.cached_count(), 2);
    }

    #[test]
    fn sector_cap_skips_without_retry() {
        let port = sectors();
        let mut cache = SectorCache::new(&port);
        let candidates = vec![
            Candidate::new("A", 1.0),
            Candidate::new("B", 2.0),
            Candidate::new("C", 3.0),
            Candidate::new("D", 4.0),
        ];
        assert_eq!(select(&candidates, 3, 2, &mut cache), vec!["A", "B", "D"]);
    }

    #[test]
    fn capped_pool_yields_short_selection() {
        let port = sectors();
        let mut cache = SectorCache::new(&port);
        let candidates = vec![
            Candidate::new("A", 1.0),
            Candidate::new("B", 2.0),
            Candidate::new("C", 3.0),
        ];
        assert_eq!(select(&candidates, 3, 1, &mut cache), vec!["A"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let port = sectors();
        let mut cache = SectorCache::new(&port);
        let candidates = vec![
            Candidate::new("F", 10.0),
            Candidate::new("D", 10.0),
            Candidate::new("A", 10.0),
        ];
        assert_eq!(select(&candidates, 3, 5, &mut cache), vec!["F", "D", "A"]);
    }

    #[test]
    fn unknown_sector_shares_one_cap() {
        let port = sectors();
        let mut cache = SectorCache::new(&port);
        let candidates = vec![
            Candidate::new("X1", 1.0),
            Candidate::new("X2", 2.0),
            Candidate::new("X3", 3.0),
            Candidate::new("F", 4.0),
        ];
        assert_eq!(select(&candidates, 4, 2, &mut cache), vec!["X1", "X2", "F"]);
    }

    #[test]
    fn empty_candidates() {
        let port = sectors();
        let mut cache = SectorCache::new(&port);
        assert!(select(&[], 5, 5, &mut cache).is_empty());
    }
}
