//! Ticker reference lists compiled into one word-boundary matcher.

use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use std::path::Path;
use stonks_core::{ConfigError, CoreError};
use tracing::{debug, info, warn};

// A few thousand alternatives need more room than the regex default.
const MATCHER_SIZE_LIMIT: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct TickerDictionary {
    symbols: BTreeSet<String>,
    matcher: Option<Regex>,
}

impl TickerDictionary {
    /// Loads the domestic and foreign lists and unions them.
    ///
    /// Both files must exist; a missing list aborts startup.
    pub fn load(domestic: &Path, foreign: &Path) -> Result<Self, CoreError> {
        let mut symbols = read_symbols(domestic)?;
        let foreign_symbols = read_symbols(foreign)?;
        info!(
            "Loaded {} symbols from {} and {} from {}",
            symbols.len(),
            domestic.display(),
            foreign_symbols.len(),
            foreign.display()
        );
        symbols.extend(foreign_symbols);
        Self::from_symbols(symbols)
    }

    pub fn from_symbols<I, S>(symbols: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols: BTreeSet<String> = symbols
            .into_iter()
            .filter_map(|s| normalize_symbol(s.as_ref()))
            .collect();

        if symbols.is_empty() {
            warn!("Ticker dictionary is empty, nothing will match");
            return Ok(Self {
                symbols,
                matcher: None,
            });
        }

        let matcher = RegexBuilder::new(&build_pattern(&symbols))
            .size_limit(MATCHER_SIZE_LIMIT)
            .dfa_size_limit(MATCHER_SIZE_LIMIT)
            .build()?;
        debug!("Compiled matcher for {} symbols", symbols.len());

        Ok(Self {
            symbols,
            matcher: Some(matcher),
        })
    }

    pub fn symbols(&self) -> &BTreeSet<String> {
        &self.symbols
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Every whole-word occurrence of a known symbol, in text order.
    pub fn find_all<'t>(&'t self, text: &'t str) -> impl Iterator<Item = &'t str> + 't {
        self.matcher
            .iter()
            .flat_map(move |matcher| matcher.find_iter(text).map(|m| m.as_str()))
    }
}

fn read_symbols(path: &Path) -> Result<Vec<String>, CoreError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(raw.lines().filter_map(normalize_symbol).collect())
}

/// Trims a reference entry; blanks and single characters are dropped.
fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim();
    if symbol.chars().count() > 1 {
        Some(symbol.to_string())
    } else {
        None
    }
}

/// `\b(...)\b` over all symbols, longest first so `BRK.B` beats `BRK`.
fn build_pattern(symbols: &BTreeSet<String>) -> String {
    let mut ordered: Vec<&String> = symbols.iter().collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let alternatives: Vec<String> = ordered.iter().map(|s| regex::escape(s)).collect();
    format!(r"\b(?:{})\b", alternatives.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_list(lines: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", lines).unwrap();
        file
    }

    fn matches(dictionary: &TickerDictionary, text: &str) -> Vec<String> {
        dictionary.find_all(text).map(str::to_string).collect()
    }

    #[test]
    fn test_load_unions_and_filters_entries() {
        let domestic = write_list("GME\n  AMC \n\nA\nTSLA\n");
        let foreign = write_list("SAP\nBMW.DE\nX\nGME\n");

        let dictionary = TickerDictionary::load(domestic.path(), foreign.path()).unwrap();
        let symbols: Vec<&str> = dictionary.symbols().iter().map(String::as_str).collect();
        assert_eq!(symbols, vec!["AMC", "BMW.DE", "GME", "SAP", "TSLA"]);
        assert!(!dictionary.contains("A"));
        assert!(!dictionary.contains("X"));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let domestic = write_list("GME\n");
        let result = TickerDictionary::load(domestic.path(), Path::new("no/such/EU_tickers.txt"));
        match result {
            Err(CoreError::Config(ConfigError::FileNotFound { path })) => {
                assert!(path.ends_with("EU_tickers.txt"));
            }
            other => panic!("unexpected result: {:?}", other.map(|d| d.len())),
        }
    }

    #[test]
    fn test_loading_twice_is_identical() {
        let domestic = write_list("GME\nAMC\nTSLA\n");
        let foreign = write_list("SAP\nBMW.DE\n");

        let first = TickerDictionary::load(domestic.path(), foreign.path()).unwrap();
        let second = TickerDictionary::load(domestic.path(), foreign.path()).unwrap();
        assert_eq!(first.symbols(), second.symbols());

        let text = "GME AMC SAP BMW.DE TSLA";
        assert_eq!(matches(&first, text), matches(&second, text));
    }

    #[test]
    fn test_word_boundaries() {
        let dictionary = TickerDictionary::from_symbols(["GE", "GME"]).unwrap();
        assert!(matches(&dictionary, "GEOMETRIC growth").is_empty());
        assert!(matches(&dictionary, "AGME").is_empty());
        assert_eq!(matches(&dictionary, "GE, GME!"), vec!["GE", "GME"]);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let dictionary = TickerDictionary::from_symbols(["GME"]).unwrap();
        assert!(matches(&dictionary, "gme $gme Gme").is_empty());
        assert_eq!(matches(&dictionary, "$GME"), vec!["GME"]);
    }

    #[test]
    fn test_dots_are_literal() {
        let dictionary = TickerDictionary::from_symbols(["BMW.DE"]).unwrap();
        assert!(matches(&dictionary, "BMWXDE").is_empty());
        assert_eq!(matches(&dictionary, "long BMW.DE"), vec!["BMW.DE"]);
    }

    #[test]
    fn test_longer_symbol_wins() {
        let dictionary = TickerDictionary::from_symbols(["BRK", "BRK.B"]).unwrap();
        assert_eq!(matches(&dictionary, "BRK.B and BRK"), vec!["BRK.B", "BRK"]);
    }

    #[test]
    fn test_empty_dictionary_matches_nothing() {
        let dictionary = TickerDictionary::from_symbols(Vec::<String>::new()).unwrap();
        assert!(dictionary.is_empty());
        assert!(matches(&dictionary, "GME AMC").is_empty());
    }
}
