use std::collections::BTreeMap;
use std::io::Read;

use serde::Deserialize;

use super::sources::{CountryIndexSource, SourceError};

/// Legacy and transitional ISO codes mapped to their canonical successor.
///
/// The alias table is consulted before the per-year index lookup; a code that
/// appears here never reaches the table under its legacy spelling.
const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("UK", "GB"),
    ("EL", "GR"),
    ("BU", "MM"),
    ("TP", "TL"),
    ("ZR", "CD"),
    ("YU", "RS"),
    ("CS", "RS"),
    ("AN", "CW"),
    ("FX", "FR"),
    ("DD", "DE"),
];

/// Normalize a captured country code to its canonical form.
///
/// Resolution order: trim and uppercase, then the legacy alias table, then the
/// code as-is. Returns `None` for blank input; unknown-but-well-formed codes
/// pass through so the index lookup decides whether they score.
pub fn canonical_country_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let upper = trimmed.to_ascii_uppercase();

    let canonical = LEGACY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(upper);

    Some(canonical)
}

#[derive(Debug, Deserialize)]
struct CountryIndexRow {
    year: u16,
    code: String,
    index: i64,
}

/// Country-risk index table loaded from the published per-year CSV export
/// (`year,code,index` columns).
#[derive(Debug, Default, Clone)]
pub struct CsvCountryIndexSource {
    by_year: BTreeMap<u16, BTreeMap<String, i64>>,
}

impl CsvCountryIndexSource {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SourceError> {
        let mut by_year: BTreeMap<u16, BTreeMap<String, i64>> = BTreeMap::new();
        let mut csv_reader = csv::Reader::from_reader(reader);

        for row in csv_reader.deserialize() {
            let row: CountryIndexRow =
                row.map_err(|err| SourceError::Malformed(err.to_string()))?;
            let Some(code) = canonical_country_code(&row.code) else {
                return Err(SourceError::Malformed(format!(
                    "blank country code in index row for year {}",
                    row.year
                )));
            };
            by_year.entry(row.year).or_default().insert(code, row.index);
        }

        Ok(Self { by_year })
    }

    pub fn years(&self) -> impl Iterator<Item = u16> + '_ {
        self.by_year.keys().copied()
    }
}

impl CountryIndexSource for CsvCountryIndexSource {
    fn index(&self, year: u16, canonical_code: &str) -> Result<Option<i64>, SourceError> {
        Ok(self
            .by_year
            .get(&year)
            .and_then(|table| table.get(canonical_code))
            .copied())
    }
}
