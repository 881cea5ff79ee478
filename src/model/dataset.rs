//! Labelled feature dataset and its CSV file.
//!
//! The file has one header line and one row per fixture, columns in
//! `FeatureVector` field order with `result` last. Team ids are quoted
//! when they contain a comma or a quote.

use std::fmt::Write as _;
use std::path::Path;

use tracing::info;

use crate::features::FeatureVector;
use crate::storage;
use crate::types::{MatchOutcome, PipelineError};

/// Column header of the feature file.
pub const CSV_COLUMNS: [&str; 9] = [
    "home_id",
    "away_id",
    "form_home",
    "form_away",
    "standing_home",
    "standing_away",
    "h2h_home_wins",
    "h2h_away_wins",
    "result",
];

/// Ordered collection of feature rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<FeatureVector>,
}

impl Dataset {
    pub fn new(rows: Vec<FeatureVector>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row counts per outcome, indexed by `MatchOutcome::index`.
    pub fn class_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for outcome in self.rows.iter().filter_map(|r| r.result) {
            counts[outcome.index()] += 1;
        }
        counts
    }

    /// Feature matrix (ordered by `schema`) and labels. Every row must be labelled.
    pub fn labelled(&self, schema: &[String]) -> Result<(Vec<Vec<f64>>, Vec<MatchOutcome>), PipelineError> {
        let mut x = Vec::with_capacity(self.rows.len());
        let mut y = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let label = row.result.ok_or_else(|| {
                PipelineError::DataIntegrity(format!("row {i} ({} vs {}) has no result", row.home_id, row.away_id))
            })?;
            x.push(row.project(schema)?);
            y.push(label);
        }
        Ok((x, y))
    }

    /// Log size, columns and result distribution.
    pub fn log_summary(&self) {
        let [away, draw, home] = self.class_counts();
        info!(
            rows = self.len(),
            columns = %CSV_COLUMNS.join(","),
            home_wins = home,
            draws = draw,
            away_wins = away,
            "Dataset summary"
        );
    }

    // -- CSV ---------------------------------------------------------------

    pub fn to_csv(&self) -> String {
        let mut out = CSV_COLUMNS.join(",");
        out.push('\n');
        for r in &self.rows {
            let result = r.result.map(|o| o.label().to_string()).unwrap_or_default();
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{},{}",
                quote(&r.home_id),
                quote(&r.away_id),
                r.form_home,
                r.form_away,
                r.standing_home,
                r.standing_away,
                r.h2h_home_wins,
                r.h2h_away_wins,
                result,
            );
        }
        out
    }

    pub fn from_csv(text: &str) -> Result<Self, PipelineError> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

        let Some((_, header)) = lines.next() else {
            return Ok(Self::default());
        };
        let header = split_line(header);
        let index_of = |name: &str| {
            header.iter().position(|h| h == name).ok_or_else(|| PipelineError::Csv {
                line: 1,
                message: format!("missing column {name}"),
            })
        };
        let idx: Vec<usize> = CSV_COLUMNS.iter().map(|c| index_of(*c)).collect::<Result<_, _>>()?;

        let mut rows = Vec::new();
        for (n, line) in lines {
            let line_no = n + 1;
            let fields = split_line(line);
            let field = |col: usize| -> Result<&str, PipelineError> {
                fields.get(idx[col]).map(String::as_str).ok_or_else(|| PipelineError::Csv {
                    line: line_no,
                    message: format!("missing value for {}", CSV_COLUMNS[col]),
                })
            };
            let number = |col: usize| -> Result<u32, PipelineError> {
                let raw = field(col)?;
                raw.trim().parse().map_err(|_| PipelineError::Csv {
                    line: line_no,
                    message: format!("{} is not a count: {raw:?}", CSV_COLUMNS[col]),
                })
            };
            let result = match field(8)?.trim() {
                "" => None,
                raw => {
                    let label: i8 = raw.parse().map_err(|_| PipelineError::Csv {
                        line: line_no,
                        message: format!("result is not a label: {raw:?}"),
                    })?;
                    Some(MatchOutcome::from_label(label).ok_or_else(|| PipelineError::Csv {
                        line: line_no,
                        message: format!("result out of range: {label}"),
                    })?)
                }
            };
            rows.push(FeatureVector {
                home_id: field(0)?.to_string(),
                away_id: field(1)?.to_string(),
                form_home: number(2)?,
                form_away: number(3)?,
                standing_home: number(4)?,
                standing_away: number(5)?,
                h2h_home_wins: number(6)?,
                h2h_away_wins: number(7)?,
                result,
            });
        }
        Ok(Self { rows })
    }

    pub fn save_csv(&self, path: &Path) -> Result<(), PipelineError> {
        storage::write_atomic(path, self.to_csv().as_bytes())?;
        info!(path = %path.display(), rows = self.len(), "Features saved");
        Ok(())
    }

    pub fn load_csv(path: &Path) -> Result<Self, PipelineError> {
        let text = storage::read_existing(path, "feature dataset; run `matchcast features` first")?;
        let dataset = Self::from_csv(&text)?;
        info!(path = %path.display(), rows = dataset.len(), "Features loaded");
        Ok(dataset)
    }
}

fn quote(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split one CSV line, honouring double-quoted fields.
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', _) => quoted = !quoted,
            (',', false) => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::feature_schema;

    fn row(home: &str, result: Option<MatchOutcome>) -> FeatureVector {
        FeatureVector {
            home_id: home.into(),
            away_id: "84".into(),
            form_home: 3,
            form_away: 1,
            standing_home: 2,
            standing_away: 17,
            h2h_home_wins: 1,
            h2h_away_wins: 0,
            result,
        }
    }

    #[test]
    fn test_csv_layout() {
        let ds = Dataset::new(vec![row("102", Some(MatchOutcome::AwayWin))]);
        let csv = ds.to_csv();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "home_id,away_id,form_home,form_away,standing_home,standing_away,h2h_home_wins,h2h_away_wins,result"
        );
        assert_eq!(lines.next().unwrap(), "102,84,3,1,2,17,1,0,-1");
    }

    #[test]
    fn test_csv_quoting_survives_reload() {
        let ds = Dataset::new(vec![
            row("brighton, hove \"albion\"", Some(MatchOutcome::Draw)),
            row("7", None),
        ]);
        let back = Dataset::from_csv(&ds.to_csv()).unwrap();
        assert_eq!(back, ds);
    }

    #[test]
    fn test_from_csv_reordered_columns() {
        let text = "result,home_id,away_id,form_home,form_away,standing_home,standing_away,h2h_home_wins,h2h_away_wins\n1,a,b,1,2,3,4,5,6\n";
        let ds = Dataset::from_csv(text).unwrap();
        assert_eq!(ds.rows()[0].result, Some(MatchOutcome::HomeWin));
        assert_eq!(ds.rows()[0].h2h_away_wins, 6);
    }

    #[test]
    fn test_from_csv_errors() {
        let missing = "home_id,away_id\na,b\n";
        assert!(matches!(Dataset::from_csv(missing), Err(PipelineError::Csv { line: 1, .. })));

        let bad = format!("{}\na,b,x,1,1,1,1,1,1\n", CSV_COLUMNS.join(","));
        assert!(matches!(Dataset::from_csv(&bad), Err(PipelineError::Csv { line: 2, .. })));

        let bad_label = format!("{}\na,b,1,1,1,1,1,1,4\n", CSV_COLUMNS.join(","));
        assert!(Dataset::from_csv(&bad_label).is_err());
    }

    #[test]
    fn test_labelled_requires_results() {
        let ds = Dataset::new(vec![row("a", Some(MatchOutcome::HomeWin)), row("b", None)]);
        assert!(matches!(ds.labelled(&feature_schema()), Err(PipelineError::DataIntegrity(_))));

        let ds = Dataset::new(vec![row("a", Some(MatchOutcome::HomeWin))]);
        let (x, y) = ds.labelled(&feature_schema()).unwrap();
        assert_eq!(x[0], vec![3.0, 1.0, 2.0, 17.0, 1.0, 0.0]);
        assert_eq!(y, vec![MatchOutcome::HomeWin]);
    }

    #[test]
    fn test_class_counts() {
        let ds = Dataset::new(vec![
            row("a", Some(MatchOutcome::HomeWin)),
            row("b", Some(MatchOutcome::HomeWin)),
            row("c", Some(MatchOutcome::Draw)),
            row("d", None),
        ]);
        assert_eq!(ds.class_counts(), [0, 1, 2]);
    }

    #[test]
    fn test_empty_text() {
        assert!(Dataset::from_csv("").unwrap().is_empty());
    }
}
