use std::collections::BTreeSet;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use gt_types::{DataError, Dataset, Example, GtError, GtResult};

/// Loads a labeled dataset from a CSV file with a header row.
///
/// Every column except the label column must be numeric. The class list is
/// the sorted set of distinct label strings.
#[derive(Debug, Clone, Default)]
pub struct CsvLoader {
    label_column: Option<String>,
    delimiter: Option<u8>,
}

impl CsvLoader {
    /// Loader that uses the last column as the label.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label_column(mut self, name: impl Into<String>) -> Self {
        self.label_column = Some(name.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn load<P: AsRef<Path>>(&self, file_path: P) -> GtResult<Dataset> {
        let path = file_path.as_ref();
        tracing::info!("Loading CSV dataset from: {}", path.display());

        if !path.exists() {
            return Err(DataError::SourceNotFound(path.display().to_string()).into());
        }

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter.unwrap_or(b','))
            .from_path(path)
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to open CSV file {}: {}", path.display(), e),
            })?;

        let headers = rdr
            .headers()
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to read CSV headers: {}", e),
            })?
            .clone();
        tracing::debug!("CSV headers: {:?}", headers);

        let label_idx = self.label_index(&headers)?;
        let feature_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != label_idx)
            .map(|(_, h)| h.trim().to_string())
            .collect();

        let mut rows: Vec<(Vec<f64>, String)> = Vec::new();
        for (line_num, result) in rdr.records().enumerate() {
            // header is line 1
            let line = line_num + 2;
            let record = result.map_err(|e| DataError::ParseError {
                line,
                message: e.to_string(),
            })?;
            rows.push(Self::parse_record(&record, &headers, label_idx, line)?);
        }

        if rows.is_empty() {
            return Err(DataError::InsufficientData {
                message: format!("{} contains no data rows", path.display()),
            }
            .into());
        }

        let classes: Vec<String> = rows
            .iter()
            .map(|(_, label)| label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if classes.len() < 2 {
            tracing::warn!(
                "Dataset {} has a single class '{}'; accuracy will be trivial",
                path.display(),
                classes[0]
            );
        }

        let examples = rows
            .into_iter()
            .map(|(features, label)| {
                // classes is built from these labels, so the search always hits
                let idx = classes.binary_search(&label).unwrap_or(0);
                Example::new(features, idx)
            })
            .collect();

        let dataset = Dataset::new(feature_names, classes, examples)?;
        tracing::info!(
            "Loaded {} rows, {} features, {} classes from {}",
            dataset.len(),
            dataset.n_features(),
            dataset.n_classes(),
            path.display()
        );
        Ok(dataset)
    }

    fn label_index(&self, headers: &StringRecord) -> GtResult<usize> {
        if headers.len() < 2 {
            return Err(DataError::InvalidFormat {
                message: format!(
                    "expected at least one feature column and a label column, found {} columns",
                    headers.len()
                ),
            }
            .into());
        }
        match &self.label_column {
            None => Ok(headers.len() - 1),
            Some(name) => headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| {
                    GtError::from(DataError::InvalidFormat {
                        message: format!("label column '{name}' not found in header"),
                    })
                }),
        }
    }

    fn parse_record(
        record: &StringRecord,
        headers: &StringRecord,
        label_idx: usize,
        line: usize,
    ) -> GtResult<(Vec<f64>, String)> {
        if record.len() != headers.len() {
            return Err(DataError::ParseError {
                line,
                message: format!(
                    "record has {} columns, header has {}",
                    record.len(),
                    headers.len()
                ),
            }
            .into());
        }

        let mut features = Vec::with_capacity(record.len() - 1);
        let mut label = String::new();
        for (i, field) in record.iter().enumerate() {
            let field = field.trim();
            if i == label_idx {
                if field.is_empty() {
                    return Err(DataError::ParseError {
                        line,
                        message: "missing label".to_string(),
                    }
                    .into());
                }
                label = field.to_string();
                continue;
            }
            let value: f64 = field.parse().map_err(|_| DataError::ParseError {
                line,
                message: format!(
                    "column '{}' value '{}' is not numeric",
                    headers.get(i).unwrap_or("?"),
                    field
                ),
            })?;
            features.push(value);
        }
        Ok((features, label))
    }
}
