//! CSV boundary: reads the order dataset and hands rows to the normalizer.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{info, warn};

use super::Dataset;
use super::error::{MalformedReason, PipelineError, Result};
use super::normalize::Normalizer;
use super::record::{REQUIRED_COLUMNS, RawOrderRow};

/// Load and normalize the dataset at `path`.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let dataset = from_reader(file)?;
    info!(
        path = %path.display(),
        records = dataset.records().len(),
        excluded = dataset.exclusions().count,
        "dataset loaded"
    );
    Ok(dataset)
}

/// Load and normalize a dataset from any CSV source.
///
/// Header validation happens before any row is read, so a file with the
/// wrong shape fails fast with every missing column listed.
pub fn from_reader<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns(missing));
    }

    let mut normalizer = Normalizer::new();
    for result in rdr.deserialize::<RawOrderRow>() {
        match result {
            Ok(raw) => normalizer.push(&raw)?,
            Err(e) => {
                warn!(error = %e, "unreadable CSV row");
                normalizer.exclude(MalformedReason::Unreadable {
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(Dataset::from_normalized(normalizer.finish()))
}
