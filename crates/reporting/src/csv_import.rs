//! Stage-count import from `Stage,Count` CSV files.

use funnel_core::{FunnelData, FunnelError, FunnelResult, FunnelStage};
use std::io::Read;
use std::path::Path;
use tracing::info;

const STAGE_COLUMN: &str = "Stage";
const COUNT_COLUMN: &str = "Count";

const TEMPLATE: &str = "Stage,Count\nVisitor,1000\nLead,250\nMQL,125\nSQL,50\n";

/// Sample file users can fill in with their own numbers.
pub fn csv_template() -> String {
    TEMPLATE.to_string()
}

/// Parse funnel data from CSV with `Stage` and `Count` header columns.
///
/// Column order is free and extra columns are ignored. Rows keep file order.
pub fn parse_funnel_csv<R: Read>(reader: R) -> FunnelResult<FunnelData> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_error)?.clone();
    let column = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            FunnelError::InvalidInput(format!(
                "CSV must have '{STAGE_COLUMN}' and '{COUNT_COLUMN}' columns, missing '{name}'"
            ))
        })
    };
    let stage_idx = column(STAGE_COLUMN)?;
    let count_idx = column(COUNT_COLUMN)?;

    let mut stages = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_error)?;
        // Header is line 1.
        let line = row + 2;
        let name = record.get(stage_idx).unwrap_or_default();
        let raw = record.get(count_idx).unwrap_or_default();
        let count = parse_count(raw).ok_or_else(|| {
            FunnelError::InvalidInput(format!(
                "line {line}: count '{raw}' for stage '{name}' is not a non-negative integer"
            ))
        })?;
        stages.push(FunnelStage {
            name: name.to_string(),
            count,
        });
    }

    let data = FunnelData::new(stages)?;
    info!(stages = data.len(), "Funnel data imported from CSV");
    Ok(data)
}

pub fn read_funnel_csv(path: &Path) -> FunnelResult<FunnelData> {
    let file = std::fs::File::open(path)?;
    parse_funnel_csv(file)
}

/// Accepts plain integers and integral floats such as `250.0`, which
/// spreadsheet exports tend to produce.
fn parse_count(raw: &str) -> Option<u64> {
    if let Ok(count) = raw.parse::<u64>() {
        return Some(count);
    }
    let value: f64 = raw.parse().ok()?;
    let integral = value.is_finite() && value >= 0.0 && value.fract() == 0.0;
    (integral && value < u64::MAX as f64).then_some(value as u64)
}

fn csv_error(err: csv::Error) -> FunnelError {
    FunnelError::InvalidInput(format!("malformed CSV: {err}"))
}
