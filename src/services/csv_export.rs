//! CSV rendering for downstream tools that only read Shift_JIS.

use crate::errors::ServiceError;
use encoding_rs::SHIFT_JIS;
use metrics::counter;
use serde_json::Value;
use tracing::warn;

/// `Content-Type` of every CSV this service hands out
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=Shift_JIS";

/// Writes a header row plus records with `\n` line endings, quoting only when needed
pub fn render_csv<H, R>(headers: &[H], rows: R) -> Result<String, ServiceError>
where
    H: AsRef<str>,
    R: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(headers.iter().map(|h| h.as_ref()))?;
    for row in rows {
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ServiceError::InternalError(format!("csv flush failed: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| ServiceError::InternalError(format!("csv output is not UTF-8: {}", e)))
}

/// Encodes to Shift_JIS; unmappable characters become numeric character references
pub fn encode_shift_jis(text: &str) -> Vec<u8> {
    let (bytes, _, had_unmappable) = SHIFT_JIS.encode(text);
    if had_unmappable {
        warn!("CSV contains characters outside Shift_JIS; they were written as character references");
        counter!("order_desk.csv.unmappable", 1);
    }
    bytes.into_owned()
}

/// Renders an array of flat JSON objects. Columns are the union of keys in first-seen order.
pub fn records_to_csv(data: &Value) -> Result<String, ServiceError> {
    let records = match data.as_array() {
        Some(records) if !records.is_empty() => records,
        _ => return Err(ServiceError::BadRequest("Invalid data".into())),
    };

    let mut headers: Vec<&str> = Vec::new();
    for record in records.iter().filter_map(Value::as_object) {
        for key in record.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key);
            }
        }
    }
    if headers.is_empty() {
        return Err(ServiceError::BadRequest("No valid headers found".into()));
    }

    let rows = records.iter().map(|record| {
        headers
            .iter()
            .map(|key| match record.get(*key) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect::<Vec<_>>()
    });

    render_csv(&headers, rows)
}
