/// InfluxDB line protocol encoding
use crate::error::{Result, SyncError};
use crate::types::{DataPoint, FieldValue};

/// Encode one point as `measurement field=value[,field=value] <ns timestamp>`
pub fn encode_point(point: &DataPoint) -> Result<String> {
    let timestamp = point.timestamp.timestamp_nanos_opt().ok_or_else(|| {
        SyncError::InvalidTimestamp(format!(
            "{} is outside the nanosecond range",
            point.timestamp.to_rfc3339()
        ))
    })?;

    let fields: Vec<String> = point
        .fields
        .iter()
        .filter_map(|(name, value)| {
            let encoded = match value {
                FieldValue::Float(v) if v.is_finite() => format!("{}", v),
                FieldValue::Float(_) => return None,
                FieldValue::String(s) => format!("\"{}\"", escape_string_value(s)),
            };
            Some(format!("{}={}", escape_key(name), encoded))
        })
        .collect();

    if fields.is_empty() {
        return Err(SyncError::Internal(format!(
            "{} point at {} has no encodable fields",
            point.series,
            point.timestamp.to_rfc3339()
        )));
    }

    Ok(format!(
        "{} {} {}",
        escape_measurement(point.series.as_str()),
        fields.join(","),
        timestamp
    ))
}

/// Encode a batch, one line per point
pub fn encode_batch(points: &[DataPoint]) -> Result<String> {
    let lines = points
        .iter()
        .map(encode_point)
        .collect::<Result<Vec<_>>>()?;
    Ok(lines.join("\n"))
}

fn escape_measurement(name: &str) -> String {
    name.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_key(name: &str) -> String {
    name.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

fn escape_string_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
