/// Raw provider record -> storeable point
use crate::types::{DataPoint, RawRecord, Series};

/// Convert one record, or `None` when a required field is missing or null.
/// Incomplete records are expected partial data, not errors.
pub fn convert(series: Series, record: &RawRecord) -> Option<DataPoint> {
    match series {
        Series::MarketPrice => convert_market_price(record),
        Series::Production => convert_production(record),
    }
}

fn convert_market_price(record: &RawRecord) -> Option<DataPoint> {
    let price = finite(record.float("marketprice"))?;
    let timestamp = record.start()?;

    let point = DataPoint::new(Series::MarketPrice, timestamp).float_field("marketprice", price);
    Some(match record.string("unit") {
        Some(unit) => point.string_field("unit", unit),
        None => point,
    })
}

fn convert_production(record: &RawRecord) -> Option<DataPoint> {
    let solar = finite(record.float("solar"))?;
    let wind = finite(record.float("wind"))?;
    let timestamp = record.start()?;

    Some(
        DataPoint::new(Series::Production, timestamp)
            .float_field("solar", solar)
            .float_field("wind", wind),
    )
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn record(value: serde_json::Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_price_record_converted() {
        let raw = record(json!({
            "start_timestamp": 1704067200000i64,
            "end_timestamp": 1704070800000i64,
            "marketprice": 12.34,
            "unit": "Eur/MWh"
        }));

        let point = convert(Series::MarketPrice, &raw).unwrap();
        assert_eq!(point.series, Series::MarketPrice);
        assert_eq!(point.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(point.fields.len(), 2);
        assert_eq!(point.fields.get("marketprice"), Some(&FieldValue::Float(12.34)));
        assert_eq!(
            point.fields.get("unit"),
            Some(&FieldValue::String("Eur/MWh".to_string()))
        );
    }

    #[test]
    fn test_null_price_dropped() {
        let raw = record(json!({"start_timestamp": 1704067200000i64, "marketprice": null, "unit": "Eur/MWh"}));
        assert!(convert(Series::MarketPrice, &raw).is_none());

        let raw = record(json!({"start_timestamp": 1704067200000i64, "unit": "Eur/MWh"}));
        assert!(convert(Series::MarketPrice, &raw).is_none());
    }

    #[test]
    fn test_price_without_unit_keeps_price() {
        let raw = record(json!({"start_timestamp": 1704067200000i64, "marketprice": -5.0}));
        let point = convert(Series::MarketPrice, &raw).unwrap();
        assert_eq!(point.fields.len(), 1);
        assert_eq!(point.fields.get("marketprice"), Some(&FieldValue::Float(-5.0)));
    }

    #[test]
    fn test_production_record_converted() {
        let raw = record(json!({
            "start_timestamp": 1704067200000i64,
            "end_timestamp": 1704070800000i64,
            "solar": 120.5,
            "wind": 300.0
        }));

        let point = convert(Series::Production, &raw).unwrap();
        assert_eq!(point.fields.len(), 2);
        assert_eq!(point.fields.get("solar"), Some(&FieldValue::Float(120.5)));
        assert_eq!(point.fields.get("wind"), Some(&FieldValue::Float(300.0)));
    }

    #[test]
    fn test_partial_production_dropped() {
        let raw = record(json!({"start_timestamp": 1704067200000i64, "solar": null, "wind": 300.0}));
        assert!(convert(Series::Production, &raw).is_none());

        let raw = record(json!({"start_timestamp": 1704067200000i64, "solar": 120.5, "wind": null}));
        assert!(convert(Series::Production, &raw).is_none());

        let raw = record(json!({"start_timestamp": 1704067200000i64, "solar": 120.5}));
        assert!(convert(Series::Production, &raw).is_none());
    }

    #[test]
    fn test_record_without_start_dropped() {
        let raw = record(json!({"start_timestamp": null, "marketprice": 12.34, "unit": "Eur/MWh"}));
        assert!(convert(Series::MarketPrice, &raw).is_none());

        let raw = record(json!({"solar": 120.5, "wind": 300.0}));
        assert!(convert(Series::Production, &raw).is_none());
    }

    #[test]
    fn test_conversion_is_pure() {
        let raw = record(json!({"start_timestamp": 1704067200000i64, "solar": 1.0, "wind": 2.0}));
        assert_eq!(convert(Series::Production, &raw), convert(Series::Production, &raw));
    }
}
