/// InfluxDB v2 HTTP client (Flux queries, line-protocol writes)
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use super::{line_protocol, TimeSeriesStore};
use crate::error::{Result, SyncError};
use crate::types::{DataPoint, FieldValue, Series, Settings, StoredPoint};

/// InfluxDB v2 client bound to one organization and bucket
pub struct InfluxClient {
    client: Client,
    url: String,
    token: String,
    org: String,
    bucket: String,
}

impl InfluxClient {
    pub fn new(url: &str, token: &str, org: &str, bucket: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(InfluxClient {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            org: org.to_string(),
            bucket: bucket.to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.influxdb_url,
            &settings.influxdb_token,
            &settings.influxdb_org,
            &settings.influxdb_bucket,
            settings.http_timeout_secs,
        )
    }

    /// Flux selecting the last point of a measurement. The range reaches into
    /// the future because day-ahead prices are stored ahead of time.
    fn last_point_query(&self, measurement: &str) -> String {
        format!(
            r#"from(bucket: "{}")
  |> range(start: 1970-01-01T00:00:00Z, stop: 100000h)
  |> filter(fn: (r) => r["_measurement"] == "{}")
  |> last()"#,
            escape_flux_string(&self.bucket),
            escape_flux_string(measurement)
        )
    }

    fn authorization(&self) -> String {
        format!("Token {}", self.token)
    }
}

#[async_trait]
impl TimeSeriesStore for InfluxClient {
    async fn query_last_point(&self, series: Series) -> Result<Option<StoredPoint>> {
        let query = self.last_point_query(series.as_str());
        debug!("Querying last {} point", series);

        let response = self.client
            .post(format!("{}/api/v2/query", self.url))
            .query(&[("org", self.org.as_str())])
            .header("Authorization", self.authorization())
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "application/csv")
            .body(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SyncError::Store {
                status: status.as_u16(),
                message: body,
            });
        }

        parse_last_point(&body)
    }

    async fn write_points(&self, points: &[DataPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let body = line_protocol::encode_batch(points)?;

        let response = self.client
            .post(format!("{}/api/v2/write", self.url))
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header("Authorization", self.authorization())
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Store {
                status: status.as_u16(),
                message,
            });
        }

        info!("Wrote {} points to bucket {}", points.len(), self.bucket);
        Ok(())
    }
}

fn escape_flux_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Parse a Flux CSV response; the row with the greatest `_time` wins and all
/// of its `_field`/`_value` pairs are collected.
fn parse_last_point(body: &str) -> Result<Option<StoredPoint>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut header: Option<Vec<String>> = None;
    let mut latest: Option<StoredPoint> = None;

    for record in reader.records() {
        let record = record?;

        if record.iter().all(|f| f.trim().is_empty()) {
            // Blank line between tables
            header = None;
            continue;
        }
        if record.get(0).is_some_and(|f| f.starts_with('#')) {
            continue;
        }
        if record.iter().any(|f| f == "_time") {
            header = Some(record.iter().map(str::to_string).collect());
            continue;
        }

        let Some(columns) = header.as_ref() else {
            continue;
        };
        let column = |name: &str| {
            columns
                .iter()
                .position(|c| c == name)
                .and_then(|i| record.get(i))
        };

        let Some(time) = column("_time").filter(|t| !t.is_empty()) else {
            continue;
        };
        let timestamp = DateTime::parse_from_rfc3339(time)
            .map_err(|e| SyncError::InvalidTimestamp(format!("{}: {}", time, e)))?
            .with_timezone(&Utc);

        let field = match (column("_field"), column("_value")) {
            (Some(name), Some(value)) if !name.is_empty() => Some((name.to_string(), parse_value(value))),
            _ => None,
        };

        let newer = latest.as_ref().map_or(true, |p| timestamp > p.timestamp);
        if newer {
            latest = Some(StoredPoint {
                timestamp,
                fields: BTreeMap::new(),
            });
        }

        if let (Some(point), Some((name, value))) = (latest.as_mut(), field) {
            if point.timestamp == timestamp {
                point.fields.insert(name, value);
            }
        }
    }

    Ok(latest)
}

fn parse_value(value: &str) -> FieldValue {
    match value.parse::<f64>() {
        Ok(v) => FieldValue::Float(v),
        Err(_) => FieldValue::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;

    const LAST_PRICE_CSV: &str = ",result,table,_start,_stop,_time,_value,_field,_measurement\r\n\
,_result,0,1970-01-01T00:00:00Z,2035-05-29T16:00:00Z,2024-01-01T00:00:00Z,12.34,marketprice,marketprice\r\n\
,_result,1,1970-01-01T00:00:00Z,2035-05-29T16:00:00Z,2024-01-01T00:00:00Z,Eur/MWh,unit,marketprice\r\n\
\r\n";

    fn client(url: &str) -> InfluxClient {
        InfluxClient::new(url, "secret", "home", "awattar", 5).unwrap()
    }

    #[test]
    fn test_parse_last_point() {
        let point = parse_last_point(LAST_PRICE_CSV).unwrap().unwrap();
        assert_eq!(point.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(point.fields.get("marketprice"), Some(&FieldValue::Float(12.34)));
        assert_eq!(
            point.fields.get("unit"),
            Some(&FieldValue::String("Eur/MWh".to_string()))
        );
    }

    #[test]
    fn test_parse_picks_latest_across_tables() {
        let csv = "#datatype,string,long,dateTime:RFC3339,double,string\n\
,result,table,_time,_value,_field\n\
,_result,0,2024-01-01T05:00:00Z,1.5,solar\n\
\n\
,result,table,_time,_value,_field\n\
,_result,1,2024-01-01T06:00:00.000000001Z,2.5,wind\n";

        let point = parse_last_point(csv).unwrap().unwrap();
        assert_eq!(
            point.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap() + chrono::Duration::nanoseconds(1)
        );
        assert_eq!(point.fields.len(), 1);
        assert_eq!(point.fields.get("wind"), Some(&FieldValue::Float(2.5)));
    }

    #[test]
    fn test_parse_empty_response() {
        assert!(parse_last_point("").unwrap().is_none());
        assert!(parse_last_point("\r\n").unwrap().is_none());
    }

    #[test]
    fn test_flux_query_escaping() {
        let client = InfluxClient::new("http://localhost:8086", "t", "o", "my\"bucket", 5).unwrap();
        let query = client.last_point_query("marketprice");
        assert!(query.contains(r#"from(bucket: "my\"bucket")"#));
        assert!(query.contains(r#"r["_measurement"] == "marketprice""#));
        assert!(query.contains("|> last()"));
    }

    #[tokio::test]
    async fn test_query_last_point_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/query")
            .match_query(Matcher::UrlEncoded("org".into(), "home".into()))
            .match_header("authorization", "Token secret")
            .match_header("content-type", "application/vnd.flux")
            .match_body(Matcher::Regex(r#"== "marketprice""#.to_string()))
            .with_status(200)
            .with_header("content-type", "text/csv; charset=utf-8")
            .with_body(LAST_PRICE_CSV)
            .create_async()
            .await;

        let point = client(&server.url())
            .query_last_point(Series::MarketPrice)
            .await
            .unwrap()
            .unwrap();

        mock.assert_async().await;
        assert_eq!(point.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_write_points_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/write")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("org".into(), "home".into()),
                Matcher::UrlEncoded("bucket".into(), "awattar".into()),
                Matcher::UrlEncoded("precision".into(), "ns".into()),
            ]))
            .match_header("authorization", "Token secret")
            .match_body("production solar=120.5,wind=300 1704067200000000000")
            .with_status(204)
            .create_async()
            .await;

        let point = DataPoint::new(Series::Production, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .float_field("solar", 120.5)
            .float_field("wind", 300.0);

        client(&server.url()).write_points(&[point]).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_store_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/write")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"code":"unauthorized","message":"unauthorized access"}"#)
            .create_async()
            .await;

        let point = DataPoint::new(Series::Production, Utc::now()).float_field("solar", 1.0);
        let err = client(&server.url()).write_points(&[point]).await.unwrap_err();

        assert!(matches!(err, SyncError::Store { status: 401, .. }));
        assert_eq!(err.error_code(), "STORE_001");
    }

    #[tokio::test]
    async fn test_empty_write_skips_request() {
        // No mock registered: any request would fail with 501
        let server = mockito::Server::new_async().await;
        client(&server.url()).write_points(&[]).await.unwrap();
    }
}
