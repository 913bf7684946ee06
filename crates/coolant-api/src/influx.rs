// InfluxDB 1.x HTTP client
//
// Wraps `reqwest::Client` with the `/query`, `/write` and `/ping`
// endpoints. Each client is bound to one database; writes may
// override it per call through `WriteTarget`.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::line_protocol;
use crate::store::TimeSeriesStore;
use crate::transport::TransportConfig;
use crate::types::{Point, Sample, WriteTarget};

/// Username and password for InfluxDB basic auth.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// HTTP client for a single InfluxDB 1.x database.
#[derive(Debug, Clone)]
pub struct InfluxClient {
    http: reqwest::Client,
    base_url: Url,
    database: String,
    credentials: Option<Credentials>,
    timeout_secs: u64,
}

impl InfluxClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the server root, e.g. `http://influx.plant.local:8086`.
    pub fn new(
        base_url: Url,
        database: impl Into<String>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            database: database.into(),
            credentials: None,
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn from_reqwest(
        base_url: &str,
        database: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            database: database.into(),
            credentials: None,
            timeout_secs: 0,
        })
    }

    /// Attach basic-auth credentials to every request.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// The database queries run against.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The server root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check reachability. Returns the server version when it reports one.
    pub async fn ping(&self) -> Result<Option<String>, Error> {
        let url = self.endpoint("ping")?;
        debug!("GET {}", url);

        let resp = self
            .authorized(self.http.get(url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: error_message(&resp.text().await.unwrap_or_default()),
            });
        }
        if !status.is_success() {
            return Err(Error::Query {
                status: status.as_u16(),
                message: "ping failed".into(),
            });
        }

        Ok(resp
            .headers()
            .get("X-Influxdb-Version")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned))
    }

    /// Run a query and return the raw samples of its first series.
    pub async fn query_samples(&self, query: &str) -> Result<Vec<Sample>, Error> {
        let mut url = self.endpoint("query")?;
        url.query_pairs_mut()
            .append_pair("db", &self.database)
            .append_pair("q", query)
            .append_pair("epoch", "ns");
        debug!(db = %self.database, query, "GET /query");

        let resp = self
            .authorized(self.http.get(url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: error_message(&body),
            });
        }
        if !status.is_success() {
            return Err(Error::Query {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: QueryResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        if let Some(message) = parsed.error {
            return Err(Error::Query {
                status: status.as_u16(),
                message,
            });
        }

        let Some(statement) = parsed.results.into_iter().next() else {
            return Ok(Vec::new());
        };
        if let Some(message) = statement.error {
            return Err(Error::Query {
                status: status.as_u16(),
                message,
            });
        }

        Ok(statement
            .series
            .into_iter()
            .next()
            .map(Series::into_samples)
            .unwrap_or_default())
    }

    /// Write one batch as line protocol with nanosecond precision.
    pub async fn write_points(&self, points: &[Point], target: &WriteTarget) -> Result<(), Error> {
        let mut url = self.endpoint("write")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("db", target.database.as_deref().unwrap_or(&self.database));
            if let Some(ref rp) = target.retention_policy {
                pairs.append_pair("rp", rp);
            }
            pairs.append_pair("precision", "ns");
        }
        debug!(points = points.len(), "POST {}", url.path());

        let resp = self
            .authorized(self.http.post(url))
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(line_protocol::encode(points))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: error_message(&body),
            });
        }
        Err(Error::Write {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let full = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path);
        Ok(Url::parse(&full)?)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials {
            Some(ref creds) => req.basic_auth(&creds.username, Some(creds.password.expose_secret())),
            None => req,
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }
}

impl TimeSeriesStore for InfluxClient {
    async fn query(&self, query: &str) -> Result<Vec<Sample>, Error> {
        self.query_samples(query).await
    }

    async fn write(&self, points: &[Point], target: &WriteTarget) -> Result<(), Error> {
        self.write_points(points, target).await
    }
}

// ── Response shapes ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl Series {
    fn into_samples(self) -> Vec<Sample> {
        let time_idx = self.columns.iter().position(|c| c == "time").unwrap_or(0);
        let value_idx = self
            .columns
            .iter()
            .position(|c| c == "value")
            .or_else(|| (0..self.columns.len()).find(|&i| i != time_idx))
            .unwrap_or(1);

        self.values
            .into_iter()
            .filter_map(|row| {
                let timestamp = parse_timestamp(row.get(time_idx)?)?;
                let value = parse_value(row.get(value_idx)?)?;
                Some(Sample { timestamp, value })
            })
            .collect()
    }
}

fn parse_timestamp(raw: &serde_json::Value) -> Option<DateTime<Utc>> {
    match raw {
        serde_json::Value::Number(n) => n.as_i64().map(DateTime::from_timestamp_nanos),
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

fn parse_value(raw: &serde_json::Value) -> Option<f64> {
    match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Pull the `{"error": "..."}` message out of a body, falling back to the raw text.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn series_prefers_value_column_and_skips_non_numeric() {
        let series: Series = serde_json::from_value(json!({
            "name": "AC_A1_001_supply_temp",
            "columns": ["time", "value"],
            "values": [
                [1_700_000_000_000_000_000_i64, 21.5],
                [1_700_000_060_000_000_000_i64, null],
                [1_700_000_120_000_000_000_i64, true],
                [1_700_000_180_000_000_000_i64, "n/a"]
            ]
        }))
        .unwrap();

        let samples = series.into_samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, 21.5);
        assert_eq!(samples[1].value, 1.0);
        assert_eq!(
            samples[0].timestamp,
            DateTime::from_timestamp_nanos(1_700_000_000_000_000_000)
        );
    }

    #[test]
    fn rfc3339_timestamps_are_accepted() {
        let ts = parse_timestamp(&json!("2024-05-01T08:00:00Z")).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T08:00:00+00:00");
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message(r#"{"error":"database not found"}"#), "database not found");
        assert_eq!(error_message("  bad gateway \n"), "bad gateway");
    }
}
