//! PostgREST backend, which is what Supabase serves under `/rest/v1`.
//!
//! Filters end up in the query string:
//! ```text
//! GET /rest/v1/gps_data?select=*&speler=eq.Jan&datum=gte.2025-07-01&order=datum.desc&limit=10
//! ```
//! Exact counts are requested with a `Prefer: count=exact` header, and come back in the
//! `Content-Range` header as `0-9/123`.
use crate::backend::{BackendError, Client, FilterableQuery, Response, Row};
use log::{debug, info};
use reqwest::header::CONTENT_RANGE;
use reqwest::Url;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

#[derive(Clone)]
pub struct RestClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    runtime: Arc<Runtime>,
}

pub struct RestQuery {
    client: RestClient,
    table: String,
    params: Vec<(String, String)>,
    count: bool,
}

impl RestClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, BackendError> {
        // reqwest is async only, but the translator runs one query at a time, so a single
        // threaded runtime that we block on is plenty.
        let runtime = Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()?;

        Ok(RestClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            runtime: Arc::new(runtime),
        })
    }
}

impl Client for RestClient {
    type Query = RestQuery;

    fn table(&self, name: &str) -> Self::Query {
        RestQuery {
            client: self.clone(),
            table: name.to_string(),
            params: Vec::new(),
            count: false,
        }
    }
}

impl RestQuery {
    fn param(mut self, key: &str, value: String) -> Self {
        self.params.push((key.to_string(), value));
        self
    }

    fn filter(self, column: &str, operator: &str, value: &str) -> Self {
        self.param(column, format!("{operator}.{value}"))
    }

    /// The full URL this query will request.
    pub fn url(&self) -> Result<Url, BackendError> {
        let endpoint = format!("{}/rest/v1/{}", self.client.base_url, self.table);

        Url::parse_with_params(&endpoint, &self.params)
            .map_err(|error| BackendError::InvalidResponse(format!("invalid url {endpoint}: {error}")))
    }
}

impl FilterableQuery for RestQuery {
    fn select(self, columns: &str) -> Self {
        // PostgREST does not like spaces in the column list
        let columns = columns
            .split(',')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(",");

        self.param("select", columns)
    }

    fn exact_count(mut self) -> Self {
        self.count = true;
        self
    }

    fn eq(self, column: &str, value: &str) -> Self {
        self.filter(column, "eq", value)
    }

    fn gt(self, column: &str, value: &str) -> Self {
        self.filter(column, "gt", value)
    }

    fn gte(self, column: &str, value: &str) -> Self {
        self.filter(column, "gte", value)
    }

    fn lt(self, column: &str, value: &str) -> Self {
        self.filter(column, "lt", value)
    }

    fn lte(self, column: &str, value: &str) -> Self {
        self.filter(column, "lte", value)
    }

    fn not_is_null(self, column: &str) -> Self {
        self.filter(column, "not.is", "null")
    }

    fn order(self, column: &str, descending: bool) -> Self {
        let direction = if descending { "desc" } else { "asc" };

        self.param("order", format!("{column}.{direction}"))
    }

    fn limit(self, count: usize) -> Self {
        self.param("limit", count.to_string())
    }

    fn execute(self) -> Result<Response, BackendError> {
        let url = self.url()?;
        info!("GET {}", url);

        let mut request = self
            .client
            .http
            .get(url)
            .header("apikey", &self.client.api_key)
            .bearer_auth(&self.client.api_key);
        if self.count {
            request = request.header("Prefer", "count=exact");
        }

        self.client.runtime.block_on(fetch(request))
    }
}

async fn fetch(request: reqwest::RequestBuilder) -> Result<Response, BackendError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "no details".to_string());

        return Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    let count = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|range| range.to_str().ok())
        .and_then(parse_content_range);
    let data: Vec<Row> = response.json().await?;
    debug!("Received {} rows (count: {:?})", data.len(), count);

    Ok(Response { data, count })
}

/// Reads the total out of `0-9/123` or `*/0`. An unknown total (`0-9/*`) gives nothing.
fn parse_content_range(range: &str) -> Option<u64> {
    let (_, total) = range.rsplit_once('/')?;

    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RestClient {
        RestClient::new("https://project.supabase.co/", "secret").unwrap()
    }

    #[test]
    fn test_url_rendering() {
        let query = client()
            .table("gps_data")
            .select("speler, datum")
            .eq("speler", "Jan")
            .gte("datum", "2025-07-01")
            .not_is_null("afstand")
            .order("datum", true)
            .limit(10);

        assert_eq!(
            "https://project.supabase.co/rest/v1/gps_data?select=speler%2Cdatum&speler=eq.Jan\
            &datum=gte.2025-07-01&afstand=not.is.null&order=datum.desc&limit=10",
            query.url().unwrap().as_str()
        );
    }

    #[test]
    fn test_values_are_encoded() {
        let query = client().table("gps_data").eq("speler", "Barry & Co");

        assert_eq!(
            "https://project.supabase.co/rest/v1/gps_data?speler=eq.Barry+%26+Co",
            query.url().unwrap().as_str()
        );
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(Some(123), parse_content_range("0-9/123"));
        assert_eq!(Some(0), parse_content_range("*/0"));
        assert_eq!(None, parse_content_range("0-9/*"));
        assert_eq!(None, parse_content_range("garbage"));
    }
}
