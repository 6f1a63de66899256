use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::audit::{apply_audit_timestamps, WriteKind};
use crate::query::Query;
use crate::tables::Table;

/// Page size for `select_all`; matches PostgREST's default `max-rows`.
pub const SELECT_PAGE_ROWS: i64 = 1000;

/// Non-2xx answer from PostgREST.
#[derive(Debug, Error)]
#[error("PostgREST error ({status}): {message}")]
pub struct PostgrestError {
    pub status: u16,
    pub message: String,
}

impl PostgrestError {
    /// Unique or foreign-key violations come back as 409.
    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }
}

#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.service_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_key))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, body, extra_headers).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(PostgrestError {
                status: status.as_u16(),
                message: error_text,
            }
            .into());
        }

        Ok(response)
    }

    pub async fn select<T>(&self, query: &Query) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, &query.path(), None).await
    }

    /// Every row of `query`, fetched `SELECT_PAGE_ROWS` at a time.
    ///
    /// PostgREST silently truncates a response at its `max-rows` setting, so
    /// whole-table reads go through here. The query needs a total order for
    /// the pages to line up.
    pub async fn select_all<T>(&self, query: &Query) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut rows: Vec<T> = Vec::new();
        loop {
            let page: Vec<T> = self
                .select(
                    &query
                        .clone()
                        .limit(SELECT_PAGE_ROWS)
                        .offset(rows.len() as i64),
                )
                .await?;
            let fetched = page.len() as i64;
            rows.extend(page);

            if fetched < SELECT_PAGE_ROWS {
                break;
            }
            debug!("{} rows read from {} so far", rows.len(), query.target().name);
        }
        Ok(rows)
    }

    pub async fn select_one<T>(&self, query: &Query) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.select(&query.clone().limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn exists(&self, query: &Query) -> Result<bool> {
        let rows: Vec<Value> = self.select(&query.clone().select("id").limit(1)).await?;
        Ok(!rows.is_empty())
    }

    /// Exact row count for the query's filters, read from `Content-Range`.
    pub async fn count(&self, query: &Query) -> Result<i64> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let response = self
            .send(Method::HEAD, &query.filters_only().path(), None, Some(headers))
            .await?;

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| anyhow!("Missing Content-Range header on count"))?;

        parse_content_range_total(range)
            .with_context(|| format!("Unparseable Content-Range: {}", range))
    }

    pub async fn insert<T>(&self, table: &Table, mut body: Value) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        if table.audited {
            apply_audit_timestamps(&mut body, WriteKind::Insert, Utc::now());
        }

        let path = Query::table(table).path();
        self.request_with_headers(Method::POST, &path, Some(body), Some(representation()))
            .await
    }

    pub async fn insert_one<T>(&self, table: &Table, body: Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.insert(table, body).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("Insert into {} returned no row", table.name))
    }

    /// PATCH every row matching `query`; returns the updated rows.
    pub async fn update<T>(&self, query: &Query, mut body: Value) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        if query.target().audited {
            apply_audit_timestamps(&mut body, WriteKind::Update, Utc::now());
        }

        self.request_with_headers(Method::PATCH, &query.path(), Some(body), Some(representation()))
            .await
    }

    pub async fn delete(&self, query: &Query) -> Result<()> {
        self.send(Method::DELETE, &query.path(), None, None).await?;
        Ok(())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

fn representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

/// Total from `0-24/3573` or `*/0`.
pub fn parse_content_range_total(range: &str) -> Option<i64> {
    range.rsplit_once('/')?.1.trim().parse().ok()
}

/// True when `err` carries a PostgREST 409.
pub fn is_conflict(err: &anyhow::Error) -> bool {
    err.downcast_ref::<PostgrestError>()
        .map(PostgrestError::is_conflict)
        .unwrap_or(false)
}
