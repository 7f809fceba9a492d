//! Purpose: Explicit record-store configuration with a startup validity check.
//! Exports: `StoreConfig` and the default endpoint constants.
//! Role: Replaces ambient process-wide settings; passed into `RecordStoreClient::new`.
//! Invariants: A `StoreConfig` always holds a non-blank token and an http(s) base url with no path.
//! Invariants: `Debug` output never includes the token.
#![allow(clippy::result_large_err)]

use crate::core::error::{Error, ErrorKind};
use std::fmt;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://app.nocodb.com";
pub const DEFAULT_TABLE_ID: &str = "mu16td4m2vofa0u";
pub const DEFAULT_VIEW_ID: &str = "vwqd3w3dqtpllu75";

pub const TOKEN_ENV: &str = "API_TOKEN";
pub const BASE_URL_ENV: &str = "KIRKPATRICK_BASE_URL";
pub const TABLE_ID_ENV: &str = "KIRKPATRICK_TABLE_ID";
pub const VIEW_ID_ENV: &str = "KIRKPATRICK_VIEW_ID";

type ApiResult<T> = Result<T, Error>;

#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    base_url: Url,
    table_id: String,
    view_id: String,
    token: String,
}

impl StoreConfig {
    /// Default endpoint and identifiers with the given token.
    pub fn new(token: impl Into<String>) -> ApiResult<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(missing_token());
        }
        Ok(Self {
            base_url: normalize_base_url(DEFAULT_BASE_URL)?,
            table_id: DEFAULT_TABLE_ID.to_string(),
            view_id: DEFAULT_VIEW_ID.to_string(),
            token,
        })
    }

    /// Reads `API_TOKEN` (required) and the optional `KIRKPATRICK_*` overrides.
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(TOKEN_ENV).ok_or_else(missing_token)?;
        let mut config = Self::new(token)?;
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            config = config.with_base_url(&base_url)?;
        }
        if let Some(table_id) = lookup(TABLE_ID_ENV) {
            config = config.with_table_id(table_id)?;
        }
        if let Some(view_id) = lookup(VIEW_ID_ENV) {
            config = config.with_view_id(view_id)?;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, raw: &str) -> ApiResult<Self> {
        self.base_url = normalize_base_url(raw)?;
        Ok(self)
    }

    pub fn with_table_id(mut self, table_id: impl Into<String>) -> ApiResult<Self> {
        self.table_id = check_identifier(table_id.into(), "table id")?;
        Ok(self)
    }

    pub fn with_view_id(mut self, view_id: impl Into<String>) -> ApiResult<Self> {
        self.view_id = check_identifier(view_id.into(), "view id")?;
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `{base_url}/api/v2/tables/{table_id}/records?viewId={view_id}`
    pub fn records_url(&self) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                Error::new(ErrorKind::Usage).with_message("record store base url cannot be a base")
            })?;
            path.clear();
            for segment in ["api", "v2", "tables", &self.table_id, "records"] {
                path.push(segment);
            }
        }
        url.query_pairs_mut().append_pair("viewId", &self.view_id);
        Ok(url)
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_url", &self.base_url.as_str())
            .field("table_id", &self.table_id)
            .field("view_id", &self.view_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

fn missing_token() -> Error {
    Error::new(ErrorKind::Usage)
        .with_message("record store token is missing")
        .with_hint(format!(
            "Set {TOKEN_ENV} in the environment or pass --token-file <PATH>."
        ))
}

fn normalize_base_url(raw: &str) -> ApiResult<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid record store base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("record store base url must use http or https scheme"));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("record store base url must not include a path")
            .with_hint("Use only scheme://host[:port], e.g. https://app.nocodb.com."));
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn check_identifier(value: String, label: &str) -> ApiResult<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message(format!("{label} must not be empty")));
    }
    if value.contains('/') {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("{label} must not contain path separators")));
    }
    Ok(value)
}
