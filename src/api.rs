// API client module: a blocking HTTP client for the Seedr service plus
// the `Remote` trait, which is the slice of the API the delete flow needs.
// Keeping that slice behind a trait lets `resolve` be tested without a
// network.

use std::cell::RefCell;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::models::{
    AddTorrentResult, ArchiveResult, DeviceCode, FetchFileResult, ListContents, MemoryBandwidth,
    Token,
};
use crate::resolve::ItemKind;
use crate::token::TokenStore;

const DEVICE_CLIENT_ID: &str = "seedr_xbmc";
const PASSWORD_CLIENT_ID: &str = "seedr_chrome";

/// Remote operations used to identify and delete an item.
pub trait Remote {
    /// Top-level folders, files and torrents of the account.
    fn list_root(&self) -> Result<ListContents>;
    fn delete_folder(&self, id: &str) -> Result<()>;
    fn delete_file(&self, id: &str) -> Result<()>;
    fn delete_torrent(&self, id: &str) -> Result<()>;
}

/// Blocking API client. Holds the reqwest client, the service base URL
/// and the current token. Refreshed tokens are written back to the
/// optional token store.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: RefCell<Option<Token>>,
    store: Option<TokenStore>,
}

impl ApiClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("seedr-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url: cfg.base_url.clone(),
            token: RefCell::new(None),
            store: None,
        })
    }

    /// Create an ApiClient configured from the environment. See
    /// `Config::from_env`.
    pub fn from_env() -> Result<Self> {
        Self::new(&Config::from_env()?)
    }

    /// Persist every refreshed token into `store`.
    pub fn with_token_store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn set_token(&self, token: Token) {
        *self.token.borrow_mut() = Some(token);
    }

    pub fn has_token(&self) -> bool {
        self.token.borrow().is_some()
    }

    pub fn token(&self) -> Option<Token> {
        self.token.borrow().clone()
    }

    /// Start the device flow. The returned codes are shown to the user.
    pub fn get_device_code(&self) -> Result<DeviceCode> {
        let url = format!("{}/api/device/code", self.base_url);
        debug!("GET {url}");
        let res = self
            .client
            .get(&url)
            .query(&[("client_id", DEVICE_CLIENT_ID)])
            .send()
            .context("Failed to send device code request")?;
        let value = parse_value(res, "device code")?;
        serde_json::from_value(value).context("Parsing device code response json")
    }

    /// Exchange a device code for a token once the user has approved it.
    pub fn authorize_device(&self, device_code: &str) -> Result<Token> {
        let url = format!("{}/api/device/authorize", self.base_url);
        debug!("GET {url}");
        let res = self
            .client
            .get(&url)
            .query(&[("device_code", device_code), ("client_id", DEVICE_CLIENT_ID)])
            .send()
            .context("Failed to send device authorize request")?;
        let value = parse_value(res, "device authorize")?;
        let mut token: Token =
            serde_json::from_value(value).context("Parsing device authorize response json")?;
        token.device_code = Some(device_code.to_string());
        Ok(token)
    }

    /// Get a new access token using the refresh token, or by authorizing
    /// the device code again for device-flow tokens.
    pub fn refresh(&self) -> Result<()> {
        let current = self.token().ok_or_else(|| anyhow!("not logged in"))?;

        let fresh = if let Some(refresh_token) = &current.refresh_token {
            let url = format!("{}/oauth_test/token.php", self.base_url);
            debug!("POST {url}");
            let res = self
                .client
                .post(&url)
                .form(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                    ("client_id", PASSWORD_CLIENT_ID),
                ])
                .send()
                .context("Failed to send refresh request")?;
            let value = parse_value(res, "token refresh")?;
            let mut token: Token =
                serde_json::from_value(value).context("Parsing token refresh response json")?;
            if token.refresh_token.is_none() {
                token.refresh_token = current.refresh_token.clone();
            }
            token.device_code = current.device_code.clone();
            token
        } else if let Some(device_code) = &current.device_code {
            self.authorize_device(device_code)?
        } else {
            bail!("access token expired and cannot be refreshed, run `seedr login`");
        };

        info!("Access token refreshed");
        if let Some(store) = &self.store {
            store.save(&fresh)?;
        }
        self.set_token(fresh);
        Ok(())
    }

    /// List a folder, or the account root when `folder_id` is `None`.
    pub fn list_contents(&self, folder_id: Option<&str>) -> Result<ListContents> {
        let content_id = folder_id.unwrap_or("0").to_string();
        self.call("list_contents", |req, token| {
            Ok(req.form(&[
                ("access_token", token),
                ("content_type", "folder"),
                ("content_id", content_id.as_str()),
            ]))
        })
    }

    pub fn get_memory_bandwidth(&self) -> Result<MemoryBandwidth> {
        self.call("get_memory_bandwidth", |req, token| {
            Ok(req.form(&[("access_token", token)]))
        })
    }

    /// Direct download link for a file.
    pub fn fetch_file(&self, file_id: &str) -> Result<FetchFileResult> {
        self.call("fetch_file", |req, token| {
            Ok(req.form(&[("access_token", token), ("folder_file_id", file_id)]))
        })
    }

    /// Zip archive link for a folder.
    pub fn create_archive(&self, folder_id: &str) -> Result<ArchiveResult> {
        let archive_arr = item_array(ItemKind::Folder, folder_id)?;
        self.call("create_empty_archive", |req, token| {
            Ok(req.form(&[("access_token", token), ("archive_arr", archive_arr.as_str())]))
        })
    }

    /// Add a magnet link or torrent URL.
    pub fn add_torrent(&self, magnet: &str) -> Result<AddTorrentResult> {
        self.call("add_torrent", |req, token| {
            Ok(req.form(&[
                ("access_token", token),
                ("torrent_magnet", magnet),
                ("folder_id", "-1"),
            ]))
        })
    }

    /// Upload a local `.torrent` file.
    pub fn add_torrent_file(&self, path: &Path) -> Result<AddTorrentResult> {
        self.call("add_torrent", |req, token| {
            let form = multipart::Form::new()
                .text("access_token", token.to_string())
                .text("folder_id", "-1")
                .file("torrent_file", path)
                .with_context(|| format!("Failed to open torrent file {}", path.display()))?;
            Ok(req.multipart(form))
        })
    }

    pub fn delete_item(&self, kind: ItemKind, id: &str) -> Result<()> {
        let delete_arr = item_array(kind, id)?;
        let _: Value = self.call("delete", |req, token| {
            Ok(req.form(&[("access_token", token), ("delete_arr", delete_arr.as_str())]))
        })?;
        Ok(())
    }

    /// Run a resource call, refreshing the token and retrying once when
    /// the service reports it as expired. `build` attaches the payload and
    /// may be called twice.
    fn call<T, F>(&self, func: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(RequestBuilder, &str) -> Result<RequestBuilder>,
    {
        let value = match self.send(func, &build)? {
            Some(value) => value,
            None => {
                info!("Access token rejected by {func}, refreshing");
                self.refresh()?;
                self.send(func, &build)?
                    .ok_or_else(|| anyhow!("{func}: access token rejected after refresh"))?
            }
        };
        serde_json::from_value(value).with_context(|| format!("Parsing {func} response json"))
    }

    /// `None` means the access token was rejected.
    fn send<F>(&self, func: &str, build: &F) -> Result<Option<Value>>
    where
        F: Fn(RequestBuilder, &str) -> Result<RequestBuilder>,
    {
        let access_token = self
            .token()
            .map(|t| t.access_token)
            .ok_or_else(|| anyhow!("not logged in"))?;

        let url = format!("{}/oauth_test/resource.php", self.base_url);
        debug!("POST {url}?func={func}");
        let req = build(self.client.post(&url).query(&[("func", func)]), &access_token)?;
        let res = req
            .send()
            .with_context(|| format!("Failed to send {func} request"))?;

        if res.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        match parse_value(res, func) {
            Ok(value) => Ok(Some(value)),
            Err(err) if is_token_error(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl Remote for ApiClient {
    fn list_root(&self) -> Result<ListContents> {
        self.list_contents(None)
    }

    fn delete_folder(&self, id: &str) -> Result<()> {
        self.delete_item(ItemKind::Folder, id)
    }

    fn delete_file(&self, id: &str) -> Result<()> {
        self.delete_item(ItemKind::File, id)
    }

    fn delete_torrent(&self, id: &str) -> Result<()> {
        self.delete_item(ItemKind::Torrent, id)
    }
}

/// Entry of the `archive_arr` / `delete_arr` payloads.
#[derive(Serialize)]
struct ItemRef<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    id: &'a str,
}

fn item_array(kind: ItemKind, id: &str) -> Result<String> {
    let items = [ItemRef {
        kind: kind.as_str(),
        id,
    }];
    serde_json::to_string(&items).context("encode item array")
}

#[derive(Debug, thiserror::Error)]
#[error("{what} failed: {error}")]
struct ApiError {
    what: String,
    error: String,
}

fn is_token_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .is_some_and(|e| matches!(e.error.as_str(), "expired_token" | "invalid_token"))
}

/// Read a JSON body, turning HTTP failures, `{"error": ..}` bodies and
/// `{"result": false}` bodies into errors.
fn parse_value(res: Response, what: &str) -> Result<Value> {
    let status = res.status();
    let txt = res.text().unwrap_or_else(|_| "".into());
    if !status.is_success() {
        bail!("{what} failed: {status} - {txt}");
    }

    let value: Value =
        serde_json::from_str(&txt).with_context(|| format!("Parsing {what} response json"))?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(ApiError {
            what: what.to_string(),
            error: error.to_string(),
        }
        .into());
    }
    if value.get("result") == Some(&Value::Bool(false)) {
        bail!("{what} failed: {txt}");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    const RESOURCE: &str = "/oauth_test/resource.php";

    fn token(access: &str) -> Token {
        Token {
            access_token: access.into(),
            refresh_token: Some("r1".into()),
            device_code: None,
        }
    }

    fn client(server: &MockServer, dir: &TempDir) -> (ApiClient, TokenStore) {
        let cfg = Config::new(server.base_url(), dir.path().join("token.json")).unwrap();
        let store = TokenStore::new(cfg.token_file.clone());
        let api = ApiClient::new(&cfg).unwrap().with_token_store(store.clone());
        api.set_token(token("old"));
        (api, store)
    }

    fn refresh_mock(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(POST)
                .path("/oauth_test/token.php")
                .form_urlencoded_tuple("grant_type", "refresh_token")
                .form_urlencoded_tuple("refresh_token", "r1");
            then.status(200).json_body(json!({ "access_token": "new", "expires_in": 3600 }));
        })
    }

    #[test]
    fn unauthorized_refreshes_and_retries_once() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let (api, store) = client(&server, &dir);

        let rejected = server.mock(|when, then| {
            when.method(POST)
                .path(RESOURCE)
                .query_param("func", "list_contents")
                .form_urlencoded_tuple("access_token", "old");
            then.status(401);
        });
        let accepted = server.mock(|when, then| {
            when.method(POST)
                .path(RESOURCE)
                .query_param("func", "list_contents")
                .form_urlencoded_tuple("access_token", "new")
                .form_urlencoded_tuple("content_id", "0");
            then.status(200).json_body(json!({
                "folders": [{ "id": 1, "name": "Movies", "size": 10 }],
                "files": [],
                "torrents": []
            }));
        });
        let refresh = refresh_mock(&server);

        let contents = api.list_contents(None).unwrap();
        assert_eq!(contents.folders[0].name, "Movies");

        rejected.assert_hits(1);
        accepted.assert_hits(1);
        refresh.assert_hits(1);
        assert_eq!(store.load().unwrap(), Some(token("new")));
        assert_eq!(api.token(), Some(token("new")));
    }

    #[test]
    fn expired_token_body_is_retried_once() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let (api, _store) = client(&server, &dir);

        let expired = server.mock(|when, then| {
            when.method(POST)
                .path(RESOURCE)
                .query_param("func", "get_memory_bandwidth")
                .form_urlencoded_tuple("access_token", "old");
            then.status(200).json_body(json!({ "error": "expired_token" }));
        });
        let fresh = server.mock(|when, then| {
            when.method(POST)
                .path(RESOURCE)
                .query_param("func", "get_memory_bandwidth")
                .form_urlencoded_tuple("access_token", "new");
            then.status(200).json_body(json!({ "space_used": 512, "space_max": 2048 }));
        });
        let refresh = refresh_mock(&server);

        let usage = api.get_memory_bandwidth().unwrap();
        assert_eq!(usage.space_used, 512);
        expired.assert_hits(1);
        fresh.assert_hits(1);
        refresh.assert_hits(1);
    }

    #[test]
    fn gives_up_when_refreshed_token_is_rejected() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let (api, _store) = client(&server, &dir);

        let rejected = server.mock(|when, then| {
            when.method(POST).path(RESOURCE).query_param("func", "list_contents");
            then.status(200).json_body(json!({ "error": "invalid_token" }));
        });
        let refresh = refresh_mock(&server);

        let err = api.list_contents(None).unwrap_err();
        assert!(err.to_string().contains("rejected after refresh"), "{err:#}");
        rejected.assert_hits(2);
        refresh.assert_hits(1);
    }

    #[test]
    fn result_false_is_an_error() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let (api, _store) = client(&server, &dir);

        let delete = server.mock(|when, then| {
            when.method(POST).path(RESOURCE).query_param("func", "delete");
            then.status(200).json_body(json!({ "result": false }));
        });
        let refresh = refresh_mock(&server);

        assert!(api.delete_folder("99").is_err());
        delete.assert_hits(1);
        refresh.assert_hits(0);
    }

    #[test]
    fn error_body_is_an_error_without_refresh() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let (api, _store) = client(&server, &dir);

        let fetch = server.mock(|when, then| {
            when.method(POST)
                .path(RESOURCE)
                .query_param("func", "fetch_file")
                .form_urlencoded_tuple("folder_file_id", "5");
            then.status(200).json_body(json!({ "error": "file not found" }));
        });
        let refresh = refresh_mock(&server);

        let err = api.fetch_file("5").unwrap_err();
        assert_eq!(err.to_string(), "fetch_file failed: file not found");
        fetch.assert_hits(1);
        refresh.assert_hits(0);
    }

    #[test]
    fn delete_sends_typed_item_array() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let (api, _store) = client(&server, &dir);

        let delete = server.mock(|when, then| {
            when.method(POST)
                .path(RESOURCE)
                .query_param("func", "delete")
                .form_urlencoded_tuple("access_token", "old")
                .form_urlencoded_tuple("delete_arr", r#"[{"type":"file","id":"7"}]"#);
            then.status(200).json_body(json!({ "result": true }));
        });

        api.delete_file("7").unwrap();
        delete.assert_hits(1);
    }

    #[test]
    fn item_array_keeps_type_before_id() {
        assert_eq!(
            item_array(ItemKind::Torrent, "12").unwrap(),
            r#"[{"type":"torrent","id":"12"}]"#
        );
    }
}
