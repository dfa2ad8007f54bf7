//! REST client for the catalog API.
//!
//! Endpoints, relative to the configured base URL:
//!
//! ```text
//! GET  /workspaces/{ws}/collections/{id}/tables
//! GET  /workspaces/{ws}/collections/{id}/shortcuts?schema={schema}
//! POST /workspaces/{ws}/collections/{id}/shortcuts
//! ```
//!
//! Both listings are paged with `continuationToken`. This client makes one
//! attempt per request; wrap it in [`RetryingCatalog`](super::RetryingCatalog)
//! for the retry policy.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CatalogApi, CatalogError, ShortcutDescriptor, TableDescriptor};

/// Connection settings for [`HttpCatalog`].
#[derive(Clone)]
pub struct HttpCatalogConfig {
  pub base_url: String,

  /// Opaque bearer token. Attached to every request, never inspected.
  pub token: String,

  pub timeout: Duration,
}

impl fmt::Debug for HttpCatalogConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HttpCatalogConfig")
      .field("base_url", &self.base_url)
      .field("token", &"<redacted>")
      .field("timeout", &self.timeout)
      .finish()
  }
}

/// Catalog backed by the platform's REST API.
#[derive(Clone)]
pub struct HttpCatalog {
  client: Client,
  base_url: Url,
  token: String,
}

impl fmt::Debug for HttpCatalog {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HttpCatalog").field("base_url", &self.base_url.as_str()).finish_non_exhaustive()
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
  #[serde(default = "Vec::new")]
  data: Vec<T>,
  #[serde(default)]
  continuation_token: Option<String>,
}

#[derive(Deserialize)]
struct TableEntry {
  name: String,
  #[serde(default)]
  schema: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortcutTarget {
  workspace_id: String,
  collection_id: String,
  table_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ShortcutEntry {
  name: String,
  schema: String,
  target: ShortcutTarget,
}

impl HttpCatalog {
  pub fn new(config: HttpCatalogConfig) -> Result<Self, CatalogError> {
    let client = Client::builder()
      .timeout(config.timeout)
      .user_agent(concat!("lakesync/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| CatalogError::Unknown {
        status: None,
        message: format!("failed to build HTTP client: {e}"),
      })?;

    let base_url = Url::parse(&config.base_url).map_err(|e| CatalogError::Unknown {
      status: None,
      message: format!("invalid base URL '{}': {e}", config.base_url),
    })?;
    if base_url.cannot_be_a_base() {
      return Err(CatalogError::Unknown {
        status: None,
        message: format!("invalid base URL '{}': not a hierarchical URL", config.base_url),
      });
    }

    Ok(Self {
      client,
      base_url,
      token: config.token,
    })
  }

  /// `{base}/workspaces/{ws}/collections/{id}/{resource}`, with each id
  /// percent-encoded as a single path segment.
  fn endpoint(&self, workspace_id: &str, collection_id: &str, resource: &str) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments
        .pop_if_empty()
        .extend(["workspaces", workspace_id, "collections", collection_id, resource]);
    }
    url
  }

  /// Fetch every page of a listing.
  ///
  /// A continuation token the server has already handed out ends the listing
  /// with an error instead of paging forever.
  async fn get_all<T: DeserializeOwned>(&self, url: &Url, query: &[(&str, &str)]) -> Result<Vec<T>, CatalogError> {
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    let mut seen = HashSet::new();

    loop {
      let mut request = self.client.get(url.clone()).query(query);
      if let Some(ref t) = token {
        request = request.query(&[("continuationToken", t.as_str())]);
      }

      debug!(url = %url, page_token = ?token, "GET");
      let page: Page<T> = decode(send(request.bearer_auth(&self.token)).await?).await?;
      items.extend(page.data);

      match page.continuation_token {
        Some(next) if !next.is_empty() => {
          if !seen.insert(next.clone()) {
            return Err(CatalogError::Unknown {
              status: None,
              message: format!("listing at {url} repeated continuation token '{next}'"),
            });
          }
          token = Some(next);
        }
        _ => break,
      }
    }

    Ok(items)
  }
}

impl CatalogApi for HttpCatalog {
  async fn list_source_tables(&self, workspace_id: &str, collection_id: &str) -> Result<Vec<TableDescriptor>, CatalogError> {
    let url = self.endpoint(workspace_id, collection_id, "tables");
    let entries: Vec<TableEntry> = self.get_all(&url, &[]).await?;

    Ok(
      entries
        .into_iter()
        .map(|entry| TableDescriptor {
          name: entry.name,
          parent_schema: entry.schema,
          collection_id: collection_id.to_string(),
        })
        .collect(),
    )
  }

  async fn list_existing_shortcuts(
    &self,
    workspace_id: &str,
    collection_id: &str,
    schema: &str,
  ) -> Result<Vec<ShortcutDescriptor>, CatalogError> {
    let url = self.endpoint(workspace_id, collection_id, "shortcuts");
    let entries: Vec<ShortcutEntry> = match self.get_all(&url, &[("schema", schema)]).await {
      Ok(entries) => entries,
      Err(err) if err.is_schema_not_found() => {
        debug!(schema, "schema does not exist yet");
        return Ok(Vec::new());
      }
      Err(err) => return Err(err),
    };

    Ok(
      entries
        .into_iter()
        .filter(|entry| entry.schema == schema)
        .map(|entry| ShortcutDescriptor {
          name: entry.name,
          target_schema: entry.schema,
          target_workspace_id: workspace_id.to_string(),
          target_collection_id: collection_id.to_string(),
          source_workspace_id: entry.target.workspace_id,
          source_collection_id: entry.target.collection_id,
          source_table_name: entry.target.table_name,
        })
        .collect(),
    )
  }

  async fn create_shortcut(&self, shortcut: &ShortcutDescriptor) -> Result<(), CatalogError> {
    let url = self.endpoint(&shortcut.target_workspace_id, &shortcut.target_collection_id, "shortcuts");
    let body = ShortcutEntry {
      name: shortcut.name.clone(),
      schema: shortcut.target_schema.clone(),
      target: ShortcutTarget {
        workspace_id: shortcut.source_workspace_id.clone(),
        collection_id: shortcut.source_collection_id.clone(),
        table_name: shortcut.source_table_name.clone(),
      },
    };

    debug!(url = %url, shortcut = %shortcut.key(), "POST");
    send(self.client.post(url).bearer_auth(&self.token).json(&body)).await?;
    Ok(())
  }
}

/// Send a request and turn any non-success status into a classified error.
async fn send(request: RequestBuilder) -> Result<Response, CatalogError> {
  let response = request.send().await.map_err(|e| {
    if e.is_builder() {
      CatalogError::Unknown {
        status: None,
        message: e.to_string(),
      }
    } else {
      CatalogError::network(e.to_string())
    }
  })?;

  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let retry_after = response
    .headers()
    .get(RETRY_AFTER)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.trim().parse::<u64>().ok())
    .map(Duration::from_secs);
  let body = response.text().await.unwrap_or_default();

  debug!(status = status.as_u16(), "catalog request failed");
  Err(CatalogError::from_response(status.as_u16(), &body, retry_after))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, CatalogError> {
  let status = response.status().as_u16();
  response.json::<T>().await.map_err(|e| CatalogError::Unknown {
    status: Some(status),
    message: format!("malformed response body: {e}"),
  })
}
