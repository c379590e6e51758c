//! PostgREST-style implementation of the gateway.

use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::api_types::{
  AuthUser, CancellationRequestRow, CategoryRow, ItemRow, NewOrderLineRow, NewOrderRow, OrderRow,
};
use super::{is_absolute_url, Gateway};
use crate::error::GatewayError;

const ORDER_COLUMNS: &str =
  "id,status,total_amount,shipping_address,payment_method,tracking_number,notes,created_at";

/// Gateway backed by the hosted backend's REST, storage and auth endpoints.
#[derive(Clone)]
pub struct RestGateway {
  client: reqwest::Client,
  base: Url,
  anon_key: String,
  access_token: Option<String>,
}

impl RestGateway {
  pub fn new(
    base_url: &str,
    anon_key: String,
    access_token: Option<String>,
    timeout: Duration,
  ) -> Result<Self, GatewayError> {
    // Url::join drops the last path segment unless the base ends in '/'
    let normalized = format!("{}/", base_url.trim_end_matches('/'));
    let base = Url::parse(&normalized)
      .map_err(|e| GatewayError::Http(format!("Invalid backend URL {}: {}", base_url, e)))?;

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| GatewayError::Http(format!("Failed to build HTTP client: {}", e)))?;

    Ok(Self {
      client,
      base,
      anon_key,
      access_token,
    })
  }

  /// Backend URL, used to namespace persisted snapshots.
  pub fn base_url(&self) -> &str {
    self.base.as_str()
  }

  fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
    self
      .base
      .join(path)
      .map_err(|e| GatewayError::Http(format!("Invalid endpoint {}: {}", path, e)))
  }

  fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, GatewayError> {
    let url = self.endpoint(path)?;
    let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);

    debug!(%method, %url, "gateway request");

    Ok(
      self
        .client
        .request(method, url)
        .header("apikey", &self.anon_key)
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer)),
    )
  }

  async fn select<T: DeserializeOwned>(
    &self,
    table: &str,
    query: &[(&str, &str)],
  ) -> Result<Vec<T>, GatewayError> {
    let response = self
      .request(Method::GET, &format!("rest/v1/{}", table))?
      .query(query)
      .send()
      .await?;

    let body = check_status(response).await?.text().await?;
    Ok(serde_json::from_str(&body)?)
  }

  async fn insert<B: Serialize + ?Sized>(&self, table: &str, body: &B) -> Result<(), GatewayError> {
    let response = self
      .request(Method::POST, &format!("rest/v1/{}", table))?
      .header("Prefer", "return=minimal")
      .json(body)
      .send()
      .await?;

    check_status(response).await?;
    Ok(())
  }

  async fn delete_by_id(&self, table: &str, id: &str) -> Result<(), GatewayError> {
    let filter = format!("eq.{}", id);
    let response = self
      .request(Method::DELETE, &format!("rest/v1/{}", table))?
      .query(&[("id", filter.as_str())])
      .send()
      .await?;

    check_status(response).await?;
    Ok(())
  }
}

/// Turn non-success responses into `GatewayError::Backend` with the body as message.
async fn check_status(response: Response) -> Result<Response, GatewayError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let message = response
    .text()
    .await
    .unwrap_or_else(|e| format!("<unreadable body: {}>", e));

  Err(GatewayError::Backend {
    status: status.as_u16(),
    message,
  })
}

impl Gateway for RestGateway {
  async fn list_categories(&self) -> Result<Vec<CategoryRow>, GatewayError> {
    self
      .select("categories", &[("select", "*"), ("order", "created_at.desc")])
      .await
  }

  async fn list_items(&self) -> Result<Vec<ItemRow>, GatewayError> {
    self
      .select("items", &[("select", "*"), ("order", "created_at.desc")])
      .await
  }

  async fn current_user(&self) -> Result<Option<AuthUser>, GatewayError> {
    if self.access_token.is_none() {
      return Ok(None);
    }

    let response = self.request(Method::GET, "auth/v1/user")?.send().await?;
    if matches!(
      response.status(),
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    ) {
      debug!("access token rejected by auth endpoint");
      return Ok(None);
    }

    let body = check_status(response).await?.text().await?;
    Ok(Some(serde_json::from_str(&body)?))
  }

  async fn list_orders(&self, user_id: &str) -> Result<Vec<OrderRow>, GatewayError> {
    let select = format!(
      "{},order_items(id,item_id,quantity,price_at_purchase)",
      ORDER_COLUMNS
    );
    let user_filter = format!("eq.{}", user_id);

    self
      .select(
        "orders",
        &[
          ("select", select.as_str()),
          ("user_id", user_filter.as_str()),
          ("order", "created_at.desc"),
        ],
      )
      .await
  }

  async fn get_order(&self, id: &str) -> Result<OrderRow, GatewayError> {
    let select = format!(
      "{},order_items(id,item_id,quantity,price_at_purchase,items(*))",
      ORDER_COLUMNS
    );
    let id_filter = format!("eq.{}", id);

    let rows: Vec<OrderRow> = self
      .select(
        "orders",
        &[("select", select.as_str()), ("id", id_filter.as_str())],
      )
      .await?;

    rows.into_iter().next().ok_or_else(|| GatewayError::NotFound {
      entity: "order",
      id: id.to_string(),
    })
  }

  async fn create_order(&self, order: &NewOrderRow) -> Result<(), GatewayError> {
    self.insert("orders", order).await
  }

  async fn create_order_lines(&self, lines: &[NewOrderLineRow]) -> Result<(), GatewayError> {
    self.insert("order_items", lines).await
  }

  async fn update_order_status(&self, id: &str, status: &str) -> Result<(), GatewayError> {
    let id_filter = format!("eq.{}", id);
    let response = self
      .request(Method::PATCH, "rest/v1/orders")?
      .query(&[("id", id_filter.as_str())])
      .header("Prefer", "return=minimal")
      .json(&serde_json::json!({ "status": status }))
      .send()
      .await?;

    check_status(response).await?;
    Ok(())
  }

  async fn insert_cancellation_request(
    &self,
    request: &CancellationRequestRow,
  ) -> Result<(), GatewayError> {
    self.insert("order_change_requests", request).await
  }

  async fn delete_order(&self, id: &str) -> Result<(), GatewayError> {
    self.delete_by_id("orders", id).await
  }

  async fn delete_cancellation_request(&self, id: &str) -> Result<(), GatewayError> {
    self.delete_by_id("order_change_requests", id).await
  }

  fn resolve_storage_url(&self, bucket: &str, path: &str) -> String {
    if is_absolute_url(path) {
      return path.to_string();
    }

    format!(
      "{}storage/v1/object/public/{}/{}",
      self.base,
      bucket,
      path.trim_start_matches('/')
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gateway(url: &str) -> RestGateway {
    RestGateway::new(url, "anon".to_string(), None, Duration::from_secs(5)).unwrap()
  }

  #[test]
  fn test_storage_url_for_bare_path() {
    let gw = gateway("https://demo.supabase.co");
    assert_eq!(
      gw.resolve_storage_url("categories", "cakes.png"),
      "https://demo.supabase.co/storage/v1/object/public/categories/cakes.png"
    );
  }

  #[test]
  fn test_storage_url_passes_absolute_urls_through() {
    let gw = gateway("https://demo.supabase.co/");
    assert_eq!(
      gw.resolve_storage_url("items", "https://cdn.example.com/a.jpg"),
      "https://cdn.example.com/a.jpg"
    );
  }

  #[test]
  fn test_endpoint_keeps_base_path() {
    let gw = gateway("https://demo.example.com/backend");
    assert_eq!(
      gw.endpoint("rest/v1/items").unwrap().as_str(),
      "https://demo.example.com/backend/rest/v1/items"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    let result = RestGateway::new("not a url", "anon".to_string(), None, Duration::from_secs(5));
    assert!(matches!(result, Err(GatewayError::Http(_))));
  }

  #[tokio::test]
  async fn test_no_access_token_means_no_user() {
    let gw = gateway("https://demo.supabase.co");
    assert_eq!(gw.current_user().await.unwrap(), None);
  }
}
