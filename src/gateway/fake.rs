//! In-memory gateway for store tests: records calls, stores writes, and
//! fails on demand.

use std::collections::HashSet;
use std::sync::Mutex;

use super::api_types::{
  AuthUser, CancellationRequestRow, CategoryRow, ItemRow, NewOrderLineRow, NewOrderRow, OrderRow,
  OrderLineRow,
};
use super::{is_absolute_url, Gateway};
use crate::error::GatewayError;

pub const USER_ID: &str = "user-1";

/// Operations that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
  ListCategories,
  ListItems,
  ListOrders,
  GetOrder,
  CreateOrder,
  CreateOrderLines,
  UpdateOrderStatus,
  InsertCancellationRequest,
  DeleteOrder,
  DeleteCancellationRequest,
}

#[derive(Default)]
struct State {
  user: Option<AuthUser>,
  categories: Vec<CategoryRow>,
  items: Vec<ItemRow>,
  orders: Vec<(String, OrderRow)>,
  cancellation_requests: Vec<CancellationRequestRow>,
  failing: HashSet<Op>,
  calls: Vec<Op>,
}

#[derive(Default)]
pub struct FakeGateway {
  state: Mutex<State>,
}

impl FakeGateway {
  /// A gateway with a signed-in user and an empty catalog.
  pub fn signed_in() -> Self {
    let gateway = Self::default();
    gateway.state().user = Some(AuthUser {
      id: USER_ID.to_string(),
      email: Some("shopper@example.com".to_string()),
    });
    gateway
  }

  fn state(&self) -> std::sync::MutexGuard<'_, State> {
    self.state.lock().unwrap()
  }

  pub fn set_catalog(&self, categories: Vec<CategoryRow>, items: Vec<ItemRow>) {
    let mut state = self.state();
    state.categories = categories;
    state.items = items;
  }

  pub fn insert_order(&self, user_id: &str, order: OrderRow) {
    self.state().orders.push((user_id.to_string(), order));
  }

  pub fn fail(&self, op: Op) {
    self.state().failing.insert(op);
  }

  pub fn recover(&self, op: Op) {
    self.state().failing.remove(&op);
  }

  pub fn calls(&self, op: Op) -> usize {
    self.state().calls.iter().filter(|c| **c == op).count()
  }

  pub fn total_calls(&self) -> usize {
    self.state().calls.len()
  }

  pub fn has_order(&self, id: &str) -> bool {
    self.state().orders.iter().any(|(_, o)| o.id == id)
  }

  pub fn order_status(&self, id: &str) -> Option<String> {
    self
      .state()
      .orders
      .iter()
      .find(|(_, o)| o.id == id)
      .map(|(_, o)| o.status.clone())
  }

  pub fn cancellation_requests(&self) -> Vec<CancellationRequestRow> {
    self.state().cancellation_requests.clone()
  }

  /// Record the call and return the injected failure, if any.
  fn enter(&self, op: Op) -> Result<(), GatewayError> {
    let mut state = self.state();
    state.calls.push(op);
    if state.failing.contains(&op) {
      return Err(GatewayError::Backend {
        status: 503,
        message: format!("{:?} unavailable", op),
      });
    }
    Ok(())
  }
}

impl Gateway for FakeGateway {
  async fn list_categories(&self) -> Result<Vec<CategoryRow>, GatewayError> {
    tokio::task::yield_now().await;
    self.enter(Op::ListCategories)?;
    Ok(self.state().categories.clone())
  }

  async fn list_items(&self) -> Result<Vec<ItemRow>, GatewayError> {
    tokio::task::yield_now().await;
    self.enter(Op::ListItems)?;
    Ok(self.state().items.clone())
  }

  async fn current_user(&self) -> Result<Option<AuthUser>, GatewayError> {
    Ok(self.state().user.clone())
  }

  async fn list_orders(&self, user_id: &str) -> Result<Vec<OrderRow>, GatewayError> {
    tokio::task::yield_now().await;
    self.enter(Op::ListOrders)?;
    let state = self.state();
    let mut orders: Vec<OrderRow> = state
      .orders
      .iter()
      .filter(|(owner, _)| owner == user_id)
      .map(|(_, o)| {
        let mut summary = o.clone();
        for line in &mut summary.order_items {
          line.items = None;
        }
        summary
      })
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  async fn get_order(&self, id: &str) -> Result<OrderRow, GatewayError> {
    self.enter(Op::GetOrder)?;
    let state = self.state();
    let mut order = state
      .orders
      .iter()
      .find(|(_, o)| o.id == id)
      .map(|(_, o)| o.clone())
      .ok_or_else(|| GatewayError::NotFound {
        entity: "order",
        id: id.to_string(),
      })?;

    for line in &mut order.order_items {
      line.items = state.items.iter().find(|i| i.id == line.item_id).cloned();
    }
    Ok(order)
  }

  async fn create_order(&self, order: &NewOrderRow) -> Result<(), GatewayError> {
    self.enter(Op::CreateOrder)?;
    let row = OrderRow {
      id: order.id.clone(),
      status: order.status.clone(),
      total_amount: order.total_amount,
      shipping_address: Some(order.shipping_address.clone()),
      payment_method: Some(order.payment_method.clone()),
      tracking_number: None,
      notes: order.notes.clone(),
      created_at: chrono::Utc::now(),
      order_items: Vec::new(),
    };
    self.state().orders.push((order.user_id.clone(), row));
    Ok(())
  }

  async fn create_order_lines(&self, lines: &[NewOrderLineRow]) -> Result<(), GatewayError> {
    self.enter(Op::CreateOrderLines)?;
    let mut state = self.state();
    for line in lines {
      if let Some((_, order)) = state.orders.iter_mut().find(|(_, o)| o.id == line.order_id) {
        order.order_items.push(OrderLineRow {
          id: Some(line.id.clone()),
          item_id: line.item_id,
          quantity: line.quantity,
          price_at_purchase: line.price_at_purchase,
          items: None,
        });
      }
    }
    Ok(())
  }

  async fn update_order_status(&self, id: &str, status: &str) -> Result<(), GatewayError> {
    self.enter(Op::UpdateOrderStatus)?;
    if let Some((_, order)) = self.state().orders.iter_mut().find(|(_, o)| o.id == id) {
      order.status = status.to_string();
    }
    Ok(())
  }

  async fn insert_cancellation_request(
    &self,
    request: &CancellationRequestRow,
  ) -> Result<(), GatewayError> {
    self.enter(Op::InsertCancellationRequest)?;
    self.state().cancellation_requests.push(request.clone());
    Ok(())
  }

  async fn delete_order(&self, id: &str) -> Result<(), GatewayError> {
    self.enter(Op::DeleteOrder)?;
    self.state().orders.retain(|(_, o)| o.id != id);
    Ok(())
  }

  async fn delete_cancellation_request(&self, id: &str) -> Result<(), GatewayError> {
    self.enter(Op::DeleteCancellationRequest)?;
    self.state().cancellation_requests.retain(|r| r.id != id);
    Ok(())
  }

  fn resolve_storage_url(&self, bucket: &str, path: &str) -> String {
    if is_absolute_url(path) {
      return path.to_string();
    }
    format!("https://cdn.test/{}/{}", bucket, path)
  }
}
