//! Order lifecycle store: the signed-in user's orders, plus create, status
//! update and cancellation against the gateway.

mod normalize;
mod types;

pub use normalize::{display_date, format_currency, item_count_label, order_from_row, order_slug};
pub use types::{NewOrder, NewOrderLine, Order, OrderLine, OrderStatus, UnknownStatus};

use chrono::Local;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{GatewayError, StoreError};
use crate::gateway::api_types::{AuthUser, CancellationRequestRow, NewOrderLineRow, NewOrderRow};
use crate::gateway::Gateway;
use crate::loading::LoadingGuard;
use normalize::summarize;

pub const FETCH_ORDERS_FAILED: &str = "Failed to fetch orders";
pub const FETCH_ORDER_FAILED: &str = "Failed to fetch order details";
pub const UPDATE_STATUS_FAILED: &str = "Failed to update order status";
pub const CANCEL_ORDER_FAILED: &str = "Failed to cancel order";

#[derive(Debug, Clone, Default)]
pub struct OrderState {
  /// Newest first, as returned by the backend
  pub orders: Vec<Order>,
  pub is_loading: bool,
  pub error: Option<String>,
}

impl OrderState {
  pub fn order(&self, id: &str) -> Option<&Order> {
    self.orders.iter().find(|order| order.id == id)
  }

  fn set_status(&mut self, id: &str, status: OrderStatus) {
    for order in self.orders.iter_mut().filter(|order| order.id == id) {
      order.status = status;
    }
  }
}

/// The current user's orders, kept in step with confirmed remote writes.
pub struct OrderStore<G: Gateway> {
  gateway: Arc<G>,
  placeholder_image: String,
  state: watch::Sender<OrderState>,
}

impl<G: Gateway> OrderStore<G> {
  pub fn new(gateway: Arc<G>, placeholder_image: impl Into<String>) -> Self {
    let (state, _) = watch::channel(OrderState::default());
    Self {
      gateway,
      placeholder_image: placeholder_image.into(),
      state,
    }
  }

  pub fn state(&self) -> OrderState {
    self.state.borrow().clone()
  }

  pub fn subscribe(&self) -> watch::Receiver<OrderState> {
    self.state.subscribe()
  }

  pub fn orders(&self) -> Vec<Order> {
    self.state.borrow().orders.clone()
  }

  pub fn is_loading(&self) -> bool {
    self.state.borrow().is_loading
  }

  pub fn error(&self) -> Option<String> {
    self.state.borrow().error.clone()
  }

  /// Mark an operation in flight until it finishes or is dropped.
  fn begin(&self) -> LoadingGuard<'_, OrderState> {
    LoadingGuard::start(&self.state, loading_flag, |state| state.error = None)
  }

  fn finish(&self) {
    self.state.send_modify(|state| state.is_loading = false);
  }

  fn fail(&self, message: impl Into<String>) {
    let message = message.into();
    self.state.send_modify(|state| {
      state.error = Some(message);
      state.is_loading = false;
    });
  }

  async fn require_user(&self) -> Result<AuthUser, StoreError> {
    self
      .gateway
      .current_user()
      .await?
      .ok_or(StoreError::AuthRequired)
  }

  /// Load the user's orders, replacing the local list.
  ///
  /// Orders carry summary fields only; use [`get_order_by_id`] for lines.
  /// On failure the previous list is kept.
  ///
  /// [`get_order_by_id`]: Self::get_order_by_id
  pub async fn fetch_orders(&self) -> Result<(), StoreError> {
    let _loading = self.begin();
    match self.load_orders().await {
      Ok(orders) => {
        info!(count = orders.len(), "orders fetched");
        self.state.send_modify(|state| {
          state.orders = orders;
          state.is_loading = false;
        });
        Ok(())
      }
      Err(e) => {
        warn!(error = %e, "failed to fetch orders");
        self.fail(FETCH_ORDERS_FAILED);
        Err(e)
      }
    }
  }

  async fn load_orders(&self) -> Result<Vec<Order>, StoreError> {
    let user = self.require_user().await?;
    let rows = self.gateway.list_orders(&user.id).await?;

    let orders = rows
      .into_iter()
      .filter_map(|row| {
        let id = row.id.clone();
        match order_from_row(self.gateway.as_ref(), row, &self.placeholder_image, &Local) {
          Ok(order) => Some(summarize(order)),
          Err(e) => {
            warn!(order_id = %id, error = %e, "skipping order");
            None
          }
        }
      })
      .collect();

    Ok(orders)
  }

  /// Fetch one order with its lines and joined items.
  ///
  /// Returns `None` when the order does not exist or the fetch fails; the
  /// reason is left in the store's error. The local order list is not
  /// touched.
  pub async fn get_order_by_id(&self, id: &str) -> Option<Order> {
    let _loading = self.begin();
    match self.load_order(id).await {
      Ok(order) => {
        self.finish();
        Some(order)
      }
      Err(e) => {
        warn!(order_id = %id, error = %e, "failed to fetch order");
        self.fail(FETCH_ORDER_FAILED);
        None
      }
    }
  }

  async fn load_order(&self, id: &str) -> Result<Order, StoreError> {
    self.require_user().await?;
    let row = self.gateway.get_order(id).await?;
    order_from_row(self.gateway.as_ref(), row, &self.placeholder_image, &Local)
      .map_err(|e| GatewayError::Decode(e.to_string()).into())
  }

  /// Write a new order and its lines, returning the generated order id.
  ///
  /// If the lines cannot be written the order header is deleted again. When
  /// that delete fails too the error is [`StoreError::PartialWrite`] and the
  /// header is left behind on the backend. The local order list is not
  /// updated; call [`fetch_orders`](Self::fetch_orders) to see the new order.
  pub async fn create_order(&self, new_order: NewOrder) -> Result<String, StoreError> {
    let _loading = self.begin();
    match self.write_order(new_order).await {
      Ok(order_id) => {
        info!(order_id = %order_id, "order created");
        self.finish();
        Ok(order_id)
      }
      Err(e) => {
        warn!(error = %e, "failed to create order");
        self.fail(e.to_string());
        Err(e)
      }
    }
  }

  async fn write_order(&self, new_order: NewOrder) -> Result<String, StoreError> {
    let user = self.require_user().await?;
    let order_id = Uuid::new_v4().to_string();

    let header = NewOrderRow {
      id: order_id.clone(),
      user_id: user.id,
      status: new_order.status.as_str().to_string(),
      total_amount: new_order.total_amount,
      shipping_address: new_order.shipping_address,
      payment_method: new_order.payment_method,
      notes: new_order.notes.filter(|n| !n.trim().is_empty()),
    };
    self.gateway.create_order(&header).await?;

    let lines: Vec<NewOrderLineRow> = new_order
      .items
      .into_iter()
      .map(|line| NewOrderLineRow {
        id: Uuid::new_v4().to_string(),
        order_id: order_id.clone(),
        item_id: line.item_id,
        quantity: line.quantity,
        price_at_purchase: line.price_at_purchase,
      })
      .collect();

    if let Err(e) = self.gateway.create_order_lines(&lines).await {
      warn!(order_id = %order_id, error = %e, "order lines failed, removing order header");
      return match self.gateway.delete_order(&order_id).await {
        Ok(()) => Err(e.into()),
        Err(rollback) => {
          error!(order_id = %order_id, error = %rollback, "failed to remove orphaned order header");
          Err(StoreError::PartialWrite {
            order_id,
            step: "writing order lines",
            source: e,
          })
        }
      };
    }

    Ok(order_id)
  }

  /// Set an order's status remotely, then patch the local copy.
  pub async fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<(), StoreError> {
    let _loading = self.begin();
    let result = async {
      self.require_user().await?;
      self
        .gateway
        .update_order_status(id, status.as_str())
        .await?;
      Ok::<_, StoreError>(())
    }
    .await;

    match result {
      Ok(()) => {
        info!(order_id = %id, %status, "order status updated");
        self.state.send_modify(|state| {
          state.set_status(id, status);
          state.is_loading = false;
        });
        Ok(())
      }
      Err(e) => {
        warn!(order_id = %id, error = %e, "failed to update order status");
        self.fail(UPDATE_STATUS_FAILED);
        Err(e)
      }
    }
  }

  /// Record a cancellation request and mark the order cancelled.
  ///
  /// `reason` must contain something other than whitespace. If the status
  /// update fails the cancellation request is deleted again; if that fails
  /// too the error is [`StoreError::PartialWrite`].
  pub async fn cancel_order(&self, id: &str, reason: &str) -> Result<(), StoreError> {
    let reason = reason.trim();
    if reason.is_empty() {
      warn!(order_id = %id, "cancellation reason is empty");
      self
        .state
        .send_modify(|state| state.error = Some(CANCEL_ORDER_FAILED.to_string()));
      return Err(StoreError::EmptyReason);
    }

    let _loading = self.begin();
    match self.write_cancellation(id, reason).await {
      Ok(()) => {
        info!(order_id = %id, "order cancelled");
        self.state.send_modify(|state| {
          state.set_status(id, OrderStatus::Cancelled);
          state.is_loading = false;
        });
        Ok(())
      }
      Err(e) => {
        warn!(order_id = %id, error = %e, "failed to cancel order");
        self.fail(CANCEL_ORDER_FAILED);
        Err(e)
      }
    }
  }

  async fn write_cancellation(&self, id: &str, reason: &str) -> Result<(), StoreError> {
    self.require_user().await?;

    let request = CancellationRequestRow {
      id: Uuid::new_v4().to_string(),
      order_id: id.to_string(),
      request_type: "cancel".to_string(),
      details: reason.to_string(),
      status: "pending".to_string(),
    };
    self.gateway.insert_cancellation_request(&request).await?;

    if let Err(e) = self
      .gateway
      .update_order_status(id, OrderStatus::Cancelled.as_str())
      .await
    {
      warn!(order_id = %id, error = %e, "status update failed, removing cancellation request");
      return match self.gateway.delete_cancellation_request(&request.id).await {
        Ok(()) => Err(e.into()),
        Err(rollback) => {
          error!(order_id = %id, error = %rollback, "failed to remove cancellation request");
          Err(StoreError::PartialWrite {
            order_id: id.to_string(),
            step: "updating order status",
            source: e,
          })
        }
      };
    }

    Ok(())
  }
}

fn loading_flag(state: &mut OrderState) -> &mut bool {
  &mut state.is_loading
}
