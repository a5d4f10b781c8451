//! # Background Notices
//!
//! Fire-and-forget notifications about things that happened: a user registered, an order was
//! created, an order changed status. The [`EventActor`] consumes them in its own task and logs each
//! one; nothing waits for it.
//!
//! The actor stops when every client is dropped or when its stop signal turns `true`. Notices
//! already queued at that point are still logged.
//!
//! [`EventClient::notify`] never blocks and never fails the caller. When the queue is full or the
//! actor is gone the notice is dropped and a `warn!` is emitted.

use crate::model::{OrderId, OrderStatus, ProductId, UserId};
use tokio::sync::{mpsc, watch};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    UserRegistered {
        user_id: UserId,
        email: String,
    },
    OrderCreated {
        order_id: OrderId,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    },
    OrderStatusUpdated {
        order_id: OrderId,
        status: OrderStatus,
    },
}

pub struct EventActor {
    receiver: mpsc::Receiver<Notice>,
}

impl EventActor {
    pub fn new(buffer_size: usize) -> (Self, EventClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (Self { receiver }, EventClient { sender })
    }

    /// Logs notices until every client is dropped or `stop` turns `true`. Returns how many were
    /// handled.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> usize {
        info!("Event log started");
        let mut handled = 0;
        let mut stopping = false;

        loop {
            tokio::select! {
                notice = self.receiver.recv() => match notice {
                    Some(notice) => {
                        handled += 1;
                        log_notice(notice);
                    }
                    None => break,
                },
                Ok(()) = stop.changed(), if !stopping => {
                    let stop_now = *stop.borrow_and_update();
                    if stop_now {
                        stopping = true;
                        self.receiver.close();
                    }
                }
            }
        }

        info!(handled, "Event log shutdown");
        handled
    }
}

fn log_notice(notice: Notice) {
    match notice {
        Notice::UserRegistered { user_id, email } => {
            info!(%user_id, %email, "User registered");
        }
        Notice::OrderCreated {
            order_id,
            user_id,
            product_id,
            quantity,
        } => {
            info!(%order_id, %user_id, %product_id, quantity, "Order created");
        }
        Notice::OrderStatusUpdated { order_id, status } => {
            info!(%order_id, %status, "Order status updated");
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventClient {
    sender: mpsc::Sender<Notice>,
}

impl EventClient {
    /// Queues a notice without waiting. Returns whether it was accepted.
    pub fn notify(&self, notice: Notice) -> bool {
        match self.sender.try_send(notice) {
            Ok(()) => true,
            Err(TrySendError::Full(notice)) => {
                warn!(?notice, "Event queue full, notice dropped");
                false
            }
            Err(TrySendError::Closed(notice)) => {
                warn!(?notice, "Event log closed, notice dropped");
                false
            }
        }
    }
}
