//! Payment service: applies Razorpay payment outcomes to orders.

use std::sync::Arc;

use chrono::Utc;

use super::HandlerResult;
use crate::domain::{Order, Payment, PaymentOutcome, PaymentRecordStatus};
use crate::error::GatewayError;
use crate::persistence::Store;
use crate::webhook::razorpay::RazorpayPayload;

/// Handlers for `payment.captured`, `payment.failed` and `order.paid`.
///
/// Every handler follows the pattern: resolve order ID → load order →
/// settle (pending only) → compare-and-set in the store → record payment →
/// update customer totals.
#[derive(Debug, Clone)]
pub struct PaymentService {
    store: Arc<dyn Store>,
}

impl PaymentService {
    /// Creates a new `PaymentService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// `payment.captured`: marks the order paid and confirmed.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] only on persistence failure.
    pub async fn payment_captured(
        &self,
        payload: &RazorpayPayload,
    ) -> Result<HandlerResult, GatewayError> {
        self.apply(payload.order_ref_from_payment(), payload, captured(payload))
            .await
    }

    /// `order.paid`: same transition as a capture, keyed on the order entity.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] only on persistence failure.
    pub async fn order_paid(&self, payload: &RazorpayPayload) -> Result<HandlerResult, GatewayError> {
        self.apply(payload.order_ref_from_order(), payload, captured(payload))
            .await
    }

    /// `payment.failed`: marks the order failed and cancelled.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] only on persistence failure.
    pub async fn payment_failed(
        &self,
        payload: &RazorpayPayload,
    ) -> Result<HandlerResult, GatewayError> {
        let outcome = PaymentOutcome::Failed {
            payment_id: payload.payment_id(),
            reason: payload.failure_reason(),
        };
        self.apply(payload.order_ref_from_payment(), payload, outcome)
            .await
    }

    async fn apply(
        &self,
        order_ref: Option<String>,
        payload: &RazorpayPayload,
        outcome: PaymentOutcome,
    ) -> Result<HandlerResult, GatewayError> {
        let Some(order_id) = order_ref else {
            tracing::warn!("payment webhook carries no order id; dropping");
            return Ok(HandlerResult::failed("order id missing from payment notes"));
        };

        let Some(mut order) = self.store.get_order(&order_id).await? else {
            tracing::warn!(%order_id, "payment webhook references unknown order; dropping");
            return Ok(HandlerResult::failed(format!("order {order_id} not found")));
        };

        let settled_now = match order.settle(&outcome, Utc::now()) {
            Ok(()) => {
                if !self.store.settle_order(&order).await? {
                    tracing::info!(%order_id, "order settled concurrently by another delivery; ignoring");
                    return Ok(HandlerResult::ok());
                }
                tracing::info!(
                    %order_id,
                    payment_status = %order.payment_status,
                    status = %order.status,
                    "order settled"
                );
                true
            }
            Err(_) if order.is_settled_by(&outcome) => {
                tracing::info!(%order_id, "order already settled by this payment; completing records");
                false
            }
            Err(e) => {
                tracing::info!(%order_id, status = %order.payment_status, error = %e, "order already settled; ignoring");
                return Ok(HandlerResult::ok());
            }
        };

        self.record(&order, payload, &outcome, settled_now).await?;
        Ok(HandlerResult::ok())
    }

    /// Stores the payment row and, for a newly stored capture, the customer
    /// totals. Safe to repeat: totals move only when the payment row is new.
    async fn record(
        &self,
        order: &Order,
        payload: &RazorpayPayload,
        outcome: &PaymentOutcome,
        settled_now: bool,
    ) -> Result<(), GatewayError> {
        let newly_recorded = self
            .record_payment(order, payload, outcome)
            .await?
            .unwrap_or(settled_now);
        if !newly_recorded {
            return Ok(());
        }

        if matches!(outcome, PaymentOutcome::Captured { .. })
            && let Some(customer_id) = order.customer_id
        {
            let amount = payload.amount().unwrap_or(order.amount);
            match self.store.record_customer_order(customer_id, amount).await {
                Ok(()) => {}
                Err(GatewayError::CustomerNotFound(_)) => {
                    tracing::warn!(order_id = %order.id, %customer_id, "order customer not found; totals not updated");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Returns `None` when the delivery names no payment, otherwise whether
    /// the payment row was newly stored.
    async fn record_payment(
        &self,
        order: &Order,
        payload: &RazorpayPayload,
        outcome: &PaymentOutcome,
    ) -> Result<Option<bool>, GatewayError> {
        let Some(payment_id) = payload.payment_id() else {
            return Ok(None);
        };
        let (status, failure_reason) = match outcome {
            PaymentOutcome::Captured { .. } => (PaymentRecordStatus::Captured, None),
            PaymentOutcome::Failed { reason, .. } => {
                (PaymentRecordStatus::Failed, Some(reason.clone()))
            }
        };
        let payment = Payment {
            id: payment_id,
            order_id: order.id.clone(),
            amount: payload.amount().unwrap_or(order.amount),
            currency: payload.currency().unwrap_or_else(|| order.currency.clone()),
            status,
            method: payload.method(),
            failure_reason,
            created_at: Utc::now(),
        };
        self.store.insert_payment(&payment).await.map(Some)
    }
}

fn captured(payload: &RazorpayPayload) -> PaymentOutcome {
    PaymentOutcome::Captured {
        payment_id: payload.payment_id(),
        provider_order_id: payload.provider_order_id(),
    }
}
