//! Fire-and-forget order-confirmation mail. The mailer subscribes to the engine's order-created events; a failed
//! send is logged and nothing else — reconciliation never waits on it.

use log::{error, info};
use storefront_engine::events::{EventHandlers, EventHooks};
use thiserror::Error;

pub const MAILER_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("The recipient address is empty.")]
    NoRecipient,
}

/// Dispatches confirmation mail. The transport is a log line; swapping in a real SMTP/API transport only touches
/// this struct.
#[derive(Clone, Default)]
pub struct Mailer {
    from: String,
}

impl Mailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }

    pub async fn send_order_confirmation(
        &self,
        recipient: &str,
        order_id: &str,
        total: &str,
    ) -> Result<(), MailerError> {
        if recipient.is_empty() {
            return Err(MailerError::NoRecipient);
        }
        info!("📧️ Order confirmation for [{order_id}] ({total}) sent to {recipient} from {}.", self.from);
        Ok(())
    }
}

/// Wires the mailer into the engine's event hooks. Returns the handlers; the caller starts them and passes their
/// producers to the reconciliation API.
pub fn create_mailer_event_handlers(mailer: Mailer) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_created(move |ev| {
        let mailer = mailer.clone();
        Box::pin(async move {
            let order = ev.order;
            let recipient = order.customer.email.clone();
            let total = order.total.to_string();
            if let Err(e) = mailer.send_order_confirmation(&recipient, order.id.as_str(), &total).await {
                error!("📧️ Could not send the confirmation for order [{}]. {e}", order.id);
            }
        })
    });
    EventHandlers::new(MAILER_EVENT_BUFFER_SIZE, hooks)
}
