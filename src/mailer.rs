use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::limits::MAIL_QUEUE_CAPACITY;
use crate::model::{Money, StayRange};
use crate::observability;

/// Everything a confirmation email needs. Built while the booking's room
/// guard is still held; delivered long after it is gone.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub to: String,
    pub guest: String,
    pub hotel: String,
    pub room_type: String,
    pub stay: StayRange,
    pub guests: u32,
    pub total_price: Money,
    pub booking_id: Ulid,
}

impl Confirmation {
    pub fn subject(&self) -> String {
        format!("Booking confirmed — {}", self.hotel)
    }

    pub fn body(&self) -> String {
        format!(
            "Hi {},\n\nYour booking at {} is confirmed.\n\n\
             Room: {}\nGuests: {}\nCheck-in: {}\nCheck-out: {}\n\
             Total: {}.{:02}\nBooking reference: {}\n",
            self.guest,
            self.hotel,
            self.room_type,
            self.guests,
            self.stay.check_in,
            self.stay.check_out,
            self.total_price / 100,
            self.total_price % 100,
            self.booking_id,
        )
    }
}

/// Delivery boundary. Implementations own retries or the lack of them; the
/// mailer task only logs and counts outcomes.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(
        &self,
        msg: &Confirmation,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// POSTs `{from, to, subject, text}` to a mail API with a bearer token.
pub struct HttpMailTransport {
    client: reqwest::Client,
    url: String,
    token: String,
    from: String,
}

impl HttpMailTransport {
    pub fn new(url: String, token: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            token,
            from,
        }
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn deliver(
        &self,
        msg: &Confirmation,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "from": self.from,
                "to": msg.to,
                "subject": msg.subject(),
                "text": msg.body(),
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Stands in when no mail endpoint is configured. Every message is dropped
/// after a debug log line.
pub struct NoopTransport;

#[async_trait]
impl MailTransport for NoopTransport {
    async fn deliver(
        &self,
        msg: &Confirmation,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        debug!("mail transport unconfigured, dropping confirmation for {}", msg.booking_id);
        Ok(())
    }
}

/// Handle to the background delivery task. Cheap to clone; `send` never
/// blocks and never fails the caller — a full queue drops the message with a
/// warning, which is the contract: losing a confirmation email is acceptable,
/// losing a booking is not.
#[derive(Clone)]
pub struct Mailer {
    tx: mpsc::Sender<Confirmation>,
}

impl Mailer {
    pub fn spawn(transport: Arc<dyn MailTransport>) -> Self {
        let (tx, rx) = mpsc::channel(MAIL_QUEUE_CAPACITY);
        tokio::spawn(delivery_loop(rx, transport));
        Self { tx }
    }

    pub fn send(&self, msg: Confirmation) {
        if self.tx.try_send(msg).is_err() {
            metrics::counter!(observability::MAIL_DROPPED_TOTAL).increment(1);
            warn!("mail queue full, dropping confirmation");
        }
    }
}

async fn delivery_loop(mut rx: mpsc::Receiver<Confirmation>, transport: Arc<dyn MailTransport>) {
    while let Some(msg) = rx.recv().await {
        let booking_id = msg.booking_id;
        match transport.deliver(&msg).await {
            Ok(()) => {
                metrics::counter!(observability::MAIL_SENT_TOTAL).increment(1);
                debug!("confirmation sent for booking {booking_id}");
            }
            Err(e) => {
                metrics::counter!(observability::MAIL_FAILED_TOTAL).increment(1);
                warn!("confirmation delivery failed for booking {booking_id}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn confirmation() -> Confirmation {
        Confirmation {
            to: "ada@example.com".into(),
            guest: "Ada".into(),
            hotel: "Seaview".into(),
            room_type: "Double".into(),
            stay: StayRange::new(
                NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 5, 3).unwrap(),
            ),
            guests: 2,
            total_price: 20_050,
            booking_id: Ulid::new(),
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl MailTransport for FailingTransport {
        async fn deliver(
            &self,
            _msg: &Confirmation,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("mail API down".into())
        }
    }

    struct CapturingTransport {
        tx: mpsc::Sender<Confirmation>,
    }

    #[async_trait]
    impl MailTransport for CapturingTransport {
        async fn deliver(
            &self,
            msg: &Confirmation,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.tx.send(msg.clone()).await.ok();
            Ok(())
        }
    }

    #[test]
    fn body_formats_minor_units() {
        let body = confirmation().body();
        assert!(body.contains("Total: 200.50"));
        assert!(body.contains("Check-in: 2025-05-01"));
    }

    #[tokio::test]
    async fn delivered_message_reaches_transport() {
        let (tx, mut rx) = mpsc::channel(8);
        let mailer = Mailer::spawn(Arc::new(CapturingTransport { tx }));
        let msg = confirmation();
        mailer.send(msg.clone());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.booking_id, msg.booking_id);
        assert_eq!(received.to, "ada@example.com");
    }

    #[tokio::test]
    async fn transport_failure_is_swallowed() {
        let mailer = Mailer::spawn(Arc::new(FailingTransport));
        // Must not panic or propagate anywhere
        mailer.send(confirmation());
        mailer.send(confirmation());
        tokio::task::yield_now().await;
    }
}
