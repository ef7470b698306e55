//! Checkout against a payment provider.
//!
//! Only a simulated provider exists: nothing is charged, the donor is sent
//! straight to the success page, and visiting it settles the donation.

use std::time::Duration;

use serde::Serialize;

use crate::db::models::Donation;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: String,
    pub redirect_delay_ms: u64,
}

pub trait PaymentGateway: Send + Sync {
    fn begin_checkout(&self, donation: &Donation) -> CheckoutSession;

    /// Provider reference stored on the donation once payment settles.
    fn payment_reference(&self, session_id: &str) -> String;
}

pub struct SimulatedGateway {
    redirect_delay: Duration,
}

impl SimulatedGateway {
    pub fn new(redirect_delay: Duration) -> Self {
        Self { redirect_delay }
    }
}

impl PaymentGateway for SimulatedGateway {
    fn begin_checkout(&self, donation: &Donation) -> CheckoutSession {
        tracing::info!("Simulated checkout for donation {} ({})", donation.id, donation.amount);
        CheckoutSession {
            session_id: donation.id.clone(),
            redirect_url: format!("/donate/success?session_id={}", donation.id),
            redirect_delay_ms: self.redirect_delay.as_millis() as u64,
        }
    }

    fn payment_reference(&self, session_id: &str) -> String {
        format!("sim_{}", session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{DonationStatus, DonationType};
    use chrono::Utc;

    #[test]
    fn simulated_checkout_redirects_to_success_page() {
        let donation = Donation {
            id: "d-1".into(),
            shelter_id: None,
            project_id: None,
            donor_id: None,
            email: Some("donor@example.com".into()),
            amount: 500,
            is_anonymous: true,
            donation_type: DonationType::General,
            status: DonationStatus::Pending,
            payment_intent_id: None,
            impact_report_sent: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let gateway = SimulatedGateway::new(Duration::from_millis(2000));
        let session = gateway.begin_checkout(&donation);
        assert_eq!(session.redirect_url, "/donate/success?session_id=d-1");
        assert_eq!(session.redirect_delay_ms, 2000);
        assert_eq!(gateway.payment_reference(&session.session_id), "sim_d-1");
    }
}
