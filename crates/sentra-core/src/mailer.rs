//! Outbound email interface.
//!
//! Delivery itself is external glue; the auth flows only depend on the
//! success/failure signal. Failure semantics differ per flow: some sends
//! are best-effort, others roll the flow back (see the auth service).

use crate::error::SentraResult;

pub trait Mailer: Send + Sync {
    fn send_verification(
        &self,
        email: &str,
        token: &str,
    ) -> impl Future<Output = SentraResult<()>> + Send;

    fn send_password_reset(
        &self,
        email: &str,
        token: &str,
    ) -> impl Future<Output = SentraResult<()>> + Send;

    fn send_login_notification(
        &self,
        email: &str,
        device_info: &str,
        ip_address: Option<&str>,
        location: Option<&str>,
    ) -> impl Future<Output = SentraResult<()>> + Send;
}
