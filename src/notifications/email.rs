//! Outbound email for password reset and driver invitation links.
//!
//! Delivery uses the SMTP settings from the main config file. When SMTP is
//! not configured the link is logged instead, which keeps the flows usable
//! in development.

use anyhow::Result;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::EmailConfig;

/// Service for sending account emails
#[derive(Clone)]
pub struct Mailer {
    config: EmailConfig,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    /// Build the link a reset token is redeemed through
    pub fn reset_url(&self, token: &str) -> String {
        format!("{}/auth/reset-password?token={}", self.config.app_url, token)
    }

    /// Build the set-password link sent with a driver invitation
    pub fn activation_url(&self, token: &str) -> String {
        format!("{}/auth/set-password?token={}", self.config.app_url, token)
    }

    /// Send a password reset email, or log the link when SMTP is not
    /// configured.
    pub async fn send_password_reset(&self, to_email: &str, reset_url: &str, ttl_minutes: i64) {
        if !self.is_enabled() {
            tracing::info!("Email not configured; password reset link: {}", reset_url);
            return;
        }

        let subject = "Reset your Navette password";
        let text_body = format!(
            "A password reset was requested for your account.\n\n\
             Open this link to choose a new password:\n{reset_url}\n\n\
             The link expires in {ttl_minutes} minutes. If you did not ask \
             for a reset you can ignore this email."
        );
        let html_body = format!(
            "<p>A password reset was requested for your account.</p>\
             <p><a href=\"{reset_url}\">Choose a new password</a></p>\
             <p>The link expires in {ttl_minutes} minutes. If you did not \
             ask for a reset you can ignore this email.</p>"
        );

        if let Err(e) = self.send(to_email, subject, &html_body, &text_body).await {
            tracing::error!(error = %e, "Failed to send password reset email to {}", to_email);
        }
    }

    /// Send a driver invitation with the set-password activation link.
    pub async fn send_driver_invitation(&self, to_email: &str, first_name: &str, url: &str) {
        if !self.is_enabled() {
            tracing::info!("Email not configured; driver activation link: {}", url);
            return;
        }

        let subject = "You have been invited to drive for Navette";
        let text_body = format!(
            "Hello {first_name},\n\n\
             An administrator created a driver account for you.\n\
             Set your password to activate it:\n{url}\n"
        );
        let html_body = format!(
            "<p>Hello {first_name},</p>\
             <p>An administrator created a driver account for you.</p>\
             <p><a href=\"{url}\">Set your password to activate it</a></p>"
        );

        if let Err(e) = self.send(to_email, subject, &html_body, &text_body).await {
            tracing::error!(error = %e, "Failed to send driver invitation to {}", to_email);
        }
    }

    /// Send an email with HTML and plain text versions
    async fn send(
        &self,
        to_email: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<()> {
        let smtp_host = self
            .config
            .smtp_host
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("SMTP host not configured"))?;
        let from_address = self
            .config
            .from_address
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("From address not configured"))?;

        let from: Mailbox = format!("{} <{}>", self.config.from_name, from_address).parse()?;
        let to: Mailbox = to_email.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)?.port(self.config.smtp_port);

        if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let transport = builder.build();
        transport.send(email).await?;
        tracing::debug!("Sent email to {}", to_email);
        Ok(())
    }
}
