// src/services/mail.rs

use async_trait::async_trait;

use crate::error::AppError;

/// An outgoing e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail seam. Transport is not this crate's concern; the server
/// ships with `LogMailer`.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), AppError>;
}

/// Writes every message to the log instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), AppError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "outgoing mail");
        tracing::debug!(body = %mail.body, "mail body");
        Ok(())
    }
}

pub fn otp_mail(to: &str, app_name: &str, code: &str, ttl_secs: i64) -> Mail {
    let minutes = (ttl_secs / 60).max(1);
    Mail {
        to: to.to_owned(),
        subject: format!("Your {} verification code", app_name),
        body: format!(
            "Your OTP code is: {}\nIt will expire in {} minutes.\n",
            code, minutes
        ),
    }
}

pub fn verification_mail(to: &str, username: &str, app_name: &str, link: &str) -> Mail {
    Mail {
        to: to.to_owned(),
        subject: format!("Verify your email address - {}", app_name),
        body: format!(
            "Hi {},\n\nPlease verify your email by clicking the link below:\n\n{}\n\n\
             This link is valid for 24 hours.\n\nThank you!\n{}\n",
            username, link, app_name
        ),
    }
}

pub fn password_reset_mail(
    to: &str,
    username: &str,
    app_name: &str,
    link: &str,
    ttl_secs: u64,
) -> Mail {
    let minutes = (ttl_secs / 60).max(1);
    Mail {
        to: to.to_owned(),
        subject: format!("Password reset on {}", app_name),
        body: format!(
            "Hi {},\n\nYou're receiving this email because you requested a password reset \
             for your account.\n\nPlease go to the following link and choose a new password:\n\n{}\n\n\
             The link expires in {} minutes. If you didn't ask for this, ignore this email.\n\n{}\n",
            username, link, minutes, app_name
        ),
    }
}
