//! Email Service
//!
//! Renders transactional emails with `tera` and hands them to a
//! [`MailTransport`]. SMTP delivery goes through `lettre`; the in-memory
//! transport records messages instead of sending them.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Datelike;
use lettre::{
    message::{header, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use log::{debug, error, info};
use tera::{Context, Tera};

use crate::models::ContactRequest;
use crate::utils::error::{AppError, AppResult};

/// Email service configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP relay; `None` keeps mail in memory
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    /// Display name, also used as the app name in templates
    pub from_name: String,
    /// Where landing-page contact messages are delivered
    pub contact_inbox: String,
    /// Base URL for links in emails
    pub app_base_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "no-reply@bytechs.app".to_string(),
            from_name: "ByTechs".to_string(),
            contact_inbox: "hello@bytechs.app".to_string(),
            app_base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// A rendered message ready for delivery
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Delivery backend for rendered emails
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, email: OutgoingEmail) -> AppResult<()>;
}

/// Async SMTP delivery via `lettre`
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailTransport {
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| AppError::Configuration("SMTP_HOST is not set".to_string()))?;

        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| AppError::Configuration(format!("Failed to configure SMTP relay: {}", e)))?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| AppError::Configuration(format!("Invalid from address: {}", e)))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn deliver(&self, email: OutgoingEmail) -> AppResult<()> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient email: {}", e)))?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject);

        if let Some(reply_to) = email.reply_to {
            let reply_to: Mailbox = reply_to
                .parse()
                .map_err(|e| AppError::BadRequest(format!("Invalid reply-to email: {}", e)))?;
            builder = builder.reply_to(reply_to);
        }

        let message = builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(email.text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(email.html_body),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email message: {}", e)))?;

        self.transport.send(message).await.map_err(|e| {
            error!("SMTP delivery to {} failed: {}", email.to, e);
            AppError::ExternalService(format!("Failed to send email: {}", e))
        })?;

        Ok(())
    }
}

/// Keeps every message in memory, for tests and local runs without SMTP
#[derive(Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, oldest first
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Most recent message addressed to `to`
    pub fn last_to(&self, to: &str) -> Option<OutgoingEmail> {
        self.sent()
            .into_iter()
            .rev()
            .find(|email| email.to.eq_ignore_ascii_case(to))
    }
}

#[async_trait]
impl MailTransport for MemoryTransport {
    async fn deliver(&self, email: OutgoingEmail) -> AppResult<()> {
        debug!("Captured email to {}: {}", email.to, email.subject);
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(email);
        Ok(())
    }
}

const VERIFICATION_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Verify your email</title></head>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
    <h1>Welcome to {{ app_name }}</h1>
    <p>Hi {{ user_name }},</p>
    <p>Please confirm your email address to finish creating your account.</p>
    <p><a href="{{ verify_url }}" style="display: inline-block; padding: 12px 24px; background: #4b3ccf; color: white; text-decoration: none; border-radius: 4px;">Verify email</a></p>
    <p>This link expires in {{ expires_in_hours }} hours.</p>
    <p style="font-size: 12px; color: #666;">&copy; {{ current_year }} {{ app_name }}</p>
</body>
</html>"#;

const VERIFICATION_TXT: &str = r#"Hi {{ user_name }},

Please confirm your email address to finish creating your {{ app_name }} account:

{{ verify_url }}

This link expires in {{ expires_in_hours }} hours.
"#;

const RESET_CODE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Password reset code</title></head>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
    <h1>Reset your password</h1>
    <p>Hi {{ user_name }},</p>
    <p>Enter this code in the app to continue:</p>
    <p style="font-size: 32px; font-weight: bold; letter-spacing: 8px; text-align: center;">{{ code }}</p>
    <p>The code expires in {{ expires_in_minutes }} minutes. If you did not ask to reset your password, ignore this email.</p>
    <p style="font-size: 12px; color: #666;">&copy; {{ current_year }} {{ app_name }}</p>
</body>
</html>"#;

const RESET_CODE_TXT: &str = r#"Hi {{ user_name }},

Enter this code in the app to reset your password.

Code: {{ code }}

The code expires in {{ expires_in_minutes }} minutes. If you did not ask to reset your password, ignore this email.
"#;

const WELCOME_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Welcome</title></head>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
    <h1>You're all set, {{ user_name }}!</h1>
    <p>Your email is verified and your {{ app_name }} account is active.</p>
    <p><a href="{{ app_base_url }}">Open {{ app_name }}</a></p>
</body>
</html>"#;

const WELCOME_TXT: &str = r#"You're all set, {{ user_name }}!

Your email is verified and your {{ app_name }} account is active.

{{ app_base_url }}
"#;

const CONTACT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>New contact message</title></head>
<body style="font-family: Arial, sans-serif; color: #333;">
    <h2>New message from the landing page</h2>
    <p><strong>Name:</strong> {{ name }}</p>
    <p><strong>Email:</strong> {{ email }}</p>
    <p style="white-space: pre-wrap;">{{ message }}</p>
</body>
</html>"#;

const CONTACT_TXT: &str = r#"New message from the landing page

Name: {{ name }}
Email: {{ email }}

{{ message }}
"#;

/// Renders and sends the service's emails
pub struct EmailService {
    transport: Arc<dyn MailTransport>,
    templates: Tera,
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig, transport: Arc<dyn MailTransport>) -> AppResult<Self> {
        let mut templates = Tera::default();
        templates
            .add_raw_templates(vec![
                ("verification_email.html", VERIFICATION_HTML),
                ("verification_email.txt", VERIFICATION_TXT),
                ("reset_code.html", RESET_CODE_HTML),
                ("reset_code.txt", RESET_CODE_TXT),
                ("welcome.html", WELCOME_HTML),
                ("welcome.txt", WELCOME_TXT),
                ("contact_message.html", CONTACT_HTML),
                ("contact_message.txt", CONTACT_TXT),
            ])
            .map_err(|e| {
                AppError::Configuration(format!("Failed to load email templates: {}", e))
            })?;

        Ok(Self {
            transport,
            templates,
            config,
        })
    }

    /// SMTP when `smtp_host` is configured, memory otherwise
    pub fn from_config(config: EmailConfig) -> AppResult<Self> {
        let transport: Arc<dyn MailTransport> = match config.smtp_host {
            Some(_) => Arc::new(SmtpMailTransport::new(&config)?),
            None => {
                info!("SMTP_HOST not set; outgoing email is kept in memory");
                Arc::new(MemoryTransport::new())
            }
        };
        Self::new(config, transport)
    }

    pub fn config(&self) -> &EmailConfig {
        &self.config
    }

    /// Mail the sign-up verification link
    pub async fn send_verification_email(
        &self,
        to_email: &str,
        user_name: &str,
        token: &str,
        expires_in_hours: i64,
    ) -> AppResult<()> {
        let mut context = self.base_context();
        context.insert("user_name", user_name);
        context.insert(
            "verify_url",
            &format!(
                "{}/verify-email?token={}",
                self.config.app_base_url.trim_end_matches('/'),
                token
            ),
        );
        context.insert("expires_in_hours", &expires_in_hours);

        self.send(to_email, None, "Verify your email address", "verification_email", &context)
            .await
    }

    /// Mail a 4-digit password reset code
    pub async fn send_reset_code_email(
        &self,
        to_email: &str,
        user_name: &str,
        code: &str,
        expires_in_minutes: u32,
    ) -> AppResult<()> {
        let mut context = self.base_context();
        context.insert("user_name", user_name);
        context.insert("code", code);
        context.insert("expires_in_minutes", &expires_in_minutes);

        self.send(to_email, None, "Your password reset code", "reset_code", &context)
            .await
    }

    pub async fn send_welcome_email(&self, to_email: &str, user_name: &str) -> AppResult<()> {
        let mut context = self.base_context();
        context.insert("user_name", user_name);

        let subject = format!("Welcome to {}", self.config.from_name);
        self.send(to_email, None, &subject, "welcome", &context).await
    }

    /// Relay a landing-page contact form to the inbox, replying to the sender
    pub async fn send_contact_message(&self, contact: &ContactRequest) -> AppResult<()> {
        let mut context = self.base_context();
        context.insert("name", contact.name.trim());
        context.insert("email", contact.email.trim());
        context.insert("message", contact.message.trim());

        let subject = format!("Contact form: {}", contact.name.trim());
        let inbox = self.config.contact_inbox.clone();
        self.send(
            &inbox,
            Some(contact.email.trim().to_string()),
            &subject,
            "contact_message",
            &context,
        )
        .await
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("app_name", &self.config.from_name);
        context.insert("app_base_url", &self.config.app_base_url);
        context.insert("current_year", &chrono::Utc::now().year());
        context
    }

    async fn send(
        &self,
        to: &str,
        reply_to: Option<String>,
        subject: &str,
        template: &str,
        context: &Context,
    ) -> AppResult<()> {
        let render = |name: String| {
            self.templates
                .render(&name, context)
                .map_err(|e| AppError::Internal(format!("Failed to render {}: {}", name, e)))
        };
        let html_body = render(format!("{}.html", template))?;
        let text_body = render(format!("{}.txt", template))?;

        self.transport
            .deliver(OutgoingEmail {
                to: to.to_string(),
                reply_to,
                subject: subject.to_string(),
                text_body,
                html_body,
            })
            .await?;

        info!("Sent {} email to {}", template, to);
        Ok(())
    }
}
