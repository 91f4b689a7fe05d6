/// Invite delivery through the Resend e-mail API
///
/// ```no_run
/// use tenantry_shared::notify::resend::{ResendConfig, ResendNotifier};
///
/// # fn example() -> Result<(), tenantry_shared::notify::NotifyError> {
/// let notifier = ResendNotifier::new(ResendConfig {
///     api_key: "re_...".to_string(),
///     from: "onboarding@resend.dev".to_string(),
///     frontend_url: "http://localhost:5173".to_string(),
/// })?;
/// # Ok(())
/// # }
/// ```

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::{InviteEmail, InviteNotifier, NotifyError};

const RESEND_API_BASE: &str = "https://api.resend.com";

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: String,

    /// Sender address, e.g. "onboarding@resend.dev"
    pub from: String,

    /// Base URL of the web client; accept links point at
    /// `{frontend_url}/accept-invite/{token}`
    pub frontend_url: String,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    html: String,
}

#[derive(Clone)]
pub struct ResendNotifier {
    client: reqwest::Client,
    config: ResendConfig,
    base_url: String,
}

impl ResendNotifier {
    pub fn new(config: ResendConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url: RESEND_API_BASE.to_string(),
        })
    }

    /// Points the client at another API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn accept_url(&self, token: &str) -> String {
        format!(
            "{}/accept-invite/{}",
            self.config.frontend_url.trim_end_matches('/'),
            token
        )
    }
}

#[async_trait]
impl InviteNotifier for ResendNotifier {
    async fn send_invite_email(&self, email: InviteEmail) -> Result<(), NotifyError> {
        let accept_url = self.accept_url(&email.token);
        let request = SendEmailRequest {
            from: &self.config.from,
            to: vec![&email.to],
            subject: format!("Invitation to join {}", email.company_name),
            html: render_invite_html(&email, &accept_url),
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(to = %email.to, "Invite e-mail sent");
        Ok(())
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Renders the invite body
pub fn render_invite_html(email: &InviteEmail, accept_url: &str) -> String {
    let company = escape_html(&email.company_name);
    let sender = escape_html(&email.sender_name);
    let expires = email.expires_at.format("%Y-%m-%d");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Invitation to {company}</title>
</head>
<body style="margin:0;padding:0;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Arial,sans-serif;background-color:#f5f5f5;">
  <table role="presentation" style="width:100%;border-collapse:collapse;">
    <tr>
      <td align="center" style="padding:40px 20px;">
        <table role="presentation" style="max-width:600px;width:100%;background-color:#ffffff;border-radius:8px;">
          <tr>
            <td style="padding:40px 30px;">
              <h1 style="margin:0 0 24px 0;color:#333333;font-size:24px;">You have been invited</h1>
              <p style="color:#333333;font-size:16px;line-height:1.6;">
                <strong>{sender}</strong> invited you to join <strong>{company}</strong> as <strong>{role}</strong>.
              </p>
              <p style="text-align:center;margin:32px 0;">
                <a href="{accept_url}" style="display:inline-block;padding:14px 32px;background-color:#5a67d8;color:#ffffff;text-decoration:none;border-radius:6px;font-weight:600;">Accept invitation</a>
              </p>
              <p style="color:#999999;font-size:12px;text-align:center;">
                Or paste this link into your browser:<br>
                <a href="{accept_url}" style="color:#5a67d8;word-break:break-all;">{accept_url}</a>
              </p>
              <p style="color:#999999;font-size:12px;text-align:center;">
                This invitation expires on <strong>{expires}</strong>.
              </p>
              <p style="color:#999999;font-size:12px;text-align:center;">
                If you were not expecting this invitation you can ignore this e-mail.
              </p>
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>"#,
        company = company,
        sender = sender,
        role = email.role,
        accept_url = accept_url,
        expires = expires,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::{TimeZone, Utc};

    fn email() -> InviteEmail {
        InviteEmail {
            to: "bob@x.com".to_string(),
            company_name: "Tech <Solutions>".to_string(),
            sender_name: "Ada".to_string(),
            role: Role::Admin,
            token: "abc123".to_string(),
            expires_at: Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap(),
        }
    }

    fn notifier(frontend_url: &str) -> ResendNotifier {
        ResendNotifier::new(ResendConfig {
            api_key: "re_test".to_string(),
            from: "onboarding@resend.dev".to_string(),
            frontend_url: frontend_url.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_accept_url() {
        assert_eq!(
            notifier("http://localhost:5173/").accept_url("abc123"),
            "http://localhost:5173/accept-invite/abc123"
        );
    }

    #[test]
    fn test_template_contents() {
        let html = render_invite_html(&email(), "http://app/accept-invite/abc123");

        assert!(html.contains("Tech &lt;Solutions&gt;"));
        assert!(html.contains("<strong>ADMIN</strong>"));
        assert!(html.contains("http://app/accept-invite/abc123"));
        assert!(html.contains("2025-03-09"));
    }
}
