//! Reviewer notification dispatch — email, Telegram, and webhook.
//!
//! Strictly a best-effort side channel: every failure is logged and
//! swallowed. Submission must return a ticket even when no notification
//! goes out.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use mathshorts_core::config::{EmailNotifyConfig, NotifyConfig};
use mathshorts_core::types::ApprovalTicket;

/// Notification target configuration.
#[derive(Debug, Clone)]
pub enum NotifyTarget {
    /// SMTP email to the reviewer.
    Email(EmailNotifyConfig),
    /// Telegram Bot API `sendMessage`.
    Telegram { bot_token: String, chat_id: String },
    /// Generic HTTP webhook — POST with JSON body.
    Webhook { url: String },
}

/// Fans a submission announcement out to every configured target.
pub struct Notifier {
    targets: Vec<(String, NotifyTarget)>,
    /// Base URL the approve/reject links point at.
    approval_base_url: String,
}

impl Notifier {
    pub fn from_config(config: &NotifyConfig) -> Self {
        let mut targets = Vec::new();
        if let Some(email) = &config.email {
            targets.push(("email".to_string(), NotifyTarget::Email(email.clone())));
        }
        if let Some(tg) = &config.telegram {
            targets.push((
                "telegram".to_string(),
                NotifyTarget::Telegram {
                    bot_token: tg.bot_token.clone(),
                    chat_id: tg.chat_id.clone(),
                },
            ));
        }
        if let Some(wh) = &config.webhook {
            targets.push((
                "webhook".to_string(),
                NotifyTarget::Webhook { url: wh.url.clone() },
            ));
        }
        Self {
            targets,
            approval_base_url: config.approval_base_url.clone(),
        }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            targets: Vec::new(),
            approval_base_url: "http://localhost:3000".into(),
        }
    }

    /// Announce a newly submitted ticket. Never fails; per-target
    /// failures are logged at warn.
    pub async fn announce_submission(&self, ticket: &ApprovalTicket) {
        if self.targets.is_empty() {
            tracing::debug!("📭 No notification targets configured for {}", ticket.id);
            return;
        }
        for (name, target) in &self.targets {
            let result = dispatch(target, ticket, &self.approval_base_url).await;
            match result {
                Ok(()) => tracing::info!("📣 Approval request sent via {}: {}", name, ticket.id),
                Err(e) => tracing::warn!("⚠️ Notification via {} failed: {}", name, e),
            }
        }
    }
}

/// Send one notification to one target.
async fn dispatch(
    target: &NotifyTarget,
    ticket: &ApprovalTicket,
    base_url: &str,
) -> Result<(), String> {
    match target {
        NotifyTarget::Email(config) => send_email(config, ticket, base_url).await,
        NotifyTarget::Telegram { bot_token, chat_id } => {
            send_telegram(bot_token, chat_id, ticket, base_url).await
        }
        NotifyTarget::Webhook { url } => send_webhook(url, ticket, base_url).await,
    }
}

async fn send_email(
    config: &EmailNotifyConfig,
    ticket: &ApprovalTicket,
    base_url: &str,
) -> Result<(), String> {
    let email = Message::builder()
        .from(config.username.parse().map_err(|e| format!("from addr: {e}"))?)
        .to(config.to.parse().map_err(|e| format!("to addr: {e}"))?)
        .subject("📚 Math Shorts 콘텐츠 승인 요청")
        .header(ContentType::TEXT_HTML)
        .body(approval_email_html(ticket, base_url))
        .map_err(|e| format!("build email: {e}"))?;

    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        .map_err(|e| format!("SMTP relay: {e}"))?
        .port(config.smtp_port)
        .credentials(Credentials::new(
            config.username.clone(),
            config.password.clone(),
        ))
        .build();

    mailer
        .send(email)
        .await
        .map(|_| ())
        .map_err(|e| format!("SMTP send: {e}"))
}

async fn send_telegram(
    bot_token: &str,
    chat_id: &str,
    ticket: &ApprovalTicket,
    base_url: &str,
) -> Result<(), String> {
    let url = format!("https://api.telegram.org/bot{bot_token}/sendMessage");
    let bundle = &ticket.bundle;
    let text = format!(
        "📚 Math Shorts 승인 요청\n\n⏰ 시간대: {}\n🌍 언어: {}개\n📝 {}\n\n✅ 승인: {}\n❌ 거절: {}\n\n승인하지 않으면 {}에 자동 승인됩니다.",
        bundle.time_slot,
        bundle.narrations.len(),
        bundle.preview(),
        resolve_link(base_url, &ticket.id, "approve"),
        resolve_link(base_url, &ticket.id, "reject"),
        ticket.deadline.format("%H:%M UTC"),
    );

    let client = reqwest::Client::new();
    let resp = client
        .post(&url)
        .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| format!("Telegram send failed: {e}"))?;

    if resp.status().is_success() {
        Ok(())
    } else {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(format!("Telegram API error {status}: {body}"))
    }
}

async fn send_webhook(url: &str, ticket: &ApprovalTicket, base_url: &str) -> Result<(), String> {
    let client = reqwest::Client::new();
    let resp = client
        .post(url)
        .json(&serde_json::json!({
            "ticket_id": ticket.id,
            "bundle_id": ticket.bundle.id,
            "time_slot": ticket.bundle.time_slot,
            "languages": ticket.bundle.narrations.len(),
            "preview": ticket.bundle.preview(),
            "deadline": ticket.deadline.to_rfc3339(),
            "approve_url": resolve_link(base_url, &ticket.id, "approve"),
            "reject_url": resolve_link(base_url, &ticket.id, "reject"),
        }))
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| format!("Webhook send failed: {e}"))?;

    if resp.status().is_success() {
        Ok(())
    } else {
        Err(format!("Webhook error {}", resp.status()))
    }
}

fn resolve_link(base_url: &str, ticket_id: &str, action: &str) -> String {
    format!(
        "{}/api/v1/tickets/{}/resolve?action={}",
        base_url.trim_end_matches('/'),
        ticket_id,
        action
    )
}

/// The HTML approval request the reviewer receives.
fn approval_email_html(ticket: &ApprovalTicket, base_url: &str) -> String {
    let bundle = &ticket.bundle;
    let topic = bundle
        .problem
        .metadata
        .tags
        .first()
        .cloned()
        .unwrap_or_else(|| "수학".into());
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body {{ font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; }}
        .header {{ background: linear-gradient(45deg, #667eea, #764ba2); color: white; padding: 20px; text-align: center; }}
        .content {{ padding: 20px; }}
        .button {{ background: #26de81; color: white; padding: 15px 30px; text-decoration: none; border-radius: 25px; display: inline-block; }}
        .reject {{ background: #e74c3c; }}
        .info {{ background: #f8f9fa; padding: 15px; border-radius: 8px; margin: 15px 0; }}
    </style>
</head>
<body>
    <div class="header">
        <h1>📚 Math Shorts 승인 요청</h1>
    </div>
    <div class="content">
        <h2>새로운 콘텐츠가 생성되었습니다</h2>

        <div class="info">
            <p><strong>날짜:</strong> {date}</p>
            <p><strong>시간대:</strong> {slot}</p>
            <p><strong>문제 유형:</strong> {topic}</p>
            <p><strong>언어 수:</strong> {languages}개</p>
        </div>

        <h3>미리보기</h3>
        <p>{preview}</p>

        <div style="text-align: center; margin: 30px 0;">
            <a href="{approve}" class="button">✅ 승인하기</a>
            <a href="{reject}" class="button reject">❌ 수정 요청</a>
        </div>

        <p style="font-size: 0.9em; color: #666;">
            승인하지 않으면 {deadline} (UTC)에 자동으로 승인됩니다.
        </p>
    </div>
</body>
</html>"#,
        date = ticket.submitted_at.format("%Y-%m-%d"),
        slot = bundle.time_slot,
        topic = topic,
        languages = bundle.narrations.len(),
        preview = bundle.preview(),
        approve = resolve_link(base_url, &ticket.id, "approve"),
        reject = resolve_link(base_url, &ticket.id, "reject"),
        deadline = ticket.deadline.format("%H:%M"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use mathshorts_core::types::{
        ApprovalTicket, ContentBundle, Problem, ProblemMetadata, TimeSlot,
    };

    fn sample_ticket() -> ApprovalTicket {
        let problem = Problem {
            statement_text: "지민이가 피자를 3개 주문했습니다.".into(),
            equation_text: "3x + 5 = 20".into(),
            solution_steps: vec!["x = 5".into()],
            final_answer: "x = 5원".into(),
            metadata: ProblemMetadata {
                difficulty: "basic".into(),
                tags: vec!["일차방정식".into()],
            },
        };
        let bundle = ContentBundle::new(problem, vec![], TimeSlot::Morning);
        ApprovalTicket::new(bundle, Utc::now(), Duration::hours(2))
    }

    #[test]
    fn test_email_html_carries_preview_and_links() {
        let ticket = sample_ticket();
        let html = approval_email_html(&ticket, "http://localhost:3000/");
        assert!(html.contains("지민이가 피자를"));
        assert!(html.contains("일차방정식"));
        assert!(html.contains(&format!(
            "http://localhost:3000/api/v1/tickets/{}/resolve?action=approve",
            ticket.id
        )));
        assert!(html.contains("action=reject"));
    }

    #[tokio::test]
    async fn test_announce_with_no_targets_is_a_noop() {
        let notifier = Notifier::disabled();
        // Must not panic or error.
        notifier.announce_submission(&sample_ticket()).await;
    }

    #[test]
    fn test_targets_from_config() {
        let mut config = NotifyConfig::default();
        assert!(Notifier::from_config(&config).targets.is_empty());

        config.webhook = Some(mathshorts_core::config::WebhookNotifyConfig {
            url: "https://hooks.example.com/x".into(),
        });
        let notifier = Notifier::from_config(&config);
        assert_eq!(notifier.targets.len(), 1);
        assert_eq!(notifier.targets[0].0, "webhook");
    }
}
