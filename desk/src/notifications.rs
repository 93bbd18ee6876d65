//! Ticket notifications.
//!
//! Decides who hears about a change and what the message says, then hands it
//! to a [`Notifier`]. Delivery problems are logged and reported as `false`;
//! they never fail the ticket operation.

use crate::config::Config;
use crate::policy::comment_visible_to;
use crate::telemetry;
use crate::ticket::{Comment, Ticket};
use crate::types::TicketStatus;
use crate::user::User;
use helpdesk_core::notify::{Notification, Notifier};
use serde_json::{Value, json};
use std::sync::Arc;

/// Builds and sends ticket notifications.
#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    site_url: String,
    sender: String,
    enabled: bool,
}

impl NotificationService {
    /// Create a service sending through `notifier` with the site URL, sender
    /// address and master switch from `config`
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, config: &Config) -> Self {
        Self {
            notifier,
            site_url: config.site_url.clone(),
            sender: config.from_email.clone(),
            enabled: config.notifications_enabled,
        }
    }

    /// Link to a ticket
    #[must_use]
    pub fn ticket_url(&self, ticket: &Ticket) -> String {
        format!("{}/tickets/{}/", self.site_url, ticket.id)
    }

    fn context(&self, ticket: &Ticket, extra: Value) -> Value {
        let mut context = json!({
            "ticket_id": ticket.id,
            "ticket_short_id": ticket.id.short(),
            "subject": ticket.subject,
            "status": ticket.status,
            "status_label": ticket.status.label(),
            "priority": ticket.priority,
            "ticket_url": self.ticket_url(ticket),
        });
        if let (Some(base), Value::Object(extra)) = (context.as_object_mut(), extra) {
            base.extend(extra);
        }
        context
    }

    /// Send one message. Returns whether it was delivered.
    async fn deliver(&self, recipient: &User, subject: String, template: &str, context: Value) -> bool {
        if !self.enabled || !recipient.receive_notifications || !recipient.is_active() {
            telemetry::record_notification("skipped");
            return false;
        }

        let notification = Notification::new(recipient.email.clone(), subject, template, context)
            .with_sender(self.sender.clone());
        match self.notifier.send(&notification).await {
            Ok(()) => {
                telemetry::record_notification("sent");
                tracing::info!(
                    recipient = %recipient.email,
                    subject = %notification.subject,
                    "Notification sent"
                );
                true
            }
            Err(e) => {
                telemetry::record_notification("failed");
                tracing::warn!(
                    recipient = %recipient.email,
                    subject = %notification.subject,
                    error = %e,
                    "Notification failed"
                );
                false
            }
        }
    }

    /// Tell the customer their ticket was filed.
    pub async fn ticket_created(&self, ticket: &Ticket, customer: &User) -> bool {
        let context = self.context(ticket, json!({ "customer": customer.full_name }));
        self.deliver(
            customer,
            format!("Ticket #{} creado exitosamente", ticket.id.short()),
            "emails/ticket_created",
            context,
        )
        .await
    }

    /// Tell the agent about the new ticket and the customer that it is being
    /// reviewed. Returns the number of messages delivered.
    pub async fn ticket_assigned(&self, ticket: &Ticket, agent: &User, customer: &User) -> usize {
        let context = self.context(ticket, json!({ "agent": agent.full_name }));
        let short = ticket.id.short();
        let to_agent = self
            .deliver(
                agent,
                format!("Nuevo ticket asignado: #{short}"),
                "emails/ticket_assigned",
                context.clone(),
            )
            .await;
        let to_customer = self
            .deliver(
                customer,
                format!("Su ticket #{short} está siendo revisado"),
                "emails/ticket_in_review",
                context,
            )
            .await;
        usize::from(to_agent) + usize::from(to_customer)
    }

    /// Tell the technician a repair was routed to them.
    pub async fn derived_to_technician(&self, ticket: &Ticket, technician: &User) -> bool {
        let context = self.context(ticket, json!({ "technician": technician.full_name }));
        self.deliver(
            technician,
            format!("Ticket derivado para reparación: #{}", ticket.id.short()),
            "emails/ticket_derived",
            context,
        )
        .await
    }

    /// Tell the customer (always) and the agent (unless they made the change)
    /// about a status change. Returns the number of messages delivered.
    pub async fn status_changed(
        &self,
        ticket: &Ticket,
        previous: TicketStatus,
        changed_by: &User,
        customer: &User,
        agent: Option<&User>,
    ) -> usize {
        let context = self.context(
            ticket,
            json!({
                "previous_status": previous.label(),
                "new_status": ticket.status.label(),
                "changed_by": changed_by.full_name,
            }),
        );
        let short = ticket.id.short();

        let mut delivered = usize::from(
            self.deliver(
                customer,
                format!("Actualización en su ticket #{short}"),
                "emails/status_changed",
                context.clone(),
            )
            .await,
        );

        if let Some(agent) = agent.filter(|a| a.id != changed_by.id) {
            delivered += usize::from(
                self.deliver(
                    agent,
                    format!("Cambio de estado en ticket #{short}"),
                    "emails/status_changed",
                    context,
                )
                .await,
            );
        }
        delivered
    }

    /// Tell the ticket's participants about a new comment.
    ///
    /// `participants` are the customer, agent and technician; the author is
    /// skipped and private comments only reach staff. Returns the number of
    /// messages delivered.
    pub async fn new_comment(
        &self,
        comment: &Comment,
        ticket: &Ticket,
        author: &User,
        participants: &[User],
    ) -> usize {
        let context = self.context(
            ticket,
            json!({
                "author": author.full_name,
                "comment": comment.text,
                "visibility": comment.visibility,
            }),
        );
        let subject = format!("Nuevo comentario en ticket #{}", ticket.id.short());

        let mut delivered = 0;
        for user in participants {
            if user.id == author.id || !comment_visible_to(comment, user.role) {
                continue;
            }
            if self
                .deliver(user, subject.clone(), "emails/new_comment", context.clone())
                .await
            {
                delivered += 1;
            }
        }
        delivered
    }
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("site_url", &self.site_url)
            .field("sender", &self.sender)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::TicketDraft;
    use crate::types::{Role, Visibility};
    use chrono::Utc;
    use helpdesk_testing::RecordingNotifier;

    fn user(name: &str, role: Role) -> User {
        User::new(name, format!("{name}@example.com"), name, role, Utc::now())
    }

    fn service(notifier: &Arc<RecordingNotifier>) -> NotificationService {
        let config = Config {
            site_url: "https://soporte.example.com".into(),
            from_email: "garantias@example.com".into(),
            ..Config::default()
        };
        NotificationService::new(notifier.clone(), &config)
    }

    #[tokio::test]
    async fn test_created_subject_and_url() {
        let notifier = Arc::new(RecordingNotifier::new());
        let customer = user("ana", Role::Customer);
        let ticket = Ticket::new(TicketDraft::default(), customer.id, Utc::now());

        assert!(service(&notifier).ticket_created(&ticket, &customer).await);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].subject,
            format!("Ticket #{} creado exitosamente", ticket.id.short())
        );
        assert_eq!(
            sent[0].context["ticket_url"],
            format!("https://soporte.example.com/tickets/{}/", ticket.id)
        );
        assert_eq!(sent[0].sender.as_deref(), Some("garantias@example.com"));
    }

    #[tokio::test]
    async fn test_opted_out_and_failures_return_false() {
        let notifier = Arc::new(RecordingNotifier::new());
        let mut customer = user("ana", Role::Customer);
        customer.receive_notifications = false;
        let ticket = Ticket::new(TicketDraft::default(), customer.id, Utc::now());

        assert!(!service(&notifier).ticket_created(&ticket, &customer).await);
        assert!(notifier.sent().is_empty());

        customer.receive_notifications = true;
        notifier.fail_deliveries(true);
        assert!(!service(&notifier).ticket_created(&ticket, &customer).await);
    }

    #[tokio::test]
    async fn test_status_change_skips_acting_agent() {
        let notifier = Arc::new(RecordingNotifier::new());
        let customer = user("ana", Role::Customer);
        let agent = user("luis", Role::Agent);
        let ticket = Ticket::new(TicketDraft::default(), customer.id, Utc::now());

        let delivered = service(&notifier)
            .status_changed(&ticket, TicketStatus::Open, &agent, &customer, Some(&agent))
            .await;

        assert_eq!(delivered, 1);
        assert_eq!(notifier.sent_to("ana@example.com").len(), 1);
        assert!(notifier.sent_to("luis@example.com").is_empty());
    }

    #[tokio::test]
    async fn test_private_comment_not_sent_to_customer() {
        let notifier = Arc::new(RecordingNotifier::new());
        let customer = user("ana", Role::Customer);
        let agent = user("luis", Role::Agent);
        let tech = user("tito", Role::Technician);
        let ticket = Ticket::new(TicketDraft::default(), customer.id, Utc::now());
        let comment = Comment::new(ticket.id, agent.id, "nota", Visibility::Private, Utc::now());

        let delivered = service(&notifier)
            .new_comment(&comment, &ticket, &agent, &[customer, agent.clone(), tech])
            .await;

        assert_eq!(delivered, 1);
        assert_eq!(notifier.sent()[0].recipient, "tito@example.com");
    }
}
