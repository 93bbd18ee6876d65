//! Comments and attachments.

use super::{HelpDesk, require, require_text};
use crate::attachment::{self, Attachment, Upload};
use crate::error::DeskError;
use crate::events::TicketEvent;
use crate::lifecycle::can_transition;
use crate::policy::{Capability, can_view, comment_visible_to};
use crate::ticket::{Comment, Ticket};
use crate::types::{CommentId, ObjectKind, Role, TicketId, TicketStatus, UserId, Visibility};
use crate::user::User;

impl HelpDesk {
    /// Add a comment to a ticket.
    ///
    /// Customers may only write public, non-resolving comments on their own
    /// tickets. A resolving comment moves the ticket to `resolved` and is held
    /// to the same transition table as [`HelpDesk::resolve_with_explanation`].
    ///
    /// # Errors
    ///
    /// - [`DeskError::Validation`] for empty text, or a resolving comment the
    ///   author's transition table does not allow
    /// - [`DeskError::PermissionDenied`] when the author may not comment here
    #[tracing::instrument(skip(self, text))]
    pub async fn add_comment(
        &self,
        ticket_id: TicketId,
        author: UserId,
        text: &str,
        visibility: Visibility,
        resolves: bool,
    ) -> Result<Comment, DeskError> {
        require_text(text, "El comentario no puede estar vacío")?;
        let author = self.user(author).await?;
        let ticket = self.store.get_ticket(ticket_id).await?;

        if author.role == Role::Customer {
            ensure_own_ticket(&author, &ticket)?;
            if visibility == Visibility::Private || resolves {
                return Err(DeskError::PermissionDenied(
                    "customers can only add public comments".into(),
                ));
            }
        } else {
            require(&author, Capability::ManageTickets)?;
            if visibility == Visibility::Private {
                require(&author, Capability::CommentPrivately)?;
            }
        }

        if resolves && ticket.status.is_terminal() {
            return Err(DeskError::Validation(format!(
                "No se puede resolver un ticket en estado {}",
                ticket.status.label()
            )));
        }
        if resolves && !can_transition(author.role, ticket.status, TicketStatus::Resolved) {
            return Err(DeskError::Validation(format!(
                "Transición no permitida: {} → {}",
                ticket.status.label(),
                TicketStatus::Resolved.label()
            )));
        }

        let comment = self
            .write_comment(ticket, &author, text.trim(), visibility, resolves)
            .await?;
        tracing::info!(
            ticket_id = %comment.ticket,
            author = %author.username,
            visibility = ?visibility,
            "Comment added"
        );
        Ok(comment)
    }

    /// Comments on a ticket that `viewer` is allowed to read, oldest first.
    ///
    /// # Errors
    ///
    /// [`DeskError::PermissionDenied`] when the viewer cannot see the ticket.
    pub async fn visible_comments(
        &self,
        ticket_id: TicketId,
        viewer: UserId,
    ) -> Result<Vec<Comment>, DeskError> {
        let viewer = self.user(viewer).await?;
        let ticket = self.store.get_ticket(ticket_id).await?;
        if !can_view(&viewer, &ticket) {
            return Err(DeskError::PermissionDenied(format!(
                "{} cannot view ticket {}",
                viewer.username,
                ticket.id.short()
            )));
        }

        let mut comments = self.store.comments_for(ticket.id).await?;
        comments.retain(|c| comment_visible_to(c, viewer.role));
        Ok(comments)
    }

    /// Attach a file to a ticket, or to one of its comments.
    ///
    /// # Errors
    ///
    /// - [`DeskError::Attachment`] for an empty, oversized or disallowed file
    /// - [`DeskError::PermissionDenied`] when the actor cannot see the ticket
    /// - [`DeskError::Validation`] when the comment belongs to another ticket
    #[tracing::instrument(skip(self, upload), fields(file = %upload.file_name))]
    pub async fn add_attachment(
        &self,
        ticket_id: TicketId,
        actor: UserId,
        upload: Upload,
        comment: Option<CommentId>,
    ) -> Result<Attachment, DeskError> {
        let actor = self.user(actor).await?;
        let ticket = self.store.get_ticket(ticket_id).await?;
        if actor.role == Role::Customer {
            ensure_own_ticket(&actor, &ticket)?;
        } else {
            require(&actor, Capability::ManageTickets)?;
        }

        let (object_id, object_kind) = match comment {
            Some(comment_id) => {
                let on_ticket = self
                    .store
                    .comments_for(ticket.id)
                    .await?
                    .iter()
                    .any(|c| c.id == comment_id);
                if !on_ticket {
                    return Err(DeskError::Validation(format!(
                        "El comentario {comment_id} no pertenece al ticket"
                    )));
                }
                (*comment_id.as_uuid(), ObjectKind::Comment)
            }
            None => (*ticket.id.as_uuid(), ObjectKind::Ticket),
        };

        let now = self.clock.now();
        let attachment = attachment::inspect(
            &upload,
            object_id,
            object_kind,
            self.config.max_attachment_bytes(),
            Some(actor.id),
            now,
        )?;
        self.attachments.put(&attachment.path, &upload.bytes).await?;
        self.store.insert_attachment(&attachment).await?;

        tracing::info!(
            ticket_id = %ticket.id,
            path = %attachment.path,
            size = %attachment.display_size(),
            "Attachment stored"
        );
        self.emit(TicketEvent::AttachmentAdded {
            ticket_id: ticket.id,
            attachment_id: attachment.id,
            original_name: attachment.original_name.clone(),
            kind: attachment.kind,
            size_bytes: attachment.size_bytes,
            object_kind,
            actor: Some(actor.id),
            at: now,
        });
        self.touch(&actor).await;
        Ok(attachment)
    }
}

fn ensure_own_ticket(user: &User, ticket: &Ticket) -> Result<(), DeskError> {
    if ticket.customer == user.id {
        Ok(())
    } else {
        Err(DeskError::PermissionDenied(format!(
            "{} does not own ticket {}",
            user.username,
            ticket.id.short()
        )))
    }
}
