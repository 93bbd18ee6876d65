//! Ticket creation, edits, status changes and warranty checks.

use super::{HelpDesk, require, require_text};
use crate::error::DeskError;
use crate::events::TicketEvent;
use crate::lifecycle::{TransitionOutcome, can_transition};
use crate::policy::{Capability, can_edit};
use crate::telemetry;
use crate::ticket::{Comment, Ticket, TicketDraft, TicketEdit};
use crate::types::{FileKind, ObjectKind, TicketId, TicketStatus, UserId, Visibility};
use crate::user::User;
use crate::warranty::{self, MISSING_DATA_MESSAGE, ValidationReport};

impl HelpDesk {
    /// File a new ticket for `customer`.
    ///
    /// When auto-assignment is on and the customer is not restricted, the
    /// ticket is immediately offered to the least-loaded agent; the returned
    /// ticket reflects that assignment if it happened.
    ///
    /// # Errors
    ///
    /// - [`DeskError::PermissionDenied`] when the user cannot create tickets or
    ///   is inactive
    /// - [`DeskError::Validation`] for an empty subject/description or an
    ///   inactive category
    /// - [`DeskError::NotFound`] for an unknown user or category
    #[tracing::instrument(skip(self, draft), fields(subject = %draft.subject))]
    pub async fn create_ticket(
        &self,
        customer: UserId,
        draft: TicketDraft,
    ) -> Result<Ticket, DeskError> {
        let customer = self.user(customer).await?;
        require(&customer, Capability::CreateTickets)?;
        if !customer.is_active() {
            return Err(DeskError::PermissionDenied(format!(
                "account {} is inactive",
                customer.username
            )));
        }
        require_text(&draft.subject, "El asunto es obligatorio")?;
        require_text(&draft.description, "La descripción es obligatoria")?;

        let category = match draft.category {
            Some(id) => {
                let category = self.store.get_category(id).await?;
                if !category.active {
                    return Err(DeskError::Validation(format!(
                        "La categoría {} no está activa",
                        category.name
                    )));
                }
                Some(category)
            }
            None => None,
        };

        let now = self.clock.now();
        let mut ticket = Ticket::new(draft, customer.id, now);
        ticket.prepare_for_save(category.as_ref(), now);
        self.store.insert_ticket(&ticket).await?;

        tracing::info!(
            ticket_id = %ticket.id,
            customer = %customer.username,
            priority = %ticket.priority,
            "Ticket created"
        );
        telemetry::record_ticket_created(ticket.priority.as_str());
        self.emit(TicketEvent::TicketCreated {
            ticket_id: ticket.id,
            customer: customer.id,
            subject: ticket.subject.clone(),
            invoice_number: ticket.invoice_number.clone(),
            category: category.map(|c| c.name),
            priority: ticket.priority,
            at: now,
        });
        self.notifications.ticket_created(&ticket, &customer).await;
        self.touch(&customer).await;

        if !self.config.auto_assign {
            return Ok(ticket);
        }
        if customer.restricted {
            tracing::info!(
                ticket_id = %ticket.id,
                "Customer is restricted, ticket left for manual review"
            );
            return Ok(ticket);
        }
        if self.assign(ticket.id).await? {
            ticket = self.store.get_ticket(ticket.id).await?;
        }
        Ok(ticket)
    }

    /// Edit a ticket's claim data.
    ///
    /// Changing the purchase date or the category triggers a warranty
    /// recomputation on save.
    ///
    /// # Errors
    ///
    /// - [`DeskError::PermissionDenied`] when the actor cannot edit the ticket
    /// - [`DeskError::Validation`] when switching to an inactive category
    /// - [`DeskError::Store`] on a concurrent modification
    #[tracing::instrument(skip(self, edit))]
    pub async fn update_ticket_details(
        &self,
        ticket_id: TicketId,
        actor: UserId,
        edit: TicketEdit,
    ) -> Result<Ticket, DeskError> {
        let actor = self.user(actor).await?;
        let mut ticket = self.store.get_ticket(ticket_id).await?;
        if !can_edit(&actor, &ticket) {
            return Err(DeskError::PermissionDenied(format!(
                "{} cannot edit ticket {}",
                actor.username,
                ticket.id.short()
            )));
        }
        if let Some(category) = edit.category {
            let category = self.store.get_category(category).await?;
            if !category.active {
                return Err(DeskError::Validation(format!(
                    "La categoría {} no está activa",
                    category.name
                )));
            }
        }

        if ticket.apply_edit(edit) {
            self.save(&mut ticket).await?;
            tracing::info!(ticket_id = %ticket.id, editor = %actor.username, "Ticket edited");
        }
        Ok(ticket)
    }

    /// Move a ticket to `new_status` on behalf of `actor`.
    ///
    /// Transitions outside the actor's table come back as a refused
    /// [`TransitionOutcome`]. Moving to `resolved` must go through
    /// [`HelpDesk::resolve_with_explanation`]. An applied change leaves a
    /// public note on the ticket with the old and new status and the reason.
    ///
    /// # Errors
    ///
    /// - [`DeskError::PermissionDenied`] when the actor cannot change status
    /// - [`DeskError::Validation`] when rejecting without a reason
    /// - [`DeskError::Store`] on a concurrent modification
    #[tracing::instrument(skip(self, reason))]
    pub async fn change_status(
        &self,
        ticket_id: TicketId,
        actor: UserId,
        new_status: TicketStatus,
        reason: Option<String>,
    ) -> Result<TransitionOutcome, DeskError> {
        let actor = self.user(actor).await?;
        require(&actor, Capability::ChangeTicketStatus)?;
        let mut ticket = self.store.get_ticket(ticket_id).await?;
        let previous = ticket.status;

        if previous == new_status {
            return Ok(TransitionOutcome::refused(format!(
                "El ticket ya está en estado {}",
                new_status.label()
            )));
        }

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        if new_status == TicketStatus::Rejected && reason.is_none() {
            return Err(DeskError::Validation(
                "Debe indicar el motivo del rechazo".into(),
            ));
        }

        if new_status == TicketStatus::Resolved {
            return Ok(TransitionOutcome::refused(
                "Para resolver el ticket use la resolución con explicación",
            ));
        }

        if !can_transition(actor.role, previous, new_status) {
            tracing::info!(
                ticket_id = %ticket.id,
                role = %actor.role,
                from = %previous,
                to = %new_status,
                "Transition refused"
            );
            return Ok(TransitionOutcome::refused(format!(
                "Transición no permitida: {} → {}",
                previous.label(),
                new_status.label()
            )));
        }

        ticket.status = new_status;
        if new_status == TicketStatus::Rejected {
            ticket.rejection_reason.clone_from(&reason);
        }
        self.save(&mut ticket).await?;

        let note = match &reason {
            Some(reason) => format!(
                "Estado cambiado de '{}' a '{}'\n\nMotivo: {reason}",
                previous.label(),
                new_status.label()
            ),
            None => format!(
                "Estado cambiado de '{}' a '{}'",
                previous.label(),
                new_status.label()
            ),
        };
        self.write_system_note(&ticket, &actor, &note, Visibility::Public)
            .await?;

        self.after_transition(&ticket, previous, &actor, reason).await?;
        Ok(TransitionOutcome::applied(format!(
            "Estado actualizado a {}",
            new_status.label()
        )))
    }

    /// Resolve a ticket with an explanation.
    ///
    /// Appends a public resolving comment, sets the status to `resolved` and
    /// stamps the resolution time.
    ///
    /// # Errors
    ///
    /// - [`DeskError::PermissionDenied`] when the actor cannot change status
    /// - [`DeskError::Validation`] for an empty explanation
    /// - [`DeskError::Store`] on a concurrent modification
    #[tracing::instrument(skip(self, explanation))]
    pub async fn resolve_with_explanation(
        &self,
        ticket_id: TicketId,
        actor: UserId,
        explanation: &str,
    ) -> Result<TransitionOutcome, DeskError> {
        let actor = self.user(actor).await?;
        require(&actor, Capability::ChangeTicketStatus)?;
        require_text(explanation, "Debes proporcionar una descripción de la resolución.")?;

        let ticket = self.store.get_ticket(ticket_id).await?;
        let previous = ticket.status;
        if previous == TicketStatus::Resolved {
            return Ok(TransitionOutcome::refused("El ticket ya está resuelto"));
        }
        if !can_transition(actor.role, previous, TicketStatus::Resolved) {
            return Ok(TransitionOutcome::refused(format!(
                "Transición no permitida: {} → {}",
                previous.label(),
                TicketStatus::Resolved.label()
            )));
        }

        let text = format!("**TICKET RESUELTO**\n\n{}", explanation.trim());
        self.write_comment(ticket, &actor, &text, Visibility::Public, true)
            .await?;

        Ok(TransitionOutcome::applied("Ticket resuelto"))
    }

    /// Emit events, metrics and notifications for an applied transition.
    pub(super) async fn after_transition(
        &self,
        ticket: &Ticket,
        previous: TicketStatus,
        actor: &User,
        reason: Option<String>,
    ) -> Result<(), DeskError> {
        let now = self.clock.now();
        tracing::info!(
            ticket_id = %ticket.id,
            actor = %actor.username,
            from = %previous,
            to = %ticket.status,
            "Ticket status changed"
        );
        telemetry::record_status_change(ticket.status.as_str());

        self.emit(TicketEvent::StatusChanged {
            ticket_id: ticket.id,
            from: previous,
            to: ticket.status,
            actor: Some(actor.id),
            reason,
            at: now,
        });
        if ticket.status == TicketStatus::Closed {
            self.emit(TicketEvent::TicketClosed {
                ticket_id: ticket.id,
                actor: Some(actor.id),
                at: now,
            });
        }
        if previous == TicketStatus::Closed {
            self.emit(TicketEvent::TicketReopened {
                ticket_id: ticket.id,
                to: ticket.status,
                actor: Some(actor.id),
                at: now,
            });
        }

        let customer = self.user(ticket.customer).await?;
        let agent = self.optional_user(ticket.agent).await?;
        self.notifications
            .status_changed(ticket, previous, actor, &customer, agent.as_ref())
            .await;
        self.touch(actor).await;
        Ok(())
    }

    /// Check warranty coverage and persist the verdict.
    ///
    /// Returns `(false, "Faltan datos para validar la garantía")` when the
    /// purchase date or category is missing.
    ///
    /// # Errors
    ///
    /// - [`DeskError::NotFound`] for an unknown ticket or category
    /// - [`DeskError::Store`] on a concurrent modification
    pub async fn validate_warranty(&self, ticket_id: TicketId) -> Result<(bool, String), DeskError> {
        let mut ticket = self.store.get_ticket(ticket_id).await?;
        let category = self.category_of(&ticket).await?;

        let status = match warranty::evaluate(
            ticket.purchase_date(),
            category.as_ref().map(|c| c.warranty_days),
            self.clock.today(),
        ) {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(ticket_id = %ticket.id, error = %e, "Warranty cannot be computed");
                return Ok((false, MISSING_DATA_MESSAGE.to_string()));
            }
        };

        let warranty_days = category.map_or(0, |c| c.warranty_days);
        let message = status.message(warranty_days);
        if ticket.warranty_valid != status.valid
            || ticket.warranty_expires_on != Some(status.expires_on)
        {
            ticket.warranty_valid = status.valid;
            ticket.warranty_expires_on = Some(status.expires_on);
            self.save(&mut ticket).await?;
        }

        tracing::info!(ticket_id = %ticket.id, valid = status.valid, "Warranty validated");
        Ok((status.valid, message))
    }

    /// Full check: warranty coverage plus required documents.
    ///
    /// # Errors
    ///
    /// Same as [`HelpDesk::validate_warranty`].
    pub async fn validate_ticket(&self, ticket_id: TicketId) -> Result<ValidationReport, DeskError> {
        let (warranty_valid, message) = self.validate_warranty(ticket_id).await?;

        let ticket = self.store.get_ticket(ticket_id).await?;
        let category = self.category_of(&ticket).await?;
        let has_document = self
            .store
            .attachments_for(*ticket.id.as_uuid(), ObjectKind::Ticket)
            .await?
            .iter()
            .any(|a| a.kind == FileKind::Document);

        let missing = warranty::missing_documents(&ticket, category.as_ref(), has_document);
        Ok(ValidationReport::new(warranty_valid, message, missing))
    }

    /// Apply a comment to `ticket` and persist both.
    ///
    /// The first comment from staff stamps the first response; a resolving
    /// comment moves the ticket to `resolved`.
    pub(super) async fn write_comment(
        &self,
        mut ticket: Ticket,
        author: &User,
        text: &str,
        visibility: Visibility,
        resolves: bool,
    ) -> Result<Comment, DeskError> {
        let previous = ticket.status;
        let mut comment = Comment::new(ticket.id, author.id, text, visibility, self.clock.now());
        comment.resolves_ticket = resolves;
        let comment = self.record_comment(&mut ticket, author, comment).await?;

        let participants = self.participants(&ticket).await?;
        self.notifications
            .new_comment(&comment, &ticket, author, &participants)
            .await;

        if ticket.status != previous {
            self.after_transition(&ticket, previous, author, None).await?;
        } else {
            self.touch(author).await;
        }
        Ok(comment)
    }

    /// Record a note the desk writes for `author` after a status change or
    /// an assignment.
    ///
    /// Notes never stamp the first response and nobody is notified about
    /// them; the change itself already was.
    pub(super) async fn write_system_note(
        &self,
        ticket: &Ticket,
        author: &User,
        text: &str,
        visibility: Visibility,
    ) -> Result<Comment, DeskError> {
        let mut comment = Comment::new(ticket.id, author.id, text, visibility, self.clock.now());
        comment.is_system = true;
        self.record_comment(&mut ticket.clone(), author, comment)
            .await
    }

    /// Stamp, store and audit `comment`, saving `ticket` when it changes.
    async fn record_comment(
        &self,
        ticket: &mut Ticket,
        author: &User,
        mut comment: Comment,
    ) -> Result<Comment, DeskError> {
        let now = comment.created_at;
        if !comment.is_system
            && author.can(Capability::ManageTickets)
            && ticket.first_response_at.is_none()
        {
            ticket.first_response_at = Some(now);
            comment.is_first_response = true;
        }
        if comment.resolves_ticket {
            ticket.status = TicketStatus::Resolved;
            if ticket.resolved_at.is_none() {
                ticket.resolved_at = Some(now);
            }
        }

        if comment.is_first_response || comment.resolves_ticket {
            self.save(ticket).await?;
        }
        self.store.insert_comment(&comment).await?;

        self.emit(TicketEvent::CommentAdded {
            ticket_id: ticket.id,
            comment_id: comment.id,
            author: author.id,
            author_name: author.full_name.clone(),
            visibility: comment.visibility,
            text_len: comment.text.chars().count(),
            resolves: comment.resolves_ticket,
            at: now,
        });
        Ok(comment)
    }

    async fn participants(&self, ticket: &Ticket) -> Result<Vec<User>, DeskError> {
        let mut users = vec![self.user(ticket.customer).await?];
        for id in [ticket.agent, ticket.technician].into_iter().flatten() {
            users.push(self.user(id).await?);
        }
        Ok(users)
    }
}
