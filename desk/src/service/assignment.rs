//! Automatic routing, manual assignment and self-assignment.

use super::{HelpDesk, require};
use crate::balancer::{self, active_count};
use crate::error::DeskError;
use crate::events::TicketEvent;
use crate::policy::Capability;
use crate::store::TicketQuery;
use crate::telemetry;
use crate::ticket::Ticket;
use crate::types::{Role, TicketId, TicketStatus, UserId, Visibility};
use crate::user::User;

impl HelpDesk {
    /// Route an open, unowned ticket to the least-loaded agent.
    ///
    /// Returns `false` without touching the ticket when it is not open, is
    /// already assigned, nobody has capacity, or a concurrent writer got there
    /// first.
    ///
    /// # Errors
    ///
    /// [`DeskError::NotFound`] for an unknown ticket, [`DeskError::Store`] on
    /// backend failure.
    #[tracing::instrument(skip(self))]
    pub async fn assign(&self, ticket_id: TicketId) -> Result<bool, DeskError> {
        let mut ticket = self.store.get_ticket(ticket_id).await?;
        if ticket.status != TicketStatus::Open || ticket.agent.is_some() {
            tracing::debug!(ticket_id = %ticket.id, status = %ticket.status, "Ticket not assignable");
            return Ok(false);
        }

        let agents = self.store.list_users(Some(Role::Agent)).await?;
        let workload = self.workload().await?;
        let Some(agent) = balancer::pick_agent(&agents, &workload).cloned() else {
            tracing::warn!(ticket_id = %ticket.id, "No agent available for automatic assignment");
            telemetry::record_assignment_miss("agent");
            return Ok(false);
        };

        let previous = ticket.status;
        ticket.agent = Some(agent.id);
        ticket.assigned_at = Some(self.clock.now());
        ticket.status = TicketStatus::InReview;
        if !self.save_or_yield(&mut ticket).await? {
            return Ok(false);
        }

        tracing::info!(
            ticket_id = %ticket.id,
            agent = %agent.username,
            load = active_count(agent.id, &workload),
            "Ticket assigned automatically"
        );
        self.announce_agent(&ticket, &agent, None).await?;
        self.announce_status(&ticket, previous, None);
        Ok(true)
    }

    /// Hand an accepted ticket to the technician with the fewest repairs.
    ///
    /// Returns `false` when the ticket is not accepted, nobody has capacity,
    /// or a concurrent writer got there first.
    ///
    /// # Errors
    ///
    /// [`DeskError::NotFound`] for an unknown ticket, [`DeskError::Store`] on
    /// backend failure.
    #[tracing::instrument(skip(self))]
    pub async fn derive_to_technician(&self, ticket_id: TicketId) -> Result<bool, DeskError> {
        let mut ticket = self.store.get_ticket(ticket_id).await?;
        if ticket.status != TicketStatus::Accepted {
            tracing::debug!(ticket_id = %ticket.id, status = %ticket.status, "Ticket not derivable");
            return Ok(false);
        }

        let technicians = self.store.list_users(Some(Role::Technician)).await?;
        let workload = self.workload().await?;
        let Some(technician) = balancer::pick_technician(&technicians, &workload).cloned() else {
            tracing::warn!(ticket_id = %ticket.id, "No technician available");
            telemetry::record_assignment_miss("technician");
            return Ok(false);
        };

        let previous = ticket.status;
        ticket.technician = Some(technician.id);
        ticket.status = TicketStatus::InRepair;
        if !self.save_or_yield(&mut ticket).await? {
            return Ok(false);
        }

        tracing::info!(
            ticket_id = %ticket.id,
            technician = %technician.username,
            "Ticket derived to technician"
        );
        self.announce_technician(&ticket, &technician, None).await;
        self.announce_status(&ticket, previous, None);
        Ok(true)
    }

    /// Try to assign every open ticket without an agent, oldest first.
    ///
    /// Returns how many were assigned. Tickets nobody can take stay in the
    /// queue for the next run; per-ticket failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] when the queue itself cannot be read.
    #[tracing::instrument(skip(self))]
    pub async fn redistribute(&self) -> Result<usize, DeskError> {
        let query = TicketQuery::all()
            .with_statuses([TicketStatus::Open])
            .unassigned();
        let mut queue = self.store.list_tickets(&query).await?;
        queue.sort_by_key(|t| t.created_at);

        let mut assigned = 0;
        for ticket in &queue {
            match self.assign(ticket.id).await {
                Ok(true) => assigned += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(ticket_id = %ticket.id, error = %e, "Redistribution skipped ticket");
                }
            }
        }

        tracing::info!(pending = queue.len(), assigned, "Redistribution finished");
        Ok(assigned)
    }

    /// Let a staff member take an unowned ticket.
    ///
    /// Technicians become the technician (status `in_repair`); everyone else
    /// becomes the agent (status `in_review`). A private note records who
    /// took it.
    ///
    /// # Errors
    ///
    /// - [`DeskError::PermissionDenied`] without the take capability
    /// - [`DeskError::Validation`] when the ticket is owned or finished
    /// - [`DeskError::CapacityExceeded`] when the actor is at their limit
    #[tracing::instrument(skip(self))]
    pub async fn take_ticket(&self, ticket_id: TicketId, actor: UserId) -> Result<Ticket, DeskError> {
        let actor = self.user(actor).await?;
        require(&actor, Capability::TakeTickets)?;

        let mut ticket = self.store.get_ticket(ticket_id).await?;
        if ticket.agent.is_some() || ticket.technician.is_some() {
            return Err(DeskError::Validation(
                "El ticket ya tiene un responsable asignado".into(),
            ));
        }
        if ticket.status.is_terminal() {
            return Err(DeskError::Validation(format!(
                "No se puede tomar un ticket en estado {}",
                ticket.status.label()
            )));
        }

        let workload = self.workload().await?;
        if !balancer::can_receive_more(&actor, &workload) {
            return Err(DeskError::CapacityExceeded {
                user: actor.id,
                active: active_count(actor.id, &workload),
                max: actor.max_tickets,
            });
        }

        let previous = ticket.status;
        let now = self.clock.now();
        if actor.role == Role::Technician {
            ticket.technician = Some(actor.id);
            ticket.status = TicketStatus::InRepair;
        } else {
            ticket.agent = Some(actor.id);
            ticket.assigned_at = Some(now);
            ticket.status = TicketStatus::InReview;
        }
        self.save(&mut ticket).await?;

        tracing::info!(ticket_id = %ticket.id, taken_by = %actor.username, "Ticket taken");
        let note = if actor.role == Role::Technician {
            self.announce_technician(&ticket, &actor, Some(actor.id)).await;
            format!("Técnico {} tomó este ticket.", actor.display_name())
        } else {
            self.announce_agent(&ticket, &actor, Some(actor.id)).await?;
            format!("{} tomó este ticket.", actor.display_name())
        };
        self.announce_status(&ticket, previous, Some(actor.id));
        self.write_system_note(&ticket, &actor, &note, Visibility::Private)
            .await?;
        self.touch(&actor).await;
        Ok(ticket)
    }

    /// Put a named agent and/or technician on a ticket by hand.
    ///
    /// Assigning an agent to an open ticket starts its review; assigning a
    /// technician to an accepted ticket starts the repair. Replacing someone
    /// already on the ticket needs [`Capability::ReassignFreely`]. Each
    /// assignment leaves a private note on the ticket.
    ///
    /// # Errors
    ///
    /// - [`DeskError::PermissionDenied`] without `AssignTickets` (agent) or
    ///   `DeriveToTechnician` (technician), or when replacing someone without
    ///   `ReassignFreely`
    /// - [`DeskError::Validation`] when nobody is named, the ticket is finished,
    ///   or a named user has the wrong role or is inactive
    /// - [`DeskError::CapacityExceeded`] when a named user is at their limit
    /// - [`DeskError::Store`] on a concurrent modification
    #[tracing::instrument(skip(self))]
    pub async fn assign_staff(
        &self,
        ticket_id: TicketId,
        actor: UserId,
        agent: Option<UserId>,
        technician: Option<UserId>,
    ) -> Result<Ticket, DeskError> {
        let actor = self.user(actor).await?;
        if agent.is_none() && technician.is_none() {
            return Err(DeskError::Validation(
                "Debe indicar un agente o un técnico".into(),
            ));
        }
        if agent.is_some() {
            require(&actor, Capability::AssignTickets)?;
        }
        if technician.is_some() {
            require(&actor, Capability::DeriveToTechnician)?;
        }

        let mut ticket = self.store.get_ticket(ticket_id).await?;
        if ticket.status.is_terminal() {
            return Err(DeskError::Validation(format!(
                "No se puede asignar un ticket en estado {}",
                ticket.status.label()
            )));
        }

        let workload = self.workload().await?;
        let agent = match agent.filter(|id| ticket.agent != Some(*id)) {
            Some(id) => {
                ensure_replaceable(&actor, ticket.agent, "agente")?;
                let user = self.user(id).await?;
                ensure_assignable(&user, AGENT_ROLES, "agente", &workload)?;
                Some(user)
            }
            None => None,
        };
        let technician = match technician.filter(|id| ticket.technician != Some(*id)) {
            Some(id) => {
                ensure_replaceable(&actor, ticket.technician, "técnico")?;
                let user = self.user(id).await?;
                ensure_assignable(&user, &[Role::Technician], "técnico", &workload)?;
                Some(user)
            }
            None => None,
        };
        if agent.is_none() && technician.is_none() {
            return Ok(ticket);
        }

        let previous = ticket.status;
        if let Some(agent) = &agent {
            ticket.agent = Some(agent.id);
            ticket.assigned_at = Some(self.clock.now());
            if ticket.status == TicketStatus::Open {
                ticket.status = TicketStatus::InReview;
            }
        }
        if let Some(technician) = &technician {
            ticket.technician = Some(technician.id);
            if ticket.status == TicketStatus::Accepted {
                ticket.status = TicketStatus::InRepair;
            }
        }
        self.save(&mut ticket).await?;

        if let Some(agent) = &agent {
            tracing::info!(
                ticket_id = %ticket.id,
                agent = %agent.username,
                by = %actor.username,
                "Agent assigned"
            );
            self.announce_agent(&ticket, agent, Some(actor.id)).await?;
            let note = format!("Ticket asignado a {}", agent.display_name());
            self.write_system_note(&ticket, &actor, &note, Visibility::Private)
                .await?;
        }
        if let Some(technician) = &technician {
            tracing::info!(
                ticket_id = %ticket.id,
                technician = %technician.username,
                by = %actor.username,
                "Technician assigned"
            );
            self.announce_technician(&ticket, technician, Some(actor.id))
                .await;
            let note = format!("Ticket derivado al técnico {}", technician.display_name());
            self.write_system_note(&ticket, &actor, &note, Visibility::Private)
                .await?;
        }
        self.announce_status(&ticket, previous, Some(actor.id));
        self.touch(&actor).await;
        Ok(ticket)
    }

    /// Non-terminal tickets, the balancer's view of current load.
    async fn workload(&self) -> Result<Vec<Ticket>, DeskError> {
        Ok(self
            .store
            .list_tickets(&TicketQuery::all().non_terminal())
            .await?)
    }

    /// Save, reporting `false` instead of an error when another writer won.
    async fn save_or_yield(&self, ticket: &mut Ticket) -> Result<bool, DeskError> {
        match self.save(ticket).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_conflict() => {
                tracing::warn!(ticket_id = %ticket.id, error = %e, "Assignment lost a concurrent update");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn announce_agent(
        &self,
        ticket: &Ticket,
        agent: &User,
        actor: Option<UserId>,
    ) -> Result<(), DeskError> {
        let automatic = actor.is_none();
        telemetry::record_assignment("agent", automatic);
        self.emit(TicketEvent::AgentAssigned {
            ticket_id: ticket.id,
            agent: agent.id,
            automatic,
            actor,
            at: self.clock.now(),
        });

        let customer = self.user(ticket.customer).await?;
        self.notifications
            .ticket_assigned(ticket, agent, &customer)
            .await;
        Ok(())
    }

    async fn announce_technician(&self, ticket: &Ticket, technician: &User, actor: Option<UserId>) {
        let automatic = actor.is_none();
        telemetry::record_assignment("technician", automatic);
        self.emit(TicketEvent::TechnicianAssigned {
            ticket_id: ticket.id,
            technician: technician.id,
            automatic,
            actor,
            at: self.clock.now(),
        });
        self.notifications
            .derived_to_technician(ticket, technician)
            .await;
    }

    /// Status event for a status moved by an assignment, if it moved.
    fn announce_status(&self, ticket: &Ticket, previous: TicketStatus, actor: Option<UserId>) {
        if ticket.status == previous {
            return;
        }
        telemetry::record_status_change(ticket.status.as_str());
        self.emit(TicketEvent::StatusChanged {
            ticket_id: ticket.id,
            from: previous,
            to: ticket.status,
            actor,
            reason: None,
            at: self.clock.now(),
        });
    }
}

const AGENT_ROLES: &[Role] = &[Role::Agent, Role::LegacyEmployee, Role::SuperAdmin];

fn ensure_replaceable(actor: &User, current: Option<UserId>, slot: &str) -> Result<(), DeskError> {
    if current.is_some() && !actor.can(Capability::ReassignFreely) {
        return Err(DeskError::PermissionDenied(format!(
            "{} cannot replace the {slot} already on the ticket",
            actor.username
        )));
    }
    Ok(())
}

fn ensure_assignable(
    user: &User,
    roles: &[Role],
    slot: &str,
    workload: &[Ticket],
) -> Result<(), DeskError> {
    if !roles.contains(&user.role) || !user.is_active() {
        return Err(DeskError::Validation(format!(
            "{} no puede ser asignado como {slot}",
            user.display_name()
        )));
    }
    if !balancer::can_receive_more(user, workload) {
        return Err(DeskError::CapacityExceeded {
            user: user.id,
            active: active_count(user.id, workload),
            max: user.max_tickets,
        });
    }
    Ok(())
}
