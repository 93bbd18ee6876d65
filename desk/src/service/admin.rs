//! Accounts, categories and the audit trail.

use super::{HelpDesk, require, require_text};
use crate::audit::AuditEntry;
use crate::error::DeskError;
use crate::policy::Capability;
use crate::store::{StoreError, TicketQuery};
use crate::ticket::Category;
use crate::types::{CategoryId, TicketId, UserId};
use crate::user::{NewUser, User, UserCommand};

/// Categories created by [`HelpDesk::seed_default_categories`]:
/// name, warranty days, requires invoice, requires serial.
const DEFAULT_CATEGORIES: [(&str, u32, bool, bool); 3] = [
    ("Hardware", 365, true, true),
    ("Software", 180, false, false),
    ("Redes", 90, true, false),
];

impl HelpDesk {
    /// Register an account.
    ///
    /// Customers may register themselves (`actor` is `None`); staff accounts
    /// need an actor holding the employee-creation capability.
    ///
    /// # Errors
    ///
    /// - [`DeskError::Validation`] for a blank username, a malformed email or a
    ///   zero ticket limit, or a taken username/email
    /// - [`DeskError::PermissionDenied`] when creating staff without rights
    #[tracing::instrument(skip(self, new_user), fields(username = %new_user.username, role = %new_user.role))]
    pub async fn register_user(
        &self,
        actor: Option<UserId>,
        new_user: NewUser,
    ) -> Result<User, DeskError> {
        require_text(&new_user.username, "El nombre de usuario es obligatorio")?;
        if !new_user.email.contains('@') {
            return Err(DeskError::Validation(format!(
                "Correo electrónico inválido: {}",
                new_user.email
            )));
        }
        if new_user.max_tickets == Some(0) {
            return Err(DeskError::Validation(
                "El límite de tickets debe ser mayor que cero".into(),
            ));
        }

        if new_user.role.is_staff() {
            let Some(actor) = actor else {
                return Err(DeskError::PermissionDenied(
                    "staff accounts must be created by an administrator".into(),
                ));
            };
            let actor = self.user(actor).await?;
            require(&actor, Capability::CreateEmployees)?;
        }

        let mut user = User::new(
            new_user.username.trim(),
            new_user.email.trim(),
            new_user.full_name.trim(),
            new_user.role,
            self.clock.now(),
        );
        if let Some(max) = new_user.max_tickets {
            user.max_tickets = max;
        }

        self.store.insert_user(&user).await.map_err(|e| match e {
            StoreError::Duplicate(what) => {
                DeskError::Validation(format!("Ya existe una cuenta con {what}"))
            }
            other => other.into(),
        })?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Run an administrative command against `target`.
    ///
    /// # Errors
    ///
    /// See [`User::apply`]; [`DeskError::NotFound`] for unknown accounts.
    #[tracing::instrument(skip(self, command), fields(command = command.name()))]
    pub async fn manage_user(
        &self,
        actor: UserId,
        target: UserId,
        command: UserCommand,
    ) -> Result<User, DeskError> {
        let actor = self.user(actor).await?;
        let mut user = self.user(target).await?;
        user.apply(&actor, command, self.clock.now())?;
        self.store.update_user(&user).await?;

        tracing::info!(
            actor = %actor.username,
            target = %user.username,
            "Account updated"
        );
        Ok(user)
    }

    /// Load an account as `viewer` sees it.
    ///
    /// Customers only see themselves; staff see any account. Internal notes
    /// and restriction/deactivation reasons are blanked unless the viewer
    /// holds [`Capability::ViewInternalNotes`].
    ///
    /// # Errors
    ///
    /// [`DeskError::PermissionDenied`] for a customer looking at someone else,
    /// [`DeskError::NotFound`] for unknown accounts.
    pub async fn user_profile(&self, viewer: UserId, user: UserId) -> Result<User, DeskError> {
        let viewer = self.user(viewer).await?;
        if !viewer.can(Capability::ManageTickets) && viewer.id != user {
            return Err(DeskError::PermissionDenied(format!(
                "{} cannot view other accounts",
                viewer.username
            )));
        }
        let user = self.user(user).await?;
        if viewer.can(Capability::ViewInternalNotes) {
            Ok(user)
        } else {
            Ok(user.redacted())
        }
    }

    /// Whether no ticket references `user` as agent or technician.
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] on backend failure.
    pub async fn can_be_deleted(&self, user: UserId) -> Result<bool, DeskError> {
        let as_agent = self
            .store
            .list_tickets(&TicketQuery::all().for_agent(user))
            .await?;
        if !as_agent.is_empty() {
            return Ok(false);
        }
        let as_technician = self
            .store
            .list_tickets(&TicketQuery::all().for_technician(user))
            .await?;
        Ok(as_technician.is_empty())
    }

    /// Create a product category.
    ///
    /// # Errors
    ///
    /// - [`DeskError::PermissionDenied`] without the category capability
    /// - [`DeskError::Validation`] for a blank or taken name
    #[tracing::instrument(skip(self, description))]
    pub async fn create_category(
        &self,
        actor: UserId,
        name: &str,
        warranty_days: u32,
        requires_invoice: bool,
        requires_serial: bool,
        description: Option<&str>,
    ) -> Result<Category, DeskError> {
        let actor = self.user(actor).await?;
        require(&actor, Capability::ManageCategories)?;
        require_text(name, "El nombre de la categoría es obligatorio")?;

        let mut category = Category::new(
            name.trim(),
            warranty_days,
            requires_invoice,
            requires_serial,
            self.clock.now(),
        );
        if let Some(description) = description {
            category = category.with_description(description);
        }
        self.insert_category(&category).await?;
        Ok(category)
    }

    /// Enable or disable a category for new tickets.
    ///
    /// # Errors
    ///
    /// [`DeskError::PermissionDenied`] without the category capability,
    /// [`DeskError::NotFound`] for an unknown category.
    pub async fn set_category_active(
        &self,
        actor: UserId,
        category: CategoryId,
        active: bool,
    ) -> Result<Category, DeskError> {
        let actor = self.user(actor).await?;
        require(&actor, Capability::ManageCategories)?;

        let mut category = self.store.get_category(category).await?;
        if category.active != active {
            category.active = active;
            self.store.update_category(&category).await?;
            tracing::info!(category = %category.name, active, "Category toggled");
        }
        Ok(category)
    }

    /// Create the stock categories that do not exist yet.
    ///
    /// Returns how many were created; running it again creates none.
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] on backend failure.
    pub async fn seed_default_categories(&self) -> Result<usize, DeskError> {
        let existing = self.store.list_categories().await?;
        let now = self.clock.now();

        let mut created = 0;
        for (name, days, invoice, serial) in DEFAULT_CATEGORIES {
            if existing.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
                continue;
            }
            let category = Category::new(name, days, invoice, serial, now);
            self.insert_category(&category).await?;
            created += 1;
        }
        Ok(created)
    }

    /// Audit entries for a ticket, newest first.
    ///
    /// # Errors
    ///
    /// [`DeskError::PermissionDenied`] without the audit capability.
    pub async fn audit_trail(
        &self,
        actor: UserId,
        ticket: TicketId,
    ) -> Result<Vec<AuditEntry>, DeskError> {
        let actor = self.user(actor).await?;
        require(&actor, Capability::ViewFullAudit)?;
        Ok(self.audit.for_ticket(ticket))
    }

    async fn insert_category(&self, category: &Category) -> Result<(), DeskError> {
        self.store.insert_category(category).await.map_err(|e| match e {
            StoreError::Duplicate(_) => DeskError::Validation(format!(
                "Ya existe una categoría llamada {}",
                category.name
            )),
            other => other.into(),
        })?;
        tracing::info!(
            category = %category.name,
            warranty_days = category.warranty_days,
            "Category created"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DEFAULT_CATEGORIES;

    #[test]
    fn test_default_categories_match_stock_setup() {
        let names: Vec<&str> = DEFAULT_CATEGORIES.iter().map(|c| c.0).collect();
        assert_eq!(names, ["Hardware", "Software", "Redes"]);
        assert!(DEFAULT_CATEGORIES[0].2 && DEFAULT_CATEGORIES[0].3);
        assert!(!DEFAULT_CATEGORIES[1].2);
    }
}
