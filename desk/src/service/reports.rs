//! Metrics and workload reports.

use super::HelpDesk;
use crate::balancer::{self, WorkloadReport};
use crate::error::DeskError;
use crate::reporting::{
    self, AgentMetrics, AgentPerformance, CustomerStats, DateRange, MetricsRecord,
};
use crate::store::TicketQuery;
use crate::types::{Role, UserId};
use chrono::{DateTime, Duration, Utc};

impl HelpDesk {
    fn range(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> DateRange {
        DateRange::resolve(start, end, self.clock.now(), self.config.metrics_window_days)
    }

    /// System-wide metrics for tickets created between `start` and `end`.
    ///
    /// Missing bounds default to the last `metrics_window_days` days.
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] on backend failure.
    #[tracing::instrument(skip(self))]
    pub async fn general_metrics(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<MetricsRecord, DeskError> {
        let range = self.range(start, end);
        let tickets = self
            .store
            .list_tickets(&TicketQuery::all().created_between(range.start, range.end))
            .await?;
        let categories = self.store.list_categories().await?;

        Ok(reporting::general_metrics(
            &tickets,
            &categories,
            range,
            self.clock.now(),
            &self.config.sla,
        ))
    }

    /// The same metrics scoped to each agent.
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] on backend failure.
    #[tracing::instrument(skip(self))]
    pub async fn per_agent_metrics(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<AgentMetrics>, DeskError> {
        let range = self.range(start, end);
        let agents = self.store.list_users(Some(Role::Agent)).await?;
        let tickets = self
            .store
            .list_tickets(&TicketQuery::all().created_between(range.start, range.end))
            .await?;
        let categories = self.store.list_categories().await?;

        Ok(reporting::per_agent_metrics(
            &agents,
            &tickets,
            &categories,
            range,
            self.clock.now(),
            &self.config.sla,
        ))
    }

    /// Current load of every active agent and technician.
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] on backend failure.
    pub async fn workload_report(&self) -> Result<WorkloadReport, DeskError> {
        let users = self.store.list_users(None).await?;
        let tickets = self
            .store
            .list_tickets(&TicketQuery::all().non_terminal())
            .await?;

        Ok(balancer::workload_report(
            &users,
            &tickets,
            self.clock.now(),
            Duration::hours(self.config.stale_review_hours),
        ))
    }

    /// Performance of one staff member across all their tickets.
    ///
    /// # Errors
    ///
    /// [`DeskError::NotFound`] for an unknown user, [`DeskError::Validation`]
    /// when the user is a customer.
    pub async fn agent_performance(&self, user: UserId) -> Result<AgentPerformance, DeskError> {
        let user = self.user(user).await?;
        if !user.role.is_staff() {
            return Err(DeskError::Validation(format!(
                "{} no es un miembro del personal",
                user.username
            )));
        }
        let tickets = self.store.list_tickets(&TicketQuery::all()).await?;
        Ok(reporting::agent_performance(&user, &tickets))
    }

    /// Claim history of one customer.
    ///
    /// # Errors
    ///
    /// [`DeskError::NotFound`] for an unknown user.
    pub async fn customer_stats(&self, customer: UserId) -> Result<CustomerStats, DeskError> {
        let customer = self.user(customer).await?;
        let tickets = self
            .store
            .list_tickets(&TicketQuery::all().for_customer(customer.id))
            .await?;
        Ok(reporting::customer_stats(customer.id, &tickets))
    }
}
