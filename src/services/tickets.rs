use crate::db::DbPool;
use crate::entities::customer::{self, Entity as Customer};
use crate::entities::support_ticket::{self, Entity as SupportTicket, TicketKind, TicketStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::mailer::Mailer;
use crate::services::sequences::{next_folio, FolioKind};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set, TransactionTrait};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Fields accepted when opening a support ticket. Guests identify themselves
/// with name and email; known customers may attach their id.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub customer_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub kind: TicketKind,
    pub order_folio: Option<String>,
    pub subject: String,
    pub body: String,
}

pub struct TicketService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    mailer: Arc<dyn Mailer>,
}

impl TicketService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            event_sender,
            mailer,
        }
    }

    /// Opens a ticket with a fresh folio and sends a best-effort
    /// confirmation mail. Mail failures are logged, never surfaced.
    #[instrument(skip(self, new))]
    pub async fn open_ticket(
        &self,
        new: NewTicket,
    ) -> Result<support_ticket::Model, ServiceError> {
        if new.full_name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "full name must not be empty".into(),
            ));
        }
        if new.email.trim().is_empty() {
            return Err(ServiceError::Validation("email must not be empty".into()));
        }
        if new.subject.trim().is_empty() {
            return Err(ServiceError::Validation(
                "subject must not be empty".into(),
            ));
        }
        if new.body.trim().is_empty() {
            return Err(ServiceError::Validation("body must not be empty".into()));
        }

        let txn = self.db.begin().await?;
        let folio = next_folio(&txn, FolioKind::Ticket).await?;

        let now = Utc::now();
        let model = support_ticket::ActiveModel {
            id: Set(Uuid::new_v4()),
            folio: Set(folio.clone()),
            customer_id: Set(new.customer_id),
            full_name: Set(new.full_name),
            email: Set(new.email),
            kind: Set(new.kind),
            order_folio: Set(new.order_folio),
            subject: Set(new.subject),
            body: Set(new.body),
            status: Set(TicketStatus::Open),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::TicketOpened {
                ticket_id: created.id,
                folio: folio.clone(),
            })
            .await;

        let subject = format!("Support request {} received", folio);
        let body = format!("We received your request {} and will be in touch.", folio);
        if let Err(err) = self.mailer.send(&created.email, &subject, &body).await {
            warn!(%folio, "ticket confirmation mail failed: {}", err);
        }

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list_tickets(
        &self,
        actor_id: Uuid,
    ) -> Result<Vec<support_ticket::Model>, ServiceError> {
        self.require_privileged(actor_id).await?;
        Ok(SupportTicket::find()
            .order_by_desc(support_ticket::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        actor_id: Uuid,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<support_ticket::Model, ServiceError> {
        self.require_privileged(actor_id).await?;

        let ticket = SupportTicket::find_by_id(ticket_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Ticket {} not found", ticket_id)))?;

        let mut active: support_ticket::ActiveModel = ticket.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.db.as_ref()).await?)
    }

    async fn require_privileged(&self, actor_id: Uuid) -> Result<customer::Model, ServiceError> {
        let actor = Customer::find_by_id(actor_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", actor_id)))?;
        if !actor.is_privileged() {
            return Err(ServiceError::Unauthorized(
                "ticket management requires a seller or staff role".into(),
            ));
        }
        Ok(actor)
    }
}
