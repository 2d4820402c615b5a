use crate::db::DbPool;
use crate::entities::customer::{self, CustomerRole, Entity as Customer};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Fields accepted when creating a customer profile.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub email: String,
    pub full_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
}

/// Contact-data updates. `role` changes require a staff actor.
#[derive(Debug, Clone, Default)]
pub struct CustomerUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub role: Option<CustomerRole>,
}

pub struct CustomerService {
    db: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, new))]
    pub async fn create_customer(&self, new: NewCustomer) -> Result<customer::Model, ServiceError> {
        if new.email.trim().is_empty() {
            return Err(ServiceError::Validation("email must not be empty".into()));
        }
        if new.full_name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "full name must not be empty".into(),
            ));
        }

        let existing = Customer::find()
            .filter(customer::Column::Email.eq(new.email.as_str()))
            .one(self.db.as_ref())
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Validation(format!(
                "a customer with email {} already exists",
                new.email
            )));
        }

        let model = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(new.email),
            full_name: Set(new.full_name),
            role: Set(CustomerRole::Customer),
            address: Set(new.address),
            city: Set(new.city),
            postal_code: Set(new.postal_code),
            phone: Set(new.phone),
            created_at: Set(Utc::now()),
        };

        Ok(model.insert(self.db.as_ref()).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_customer(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        Customer::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))
    }

    #[instrument(skip(self, update))]
    pub async fn update_customer(
        &self,
        id: Uuid,
        actor_id: Option<Uuid>,
        update: CustomerUpdate,
    ) -> Result<customer::Model, ServiceError> {
        let existing = self.get_customer(id).await?;

        if update.role.is_some() {
            let actor_id = actor_id.ok_or_else(|| {
                ServiceError::Unauthorized("role changes require an acting customer".into())
            })?;
            let actor = self.get_customer(actor_id).await?;
            if !actor.is_staff() {
                return Err(ServiceError::Unauthorized(
                    "only staff may change customer roles".into(),
                ));
            }
        }

        let mut active: customer::ActiveModel = existing.into();
        if let Some(email) = update.email {
            if email.trim().is_empty() {
                return Err(ServiceError::Validation("email must not be empty".into()));
            }
            active.email = Set(email);
        }
        if let Some(full_name) = update.full_name {
            active.full_name = Set(full_name);
        }
        if let Some(role) = update.role {
            active.role = Set(role);
        }
        if update.address.is_some() {
            active.address = Set(update.address);
        }
        if update.city.is_some() {
            active.city = Set(update.city);
        }
        if update.postal_code.is_some() {
            active.postal_code = Set(update.postal_code);
        }
        if update.phone.is_some() {
            active.phone = Set(update.phone);
        }

        Ok(active.update(self.db.as_ref()).await?)
    }
}
