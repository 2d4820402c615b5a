#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

use snakeshop_api as api;
use snakeshop_api::entities::{category, customer, product};

/// Per-test application: its own SQLite file, migrated schema, event task,
/// and a gateway pointed wherever the test wants (usually a wiremock server).
pub struct TestApp {
    pub state: Arc<api::AppState>,
    pub db: Arc<api::db::DbPool>,
    _tmp: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_gateway(None).await
    }

    pub async fn spawn_with_gateway(gateway_base_url: Option<String>) -> Self {
        let (app, event_rx) = Self::spawn_capturing_events(gateway_base_url).await;
        tokio::spawn(api::events::process_events(event_rx));
        app
    }

    /// Like `spawn_with_gateway`, but hands the event receiver to the test
    /// instead of draining it into the log loop.
    pub async fn spawn_capturing_events(
        gateway_base_url: Option<String>,
    ) -> (Self, mpsc::Receiver<api::events::Event>) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let db_path = tmp.path().join("snakeshop-test.db");
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let mut cfg = api::config::AppConfig::new(database_url, "127.0.0.1", 0, "test");
        // One pooled connection serializes concurrent SQLite writers.
        cfg.db_max_connections = 1;
        cfg.gateway.timeout_secs = 2;
        if let Some(base_url) = gateway_base_url {
            cfg.gateway.base_url = base_url;
        }

        let db = api::db::establish_connection_from_app_config(&cfg)
            .await
            .expect("connect test db");
        api::db::run_migrations(&db).await.expect("migrate test db");
        let db = Arc::new(db);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = api::events::EventSender::new(event_tx);

        let config = Arc::new(cfg);
        let gateway = Arc::new(
            api::gateway::PaymentGateway::new(config.gateway.clone()).expect("gateway client"),
        );
        let mailer: Arc<dyn api::mailer::Mailer> =
            Arc::new(api::mailer::LogMailer::new(&config.mailer));

        let services = api::AppServices::new(
            db.clone(),
            event_sender.clone(),
            config.clone(),
            gateway,
            mailer,
        );
        let state = Arc::new(api::AppState {
            db: db.clone(),
            config,
            services,
            event_sender,
        });

        (
            Self {
                state,
                db,
                _tmp: tmp,
            },
            event_rx,
        )
    }

    pub fn router(&self) -> axum::Router {
        api::app_router(self.state.clone())
    }

    pub async fn seed_customer(&self, role: customer::CustomerRole) -> customer::Model {
        let id = Uuid::new_v4();
        customer::ActiveModel {
            id: Set(id),
            email: Set(format!("{}@example.com", id.simple())),
            full_name: Set("Test Customer".into()),
            role: Set(role),
            address: Set(Some("Av. Siempre Viva 742".into())),
            city: Set(Some("Santiago".into())),
            postal_code: Set(Some("8320000".into())),
            phone: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed customer")
    }

    pub async fn seed_category(&self, name: &str, slug: &str) -> category::Model {
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.into()),
            slug: Set(slug.into()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed category")
    }

    pub async fn seed_product(
        &self,
        name: &str,
        price: Decimal,
        promo_price: Option<Decimal>,
        on_promotion: bool,
        stock: i32,
    ) -> product::Model {
        let id = Uuid::new_v4();
        let now = Utc::now();
        product::ActiveModel {
            id: Set(id),
            category_id: Set(None),
            seller_id: Set(None),
            name: Set(name.into()),
            slug: Set(format!("{}-{}", name.to_lowercase().replace(' ', "-"), id.simple())),
            description: Set(String::new()),
            price: Set(price),
            promo_price: Set(promo_price),
            on_promotion: Set(on_promotion),
            stock: Set(stock),
            available: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed product")
    }

    /// Creates a cart and fills it with the given (product, quantity) pairs.
    pub async fn cart_with(
        &self,
        customer_id: Option<Uuid>,
        items: &[(&product::Model, i32)],
    ) -> Uuid {
        let cart = self
            .state
            .services
            .carts
            .create_cart(customer_id)
            .await
            .expect("create cart");
        for (product, quantity) in items {
            self.state
                .services
                .carts
                .add_item(cart.id, product.id, *quantity, false)
                .await
                .expect("add item");
        }
        cart.id
    }

    pub async fn product_stock(&self, product_id: Uuid) -> i32 {
        product::Entity::find_by_id(product_id)
            .one(self.db.as_ref())
            .await
            .expect("load product")
            .expect("product exists")
            .stock
    }
}
