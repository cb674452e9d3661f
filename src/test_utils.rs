#[cfg(test)]
pub mod test_utils {
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use model::entities::{collector, user};
    use moka::future::Cache;
    use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    /// Seeded fixture rows every integration test can lean on.
    pub struct TestSeed {
        pub admin: user::Model,
        pub supervisor: user::Model,
        pub rossana_user: user::Model,
        pub rossana: collector::Model,
        pub dante_user: user::Model,
        pub dante: collector::Model,
    }

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");
        db.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .expect("Failed to enable foreign keys");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    async fn seed_user(db: &DatabaseConnection, username: &str, role: user::UserRole) -> user::Model {
        user::ActiveModel {
            username: Set(username.to_string()),
            full_name: Set(username.to_string()),
            role: Set(role),
            status: Set(user::UserStatus::Active),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create test user")
    }

    async fn seed_collector(
        db: &DatabaseConnection,
        name: &str,
        user_id: i32,
    ) -> collector::Model {
        collector::ActiveModel {
            name: Set(name.to_string()),
            user_id: Set(Some(user_id)),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create test collector")
    }

    /// Create AppState for testing, seeded with the standard office
    pub async fn setup_test_app_state() -> (AppState, TestSeed) {
        let db = setup_test_db().await;

        let admin = seed_user(&db, "admin", user::UserRole::Admin).await;
        let supervisor = seed_user(&db, "supervisor", user::UserRole::Supervisor).await;
        let rossana_user = seed_user(&db, "rossana", user::UserRole::Collector).await;
        let rossana = seed_collector(&db, "Rossana", rossana_user.id).await;
        let dante_user = seed_user(&db, "dante", user::UserRole::Collector).await;
        let dante = seed_collector(&db, "Dante", dante_user.id).await;

        let cache = Cache::new(100);
        let state = AppState { db, cache };
        let seed = TestSeed {
            admin,
            supervisor,
            rossana_user,
            rossana,
            dante_user,
            dante,
        };
        (state, seed)
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is determined by the RUST_LOG environment variable,
    /// defaulting to WARN if not set.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr) // Output to stderr, which is captured by tests
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create an axum test server over a freshly seeded app
    pub async fn setup_test_server() -> (TestServer, TestSeed) {
        let _ = init_test_tracing();

        let (state, seed) = setup_test_app_state().await;
        let router = create_router(state);
        let server = TestServer::new(router).expect("Failed to start test server");
        (server, seed)
    }

    /// Identity headers the upstream auth middleware would attach.
    pub fn auth_headers(user: &user::Model) -> Vec<(HeaderName, HeaderValue)> {
        let role = match user.role {
            user::UserRole::Admin => "admin",
            user::UserRole::Supervisor => "supervisor",
            user::UserRole::Collector => "collector",
        };
        vec![
            (
                HeaderName::from_static("x-user-id"),
                HeaderValue::from_str(&user.id.to_string()).expect("invalid header value"),
            ),
            (
                HeaderName::from_static("x-user-role"),
                HeaderValue::from_static(role),
            ),
        ]
    }
}
