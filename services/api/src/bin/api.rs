//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{clock::SystemClock, db::DbAdapter},
    config::Config,
    error::ApiError,
    web::{
        auth::{
            login_handler, logout_handler, me_handler, register_handler, update_profile_handler,
        },
        bills::{
            bill_history_handler, create_bill_handler, delete_bill_handler, list_bills_handler,
            update_bill_handler,
        },
        dashboard::dashboard_handler,
        expenses::{
            create_expense_handler, delete_expense_handler, expense_history_handler,
            list_deleted_expenses_handler, list_expenses_handler, restore_expense_handler,
            update_expense_handler,
        },
        incomes::{create_income_handler, delete_income_handler, list_incomes_handler},
        members::{delete_member_handler, list_members_handler, update_member_role_handler},
        middleware::require_auth,
        notifications::{
            create_notification_handler, list_notifications_handler, update_notification_handler,
        },
        rest::ApiDoc,
        state::AppState,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store,
        clock: Arc::new(SystemClock),
        config: config.clone(),
    });

    // --- 4. Configure CORS for the Browser Client ---
    let cors_origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|_| ApiError::Internal(format!("Invalid CORS_ORIGIN '{}'", config.cors_origin)))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/auth/profile", put(update_profile_handler))
        .route("/dashboard", get(dashboard_handler))
        .route(
            "/expenses",
            get(list_expenses_handler).post(create_expense_handler),
        )
        .route("/expenses/deleted", get(list_deleted_expenses_handler))
        .route(
            "/expenses/{id}",
            put(update_expense_handler).delete(delete_expense_handler),
        )
        .route("/expenses/{id}/restore", post(restore_expense_handler))
        .route("/expenses/{id}/history", get(expense_history_handler))
        .route(
            "/recurring-bills",
            get(list_bills_handler).post(create_bill_handler),
        )
        .route(
            "/recurring-bills/{id}",
            put(update_bill_handler).delete(delete_bill_handler),
        )
        .route("/recurring-bills/{id}/history", get(bill_history_handler))
        .route(
            "/incomes",
            get(list_incomes_handler).post(create_income_handler),
        )
        .route("/incomes/{id}", delete(delete_income_handler))
        .route("/members", get(list_members_handler))
        .route("/members/{id}", delete(delete_member_handler))
        .route("/members/{id}/role", put(update_member_role_handler))
        .route(
            "/notifications",
            get(list_notifications_handler).post(create_notification_handler),
        )
        .route("/notifications/{id}", put(update_notification_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
