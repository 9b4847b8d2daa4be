//! Route definitions for the Warehouse Zero inventory backend

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let upload_limit = state.config.attach.max_file_size;
    let auth = middleware::from_fn_with_state(state, auth_middleware);

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .route("/auth/login", post(handlers::login))
        // Attachment download links (public)
        .route("/attaches/open/:hash", get(handlers::open_attach))
        // Protected routes
        .merge(
            Router::new()
                .nest("/warehouses", warehouse_routes())
                .nest("/categories", category_routes())
                .nest("/measurements", measurement_routes())
                .nest("/currencies", currency_routes())
                .nest("/suppliers", supplier_routes())
                .nest("/employees", employee_routes())
                .nest("/products", product_routes())
                .nest("/attaches", attach_routes(upload_limit))
                .nest("/stock-ins", stock_in_routes())
                .nest("/stock-outs", stock_out_routes())
                .route("/expiry/run", post(handlers::run_expiry_check))
                .route_layer(auth),
        )
}

/// Warehouse and balance routes
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_warehouses).post(handlers::create_warehouse))
        .route(
            "/:warehouse_id",
            get(handlers::get_warehouse)
                .put(handlers::update_warehouse)
                .delete(handlers::delete_warehouse),
        )
        .route("/:warehouse_id/status", patch(handlers::set_warehouse_status))
        .route("/:warehouse_id/balances", get(handlers::list_balances))
        .route(
            "/:warehouse_id/balances/:product_id",
            get(handlers::get_balance),
        )
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_categories).post(handlers::create_category))
        .route("/all", get(handlers::list_all_categories))
        .route(
            "/:category_id",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
}

fn measurement_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_measurements).post(handlers::create_measurement))
        .route(
            "/:measurement_id",
            get(handlers::get_measurement)
                .put(handlers::update_measurement)
                .delete(handlers::delete_measurement),
        )
}

fn currency_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_currencies).post(handlers::create_currency))
        .route(
            "/:currency_id",
            get(handlers::get_currency)
                .put(handlers::update_currency)
                .delete(handlers::delete_currency),
        )
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .patch(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
}

fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_employees).post(handlers::create_employee))
        .route("/me", get(handlers::get_me))
        .route(
            "/:employee_id",
            get(handlers::get_employee)
                .patch(handlers::update_employee)
                .delete(handlers::delete_employee),
        )
        .route("/:employee_id/status", patch(handlers::set_employee_status))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products)
                .post(handlers::create_product)
                .delete(handlers::delete_products),
        )
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/attaches", get(handlers::list_product_attaches))
}

/// Attachment routes; uploads may exceed the default body limit
fn attach_routes(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload/:product_id",
            post(handlers::upload_attach).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/:hash",
            get(handlers::get_attach).delete(handlers::delete_attach),
        )
}

fn stock_in_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_ins).post(handlers::create_stock_in))
        .route("/daily", get(handlers::daily_stock_in_report))
        .route("/:stock_in_id", get(handlers::get_stock_in))
}

fn stock_out_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_outs).post(handlers::create_stock_out))
        .route("/daily", get(handlers::daily_stock_out_report))
        .route("/:stock_out_id", get(handlers::get_stock_out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Method, Request, StatusCode},
    };
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use shared::Role;
    use sqlx::{postgres::PgPoolOptions, PgPool};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::services::auth::Claims;
    use crate::services::fixtures::seed;

    fn run_expiry(token: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/expiry/run")
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    fn app_with(db: PgPool) -> (Router, Arc<Config>) {
        let config = Arc::new(Config::for_tests());
        let state = AppState {
            db,
            config: config.clone(),
        };
        let app = Router::new()
            .nest("/api/v1", api_routes(state.clone()))
            .with_state(state);
        (app, config)
    }

    fn test_app() -> (Router, Arc<Config>) {
        let db = PgPoolOptions::new()
            .connect_lazy(&Config::for_tests().database.url)
            .unwrap();
        app_with(db)
    }

    fn token(role: Role, secret: &str) -> String {
        token_for(7, role, secret)
    }

    fn token_for(employee_id: i64, role: Role, secret: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: employee_id.to_string(),
            phone: "+998901234567".to_string(),
            role,
            warehouse_id: Some(1),
            exp: now + 600,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/warehouses")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/stock-ins")
                    .header(AUTHORIZATION, format!("Bearer {}", token(Role::Admin, "other")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/lots")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore] // Requires database connection
    async fn test_employee_cannot_trigger_expiry_check(pool: PgPool) {
        let seed = seed(&pool).await;
        let (app, config) = app_with(pool);

        let token = token_for(seed.clerk.employee_id, Role::Employee, &config.jwt.secret);
        let response = app.oneshot(run_expiry(&token)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore] // Requires database connection
    async fn test_admin_claim_is_ignored_after_demotion(pool: PgPool) {
        let seed = seed(&pool).await;
        let token = token_for(seed.admin.employee_id, Role::Admin, &Config::for_tests().jwt.secret);

        sqlx::query("UPDATE employee SET role = 'EMPLOYEE' WHERE id = $1")
            .bind(seed.admin.employee_id)
            .execute(&pool)
            .await
            .unwrap();

        let (app, _) = app_with(pool);
        let response = app.oneshot(run_expiry(&token)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore] // Requires database connection
    async fn test_token_of_deactivated_or_deleted_employee_is_rejected(pool: PgPool) {
        let seed = seed(&pool).await;
        let secret = Config::for_tests().jwt.secret;
        let admin_token = token_for(seed.admin.employee_id, Role::Admin, &secret);
        let clerk_token = token_for(seed.clerk.employee_id, Role::Employee, &secret);

        sqlx::query("UPDATE employee SET status = 'INACTIVE' WHERE id = $1")
            .bind(seed.admin.employee_id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE employee SET deleted = TRUE WHERE id = $1")
            .bind(seed.clerk.employee_id)
            .execute(&pool)
            .await
            .unwrap();

        let (app, _) = app_with(pool);
        let response = app.clone().oneshot(run_expiry(&admin_token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(run_expiry(&clerk_token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

}
