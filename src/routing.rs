//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    middleware,
    response::Redirect,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::auth_guard,
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_page,
        get_edit_category_page, update_category_endpoint,
    },
    dashboard::get_dashboard_page,
    endpoints,
    health::get_health,
    internal_server_error::get_internal_server_error_page,
    language::set_language_endpoint,
    log_in::{get_log_in_page, post_log_in},
    log_out::get_log_out,
    not_found::get_404_not_found,
    profile::{change_password_endpoint, get_profile_page, update_profile_endpoint},
    register::{get_register_page, post_register},
    report::{export_report_endpoint, get_reports_page},
    statistics::{get_statistics_endpoint, get_transactions_chart_endpoint},
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_edit_transaction_page,
        get_transactions_page, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::REGISTER_VIEW, post(post_register))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_VIEW, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::SET_LANGUAGE, get(set_language_endpoint))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::CREATE_TRANSACTION, post(create_transaction_endpoint))
        .route(
            endpoints::EDIT_TRANSACTION_VIEW,
            get(get_edit_transaction_page).post(update_transaction_endpoint),
        )
        .route(
            endpoints::DELETE_TRANSACTION,
            post(delete_transaction_endpoint),
        )
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(endpoints::CREATE_CATEGORY, post(create_category_endpoint))
        .route(
            endpoints::EDIT_CATEGORY_VIEW,
            get(get_edit_category_page).post(update_category_endpoint),
        )
        .route(endpoints::DELETE_CATEGORY, post(delete_category_endpoint))
        .route(endpoints::REPORTS_VIEW, get(get_reports_page))
        .route(endpoints::REPORT_EXPORT, get(export_report_endpoint))
        .route(
            endpoints::PROFILE_VIEW,
            get(get_profile_page).post(update_profile_endpoint),
        )
        .route(endpoints::CHANGE_PASSWORD, post(change_password_endpoint))
        .route(endpoints::STATISTICS_API, get(get_statistics_endpoint))
        .route(
            endpoints::TRANSACTIONS_CHART_API,
            get(get_transactions_chart_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

#[cfg(test)]
mod routing_tests {
    use std::sync::{Arc, Mutex};

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        AppState, Config, Profile, db::initialize, endpoints, routing::build_router,
    };

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().expect("Could not open database");
        initialize(&connection).expect("Could not initialize database");

        let config = Config::for_profile(Profile::Testing).expect("Could not build config");
        let state = AppState::new(&config, Arc::new(Mutex::new(connection)));

        TestServer::new(build_router(state))
    }

    #[tokio::test]
    async fn root_redirects_unauthenticated_client_to_log_in() {
        let server = get_test_server();

        let response = server.get(endpoints::ROOT).await;

        response.assert_status_see_other();
        let expected_query = serde_urlencoded::to_string([("redirect_url", "/")]).unwrap();
        assert_eq!(
            response.header("location"),
            format!("{}?{}", endpoints::LOG_IN_VIEW, expected_query)
        );
    }

    #[tokio::test]
    async fn log_in_page_is_reachable_without_auth() {
        let server = get_test_server();

        server.get(endpoints::LOG_IN_VIEW).await.assert_status_ok();
    }

    #[tokio::test]
    async fn register_page_is_reachable_without_auth() {
        let server = get_test_server();

        server
            .get(endpoints::REGISTER_VIEW)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn health_check_is_reachable_without_auth() {
        let server = get_test_server();

        server.get(endpoints::HEALTH).await.assert_status_ok();
    }

    #[tokio::test]
    async fn protected_pages_redirect_unauthenticated_client_to_log_in() {
        let server = get_test_server();

        for endpoint in [
            endpoints::DASHBOARD_VIEW,
            endpoints::TRANSACTIONS_VIEW,
            endpoints::CATEGORIES_VIEW,
            endpoints::REPORTS_VIEW,
            endpoints::PROFILE_VIEW,
            endpoints::STATISTICS_API,
        ] {
            let response = server.get(endpoint).await;

            response.assert_status_see_other();
            assert!(
                response.header("location").to_str().unwrap().starts_with(endpoints::LOG_IN_VIEW),
                "{endpoint} should redirect to the log in page",
            );
        }
    }

    #[tokio::test]
    async fn unknown_route_returns_not_found_page() {
        let server = get_test_server();

        let response = server.get("/no/such/page").await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_text_contains("404");
    }
}
