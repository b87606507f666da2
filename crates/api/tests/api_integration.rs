//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use accounts::{AuthService, InMemoryCredentialStore, Registration, TokenIssuer};
use api::{API_PREFIX, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{ProductId, UserId};
use ledger::{InMemoryStockLedger, StockService};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

type State = Arc<AppState<InMemoryStockLedger, InMemoryCredentialStore>>;

const SECRET: &str = "test-secret";
const PRODUCT: ProductId = ProductId::new(1);

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// App with one registered user and product 1 stocked at 10.
async fn setup() -> (axum::Router, State, UserId) {
    let ledger = InMemoryStockLedger::new();
    ledger.label_product(PRODUCT, "Widget", "SKU-1").await;

    let state = Arc::new(AppState::new(
        StockService::new(ledger),
        AuthService::new(InMemoryCredentialStore::new(), TokenIssuer::new(SECRET)),
    ));
    let user = state
        .auth
        .register(Registration {
            email: "andre@example.com".into(),
            password: "password123".into(),
            name: "Andre".into(),
            phone: String::new(),
            role: None,
        })
        .await
        .unwrap();
    state.stock.ledger().label_user(user.id, "Andre").await;
    state.stock.open_stock(PRODUCT, 10).await.unwrap();

    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state, user.id)
}

fn bearer(state: &State, user_id: UserId) -> String {
    format!("Bearer {}", state.auth.tokens().issue(user_id).unwrap())
}

fn create_request(auth: Option<&str>, form: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("{API_PREFIX}/transactions/create"))
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

fn list_request(auth: &str, query: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("{API_PREFIX}/transactions{query}"))
        .header("authorization", auth)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn quantity(state: &State) -> i64 {
    state.stock.stock_level(PRODUCT).await.unwrap().unwrap().quantity
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = setup().await;

    let (status, json) = send(
        &app,
        Request::builder()
            .uri(format!("{API_PREFIX}/health"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "ok");
}

mod login {
    use super::*;

    fn login_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("{API_PREFIX}/login"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_returns_usable_token() {
        let (app, _, _) = setup().await;

        let (status, json) = send(
            &app,
            login_request(r#"{"email":"andre@example.com","password":"password123"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Login successful");

        let token = json["data"]["token"].as_str().unwrap();
        let (status, _) = send(&app, list_request(&format!("Bearer {token}"), "")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let (app, _, _) = setup().await;

        let (wrong_status, wrong) = send(
            &app,
            login_request(r#"{"email":"andre@example.com","password":"nope"}"#),
        )
        .await;
        let (unknown_status, unknown) = send(
            &app,
            login_request(r#"{"email":"ghost@example.com","password":"password123"}"#),
        )
        .await;

        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);
        assert!(wrong.get("data").is_none());
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_body() {
        let (app, _, _) = setup().await;

        let (status, json) = send(&app, login_request("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "error");
    }
}

mod authorization {
    use super::*;

    #[tokio::test]
    async fn test_missing_or_malformed_header_is_rejected() {
        let (app, state, user) = setup().await;
        let valid = bearer(&state, user);
        let token = valid.trim_start_matches("Bearer ");

        for header in [
            None,
            Some(token.to_string()),
            Some(format!("bearer {token}")),
            Some(format!("Bearer {token} extra")),
            Some("Bearer not-a-token".to_string()),
        ] {
            let (status, json) = send(
                &app,
                create_request(header.as_deref(), "product_id=1&quantity=1&move_type=IN"),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "header {header:?}");
            assert_eq!(json["message"], "Invalid authorization header");
        }

        assert_eq!(quantity(&state).await, 10);
    }

    #[tokio::test]
    async fn test_token_from_other_secret_is_rejected() {
        let (app, _, user) = setup().await;
        let forged = TokenIssuer::new("other-secret").issue(user).unwrap();

        let (status, _) = send(&app, list_request(&format!("Bearer {forged}"), "")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

mod transactions {
    use super::*;

    #[tokio::test]
    async fn test_out_then_insufficient() {
        let (app, state, user) = setup().await;
        let auth = bearer(&state, user);

        let (status, json) = send(
            &app,
            create_request(Some(&auth), "product_id=1&quantity=3&move_type=OUT"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Transaction created successfully");
        assert_eq!(json["data"]["quantity"], 3);
        assert_eq!(json["data"]["move_type"], "OUT");
        assert_eq!(quantity(&state).await, 7);

        let (status, json) = send(
            &app,
            create_request(Some(&auth), "product_id=1&quantity=20&move_type=OUT"),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["message"], "Insufficient stock");
        assert_eq!(quantity(&state).await, 7);
        assert_eq!(state.stock.ledger().movement_count().await, 1);
    }

    #[tokio::test]
    async fn test_lowercase_move_type_is_accepted() {
        let (app, state, user) = setup().await;
        let auth = bearer(&state, user);

        let (status, json) = send(
            &app,
            create_request(Some(&auth), "product_id=1&quantity=5&move_type=in"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["move_type"], "IN");
        assert_eq!(quantity(&state).await, 15);
    }

    fn multipart_request(auth: &str, fields: &[(&str, &str)]) -> Request<Body> {
        const BOUNDARY: &str = "stocklab-boundary";
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri(format!("{API_PREFIX}/transactions/create"))
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .header("authorization", auth)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_multipart_form_is_accepted() {
        let (app, state, user) = setup().await;
        let auth = bearer(&state, user);

        let (status, json) = send(
            &app,
            multipart_request(
                &auth,
                &[("product_id", "1"), ("quantity", "3"), ("move_type", "OUT")],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Transaction created successfully");
        assert_eq!(json["data"]["move_type"], "OUT");
        assert_eq!(json["data"]["user_id"], user.as_i64());
        assert_eq!(quantity(&state).await, 7);

        let (status, json) = send(
            &app,
            multipart_request(
                &auth,
                &[("product_id", "1"), ("quantity", "20"), ("move_type", "OUT")],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["message"], "Insufficient stock");
        assert_eq!(quantity(&state).await, 7);
    }

    #[tokio::test]
    async fn test_unsupported_body_is_invalid_data() {
        let (app, state, user) = setup().await;
        let auth = bearer(&state, user);

        let request = Request::builder()
            .method("POST")
            .uri(format!("{API_PREFIX}/transactions/create"))
            .header("content-type", "application/json")
            .header("authorization", &auth)
            .body(Body::from(r#"{"product_id":1,"quantity":3,"move_type":"OUT"}"#))
            .unwrap();

        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Invalid data");
        assert_eq!(quantity(&state).await, 10);
    }

    #[tokio::test]
    async fn test_invalid_payloads_are_bad_requests() {
        let (app, state, user) = setup().await;
        let auth = bearer(&state, user);

        for form in [
            "product_id=0&quantity=1&move_type=IN",
            "product_id=abc&quantity=1&move_type=IN",
            "product_id=1&quantity=0&move_type=IN",
            "product_id=1&quantity=-4&move_type=OUT",
            "product_id=1&quantity=ten&move_type=IN",
            "product_id=1&quantity=1&move_type=SIDEWAYS",
            "product_id=1&quantity=1",
            "",
        ] {
            let (status, json) = send(&app, create_request(Some(&auth), form)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "form {form:?}");
            assert_eq!(json["status"], "error");
        }

        assert_eq!(quantity(&state).await, 10);
        assert_eq!(state.stock.ledger().movement_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_stock_row_is_bad_request() {
        let (app, state, user) = setup().await;
        let auth = bearer(&state, user);

        let (status, _) = send(
            &app,
            create_request(Some(&auth), "product_id=99&quantity=1&move_type=IN"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_user_id_defaults_to_caller() {
        let (app, state, user) = setup().await;
        let auth = bearer(&state, user);

        let (_, implicit) = send(
            &app,
            create_request(Some(&auth), "product_id=1&quantity=1&move_type=IN"),
        )
        .await;
        let (_, explicit) = send(
            &app,
            create_request(Some(&auth), "product_id=1&user_id=42&quantity=1&move_type=IN"),
        )
        .await;

        assert_eq!(implicit["data"]["user_id"], user.as_i64());
        assert_eq!(explicit["data"]["user_id"], 42);
    }

    #[tokio::test]
    async fn test_failed_record_is_opaque_internal_error() {
        let (app, state, user) = setup().await;
        let auth = bearer(&state, user);
        state.stock.ledger().fail_next_append();

        let (status, json) = send(
            &app,
            create_request(Some(&auth), "product_id=1&quantity=4&move_type=IN"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Internal server error");
        assert_eq!(quantity(&state).await, 10);
    }

    #[tokio::test]
    async fn test_list_is_joined_and_newest_first() {
        let (app, state, user) = setup().await;
        let auth = bearer(&state, user);

        for form in [
            "product_id=1&quantity=1&move_type=IN",
            "product_id=1&quantity=2&move_type=OUT",
        ] {
            let (status, _) = send(&app, create_request(Some(&auth), form)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, json) = send(&app, list_request(&auth, "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Transactions fetched successfully");

        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["move_type"], "OUT");
        assert_eq!(data[0]["product_name"], "Widget");
        assert_eq!(data[0]["sku"], "SKU-1");
        assert_eq!(data[0]["user_name"], "Andre");
        assert_eq!(data[1]["move_type"], "IN");
    }

    #[tokio::test]
    async fn test_list_date_filters() {
        let (app, state, user) = setup().await;
        let auth = bearer(&state, user);

        let (_, today) = send(
            &app,
            create_request(Some(&auth), "product_id=1&quantity=1&move_type=IN"),
        )
        .await;
        assert_eq!(today["status"], "success");

        let (status, json) = send(&app, list_request(&auth, "?end_date=2000-01-01")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 0);

        let (status, json) = send(
            &app,
            list_request(&auth, "?start_date=2000-01-01&end_date=2999-12-31"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 1);

        let (status, json) = send(&app, list_request(&auth, "?start_date=14-12-2025")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "error");
    }
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, state, user) = setup().await;
    let auth = bearer(&state, user);
    send(&app, create_request(Some(&auth), "product_id=1&quantity=1&move_type=IN")).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("{API_PREFIX}/metrics"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("stock_movements_total"));
}
