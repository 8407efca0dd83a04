//! JSON API over the application services.
//!
//! The caller's identity comes from the `X-User-Id` header, set by the
//! authenticating proxy in front of this service.

use crate::application::use_cases::connection_service::ConnectionService;
use crate::application::use_cases::query_history::QueryHistoryService;
use crate::application::use_cases::text_to_sql::TextToSqlService;
use crate::domain::connection::{DbConnectionInput, DbConnectionUpdate};
use crate::domain::error::AppError;
use crate::domain::query_record::{GenerationResult, QueryRequest};
use crate::domain::schema::{TableModelInput, TableSelection};
use crate::infrastructure::config::HttpConfig;
use actix_cors::Cors;
use actix_web::dev::{Payload, Server};
use actix_web::http::StatusCode;
use actix_web::{
    delete, get, post, put, web, App, FromRequest, HttpRequest, HttpResponse, HttpServer,
    Responder,
};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use tracing::{info, warn};
use validator::Validate;

pub const USER_ID_HEADER: &str = "X-User-Id";

pub struct HttpState {
    pub text_to_sql: TextToSqlService,
    pub connections: ConnectionService,
    pub history: QueryHistoryService,
}

/// Verified caller identity.
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub i64);

impl FromRequest for UserId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok());

        ready(user_id.map(UserId).ok_or_else(|| {
            actix_web::error::ErrorUnauthorized(format!("Missing or invalid {} header", USER_ID_HEADER))
        }))
    }
}

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::ValidationError(_) | AppError::SecurityError(_) => StatusCode::BAD_REQUEST,
        AppError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
        AppError::ConnectivityError(_) | AppError::LLMError(_) => StatusCode::BAD_GATEWAY,
        AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        AppError::DatabaseError(_)
        | AppError::SerializationError(_)
        | AppError::ConfigError(_)
        | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &AppError) -> HttpResponse {
    let status = status_for(err);
    if status.is_server_error() {
        warn!(status = status.as_u16(), "Request failed: {}", err);
    }
    HttpResponse::build(status).json(serde_json::json!({
        "detail": err.to_string(),
        "failure_kind": err.failure_kind(),
    }))
}

fn respond<T: Serialize>(result: crate::domain::error::Result<T>) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => error_response(&e),
    }
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub query_id: i64,
    #[serde(flatten)]
    pub result: GenerationResult,
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Runs the pipeline and records the attempt. A failed attempt is still
/// recorded, then answered with 400 and the failure-shaped result.
#[post("/queries")]
async fn create_query(
    data: web::Data<HttpState>,
    user: UserId,
    req: web::Json<QueryRequest>,
) -> impl Responder {
    if let Err(e) = req.validate() {
        return error_response(&AppError::from(e));
    }

    let conn = match data.connections.get_connection(user.0, req.connection_id).await {
        Ok(conn) => conn,
        Err(e) => return error_response(&e),
    };
    let selection = match data.connections.list_selected_tables(user.0, conn.id).await {
        Ok(selection) => selection,
        Err(e) => return error_response(&e),
    };

    let result = data
        .text_to_sql
        .generate(&req.natural_language_query, &conn, &selection)
        .await;

    let record = match data
        .history
        .record(user.0, Some(conn.id), &req.natural_language_query, result.clone())
        .await
    {
        Ok(record) => record,
        Err(e) => return error_response(&e),
    };

    let status = if result.is_successful {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    HttpResponse::build(status).json(QueryResponse {
        query_id: record.id,
        result,
    })
}

#[get("/queries")]
async fn list_queries(
    data: web::Data<HttpState>,
    user: UserId,
    params: web::Query<HistoryParams>,
) -> impl Responder {
    respond(data.history.list(user.0, params.limit).await)
}

#[get("/queries/stats")]
async fn query_stats(data: web::Data<HttpState>, user: UserId) -> impl Responder {
    respond(data.history.stats(user.0).await)
}

#[post("/connections/test")]
async fn test_connection(
    data: web::Data<HttpState>,
    user: UserId,
    req: web::Json<DbConnectionInput>,
) -> impl Responder {
    respond(data.connections.test_connection_input(user.0, &req).await)
}

#[post("/connections")]
async fn create_connection(
    data: web::Data<HttpState>,
    user: UserId,
    req: web::Json<DbConnectionInput>,
) -> impl Responder {
    match data.connections.create_connection(user.0, &req).await {
        Ok(conn) => HttpResponse::Created().json(conn),
        Err(e) => error_response(&e),
    }
}

#[get("/connections")]
async fn list_connections(data: web::Data<HttpState>, user: UserId) -> impl Responder {
    respond(data.connections.list_connections(user.0).await)
}

#[get("/connections/{id}")]
async fn get_connection(
    data: web::Data<HttpState>,
    user: UserId,
    path: web::Path<i64>,
) -> impl Responder {
    respond(data.connections.get_connection(user.0, *path).await)
}

#[put("/connections/{id}")]
async fn update_connection(
    data: web::Data<HttpState>,
    user: UserId,
    path: web::Path<i64>,
    req: web::Json<DbConnectionUpdate>,
) -> impl Responder {
    respond(data.connections.update_connection(user.0, *path, &req).await)
}

#[delete("/connections/{id}")]
async fn delete_connection(
    data: web::Data<HttpState>,
    user: UserId,
    path: web::Path<i64>,
) -> impl Responder {
    match data.connections.deactivate_connection(user.0, *path).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(&e),
    }
}

#[get("/connections/{id}/tables")]
async fn list_tables(
    data: web::Data<HttpState>,
    user: UserId,
    path: web::Path<i64>,
) -> impl Responder {
    respond(data.connections.list_available_tables(user.0, *path).await)
}

#[post("/connections/{id}/tables")]
async fn select_tables(
    data: web::Data<HttpState>,
    user: UserId,
    path: web::Path<i64>,
    req: web::Json<Vec<TableSelection>>,
) -> impl Responder {
    respond(data.connections.select_tables(user.0, *path, &req).await)
}

#[get("/connections/{id}/selected-tables")]
async fn list_selected_tables(
    data: web::Data<HttpState>,
    user: UserId,
    path: web::Path<i64>,
) -> impl Responder {
    respond(data.connections.list_selected_tables(user.0, *path).await)
}

#[post("/connections/{id}/models")]
async fn create_table_model(
    data: web::Data<HttpState>,
    user: UserId,
    path: web::Path<i64>,
    req: web::Json<TableModelInput>,
) -> impl Responder {
    match data.connections.save_table_model(user.0, *path, &req).await {
        Ok(model) => HttpResponse::Created().json(model),
        Err(e) => error_response(&e),
    }
}

#[get("/connections/{id}/models")]
async fn list_table_models(
    data: web::Data<HttpState>,
    user: UserId,
    path: web::Path<i64>,
) -> impl Responder {
    respond(data.connections.list_table_models(user.0, *path).await)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health)
            .service(create_query)
            .service(query_stats)
            .service(list_queries)
            .service(test_connection)
            .service(create_connection)
            .service(list_connections)
            .service(list_tables)
            .service(select_tables)
            .service(list_selected_tables)
            .service(create_table_model)
            .service(list_table_models)
            .service(get_connection)
            .service(update_connection)
            .service(delete_connection),
    );
}

pub fn start_server(state: HttpState, config: &HttpConfig) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    info!(host = %config.host, port = config.port, "HTTP server listening");
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::{pool, row, sales_schema, FakeConnector, FakeLlm};
    use crate::domain::connection::DbEngine;
    use crate::infrastructure::db::connectors::ConnectorRegistry;
    use crate::infrastructure::db::sqlite::SqliteRepository;
    use actix_web::test as http_test;
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn state(llm: Arc<FakeLlm>, connector: Arc<FakeConnector>) -> web::Data<HttpState> {
        let repo = Arc::new(SqliteRepository::init("sqlite::memory:").await.unwrap());
        let registry = ConnectorRegistry::new().register(DbEngine::Postgresql, connector);
        web::Data::new(HttpState {
            text_to_sql: TextToSqlService::new(registry.clone(), pool(llm), 6000),
            connections: ConnectionService::new(repo.clone(), registry, 1),
            history: QueryHistoryService::new(repo),
        })
    }

    fn connection_body() -> Value {
        json!({
            "name": "shop",
            "engine": "postgres",
            "host": "localhost",
            "username": "analyst",
            "password_ref": "plain:secret",
            "database_name": "shop"
        })
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&AppError::SecurityError("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&AppError::Unsupported("x".into())),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            status_for(&AppError::Timeout("x".into())),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[actix_web::test]
    async fn test_health() {
        let app = http_test::init_service(App::new().configure(configure)).await;
        let resp = http_test::call_service(&app, http_test::TestRequest::get().uri("/api/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_missing_user_header_is_unauthorized() {
        let data = state(FakeLlm::replying(&[]), FakeConnector::new(sales_schema(), vec![])).await;
        let app = http_test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = http_test::TestRequest::get().uri("/api/connections").to_request();
        let resp = http_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_query_flow_records_success_and_failure() {
        let llm = FakeLlm::replying(&[
            "SELECT id, total FROM public.orders",
            "Two orders.",
            "DROP TABLE public.orders",
        ]);
        let connector = FakeConnector::new(
            sales_schema(),
            vec![row(json!({"id": 1, "total": 10})), row(json!({"id": 2, "total": 30}))],
        );
        let data = state(llm, connector).await;
        let app = http_test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = http_test::TestRequest::post()
            .uri("/api/connections")
            .insert_header((USER_ID_HEADER, "7"))
            .set_json(connection_body())
            .to_request();
        let created: Value = http_test::call_and_read_body_json(&app, req).await;
        let connection_id = created["id"].as_i64().unwrap();
        assert!(created.get("password_ref").is_none());

        let req = http_test::TestRequest::post()
            .uri("/api/queries")
            .insert_header((USER_ID_HEADER, "7"))
            .set_json(json!({"natural_language_query": "show order totals", "connection_id": connection_id}))
            .to_request();
        let resp = http_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = http_test::read_body_json(resp).await;
        assert_eq!(body["is_successful"], json!(true));
        assert_eq!(body["insights"], json!("Two orders."));
        assert!(body["query_id"].as_i64().is_some());

        let req = http_test::TestRequest::post()
            .uri("/api/queries")
            .insert_header((USER_ID_HEADER, "7"))
            .set_json(json!({"natural_language_query": "drop the orders", "connection_id": connection_id}))
            .to_request();
        let resp = http_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = http_test::read_body_json(resp).await;
        assert_eq!(body["failure_kind"], json!("rejected"));

        let req = http_test::TestRequest::get()
            .uri("/api/queries?limit=10")
            .insert_header((USER_ID_HEADER, "7"))
            .to_request();
        let history: Value = http_test::call_and_read_body_json(&app, req).await;
        assert_eq!(history.as_array().unwrap().len(), 2);

        let req = http_test::TestRequest::get()
            .uri("/api/queries/stats")
            .insert_header((USER_ID_HEADER, "7"))
            .to_request();
        let stats: Value = http_test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["total_queries"], json!(2));
        assert_eq!(stats["success_rate"], json!(50.0));
        assert_eq!(stats["data_sources_connected"], json!(1));
    }

    #[actix_web::test]
    async fn test_query_on_unknown_connection_is_not_found() {
        let data = state(FakeLlm::replying(&[]), FakeConnector::new(sales_schema(), vec![])).await;
        let app = http_test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = http_test::TestRequest::post()
            .uri("/api/queries")
            .insert_header((USER_ID_HEADER, "7"))
            .set_json(json!({"natural_language_query": "show orders", "connection_id": 99}))
            .to_request();
        let resp = http_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
