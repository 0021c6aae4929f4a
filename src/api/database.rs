//! 数据库建栈 API
//!
//! 包含 /create-database 端点

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tracing::Instrument;

use crate::domain::database::{CreateDatabaseRequest, CreateDatabaseResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// 创建数据库路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/create-database", post(create_database))
}

/// 创建数据库并等待栈完成
///
/// POST /create-database
///
/// 请求在栈进入终态前不会返回；客户端断开时 handler 被丢弃，轮询随之停止
async fn create_database(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateDatabaseRequest>, JsonRejection>,
) -> ApiResult<Json<CreateDatabaseResponse>> {
    let Json(request) = payload?;
    let spec = request.validate()?;

    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("create_database", request_id = %request_id, db_user = %spec.user);
    let _active = state.active_provisions.track();

    let endpoint = state
        .provisioner()
        .provision(&spec, &request_id, &state.shutdown)
        .instrument(span)
        .await?;

    Ok(Json(CreateDatabaseResponse::created(endpoint)))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{
        credentials_json, json_body, post_json, snapshot, FakeSecretStore, ScriptedStackApi,
        TestStateBuilder,
    };
    use axum::http::StatusCode;
    use std::sync::Arc;

    fn body() -> serde_json::Value {
        serde_json::json!({
            "dbInstanceIdentifier": "orders-db",
            "dbName": "orders",
            "dbUser": "alice",
            "dbPassword": "pw-123"
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_database_success() {
        let api = Arc::new(ScriptedStackApi::new(vec![
            Ok(snapshot("CREATE_IN_PROGRESS", &[])),
            Ok(snapshot(
                "CREATE_COMPLETE",
                &[("DBEndpoint", "orders.abc.rds.amazonaws.com"), ("DBPort", "3306")],
            )),
        ]));
        let app = TestStateBuilder::new()
            .secrets(FakeSecretStore::with_secret(credentials_json()))
            .stack_api(api.clone())
            .router();

        let response = post_json(app, "/create-database", body()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["message"], "Database created successfully!");
        assert_eq!(json["dbEndpoint"], "orders.abc.rds.amazonaws.com");
        assert_eq!(json["port"], "3306");
        assert_eq!(api.submitted_stack_names(), vec!["RDS-alice".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_database_rollback() {
        let api = Arc::new(ScriptedStackApi::new(vec![Ok(snapshot(
            "ROLLBACK_IN_PROGRESS",
            &[],
        ))]));
        let app = TestStateBuilder::new()
            .secrets(FakeSecretStore::with_secret(credentials_json()))
            .stack_api(api)
            .router();

        let response = post_json(app, "/create-database", body()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ROLLBACK_IN_PROGRESS");
        assert_eq!(json["message"], "Stack creation failed and is rolling back.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_database_unhandled_status() {
        let api = Arc::new(ScriptedStackApi::new(vec![Ok(snapshot(
            "UPDATE_ROLLBACK_FAILED",
            &[],
        ))]));
        let app = TestStateBuilder::new()
            .secrets(FakeSecretStore::with_secret(credentials_json()))
            .stack_api(api)
            .router();

        let response = post_json(app, "/create-database", body()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = json_body(response).await;
        assert_eq!(json["message"], "Unhandled stack status: UPDATE_ROLLBACK_FAILED");
    }

    #[tokio::test]
    async fn test_create_database_secret_failure() {
        let secrets = FakeSecretStore::failing("AccessDeniedException");
        let app = TestStateBuilder::new().secrets(secrets).router();

        let response = post_json(app, "/create-database", body()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = json_body(response).await;
        assert_eq!(json["message"], "Failed to load AWS secrets");
        assert!(json["error"].as_str().unwrap().contains("AccessDeniedException"));
    }

    #[tokio::test]
    async fn test_create_database_missing_fields() {
        let secrets = Arc::new(FakeSecretStore::with_secret(credentials_json()));
        let app = TestStateBuilder::new()
            .shared_secrets(secrets.clone())
            .router();

        let response = post_json(
            app,
            "/create-database",
            serde_json::json!({ "dbName": "orders" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(secrets.calls(), 0);
    }
}
