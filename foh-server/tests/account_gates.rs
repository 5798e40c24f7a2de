//! 账号管理门禁集成测试
//!
//! 整条路由栈 (认证 → 审批门禁 → 角色门禁) 端到端走一遍：
//! 未审批账号即使角色是 admin 也进不了管理路由，
//! 自助注册拿不到 admin 角色。

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use foh_server::auth::hash_password;
use foh_server::db::models::EmployeeCreate;
use foh_server::{Config, ServerState};
use shared::models::Role;
use tower::ServiceExt;

struct Harness {
    state: ServerState,
    app: axum::Router,
}

impl Harness {
    async fn new() -> Self {
        let state = ServerState::initialize_in_memory(&Config::default())
            .await
            .unwrap();
        let app = foh_server::api::create_router(state.clone());
        Self { state, app }
    }

    /// 直接写库创建账号，返回 (id, bearer token)
    async fn seed_employee(&self, username: &str, role: Role, approved: bool) -> (String, String) {
        let record = self
            .state
            .employees
            .create(EmployeeCreate {
                username: username.to_string(),
                password_hash: hash_password("password123").unwrap(),
                role,
                is_approved: approved,
                created_at: Utc::now().timestamp_millis(),
            })
            .await
            .unwrap();
        let user = record.into_shared();
        let token = self.state.jwt_service.generate_token(&user).unwrap();
        (user.id, token)
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

#[tokio::test]
async fn test_unapproved_admin_cannot_approve_own_account() {
    let h = Harness::new().await;
    let (id, token) = h.seed_employee("mallory", Role::Admin, false).await;

    let (status, body) = h
        .request(
            "POST",
            &format!("/api/accounts/{id}/approve"),
            Some(&token),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    // 权威记录保持未审批
    let record = h.state.employees.find_by_id(&id).await.unwrap().unwrap();
    assert!(!record.is_approved);
}

#[tokio::test]
async fn test_admin_role_cannot_be_self_registered() {
    let h = Harness::new().await;

    let (status, body) = h
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(serde_json::json!({
                "username": "mallory",
                "password": "password123",
                "role": "admin"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(h
        .state
        .employees
        .find_by_username("mallory")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_approved_non_admin_cannot_approve() {
    let h = Harness::new().await;
    let (pending_id, _) = h.seed_employee("rookie", Role::Waiter, false).await;
    let (_, waiter_token) = h.seed_employee("mario", Role::Waiter, true).await;

    let (status, _) = h
        .request(
            "POST",
            &format!("/api/accounts/{pending_id}/approve"),
            Some(&waiter_token),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_approved_admin_approves_pending_account() {
    let h = Harness::new().await;
    let (pending_id, _) = h.seed_employee("rookie", Role::Waiter, false).await;
    let (_, admin_token) = h.seed_employee("boss", Role::Admin, true).await;

    let (status, body) = h
        .request(
            "POST",
            &format!("/api/accounts/{pending_id}/approve"),
            Some(&admin_token),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["isAproved"], true);

    let record = h
        .state
        .employees
        .find_by_id(&pending_id)
        .await
        .unwrap()
        .unwrap();
    assert!(record.is_approved);
}
