//! 实时投递集成测试
//!
//! 服务端连接循环 + 客户端 BusClient 跑在同一进程的内存传输上，
//! 覆盖握手鉴权、房间授权和扇出规则的端到端路径。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use foh_client::{BusClient, ClientError};
use foh_server::db::DbService;
use foh_server::db::repository::TableSessionRepository;
use foh_server::realtime::connection::{HandshakeAuth, serve_connection};
use foh_server::{EventBus, JwtService, SessionService};
use shared::event::ServerEvent;
use shared::message::{Credential, Room};
use shared::models::{Employee, Role};
use shared::transport::MemoryTransport;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

struct Harness {
    bus: Arc<EventBus>,
    auth: HandshakeAuth,
    jwt: Arc<JwtService>,
    sessions: SessionService,
}

impl Harness {
    async fn new() -> Self {
        let db = DbService::memory().await.unwrap();
        let jwt = Arc::new(JwtService::new());
        let repo = TableSessionRepository::new(db.db.clone());
        let bus = Arc::new(EventBus::new());
        let sessions = SessionService::new(repo.clone(), bus.clone(), chrono::NaiveTime::MIN);
        Self {
            bus: bus.clone(),
            auth: HandshakeAuth::new(jwt.clone(), repo),
            jwt,
            sessions,
        }
    }

    fn staff_token(&self, user_id: &str, approved: bool) -> String {
        self.jwt
            .generate_token(&Employee {
                id: user_id.to_string(),
                username: user_id.to_string(),
                role: Role::Waiter,
                is_approved: approved,
                created_at: Utc::now(),
            })
            .unwrap()
    }

    /// 在内存传输上接入一个客户端
    async fn connect(&self, credential: Credential) -> Result<BusClient, ClientError> {
        let (server_side, client_side) = MemoryTransport::pair();
        tokio::spawn(serve_connection(
            self.bus.clone(),
            self.auth.clone(),
            Arc::new(server_side),
        ));
        BusClient::over_transport(Arc::new(client_side), credential, "test-client").await
    }
}

async fn recv(sub: &mut foh_client::Subscription) -> ServerEvent {
    tokio::time::timeout(RECV_TIMEOUT, sub.recv())
        .await
        .expect("Timed out waiting for event")
        .expect("Event stream closed")
}

#[tokio::test]
async fn test_staff_handshake_lands_in_staff_room() {
    let h = Harness::new().await;
    let client = h
        .connect(Credential::Staff {
            token: h.staff_token("employee:anna", true),
        })
        .await
        .unwrap();

    assert!(client.rooms().iter().any(|r| r == "staff"));
    assert_eq!(h.bus.room_size(&Room::Staff), 1);
}

#[tokio::test]
async fn test_unapproved_staff_gets_only_user_room() {
    let h = Harness::new().await;
    let client = h
        .connect(Credential::Staff {
            token: h.staff_token("employee:rookie", false),
        })
        .await
        .unwrap();

    assert!(!client.rooms().iter().any(|r| r == "staff"));
    assert_eq!(h.bus.room_size(&Room::Staff), 0);

    // 但 account:approved 能到达
    let mut sub = client.subscribe();
    h.bus.emit_to_user(
        "employee:rookie",
        &ServerEvent::AccountApproved {
            message: "approved".to_string(),
        },
    );
    assert!(matches!(
        recv(&mut sub).await,
        ServerEvent::AccountApproved { .. }
    ));
}

#[tokio::test]
async fn test_expired_session_credential_is_refused() {
    let h = Harness::new().await;
    let session = h.sessions.generate(7, "employee:anna").await.unwrap();
    h.sessions.expire(&session.id, "employee:admin").await.unwrap();

    let err = h
        .connect(Credential::Customer {
            session_token: session.session_token,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Refused(_)));
}

#[tokio::test]
async fn test_customer_cannot_join_foreign_rooms() {
    let h = Harness::new().await;
    let session = h.sessions.generate(7, "employee:anna").await.unwrap();
    let client = h
        .connect(Credential::Customer {
            session_token: session.session_token,
        })
        .await
        .unwrap();

    assert!(matches!(
        client.join_room(&Room::Table(8)).await,
        Err(ClientError::Denied(_))
    ));
    assert!(matches!(
        client.join_room(&Room::Staff).await,
        Err(ClientError::Denied(_))
    ));
    // 自己的桌台房间：已在其中，重复加入也是成功
    client.join_room(&Room::Table(7)).await.unwrap();
}

#[tokio::test]
async fn test_order_event_fans_out_to_staff_and_own_table_only() {
    let h = Harness::new().await;
    // 先开好会话，避免 sessionCreated 混进断言流
    let s7 = h.sessions.generate(7, "employee:anna").await.unwrap();
    let s8 = h.sessions.generate(8, "employee:anna").await.unwrap();
    let staff = h
        .connect(Credential::Staff {
            token: h.staff_token("employee:anna", true),
        })
        .await
        .unwrap();
    let table7 = h
        .connect(Credential::Customer {
            session_token: s7.session_token,
        })
        .await
        .unwrap();
    let table8 = h
        .connect(Credential::Customer {
            session_token: s8.session_token,
        })
        .await
        .unwrap();

    let mut staff_sub = staff.subscribe();
    let mut t7_sub = table7.subscribe();
    let mut t8_sub = table8.subscribe();

    h.bus.emit_order_event(
        7,
        &ServerEvent::OrderDeleted {
            id: "order:1".to_string(),
        },
    );

    assert!(matches!(
        recv(&mut staff_sub).await,
        ServerEvent::OrderDeleted { .. }
    ));
    assert!(matches!(
        recv(&mut t7_sub).await,
        ServerEvent::OrderDeleted { .. }
    ));
    assert!(
        tokio::time::timeout(Duration::from_millis(300), t8_sub.recv())
            .await
            .is_err(),
        "Table 8 must not see table 7 events"
    );
}

#[tokio::test]
async fn test_session_expiry_reaches_staff_and_table() {
    let h = Harness::new().await;
    let session = h.sessions.generate(5, "employee:anna").await.unwrap();
    let staff = h
        .connect(Credential::Staff {
            token: h.staff_token("employee:anna", true),
        })
        .await
        .unwrap();
    let customer = h
        .connect(Credential::Customer {
            session_token: session.session_token.clone(),
        })
        .await
        .unwrap();

    let mut staff_sub = staff.subscribe();
    let mut customer_sub = customer.subscribe();

    h.sessions.expire(&session.id, "employee:admin").await.unwrap();

    for sub in [&mut staff_sub, &mut customer_sub] {
        match recv(sub).await {
            ServerEvent::SessionExpired { table_number, .. } => assert_eq!(table_number, 5),
            other => panic!("Expected sessionExpired, got {}", other.name()),
        }
    }
}

#[tokio::test]
async fn test_disconnect_cleans_up_rooms() {
    let h = Harness::new().await;
    let client = h
        .connect(Credential::Staff {
            token: h.staff_token("employee:anna", true),
        })
        .await
        .unwrap();
    assert_eq!(h.bus.connection_count(), 1);

    client.close().await.unwrap();

    // 服务端读到 Disconnected 后注销连接
    tokio::time::timeout(RECV_TIMEOUT, async {
        while h.bus.connection_count() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Connection was not cleaned up");
    assert_eq!(h.bus.room_size(&Room::Staff), 0);
}
