//! 事件总线核心实现
//!
//! 总线拥有连接注册表和房间成员表；事件解释权在消费端。
//! 所有 emit 都是 fire-and-forget：投递失败只记日志，
//! 永远不向触发事件的请求报错。

use std::collections::HashSet;

use dashmap::DashMap;
use shared::event::ServerEvent;
use shared::message::{BusMessage, Room};
use shared::models::Role;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 连接 ID
pub type ConnId = String;

/// 每连接发送队列容量；写满说明消费端卡死，直接断开
const CONN_QUEUE_CAPACITY: usize = 256;

/// 连接主体 — 握手通过后绑定，之后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// 员工连接 (REST 同款 JWT)
    Staff {
        user_id: String,
        role: Role,
        approved: bool,
    },
    /// 客人连接，锚定在握手时校验过的桌台上
    Customer { table_number: u32 },
}

impl Principal {
    /// 握手后自动加入的房间
    ///
    /// 未审批员工只有自己的定向房间 —— 他们要能收到
    /// `account:approved`，但看不到订单看板。
    pub fn auto_rooms(&self) -> Vec<Room> {
        match self {
            Principal::Staff {
                user_id, approved, ..
            } => {
                let mut rooms = vec![Room::User(user_id.clone())];
                if *approved {
                    rooms.push(Room::Staff);
                }
                rooms
            }
            Principal::Customer { table_number } => vec![Room::Table(*table_number)],
        }
    }

    /// 显式加入房间的授权检查
    ///
    /// - 已审批员工：staff 房间和任意桌台房间
    /// - 客人：只有自己的桌台房间
    /// - 定向 user 房间不可显式加入
    pub fn can_join(&self, room: &Room) -> bool {
        match (self, room) {
            (Principal::Staff { approved, .. }, Room::Staff) => *approved,
            (Principal::Staff { approved, .. }, Room::Table(_)) => *approved,
            (Principal::Customer { table_number }, Room::Table(n)) => table_number == n,
            (_, Room::User(_)) => false,
            (Principal::Customer { .. }, Room::Staff) => false,
        }
    }
}

/// 总线错误
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Not allowed to join room {0}")]
    JoinDenied(String),

    #[error("Cannot leave the directed user room")]
    LeaveDenied,

    #[error("Unknown connection")]
    UnknownConnection,
}

#[derive(Debug)]
struct ConnectionHandle {
    principal: Principal,
    tx: mpsc::Sender<BusMessage>,
}

/// 事件总线
///
/// 通过显式句柄传给每个需要发事件的服务 (依赖注入，
/// 不做环境全局查找)。
#[derive(Debug)]
pub struct EventBus {
    connections: DashMap<ConnId, ConnectionHandle>,
    rooms: DashMap<Room, HashSet<ConnId>>,
    shutdown_token: CancellationToken,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// 注册一条已通过握手的连接
    ///
    /// 返回连接 ID 和该连接的 FIFO 消息队列接收端，
    /// 连接按主体自动加入相应房间。
    pub fn register(&self, principal: Principal) -> (ConnId, mpsc::Receiver<BusMessage>) {
        let conn_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(CONN_QUEUE_CAPACITY);

        for room in principal.auto_rooms() {
            self.rooms
                .entry(room)
                .or_default()
                .insert(conn_id.clone());
        }

        self.connections
            .insert(conn_id.clone(), ConnectionHandle { principal, tx });
        tracing::debug!(conn_id = %conn_id, total = self.connections.len(), "Connection registered");
        (conn_id, rx)
    }

    /// 注销连接，清理所有房间成员关系
    pub fn unregister(&self, conn_id: &str) {
        self.connections.remove(conn_id);
        self.rooms.retain(|_, members| {
            members.remove(conn_id);
            !members.is_empty()
        });
        tracing::debug!(conn_id = %conn_id, total = self.connections.len(), "Connection unregistered");
    }

    /// 连接自动加入的房间列表 (握手确认里回给客户端)
    pub fn rooms_of(&self, conn_id: &str) -> Vec<Room> {
        self.rooms
            .iter()
            .filter(|entry| entry.value().contains(conn_id))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// 显式加入房间 (带授权检查)
    pub fn join(&self, conn_id: &str, room: Room) -> Result<(), BusError> {
        let conn = self
            .connections
            .get(conn_id)
            .ok_or(BusError::UnknownConnection)?;
        if !conn.principal.can_join(&room) {
            return Err(BusError::JoinDenied(room.to_string()));
        }
        drop(conn);
        self.rooms.entry(room).or_default().insert(conn_id.to_string());
        Ok(())
    }

    /// 离开房间
    ///
    /// 定向 user 房间不可离开，它是 `account:*` 事件的投递通道。
    pub fn leave(&self, conn_id: &str, room: Room) -> Result<(), BusError> {
        if !self.connections.contains_key(conn_id) {
            return Err(BusError::UnknownConnection);
        }
        if matches!(room, Room::User(_)) {
            return Err(BusError::LeaveDenied);
        }
        if let Some(mut members) = self.rooms.get_mut(&room) {
            members.remove(conn_id);
        }
        Ok(())
    }

    /// 向房间内所有连接投递事件，返回投递数
    pub fn emit_to_room(&self, room: &Room, event: &ServerEvent) -> usize {
        let Some(members) = self.rooms.get(room) else {
            return 0;
        };
        let targets: Vec<ConnId> = members.iter().cloned().collect();
        drop(members);

        let msg = BusMessage::event(event);
        let mut delivered = 0;
        for conn_id in targets {
            if self.deliver(&conn_id, msg.clone()) {
                delivered += 1;
            }
        }
        tracing::debug!(room = %room, event = event.name(), delivered, "Event emitted");
        delivered
    }

    /// 向指定用户的定向房间投递事件
    pub fn emit_to_user(&self, user_id: &str, event: &ServerEvent) -> usize {
        self.emit_to_room(&Room::User(user_id.to_string()), event)
    }

    /// 订单类事件的惯用扇出：员工看板 + 对应桌台
    pub fn emit_order_event(&self, table_number: u32, event: &ServerEvent) {
        self.emit_to_room(&Room::Staff, event);
        self.emit_to_room(&Room::Table(table_number), event);
    }

    /// 单连接投递；队列满或已关闭的连接被当场注销
    fn deliver(&self, conn_id: &str, msg: BusMessage) -> bool {
        let Some(conn) = self.connections.get(conn_id) else {
            return false;
        };
        match conn.tx.try_send(msg) {
            Ok(()) => true,
            Err(e) => {
                drop(conn);
                tracing::warn!(
                    conn_id = %conn_id,
                    error = %e,
                    "Dropping unresponsive connection"
                );
                self.unregister(conn_id);
                false
            }
        }
    }

    /// 房间成员数
    pub fn room_size(&self, room: &Room) -> usize {
        self.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    /// 当前连接数
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// 获取关闭令牌 (用于监控关闭信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 优雅关闭总线
    pub fn shutdown(&self) {
        tracing::info!("Shutting down event bus");
        self.shutdown_token.cancel();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(id: &str, approved: bool) -> Principal {
        Principal::Staff {
            user_id: id.to_string(),
            role: Role::Waiter,
            approved,
        }
    }

    #[tokio::test]
    async fn test_auto_rooms_for_approved_staff() {
        let bus = EventBus::new();
        let (conn_id, _rx) = bus.register(staff("employee:a", true));
        assert_eq!(bus.room_size(&Room::Staff), 1);
        assert_eq!(bus.room_size(&Room::User("employee:a".into())), 1);
        bus.unregister(&conn_id);
        assert_eq!(bus.room_size(&Room::Staff), 0);
    }

    #[tokio::test]
    async fn test_unapproved_staff_not_in_staff_room() {
        let bus = EventBus::new();
        let (_conn_id, _rx) = bus.register(staff("employee:b", false));
        assert_eq!(bus.room_size(&Room::Staff), 0);
        assert_eq!(bus.room_size(&Room::User("employee:b".into())), 1);
    }

    #[tokio::test]
    async fn test_customer_cannot_join_other_table() {
        let bus = EventBus::new();
        let (conn_id, _rx) = bus.register(Principal::Customer { table_number: 7 });
        assert!(matches!(
            bus.join(&conn_id, Room::Table(8)),
            Err(BusError::JoinDenied(_))
        ));
        assert!(bus.join(&conn_id, Room::Table(7)).is_ok());
        assert!(matches!(
            bus.join(&conn_id, Room::Staff),
            Err(BusError::JoinDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_user_room_cannot_be_joined_or_left() {
        let bus = EventBus::new();
        let (conn_id, _rx) = bus.register(staff("employee:c", true));
        assert!(bus
            .join(&conn_id, Room::User("employee:other".into()))
            .is_err());
        assert!(matches!(
            bus.leave(&conn_id, Room::User("employee:c".into())),
            Err(BusError::LeaveDenied)
        ));
    }

    #[tokio::test]
    async fn test_directed_event_reaches_only_target() {
        let bus = EventBus::new();
        let (_a, mut rx_a) = bus.register(staff("employee:a", true));
        let (_b, mut rx_b) = bus.register(staff("employee:b", true));

        let delivered = bus.emit_to_user(
            "employee:a",
            &ServerEvent::AccountApproved {
                message: "approved".to_string(),
            },
        );
        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_order_event_fans_out_to_staff_and_table() {
        let bus = EventBus::new();
        let (_s, mut staff_rx) = bus.register(staff("employee:a", true));
        let (_c, mut table_rx) = bus.register(Principal::Customer { table_number: 7 });
        let (_o, mut other_rx) = bus.register(Principal::Customer { table_number: 8 });

        bus.emit_order_event(
            7,
            &ServerEvent::OrderDeleted {
                id: "order:1".to_string(),
            },
        );
        assert!(staff_rx.try_recv().is_ok());
        assert!(table_rx.try_recv().is_ok());
        assert!(other_rx.try_recv().is_err());
    }
}
