//! 本地状态合并
//!
//! 事件是增量，全量拉取是权威。所有增量合并满足：
//! 幂等 (重复事件不改变结果)、乱序容忍 (合并只按 id 寻址)、
//! 缺失容忍 (删除不存在的 id 是 no-op)。

use shared::event::ServerEvent;
use shared::models::{Order, TableSession};

/// 本地快照与合并规则
#[derive(Debug, Default)]
pub struct Reconciler {
    orders: Vec<Order>,
    sessions: Vec<TableSession>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn sessions(&self) -> &[TableSession] {
        &self.sessions
    }

    /// 全量替换订单快照 (重连 / 周期刷新)
    pub fn replace_orders(&mut self, orders: Vec<Order>) {
        self.orders = orders;
    }

    /// 全量替换会话快照
    pub fn replace_sessions(&mut self, sessions: Vec<TableSession>) {
        self.sessions = sessions;
    }

    /// 应用一个推送事件，返回本地状态是否发生变化
    ///
    /// 定向 `account:*` / `role:changed` 事件不在这里处理 ——
    /// 它们只是刷新信号，权威状态由调用方走 REST 回查。
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::NewOrder(order) => {
                if self.orders.iter().any(|o| o.id == order.id) {
                    return false;
                }
                self.orders.insert(0, order.clone());
                true
            }
            ServerEvent::OrderStatusUpdated(patch) => {
                match self.orders.iter_mut().find(|o| o.id == patch.id) {
                    Some(order) => {
                        let changed =
                            order.status != patch.status || order.updated_at != patch.updated_at;
                        order.status = patch.status;
                        order.updated_at = patch.updated_at;
                        changed
                    }
                    None => false,
                }
            }
            ServerEvent::OrderDeleted { id } => {
                let before = self.orders.len();
                self.orders.retain(|o| &o.id != id);
                self.orders.len() != before
            }
            ServerEvent::SessionCreated(session) => {
                if self.sessions.iter().any(|s| s.id == session.id) {
                    return false;
                }
                self.sessions.insert(0, session.clone());
                true
            }
            ServerEvent::SessionExpired { id, .. } => {
                match self.sessions.iter_mut().find(|s| &s.id == id) {
                    Some(session) if session.is_active => {
                        session.is_active = false;
                        true
                    }
                    _ => false,
                }
            }
            // 定向事件：本地无状态可合并
            ServerEvent::AccountApproved { .. }
            | ServerEvent::AccountRejected { .. }
            | ServerEvent::AccountDeleted { .. }
            | ServerEvent::RoleChanged { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::models::{OrderItem, OrderStatus, OrderStatusPatch};

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: id.to_string(),
            table_number: 7,
            items: vec![OrderItem {
                name: "Gyoza".to_string(),
                quantity: 2,
                price: 6.5,
            }],
            status,
            total_amount: 13.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn session(id: &str, active: bool) -> TableSession {
        TableSession {
            id: id.to_string(),
            table_number: 7,
            session_token: "tok".to_string(),
            is_active: active,
            created_at: Utc::now(),
            expires_at: None,
            created_by: "employee:a".to_string(),
        }
    }

    #[test]
    fn test_duplicate_new_order_is_single_entry() {
        let mut r = Reconciler::new();
        let ev = ServerEvent::NewOrder(order("order:1", OrderStatus::Pending));
        assert!(r.apply(&ev));
        assert!(!r.apply(&ev));
        assert_eq!(r.orders().len(), 1);
    }

    #[test]
    fn test_new_orders_insert_at_head() {
        let mut r = Reconciler::new();
        r.apply(&ServerEvent::NewOrder(order("order:1", OrderStatus::Pending)));
        r.apply(&ServerEvent::NewOrder(order("order:2", OrderStatus::Pending)));
        assert_eq!(r.orders()[0].id, "order:2");
    }

    #[test]
    fn test_partial_status_merge_preserves_other_fields() {
        let mut r = Reconciler::new();
        let original = order("order:1", OrderStatus::Pending);
        let items = original.items.clone();
        let total = original.total_amount;
        r.apply(&ServerEvent::NewOrder(original));

        let patched_at = Utc::now();
        r.apply(&ServerEvent::OrderStatusUpdated(OrderStatusPatch {
            id: "order:1".to_string(),
            status: OrderStatus::Preparing,
            updated_at: patched_at,
        }));

        let merged = &r.orders()[0];
        assert_eq!(merged.status, OrderStatus::Preparing);
        assert_eq!(merged.updated_at, patched_at);
        assert_eq!(merged.items, items);
        assert!((merged.total_amount - total).abs() < f64::EPSILON);
    }

    #[test]
    fn test_delete_of_missing_id_is_noop() {
        let mut r = Reconciler::new();
        r.apply(&ServerEvent::NewOrder(order("order:1", OrderStatus::Pending)));
        assert!(!r.apply(&ServerEvent::OrderDeleted {
            id: "order:nope".to_string()
        }));
        assert_eq!(r.orders().len(), 1);

        assert!(r.apply(&ServerEvent::OrderDeleted {
            id: "order:1".to_string()
        }));
        assert!(r.orders().is_empty());
    }

    #[test]
    fn test_status_patch_for_unknown_order_is_noop() {
        let mut r = Reconciler::new();
        assert!(!r.apply(&ServerEvent::OrderStatusUpdated(OrderStatusPatch {
            id: "order:ghost".to_string(),
            status: OrderStatus::Served,
            updated_at: Utc::now(),
        })));
    }

    #[test]
    fn test_session_expiry_is_idempotent() {
        let mut r = Reconciler::new();
        r.apply(&ServerEvent::SessionCreated(session("table_session:1", true)));
        let ev = ServerEvent::SessionExpired {
            id: "table_session:1".to_string(),
            table_number: 7,
        };
        assert!(r.apply(&ev));
        assert!(!r.apply(&ev));
        assert!(!r.sessions()[0].is_active);
    }

    #[test]
    fn test_replace_overwrites_snapshot() {
        let mut r = Reconciler::new();
        r.apply(&ServerEvent::NewOrder(order("order:1", OrderStatus::Pending)));
        r.replace_orders(vec![order("order:9", OrderStatus::Served)]);
        assert_eq!(r.orders().len(), 1);
        assert_eq!(r.orders()[0].id, "order:9");
    }
}
