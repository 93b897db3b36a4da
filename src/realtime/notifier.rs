use super::event::{AttendanceEvent, ServerMessage};
use crate::model::identity::SubjectIdentity;
use derive_more::Display;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info};
use uuid::Uuid;

pub const ADMIN_GROUP: &str = "admin_room";

pub fn subject_group(subject_id: u64) -> String {
    format!("employee_{subject_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct ConnectionId(String);

impl ConnectionId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NotifierError {
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
}

/// Receives attendance events once the change behind them has been stored.
pub trait AttendancePublisher: Send + Sync {
    fn publish(&self, event: AttendanceEvent);
}

struct Connection {
    sender: UnboundedSender<ServerMessage>,
    admin_identity: Option<String>,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    groups: HashMap<String, HashSet<ConnectionId>>,
}

impl Registry {
    fn join(&mut self, group: &str, id: &ConnectionId) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(id.clone());
    }

    fn leave(&mut self, group: &str, id: &ConnectionId) {
        if let Some(members) = self.groups.get_mut(group) {
            members.remove(id);
            if members.is_empty() {
                self.groups.remove(group);
            }
        }
    }

    fn drop_connection(&mut self, id: &ConnectionId) -> bool {
        self.groups.retain(|_, members| {
            members.remove(id);
            !members.is_empty()
        });
        self.connections.remove(id).is_some()
    }

    fn send(&self, id: &ConnectionId, message: ServerMessage) -> Result<(), NotifierError> {
        let connection = self
            .connections
            .get(id)
            .ok_or_else(|| NotifierError::UnknownConnection(id.clone()))?;
        // A closed receiver is cleaned up on disconnect or on the next publish.
        let _ = connection.sender.send(message);
        Ok(())
    }
}

/// Group-membership registry plus fan-out. Membership lives only in memory: clients
/// re-join after a restart or reconnect.
#[derive(Default)]
pub struct Notifier {
    registry: RwLock<Registry>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn connect(&self) -> (ConnectionId, UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = unbounded_channel();
        let id = ConnectionId::generate();
        let _ = sender.send(ServerMessage::Connected {
            connection_id: id.to_string(),
        });

        self.write().connections.insert(
            id.clone(),
            Connection {
                sender,
                admin_identity: None,
            },
        );
        info!(connection_id = %id, "Realtime client connected");
        (id, receiver)
    }

    pub fn disconnect(&self, id: &ConnectionId) {
        if self.write().drop_connection(id) {
            info!(connection_id = %id, "Realtime client disconnected");
        }
    }

    pub fn join_admin_group(
        &self,
        id: &ConnectionId,
        identity: &SubjectIdentity,
    ) -> Result<(), NotifierError> {
        let mut registry = self.write();
        let connection = registry
            .connections
            .get_mut(id)
            .ok_or_else(|| NotifierError::UnknownConnection(id.clone()))?;
        connection.admin_identity = Some(identity.display_name.clone());
        registry.join(ADMIN_GROUP, id);
        registry.send(
            id,
            ServerMessage::AdminJoined {
                connection_id: id.to_string(),
                message: "Successfully joined admin room".to_string(),
            },
        )?;
        info!(connection_id = %id, admin = %identity.display_name, "Admin joined");
        Ok(())
    }

    pub fn leave_admin_group(&self, id: &ConnectionId) -> Result<(), NotifierError> {
        let mut registry = self.write();
        let connection = registry
            .connections
            .get_mut(id)
            .ok_or_else(|| NotifierError::UnknownConnection(id.clone()))?;
        let admin = connection.admin_identity.take();
        registry.leave(ADMIN_GROUP, id);
        info!(connection_id = %id, admin = ?admin, "Admin left");
        Ok(())
    }

    pub fn join_subject_group(
        &self,
        id: &ConnectionId,
        subject_id: u64,
    ) -> Result<(), NotifierError> {
        let mut registry = self.write();
        if !registry.connections.contains_key(id) {
            return Err(NotifierError::UnknownConnection(id.clone()));
        }
        registry.join(&subject_group(subject_id), id);
        registry.send(
            id,
            ServerMessage::EmployeeJoined {
                connection_id: id.to_string(),
                subject_id,
                message: "Successfully connected".to_string(),
            },
        )?;
        info!(connection_id = %id, subject_id, "Employee joined");
        Ok(())
    }

    pub fn is_member(&self, group: &str, id: &ConnectionId) -> bool {
        self.read()
            .groups
            .get(group)
            .is_some_and(|members| members.contains(id))
    }

    pub fn group_size(&self, group: &str) -> usize {
        self.read().groups.get(group).map_or(0, HashSet::len)
    }

    pub fn connection_count(&self) -> usize {
        self.read().connections.len()
    }

    /// Delivers to the admin group and the employee's own group, each connection once.
    /// Never blocks and never fails; connections whose receiver is gone are pruned.
    pub fn broadcast(&self, event: AttendanceEvent) -> usize {
        let personal = subject_group(event.subject.subject_id);
        let message = ServerMessage::AttendanceUpdate(event);

        let (delivered, dead) = {
            let registry = self.read();
            let targets: HashSet<&ConnectionId> = [ADMIN_GROUP, personal.as_str()]
                .iter()
                .filter_map(|group| registry.groups.get(*group))
                .flatten()
                .collect();

            if targets.is_empty() {
                debug!("No realtime subscribers for attendance update");
                return 0;
            }

            let mut delivered = 0;
            let mut dead = Vec::new();
            for id in targets {
                let sent = registry
                    .connections
                    .get(id)
                    .is_some_and(|c| c.sender.send(message.clone()).is_ok());
                if sent {
                    delivered += 1;
                } else {
                    dead.push(id.clone());
                }
            }
            (delivered, dead)
        };

        if !dead.is_empty() {
            let mut registry = self.write();
            for id in &dead {
                registry.drop_connection(id);
                debug!(connection_id = %id, "Pruned closed realtime connection");
            }
        }

        delivered
    }
}

impl AttendancePublisher for Notifier {
    fn publish(&self, event: AttendanceEvent) {
        self.broadcast(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{AttendanceStatus, FormattedRecord};
    use crate::model::identity::SubjectSummary;
    use crate::model::role::Role;
    use crate::realtime::event::EventKind;

    fn admin() -> SubjectIdentity {
        SubjectIdentity {
            subject_id: 1,
            display_name: "Root".into(),
            department: None,
            role: Role::Admin,
        }
    }

    fn event(subject_id: u64) -> AttendanceEvent {
        AttendanceEvent {
            kind: EventKind::Checkin,
            record: FormattedRecord {
                id: "r".into(),
                employee_id: subject_id,
                employee_name: "Ada".into(),
                date: "2026-01-05".into(),
                check_in: "09:00:00".into(),
                check_out: None,
                total_hours: 0.0,
                status: AttendanceStatus::Present,
                remarks: None,
                check_in_location: "Office".into(),
                check_out_location: None,
            },
            subject: SubjectSummary {
                display_name: "Ada".into(),
                subject_id,
                department: None,
            },
        }
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    fn updates(rx: &mut UnboundedReceiver<ServerMessage>) -> usize {
        drain(rx)
            .into_iter()
            .filter(|m| matches!(m, ServerMessage::AttendanceUpdate(_)))
            .count()
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let notifier = Notifier::new();
        assert_eq!(notifier.broadcast(event(5)), 0);

        let (_id, mut rx) = notifier.connect();
        notifier.publish(event(5));
        assert_eq!(updates(&mut rx), 0);
    }

    #[test]
    fn connect_greets_with_connection_id() {
        let notifier = Notifier::new();
        let (id, mut rx) = notifier.connect();
        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::Connected {
                connection_id: id.to_string()
            }]
        );
    }

    #[test]
    fn admin_group_receives_every_event() {
        let notifier = Notifier::new();
        let (a, mut rx_a) = notifier.connect();
        let (_b, mut rx_b) = notifier.connect();

        notifier.join_admin_group(&a, &admin()).unwrap();
        assert!(notifier.is_member(ADMIN_GROUP, &a));

        assert_eq!(notifier.broadcast(event(5)), 1);
        assert_eq!(notifier.broadcast(event(6)), 1);
        assert_eq!(updates(&mut rx_a), 2);
        assert_eq!(updates(&mut rx_b), 0);
    }

    #[test]
    fn joins_are_idempotent_and_do_not_evict_each_other() {
        let notifier = Notifier::new();
        let (id, mut rx) = notifier.connect();

        notifier.join_admin_group(&id, &admin()).unwrap();
        notifier.join_admin_group(&id, &admin()).unwrap();
        notifier.join_subject_group(&id, 5).unwrap();
        assert_eq!(notifier.group_size(ADMIN_GROUP), 1);
        assert!(notifier.is_member(&subject_group(5), &id));

        // Member of both target groups, still delivered once.
        assert_eq!(notifier.broadcast(event(5)), 1);
        assert_eq!(updates(&mut rx), 1);

        notifier.leave_admin_group(&id).unwrap();
        notifier.leave_admin_group(&id).unwrap();
        assert!(!notifier.is_member(ADMIN_GROUP, &id));
        assert!(notifier.is_member(&subject_group(5), &id));
    }

    #[test]
    fn subject_group_only_sees_its_own_events() {
        let notifier = Notifier::new();
        let (id, mut rx) = notifier.connect();
        notifier.join_subject_group(&id, 5).unwrap();

        notifier.broadcast(event(6));
        assert_eq!(updates(&mut rx), 0);
        notifier.broadcast(event(5));
        assert_eq!(updates(&mut rx), 1);
    }

    #[test]
    fn unknown_connections_are_rejected() {
        let notifier = Notifier::new();
        let ghost = ConnectionId::from("nope".to_string());
        assert_eq!(
            notifier.join_admin_group(&ghost, &admin()),
            Err(NotifierError::UnknownConnection(ghost.clone()))
        );
        assert!(notifier.join_subject_group(&ghost, 1).is_err());
        assert!(notifier.leave_admin_group(&ghost).is_err());
    }

    #[test]
    fn disconnect_clears_all_memberships() {
        let notifier = Notifier::new();
        let (id, _rx) = notifier.connect();
        notifier.join_admin_group(&id, &admin()).unwrap();
        notifier.join_subject_group(&id, 9).unwrap();

        notifier.disconnect(&id);
        assert_eq!(notifier.connection_count(), 0);
        assert_eq!(notifier.group_size(ADMIN_GROUP), 0);
        assert_eq!(notifier.group_size(&subject_group(9)), 0);
    }

    #[test]
    fn dropped_receivers_are_pruned_on_publish() {
        let notifier = Notifier::new();
        let (gone, rx_gone) = notifier.connect();
        let (alive, mut rx_alive) = notifier.connect();
        notifier.join_admin_group(&gone, &admin()).unwrap();
        notifier.join_admin_group(&alive, &admin()).unwrap();
        drop(rx_gone);

        assert_eq!(notifier.broadcast(event(5)), 1);
        assert_eq!(notifier.connection_count(), 1);
        assert!(!notifier.is_member(ADMIN_GROUP, &gone));
        assert_eq!(updates(&mut rx_alive), 1);
    }
}
