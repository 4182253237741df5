use qzs_core::*;
use qzs_gameroom::Bus;
use qzs_gameroom::ServerMessage;
use qzs_gameroom::Session;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;

/// One live socket bound to a session. A session holds one endpoint per
/// open tab; fan-out reaches all of them.
#[derive(Debug)]
struct Endpoint {
    id: u64,
    tx: UnboundedSender<String>,
}

/// Live transport state: endpoint channels per session and room membership
/// keyed by the decimal-string room form.
///
/// Sends are unbounded pushes, so every [`Bus`] call completes without
/// blocking the serial core; the per-endpoint bridge tasks do the actual
/// socket writes concurrently. Membership is snapshotted under the lock
/// before any send, and a failed push just means that endpoint is already
/// tearing down.
#[derive(Debug, Default)]
pub struct Gateway {
    endpoints: Mutex<HashMap<ID<Session>, Vec<Endpoint>>>,
    rooms: Mutex<HashMap<String, HashSet<ID<Session>>>>,
    next_endpoint: AtomicU64,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }
    /// Bind a new endpoint to a session; returns the endpoint id (for
    /// unregistering exactly this socket) and its outbound channel.
    pub fn register(&self, session: ID<Session>) -> (u64, UnboundedReceiver<String>) {
        let id = self.next_endpoint.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded_channel();
        self.endpoints
            .lock()
            .expect("gateway lock")
            .entry(session)
            .or_default()
            .push(Endpoint { id, tx });
        (id, rx)
    }
    /// Drop one endpoint. The session's room membership is left to the
    /// core's disconnect handling, which knows about refcounts.
    pub fn unregister(&self, session: ID<Session>, endpoint: u64) {
        let mut endpoints = self.endpoints.lock().expect("gateway lock");
        if let Some(list) = endpoints.get_mut(&session) {
            list.retain(|e| e.id != endpoint);
            if list.is_empty() {
                endpoints.remove(&session);
            }
        }
    }
    /// Number of live endpoints across all sessions.
    pub fn connections(&self) -> usize {
        self.endpoints
            .lock()
            .expect("gateway lock")
            .values()
            .map(Vec::len)
            .sum()
    }
    fn send_to_sessions(&self, sessions: &[ID<Session>], json: &str) {
        let endpoints = self.endpoints.lock().expect("gateway lock");
        for session in sessions {
            if let Some(list) = endpoints.get(session) {
                for endpoint in list {
                    let _ = endpoint.tx.send(json.to_string());
                }
            }
        }
    }
    fn room_snapshot(&self, key: &str) -> Vec<ID<Session>> {
        self.rooms
            .lock()
            .expect("gateway lock")
            .get(key)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Bus for Gateway {
    fn unicast(&self, session: ID<Session>, message: &ServerMessage) {
        self.send_to_sessions(&[session], &message.to_json());
    }
    fn room(&self, room: RoomId, message: &ServerMessage) {
        let members = self.room_snapshot(&room.key());
        self.send_to_sessions(&members, &message.to_json());
    }
    fn room_except(&self, room: RoomId, sender: ID<Session>, message: &ServerMessage) {
        let members: Vec<_> = self
            .room_snapshot(&room.key())
            .into_iter()
            .filter(|member| *member != sender)
            .collect();
        self.send_to_sessions(&members, &message.to_json());
    }
    fn all(&self, message: &ServerMessage) {
        let json = message.to_json();
        let endpoints = self.endpoints.lock().expect("gateway lock");
        for list in endpoints.values() {
            for endpoint in list {
                let _ = endpoint.tx.send(json.clone());
            }
        }
    }
    fn join(&self, session: ID<Session>, room: RoomId) {
        self.rooms
            .lock()
            .expect("gateway lock")
            .entry(room.key())
            .or_default()
            .insert(session);
    }
    fn leave(&self, session: ID<Session>, room: RoomId) {
        let mut rooms = self.rooms.lock().expect("gateway lock");
        if let Some(members) = rooms.get_mut(&room.key()) {
            members.remove(&session);
            if members.is_empty() {
                rooms.remove(&room.key());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(level: i64) -> RoomId {
        RoomId::parse(level).unwrap()
    }

    fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn unicast_reaches_every_tab_of_one_session() {
        let gateway = Gateway::new();
        let session = ID::default();
        let other = ID::default();
        let (_, mut tab1) = gateway.register(session);
        let (_, mut tab2) = gateway.register(session);
        let (_, mut elsewhere) = gateway.register(other);
        gateway.unicast(session, &ServerMessage::lobby_timer(5));
        assert_eq!(drain(&mut tab1).len(), 1);
        assert_eq!(drain(&mut tab2).len(), 1);
        assert!(drain(&mut elsewhere).is_empty());
    }

    #[tokio::test]
    async fn room_fanout_respects_membership() {
        let gateway = Gateway::new();
        let inside = ID::default();
        let outside = ID::default();
        let (_, mut in_rx) = gateway.register(inside);
        let (_, mut out_rx) = gateway.register(outside);
        gateway.join(inside, room(2));
        gateway.room(room(2), &ServerMessage::lobby_timer(9));
        assert_eq!(drain(&mut in_rx).len(), 1);
        assert!(drain(&mut out_rx).is_empty());
        gateway.leave(inside, room(2));
        gateway.room(room(2), &ServerMessage::lobby_timer(8));
        assert!(drain(&mut in_rx).is_empty());
    }

    #[tokio::test]
    async fn room_except_skips_all_tabs_of_the_sender() {
        let gateway = Gateway::new();
        let sender = ID::default();
        let peer = ID::default();
        let (_, mut sender_a) = gateway.register(sender);
        let (_, mut sender_b) = gateway.register(sender);
        let (_, mut peer_rx) = gateway.register(peer);
        gateway.join(sender, room(1));
        gateway.join(peer, room(1));
        gateway.room_except(room(1), sender, &ServerMessage::exited("Alice"));
        assert!(drain(&mut sender_a).is_empty());
        assert!(drain(&mut sender_b).is_empty());
        assert_eq!(drain(&mut peer_rx).len(), 1);
    }

    #[tokio::test]
    async fn broadcast_all_reaches_everyone() {
        let gateway = Gateway::new();
        let a = ID::default();
        let b = ID::default();
        let (_, mut a_rx) = gateway.register(a);
        let (_, mut b_rx) = gateway.register(b);
        gateway.all(&ServerMessage::round_started(150));
        assert_eq!(drain(&mut a_rx).len(), 1);
        assert_eq!(drain(&mut b_rx).len(), 1);
    }

    #[tokio::test]
    async fn unregister_drops_only_that_endpoint() {
        let gateway = Gateway::new();
        let session = ID::default();
        let (first, mut first_rx) = gateway.register(session);
        let (_, mut second_rx) = gateway.register(session);
        assert_eq!(gateway.connections(), 2);
        gateway.unregister(session, first);
        assert_eq!(gateway.connections(), 1);
        gateway.unicast(session, &ServerMessage::lobby_timer(1));
        assert!(drain(&mut first_rx).is_empty());
        assert_eq!(drain(&mut second_rx).len(), 1);
    }
}
