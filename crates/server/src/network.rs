//! Handoff between network I/O threads and the scheduler thread.
//!
//! I/O threads never touch the session registry directly. They queue
//! commands through a `NetworkSender`; the scheduler applies the queue during
//! the poll step, so structural changes only land between ticks.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use shardloop_common::SessionId;
use shardloop_kernel::{Session, SessionRegistry, SharedSession};
use std::sync::Arc;

use crate::error::NetworkError;

/// The network collaborator as seen by the tick loop.
pub trait NetworkPoller: Send {
    /// Accept connections and dispatch received packets. When this returns,
    /// sessions and their entities must be in a consistent state.
    fn poll_once(&mut self) -> Result<(), NetworkError>;
}

type SessionMutation = Box<dyn FnOnce(&SessionRegistry) + Send>;

/// A queued change to the session set.
pub enum SessionCommand {
    Connect {
        session: SharedSession,
        reply: Sender<SessionId>,
    },
    Disconnect(SessionId),
    /// An already-deserialized packet effect to run on the scheduler thread.
    Apply(SessionMutation),
}

/// Producer side, held by I/O threads.
#[derive(Clone)]
pub struct NetworkSender {
    tx: Sender<SessionCommand>,
}

impl NetworkSender {
    /// Queue a handshaken session. The receiver yields its id once the
    /// scheduler has registered it.
    pub fn connect<S: Session + 'static>(
        &self,
        session: S,
    ) -> Result<Receiver<SessionId>, NetworkError> {
        let (reply, assigned) = crossbeam_channel::bounded(1);
        self.send(SessionCommand::Connect {
            session: Arc::new(parking_lot::Mutex::new(session)),
            reply,
        })?;
        Ok(assigned)
    }

    pub fn disconnect(&self, id: SessionId) -> Result<(), NetworkError> {
        self.send(SessionCommand::Disconnect(id))
    }

    pub fn apply(
        &self,
        mutation: impl FnOnce(&SessionRegistry) + Send + 'static,
    ) -> Result<(), NetworkError> {
        self.send(SessionCommand::Apply(Box::new(mutation)))
    }

    fn send(&self, command: SessionCommand) -> Result<(), NetworkError> {
        self.tx.send(command).map_err(|_| NetworkError::Disconnected)
    }
}

/// Poller that drains queued session commands into the registry.
pub struct QueuedNetwork {
    sessions: SessionRegistry,
    rx: Receiver<SessionCommand>,
}

impl QueuedNetwork {
    pub fn new(sessions: SessionRegistry) -> (Self, NetworkSender) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { sessions, rx }, NetworkSender { tx })
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    fn apply(&self, command: SessionCommand) {
        match command {
            SessionCommand::Connect { session, reply } => {
                let id = self.sessions.connect_shared(session);
                // the I/O thread may have given up waiting
                let _ = reply.send(id);
            }
            SessionCommand::Disconnect(id) => {
                if self.sessions.disconnect(id).is_none() {
                    tracing::debug!(%id, "disconnect for unknown session");
                }
            }
            SessionCommand::Apply(mutation) => mutation(&self.sessions),
        }
    }
}

impl NetworkPoller for QueuedNetwork {
    fn poll_once(&mut self) -> Result<(), NetworkError> {
        loop {
            match self.rx.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(NetworkError::Disconnected),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardloop_kernel::Entity;

    struct Guest;

    impl Session for Guest {
        fn attached_entity(&mut self) -> Option<&mut (dyn Entity + 'static)> {
            None
        }
    }

    #[test]
    fn commands_land_only_on_poll() {
        let sessions = SessionRegistry::new();
        let (mut network, sender) = QueuedNetwork::new(sessions.clone());

        let assigned = sender.connect(Guest).unwrap();
        assert_eq!(sessions.len(), 0);
        assert_eq!(network.pending(), 1);

        network.poll_once().unwrap();
        let id = assigned.recv().unwrap();
        assert_eq!(sessions.ids(), vec![id]);

        sender.disconnect(id).unwrap();
        assert_eq!(sessions.len(), 1);
        network.poll_once().unwrap();
        assert!(sessions.is_empty());
    }

    #[test]
    fn apply_runs_on_poll() {
        let sessions = SessionRegistry::new();
        let (mut network, sender) = QueuedNetwork::new(sessions.clone());
        sender
            .apply(|registry| {
                registry.connect(Guest);
                registry.connect(Guest);
            })
            .unwrap();
        network.poll_once().unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn dropped_senders_are_fatal() {
        let (mut network, sender) = QueuedNetwork::new(SessionRegistry::new());
        sender.disconnect(shardloop_common::SessionId(3)).unwrap();
        drop(sender);
        assert!(matches!(
            network.poll_once(),
            Err(NetworkError::Disconnected)
        ));
    }

    #[test]
    fn senders_work_from_io_threads() {
        let sessions = SessionRegistry::new();
        let (mut network, sender) = QueuedNetwork::new(sessions.clone());
        let workers: Vec<_> = (0..3)
            .map(|_| {
                let sender = sender.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        sender.connect(Guest).unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        network.poll_once().unwrap();
        assert_eq!(sessions.len(), 30);
    }
}
