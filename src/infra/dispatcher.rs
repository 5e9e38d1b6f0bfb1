use crate::{
    domain::{
        error::{LdapClientError, Result},
        message::MessageId,
    },
    infra::message_id::MessageIdAllocator,
};
use futures_util::{SinkExt, StreamExt};
use ldap3_proto::{
    LdapCodec,
    proto::{LdapMsg, LdapOp},
};
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::oneshot,
    task::JoinHandle,
};
use tokio_util::{
    codec::{FramedRead, FramedWrite},
    sync::CancellationToken,
};
use tracing::{debug, info, warn};

type Writer = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, LdapCodec>;

/// How long `close` waits for the farewell message to go out on a stalled transport.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// In-flight requests. A slot stays registered until its `PendingReply` is dropped, even
/// after the reply was delivered, so that its id can't be handed out again in between.
#[derive(Default)]
struct Registry {
    closed: bool,
    pending: HashMap<MessageId, Option<oneshot::Sender<LdapMsg>>>,
}

struct Shared {
    registry: Mutex<Registry>,
    ids: MessageIdAllocator,
    shutdown: CancellationToken,
    debug: bool,
}

impl Shared {
    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Routes a reply to its waiter. Returns false if the server asked to hang up.
    fn deliver(&self, msg: LdapMsg) -> bool {
        let id = MessageId::from(msg.msgid);
        if id.is_unsolicited() {
            if let LdapOp::ExtendedResponse(notice) = &msg.op {
                warn!(
                    "Notice of disconnection from the server: {:?} {}",
                    notice.res.code, notice.res.message
                );
                return false;
            }
            warn!("Ignoring unsolicited message: {:?}", msg.op);
            return true;
        }
        let sender = self
            .lock_registry()
            .pending
            .get_mut(&id)
            .and_then(Option::take);
        match sender {
            Some(sender) => {
                if self.debug {
                    debug!(%id, ?msg, "Got reply");
                }
                if sender.send(msg).is_err() && self.debug {
                    debug!(%id, "Waiter went away before the reply");
                }
            }
            None => {
                if self.debug {
                    debug!(%id, ?msg, "Dropping reply without a waiter");
                }
            }
        }
        true
    }

    fn release(&self, id: MessageId) {
        self.lock_registry().pending.remove(&id);
    }

    /// Wakes up every waiter with a closed channel, and every writer stuck on the
    /// transport. Returns whether it was still open.
    fn close(&self) -> bool {
        self.ids.close();
        self.shutdown.cancel();
        let mut registry = self.lock_registry();
        let was_open = !registry.closed;
        registry.closed = true;
        for sender in registry.pending.values_mut() {
            sender.take();
        }
        was_open
    }
}

async fn read_replies<Reader>(mut replies: FramedRead<Reader, LdapCodec>, shared: Arc<Shared>)
where
    Reader: AsyncRead + Unpin,
{
    while let Some(msg) = replies.next().await {
        match msg {
            Ok(msg) => {
                if !shared.deliver(msg) {
                    break;
                }
            }
            Err(e) => {
                warn!("Error while receiving LDAP message: {:#}", e);
                break;
            }
        }
    }
    if shared.close() {
        info!("LDAP connection closed by the server");
    }
}

/// Reply slot of one request. Dropping it releases the message id.
pub struct PendingReply {
    id: MessageId,
    receiver: oneshot::Receiver<LdapMsg>,
    shared: Arc<Shared>,
}

impl PendingReply {
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Waits for the reply, or for the connection to close.
    pub async fn wait(&mut self) -> Result<LdapMsg> {
        (&mut self.receiver).await.map_err(|_| {
            LdapClientError::Network(format!(
                "Connection closed before the reply to message {} arrived",
                self.id
            ))
        })
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.shared.release(self.id);
    }
}

/// Owns both halves of the connection: writes are serialized, and a single task reads the
/// replies and hands them over to the waiting callers.
pub struct Dispatcher {
    shared: Arc<Shared>,
    writer: tokio::sync::Mutex<Writer>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Spawns the reader task: must be called from within a tokio runtime.
    pub fn new<Stream>(stream: Stream, debug: bool) -> Self
    where
        Stream: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (r, w) = tokio::io::split(stream);
        let shared = Arc::new(Shared {
            registry: Mutex::new(Registry::default()),
            ids: MessageIdAllocator::default(),
            shutdown: CancellationToken::new(),
            debug,
        });
        let reader = tokio::spawn(read_replies(
            FramedRead::new(r, LdapCodec::default()),
            shared.clone(),
        ));
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(w);
        Self {
            shared,
            writer: tokio::sync::Mutex::new(FramedWrite::new(writer, LdapCodec::default())),
            reader: Mutex::new(Some(reader)),
        }
    }

    /// Reserves a message id that is not in flight, with its reply slot.
    pub fn register(&self) -> Result<PendingReply> {
        let mut registry = self.shared.lock_registry();
        let closing = || LdapClientError::Closing("Message id allocator is closed".to_string());
        if registry.closed {
            return Err(closing());
        }
        loop {
            let id = self.shared.ids.next().ok_or_else(closing)?;
            if let Entry::Vacant(entry) = registry.pending.entry(id) {
                let (sender, receiver) = oneshot::channel();
                entry.insert(Some(sender));
                return Ok(PendingReply {
                    id,
                    receiver,
                    shared: self.shared.clone(),
                });
            }
        }
    }

    /// Writes one message. Doesn't wait for the reply.
    ///
    /// Gives up as soon as the connection closes, even halfway through a write.
    pub async fn submit(&self, msg: LdapMsg) -> Result<()> {
        let msgid = msg.msgid;
        let shutdown = &self.shared.shutdown;
        if shutdown.is_cancelled() {
            return Err(LdapClientError::Closing(format!(
                "Connection closed, message {} was not sent",
                msgid
            )));
        }
        if self.shared.debug {
            debug!(?msg, "Sending request");
        }
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(LdapClientError::Network(format!(
                "Connection closed while sending message {}",
                msgid
            ))),
            sent = async { self.writer.lock().await.send(msg).await } => sent.map_err(|e| {
                LdapClientError::Network(format!("while sending message {}: {:#}", msgid, e))
            }),
        }
    }

    pub fn is_closing(&self) -> bool {
        self.shared.ids.is_closing()
    }

    /// Number of registered reply slots.
    pub fn in_flight(&self) -> usize {
        self.shared.lock_registry().pending.len()
    }

    fn stop_reader(&self) {
        if let Some(reader) = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            reader.abort();
        }
    }

    /// Fails every waiting caller, then sends `farewell` and shuts the transport down if
    /// it still accepts writes within `SHUTDOWN_TIMEOUT`.
    pub async fn close(&self, farewell: Option<LdapMsg>) {
        self.shared.close();
        self.stop_reader();
        let shutdown = async {
            let mut writer = self.writer.lock().await;
            if let Some(msg) = farewell {
                if let Err(e) = writer.send(msg).await {
                    debug!("Could not send the farewell message: {:#}", e);
                }
            }
            writer.close().await
        };
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, shutdown).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Error while shutting down the connection: {:#}", e),
            Err(_) => debug!("Transport stalled, dropping it without a clean shutdown"),
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shared.close();
        self.stop_reader();
    }
}
