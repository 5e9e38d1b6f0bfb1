use crate::{
    domain::{
        compare::{CompareRequest, encode_compare},
        error::Result,
        message::encode_message,
        modify::{ModifyRequest, encode_modify},
        result::{ResponseKind, compare_outcome, interpret},
    },
    infra::{configuration::ConnectionOptions, dispatcher::Dispatcher},
};
use ldap3_proto::{
    control::LdapControl,
    proto::{LdapMsg, LdapOp},
};
use std::sync::Arc;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tracing::{debug, instrument};

/// A connection to an LDAP server, shared by any number of concurrent callers.
///
/// Replies can come back in any order; each one is matched to its request by message id.
#[derive(Clone)]
pub struct LdapConnection {
    dispatcher: Arc<Dispatcher>,
}

impl std::fmt::Debug for LdapConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConnection")
            .field("closing", &self.is_closing())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl LdapConnection {
    /// Takes over an established stream. Must be called from within a tokio runtime.
    pub fn new<Stream>(stream: Stream, options: ConnectionOptions) -> Self
    where
        Stream: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self {
            dispatcher: Arc::new(Dispatcher::new(stream, options.debug)),
        }
    }

    #[instrument(skip(options), level = "info", err)]
    pub async fn connect(host: &str, port: u16, options: ConnectionOptions) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream, options))
    }

    async fn call(
        &self,
        op: impl FnOnce() -> Result<LdapOp>,
        controls: &[LdapControl],
    ) -> Result<LdapMsg> {
        let mut pending = self.dispatcher.register()?;
        let msg = encode_message(pending.id(), op()?, controls.to_vec());
        self.dispatcher.submit(msg).await?;
        debug!(id = %pending.id(), "Waiting for the reply");
        pending.wait().await
    }

    #[instrument(skip_all, level = "debug", fields(dn = %request.dn), err)]
    pub async fn modify(&self, request: &ModifyRequest) -> Result<()> {
        let reply = self
            .call(|| Ok(encode_modify(request)), &request.controls)
            .await?;
        interpret(ResponseKind::Modify, reply.op)?.into_result()
    }

    /// Returns whether the entry holds the asserted value.
    #[instrument(skip_all, level = "debug", fields(dn = %request.dn, attribute = %request.name), err)]
    pub async fn compare(&self, request: &CompareRequest) -> Result<bool> {
        let reply = self
            .call(|| encode_compare(request), &request.controls)
            .await?;
        compare_outcome(interpret(ResponseKind::Compare, reply.op)?)
    }

    /// Fails every pending call, then sends an unbind and shuts the transport down.
    pub async fn close(&self) {
        let unbind = self
            .dispatcher
            .register()
            .ok()
            .map(|pending| encode_message(pending.id(), LdapOp::UnbindRequest, vec![]));
        self.dispatcher.close(unbind).await;
    }

    pub fn is_closing(&self) -> bool {
        self.dispatcher.is_closing()
    }

    /// Number of requests waiting for their reply slot to be released.
    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }
}
