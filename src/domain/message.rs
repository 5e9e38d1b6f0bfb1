use crate::domain::error::{LdapClientError, Result};
use bytes::{Bytes, BytesMut};
use ldap3_proto::{
    LdapCodec,
    control::LdapControl,
    proto::{LdapMsg, LdapOp},
};
use tokio_util::codec::Encoder;

/// Correlation identifier of a request on a connection.
///
/// Zero is reserved by the protocol for unsolicited notifications.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display, derive_more::From,
)]
pub struct MessageId(i32);

impl MessageId {
    pub const UNSOLICITED: MessageId = MessageId(0);

    pub fn get(self) -> i32 {
        self.0
    }

    pub fn is_unsolicited(self) -> bool {
        self.0 == 0
    }
}

/// Wraps an operation envelope in the outer `LDAPMessage` sequence.
pub fn encode_message(id: MessageId, op: LdapOp, controls: Vec<LdapControl>) -> LdapMsg {
    LdapMsg {
        msgid: id.get(),
        op,
        ctrl: controls,
    }
}

/// Serializes a full message the same way it goes on the wire.
pub fn message_to_bytes(msg: LdapMsg) -> Result<Bytes> {
    let mut buffer = BytesMut::new();
    LdapCodec::default()
        .encode(msg, &mut buffer)
        .map_err(|e| LdapClientError::Encoding(format!("while serializing message: {:#}", e)))?;
    Ok(buffer.freeze())
}
