#![forbid(unsafe_code)]
#![forbid(non_ascii_idents)]

pub mod domain;
pub mod infra;

pub use domain::{
    compare::CompareRequest,
    error::{LdapClientError, LdapError, Result},
    message::MessageId,
    modify::{EntryAttribute, Mod, ModOperation, ModifyRequest},
};
pub use infra::{
    configuration::{ConnectionOptions, ConnectionOptionsBuilder},
    connection::LdapConnection,
};
pub use ldap3_proto::LdapResultCode;
