use crate::domain::error::{LdapClientError, LdapError, Result};
use ldap3_proto::{
    LdapResultCode,
    proto::{LdapOp, LdapResult as LdapResultOp},
};

fn into_ldap_error(result: LdapResultOp) -> LdapError {
    LdapError {
        code: result.code,
        message: result.message,
    }
}

/// The response an operation waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Modify,
    Compare,
}

/// Extracts the result code and the diagnostic message of a reply.
///
/// A reply that doesn't answer the request it was matched to has no usable body, and is
/// treated like a broken connection.
pub fn interpret(expected: ResponseKind, op: LdapOp) -> Result<LdapError> {
    match (expected, op) {
        (ResponseKind::Modify, LdapOp::ModifyResponse(result))
        | (ResponseKind::Compare, LdapOp::CompareResult(result)) => Ok(into_ldap_error(result)),
        (expected, op) => Err(LdapClientError::Network(format!(
            "Expected a {:?} response, got: {:?}",
            expected, op
        ))),
    }
}

/// `compareTrue` and `compareFalse` are the answer of a compare, not failures.
pub fn compare_outcome(result: LdapError) -> Result<bool> {
    match result.code {
        LdapResultCode::CompareTrue => Ok(true),
        LdapResultCode::CompareFalse => Ok(false),
        _ => Err(LdapClientError::Result(result)),
    }
}
