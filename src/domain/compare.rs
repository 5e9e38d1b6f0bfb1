use crate::domain::{
    error::{LdapClientError, Result},
    message::{MessageId, encode_message, message_to_bytes},
};
use bytes::Bytes;
use ldap3_proto::{
    control::LdapControl,
    proto::{LdapCompareRequest, LdapOp},
};

/*
CompareRequest ::= [APPLICATION 14] SEQUENCE {
    entry           LDAPDN,
    ava             AttributeValueAssertion }

AttributeValueAssertion ::= SEQUENCE {
    attributeDesc   AttributeDescription,
    assertionValue  AssertionValue }
*/

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompareRequest {
    pub dn: String,
    pub name: String,
    pub value: String,
    pub controls: Vec<LdapControl>,
}

impl CompareRequest {
    pub fn new(dn: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            name: name.into(),
            value: value.into(),
            controls: Vec::new(),
        }
    }

    pub fn with_controls(mut self, controls: Vec<LdapControl>) -> Self {
        self.controls = controls;
        self
    }

    /// Wire encoding of the request, as a message with a placeholder id.
    pub fn to_bytes(&self) -> Result<Bytes> {
        message_to_bytes(encode_message(
            MessageId::UNSOLICITED,
            encode_compare(self)?,
            self.controls.clone(),
        ))
    }
}

/// Builds the `[APPLICATION 14]` envelope with its attribute value assertion.
pub fn encode_compare(request: &CompareRequest) -> Result<LdapOp> {
    if request.name.is_empty() {
        return Err(LdapClientError::Encoding(format!(
            "Empty attribute description in compare request for `{}`",
            request.dn
        )));
    }
    Ok(LdapOp::CompareRequest(LdapCompareRequest {
        dn: request.dn.clone(),
        atype: request.name.clone(),
        val: request.value.as_bytes().to_vec(),
    }))
}
