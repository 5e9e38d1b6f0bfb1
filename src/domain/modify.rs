use crate::domain::{
    error::{LdapClientError, Result},
    message::{MessageId, encode_message, message_to_bytes},
};
use bytes::Bytes;
use ldap3_proto::{
    LdapPartialAttribute,
    control::LdapControl,
    proto::{LdapModify, LdapModifyRequest, LdapModifyType, LdapOp},
};

/*
   ModifyRequest ::= [APPLICATION 6] SEQUENCE {
         object          LDAPDN,
         changes         SEQUENCE OF change SEQUENCE {
              operation       ENUMERATED {
                   add     (0),
                   delete  (1),
                   replace (2),
                   ...  },
              modification    PartialAttribute } }
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModOperation {
    Add,
    Delete,
    Replace,
}

impl ModOperation {
    /// The LDIF keyword for the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModOperation::Add => "add",
            ModOperation::Delete => "delete",
            ModOperation::Replace => "replace",
        }
    }
}

impl std::fmt::Display for ModOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModOperation {
    type Err = LdapClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(ModOperation::Add),
            "delete" => Ok(ModOperation::Delete),
            "replace" => Ok(ModOperation::Replace),
            _ => Err(LdapClientError::Encoding(format!(
                "Unknown modify operation: `{}`",
                s
            ))),
        }
    }
}

impl From<ModOperation> for LdapModifyType {
    fn from(operation: ModOperation) -> Self {
        match operation {
            ModOperation::Add => LdapModifyType::Add,
            ModOperation::Delete => LdapModifyType::Delete,
            ModOperation::Replace => LdapModifyType::Replace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryAttribute {
    pub name: String,
    pub values: Vec<String>,
}

/// A single change of a modify request.
///
/// Only a `Delete` may come without values, meaning "remove the whole attribute".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mod {
    operation: ModOperation,
    modification: EntryAttribute,
}

impl Mod {
    pub fn new<S: Into<String>>(
        operation: ModOperation,
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let modification = EntryAttribute {
            name: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
        };
        if modification.name.is_empty() {
            return Err(LdapClientError::Encoding(
                "Empty attribute description in modification".to_string(),
            ));
        }
        if modification.values.is_empty() && operation != ModOperation::Delete {
            return Err(LdapClientError::Encoding(format!(
                "No value given for `{}: {}`",
                operation, modification.name
            )));
        }
        Ok(Self {
            operation,
            modification,
        })
    }

    pub fn add<S: Into<String>>(
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        Self::new(ModOperation::Add, attribute, values)
    }

    pub fn delete<S: Into<String>>(
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        Self::new(ModOperation::Delete, attribute, values)
    }

    pub fn replace<S: Into<String>>(
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        Self::new(ModOperation::Replace, attribute, values)
    }

    pub fn operation(&self) -> ModOperation {
        self.operation
    }

    pub fn modification(&self) -> &EntryAttribute {
        &self.modification
    }

    /// Basic LDIF dump of the change, no line folding or base64.
    pub fn dump(&self) -> String {
        let name = &self.modification.name;
        let mut dump = format!("changetype: modify\n{}: {}\n", self.operation, name);
        for value in &self.modification.values {
            dump.push_str(&format!("{}: {}\n", name, value));
        }
        dump.push_str("-\n");
        dump
    }

    fn encode(&self) -> LdapModify {
        LdapModify {
            operation: self.operation.into(),
            modification: LdapPartialAttribute {
                atype: self.modification.name.clone(),
                vals: self
                    .modification
                    .values
                    .iter()
                    .map(|v| v.as_bytes().to_vec())
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModifyRequest {
    pub dn: String,
    pub mods: Vec<Mod>,
    pub controls: Vec<LdapControl>,
}

impl ModifyRequest {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            mods: Vec::with_capacity(5),
            controls: Vec::new(),
        }
    }

    pub fn add_mod(&mut self, modification: Mod) -> &mut Self {
        self.mods.push(modification);
        self
    }

    pub fn add_mods(&mut self, mods: impl IntoIterator<Item = Mod>) -> &mut Self {
        self.mods.extend(mods);
        self
    }

    pub fn with_controls(mut self, controls: Vec<LdapControl>) -> Self {
        self.controls = controls;
        self
    }

    /// Basic LDIF dump of the whole request.
    pub fn dump(&self) -> String {
        let mut dump = format!("dn: {}\n", self.dn);
        for modification in &self.mods {
            dump.push_str(&modification.dump());
        }
        dump
    }

    /// Wire encoding of the request, as a message with a placeholder id.
    pub fn to_bytes(&self) -> Result<Bytes> {
        message_to_bytes(encode_message(
            MessageId::UNSOLICITED,
            encode_modify(self),
            self.controls.clone(),
        ))
    }
}

impl std::fmt::Display for ModifyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.dump())
    }
}

/// Builds the `[APPLICATION 6]` envelope. The order of the changes is kept as is, since the
/// server applies them in sequence.
pub fn encode_modify(request: &ModifyRequest) -> LdapOp {
    LdapOp::ModifyRequest(LdapModifyRequest {
        dn: request.dn.clone(),
        changes: request.mods.iter().map(Mod::encode).collect(),
    })
}
