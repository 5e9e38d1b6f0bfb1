use ldap3_proto::LdapResultCode;
use thiserror::Error;

/// A result code returned by the server, with its diagnostic message.
#[derive(Debug, Clone, PartialEq)]
pub struct LdapError {
    pub code: LdapResultCode,
    pub message: String,
}

impl std::fmt::Display for LdapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            write!(f, "{:?}", self.code)
        } else {
            write!(f, "{:?}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for LdapError {}

impl LdapError {
    pub fn new(code: LdapResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == LdapResultCode::Success
    }

    /// Turns a server answer into a call result: anything but `Success` is an error.
    pub fn into_result(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(LdapClientError::Result(self))
        }
    }
}

#[derive(Error, Debug)]
pub enum LdapClientError {
    #[error("Connection is closing: `{0}`")]
    Closing(String),
    #[error("Network error: `{0}`")]
    Network(String),
    #[error("LDAP error: `{0}`")]
    Result(#[from] LdapError),
    #[error("Encoding error: `{0}`")]
    Encoding(String),
    #[error("I/O error: `{0}`")]
    Io(#[from] std::io::Error),
}

impl LdapClientError {
    /// The result code sent by the server, if the failure came from one.
    pub fn result_code(&self) -> Option<&LdapResultCode> {
        match self {
            LdapClientError::Result(e) => Some(&e.code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LdapClientError>;
