use crate::domain::{
    error::{LdapClientError, Result},
    modify::{Mod, ModOperation, ModifyRequest},
};
use clap::{Args, Parser, Subcommand};

/// lldap_client sends modify and compare requests to an LDAP server
#[derive(Debug, Parser, Clone)]
#[clap(version, author = "The LLDAP team")]
pub struct CLIOpts {
    #[clap(flatten)]
    pub run_opts: RunOpts,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Apply changes to an entry.
    #[clap(name = "modify")]
    Modify(ModifyOpts),
    /// Check whether an entry has an attribute value.
    #[clap(name = "compare")]
    Compare(CompareOpts),
}

#[derive(Debug, Args, Clone)]
pub struct RunOpts {
    /// Change config file name.
    #[clap(
        short,
        long,
        default_value = "lldap_client.toml",
        env = "LLDAP_CLIENT_CONFIG_FILE",
        global = true
    )]
    pub config_file: String,

    /// Change the LDAP server host. Default: localhost
    #[clap(long, env = "LLDAP_CLIENT_LDAP_HOST", global = true)]
    pub host: Option<String>,

    /// Change the LDAP server port. Default: 389
    #[clap(long, env = "LLDAP_CLIENT_LDAP_PORT", global = true)]
    pub port: Option<u16>,

    /// Set verbose logging.
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Log every LDAP message sent and received.
    #[clap(long, global = true)]
    pub debug: bool,
}

/// One change, as `<operation>:<attribute>[=<value>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeArg {
    pub operation: ModOperation,
    pub attribute: String,
    pub value: Option<String>,
}

impl std::str::FromStr for ChangeArg {
    type Err = LdapClientError;

    fn from_str(s: &str) -> Result<Self> {
        let (operation, rest) = s.split_once(':').ok_or_else(|| {
            LdapClientError::Encoding(format!(
                "Invalid change `{}`, expected `<operation>:<attribute>[=<value>]`",
                s
            ))
        })?;
        let (attribute, value) = match rest.split_once('=') {
            Some((attribute, value)) => (attribute, Some(value.to_string())),
            None => (rest, None),
        };
        Ok(ChangeArg {
            operation: operation.parse()?,
            attribute: attribute.to_string(),
            value,
        })
    }
}

#[derive(Debug, Args, Clone)]
pub struct ModifyOpts {
    /// DN of the entry to modify.
    pub dn: String,

    /// Changes, applied in order, e.g. `add:cn=bob` or `delete:description`. Consecutive
    /// changes on the same attribute with the same operation are grouped.
    #[clap(required = true)]
    pub changes: Vec<ChangeArg>,

    /// Print the request as LDIF instead of sending it.
    #[clap(long)]
    pub dry_run: bool,
}

impl ModifyOpts {
    pub fn to_request(&self) -> Result<ModifyRequest> {
        let mut groups: Vec<(ModOperation, &str, Vec<&str>)> = Vec::new();
        for change in &self.changes {
            let values = change.value.as_deref().into_iter();
            // A change without a value applies to the whole attribute: never merge it.
            let same_group = change.value.is_some()
                && groups
                    .last()
                    .is_some_and(|(operation, attribute, group_values)| {
                        *operation == change.operation
                            && *attribute == change.attribute
                            && !group_values.is_empty()
                    });
            if same_group {
                if let Some((_, _, group_values)) = groups.last_mut() {
                    group_values.extend(values);
                }
            } else {
                groups.push((change.operation, change.attribute.as_str(), values.collect()));
            }
        }
        let mut request = ModifyRequest::new(self.dn.clone());
        for (operation, attribute, values) in groups {
            request.add_mod(Mod::new(operation, attribute, values)?);
        }
        Ok(request)
    }
}

#[derive(Debug, Args, Clone)]
pub struct CompareOpts {
    /// DN of the entry to check.
    pub dn: String,

    /// Attribute to compare.
    pub attribute: String,

    /// Asserted value.
    pub value: String,
}

pub fn init() -> CLIOpts {
    CLIOpts::parse()
}
