use crate::infra::cli::RunOpts;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Per-connection settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, derive_builder::Builder)]
#[builder(pattern = "owned")]
pub struct ConnectionOptions {
    /// Dump every PDU and every dropped reply to the logs.
    #[builder(default = "false")]
    pub debug: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, derive_builder::Builder)]
#[builder(pattern = "owned")]
pub struct Configuration {
    #[builder(default = r#"String::from("localhost")"#)]
    pub ldap_host: String,
    #[builder(default = "389")]
    pub ldap_port: u16,
    #[builder(default = "false")]
    pub verbose: bool,
    #[builder(default = "false")]
    pub debug: bool,
}

impl std::default::Default for Configuration {
    fn default() -> Self {
        ConfigurationBuilder::default().build().unwrap()
    }
}

impl Configuration {
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions { debug: self.debug }
    }

    fn merge_with_cli(mut self, opts: &RunOpts) -> Configuration {
        if let Some(host) = &opts.host {
            self.ldap_host.clone_from(host);
        }
        if let Some(port) = opts.port {
            self.ldap_port = port;
        }
        if opts.verbose {
            self.verbose = true;
        }
        if opts.debug {
            self.debug = true;
        }
        self
    }
}

fn extract(figment: Figment, opts: &RunOpts) -> Result<Configuration> {
    let config: Configuration = figment.extract().context("while reading the configuration")?;
    Ok(config.merge_with_cli(opts))
}

pub fn init(opts: &RunOpts) -> Result<Configuration> {
    extract(
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(&opts.config_file))
            .merge(Env::prefixed("LLDAP_CLIENT_")),
        opts,
    )
}
