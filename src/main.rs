#![forbid(unsafe_code)]
#![forbid(non_ascii_idents)]

use anyhow::{Context, Result};
use lldap_client::{
    CompareRequest, LdapConnection,
    infra::{
        cli::{self, Command, CompareOpts, ModifyOpts},
        configuration::{self, Configuration},
        logging,
    },
};
use tracing::{debug, info, instrument};

async fn connect(config: &Configuration) -> Result<LdapConnection> {
    LdapConnection::connect(
        &config.ldap_host,
        config.ldap_port,
        config.connection_options(),
    )
    .await
    .with_context(|| {
        format!(
            "while connecting to {}:{}",
            config.ldap_host, config.ldap_port
        )
    })
}

#[instrument(skip_all, level = "info", err)]
async fn run_modify(config: &Configuration, opts: &ModifyOpts) -> Result<()> {
    let request = opts.to_request().context("Invalid modify request")?;
    if opts.dry_run {
        print!("{}", request);
        return Ok(());
    }
    let connection = connect(config).await?;
    let result = connection.modify(&request).await;
    connection.close().await;
    result.with_context(|| format!("while modifying `{}`", request.dn))?;
    info!("Modify success");
    Ok(())
}

#[instrument(skip_all, level = "info", err)]
async fn run_compare(config: &Configuration, opts: &CompareOpts) -> Result<()> {
    let request = CompareRequest::new(opts.dn.clone(), opts.attribute.clone(), opts.value.clone());
    let connection = connect(config).await?;
    let result = connection.compare(&request).await;
    connection.close().await;
    let matched = result.with_context(|| format!("while comparing `{}`", request.dn))?;
    println!("{}", matched);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_opts = cli::init();
    let config = configuration::init(&cli_opts.run_opts)?;
    logging::init(&config)?;

    debug!("CLI: {:#?}", &cli_opts);
    debug!("Configuration: {:#?}", &config);

    match &cli_opts.command {
        Command::Modify(opts) => run_modify(&config, opts).await,
        Command::Compare(opts) => run_compare(&config, opts).await,
    }
}
