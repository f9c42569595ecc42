//! Subcommand implementations.

use crate::{CreateArgs, OpenArgs, SealArgs, VerifyArgs};
use anyhow::{Context, Result, bail};
use mould_crypto::Pin;
use mould_provision::{
    BackendClient, NewOperator, ProvisionConfig, Provisioner, Verifier, lookup_credentials,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Reads the config file when given, otherwise the environment.
pub fn load_config(path: Option<&Path>) -> Result<Arc<ProvisionConfig>> {
    let config = match path {
        Some(path) => ProvisionConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ProvisionConfig::from_env().context("failed to load config from environment")?,
    };
    Ok(Arc::new(config))
}

fn connect(config: Arc<ProvisionConfig>) -> Result<Arc<BackendClient>> {
    let api = BackendClient::new(config).context("cannot reach the backend")?;
    Ok(Arc::new(api))
}

pub async fn create(config: Arc<ProvisionConfig>, args: &CreateArgs) -> Result<()> {
    let api = connect(config)?;
    let request = NewOperator::new(&args.name, &args.email, &args.role, &args.pin);

    let created = Provisioner::new(api.clone()).provision(&request).await?;
    if args.verify {
        Verifier::new(api).verify(&created).await?;
    }

    println!("{}", serde_json::to_string_pretty(&created)?);
    Ok(())
}

pub async fn verify(config: Arc<ProvisionConfig>, args: &VerifyArgs) -> Result<()> {
    let expected_password = config.default_password.clone();
    let api = connect(config)?;

    let creds = lookup_credentials(&api, args.pin.trim()).await?;
    if creds.email != args.email.trim() {
        bail!("PIN resolves to a different operator ({})", creds.email);
    }
    if creds.password != expected_password {
        bail!("PIN credentials do not carry the configured password");
    }

    info!("PIN resolves to {}", creds.email);
    println!("ok");
    Ok(())
}

pub fn seal(config: &ProvisionConfig, args: &SealArgs) -> Result<()> {
    let pin = Pin::parse(args.pin.trim())?;
    let password = args.password.as_deref().unwrap_or(&config.default_password);
    let sealed = mould_crypto::self_test(pin.as_str(), args.email.trim(), password)?;

    let out = json!({ "PIN": sealed.pin, "encrypted_acess": sealed.envelope });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

pub fn open(args: &OpenArgs) -> Result<()> {
    let creds = mould_crypto::decrypt(args.pin.trim(), &args.envelope)
        .context("envelope does not open with this PIN")?;
    println!("{}", creds.email);
    Ok(())
}
