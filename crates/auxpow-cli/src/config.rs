//! Consensus parameter selection shared by the subcommands.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use auxpow_core::{ConsensusParams, Network};
use clap::Args;
use serde_json::Value;
use tracing::debug;

#[derive(Clone, Debug, Args)]
pub struct ParamsArgs {
    /// Network whose consensus parameters apply (mainnet, testnet, regtest)
    #[arg(long, env = "AUXPOW_NETWORK", default_value = "mainnet")]
    network: String,
    /// JSON file overriding the network's consensus parameters
    #[arg(long, env = "AUXPOW_CONFIG")]
    config: Option<PathBuf>,
}

impl ParamsArgs {
    pub fn load(&self) -> anyhow::Result<ConsensusParams> {
        let network = Network::from_str(&self.network)
            .ok_or_else(|| anyhow!("unknown network: {}", self.network))?;

        let params = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                apply_overrides(network, &raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => ConsensusParams::for_network(network),
        };
        debug!(%network, ?params, "consensus parameters");
        Ok(params)
    }
}

/// Network parameters with the fields present in the JSON object `raw` replaced.
fn apply_overrides(network: Network, raw: &str) -> anyhow::Result<ConsensusParams> {
    let mut params = serde_json::to_value(ConsensusParams::for_network(network))?;
    let overrides: Value = serde_json::from_str(raw)?;
    let (Value::Object(base), Value::Object(overrides)) = (&mut params, overrides) else {
        bail!("consensus parameters must be a JSON object");
    };
    base.extend(overrides);
    Ok(serde_json::from_value(params)?)
}

/// Decode a hex argument, or the contents of the file it names when prefixed with `@`.
pub fn read_hex(arg: &str) -> anyhow::Result<Vec<u8>> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?,
        None => arg.to_string(),
    };
    hex::decode(text.trim()).context("invalid hex")
}
