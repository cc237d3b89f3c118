//! CLI wrappers for proof verification

use anyhow::{bail, Context};
use auxpow_core::{
    check_block_proof_of_work, deserialize, hash_from_display_hex, hash_to_display_hex, verify,
    AuxBlockHeader, AuxPow, ValidationState,
};
use clap::Args;
use serde_json::json;
use tracing::info;

use crate::config::{read_hex, ParamsArgs};

/// CLI arguments for the `verify` subcommand
#[derive(Clone, Debug, Args)]
pub struct VerifyArgs {
    /// Serialized proof in hex, or @path to a file holding it
    #[arg(long)]
    proof: String,
    /// Auxiliary block hash in display byte order
    #[arg(long)]
    aux_hash: String,
    /// Chain id of the auxiliary chain (defaults to the configured chain id)
    #[arg(long, env = "AUXPOW_CHAIN_ID")]
    chain_id: Option<i32>,
    #[command(flatten)]
    params: ParamsArgs,
}

/// CLI arguments for the `block` subcommand
#[derive(Clone, Debug, Args)]
pub struct BlockArgs {
    /// Serialized auxiliary header (with its proof when flagged) in hex, or @path
    #[arg(long)]
    header: String,
    #[command(flatten)]
    params: ParamsArgs,
}

/// Run the `verify` subcommand: decode a proof and check it against an aux block hash
pub fn run(args: VerifyArgs) -> anyhow::Result<()> {
    let params = args.params.load()?;
    let proof: AuxPow = deserialize(&read_hex(&args.proof)?).context("decoding proof")?;
    let aux_hash = hash_from_display_hex(&args.aux_hash)?;
    let chain_id = args.chain_id.unwrap_or(params.auxpow_chain_id);

    let result = verify(&proof, &aux_hash, chain_id, &params);
    let mut state = ValidationState::default();
    if let Err(err) = &result {
        err.report(&mut state);
    }

    println!(
        "{}",
        json!({
            "aux_hash": hash_to_display_hex(&aux_hash),
            "parent_hash": hash_to_display_hex(&proof.parent_hash()),
            "chain_id": chain_id,
            "chain_index": proof.chain_index,
            "valid": result.is_ok(),
            "kind": result.as_ref().err().map(|err| format!("{:?}", err.kind())),
            "dos_score": state.dos_score(),
        })
    );

    match result {
        Ok(()) => {
            info!("proof is valid");
            Ok(())
        }
        Err(err) => bail!("proof rejected: {err}"),
    }
}

/// Run the `block` subcommand: full proof-of-work check of an auxiliary header
pub fn run_block(args: BlockArgs) -> anyhow::Result<()> {
    let params = args.params.load()?;
    let header: AuxBlockHeader =
        deserialize(&read_hex(&args.header)?).context("decoding header")?;

    info!(
        hash = %hash_to_display_hex(&header.hash()),
        chain_id = header.header.chain_id(),
        merge_mined = header.auxpow.is_some(),
        "checking block"
    );
    check_block_proof_of_work(&header, &params).context("block proof of work")?;
    info!("block proof of work is valid");
    Ok(())
}
