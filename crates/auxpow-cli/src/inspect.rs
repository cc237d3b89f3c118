//! Inspection helpers: commitments, slots and headers

use anyhow::{anyhow, Context};
use auxpow_core::network::{BLOCK_HEADER_SIZE, MAX_CHAIN_MERKLE_HEIGHT};
use auxpow_core::{
    bits_to_difficulty, expected_index, hash_to_display_hex, scan_commitment, BlockHeader,
    PowAlgorithm,
};
use clap::Args;
use serde_json::json;

use crate::config::read_hex;

#[derive(Clone, Debug, Args)]
pub struct ScanArgs {
    /// Coinbase input script in hex, or @path
    #[arg(long)]
    script: String,
}

#[derive(Clone, Debug, Args)]
pub struct SlotArgs {
    /// Nonce from the merge-mining commitment
    #[arg(long)]
    nonce: u32,
    #[arg(long)]
    chain_id: i32,
    /// Height of the chain merkle tree
    #[arg(long)]
    height: u32,
}

#[derive(Clone, Debug, Args)]
pub struct HeaderArgs {
    /// 80-byte header in hex, or @path
    #[arg(long)]
    header: String,
}

pub fn scan(args: ScanArgs) -> anyhow::Result<()> {
    let script = read_hex(&args.script)?;
    let commitment = scan_commitment(&script)?;

    println!(
        "{}",
        json!({
            "chain_merkle_root": hash_to_display_hex(&commitment.chain_merkle_root),
            "tree_size": commitment.tree_size,
            "tree_height": commitment.tree_height().ok(),
            "nonce": commitment.nonce,
            "marker_offset": commitment.marker_offset,
        })
    );
    Ok(())
}

pub fn slot(args: SlotArgs) -> anyhow::Result<()> {
    if args.height > MAX_CHAIN_MERKLE_HEIGHT {
        return Err(anyhow!(
            "height {} exceeds the maximum of {MAX_CHAIN_MERKLE_HEIGHT}",
            args.height
        ));
    }
    println!("{}", expected_index(args.nonce, args.chain_id, args.height));
    Ok(())
}

pub fn header(args: HeaderArgs) -> anyhow::Result<()> {
    let raw = read_hex(&args.header)?;
    let bytes: [u8; BLOCK_HEADER_SIZE] = raw
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("expected {BLOCK_HEADER_SIZE} bytes, got {}", raw.len()))?;
    let header = BlockHeader::from_bytes(&bytes);
    let scrypt_hash = header
        .pow_hash(PowAlgorithm::Scrypt)
        .context("scrypt hash")?;

    println!(
        "{}",
        json!({
            "hash": hash_to_display_hex(&header.hash()),
            "scrypt_hash": hash_to_display_hex(&scrypt_hash),
            "version": header.version,
            "base_version": header.base_version(),
            "chain_id": header.chain_id(),
            "auxpow": header.is_auxpow(),
            "bits": format!("{:08x}", header.bits),
            "difficulty": bits_to_difficulty(header.bits),
            "timestamp": header.timestamp,
            "nonce": header.nonce,
        })
    );
    Ok(())
}
