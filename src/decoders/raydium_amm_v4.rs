// DANS : src/decoders/raydium_amm_v4.rs

use super::{PoolCreationEvent, RawInstruction, RawTransaction, TokenInfo};
use crate::error::DecodeError;
use solana_sdk::{pubkey, pubkey::Pubkey};

pub const RAYDIUM_AMM_V4_PROGRAM_ID: Pubkey = pubkey!("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8");

/// Les deux instructions qui créent un pool AMM V4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializeShape {
    /// Tag 0, ancienne version (nonce + open_time).
    Initialize,
    /// Tag 1 (nonce + open_time + montants initiaux pc/coin).
    Initialize2,
}

impl InitializeShape {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Initialize),
            1 => Some(Self::Initialize2),
            _ => None,
        }
    }

    /// Taille minimale des données, tag compris.
    pub fn min_data_len(self) -> usize {
        match self {
            Self::Initialize => 1 + 1 + 8,
            Self::Initialize2 => 1 + 1 + 8 + 8 + 8,
        }
    }

    /// Positions (pool, coin mint, pc mint) dans la liste de comptes de l'instruction.
    /// L'ordre des comptes varie légèrement entre `initialize` et `initialize2`.
    pub fn account_offsets(self) -> (usize, usize, usize) {
        match self {
            Self::Initialize => (3, 7, 8),
            Self::Initialize2 => (4, 8, 9),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Initialize2 => "initialize2",
        }
    }
}

/// Cherche la première instruction de création de pool du programme surveillé.
///
/// `Ok(None)` est le cas courant (swaps, dépôts, retraits...). Une instruction qui a
/// la bonne forme mais dont les données ou la liste de comptes sont trop courtes
/// donne `DecodeError::Truncated`.
pub fn parse_pool_creation(
    program_id: &Pubkey,
    signature: &str,
    tx: &RawTransaction,
) -> Result<Option<PoolCreationEvent>, DecodeError> {
    // Un initialize qui a échoué n'a rien créé.
    if tx.failed {
        return Ok(None);
    }

    for ix in &tx.instructions {
        if tx.program_id(ix) != Some(program_id) {
            continue;
        }
        let Some(shape) = ix.data.first().copied().and_then(InitializeShape::from_tag) else {
            continue;
        };
        return extract_event(shape, signature, tx, ix).map(Some);
    }

    Ok(None)
}

fn extract_event(
    shape: InitializeShape,
    signature: &str,
    tx: &RawTransaction,
    ix: &RawInstruction,
) -> Result<PoolCreationEvent, DecodeError> {
    if ix.data.len() < shape.min_data_len() {
        return Err(DecodeError::Truncated(format!(
            "{} : {} octets de données, {} attendus",
            shape.name(),
            ix.data.len(),
            shape.min_data_len()
        )));
    }

    let (pool_pos, coin_pos, pc_pos) = shape.account_offsets();
    let resolve = |position: usize| {
        tx.account_at(ix, position).ok_or_else(|| {
            DecodeError::Truncated(format!(
                "{} : compte #{} absent ({} comptes dans l'instruction, {} clés)",
                shape.name(),
                position,
                ix.accounts.len(),
                tx.account_keys.len()
            ))
        })
    };

    let pool_key = resolve(pool_pos)?;
    let coin_mint = resolve(coin_pos)?;
    let pc_mint = resolve(pc_pos)?;

    Ok(PoolCreationEvent {
        pool_id: pool_key.to_string(),
        token_a: TokenInfo::new(coin_mint.to_string()),
        token_b: TokenInfo::new(pc_mint.to_string()),
        source_signature: signature.to_string(),
        slot: tx.slot,
        block_time: tx.block_time,
    })
}
