// DANS : src/decoders/transaction.rs

use crate::error::DecodeError;
use solana_sdk::{instruction::CompiledInstruction, pubkey::Pubkey};
use solana_transaction_status::{
    option_serializer::OptionSerializer, EncodedConfirmedTransactionWithStatusMeta, UiInstruction,
};
use std::str::FromStr;

/// Une instruction "à plat" : indices dans la liste de comptes + données brutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

impl From<&CompiledInstruction> for RawInstruction {
    fn from(ix: &CompiledInstruction) -> Self {
        Self {
            program_id_index: ix.program_id_index,
            accounts: ix.accounts.clone(),
            data: ix.data.clone(),
        }
    }
}

/// Vue simplifiée d'une transaction confirmée, indépendante de l'encodage RPC.
///
/// `account_keys` contient les clés statiques puis les adresses chargées depuis
/// les lookup tables (writable, puis readonly), dans l'ordre où les indices des
/// instructions les référencent. `instructions` contient les instructions de
/// premier niveau suivies des instructions internes (CPI).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTransaction {
    pub account_keys: Vec<Pubkey>,
    pub instructions: Vec<RawInstruction>,
    pub failed: bool,
    pub slot: Option<u64>,
    pub block_time: Option<i64>,
}

impl RawTransaction {
    /// Résout l'indice `position` de la liste de comptes d'une instruction.
    pub fn account_at(&self, ix: &RawInstruction, position: usize) -> Option<&Pubkey> {
        ix.accounts
            .get(position)
            .and_then(|&idx| self.account_keys.get(idx as usize))
    }

    pub fn program_id(&self, ix: &RawInstruction) -> Option<&Pubkey> {
        self.account_keys.get(ix.program_id_index as usize)
    }
}

impl TryFrom<EncodedConfirmedTransactionWithStatusMeta> for RawTransaction {
    type Error = DecodeError;

    fn try_from(value: EncodedConfirmedTransactionWithStatusMeta) -> Result<Self, Self::Error> {
        let EncodedConfirmedTransactionWithStatusMeta { slot, transaction, block_time } = value;

        let versioned = transaction
            .transaction
            .decode()
            .ok_or_else(|| DecodeError::Malformed("encodage de transaction non binaire".to_string()))?;

        let mut account_keys = versioned.message.static_account_keys().to_vec();
        let mut instructions: Vec<RawInstruction> = versioned
            .message
            .instructions()
            .iter()
            .map(RawInstruction::from)
            .collect();

        let mut failed = false;
        if let Some(meta) = transaction.meta {
            failed = meta.err.is_some();

            if let OptionSerializer::Some(loaded) = &meta.loaded_addresses {
                for key in loaded.writable.iter().chain(loaded.readonly.iter()) {
                    let pubkey = Pubkey::from_str(key).map_err(|e| {
                        DecodeError::Malformed(format!("adresse chargée invalide {} : {}", key, e))
                    })?;
                    account_keys.push(pubkey);
                }
            }

            if let OptionSerializer::Some(inner_sets) = &meta.inner_instructions {
                for inner in inner_sets.iter().flat_map(|set| set.instructions.iter()) {
                    // Avec l'encodage base64, les instructions internes arrivent toujours compilées.
                    let UiInstruction::Compiled(compiled) = inner else { continue };
                    let data = bs58::decode(&compiled.data).into_vec().map_err(|e| {
                        DecodeError::Malformed(format!("données d'instruction interne illisibles : {}", e))
                    })?;
                    instructions.push(RawInstruction {
                        program_id_index: compiled.program_id_index,
                        accounts: compiled.accounts.clone(),
                        data,
                    });
                }
            }
        }

        Ok(Self {
            account_keys,
            instructions,
            failed,
            slot: Some(slot),
            block_time,
        })
    }
}
