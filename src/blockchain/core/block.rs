use crate::codec;
use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// An uncommitted block: only the encoded payload is known.
///
/// Height, time, linkage and hash are assigned once, by `Blockchain::append`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDraft {
    body: String,
}

impl BlockDraft {
    pub fn new<T: Serialize + ?Sized>(payload: &T) -> Result<Self> {
        Ok(BlockDraft {
            body: codec::encode(payload)?,
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// A committed ledger record.
///
/// Fields are read-only from outside the crate. The JSON form (`hash`, `height`,
/// `body`, `time`, `previousBlockHash`) is also the hashing preimage, with `hash`
/// set to `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    hash: Option<String>,
    height: u64,
    body: String,
    time: u64,
    previous_block_hash: Option<String>,
}

/// Hashing preimage: the block with `hash` absent.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashView<'a> {
    hash: Option<&'a str>,
    height: u64,
    body: &'a str,
    time: u64,
    previous_block_hash: Option<&'a str>,
}

impl Block {
    /// Seal a draft. Only the append protocol calls this.
    pub(crate) fn commit(
        draft: BlockDraft,
        height: u64,
        time: u64,
        previous_block_hash: Option<String>,
    ) -> Result<Self> {
        let mut block = Block {
            hash: None,
            height,
            body: draft.body,
            time,
            previous_block_hash,
        };
        block.hash = Some(block.calculate_hash()?);
        Ok(block)
    }

    /// SHA-256 over the block serialized with `hash` treated as absent, hex encoded.
    pub fn calculate_hash(&self) -> Result<String> {
        let view = HashView {
            hash: None,
            height: self.height,
            body: &self.body,
            time: self.time,
            previous_block_hash: self.previous_block_hash.as_deref(),
        };
        let preimage = serde_json::to_vec(&view)
            .map_err(|e| ChainError::EncodeError(format!("failed to serialize block: {}", e)))?;
        Ok(hex::encode(Sha256::digest(preimage)))
    }

    /// True when the stored hash still matches the block's contents.
    pub fn validate(&self) -> bool {
        let calculated = match self.calculate_hash() {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(height = self.height, "block hash could not be recomputed: {}", e);
                return false;
            }
        };

        match self.hash.as_deref() {
            Some(stored) if stored == calculated => {
                tracing::debug!(height = self.height, hash = stored, "block is valid");
                true
            }
            stored => {
                tracing::debug!(
                    height = self.height,
                    stored = ?stored,
                    calculated = %calculated,
                    "block is NOT valid"
                );
                false
            }
        }
    }

    /// Decoded payload, or `None` for genesis, which carries no user data.
    pub fn get_data(&self) -> Result<Option<Value>> {
        let payload = codec::decode(&self.body)?;
        if self.is_genesis() {
            return Ok(None);
        }
        Ok(Some(payload))
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn previous_block_hash(&self) -> Option<&str> {
        self.previous_block_hash.as_deref()
    }
}
