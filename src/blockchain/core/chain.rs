use crate::blockchain::core::block::{Block, BlockDraft};
use crate::blockchain::core::ownership::OwnershipMessage;
use crate::blockchain::core::validation::find_violations;
use crate::config::RegistryConfig;
use crate::crypto::verify_message;
use crate::error::{ChainError, Result};
use crate::logging::{default_logger, Logger};
use crate::persistence::{ChainStore, InMemoryStore};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::Arc;

pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

struct ChainInner {
    store: Box<dyn ChainStore>,
    /// `store.len() - 1`, or -1 before genesis.
    height: i64,
}

/// The ledger: an append-only, hash-linked sequence of blocks.
///
/// All state sits behind one lock. `append` holds it for writing from the height
/// snapshot to the push, so concurrent submissions are serialized end to end; reads
/// share it and always see `chain` and `height` agree.
pub struct Blockchain {
    inner: RwLock<ChainInner>,
    config: RegistryConfig,
    logger: Arc<dyn Logger>,
}

impl Blockchain {
    /// Create an in-memory chain with default rules and its genesis block.
    pub fn new() -> Result<Self> {
        Self::with_config(RegistryConfig::default(), Box::new(InMemoryStore::new()), default_logger())
    }

    /// Create a chain over `store`. Genesis is only appended when the store is empty.
    pub fn with_config(
        config: RegistryConfig,
        store: Box<dyn ChainStore>,
        logger: Arc<dyn Logger>,
    ) -> Result<Self> {
        config.validate()?;

        let height = store.len() as i64 - 1;
        let blockchain = Blockchain {
            inner: RwLock::new(ChainInner { store, height }),
            config,
            logger,
        };
        blockchain.initialize_chain()?;
        Ok(blockchain)
    }

    fn initialize_chain(&self) -> Result<()> {
        if self.get_chain_height() == -1 {
            let draft = BlockDraft::new(&json!({ "data": self.config.genesis_data }))?;
            let genesis = self.append(draft)?;
            tracing::info!(hash = genesis.hash().unwrap_or_default(), "genesis block created");
        }
        Ok(())
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn get_chain_height(&self) -> i64 {
        self.inner.read().height
    }

    /// Commit a draft at the tail of the chain.
    ///
    /// Fails with `ChainCorrupted`, leaving the chain untouched, when the existing
    /// chain does not validate.
    pub(crate) fn append(&self, draft: BlockDraft) -> Result<Block> {
        let mut inner = self.inner.write();
        let h = inner.height;

        let violations = find_violations(inner.store.as_ref(), self.logger.as_ref());
        if !violations.is_empty() {
            let heights: Vec<u64> = violations
                .iter()
                .filter_map(|&i| inner.store.get(i))
                .map(Block::height)
                .collect();
            self.logger.log(&format!("_addBlock :: Error, invalid blocks at heights {:?}", heights));
            return Err(ChainError::ChainCorrupted { heights });
        }

        let height = u64::try_from(h + 1)
            .map_err(|_| ChainError::StorageError(format!("invalid chain height {}", h)))?;
        let time = u64::try_from(unix_now()).unwrap_or_default();

        let previous_block_hash = if inner.store.is_empty() {
            None
        } else {
            let tail = usize::try_from(h)
                .ok()
                .and_then(|i| inner.store.get(i))
                .ok_or_else(|| ChainError::StorageError(format!("no block stored at height {}", h)))?;
            tail.hash().map(str::to_string)
        };

        let block = Block::commit(draft, height, time, previous_block_hash)?;
        inner.store.append(block.clone())?;
        inner.height = height as i64;

        self.logger.log(&format!(
            "_addBlock :: block {} added at height {}",
            block.hash().unwrap_or_default(),
            height
        ));
        Ok(block)
    }

    /// Issue the message a client must sign to prove it controls `identity`.
    pub fn request_ownership_message(&self, identity: &str) -> String {
        let message = OwnershipMessage::new(identity, unix_now()).render(&self.config.message_suffix);
        self.logger
            .log(&format!("requestMessageOwnershipVerification :: message: {}", message));
        message
    }

    /// Admit a new entry owned by `identity`.
    ///
    /// Checks, in order and stopping at the first failure: the message shape, its
    /// freshness, then the signature. The stored payload is `{star, owner}`.
    pub fn submit_entry(
        &self,
        identity: &str,
        message: &str,
        signature: &str,
        payload: Value,
    ) -> Result<Block> {
        match self.admit(identity, message, signature, payload) {
            Ok(block) => Ok(block),
            Err(e) => {
                self.logger.log(&format!(
                    "submitStar :: error: {}, address: {}, message: {}",
                    e, identity, message
                ));
                tracing::warn!(identity, "entry rejected: {}", e);
                Err(e)
            }
        }
    }

    fn admit(&self, identity: &str, message: &str, signature: &str, payload: Value) -> Result<Block> {
        let parsed = OwnershipMessage::parse(message, &self.config.message_suffix)?;
        if parsed.identity != identity {
            return Err(ChainError::MalformedMessage(format!(
                "message was issued for '{}', not '{}'",
                parsed.identity, identity
            )));
        }

        parsed.check_freshness(unix_now(), &self.config)?;

        match verify_message(message, identity, signature) {
            Ok(true) => {}
            Ok(false) => return Err(ChainError::InvalidSignature),
            Err(e) => {
                tracing::debug!("signature could not be checked: {}", e);
                return Err(ChainError::InvalidSignature);
            }
        }

        let draft = BlockDraft::new(&json!({ "star": payload, "owner": identity }))?;
        self.append(draft)
    }

    pub fn get_block_by_hash(&self, hash: &str) -> Option<Block> {
        let inner = self.inner.read();
        let found = (0..inner.store.len())
            .filter_map(|i| inner.store.get(i))
            .find(|b| b.hash() == Some(hash))
            .cloned();
        if found.is_none() {
            self.logger.log(&format!("getBlockByHash :: block not found, hash: {}", hash));
        }
        found
    }

    pub fn get_block_by_height(&self, height: u64) -> Option<Block> {
        let inner = self.inner.read();
        let found = (0..inner.store.len())
            .filter_map(|i| inner.store.get(i))
            .find(|b| b.height() == height)
            .cloned();
        if found.is_none() {
            self.logger
                .log(&format!("getBlockByHeight :: block not found, height: {}", height));
        }
        found
    }

    /// Decoded payloads owned by `identity`, in chain order. Genesis is never included.
    pub fn get_entries_by_owner(&self, identity: &str) -> Result<Vec<Value>> {
        let inner = self.inner.read();
        let mut entries = Vec::new();
        for block in (0..inner.store.len()).filter_map(|i| inner.store.get(i)) {
            if let Some(payload) = block.get_data()? {
                if payload.get("owner").and_then(Value::as_str) == Some(identity) {
                    entries.push(payload);
                }
            }
        }
        Ok(entries)
    }

    /// Blocks that fail their hash check or linkage. Empty means the chain is valid.
    pub fn validate_chain(&self) -> Vec<Block> {
        let inner = self.inner.read();
        find_violations(inner.store.as_ref(), self.logger.as_ref())
            .into_iter()
            .filter_map(|i| inner.store.get(i).cloned())
            .collect()
    }

    /// Snapshot of every block, in height order.
    pub fn blocks(&self) -> Vec<Block> {
        let inner = self.inner.read();
        (0..inner.store.len())
            .filter_map(|i| inner.store.get(i).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AddressKind, KeyPair, Network};
    use crate::logging::tests::RecordingLogger;
    use crate::logging::NoopLogger;

    fn quiet_chain() -> Blockchain {
        Blockchain::with_config(
            RegistryConfig::default(),
            Box::new(InMemoryStore::new()),
            Arc::new(NoopLogger),
        )
        .unwrap()
    }

    fn signer() -> (KeyPair, String) {
        let keypair = KeyPair::generate();
        let address = keypair.address(AddressKind::P2pkh, Network::Mainnet).unwrap();
        (keypair, address)
    }

    /// A store whose appends always fail, to prove height is not advanced.
    struct FailingStore(InMemoryStore);

    impl ChainStore for FailingStore {
        fn append(&mut self, _block: Block) -> Result<()> {
            Err(ChainError::StorageError("disk full".to_string()))
        }
        fn get(&self, index: usize) -> Option<&Block> {
            self.0.get(index)
        }
        fn len(&self) -> usize {
            self.0.len()
        }
    }

    #[test]
    fn test_new_chain_has_genesis() {
        let chain = quiet_chain();
        assert_eq!(chain.get_chain_height(), 0);
        let genesis = chain.get_block_by_height(0).unwrap();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.previous_block_hash(), None);
        assert_eq!(genesis.get_data().unwrap(), None);
        assert_eq!(
            crate::codec::decode(genesis.body()).unwrap(),
            json!({"data": "Genesis Block"})
        );
    }

    #[test]
    fn test_append_links_blocks() {
        let chain = quiet_chain();
        for n in 0..5 {
            chain.append(BlockDraft::new(&json!({ "n": n })).unwrap()).unwrap();
        }
        assert_eq!(chain.get_chain_height(), 5);

        let blocks = chain.blocks();
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.height(), i as u64);
            if i > 0 {
                assert_eq!(block.previous_block_hash(), blocks[i - 1].hash());
            }
        }
        assert!(chain.validate_chain().is_empty());
    }

    #[test]
    fn test_existing_store_skips_genesis() {
        let chain = quiet_chain();
        chain.append(BlockDraft::new(&json!(1)).unwrap()).unwrap();
        let exported = chain.blocks();

        let reloaded = Blockchain::with_config(
            RegistryConfig::default(),
            Box::new(InMemoryStore::from_blocks(exported.clone())),
            Arc::new(NoopLogger),
        )
        .unwrap();
        assert_eq!(reloaded.get_chain_height(), 1);
        assert_eq!(reloaded.blocks(), exported);
    }

    #[test]
    fn test_failed_store_append_keeps_height() {
        let mut store = InMemoryStore::new();
        let genesis = Block::commit(BlockDraft::new(&json!({"data": "Genesis Block"})).unwrap(), 0, 1, None).unwrap();
        store.append(genesis).unwrap();

        let chain = Blockchain::with_config(
            RegistryConfig::default(),
            Box::new(FailingStore(store)),
            Arc::new(NoopLogger),
        )
        .unwrap();
        let err = chain.append(BlockDraft::new(&json!(1)).unwrap()).unwrap_err();
        assert!(matches!(err, ChainError::StorageError(_)));
        assert_eq!(chain.get_chain_height(), 0);
    }

    #[test]
    fn test_request_ownership_message_format() {
        let chain = quiet_chain();
        let before = unix_now();
        let message = chain.request_ownership_message("1ABC");
        let parsed = OwnershipMessage::parse(&message, "starRegistry").unwrap();
        assert_eq!(parsed.identity, "1ABC");
        assert!(parsed.timestamp >= before && parsed.timestamp <= unix_now());
        assert!(message.starts_with("1ABC:") && message.ends_with(":starRegistry"));
    }

    #[test]
    fn test_submit_entry_commits_block() {
        let chain = quiet_chain();
        let (keypair, address) = signer();
        let message = chain.request_ownership_message(&address);
        let signature = keypair.sign_message(&message, AddressKind::P2pkh).unwrap();

        let block = chain
            .submit_entry(&address, &message, &signature, json!({"ra": "16h 29m"}))
            .unwrap();
        assert_eq!(block.height(), 1);
        assert_eq!(
            block.get_data().unwrap(),
            Some(json!({"star": {"ra": "16h 29m"}, "owner": address}))
        );
        assert_eq!(chain.get_block_by_height(1), Some(block));
    }

    #[test]
    fn test_submit_rejects_message_for_other_identity() {
        let chain = quiet_chain();
        let (keypair, address) = signer();
        let (_, other) = signer();
        let message = chain.request_ownership_message(&other);
        let signature = keypair.sign_message(&message, AddressKind::P2pkh).unwrap();

        let err = chain.submit_entry(&address, &message, &signature, json!("x")).unwrap_err();
        assert!(matches!(err, ChainError::MalformedMessage(_)));
        assert_eq!(chain.get_chain_height(), 0);
    }

    #[test]
    fn test_expired_message_short_circuits_before_signature() {
        let logger = Arc::new(RecordingLogger::default());
        let chain = Blockchain::with_config(
            RegistryConfig::default(),
            Box::new(InMemoryStore::new()),
            logger.clone(),
        )
        .unwrap();
        let (_, address) = signer();
        let message = OwnershipMessage::new(address.as_str(), unix_now() - 301).render("starRegistry");

        // Garbage signature: expiry must be reported, not the signature.
        let err = chain.submit_entry(&address, &message, "garbage", json!("x")).unwrap_err();
        assert!(matches!(err, ChainError::ExpiredMessage { .. }));
        assert_eq!(chain.get_chain_height(), 0);
        assert!(logger.contains("submitStar :: error"));
    }

    #[test]
    fn test_unparseable_signature_is_invalid_signature() {
        let chain = quiet_chain();
        let (_, address) = signer();
        let message = chain.request_ownership_message(&address);
        let err = chain.submit_entry(&address, &message, "%%%", json!("x")).unwrap_err();
        assert_eq!(err, ChainError::InvalidSignature);
    }

    #[test]
    fn test_corrupted_chain_blocks_append() {
        let chain = quiet_chain();
        chain.append(BlockDraft::new(&json!(1)).unwrap()).unwrap();
        let mut blocks = chain.blocks();
        let mut value = serde_json::to_value(&blocks[1]).unwrap();
        value["body"] = json!(crate::codec::encode(&json!(2)).unwrap());
        blocks[1] = serde_json::from_value(value).unwrap();

        let tampered = Blockchain::with_config(
            RegistryConfig::default(),
            Box::new(InMemoryStore::from_blocks(blocks)),
            Arc::new(NoopLogger),
        )
        .unwrap();
        let err = tampered.append(BlockDraft::new(&json!(3)).unwrap()).unwrap_err();
        assert_eq!(err, ChainError::ChainCorrupted { heights: vec![1] });
        assert_eq!(tampered.get_chain_height(), 1);
        assert_eq!(tampered.blocks().len(), 2);
    }

    #[test]
    fn test_lookups_not_found() {
        let chain = quiet_chain();
        assert!(chain.get_block_by_height(1).is_none());
        assert!(chain.get_block_by_hash("deadbeef").is_none());
        let genesis_hash = chain.blocks()[0].hash().unwrap().to_string();
        assert_eq!(chain.get_block_by_hash(&genesis_hash).unwrap().height(), 0);
    }

    #[test]
    fn test_entries_by_owner_filters_and_orders() {
        let chain = quiet_chain();
        for (owner, star) in [("alice", "a1"), ("bob", "b1"), ("alice", "a2")] {
            chain
                .append(BlockDraft::new(&json!({"star": star, "owner": owner})).unwrap())
                .unwrap();
        }

        let alice = chain.get_entries_by_owner("alice").unwrap();
        assert_eq!(
            alice,
            vec![json!({"star": "a1", "owner": "alice"}), json!({"star": "a2", "owner": "alice"})]
        );
        assert_eq!(chain.get_entries_by_owner("bob").unwrap().len(), 1);
        assert!(chain.get_entries_by_owner("carol").unwrap().is_empty());
    }

    #[test]
    fn test_custom_genesis_data() {
        let config = RegistryConfig {
            genesis_data: "First light".to_string(),
            ..RegistryConfig::default()
        };
        let chain = Blockchain::with_config(config, Box::new(InMemoryStore::new()), Arc::new(NoopLogger)).unwrap();
        let genesis = chain.get_block_by_height(0).unwrap();
        assert_eq!(crate::codec::decode(genesis.body()).unwrap(), json!({"data": "First light"}));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RegistryConfig {
            freshness_window_secs: 0,
            ..RegistryConfig::default()
        };
        let result = Blockchain::with_config(config, Box::new(InMemoryStore::new()), Arc::new(NoopLogger));
        assert!(matches!(result, Err(ChainError::ConfigError(_))));
    }
}
