//! In-memory chain and state processor
//!
//! Reference collaborator for the development node and tests. Blocks and
//! their post-states live in hash maps; the head is the highest block seen,
//! first seen winning ties.

use crate::domain::{check_uncles, BlockTemplate, ProcessedTransactions};
use crate::error::{MinerError, Result};
use crate::ports::{ChainView, PowEngine, StateProcessor};
use crate::{BLOCK_REWARD, EXTRA_DATA, INTRINSIC_GAS, MAX_UNCLES, MIN_GAS_LIMIT};
use async_trait::async_trait;
use parking_lot::RwLock;
use primitive_types::U256;
use shared_types::{
    short_hash, transactions_root, uncles_hash, Address, Block, BlockHeader, Hash, Receipt,
    Transaction, WorldState,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

struct ChainStore {
    blocks: HashMap<Hash, Block>,
    states: HashMap<Hash, WorldState>,
    head: Hash,
}

impl ChainStore {
    fn head_block(&self) -> Result<&Block> {
        self.blocks
            .get(&self.head)
            .ok_or_else(|| MinerError::Chain("head block missing from store".to_string()))
    }

    /// Insert a block with its post-state; returns whether it became head
    fn insert(&mut self, block: Block, state: WorldState) -> Result<bool> {
        let hash = block.hash();
        let is_new_head = block.number() > self.head_block()?.number();
        self.states.insert(hash, state);
        self.blocks.insert(hash, block);
        if is_new_head {
            self.head = hash;
        }
        Ok(is_new_head)
    }

    fn parent_of(&self, block: &Block) -> Result<(Block, WorldState)> {
        let parent_hash = block.parent_hash();
        match (self.blocks.get(&parent_hash), self.states.get(&parent_hash)) {
            (Some(parent), Some(state)) => Ok((parent.clone(), state.clone())),
            _ => Err(MinerError::UnknownParent {
                parent: hex::encode(parent_hash),
            }),
        }
    }
}

/// In-memory [`ChainView`] and [`StateProcessor`]
pub struct MemoryChain {
    store: RwLock<ChainStore>,
    pow: Arc<dyn PowEngine>,
}

impl MemoryChain {
    /// Build a genesis block committing to `state`
    pub fn genesis_block(state: &WorldState, difficulty: U256, gas_limit: u64) -> Block {
        Block {
            header: BlockHeader {
                state_root: state.root(),
                difficulty,
                gas_limit,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create a chain from a genesis block and its state
    ///
    /// `pow` verifies the seal of every processed block.
    pub fn new(genesis: Block, genesis_state: WorldState, pow: Arc<dyn PowEngine>) -> Self {
        let hash = genesis.hash();
        info!(
            genesis = %short_hash(&hash),
            accounts = genesis_state.len(),
            engine = pow.name(),
            "[pow-miner] In-memory chain initialised"
        );
        let mut blocks = HashMap::new();
        let mut states = HashMap::new();
        blocks.insert(hash, genesis);
        states.insert(hash, genesis_state);
        Self {
            store: RwLock::new(ChainStore {
                blocks,
                states,
                head: hash,
            }),
            pow,
        }
    }

    /// Development chain with pre-funded accounts
    pub fn with_balances(
        balances: impl IntoIterator<Item = (Address, U256)>,
        difficulty: U256,
        pow: Arc<dyn PowEngine>,
    ) -> Self {
        let state = WorldState::with_balances(balances);
        let genesis = Self::genesis_block(&state, difficulty, crate::DEFAULT_GAS_LIMIT);
        Self::new(genesis, state, pow)
    }

    /// Current head block
    pub fn head(&self) -> Result<Block> {
        self.store.read().head_block().cloned()
    }

    /// Height of the head
    pub fn height(&self) -> u64 {
        self.store
            .read()
            .head_block()
            .map_or(0, |block| block.number())
    }

    /// Number of stored blocks (including siblings)
    pub fn block_count(&self) -> usize {
        self.store.read().blocks.len()
    }

    /// Whether a block is stored
    pub fn contains(&self, hash: &Hash) -> bool {
        self.store.read().blocks.contains_key(hash)
    }

    /// Post-state of a stored block
    pub fn state_at(&self, hash: &Hash) -> Option<WorldState> {
        self.store.read().states.get(hash).cloned()
    }

    /// Insert an externally produced block without validating it
    ///
    /// The post-state is derived leniently: applicable transactions and
    /// rewards are applied, nothing is checked. Returns whether the block
    /// became the head; a known block is ignored.
    pub fn import_block(&self, block: Block) -> Result<bool> {
        let mut store = self.store.write();
        let hash = block.hash();
        if store.blocks.contains_key(&hash) {
            return Ok(false);
        }
        let (_, mut state) = store.parent_of(&block)?;
        let coinbase = block.header.coinbase;
        apply_transactions(
            &mut state,
            coinbase,
            block.header.gas_limit,
            block.transactions.clone(),
        );
        apply_rewards(&mut state, coinbase, &block.uncles);

        let number = block.number();
        let is_head = store.insert(block, state)?;
        debug!(
            number,
            block = %short_hash(&hash),
            head = is_head,
            "[pow-miner] Imported block"
        );
        Ok(is_head)
    }

    fn validate_uncles(&self, uncles: &[BlockHeader], parent: &Block) -> Result<()> {
        check_uncles(uncles, parent, MAX_UNCLES)
            .map_err(|e| MinerError::InvalidBlock(e.to_string()))?;
        let store = self.store.read();
        for uncle in uncles {
            let hash = uncle.hash();
            if !store.blocks.contains_key(&hash) {
                return Err(MinerError::InvalidBlock(format!(
                    "uncle {} is not a known block",
                    short_hash(&hash)
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ChainView for MemoryChain {
    async fn current_head(&self) -> Result<Block> {
        self.head()
    }

    async fn new_template(&self, coinbase: Address) -> Result<BlockTemplate> {
        let store = self.store.read();
        let parent = store.head_block()?;
        let state = store
            .states
            .get(&store.head)
            .cloned()
            .ok_or_else(|| MinerError::Chain("head state missing from store".to_string()))?;

        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        let header = BlockHeader {
            parent_hash: store.head,
            number: parent.number() + 1,
            timestamp: now.max(parent.header.timestamp + 1),
            coinbase,
            difficulty: parent.header.difficulty,
            gas_limit: calc_gas_limit(&parent.header),
            extra_data: EXTRA_DATA.to_vec(),
            ..Default::default()
        };
        Ok(BlockTemplate::new(header, state))
    }

    async fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        Ok(self.store.read().blocks.get(hash).cloned())
    }

    fn gas_limit(&self, parent: &Block) -> u64 {
        calc_gas_limit(&parent.header)
    }
}

#[async_trait]
impl StateProcessor for MemoryChain {
    async fn process_transactions(
        &self,
        coinbase: Address,
        template: &mut BlockTemplate,
        _parent: &Block,
        gas_pool: u64,
        txs: Vec<Transaction>,
    ) -> ProcessedTransactions {
        apply_transactions(&mut template.state, coinbase, gas_pool, txs)
    }

    async fn accumulate_rewards(&self, template: &mut BlockTemplate, parent: &Block) -> Result<()> {
        self.validate_uncles(&template.uncles, parent)?;
        let coinbase = template.coinbase();
        apply_rewards(&mut template.state, coinbase, &template.uncles);
        Ok(())
    }

    async fn process(&self, block: &Block) -> Result<()> {
        let hash = block.hash();
        let header = &block.header;
        let (parent, mut state) = {
            let store = self.store.read();
            if store.blocks.contains_key(&hash) {
                return Err(MinerError::InvalidBlock(format!(
                    "block {} already known",
                    short_hash(&hash)
                )));
            }
            store.parent_of(block)?
        };

        if header.number != parent.number() + 1 {
            return Err(MinerError::InvalidBlock(format!(
                "number {} does not follow parent {}",
                header.number,
                parent.number()
            )));
        }
        if header.timestamp <= parent.header.timestamp {
            return Err(MinerError::InvalidBlock(
                "timestamp not after parent".to_string(),
            ));
        }
        if header.difficulty != parent.header.difficulty {
            return Err(MinerError::InvalidBlock("unexpected difficulty".to_string()));
        }
        if header.gas_limit != calc_gas_limit(&parent.header) {
            return Err(MinerError::InvalidBlock(format!(
                "gas limit {} does not follow parent",
                header.gas_limit
            )));
        }
        if !self.pow.verify(header) {
            return Err(MinerError::InvalidBlock("invalid proof of work".to_string()));
        }
        if header.tx_root != transactions_root(&block.transactions) {
            return Err(MinerError::InvalidBlock("transaction root mismatch".to_string()));
        }
        if header.uncles_hash != uncles_hash(&block.uncles) {
            return Err(MinerError::InvalidBlock("uncles hash mismatch".to_string()));
        }

        let processed = apply_transactions(
            &mut state,
            header.coinbase,
            header.gas_limit,
            block.transactions.clone(),
        );
        if processed.accepted.len() != block.transactions.len() {
            return Err(MinerError::InvalidBlock(format!(
                "{} of {} transactions could not be applied",
                block.transactions.len() - processed.accepted.len(),
                block.transactions.len()
            )));
        }
        let gas_used = processed
            .accepted
            .last()
            .map_or(0, |(_, r)| r.cumulative_gas_used);
        if gas_used != header.gas_used {
            return Err(MinerError::InvalidBlock(format!(
                "gas used {} does not match header {}",
                gas_used, header.gas_used
            )));
        }

        self.validate_uncles(&block.uncles, &parent)?;
        apply_rewards(&mut state, header.coinbase, &block.uncles);

        if state.root() != header.state_root {
            return Err(MinerError::InvalidBlock("state root mismatch".to_string()));
        }

        let is_head = self.store.write().insert(block.clone(), state)?;
        debug!(
            number = header.number,
            block = %short_hash(&hash),
            head = is_head,
            "[pow-miner] Processed block"
        );
        Ok(())
    }
}

/// Gas limit for a child of `parent`
///
/// Moves towards 6/5 of the parent's usage by at most 1/1024 of the parent's
/// limit per block, never below [`MIN_GAS_LIMIT`].
pub fn calc_gas_limit(parent: &BlockHeader) -> u64 {
    let previous = i128::from(parent.gas_limit);
    let desired = i128::from(parent.gas_used) * 6 / 5;
    let bound = previous / 1024;
    let next = previous + ((desired - previous) / 1024).clamp(-bound, bound);
    u64::try_from(next.max(i128::from(MIN_GAS_LIMIT))).unwrap_or(u64::MAX)
}

/// Apply `txs` in order, partitioning them into accepted, deferred and failed
pub fn apply_transactions(
    state: &mut WorldState,
    coinbase: Address,
    gas_pool: u64,
    txs: Vec<Transaction>,
) -> ProcessedTransactions {
    let mut processed = ProcessedTransactions::default();
    let mut remaining = gas_pool;
    let mut cumulative = 0u64;

    for tx in txs {
        let expected = state.nonce(&tx.from);
        let rejection = if tx.nonce < expected {
            Some(format!("nonce {} below account nonce {expected}", tx.nonce))
        } else if tx.to.is_none() {
            Some("contract creation is not supported".to_string())
        } else if tx.gas_limit < INTRINSIC_GAS {
            Some(format!("gas limit {} below intrinsic gas", tx.gas_limit))
        } else if state.balance(&tx.from) < tx.max_cost() {
            Some(format!(
                "balance {} below maximum cost {}",
                state.balance(&tx.from),
                tx.max_cost()
            ))
        } else {
            None
        };

        if let Some(reason) = rejection {
            if processed.error.is_none() {
                processed.error = Some(MinerError::InvalidTransaction {
                    tx: short_hash(&tx.hash()),
                    reason,
                });
            }
            processed.failed.push(tx);
            continue;
        }

        if tx.nonce > expected || tx.gas_limit > remaining {
            processed.deferred.push(tx);
            continue;
        }

        let fee = tx.gas_price.saturating_mul(U256::from(INTRINSIC_GAS));
        if let Err(e) = state.debit(tx.from, tx.value.saturating_add(fee)) {
            if processed.error.is_none() {
                processed.error = Some(e.into());
            }
            processed.failed.push(tx);
            continue;
        }
        if let Some(to) = tx.to {
            state.credit(to, tx.value);
        }
        state.credit(coinbase, fee);
        state.increment_nonce(tx.from);

        remaining -= INTRINSIC_GAS;
        cumulative += INTRINSIC_GAS;
        let receipt = Receipt {
            tx_hash: tx.hash(),
            gas_used: INTRINSIC_GAS,
            cumulative_gas_used: cumulative,
            success: true,
        };
        processed.accepted.push((tx, receipt));
    }

    processed
}

/// Credit the block reward, the uncle inclusion bonus, and the uncle shares
pub fn apply_rewards(state: &mut WorldState, coinbase: Address, uncles: &[BlockHeader]) {
    let reward = U256::from(BLOCK_REWARD);
    let inclusion = (reward / 32) * U256::from(uncles.len());
    state.credit(coinbase, reward + inclusion);
    for uncle in uncles {
        state.credit(uncle.coinbase, reward * 15 / 16);
    }
}
