use crate::logging::Logger;
use crate::persistence::ChainStore;

/// Indices of blocks that fail their own hash check or do not link to their predecessor.
///
/// Blocks are visited in order; a block failing both checks is reported once.
pub fn find_violations(store: &dyn ChainStore, logger: &dyn Logger) -> Vec<usize> {
    let mut violations = Vec::new();

    for i in 0..store.len() {
        let Some(block) = store.get(i) else {
            break;
        };

        let mut broken = false;
        if !block.validate() {
            logger.log(&format!(
                "validateChain :: block at index {} failed hash check (height {})",
                i,
                block.height()
            ));
            broken = true;
        }

        if i > 0 {
            let previous_hash = store.get(i - 1).and_then(|p| p.hash());
            if block.previous_block_hash() != previous_hash {
                logger.log(&format!(
                    "validateChain :: block at index {} does not link to its predecessor",
                    i
                ));
                broken = true;
            }
        }

        if broken {
            violations.push(i);
        }
    }

    if !violations.is_empty() {
        tracing::warn!(count = violations.len(), "chain validation found violations");
    }
    violations
}
