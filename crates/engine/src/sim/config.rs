use std::env;

use tracing::warn;

use super::chain::DEFAULT_CHAIN_CAPACITY;

pub const MAX_CHAIN_LEN_ENV_VAR: &str = "MOVECHAIN_MAX_CHAIN_LEN";

/// What happens to members that were already moved when a later member of the
/// same chain is blocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockPolicy {
    /// Earlier members keep their new transforms; only the blocked member is
    /// reverted.
    #[default]
    KeepPartial,
    /// Every member moved during the aborted step is restored.
    RevertChain,
}

#[derive(Debug, Clone, Copy)]
pub struct MoveChainConfig {
    pub max_chain_len: usize,
    pub block_policy: BlockPolicy,
    pub skip_zero_delta: bool,
}

impl Default for MoveChainConfig {
    fn default() -> Self {
        Self {
            max_chain_len: DEFAULT_CHAIN_CAPACITY,
            block_policy: BlockPolicy::KeepPartial,
            skip_zero_delta: true,
        }
    }
}

impl MoveChainConfig {
    /// Applies environment overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        self.max_chain_len = resolve_max_chain_len(self.max_chain_len);
        self
    }
}

fn resolve_max_chain_len(config_max_chain_len: usize) -> usize {
    match env::var(MAX_CHAIN_LEN_ENV_VAR) {
        Ok(value) => parse_max_chain_len(&value).unwrap_or_else(|| {
            warn!(
                env_var = MAX_CHAIN_LEN_ENV_VAR,
                value = value.as_str(),
                "invalid max-chain-len env var value; falling back to config"
            );
            config_max_chain_len
        }),
        Err(env::VarError::NotPresent) => config_max_chain_len,
        Err(err) => {
            warn!(
                env_var = MAX_CHAIN_LEN_ENV_VAR,
                error = %err,
                "unable to read max-chain-len env var; falling back to config"
            );
            config_max_chain_len
        }
    }
}

fn parse_max_chain_len(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|value| *value > 0)
}
