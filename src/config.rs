//! Back end configuration, read from the environment

use crate::error::{CompileError, Result};
use std::env;

/// Back end configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Interleave the IR text with the generated assembly
    pub verbose_asm: bool,
    /// Mark basic block boundaries in the output (needs `verbose_asm`)
    pub print_blocks: bool,
    /// Interference graphs larger than this skip the exact search
    pub max_exact_nodes: usize,
    /// Step budget for one exact coloring search before falling back to greedy
    pub search_budget: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose_asm: false,
            print_blocks: false,
            max_exact_nodes: 32,
            search_budget: 200_000,
        }
    }
}

impl Config {
    /// Build a configuration from environment variables
    ///
    /// `VERBOSE_ASM` and `PRINT_BLOCKS` are presence flags;
    /// `COLORING_NODE_LIMIT` and `COLORING_SEARCH_BUDGET` are numbers.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key-value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Config {
            verbose_asm: lookup("VERBOSE_ASM").is_some(),
            print_blocks: lookup("PRINT_BLOCKS").is_some(),
            max_exact_nodes: read_number(
                &lookup,
                "COLORING_NODE_LIMIT",
                defaults.max_exact_nodes,
            )?,
            search_budget: read_number(
                &lookup,
                "COLORING_SEARCH_BUDGET",
                defaults.search_budget,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.print_blocks && !self.verbose_asm {
            return Err(CompileError::InvalidConfig(
                "block markers need verbose assembly output".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_number(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: usize,
) -> Result<usize> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            CompileError::InvalidConfig(format!("{} must be a number, got `{}`", key, raw))
        }),
        None => Ok(default),
    }
}
