//! Block Agent System declarations.
//!
//! A block is the smallest unit of work in the system (`{domain}.{name}`,
//! e.g. `content.query`). Block ids double as circuit-breaker keys, so a
//! failing search index never blocks content browsing.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::{ApiError, Domain};

/// Block ids used as resilience keys.
pub mod ids {
    pub const AUTH_VALIDATE: &str = "auth.validate";
    pub const AUTH_TOKEN: &str = "auth.token";
    pub const AUTH_SESSION: &str = "auth.session";

    pub const CONTENT_QUERY: &str = "content.query";
    pub const CONTENT_CACHE: &str = "content.cache";
    pub const CONTENT_RESPONSE: &str = "content.response";
    pub const CONTENT_HANDS: &str = "content.hands";
    pub const CONTENT_TIMELINE: &str = "content.timeline";

    pub const STREAM_RESOLVE: &str = "stream.resolve";
    pub const STREAM_TRANSCODE: &str = "stream.transcode";
    pub const STREAM_DELIVER: &str = "stream.deliver";
    pub const STREAM_MONITOR: &str = "stream.monitor";

    pub const SEARCH_PARSE: &str = "search.parse";
    pub const SEARCH_SEARCH: &str = "search.search";
    pub const SEARCH_RANK: &str = "search.rank";
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DomainType {
    Auth,
    Content,
    Stream,
    Search,
    Player,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BlockStatus {
    Idle,
    Processing,
    Error,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputPort {
    pub name: String,
    #[serde(rename = "type")]
    pub port_type: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitsOn {
    Success,
    Error,
    Always,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPort {
    pub name: String,
    #[serde(rename = "type")]
    pub port_type: String,
    pub emits_on: EmitsOn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    pub description: String,
    pub owner: String,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_file_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_token_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub domain: DomainType,
    pub name: String,
    pub version: String,
    pub status: BlockStatus,
    pub inputs: Vec<InputPort>,
    pub outputs: Vec<OutputPort>,
    pub metadata: BlockMetadata,
}

impl Block {
    /// An idle block with no ports; the id is derived from domain and name.
    pub fn new(domain: DomainType, name: impl Into<String>, metadata: BlockMetadata) -> Self {
        let name = name.into();
        Self {
            id: format!("{domain}.{name}"),
            domain,
            name,
            version: "1.0.0".to_string(),
            status: BlockStatus::Idle,
            inputs: Vec::new(),
            outputs: Vec::new(),
            metadata,
        }
    }
}

/// Registry of every block in the system.
pub trait BlockRegistry: Send + Sync {
    /// Add or replace a block; rejects ids that do not match `{domain}.{name}`.
    fn register(&self, block: Block) -> Result<(), ApiError>;
    fn get(&self, block_id: &str) -> Option<Block>;
    fn by_domain(&self, domain: DomainType) -> Vec<Block>;
    fn all(&self) -> Vec<Block>;
    fn has(&self, block_id: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct InMemoryBlockRegistry {
    blocks: RwLock<BTreeMap<String, Block>>,
}

impl InMemoryBlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Block>> {
        self.blocks.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlockRegistry for InMemoryBlockRegistry {
    fn register(&self, block: Block) -> Result<(), ApiError> {
        let expected = format!("{}.{}", block.domain, block.name);
        if block.id != expected {
            return Err(ApiError::validation(
                block_error_domain(block.domain),
                format!("block id {} should be {expected}", block.id),
            ));
        }
        self.blocks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(block.id.clone(), block);
        Ok(())
    }

    fn get(&self, block_id: &str) -> Option<Block> {
        self.read().get(block_id).cloned()
    }

    fn by_domain(&self, domain: DomainType) -> Vec<Block> {
        self.read()
            .values()
            .filter(|block| block.domain == domain)
            .cloned()
            .collect()
    }

    fn all(&self) -> Vec<Block> {
        self.read().values().cloned().collect()
    }

    fn has(&self, block_id: &str) -> bool {
        self.read().contains_key(block_id)
    }
}

fn block_error_domain(domain: DomainType) -> Domain {
    match domain {
        DomainType::Auth | DomainType::Admin => Domain::Auth,
        DomainType::Content => Domain::Content,
        DomainType::Stream | DomainType::Player => Domain::Stream,
        DomainType::Search => Domain::Search,
    }
}

/// Size thresholds: at or below `optimal` is fine, above `warning` is critical.
pub const FILE_THRESHOLDS: SizeThreshold = SizeThreshold {
    optimal: 20,
    warning: 30,
};
pub const TOKEN_THRESHOLDS: SizeThreshold = SizeThreshold {
    optimal: 35_000,
    warning: 50_000,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeThreshold {
    pub optimal: u32,
    pub warning: u32,
}

impl SizeThreshold {
    fn classify(&self, value: u32) -> BlockSizeStatus {
        if value <= self.optimal {
            BlockSizeStatus::Optimal
        } else if value <= self.warning {
            BlockSizeStatus::Warning
        } else {
            BlockSizeStatus::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BlockSizeStatus {
    Optimal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSizeAnalysis {
    pub block_id: String,
    pub file_count: u32,
    pub token_count: u32,
    pub status: BlockSizeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// Grade a block by the worse of its file and token counts.
pub fn analyze_block_size(block_id: &str, file_count: u32, token_count: u32) -> BlockSizeAnalysis {
    let status = FILE_THRESHOLDS
        .classify(file_count)
        .max(TOKEN_THRESHOLDS.classify(token_count));
    let recommendation = match status {
        BlockSizeStatus::Optimal => None,
        BlockSizeStatus::Warning => Some(format!("{block_id} is growing; consider splitting it soon")),
        BlockSizeStatus::Critical => Some(format!("{block_id} is too large; split it into smaller blocks")),
    };
    BlockSizeAnalysis {
        block_id: block_id.to_string(),
        file_count,
        token_count,
        status,
        recommendation,
    }
}

/// Static description of one domain agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainAgentConfig {
    pub id: &'static str,
    pub domain: DomainType,
    pub managed_blocks: &'static [&'static str],
    pub capabilities: &'static [&'static str],
}

pub const DOMAIN_AGENTS: &[DomainAgentConfig] = &[
    DomainAgentConfig {
        id: "auth-domain",
        domain: DomainType::Auth,
        managed_blocks: &[ids::AUTH_VALIDATE, ids::AUTH_TOKEN, ids::AUTH_SESSION],
        capabilities: &["login", "register", "refresh", "logout", "validate"],
    },
    DomainAgentConfig {
        id: "content-domain",
        domain: DomainType::Content,
        managed_blocks: &[
            ids::CONTENT_QUERY,
            ids::CONTENT_CACHE,
            ids::CONTENT_RESPONSE,
            ids::CONTENT_HANDS,
            ids::CONTENT_TIMELINE,
        ],
        capabilities: &["getContent", "listContents", "getHands", "buildTimeline"],
    },
    DomainAgentConfig {
        id: "stream-domain",
        domain: DomainType::Stream,
        managed_blocks: &[
            ids::STREAM_RESOLVE,
            ids::STREAM_TRANSCODE,
            ids::STREAM_DELIVER,
            ids::STREAM_MONITOR,
        ],
        capabilities: &["getStreamUrl", "getStreamStatus", "startTranscode"],
    },
    DomainAgentConfig {
        id: "search-domain",
        domain: DomainType::Search,
        managed_blocks: &[ids::SEARCH_PARSE, ids::SEARCH_SEARCH, ids::SEARCH_RANK],
        capabilities: &["search", "suggest"],
    },
];

/// Block ids managed by a domain's agent; empty for domains without one.
pub fn managed_blocks(domain: DomainType) -> &'static [&'static str] {
    DOMAIN_AGENTS
        .iter()
        .find(|agent| agent.domain == domain)
        .map(|agent| agent.managed_blocks)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn registry_indexes_by_domain() {
        let registry = InMemoryBlockRegistry::new();
        registry
            .register(Block::new(DomainType::Search, "search", BlockMetadata::default()))
            .unwrap();
        registry
            .register(Block::new(DomainType::Content, "query", BlockMetadata::default()))
            .unwrap();

        assert!(registry.has(ids::SEARCH_SEARCH));
        assert_eq!(registry.by_domain(DomainType::Content).len(), 1);
        assert_eq!(registry.all().len(), 2);
        assert!(registry.get("stream.resolve").is_none());
    }

    #[test]
    fn mismatched_id_is_rejected() {
        let registry = InMemoryBlockRegistry::new();
        let mut block = Block::new(DomainType::Auth, "token", BlockMetadata::default());
        block.id = "auth.other".to_string();
        let err = registry.register(block).unwrap_err();
        assert_eq!(err.code, ErrorCode::BlockValidationFailed);
    }

    #[test]
    fn size_status_takes_the_worse_dimension() {
        assert_eq!(analyze_block_size("a.b", 20, 35_000).status, BlockSizeStatus::Optimal);
        assert_eq!(analyze_block_size("a.b", 25, 1_000).status, BlockSizeStatus::Warning);
        let critical = analyze_block_size("a.b", 5, 50_001);
        assert_eq!(critical.status, BlockSizeStatus::Critical);
        assert!(critical.recommendation.is_some());
    }

    #[test]
    fn every_managed_block_belongs_to_its_domain() {
        for agent in DOMAIN_AGENTS {
            for block in agent.managed_blocks {
                assert!(block.starts_with(&format!("{}.", agent.domain)));
            }
        }
        assert!(managed_blocks(DomainType::Admin).is_empty());
    }
}
