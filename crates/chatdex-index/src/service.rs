//! One entry point for the four search variants.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    IndexError,
    manager::{IndexManager, SearchPage},
};

/// Which tenants a search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchScope {
    /// A single chat group.
    Tenant(i64),
    /// Every chat group with an index.
    All,
}

/// How the query string is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// Keywords only.
    #[default]
    Simple,
    /// Boolean operators, groups, phrases and field qualifiers.
    Syntax,
}

/// A search as requested by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query text. `None` is rejected; a blank string matches everything.
    pub query: Option<String>,
    /// Tenants to search.
    pub scope: SearchScope,
    /// Query language.
    #[serde(default)]
    pub mode: SearchMode,
    /// Matches to skip.
    #[serde(default)]
    pub skip: usize,
    /// Maximum matches to return.
    pub take: usize,
}

/// Routes search requests to the index manager.
#[derive(Clone)]
pub struct SearchService {
    /// Tenant indexes.
    manager: Arc<IndexManager>,
}

impl SearchService {
    /// Creates a service over a manager.
    pub fn new(manager: Arc<IndexManager>) -> Self {
        Self { manager }
    }

    /// The underlying manager.
    pub fn manager(&self) -> &IndexManager {
        &self.manager
    }

    /// Runs a search request.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchPage, IndexError> {
        let query = request
            .query
            .as_deref()
            .ok_or_else(|| IndexError::InvalidInput("search query is missing".into()))?;
        debug!(
            scope = ?request.scope,
            mode = ?request.mode,
            skip = request.skip,
            take = request.take,
            "dispatching search"
        );

        let (skip, take) = (request.skip, request.take);
        match (request.scope, request.mode) {
            (SearchScope::Tenant(tenant), SearchMode::Simple) => {
                self.manager.search(query, tenant, skip, take)
            }
            (SearchScope::Tenant(tenant), SearchMode::Syntax) => {
                self.manager.syntax_search(query, tenant, skip, take)
            }
            (SearchScope::All, SearchMode::Simple) => self.manager.search_all(query, skip, take),
            (SearchScope::All, SearchMode::Syntax) => {
                self.manager.syntax_search_all(query, skip, take)
            }
        }
    }
}
