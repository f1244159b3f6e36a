//! Business logic services

pub mod catalog;
pub mod circulation;
pub mod metadata;
pub mod search;
pub mod users;

use std::sync::Arc;

use crate::{
    config::{AuthConfig, LibraryConfig, SearchConfig},
    repository::Repository,
    search::{SearchIndex, Synchronizer},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub search: search::SearchService,
    pub users: users::UsersService,
    pub metadata: metadata::MetadataService,
}

impl Services {
    /// Create all services with the given repository and search index
    pub fn new(
        repository: Repository,
        index: Arc<dyn SearchIndex>,
        auth_config: AuthConfig,
        library_config: LibraryConfig,
        search_config: SearchConfig,
    ) -> Self {
        let sync = Synchronizer::new(index.clone());
        Self {
            catalog: catalog::CatalogService::new(
                repository.clone(),
                sync.clone(),
                library_config.clone(),
            ),
            circulation: circulation::CirculationService::new(
                repository.clone(),
                sync,
                library_config.clone(),
            ),
            search: search::SearchService::new(
                repository.clone(),
                index,
                search_config,
                library_config,
            ),
            users: users::UsersService::new(repository, auth_config),
            metadata: metadata::MetadataService::new(),
        }
    }
}
