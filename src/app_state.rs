use std::sync::Arc;

use crate::{
    auth::JwtService, config::Config, fetcher::HttpClient, interactions::InteractionService,
    repositories::Store, subscriptions::SubscriptionService, sync::SyncOrchestrator,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub subscriptions: SubscriptionService,
    pub interactions: InteractionService,
    pub jwt: Arc<JwtService>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, client: Arc<HttpClient>, config: &Config) -> Self {
        Self {
            orchestrator: Arc::new(SyncOrchestrator::new(
                store.clone(),
                client.clone(),
                config.sync.clone(),
            )),
            subscriptions: SubscriptionService::new(store.clone(), client),
            interactions: InteractionService::new(store.clone()),
            jwt: Arc::new(JwtService::new(config.jwt_secret())),
            store,
        }
    }
}
