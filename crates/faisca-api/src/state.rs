use std::sync::Arc;

use faisca_core::channels::ChatChannelManager;
use faisca_core::notifications::NotificationFeed;
use faisca_core::registry::MatchRegistry;
use faisca_core::store::MessageStore;
use faisca_db::Database;
use faisca_gateway::dispatcher::Dispatcher;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub registry: MatchRegistry,
    pub channels: ChatChannelManager,
    pub store: MessageStore,
    pub feed: NotificationFeed,
    pub dispatcher: Dispatcher,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        let feed = NotificationFeed::new(db.clone(), dispatcher.clone());
        let store = MessageStore::new(db.clone(), dispatcher.clone());
        Self {
            registry: MatchRegistry::new(db.clone(), dispatcher.clone(), feed.clone()),
            channels: ChatChannelManager::new(db, store.clone()),
            store,
            feed,
            dispatcher,
        }
    }
}
