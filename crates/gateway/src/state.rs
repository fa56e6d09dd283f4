//! Shared application state, constructor-injected into the router.

use std::sync::Arc;

use {
    async_trait::async_trait,
    telegpick_config::TelegpickConfig,
    telegpick_store::store::{PicStore, UserStore},
};

/// Outbound Telegram delivery as the gateway sees it.
///
/// The production implementation wraps the teloxide connector; tests plug in
/// a recording fake.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_link_code(&self, chat_id: i64, code: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub pics: Arc<dyn PicStore>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<TelegpickConfig>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        pics: Arc<dyn PicStore>,
        notifier: Arc<dyn Notifier>,
        config: TelegpickConfig,
    ) -> Self {
        Self {
            users,
            pics,
            notifier,
            config: Arc::new(config),
        }
    }
}
