//! Fires the avatar push for each match, isolating failures per pic.

use std::{future::Future, pin::Pin, sync::Arc};

use tracing::{error, info};

use crate::{Error, matcher::TickMatch};

/// Everything the push callback needs to apply one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    pub user_id: String,
    /// Telegram chat the owner linked during onboarding.
    pub chat_id: i64,
    pub pic_id: String,
    pub filename: String,
}

/// Callback that applies a matched pic as its owner's avatar.
///
/// The callback owns its own connection lifecycle; the coordinator calls it
/// exactly once per match and never retries within the tick.
pub type AvatarPushFn = Arc<
    dyn Fn(PushRequest) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync,
>;

/// Per-tick dispatch counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub pushed: usize,
    pub failed: usize,
}

/// Invoke the push callback once per match.
///
/// A failed push is logged with the pic and owner ids and counted; it never
/// stops the remaining matches from being dispatched.
pub async fn dispatch(matches: &[TickMatch], push: &AvatarPushFn) -> DispatchOutcome {
    let mut outcome = DispatchOutcome::default();

    for m in matches {
        let request = PushRequest {
            user_id: m.owner.id.clone(),
            chat_id: m.owner.chat_id,
            pic_id: m.pic.id.clone(),
            filename: m.pic.filename.clone(),
        };

        match push(request).await {
            Ok(()) => {
                info!(pic_id = %m.pic.id, user_id = %m.owner.id, "avatar pushed");
                outcome.pushed += 1;
            },
            Err(source) => {
                let error = Error::Dispatch {
                    pic_id: m.pic.id.clone(),
                    source,
                };
                error!(user_id = %m.owner.id, %error, "avatar push failed");
                outcome.failed += 1;
            },
        }
    }

    outcome
}
