pub mod channels;
pub mod notifications;
pub mod registry;
pub mod store;

mod convert;

use chrono::{SecondsFormat, Utc};
use faisca_types::error::{CoreError, CoreResult};

/// Run blocking DB work off the async runtime. Store failures surface as
/// `TransientIo` — retryable, never fatal.
pub(crate) async fn blocking<T, F>(f: F) -> CoreResult<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoreError::TransientIo(anyhow::anyhow!("spawn_blocking join error: {e}")))?
        .map_err(CoreError::from)
}

/// RFC 3339 with fixed microsecond precision so the stored strings sort
/// lexicographically in SQL.
pub(crate) fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
