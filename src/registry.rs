//! Process-wide default [`ApiClient`].
//!
//! Resources built without an explicit client fall back to the shared client
//! returned by [`api_client`]. It is constructed from
//! [`ClientConfig::from_env`] on first use, exactly once, unless the
//! application installs its own with [`install_api_client`] beforehand.

use crate::{ApiClient, ClientConfig, Result};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

static SHARED: OnceLock<Arc<ApiClient>> = OnceLock::new();
static INIT: Mutex<()> = Mutex::new(());

/// Return the shared client, building it from the environment on first use.
///
/// A configuration failure is returned to the caller and nothing is cached,
/// so a later call may succeed once the environment is fixed.
pub fn api_client() -> Result<Arc<ApiClient>> {
    get_or_try_init(&SHARED, &INIT, || {
        let config = ClientConfig::from_env()?;
        ApiClient::from_config(&config)
    })
}

/// Install `client` as the shared client.
///
/// Fails, handing the client back, if a shared client already exists.
pub fn install_api_client(client: Arc<ApiClient>) -> std::result::Result<(), Arc<ApiClient>> {
    let _guard = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    SHARED.set(client)
}

/// The shared client, if it has been initialized.
pub fn shared_api_client() -> Option<Arc<ApiClient>> {
    SHARED.get().cloned()
}

fn get_or_try_init<F>(
    cell: &OnceLock<Arc<ApiClient>>,
    guard: &Mutex<()>,
    init: F,
) -> Result<Arc<ApiClient>>
where
    F: FnOnce() -> Result<ApiClient>,
{
    if let Some(client) = cell.get() {
        return Ok(client.clone());
    }

    let _guard = guard.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(client) = cell.get() {
        return Ok(client.clone());
    }

    let client = Arc::new(init()?);
    tracing::debug!(base_url = client.base_url(), "initialized shared API client");
    Ok(cell.get_or_init(|| client).clone())
}
