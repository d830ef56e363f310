use std::sync::OnceLock;
use std::time::Duration;

use reqwest::ClientBuilder;
use tracing::debug;

const USER_AGENT: &str = concat!("streamwatch/", env!("CARGO_PKG_VERSION"));

/// Install the process-wide rustls crypto provider once.
///
/// reqwest is built without a bundled provider, so one has to be installed
/// before the first TLS handshake.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate got there first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Create a client builder with the defaults shared by all platform clients.
///
/// `timeout` of `None` or zero keeps reqwest's default (no overall timeout).
pub fn create_client_builder(timeout: Option<Duration>) -> ClientBuilder {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10));

    if let Some(timeout) = timeout.filter(|t| !t.is_zero()) {
        builder = builder.timeout(timeout);
    }

    builder
}
