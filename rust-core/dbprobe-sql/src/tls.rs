// SPDX-License-Identifier: PMPL-1.0-or-later
//! rustls connector for the Postgres driver.

use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::debug;

use dbprobe_core::{Result, ServerNameCheck, TlsMaterial, TlsVersionCap};

/// Build a connector trusting `material`'s CA, presenting its client
/// certificate when `present_client_cert` is set. `name_check` decides
/// whether the server certificate must also name the host.
pub fn make_tls_connect(
    material: &TlsMaterial,
    present_client_cert: bool,
    name_check: ServerNameCheck,
) -> Result<MakeRustlsConnect> {
    let config = material.client_config_with(present_client_cert, TlsVersionCap::Tls13, name_check)?;
    debug!(
        secret = material.source(),
        client_cert = present_client_cert,
        name_check = ?name_check,
        "postgres tls connector ready"
    );
    Ok(MakeRustlsConnect::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> Vec<u8> {
        let path = format!(
            "{}/../dbprobe-core/tests/fixtures/{name}",
            env!("CARGO_MANIFEST_DIR")
        );
        std::fs::read(path).unwrap()
    }

    fn material() -> TlsMaterial {
        TlsMaterial::from_pem(
            "demo/pg-client-cert",
            fixture("client.crt"),
            fixture("client.key"),
            fixture("ca.crt"),
        )
        .unwrap()
    }

    #[test]
    fn test_connector_with_and_without_client_cert() {
        let material = material();
        assert!(make_tls_connect(&material, true, ServerNameCheck::Verify).is_ok());
        assert!(make_tls_connect(&material, false, ServerNameCheck::Skip).is_ok());
    }
}
