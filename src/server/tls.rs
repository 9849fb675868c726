// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright © 2024 RemasteredArch
//
// This file is part of smtp_sink.
//
// smtp_sink is free software: you can redistribute it and/or modify it under the terms of the GNU
// Affero General Public License as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// smtp_sink is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU
// Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License along with smtp_sink.
// If not, see <https://www.gnu.org/licenses/>.

//! Loads the certificate and private key of a TLS server.

use std::{path::Path, sync::Arc};

use rustls::{
    crypto::ring,
    pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer},
    ServerConfig,
};

use super::StartError;

/// Build a TLS [`ServerConfig`] from a PEM certificate chain and a PEM private key.
///
/// # Errors
///
/// - [`StartError::Pem`] if either file can't be read or parsed.
/// - [`StartError::NoCertificates`] if `certificate` holds no certificates.
/// - [`StartError::Tls`] if the key doesn't suit the certificate.
pub fn make_server_config(
    certificate: &Path,
    private_key: &Path,
) -> Result<Arc<ServerConfig>, StartError> {
    let pem_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| StartError::Pem { path, source }
    };

    let certificates = CertificateDer::pem_file_iter(certificate)
        .map_err(pem_error(certificate))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(pem_error(certificate))?;
    if certificates.is_empty() {
        return Err(StartError::NoCertificates {
            path: certificate.to_path_buf(),
        });
    }

    let private_key = PrivateKeyDer::from_pem_file(private_key).map_err(pem_error(private_key))?;

    let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certificates, private_key)?;

    Ok(Arc::new(config))
}
