//! HTTPS 監聽使用的證書載入

use std::sync::Arc;
use thiserror::Error;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::pem::PemObject;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::{self, ServerConfig};
use tokio_rustls::TlsAcceptor;

use crate::config::TlsConfig;

/// 證書載入錯誤
#[derive(Error, Debug)]
pub enum TlsError {
    #[error("無法讀取證書 {path}: {reason}")]
    Certificate { path: String, reason: String },

    #[error("證書檔案中沒有任何證書: {0}")]
    EmptyCertificate(String),

    #[error("無法讀取私鑰 {path}: {reason}")]
    PrivateKey { path: String, reason: String },

    #[error("TLS 配置錯誤: {0}")]
    Config(#[from] rustls::Error),
}

/// 依 `tls.cert_file` 與 `tls.key_file` 建立握手器
///
/// 證書檔可包含完整鏈，私鑰接受 PKCS#8、PKCS#1 或 SEC1 格式。
pub fn load_acceptor(config: &TlsConfig) -> Result<TlsAcceptor, TlsError> {
    let certs = load_certificates(&config.cert_file)?;
    let key = PrivateKeyDer::from_pem_file(&config.key_file).map_err(|e| TlsError::PrivateKey {
        path: config.key_file.clone(),
        reason: format!("{:?}", e),
    })?;

    let mut server_config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

/// 讀取 PEM 檔中的全部證書
pub fn load_certificates(path: &str) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let certs = CertificateDer::pem_file_iter(path)
        .and_then(|items| items.collect::<Result<Vec<_>, _>>())
        .map_err(|e| TlsError::Certificate {
            path: path.to_string(),
            reason: format!("{:?}", e),
        })?;

    if certs.is_empty() {
        return Err(TlsError::EmptyCertificate(path.to_string()));
    }
    Ok(certs)
}
