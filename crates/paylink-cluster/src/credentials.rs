//! Cluster Credentials
//!
//! Resolves API server address and authentication either from an explicit
//! kubeconfig file or from the pod's service account. Exactly one source is used.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;

use crate::error::{ClusterError, Result};

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Resolved connection details for one API server
#[derive(Clone, Default)]
pub struct ClusterCredentials {
    /// API server base URL
    pub server: String,

    /// Bearer token
    pub token: Option<String>,

    /// PEM bundle of trusted CAs
    pub ca_pem: Option<Vec<u8>>,

    /// PEM client certificate followed by its private key
    pub identity_pem: Option<Vec<u8>>,

    /// Skip server certificate verification
    pub insecure_skip_tls_verify: bool,
}

impl std::fmt::Debug for ClusterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterCredentials")
            .field("server", &self.server)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ca_pem", &self.ca_pem.is_some())
            .field("identity_pem", &self.identity_pem.is_some())
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .finish()
    }
}

impl ClusterCredentials {
    /// Kubeconfig when a path is given, in-cluster service account otherwise
    pub async fn load(kubeconfig: Option<&Path>) -> Result<Self> {
        match kubeconfig {
            Some(path) => {
                tracing::info!(path = %path.display(), "Using kubeconfig");
                Self::from_kubeconfig(path).await
            }
            None => {
                tracing::info!("Using in-cluster service account");
                Self::in_cluster().await
            }
        }
    }

    /// Resolve the current context of a kubeconfig file
    pub async fn from_kubeconfig(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ClusterError::Kubeconfig(format!("{}: {e}", path.display())))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        Kubeconfig::parse(&raw)?.resolve(base_dir).await
    }

    /// Service account mounted into the pod
    pub async fn in_cluster() -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| ClusterError::InCluster("KUBERNETES_SERVICE_HOST not set".into()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT")
            .map_err(|_| ClusterError::InCluster("KUBERNETES_SERVICE_PORT not set".into()))?;

        Self::from_service_account(&host, &port, Path::new(SERVICE_ACCOUNT_DIR)).await
    }

    /// Build credentials from a service-account directory (`token`, `ca.crt`)
    pub async fn from_service_account(host: &str, port: &str, dir: &Path) -> Result<Self> {
        let token = tokio::fs::read_to_string(dir.join("token"))
            .await
            .map_err(|e| ClusterError::InCluster(format!("reading token: {e}")))?;
        let ca_pem = tokio::fs::read(dir.join("ca.crt"))
            .await
            .map_err(|e| ClusterError::InCluster(format!("reading ca.crt: {e}")))?;

        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_string()
        };

        Ok(Self {
            server: format!("https://{host}:{port}"),
            token: Some(token.trim().to_string()),
            ca_pem: Some(ca_pem),
            identity_pem: None,
            insecure_skip_tls_verify: false,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    #[serde(default)]
    clusters: Vec<Named<KubeCluster>>,

    #[serde(default)]
    users: Vec<Named<KubeUser>>,

    #[serde(default)]
    contexts: Vec<Named<KubeContext>>,

    #[serde(default)]
    current_context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named<T> {
    name: String,
    #[serde(alias = "cluster", alias = "user", alias = "context")]
    value: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct KubeCluster {
    server: String,
    #[serde(default)]
    certificate_authority: Option<PathBuf>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct KubeUser {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    token_file: Option<PathBuf>,
    #[serde(default)]
    client_certificate: Option<PathBuf>,
    #[serde(default)]
    client_certificate_data: Option<String>,
    #[serde(default)]
    client_key: Option<PathBuf>,
    #[serde(default)]
    client_key_data: Option<String>,
    #[serde(default)]
    exec: Option<serde_yaml::Value>,
    #[serde(default)]
    auth_provider: Option<serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct KubeContext {
    cluster: String,
    #[serde(default)]
    user: Option<String>,
}

impl Kubeconfig {
    fn parse(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    async fn resolve(&self, base_dir: &Path) -> Result<ClusterCredentials> {
        let context_name = self
            .current_context
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ClusterError::Kubeconfig("current-context is not set".into()))?;

        let context = find(&self.contexts, context_name, "context")?;
        let cluster = find(&self.clusters, &context.cluster, "cluster")?;
        let user = match context.user.as_deref() {
            Some(name) => Some(find(&self.users, name, "user")?),
            None => None,
        };

        let ca_pem = read_data_or_file(
            cluster.certificate_authority_data.as_deref(),
            cluster.certificate_authority.as_deref(),
            base_dir,
        )
        .await?;

        let mut credentials = ClusterCredentials {
            server: cluster.server.clone(),
            ca_pem,
            insecure_skip_tls_verify: cluster.insecure_skip_tls_verify,
            ..ClusterCredentials::default()
        };

        if let Some(user) = user {
            if user.exec.is_some() || user.auth_provider.is_some() {
                return Err(ClusterError::Kubeconfig(
                    "exec/auth-provider users are not supported".into(),
                ));
            }

            credentials.token = match (&user.token, &user.token_file) {
                (Some(token), _) => Some(token.trim().to_string()),
                (None, Some(file)) => Some(
                    tokio::fs::read_to_string(base_dir.join(file))
                        .await?
                        .trim()
                        .to_string(),
                ),
                (None, None) => None,
            };

            let cert = read_data_or_file(
                user.client_certificate_data.as_deref(),
                user.client_certificate.as_deref(),
                base_dir,
            )
            .await?;
            let key = read_data_or_file(
                user.client_key_data.as_deref(),
                user.client_key.as_deref(),
                base_dir,
            )
            .await?;

            credentials.identity_pem = match (cert, key) {
                (Some(mut cert), Some(key)) => {
                    cert.push(b'\n');
                    cert.extend_from_slice(&key);
                    Some(cert)
                }
                (None, None) => None,
                _ => {
                    return Err(ClusterError::Kubeconfig(
                        "client certificate and key must be given together".into(),
                    ))
                }
            };
        }

        if credentials.server.is_empty() {
            return Err(ClusterError::Kubeconfig(format!(
                "cluster {} has no server",
                context.cluster
            )));
        }

        Ok(credentials)
    }
}

fn find<'a, T>(items: &'a [Named<T>], name: &str, kind: &str) -> Result<&'a T> {
    items
        .iter()
        .find(|item| item.name == name)
        .map(|item| &item.value)
        .ok_or_else(|| ClusterError::Kubeconfig(format!("{kind} {name:?} not found")))
}

async fn read_data_or_file(
    data: Option<&str>,
    file: Option<&Path>,
    base_dir: &Path,
) -> Result<Option<Vec<u8>>> {
    if let Some(data) = data.filter(|d| !d.is_empty()) {
        return Ok(Some(BASE64.decode(data.trim())?));
    }
    match file {
        Some(file) => Ok(Some(tokio::fs::read(base_dir.join(file)).await?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r"
apiVersion: v1
kind: Config
current-context: rancher
clusters:
- name: local
  cluster:
    server: https://rancher.example:6443
    certificate-authority-data: Y2EtcGVt
- name: other
  cluster:
    server: https://other.example:6443
users:
- name: admin
  user:
    token: kubeconfig-token
contexts:
- name: rancher
  context:
    cluster: local
    user: admin
- name: other
  context:
    cluster: other
";

    #[tokio::test]
    async fn test_kubeconfig_current_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, KUBECONFIG).unwrap();

        let credentials = ClusterCredentials::load(Some(&path)).await.unwrap();
        assert_eq!(credentials.server, "https://rancher.example:6443");
        assert_eq!(credentials.token.as_deref(), Some("kubeconfig-token"));
        assert_eq!(credentials.ca_pem.as_deref(), Some(&b"ca-pem"[..]));
        assert!(credentials.identity_pem.is_none());
    }

    #[tokio::test]
    async fn test_kubeconfig_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ca.pem"), "ca").unwrap();
        std::fs::write(dir.path().join("client.crt"), "cert").unwrap();
        std::fs::write(dir.path().join("client.key"), "key").unwrap();
        let raw = r"
current-context: dev
clusters:
- name: dev
  cluster:
    server: https://127.0.0.1:6443
    certificate-authority: ca.pem
users:
- name: dev
  user:
    client-certificate: client.crt
    client-key: client.key
contexts:
- name: dev
  context:
    cluster: dev
    user: dev
";
        let path = dir.path().join("config");
        std::fs::write(&path, raw).unwrap();

        let credentials = ClusterCredentials::from_kubeconfig(&path).await.unwrap();
        assert_eq!(credentials.ca_pem.as_deref(), Some(&b"ca"[..]));
        assert_eq!(credentials.identity_pem.as_deref(), Some(&b"cert\nkey"[..]));
        assert!(credentials.token.is_none());
    }

    #[tokio::test]
    async fn test_kubeconfig_missing_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, KUBECONFIG.replace("current-context: rancher", "current-context: gone"))
            .unwrap();

        let err = ClusterCredentials::from_kubeconfig(&path).await.unwrap_err();
        assert!(matches!(err, ClusterError::Kubeconfig(_)));
    }

    #[tokio::test]
    async fn test_kubeconfig_plugin_users_rejected() {
        let exec_user = "    exec:\n      apiVersion: client.authentication.k8s.io/v1\n      command: aws\n";
        let auth_provider_user = "    auth-provider:\n      name: oidc\n";

        for user in [exec_user, auth_provider_user] {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("config");
            std::fs::write(&path, KUBECONFIG.replace("    token: kubeconfig-token\n", user)).unwrap();

            let err = ClusterCredentials::from_kubeconfig(&path).await.unwrap_err();
            assert!(
                matches!(&err, ClusterError::Kubeconfig(msg) if msg.contains("exec/auth-provider")),
                "{err}"
            );
        }
    }

    #[tokio::test]
    async fn test_missing_kubeconfig_file() {
        let err = ClusterCredentials::from_kubeconfig(Path::new("/nonexistent/kubeconfig"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Kubeconfig(_)));
    }

    #[tokio::test]
    async fn test_service_account() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("token"), "sa-token\n").unwrap();
        std::fs::write(dir.path().join("ca.crt"), "ca").unwrap();

        let credentials = ClusterCredentials::from_service_account("10.43.0.1", "443", dir.path())
            .await
            .unwrap();
        assert_eq!(credentials.server, "https://10.43.0.1:443");
        assert_eq!(credentials.token.as_deref(), Some("sa-token"));

        let v6 = ClusterCredentials::from_service_account("fd00::1", "443", dir.path())
            .await
            .unwrap();
        assert_eq!(v6.server, "https://[fd00::1]:443");
    }

    #[test]
    fn test_debug_redacts_token() {
        let credentials = ClusterCredentials {
            token: Some("very-secret".into()),
            ..ClusterCredentials::default()
        };
        assert!(!format!("{credentials:?}").contains("very-secret"));
    }
}
