use envconfig::Envconfig;

use fleet_api::member_namespace;

use crate::prometheus::PromAuth;

#[derive(Envconfig, Clone, Debug)]
pub struct CollectorConfig {
    /// Identity of the member cluster this collector reports for; fixes
    /// the hub namespace it watches. Required.
    #[envconfig(from = "MEMBER_CLUSTER_NAME")]
    pub member_cluster_name: String,

    /// Hub API server URL. Required.
    #[envconfig(from = "HUB_SERVER_URL")]
    pub hub_server_url: String,

    /// Token file for hub authentication, used when no identity cert/key
    /// pair is configured.
    #[envconfig(
        from = "HUB_TOKEN_FILE",
        default = "/var/run/secrets/hub/token"
    )]
    pub hub_token_file: String,

    /// Client certificate/key pair for mTLS against the hub.
    #[envconfig(from = "IDENTITY_CERT")]
    pub identity_cert: Option<String>,
    #[envconfig(from = "IDENTITY_KEY")]
    pub identity_key: Option<String>,

    #[envconfig(from = "TLS_INSECURE", default = "false")]
    pub tls_insecure: bool,

    /// CA bundle for the hub; HUB_CERTIFICATE_AUTHORITY is honored as a
    /// fallback name for the same file.
    #[envconfig(from = "CA_BUNDLE")]
    pub ca_bundle: Option<String>,
    #[envconfig(from = "HUB_CERTIFICATE_AUTHORITY")]
    pub hub_certificate_authority: Option<String>,

    /// Optional custom header value added to every hub request.
    #[envconfig(from = "HUB_KUBE_HEADER")]
    pub hub_kube_header: Option<String>,

    #[envconfig(from = "FLEET_HTTP_PORT", default = "8081")]
    pub http_port: u16,

    #[envconfig(from = "FLEET_COLLECTION_INTERVAL_SECS", default = "30")]
    pub collection_interval_secs: u64,

    #[envconfig(nested)]
    pub prom_auth: PromAuthConfig,

    #[envconfig(nested)]
    pub leader: LeaderConfig,
}

impl CollectorConfig {
    /// Hub namespace dedicated to this member. Nothing outside it is
    /// reconciled, even when RBAC would allow it: a collector never
    /// reports for another cluster.
    pub fn hub_namespace(&self) -> String {
        member_namespace(&self.member_cluster_name)
    }

    pub fn ca_file(&self) -> Option<&str> {
        self.ca_bundle
            .as_deref()
            .or(self.hub_certificate_authority.as_deref())
    }
}

/// Optional authentication to the member-local Prometheus. Credentials
/// are injected (Secret-backed environment), never read from disk at
/// query time.
#[derive(Envconfig, Clone, Debug)]
pub struct PromAuthConfig {
    /// "bearer" | "basic"; unset disables authentication.
    #[envconfig(from = "FLEET_PROM_AUTH_MODE")]
    pub mode: Option<String>,
    #[envconfig(from = "FLEET_PROM_AUTH_TOKEN")]
    pub token: Option<String>,
    #[envconfig(from = "FLEET_PROM_AUTH_USERNAME")]
    pub username: Option<String>,
    #[envconfig(from = "FLEET_PROM_AUTH_PASSWORD")]
    pub password: Option<String>,
}

impl PromAuthConfig {
    pub fn auth(&self) -> anyhow::Result<PromAuth> {
        match self.mode.as_deref() {
            None | Some("") | Some("none") => Ok(PromAuth::None),
            Some("bearer") => {
                let token = self.token.clone().ok_or_else(|| {
                    anyhow::anyhow!(
                        "FLEET_PROM_AUTH_TOKEN is required for bearer auth"
                    )
                })?;
                Ok(PromAuth::Bearer { token })
            }
            Some("basic") => {
                let username = self.username.clone().ok_or_else(|| {
                    anyhow::anyhow!(
                        "FLEET_PROM_AUTH_USERNAME is required for basic auth"
                    )
                })?;
                let password = self.password.clone().ok_or_else(|| {
                    anyhow::anyhow!(
                        "FLEET_PROM_AUTH_PASSWORD is required for basic auth"
                    )
                })?;
                Ok(PromAuth::Basic { username, password })
            }
            Some(other) => {
                anyhow::bail!("unsupported Prometheus auth mode: {other}")
            }
        }
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct LeaderConfig {
    #[envconfig(from = "FLEET_LEADER_ENABLED", default = "false")]
    pub enabled: bool,

    /// Lease name, mirroring the leader-election ID of the deployment.
    #[envconfig(
        from = "FLEET_LEADER_LEASE_NAME",
        default = "fleet-metric-collector-leader"
    )]
    pub lease_name: String,

    /// Lease namespace; defaults to the member's hub namespace, the only
    /// namespace the collector can reach.
    #[envconfig(from = "FLEET_LEADER_LEASE_NAMESPACE")]
    pub lease_namespace: Option<String>,

    #[envconfig(from = "FLEET_LEADER_LEASE_DURATION_SECS", default = "30")]
    pub lease_duration_secs: i64,

    #[envconfig(from = "FLEET_LEADER_RENEW_SECS", default = "10")]
    pub renew_interval_secs: u64,
}

impl LeaderConfig {
    pub fn lease_config(
        &self,
        default_namespace: &str,
        identity: String,
    ) -> fleet_leader::LeaseConfig {
        fleet_leader::LeaseConfig {
            namespace: self
                .lease_namespace
                .clone()
                .unwrap_or_else(|| default_namespace.to_string()),
            name: self.lease_name.clone(),
            identity,
            lease_duration_secs: self.lease_duration_secs,
            renew_interval_secs: self.renew_interval_secs,
        }
    }
}
