use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct ApprovalConfig {
    /// Port for the probe endpoints.
    /// Env: FLEET_HTTP_PORT
    #[envconfig(from = "FLEET_HTTP_PORT", default = "8081")]
    pub http_port: u16,

    /// Prometheus endpoint written into every MetricReport spec. The same
    /// service name/namespace is assumed on all member clusters.
    /// Env: FLEET_PROMETHEUS_URL
    #[envconfig(
        from = "FLEET_PROMETHEUS_URL",
        default = "http://prometheus.prometheus.svc.cluster.local:9090"
    )]
    pub prometheus_url: String,

    /// Re-queue cadence for non-terminal approval requests, in seconds.
    /// Decoupled from the 30s member-side collection interval so a
    /// reconcile sees fresh samples within at most ~45s.
    /// Env: FLEET_REQUEUE_SECS
    #[envconfig(from = "FLEET_REQUEUE_SECS", default = "15")]
    pub requeue_secs: u64,

    #[envconfig(nested)]
    pub leader: LeaderConfig,
}

#[derive(Envconfig, Clone, Debug)]
pub struct LeaderConfig {
    #[envconfig(from = "FLEET_LEADER_ENABLED", default = "false")]
    pub enabled: bool,

    #[envconfig(
        from = "FLEET_LEADER_LEASE_NAME",
        default = "fleet-approval-controller-leader"
    )]
    pub lease_name: String,

    #[envconfig(from = "FLEET_LEADER_LEASE_NAMESPACE", default = "default")]
    pub lease_namespace: String,

    #[envconfig(from = "FLEET_LEADER_LEASE_DURATION_SECS", default = "30")]
    pub lease_duration_secs: i64,

    #[envconfig(from = "FLEET_LEADER_RENEW_SECS", default = "10")]
    pub renew_interval_secs: u64,
}

impl LeaderConfig {
    pub fn lease_config(&self, identity: String) -> fleet_leader::LeaseConfig {
        fleet_leader::LeaseConfig {
            namespace: self.lease_namespace.clone(),
            name: self.lease_name.clone(),
            identity,
            lease_duration_secs: self.lease_duration_secs,
            renew_interval_secs: self.renew_interval_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_test_utils::set_env_guarded;

    #[test]
    fn defaults_apply_without_env() {
        // Fields set by the override test are not asserted here; tests
        // share the process environment.
        let cfg = ApprovalConfig::init_from_env().unwrap();
        assert_eq!(cfg.http_port, 8081);
        assert!(!cfg.leader.enabled);
        assert_eq!(cfg.leader.lease_name, "fleet-approval-controller-leader");
    }

    #[test]
    fn env_overrides_defaults() {
        let _g1 = set_env_guarded("FLEET_REQUEUE_SECS", "5");
        let _g2 = set_env_guarded("FLEET_PROMETHEUS_URL", "http://prom:9090");
        let cfg = ApprovalConfig::init_from_env().unwrap();
        assert_eq!(cfg.requeue_secs, 5);
        assert_eq!(cfg.prometheus_url, "http://prom:9090");
    }
}
