use super::{Api, Backend, Config, Logs, Metrics, ProxyBox, Tracing, Upstream};
use std::collections::HashMap;
use std::time::Duration;

/// Creates a new test configuration.
pub fn new_test_config() -> Config {
    Config {
        proxy: ProxyBox {
            env: super::TEST.to_string(),
            logs: Some(Logs {
                level: Some("debug".to_string()),
            }),
            api: Some(Api {
                name: Some("edgetrace".to_string()),
                port: Some("0".to_string()),
            }),
            upstream: Some(Upstream {
                backend: Some(Backend {
                    scheme: Some("http".to_string()),
                    host: Some("localhost:8090".to_string()),
                    timeout: Some(Duration::from_secs(5)),
                }),
            }),
            tracing: Some(Tracing {
                service_name: Some(super::DEFAULT_SERVICE_NAME.to_string()),
                agent_url: Some(super::DEFAULT_AGENT_URL.to_string()),
                global_tags: HashMap::new(),
            }),
            metrics: Some(Metrics { enabled: false }),
        },
    }
}
