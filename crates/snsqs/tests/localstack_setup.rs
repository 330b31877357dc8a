#![allow(dead_code)]

use anyhow::{bail, Result};
use std::collections::HashMap;
use testcontainers::{core::WaitFor, Image, ImageArgs};

pub struct LocalstackMessaging {
    env_vars: HashMap<String, String>,
}

impl Default for LocalstackMessaging {
    fn default() -> Self {
        let mut env_vars: HashMap<String, String> = HashMap::new();
        env_vars.insert("SERVICES".to_string(), "sns,sqs".to_string());
        env_vars.insert("DEFAULT_REGION".to_string(), "us-east-1".to_string());

        Self { env_vars }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocalstackImageArgs {}

impl ImageArgs for LocalstackImageArgs {
    fn into_iterator(self) -> Box<dyn Iterator<Item = String>> {
        Box::new(Vec::default().into_iter())
    }
}

impl Image for LocalstackMessaging {
    type Args = LocalstackImageArgs;

    fn name(&self) -> String {
        "localstack/localstack".to_string()
    }

    fn tag(&self) -> String {
        "0.13.0.8".to_string()
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::seconds(10)]
    }

    fn expose_ports(&self) -> Vec<u16> {
        vec![4566, 4571]
    }

    fn env_vars(&self) -> Box<dyn Iterator<Item = (&String, &String)> + '_> {
        Box::new(self.env_vars.iter())
    }
}

pub async fn wait_for_localstack_container(container_url: &str) -> Result<()> {
    let mut request_count = 0;
    let healthcheck_url = format!("{}/health", container_url.trim_end_matches('/'));

    loop {
        match reqwest::get(&healthcheck_url).await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                println!("succeeded starting localstack container");
                return Ok(());
            }
            Ok(response) => {
                if request_count >= 60 {
                    bail!("localstack never became healthy: {}", response.status());
                }
            }
            Err(e) => {
                if request_count >= 60 {
                    bail!("unable to connect to container {}", e);
                }
            }
        }
        request_count += 1;
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
}
