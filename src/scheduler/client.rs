//! HTTP client for the scheduler's two kinds of outbound calls to a Node
//! Agent: health probes (short timeout) and start/stop RPCs (longer
//! timeout, §5).

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    #[allow(dead_code)]
    pub total_memory: u64,
    #[allow(dead_code)]
    pub available_memory: u64,
    #[allow(dead_code)]
    pub running_processes: usize,
    #[allow(dead_code)]
    pub processes: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
struct StartRequest<'a> {
    script_path: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    pub pid: u32,
}

#[derive(Debug, Clone, Serialize)]
struct StopRequest {
    pid: u32,
}

#[derive(Clone)]
pub struct NodeClient {
    probe_client: reqwest::Client,
    rpc_client: reqwest::Client,
}

impl NodeClient {
    pub fn new(probe_timeout: Duration, rpc_timeout: Duration) -> Self {
        Self {
            probe_client: reqwest::Client::builder()
                .timeout(probe_timeout)
                .build()
                .expect("failed to build probe http client"),
            rpc_client: reqwest::Client::builder()
                .timeout(rpc_timeout)
                .build()
                .expect("failed to build rpc http client"),
        }
    }

    pub async fn probe(&self, host: &str, port: u16) -> Result<StatusResponse, reqwest::Error> {
        self.probe_client
            .get(format!("http://{host}:{port}/status"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn start(
        &self,
        host: &str,
        port: u16,
        script_path: &str,
    ) -> Result<StartResponse, reqwest::Error> {
        self.rpc_client
            .post(format!("http://{host}:{port}/start"))
            .json(&StartRequest { script_path })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn stop(&self, host: &str, port: u16, pid: u32) -> Result<(), reqwest::Error> {
        self.rpc_client
            .post(format!("http://{host}:{port}/stop"))
            .json(&StopRequest { pid })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
