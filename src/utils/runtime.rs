//! Container runtime abstraction for testability
//!
//! The orchestrator only needs a handful of operations from the container
//! runtime. They live behind [`ContainerRuntime`] so the whole pipeline can be
//! driven against [`mock::MockRuntime`] in tests.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Timeout for inventory queries (volume list, network inspect, image pull excluded)
const QUERY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountMode {
    ReadWrite,
}

impl fmt::Display for MountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountMode::ReadWrite => write!(f, "rw"),
        }
    }
}

/// Where a host path or volume appears inside the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub bind: String,
    pub mode: MountMode,
}

impl Mount {
    pub fn read_write(bind: impl Into<String>) -> Self {
        Self {
            bind: bind.into(),
            mode: MountMode::ReadWrite,
        }
    }
}

/// One container execution. Built fresh for every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub image: String,

    /// Arguments passed to the image entry point (restic)
    pub command: Vec<String>,

    pub env: BTreeMap<String, String>,

    /// Host path or volume name -> mount point
    pub mounts: BTreeMap<String, Mount>,

    /// Host name -> address entries added to the container's hosts file
    pub extra_hosts: BTreeMap<String, String>,
}

/// Output stream a container log line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Operations the orchestrator needs from the container runtime
pub trait ContainerRuntime: Send + Sync {
    /// Pull an image reference (`repository[:tag]`)
    fn pull_image(&self, image: &str) -> Result<()>;

    /// Names of all volumes known to the runtime
    fn list_volumes(&self) -> Result<Vec<String>>;

    /// Gateway address of the named network, if it has one
    fn network_gateway(&self, network: &str) -> Result<Option<String>>;

    /// Run a container to completion and return its exit code.
    ///
    /// Log lines are handed to `on_line` as they arrive. The container is
    /// removed before returning, whatever the outcome.
    fn run(
        &self,
        request: &ExecutionRequest,
        on_line: &mut dyn FnMut(LogStream, &str),
    ) -> Result<i32>;
}

/// Runtime driving the `docker` command line client
pub struct DockerRuntime {
    runtime: tokio::runtime::Runtime,
}

impl DockerRuntime {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start the async runtime")?;
        Ok(Self { runtime })
    }
}

impl ContainerRuntime for DockerRuntime {
    fn pull_image(&self, image: &str) -> Result<()> {
        self.runtime.block_on(super::docker::pull_image(image))
    }

    fn list_volumes(&self) -> Result<Vec<String>> {
        self.runtime
            .block_on(super::docker::list_volumes(QUERY_TIMEOUT))
    }

    fn network_gateway(&self, network: &str) -> Result<Option<String>> {
        self.runtime
            .block_on(super::docker::network_gateway(network, QUERY_TIMEOUT))
    }

    fn run(
        &self,
        request: &ExecutionRequest,
        on_line: &mut dyn FnMut(LogStream, &str),
    ) -> Result<i32> {
        self.runtime
            .block_on(super::docker::run_container(request, on_line))
    }
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Recorded runtime call
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum RuntimeCall {
        PullImage { image: String },
        ListVolumes,
        NetworkGateway { network: String },
        Run { request: ExecutionRequest },
    }

    /// Mock container runtime for testing
    #[derive(Clone, Default)]
    pub struct MockRuntime {
        /// Recorded calls
        pub calls: Arc<Mutex<Vec<RuntimeCall>>>,
        /// Pre-configured volume inventory
        pub volumes: Arc<Mutex<Vec<String>>>,
        /// Gateway returned for the bridge network
        pub gateway: Arc<Mutex<Option<String>>>,
        /// Exit codes returned by successive runs (0 once exhausted)
        pub exit_codes: Arc<Mutex<VecDeque<i32>>>,
        /// Stdout lines emitted by successive runs (none once exhausted)
        pub outputs: Arc<Mutex<VecDeque<Vec<String>>>>,
        /// Whether network_gateway should fail
        pub should_fail_network: Arc<Mutex<bool>>,
        /// Whether run should fail
        pub should_fail_run: Arc<Mutex<bool>>,
        /// Whether list_volumes should fail
        pub should_fail_list: Arc<Mutex<bool>>,
    }

    impl MockRuntime {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure the volume inventory
        pub fn with_volumes(self, volumes: Vec<String>) -> Self {
            *self.volumes.lock().unwrap() = volumes;
            self
        }

        /// Configure the bridge gateway address
        pub fn with_gateway(self, address: &str) -> Self {
            *self.gateway.lock().unwrap() = Some(address.to_string());
            self
        }

        /// Queue exit codes for the next runs
        pub fn with_exit_codes(self, codes: Vec<i32>) -> Self {
            self.exit_codes.lock().unwrap().extend(codes);
            self
        }

        /// Queue stdout lines for the next run
        pub fn with_output(self, lines: Vec<String>) -> Self {
            self.outputs.lock().unwrap().push_back(lines);
            self
        }

        /// Configure network_gateway to fail
        pub fn with_failing_network(self) -> Self {
            *self.should_fail_network.lock().unwrap() = true;
            self
        }

        /// Configure run to fail
        pub fn with_failing_run(self) -> Self {
            *self.should_fail_run.lock().unwrap() = true;
            self
        }

        /// Configure list_volumes to fail
        pub fn with_failing_list(self) -> Self {
            *self.should_fail_list.lock().unwrap() = true;
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<RuntimeCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Requests of all recorded runs, in order
        pub fn runs(&self) -> Vec<ExecutionRequest> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|c| match c {
                    RuntimeCall::Run { request } => Some(request.clone()),
                    _ => None,
                })
                .collect()
        }

        /// Argument vectors of all recorded runs, in order
        pub fn commands(&self) -> Vec<Vec<String>> {
            self.runs().into_iter().map(|r| r.command).collect()
        }

        /// Check if pull_image was called
        pub fn pull_called(&self) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| matches!(c, RuntimeCall::PullImage { .. }))
        }

        fn record_call(&self, call: RuntimeCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl ContainerRuntime for MockRuntime {
        fn pull_image(&self, image: &str) -> Result<()> {
            self.record_call(RuntimeCall::PullImage {
                image: image.to_string(),
            });
            Ok(())
        }

        fn list_volumes(&self) -> Result<Vec<String>> {
            self.record_call(RuntimeCall::ListVolumes);
            if *self.should_fail_list.lock().unwrap() {
                anyhow::bail!("Mock list_volumes failure");
            }
            Ok(self.volumes.lock().unwrap().clone())
        }

        fn network_gateway(&self, network: &str) -> Result<Option<String>> {
            self.record_call(RuntimeCall::NetworkGateway {
                network: network.to_string(),
            });
            if *self.should_fail_network.lock().unwrap() {
                anyhow::bail!("Mock network {} not found", network);
            }
            Ok(self.gateway.lock().unwrap().clone())
        }

        fn run(
            &self,
            request: &ExecutionRequest,
            on_line: &mut dyn FnMut(LogStream, &str),
        ) -> Result<i32> {
            self.record_call(RuntimeCall::Run {
                request: request.clone(),
            });
            if *self.should_fail_run.lock().unwrap() {
                anyhow::bail!("Mock run failure");
            }

            let lines = self.outputs.lock().unwrap().pop_front().unwrap_or_default();
            for line in &lines {
                on_line(LogStream::Stdout, line);
            }

            Ok(self.exit_codes.lock().unwrap().pop_front().unwrap_or(0))
        }
    }
}
