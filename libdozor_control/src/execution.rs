use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

use super::error::ExecutionError;

pub const COMMAND_FILE_NAME: &str = "dozor.dat";
pub const LOG_FILE_NAME: &str = "dozor.log";

/// One dozor invocation
#[derive(Debug, Clone)]
pub struct ExecutionRequest<'a> {
    pub commands: &'a str,
    pub working_directory: &'a Path,
    pub radiation_damage: bool,
    pub mesh: bool,
    pub on_cluster: bool,
}

/// Captured output of a successful invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs dozor. Shared between the sub-wedge worker threads, so it must be Sync.
///
/// A non-zero exit is reported as an error; the caller decides whether that is fatal.
pub trait ExecutionService: Sync {
    fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutput, ExecutionError>;
}

/// Cluster submission settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Directory holding the cluster build of dozor and its libraries
    pub path: String,
    pub executable: String,
    pub partition: Option<String>,
    pub submit_command: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            path: String::from("/opt/dozor"),
            executable: String::from("dozor"),
            partition: None,
            submit_command: String::from("srun"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub executable: String,
    pub cluster: Option<ClusterConfig>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            executable: String::from("dozor"),
            cluster: None,
        }
    }
}

impl ExecutorConfig {
    /// Shell command line running dozor on `dozor.dat` in the current directory
    pub fn command_line(&self, request: &ExecutionRequest) -> Result<String, ExecutionError> {
        let mut flags = String::from(" -pall");
        if request.mesh {
            flags.push_str(" -mesh");
        }
        if request.radiation_damage {
            flags.push_str(" -rd ");
        } else {
            flags.push_str(" -p ");
        }
        flags.push_str(COMMAND_FILE_NAME);

        if !request.on_cluster {
            return Ok(format!("{}{}", self.executable, flags));
        }
        let cluster = self
            .cluster
            .as_ref()
            .ok_or(ExecutionError::NoClusterConfig)?;
        let inner = format!(
            "export PATH={path}:$PATH;export LD_LIBRARY_PATH={path}:$LD_LIBRARY_PATH;{path}/{exe}{flags}",
            path = cluster.path,
            exe = cluster.executable,
        );
        let partition = cluster
            .partition
            .as_ref()
            .map(|p| format!(" --partition={p}"))
            .unwrap_or_default();
        Ok(format!(
            "{}{} sh -c '{}'",
            cluster.submit_command, partition, inner
        ))
    }
}

/// Runs dozor as a child process in the batch working directory.
///
/// Writes `dozor.dat` before the run and keeps the captured stdout as `dozor.log`.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    config: ExecutorConfig,
}

impl LocalExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }
}

impl ExecutionService for LocalExecutor {
    fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutput, ExecutionError> {
        let wd = request.working_directory;
        std::fs::create_dir_all(wd)?;
        std::fs::write(wd.join(COMMAND_FILE_NAME), request.commands)?;

        let command_line = self.config.command_line(request)?;
        spdlog::info!("Running '{}' in {}", command_line, wd.display());
        let output = Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .current_dir(wd)
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        std::fs::write(wd.join(LOG_FILE_NAME), &stdout)?;
        if !stderr.trim().is_empty() {
            spdlog::warn!("dozor wrote to stderr in {}: {}", wd.display(), stderr.trim());
        }

        if !output.status.success() {
            return Err(match output.status.code() {
                Some(code) => ExecutionError::NonZeroExit(command_line, code),
                None => ExecutionError::Terminated(command_line),
            });
        }
        spdlog::debug!(
            "dozor finished in {} with {} of output",
            wd.display(),
            human_bytes::human_bytes(stdout.len() as f64)
        );
        Ok(ExecutionOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(wd: &'a Path, commands: &'a str) -> ExecutionRequest<'a> {
        ExecutionRequest {
            commands,
            working_directory: wd,
            radiation_damage: false,
            mesh: false,
            on_cluster: false,
        }
    }

    #[test]
    fn test_local_command_lines() {
        let config = ExecutorConfig::default();
        let wd = Path::new("/tmp");
        let mut req = request(wd, "");
        assert_eq!(config.command_line(&req).unwrap(), "dozor -pall -p dozor.dat");
        req.mesh = true;
        req.radiation_damage = true;
        assert_eq!(
            config.command_line(&req).unwrap(),
            "dozor -pall -mesh -rd dozor.dat"
        );
    }

    #[test]
    fn test_cluster_command_line() {
        let mut config = ExecutorConfig::default();
        let mut req = request(Path::new("/tmp"), "");
        req.on_cluster = true;
        assert!(matches!(
            config.command_line(&req),
            Err(ExecutionError::NoClusterConfig)
        ));
        config.cluster = Some(ClusterConfig {
            path: String::from("/opt/dozor/cluster"),
            partition: Some(String::from("mx")),
            ..Default::default()
        });
        assert_eq!(
            config.command_line(&req).unwrap(),
            "srun --partition=mx sh -c 'export PATH=/opt/dozor/cluster:$PATH;export LD_LIBRARY_PATH=/opt/dozor/cluster:$LD_LIBRARY_PATH;/opt/dozor/cluster/dozor -pall -p dozor.dat'"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_local_executor_success() {
        let dir = tempfile::tempdir().unwrap();
        let wd = dir.path().join("0001_0010");
        let executor = LocalExecutor::new(ExecutorConfig {
            executable: String::from("echo"),
            cluster: None,
        });
        let output = executor.execute(&request(&wd, "!\nend\n")).unwrap();
        assert_eq!(output.stdout, "-pall -p dozor.dat\n");
        assert_eq!(
            std::fs::read_to_string(wd.join(COMMAND_FILE_NAME)).unwrap(),
            "!\nend\n"
        );
        assert_eq!(
            std::fs::read_to_string(wd.join(LOG_FILE_NAME)).unwrap(),
            output.stdout
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_local_executor_failure() {
        let dir = tempfile::tempdir().unwrap();
        let executor = LocalExecutor::new(ExecutorConfig {
            executable: String::from("false"),
            cluster: None,
        });
        assert!(matches!(
            executor.execute(&request(dir.path(), "!\nend\n")),
            Err(ExecutionError::NonZeroExit(_, 1))
        ));
    }
}
