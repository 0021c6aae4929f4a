//! Container script execution
//!
//! Runs the frontend containerization script with positional arguments:
//! `<environment> <target_dir> <artifact> <run_command> <public_dns>`

use std::path::Path;
use std::time::Duration;

use crate::domain::frontend::FrontendSpec;
use crate::infra::command::{CommandError, ProcessRunner};

use super::DeployError;

/// Build the argument list passed to `bash`
pub fn script_args(
    script_path: &Path,
    spec: &FrontendSpec,
    target_dir: &Path,
    public_dns: &str,
) -> Vec<String> {
    vec![
        script_path.display().to_string(),
        spec.environment.clone(),
        target_dir.display().to_string(),
        spec.artifact.clone(),
        spec.run_command.clone(),
        public_dns.to_string(),
    ]
}

/// Execute the containerization script and return its stdout
pub async fn execute(
    runner: &dyn ProcessRunner,
    args: &[String],
    work_dir: &Path,
    timeout: Duration,
) -> Result<String, DeployError> {
    let output = runner
        .run("bash", args, work_dir, timeout)
        .await
        .map_err(|e| match e {
            CommandError::Timeout(d) => {
                DeployError::ScriptExecution(format!("script timed out after {:?}", d))
            }
            other => DeployError::ScriptExecution(other.to_string()),
        })?;

    if !output.success {
        return Err(DeployError::ScriptExecution(output.failure_summary()));
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frontend::DeployFrontendRequest;
    use std::path::PathBuf;

    fn spec() -> FrontendSpec {
        DeployFrontendRequest {
            repo_url: Some("https://github.com/acme/site.git".to_string()),
            base_dir: Some("web".to_string()),
            environment: Some("prod".to_string()),
            run_command: Some("npm run serve".to_string()),
        }
        .validate("npm start")
        .unwrap()
    }

    #[test]
    fn test_script_args_order() {
        let args = script_args(
            &PathBuf::from("/opt/scripts/create_frontend_docker_container.sh"),
            &spec(),
            &PathBuf::from("/home/app/cloned_repos/acme-site-web/web"),
            "ec2-1-2-3-4.compute-1.amazonaws.com",
        );

        assert_eq!(
            args,
            vec![
                "/opt/scripts/create_frontend_docker_container.sh",
                "prod",
                "/home/app/cloned_repos/acme-site-web/web",
                "acme-site-web",
                "npm run serve",
                "ec2-1-2-3-4.compute-1.amazonaws.com",
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_reports_failure_output() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("fail.sh");
        tokio::fs::write(&script, "echo \"building $3\"; echo 'docker: no space' >&2; exit 2\n")
            .await
            .unwrap();

        let args = script_args(&script, &spec(), tmp.path(), "host");
        let err = execute(
            &crate::infra::CommandRunner,
            &args,
            tmp.path(),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("exit code 2"), "{message}");
        assert!(message.contains("docker: no space"), "{message}");
    }

    #[tokio::test]
    async fn test_execute_success_returns_stdout() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("ok.sh");
        tokio::fs::write(&script, "echo \"env=$1 artifact=$3 dns=$5\"\n")
            .await
            .unwrap();

        let args = script_args(&script, &spec(), tmp.path(), "host.example");
        let stdout = execute(
            &crate::infra::CommandRunner,
            &args,
            tmp.path(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(stdout.contains("env=prod artifact=acme-site-web dns=host.example"));
    }
}
