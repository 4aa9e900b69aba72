use super::{GitRepo, SyncOutcome, Synchronizer};
use crate::error::{Result, WorkedonError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Supplies whatever a `git` invocation needs to authenticate against a remote.
pub trait CredentialProvider: Send + Sync + 'static {
    fn configure(&self, cmd: &mut Command) -> Result<()>;
}

/// Leaves authentication to the user's git and ssh configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientCredentials;

impl CredentialProvider for AmbientCredentials {
    fn configure(&self, _cmd: &mut Command) -> Result<()> {
        Ok(())
    }
}

/// Authenticates ssh remotes with one specific private key.
#[derive(Debug, Clone)]
pub struct SshIdentity {
    key: PathBuf,
}

impl SshIdentity {
    pub fn new(key: impl Into<PathBuf>) -> Self {
        Self { key: key.into() }
    }

    fn ssh_command(&self) -> String {
        format!("ssh -i \"{}\" -o IdentitiesOnly=yes", self.key.display())
    }
}

impl CredentialProvider for SshIdentity {
    fn configure(&self, cmd: &mut Command) -> Result<()> {
        if !self.key.is_file() {
            return Err(WorkedonError::Sync(format!(
                "identity file {} not found",
                self.key.display()
            )));
        }
        cmd.env("GIT_SSH_COMMAND", self.ssh_command());
        Ok(())
    }
}

/// Fast-forwards the current branch from its upstream using the system git.
pub struct GitPull {
    credentials: Box<dyn CredentialProvider>,
}

impl GitPull {
    pub fn new(credentials: impl CredentialProvider) -> Self {
        Self {
            credentials: Box::new(credentials),
        }
    }

    fn head_sha(&self, workdir: &Path) -> Result<String> {
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(workdir)
            .output()?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            return Err(WorkedonError::Sync(format!(
                "could not resolve HEAD: {}",
                error_msg.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn pull(&self, workdir: &Path) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.args(["pull", "--ff-only", "--quiet"])
            .current_dir(workdir)
            .env("GIT_TERMINAL_PROMPT", "0");
        self.credentials.configure(&mut cmd)?;

        let output = cmd.output()?;
        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            return Err(WorkedonError::Sync(error_msg.trim().to_string()));
        }
        Ok(())
    }
}

impl Synchronizer<GitRepo> for GitPull {
    fn synchronize(&self, handle: &mut GitRepo) -> Result<SyncOutcome> {
        let workdir = handle
            .workdir()
            .ok_or_else(|| WorkedonError::Sync("bare repository has no work tree".to_string()))?
            .to_path_buf();

        let before = self.head_sha(&workdir)?;
        tracing::trace!("Pulling {} at {}", workdir.display(), before);
        self.pull(&workdir)?;
        let after = self.head_sha(&workdir)?;

        if before == after {
            tracing::debug!("{} already up to date", handle.path().display());
            return Ok(SyncOutcome::UpToDate);
        }

        tracing::info!("Pulled {} ({} -> {})", handle.path().display(), short(&before), short(&after));
        handle.reload()?;
        Ok(SyncOutcome::Updated)
    }
}

fn short(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn missing_identity_file_is_a_sync_error() {
        let mut cmd = Command::new("git");
        let err = SshIdentity::new("/nonexistent/id_ed25519")
            .configure(&mut cmd)
            .unwrap_err();
        assert!(matches!(err, WorkedonError::Sync(_)));
    }

    #[test]
    fn identity_file_sets_ssh_command() {
        let key = tempfile::NamedTempFile::new().unwrap();
        let mut cmd = Command::new("git");
        SshIdentity::new(key.path()).configure(&mut cmd).unwrap();

        let ssh = cmd
            .get_envs()
            .find(|(k, _)| *k == OsStr::new("GIT_SSH_COMMAND"))
            .and_then(|(_, v)| v)
            .map(|v| v.to_string_lossy().to_string())
            .unwrap();
        assert!(ssh.contains("IdentitiesOnly=yes"));
        assert!(ssh.contains(&key.path().display().to_string()));
    }

    #[test]
    fn ambient_credentials_leave_environment_alone() {
        let mut cmd = Command::new("git");
        AmbientCredentials.configure(&mut cmd).unwrap();
        assert_eq!(cmd.get_envs().count(), 0);
    }

    #[test]
    fn short_sha_handles_short_input() {
        assert_eq!(short("0123456789abcdef"), "01234567");
        assert_eq!(short("abc"), "abc");
    }
}
