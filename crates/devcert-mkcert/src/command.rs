//! Invocation of the mkcert executable.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::CommandError;

/// Arguments for `mkcert -install -key-file <key> -cert-file <cert> <hosts...>`.
pub fn generate_args(key_path: &Path, cert_path: &Path, hosts: &[String]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-install".into(),
        "-key-file".into(),
        key_path.into(),
        "-cert-file".into(),
        cert_path.into(),
    ];
    args.extend(hosts.iter().map(OsString::from));
    args
}

/// Issue a key/cert pair for `hosts` and install the local CA.
///
/// With no binary the program name is empty, so the spawn fails and the
/// caller sees a [`CommandError::Spawn`].
pub fn generate(
    binary: Option<&Path>,
    key_path: &Path,
    cert_path: &Path,
    hosts: &[String],
) -> Result<(), CommandError> {
    let args = generate_args(key_path, cert_path, hosts);
    tracing::info!(
        command = %display_command(binary, &args),
        "Generating certificate"
    );

    run(binary, &args)?;
    Ok(())
}

/// Location of mkcert's CA root directory (`mkcert -CAROOT`).
pub fn ca_root(binary: Option<&Path>) -> Result<PathBuf, CommandError> {
    let output = run(binary, &[OsString::from("-CAROOT")])?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(PathBuf::from(stdout.trim()))
}

fn run(binary: Option<&Path>, args: &[OsString]) -> Result<Output, CommandError> {
    let program = binary.map(Path::as_os_str).unwrap_or_default();
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| CommandError::Spawn {
            program: program.to_string_lossy().into_owned(),
            source,
        })?;

    if output.status.success() {
        return Ok(output);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    tracing::warn!(stderr = %stderr.trim(), "mkcert failed");
    Err(CommandError::Failed {
        code: output.status.code().unwrap_or(-1),
        stderr: stderr.trim().to_string(),
    })
}

fn display_command(binary: Option<&Path>, args: &[OsString]) -> String {
    let mut line = binary
        .map(|b| b.display().to_string())
        .unwrap_or_default();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_args_follow_mkcert_contract() {
        let args = generate_args(
            Path::new("/save/certs/dev.pem"),
            Path::new("/save/certs/cert.pem"),
            &["localhost".to_string(), "127.0.0.1".to_string()],
        );
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-install",
                "-key-file",
                "/save/certs/dev.pem",
                "-cert-file",
                "/save/certs/cert.pem",
                "localhost",
                "127.0.0.1"
            ]
        );
    }

    #[test]
    fn command_line_is_space_joined() {
        let args = generate_args(
            Path::new("k.pem"),
            Path::new("c.pem"),
            &["a.test".to_string(), "b.test".to_string()],
        );
        assert_eq!(
            display_command(Some(Path::new("/bin/mkcert")), &args),
            "/bin/mkcert -install -key-file k.pem -cert-file c.pem a.test b.test"
        );
    }

    #[test]
    fn missing_binary_fails_to_spawn() {
        let err = generate(
            None,
            Path::new("k.pem"),
            Path::new("c.pem"),
            &["localhost".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_reports_stderr() {
        let err = ca_root(Some(Path::new("/bin/false"))).unwrap_err();
        match err {
            CommandError::Failed { code, .. } => assert_eq!(code, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
