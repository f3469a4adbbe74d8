//! Interactive CLI sessions over the system `ssh` client.

use crate::core::connector::ConnectParams;
use crate::domain::ports::{CliConnector, CliSession, TransportError};
use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

static PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.\-/@:()]{1,64}[>#]\s*$").unwrap());
static PASSWORD_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)password:\s*$").unwrap());
static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").unwrap());

const READ_CHUNK: usize = 8192;

/// 以 `ssh`（有密碼時經由 `sshpass -e`）啟動的子行程
pub(crate) struct ProcessChannel {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    stderr: Option<ChildStderr>,
    // 跨讀取邊界的不完整 UTF-8 位元組
    pending: Vec<u8>,
    timeout: Duration,
}

impl ProcessChannel {
    pub(crate) fn spawn(mut command: Command, timeout: u64) -> Result<Self, TransportError> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let missing = |stream: &str| TransportError::Protocol(format!("missing {} pipe", stream));
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take();

        Ok(Self {
            child,
            stdin,
            stdout,
            stderr,
            pending: Vec::new(),
            timeout: Duration::from_secs(timeout),
        })
    }

    pub(crate) async fn write(&mut self, data: &str) -> Result<(), TransportError> {
        self.stdin.write_all(data.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// 讀取一段輸出，只回傳完整的字元；對端關閉時依 stderr 判斷錯誤類型
    pub(crate) async fn read_chunk(&mut self, waiting_for: &str) -> Result<String, TransportError> {
        let mut buf = vec![0u8; READ_CHUNK];
        let read = tokio::time::timeout(self.timeout, self.stdout.read(&mut buf))
            .await
            .map_err(|_| TransportError::Timeout {
                seconds: self.timeout.as_secs(),
                waiting_for: waiting_for.to_string(),
            })??;

        if read == 0 {
            return Err(self.closed_error().await);
        }
        self.pending.extend_from_slice(&buf[..read]);
        Ok(decode_utf8(&mut self.pending))
    }

    async fn closed_error(&mut self) -> TransportError {
        let mut message = String::new();
        if let Some(stderr) = self.stderr.as_mut() {
            let _ = tokio::time::timeout(
                Duration::from_secs(1),
                stderr.read_to_string(&mut message),
            )
            .await;
        }
        classify_stderr(&message)
    }

    pub(crate) async fn shutdown(&mut self) -> Result<(), TransportError> {
        let _ = self.stdin.shutdown().await;
        match tokio::time::timeout(Duration::from_secs(2), self.child.wait()).await {
            Ok(status) => {
                status?;
                Ok(())
            }
            Err(_) => {
                self.child.kill().await?;
                Ok(())
            }
        }
    }
}

/// 解出完整的 UTF-8 字元，結尾不完整的位元組留在 `pending`
fn decode_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(pending) {
            Ok(text) => {
                out.push_str(text);
                pending.clear();
                return out;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(std::str::from_utf8(&pending[..valid]).unwrap_or_default());
                match e.error_len() {
                    Some(invalid) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + invalid);
                    }
                    None => {
                        pending.drain(..valid);
                        return out;
                    }
                }
            }
        }
    }
}

fn classify_stderr(message: &str) -> TransportError {
    let message = message.trim();
    if message.contains("Permission denied") || message.contains("Authentication failed") {
        TransportError::Authentication(message.to_string())
    } else if message.is_empty() {
        TransportError::Closed
    } else {
        TransportError::Protocol(message.to_string())
    }
}

/// 建立 ssh 指令；`subsystem` 為 NETCONF 等子系統名稱
pub(crate) fn ssh_command(
    ssh_binary: &str,
    sshpass_binary: &str,
    params: &ConnectParams,
    port: u16,
    subsystem: Option<&str>,
) -> Command {
    let mut command = if params.password.is_empty() {
        let mut command = Command::new(ssh_binary);
        command.arg("-o").arg("BatchMode=yes");
        command
    } else {
        let mut command = Command::new(sshpass_binary);
        command
            .arg("-e")
            .arg(ssh_binary)
            .env("SSHPASS", params.password.expose());
        command
    };

    command
        .arg("-p")
        .arg(port.to_string())
        .arg("-o")
        .arg(format!("ConnectTimeout={}", params.timeout))
        .arg("-o")
        .arg(format!("ServerAliveInterval={}", params.keepalive))
        .arg("-o")
        .arg("StrictHostKeyChecking=accept-new");

    if !params.username.is_empty() {
        command.arg("-l").arg(&params.username);
    }

    match subsystem {
        Some(name) => {
            command.arg("-s").arg(&params.host).arg(name);
        }
        None => {
            command.arg("-tt").arg(&params.host);
        }
    }
    command
}

/// 換行統一為 `\n` 並移除 ANSI 控制碼
pub(crate) fn clean_output(raw: &str) -> String {
    ANSI_ESCAPE
        .replace_all(raw, "")
        .replace("\r\n", "\n")
        .replace('\r', "")
}

fn last_line(buffer: &str) -> &str {
    buffer.rsplit('\n').next().unwrap_or(buffer)
}

fn is_prompt(line: &str) -> bool {
    PROMPT.is_match(line.trim_start())
}

/// 去除指令回顯與結尾的提示字元
fn strip_echo_and_prompt(buffer: &str, command: &str) -> String {
    let body = match buffer.rsplit_once('\n') {
        Some((body, tail)) if is_prompt(tail) => body,
        _ => buffer,
    };
    let body = match body.split_once('\n') {
        Some((first, rest)) if first.trim_end().ends_with(command.trim()) => rest,
        None if body.trim_end().ends_with(command.trim()) => "",
        _ => body,
    };
    body.trim_end().to_string()
}

/// Paging command for a device type.
pub fn paging_command(device_type: &str) -> &'static str {
    match device_type {
        "cisco_asa" => "terminal pager 0",
        _ => "terminal length 0",
    }
}

pub struct SshShellSession {
    channel: ProcessChannel,
    buffer: String,
    host: String,
}

impl SshShellSession {
    async fn read_until(
        &mut self,
        matches: impl Fn(&str) -> bool,
        waiting_for: &str,
    ) -> Result<String, TransportError> {
        loop {
            if matches(last_line(&self.buffer)) {
                return Ok(std::mem::take(&mut self.buffer));
            }
            let chunk = self.channel.read_chunk(waiting_for).await?;
            self.buffer.push_str(&clean_output(&chunk));
        }
    }

    async fn read_prompt(&mut self) -> Result<String, TransportError> {
        self.read_until(is_prompt, "device prompt").await
    }

    async fn enable(&mut self, secret: &str) -> Result<(), TransportError> {
        self.channel.write("enable\n").await?;
        let reply = self
            .read_until(
                |line| PASSWORD_PROMPT.is_match(line) || is_prompt(line),
                "enable password prompt",
            )
            .await?;
        if is_prompt(last_line(&reply)) {
            return Ok(());
        }

        self.channel.write(&format!("{}\n", secret)).await?;
        let prompt = self.read_prompt().await?;
        if !last_line(&prompt).trim_end().ends_with('#') {
            return Err(TransportError::Authentication(
                "enable secret rejected".to_string(),
            ));
        }
        Ok(())
    }

    async fn prepare(&mut self, params: &ConnectParams) -> Result<(), TransportError> {
        let banner = self.read_prompt().await?;
        let in_user_mode = last_line(&banner).trim_end().ends_with('>');

        if in_user_mode {
            if let Some(secret) = params.secret.as_ref().filter(|s| !s.is_empty()) {
                tracing::debug!("[{}] entering privileged mode", self.host);
                self.enable(secret.expose()).await?;
            }
        }

        self.send_command(paging_command(&params.device_type))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl CliSession for SshShellSession {
    async fn send_command(&mut self, command: &str) -> Result<String, TransportError> {
        self.channel.write(&format!("{}\n", command)).await?;
        let raw = self.read_prompt().await?;
        Ok(strip_echo_and_prompt(&raw, command))
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        tracing::debug!("[{}] closing CLI session", self.host);
        let _ = self.channel.write("exit\n").await;
        self.channel.shutdown().await
    }
}

/// Opens interactive shells with the local `ssh` binary.
#[derive(Debug, Clone)]
pub struct SystemSshConnector {
    ssh_binary: String,
    sshpass_binary: String,
}

impl Default for SystemSshConnector {
    fn default() -> Self {
        Self {
            ssh_binary: "ssh".to_string(),
            sshpass_binary: "sshpass".to_string(),
        }
    }
}

impl SystemSshConnector {
    pub fn new(ssh_binary: &str, sshpass_binary: &str) -> Self {
        Self {
            ssh_binary: ssh_binary.to_string(),
            sshpass_binary: sshpass_binary.to_string(),
        }
    }
}

#[async_trait]
impl CliConnector for SystemSshConnector {
    async fn connect(&self, params: &ConnectParams) -> Result<Box<dyn CliSession>, TransportError> {
        let command = ssh_command(
            &self.ssh_binary,
            &self.sshpass_binary,
            params,
            params.ssh_port,
            None,
        );
        let mut session = SshShellSession {
            channel: ProcessChannel::spawn(command, params.timeout)?,
            buffer: String::new(),
            host: params.host.clone(),
        };
        session.prepare(params).await?;
        tracing::info!("Connected to {} ({})", params.host, params.device_type);
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connector::create_connector_with_env;

    fn params(password: Option<&str>) -> ConnectParams {
        let env = |_: &str| -> Option<String> { None };
        create_connector_with_env("10.0.0.1", "cisco_ios", false, Some("admin"), password, &env)
            .unwrap()
    }

    fn args(command: &Command) -> Vec<String> {
        command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_prompt_detection() {
        assert!(is_prompt("router1#"));
        assert!(is_prompt("router1> "));
        assert!(is_prompt("asa/pri/act#"));
        assert!(is_prompt("sw1(config)#"));
        assert!(!is_prompt("Password:"));
        assert!(!is_prompt("  Total entries displayed: 1"));
    }

    #[test]
    fn test_strip_echo_and_prompt() {
        let raw = "show clock\n*10:00:00.000 UTC Mon Jan 1 2024\nrouter1#";
        assert_eq!(
            strip_echo_and_prompt(raw, "show clock"),
            "*10:00:00.000 UTC Mon Jan 1 2024"
        );
        assert_eq!(strip_echo_and_prompt("terminal length 0\nrouter1#", "terminal length 0"), "");
    }

    #[test]
    fn test_clean_output() {
        assert_eq!(clean_output("a\r\nb\r\n\x1b[Kc"), "a\nb\nc");
    }

    #[test]
    fn test_ssh_command_with_password() {
        let command = ssh_command("ssh", "sshpass", &params(Some("secret")), 22, None);
        assert_eq!(command.as_std().get_program(), "sshpass");
        let args = args(&command);
        assert_eq!(&args[..2], &["-e", "ssh"]);
        assert!(args.contains(&"ConnectTimeout=60".to_string()));
        assert!(args.contains(&"ServerAliveInterval=10".to_string()));
        assert!(!args.iter().any(|a| a.contains("secret")));
        assert_eq!(&args[args.len() - 2..], &["-tt", "10.0.0.1"]);
    }

    #[test]
    fn test_ssh_command_for_subsystem() {
        let command = ssh_command("ssh", "sshpass", &params(Some("")), 830, Some("netconf"));
        assert_eq!(command.as_std().get_program(), "ssh");
        let args = args(&command);
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert_eq!(&args[args.len() - 3..], &["-s", "10.0.0.1", "netconf"]);
        let port = args.iter().position(|a| a == "-p").unwrap();
        assert_eq!(args[port + 1], "830");
    }

    #[test]
    fn test_decode_utf8_keeps_split_character() {
        let mut pending = b"Gi0/1 \xc3".to_vec();
        assert_eq!(decode_utf8(&mut pending), "Gi0/1 ");
        assert_eq!(pending, vec![0xc3]);

        pending.extend_from_slice(b"\xa9t\xc3\xa9\n");
        assert_eq!(decode_utf8(&mut pending), "\u{e9}t\u{e9}\n");
        assert!(pending.is_empty());

        let mut invalid = b"a\xffb".to_vec();
        assert_eq!(decode_utf8(&mut invalid), "a\u{fffd}b");
    }

    #[tokio::test]
    async fn test_read_chunk_across_buffer_boundary() {
        let mut command = Command::new("sh");
        command.arg("-c").arg(r#"printf "%8191s\303\251\n" ''"#);
        let mut channel = ProcessChannel::spawn(command, 5).unwrap();

        let mut output = String::new();
        loop {
            match channel.read_chunk("output").await {
                Ok(chunk) => output.push_str(&chunk),
                Err(TransportError::Closed) => break,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(output.len(), 8191 + 3);
        assert!(output.ends_with("\u{e9}\n"));
        assert!(!output.contains('\u{fffd}'));
    }

    #[test]
    fn test_classify_stderr() {
        assert!(matches!(
            classify_stderr("admin@10.0.0.1: Permission denied (password)."),
            TransportError::Authentication(_)
        ));
        assert!(matches!(classify_stderr(""), TransportError::Closed));
        assert!(matches!(
            classify_stderr("ssh: connect to host 10.0.0.1 port 22: Connection refused"),
            TransportError::Protocol(_)
        ));
    }

    #[test]
    fn test_paging_command() {
        assert_eq!(paging_command("cisco_asa"), "terminal pager 0");
        assert_eq!(paging_command("cisco_xe"), "terminal length 0");
    }
}
