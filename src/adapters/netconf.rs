//! NETCONF 1.0 sessions over the `netconf` SSH subsystem.

use crate::adapters::ssh::{ssh_command, ProcessChannel};
use crate::core::connector::ConnectParams;
use crate::domain::ports::{NetconfConnector, NetconfSession, TransportError};
use crate::parsers::xml::XmlNode;
use async_trait::async_trait;

/// NETCONF 1.0 訊息結尾
pub const FRAME_END: &str = "]]>]]>";
pub const BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

fn client_hello() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><hello xmlns="{ns}"><capabilities><capability>urn:ietf:params:netconf:base:1.0</capability></capabilities></hello>{end}"#,
        ns = BASE_NS,
        end = FRAME_END
    )
}

/// 從緩衝區取出一則完整訊息，不完整時回傳 None
pub fn take_frame(buffer: &mut String) -> Option<String> {
    let end = buffer.find(FRAME_END)?;
    let message = buffer[..end].trim().to_string();
    buffer.replace_range(..end + FRAME_END.len(), "");
    Some(message)
}

/// `<rpc-error>` 中嚴重度為 error 的訊息
pub fn rpc_error(reply: &XmlNode) -> Option<String> {
    reply
        .children
        .iter()
        .filter(|child| child.name == "rpc-error")
        .find(|err| err.text_at("error-severity").unwrap_or("error") == "error")
        .map(|err| {
            err.text_at("error-message")
                .or_else(|| err.text_at("error-tag"))
                .unwrap_or("unknown error")
                .to_string()
        })
}

pub struct SshNetconfSession {
    channel: ProcessChannel,
    buffer: String,
    message_id: u64,
    host: String,
}

impl SshNetconfSession {
    async fn read_message(&mut self, waiting_for: &str) -> Result<String, TransportError> {
        loop {
            if let Some(message) = take_frame(&mut self.buffer) {
                return Ok(message);
            }
            let chunk = self.channel.read_chunk(waiting_for).await?;
            self.buffer.push_str(&chunk);
        }
    }

    async fn hello(&mut self) -> Result<(), TransportError> {
        let server_hello = self.read_message("server hello").await?;
        let hello = XmlNode::parse(&server_hello)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        if hello.name != "hello" {
            return Err(TransportError::Protocol(format!(
                "expected <hello>, got <{}>",
                hello.name
            )));
        }
        tracing::debug!(
            "[{}] server hello with {} capabilities",
            self.host,
            hello.find_all("capabilities/capability").len()
        );
        self.channel.write(&client_hello()).await
    }
}

#[async_trait]
impl NetconfSession for SshNetconfSession {
    async fn rpc(&mut self, request: &str) -> Result<XmlNode, TransportError> {
        self.message_id += 1;
        let message = format!(
            r#"<rpc message-id="{}" xmlns="{}">{}</rpc>{}"#,
            self.message_id, BASE_NS, request, FRAME_END
        );
        self.channel.write(&message).await?;

        let raw = self.read_message("rpc-reply").await?;
        let reply = XmlNode::parse(&raw).map_err(|e| TransportError::Protocol(e.to_string()))?;
        if let Some(error) = rpc_error(&reply) {
            return Err(TransportError::Rpc(error));
        }
        Ok(reply)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        tracing::debug!("[{}] closing NETCONF session", self.host);
        if let Err(e) = self.rpc("<close-session/>").await {
            tracing::debug!("[{}] close-session: {}", self.host, e);
        }
        self.channel.shutdown().await
    }
}

/// Opens NETCONF sessions with the local `ssh` binary.
#[derive(Debug, Clone)]
pub struct SshNetconfConnector {
    ssh_binary: String,
    sshpass_binary: String,
}

impl Default for SshNetconfConnector {
    fn default() -> Self {
        Self {
            ssh_binary: "ssh".to_string(),
            sshpass_binary: "sshpass".to_string(),
        }
    }
}

#[async_trait]
impl NetconfConnector for SshNetconfConnector {
    async fn connect(
        &self,
        params: &ConnectParams,
    ) -> Result<Box<dyn NetconfSession>, TransportError> {
        let command = ssh_command(
            &self.ssh_binary,
            &self.sshpass_binary,
            params,
            params.netconf_port,
            Some("netconf"),
        );
        let mut session = SshNetconfSession {
            channel: ProcessChannel::spawn(command, params.timeout)?,
            buffer: String::new(),
            message_id: 100,
            host: params.host.clone(),
        };
        session.hello().await?;
        tracing::info!("NETCONF session open to {}", params.host);
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_frame() {
        let mut buffer = "<hello/>]]>]]><rpc-reply/>]]>]]><partial".to_string();
        assert_eq!(take_frame(&mut buffer).as_deref(), Some("<hello/>"));
        assert_eq!(take_frame(&mut buffer).as_deref(), Some("<rpc-reply/>"));
        assert_eq!(take_frame(&mut buffer), None);
        assert_eq!(buffer, "<partial");
    }

    #[test]
    fn test_rpc_error() {
        let reply = XmlNode::parse(
            "<rpc-reply><rpc-error><error-severity>error</error-severity>\
             <error-message>syntax error</error-message></rpc-error></rpc-reply>",
        )
        .unwrap();
        assert_eq!(rpc_error(&reply).as_deref(), Some("syntax error"));

        let warning = XmlNode::parse(
            "<rpc-reply><rpc-error><error-severity>warning</error-severity>\
             <error-message>deprecated</error-message></rpc-error><ok/></rpc-reply>",
        )
        .unwrap();
        assert_eq!(rpc_error(&warning), None);
    }

    #[test]
    fn test_client_hello_is_framed() {
        let hello = client_hello();
        assert!(hello.ends_with(FRAME_END));
        let node = XmlNode::parse(hello.trim_end_matches(FRAME_END)).unwrap();
        assert_eq!(node.name, "hello");
    }
}
