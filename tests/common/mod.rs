#![allow(dead_code)]

use async_trait::async_trait;
use netcollector::core::connector::{create_connector_with_env, ConnectParams, DeviceTarget};
use netcollector::core::dispatcher::{CliAdapter, Dispatcher, NetconfAdapter};
use netcollector::core::tables::TableRegistry;
use netcollector::domain::ports::{
    CliConnector, CliSession, NetconfConnector, NetconfSession, TransportError,
};
use netcollector::parsers::xml::XmlNode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const IOS_BGP: &str = include_str!("../fixtures/ios_show_bgp_all_neighbor.txt");
pub const IOS_LLDP: &str = include_str!("../fixtures/ios_show_lldp_neighbors.txt");
pub const ASA_VPN: &str = include_str!("../fixtures/asa_show_vpn_sessiondb.txt");
pub const JUNOS_BGP: &str = include_str!("../fixtures/junos_bgp_neighbor_information.xml");
pub const JUNOS_LLDP: &str = include_str!("../fixtures/junos_lldp_neighbors_information.xml");

/// 以固定輸出回應的 CLI 設備
#[derive(Clone, Default)]
pub struct FixtureCli {
    outputs: Arc<HashMap<String, String>>,
    pub connects: Arc<AtomicUsize>,
}

impl FixtureCli {
    pub fn new(outputs: &[(&str, &str)]) -> Self {
        Self {
            outputs: Arc::new(
                outputs
                    .iter()
                    .map(|(cmd, out)| (cmd.to_string(), out.to_string()))
                    .collect(),
            ),
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

struct FixtureCliSession {
    outputs: Arc<HashMap<String, String>>,
}

#[async_trait]
impl CliSession for FixtureCliSession {
    async fn send_command(&mut self, command: &str) -> Result<String, TransportError> {
        self.outputs.get(command).cloned().ok_or_else(|| {
            TransportError::Protocol(format!("% Invalid input detected: {}", command))
        })
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait]
impl CliConnector for FixtureCli {
    async fn connect(&self, _params: &ConnectParams) -> Result<Box<dyn CliSession>, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureCliSession {
            outputs: Arc::clone(&self.outputs),
        }))
    }
}

/// 以固定 rpc-reply 回應的 NETCONF 設備，key 為 `<rpc>` 內容
#[derive(Clone, Default)]
pub struct FixtureNetconf {
    replies: Arc<HashMap<String, String>>,
}

impl FixtureNetconf {
    pub fn new(replies: &[(&str, &str)]) -> Self {
        Self {
            replies: Arc::new(
                replies
                    .iter()
                    .map(|(req, reply)| (req.to_string(), reply.to_string()))
                    .collect(),
            ),
        }
    }
}

struct FixtureNetconfSession {
    replies: Arc<HashMap<String, String>>,
}

#[async_trait]
impl NetconfSession for FixtureNetconfSession {
    async fn rpc(&mut self, request: &str) -> Result<XmlNode, TransportError> {
        let reply = self
            .replies
            .get(request)
            .ok_or_else(|| TransportError::Rpc(format!("syntax error: {}", request)))?;
        XmlNode::parse(reply).map_err(|e| TransportError::Protocol(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait]
impl NetconfConnector for FixtureNetconf {
    async fn connect(
        &self,
        _params: &ConnectParams,
    ) -> Result<Box<dyn NetconfSession>, TransportError> {
        Ok(Box::new(FixtureNetconfSession {
            replies: Arc::clone(&self.replies),
        }))
    }
}

pub fn dispatcher(cli: FixtureCli, netconf: FixtureNetconf) -> Dispatcher {
    let tables = TableRegistry::builtin().expect("built-in tables load");
    dispatcher_with_tables(cli, netconf, tables)
}

pub fn dispatcher_with_tables(
    cli: FixtureCli,
    netconf: FixtureNetconf,
    tables: TableRegistry,
) -> Dispatcher {
    Dispatcher::new(
        CliAdapter::new(Arc::new(cli)),
        NetconfAdapter::new(Arc::new(netconf), Arc::new(tables)),
    )
}

pub fn target(host: &str, device_type: &str, persist: bool, collectors: &[&str]) -> DeviceTarget {
    let env = |_: &str| -> Option<String> { None };
    let connector =
        create_connector_with_env(host, device_type, persist, Some("admin"), Some("pw"), &env)
            .expect("valid connector");
    DeviceTarget {
        connector,
        collectors: collectors.iter().map(|c| c.to_string()).collect(),
    }
}
