use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::ConfigLine;
use crate::key::ConfigKey;

/// A network interface declared in an LXC config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkDevice {
    /// `veth`, `phys`, `macvlan`, `vlan`, `empty`, `none`, ...
    pub nic_type: String,
    pub hwaddr: Option<String>,
    /// Host bridge or parent device.
    pub link: Option<String>,
    /// Raw MTU value, parsed by the consumer.
    pub mtu: Option<String>,
    /// Interface name inside the container.
    pub name: Option<String>,
    /// Host-side name of a veth pair.
    pub veth_pair: Option<String>,
    pub flags: Option<String>,
    pub ipv4: Vec<String>,
    pub ipv4_gateway: Option<String>,
    pub ipv6: Vec<String>,
    pub ipv6_gateway: Option<String>,
    pub script_up: Option<String>,
    pub script_down: Option<String>,
}

impl NetworkDevice {
    fn with_type(nic_type: &str) -> Self {
        Self {
            nic_type: nic_type.to_string(),
            ..Self::default()
        }
    }

    fn apply(&mut self, field: &str, value: &str) {
        let value = value.to_string();
        match field {
            "type" => self.nic_type = value,
            "hwaddr" => self.hwaddr = Some(value),
            "link" => self.link = Some(value),
            "mtu" => self.mtu = Some(value),
            "name" => self.name = Some(value),
            "veth.pair" => self.veth_pair = Some(value),
            "flags" => self.flags = Some(value),
            "ipv4" | "ipv4.address" => self.ipv4.push(value),
            "ipv4.gateway" => self.ipv4_gateway = Some(value),
            "ipv6" | "ipv6.address" => self.ipv6.push(value),
            "ipv6.gateway" => self.ipv6_gateway = Some(value),
            "script.up" => self.script_up = Some(value),
            "script.down" => self.script_down = Some(value),
            other => tracing::debug!(field = other, "ignoring unhandled network key"),
        }
    }
}

/// Group network keys into devices.
///
/// Unindexed (`lxc.network.*`) keys follow the legacy rule: each `type` line
/// opens a new device and later keys apply to the most recent one. Indexed
/// keys (`lxc.net.<n>.*`) address device `n` directly and are listed after the
/// unindexed devices, in index order. An empty bare `lxc.network` line clears
/// everything declared so far.
pub(crate) fn collect_network_devices(lines: &[ConfigLine]) -> Vec<NetworkDevice> {
    let mut sequential: Vec<NetworkDevice> = Vec::new();
    let mut indexed: BTreeMap<usize, NetworkDevice> = BTreeMap::new();

    for line in lines {
        let ConfigKey::Network { index, field } = &line.key else {
            continue;
        };
        let value = line.value.as_str();

        match (index, field.as_str()) {
            (None, "") => {
                if value.is_empty() {
                    sequential.clear();
                    indexed.clear();
                }
            }
            (Some(idx), "") => {
                if value.is_empty() {
                    indexed.remove(idx);
                }
            }
            (None, "type") => sequential.push(NetworkDevice::with_type(value)),
            (None, field) => match sequential.last_mut() {
                Some(device) => device.apply(field, value),
                None => tracing::warn!(
                    key = %line.key,
                    "network key appears before any lxc.network.type; ignoring"
                ),
            },
            (Some(idx), field) => indexed.entry(*idx).or_default().apply(field, value),
        }
    }

    sequential.extend(indexed.into_values());
    sequential
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(key: &str, value: &str) -> ConfigLine {
        ConfigLine::new(key.parse().expect("key"), value)
    }

    #[test]
    fn legacy_keys_attach_to_latest_type() {
        let lines = vec![
            line("lxc.network.type", "veth"),
            line("lxc.network.link", "lxcbr0"),
            line("lxc.network.hwaddr", "00:16:3e:aa:bb:cc"),
            line("lxc.network.type", "phys"),
            line("lxc.network.link", "eth1"),
            line("lxc.network.mtu", "9000"),
        ];
        let devices = collect_network_devices(&lines);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].nic_type, "veth");
        assert_eq!(devices[0].link.as_deref(), Some("lxcbr0"));
        assert_eq!(devices[0].hwaddr.as_deref(), Some("00:16:3e:aa:bb:cc"));
        assert_eq!(devices[1].nic_type, "phys");
        assert_eq!(devices[1].mtu.as_deref(), Some("9000"));
    }

    #[test]
    fn indexed_keys_group_by_index() {
        let lines = vec![
            line("lxc.net.1.type", "empty"),
            line("lxc.net.0.type", "veth"),
            line("lxc.net.0.veth.pair", "vethfoo"),
            line("lxc.net.0.ipv4.address", "10.0.0.2/24"),
        ];
        let devices = collect_network_devices(&lines);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].nic_type, "veth");
        assert_eq!(devices[0].veth_pair.as_deref(), Some("vethfoo"));
        assert_eq!(devices[0].ipv4, vec!["10.0.0.2/24".to_string()]);
        assert_eq!(devices[1].nic_type, "empty");
    }

    #[test]
    fn bare_network_key_clears_previous_entries() {
        let lines = vec![
            line("lxc.network.type", "veth"),
            line("lxc.network", ""),
            line("lxc.network.type", "empty"),
        ];
        let devices = collect_network_devices(&lines);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].nic_type, "empty");
    }

    #[test]
    fn orphan_field_is_ignored() {
        let lines = vec![line("lxc.network.link", "lxcbr0")];
        assert!(collect_network_devices(&lines).is_empty());
    }
}
