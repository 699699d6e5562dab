use lxc_config::NetworkDevice;

use crate::target::{NicDevice, NicType};

/// Build LXD nic devices from resolved LXC network entries.
///
/// Device names use the declaration index, so an `empty` entry leaves a gap
/// (`convert_net0`, `convert_net2`) rather than shifting later names.
pub fn nic_devices(network: &[NetworkDevice]) -> Vec<(String, NicDevice)> {
    let mut out = Vec::new();
    for (index, dev) in network.iter().enumerate() {
        if dev.nic_type == "empty" {
            tracing::debug!(index, "skipping empty network entry");
            continue;
        }
        out.push((format!("convert_net{index}"), nic_device(index, dev)));
    }
    out
}

fn nic_device(index: usize, dev: &NetworkDevice) -> NicDevice {
    let parent = non_empty(dev.link.as_deref());
    let nictype = match dev.nic_type.as_str() {
        "veth" if parent.is_some() => NicType::Bridged,
        "veth" => NicType::P2p,
        "phys" => NicType::Physical,
        other => NicType::Other(other.to_string()),
    };

    let mtu = non_empty(dev.mtu.as_deref()).and_then(|raw| match raw.parse::<u32>() {
        Ok(mtu) => Some(mtu),
        Err(_) => {
            tracing::warn!(index, mtu = raw, "ignoring invalid network MTU");
            None
        }
    });

    NicDevice {
        nictype,
        hwaddr: non_empty(dev.hwaddr.as_deref()),
        parent,
        mtu,
        name: non_empty(dev.name.as_deref()),
        host_name: non_empty(dev.veth_pair.as_deref()),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}
