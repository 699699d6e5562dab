//! Parsing and typed access for LXC container configuration files.
//!
//! LXC configs are flat `key = value` files that may pull in other files via
//! `lxc.include` and external fstab tables via `lxc.mount`. [`parse_file`]
//! expands both and returns the effective config as an ordered [`LxcConfig`].
//! Derived views ([`NetworkDevice`], [`MountEntry`]) are built from it on
//! demand.

pub mod config;
pub mod key;
pub mod mount;
pub mod network;
pub mod parser;

pub use config::{ConfigLine, LxcConfig};
pub use key::{ConfigKey, InvalidKey, HOOK_PREFIX};
pub use mount::MountEntry;
pub use network::NetworkDevice;
pub use parser::{
    parse_file, parse_file_with_options, parse_str, ParseError, ParseOptions, CONFIG_SUFFIX,
    DEFAULT_BUILTIN_CONFIG_DIR,
};
