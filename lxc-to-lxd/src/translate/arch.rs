use crate::target::Architecture;

/// LXC architecture spellings and the LXD architecture each maps to.
const ARCHITECTURES: &[(&str, Architecture)] = &[
    ("i686", Architecture::I686),
    ("i386", Architecture::I686),
    ("x86", Architecture::I686),
    ("x86_64", Architecture::X86_64),
    ("amd64", Architecture::X86_64),
    ("armhf", Architecture::Armv7l),
    ("armel", Architecture::Armv7l),
    ("arm", Architecture::Armv7l),
    ("armv7l", Architecture::Armv7l),
    ("arm64", Architecture::Aarch64),
    ("aarch64", Architecture::Aarch64),
    ("powerpc", Architecture::Ppc),
    ("ppc", Architecture::Ppc),
    ("powerpc64", Architecture::Ppc64),
    ("ppc64", Architecture::Ppc64),
    ("ppc64el", Architecture::Ppc64le),
    ("ppc64le", Architecture::Ppc64le),
    ("s390x", Architecture::S390x),
];

/// Map an `lxc.arch` value to its LXD architecture.
pub fn lookup(raw: &str) -> Option<Architecture> {
    let raw = raw.trim();
    ARCHITECTURES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(raw))
        .map(|(_, arch)| *arch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debian_and_kernel_names_agree() {
        assert_eq!(lookup("amd64"), Some(Architecture::X86_64));
        assert_eq!(lookup("x86_64"), Some(Architecture::X86_64));
        assert_eq!(lookup("i386"), Some(Architecture::I686));
        assert_eq!(lookup("armhf"), Some(Architecture::Armv7l));
        assert_eq!(lookup("arm64"), Some(Architecture::Aarch64));
        assert_eq!(lookup("ppc64el"), Some(Architecture::Ppc64le));
        assert_eq!(lookup("powerpc"), Some(Architecture::Ppc));
    }

    #[test]
    fn unknown_architecture_is_none() {
        assert_eq!(lookup("mips64el"), None);
        assert_eq!(lookup(""), None);
    }
}
