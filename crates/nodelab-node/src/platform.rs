//! Host platform as named by the node distribution layout

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Windows,
    Linux,
    MacOS,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostArch {
    X86,
    X64,
    Arm64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Host {
    pub os: Os,
    pub arch: HostArch,
}

impl Os {
    /// Directory / archive component used by the registry (`win`, `linux`, `darwin`)
    pub fn dist_name(self) -> &'static str {
        match self {
            Os::Windows => "win",
            Os::Linux => "linux",
            Os::MacOS => "darwin",
        }
    }

    pub fn binary_name(self) -> &'static str {
        match self {
            Os::Windows => "node.exe",
            Os::Linux | Os::MacOS => "node",
        }
    }
}

impl HostArch {
    pub fn dist_name(self) -> &'static str {
        match self {
            HostArch::X86 => "x86",
            HostArch::X64 => "x64",
            HostArch::Arm64 => "arm64",
        }
    }

    pub fn is_64bit(self) -> bool {
        !matches!(self, HostArch::X86)
    }
}

impl Host {
    pub fn detect() -> Self {
        Self {
            os: detect_os(),
            arch: detect_arch(),
        }
    }
}

pub fn detect_os() -> Os {
    #[cfg(target_os = "windows")]
    return Os::Windows;

    #[cfg(target_os = "macos")]
    return Os::MacOS;

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    Os::Linux
}

pub fn detect_arch() -> HostArch {
    #[cfg(target_arch = "x86")]
    return HostArch::X86;

    #[cfg(target_arch = "aarch64")]
    return HostArch::Arm64;

    #[cfg(not(any(target_arch = "x86", target_arch = "aarch64")))]
    HostArch::X64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_matches_binary_name() {
        let host = Host::detect();
        assert_eq!(host.os.binary_name(), nodelab_core::config::consts::NODE_BINARY);
    }

    #[test]
    fn test_dist_names() {
        assert_eq!(Os::Windows.dist_name(), "win");
        assert_eq!(Os::MacOS.dist_name(), "darwin");
        assert_eq!(HostArch::Arm64.dist_name(), "arm64");
        assert!(!HostArch::X86.is_64bit());
    }
}
