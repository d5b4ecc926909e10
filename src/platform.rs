//! Platform detection for selecting the release asset to probe.
//!
//! Release assets follow Go's platform naming with one exception: Darwin
//! builds are published under the marketing name `macos`.
//!
//! ```text
//! syncthing-linux-amd64-v1.23.1.tar.gz
//! syncthing-macos-arm64-v1.23.1.zip
//! syncthing-windows-386-v1.23.1.zip
//! ```
//!
//! # Examples
//!
//! ```
//! use histver::platform::Platform;
//!
//! let p = Platform::new("darwin", "arm64");
//! assert_eq!(p.asset_prefix("syncthing"), "syncthing-macos-arm64");
//! ```

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The host platform, translated to release naming.
    pub fn current() -> Self {
        Self::new(
            host_os(std::env::consts::OS),
            host_arch(std::env::consts::ARCH),
        )
    }

    /// Name prefix of this platform's asset, e.g. `syncthing-linux-amd64`.
    pub fn asset_prefix(&self, product: &str) -> String {
        format!("{}-{}-{}", product, public_os_name(&self.os), self.arch)
    }
}

/// Rust reports Darwin as `macos`; release tooling calls it `darwin`.
fn host_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn host_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}

fn public_os_name(os: &str) -> &str {
    match os {
        "darwin" => "macos",
        other => other,
    }
}
