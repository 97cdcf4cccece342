//! Target architecture tags

use apkforge_errors::PackageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Architecture a package is emitted for
///
/// Parsing accepts both the APK spelling (`x86_64`, `aarch64`) and the
/// common toolchain aliases (`amd64`, `arm64`). Display always renders the
/// APK spelling, which is what lands in paths, `.PKGINFO` and build logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Arch {
    X86_64,
    Aarch64,
    Armv7,
    Armhf,
    X86,
    Ppc64le,
    S390x,
    Riscv64,
    Loongarch64,
}

impl Arch {
    /// Name used by apk for this architecture
    #[must_use]
    pub fn to_apk(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
            Self::Armv7 => "armv7",
            Self::Armhf => "armhf",
            Self::X86 => "x86",
            Self::Ppc64le => "ppc64le",
            Self::S390x => "s390x",
            Self::Riscv64 => "riscv64",
            Self::Loongarch64 => "loongarch64",
        }
    }

    /// Architecture of the running host, when it has an apk name
    #[must_use]
    pub fn host() -> Option<Self> {
        std::env::consts::ARCH.parse().ok()
    }
}

impl FromStr for Arch {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            "armv7" | "arm/v7" => Ok(Self::Armv7),
            "armhf" | "arm/v6" => Ok(Self::Armhf),
            "x86" | "386" | "i386" | "i686" => Ok(Self::X86),
            "ppc64le" | "powerpc64le" => Ok(Self::Ppc64le),
            "s390x" => Ok(Self::S390x),
            "riscv64" => Ok(Self::Riscv64),
            "loongarch64" | "loong64" => Ok(Self::Loongarch64),
            other => Err(PackageError::UnknownArch {
                arch: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Arch {
    type Error = PackageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Arch> for String {
    fn from(arch: Arch) -> Self {
        arch.to_apk().to_string()
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_apk())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_to_apk_names() {
        assert_eq!("amd64".parse::<Arch>().unwrap(), Arch::X86_64);
        assert_eq!("arm64".parse::<Arch>().unwrap(), Arch::Aarch64);
        assert_eq!("386".parse::<Arch>().unwrap().to_apk(), "x86");
        assert_eq!(Arch::Aarch64.to_string(), "aarch64");
    }

    #[test]
    fn unknown_arch_is_rejected() {
        let err = "sparc".parse::<Arch>().unwrap_err();
        assert!(err.to_string().contains("sparc"));
    }
}
