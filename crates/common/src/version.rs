use std::fmt;

/// Version details baked in at compile time
///
/// `repo_version`, `build_profile` and `build_features` come from the
/// environment a build script exports. Crates without one report
/// `unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub repo_version: &'static str,
    pub build_profile: &'static str,
    pub build_features: &'static str,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, {}, features: {})",
            self.name, self.version, self.repo_version, self.build_profile, self.build_features
        )
    }
}

/// Build information for the crate that invokes the macro
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            repo_version: match option_env!("REPO_VERSION") {
                Some(v) => v,
                None => "unknown",
            },
            build_profile: match option_env!("BUILD_PROFILE") {
                Some(v) => v,
                None => "unknown",
            },
            build_features: match option_env!("BUILD_FEATURES") {
                Some(v) => v,
                None => "none",
            },
        }
    };
}

/// Build information for this crate
pub fn build_info() -> BuildInfo {
    build_info!()
}
