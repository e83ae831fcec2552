//! Configuration types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::registry::Linkage;

/// Main configuration for Gantry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library identity and publication metadata
    pub library: LibraryConfig,

    /// Enabled target architectures, in build order
    pub targets: Vec<String>,

    /// Flags shared by every variant
    pub flags: FlagsConfig,

    /// Flags contributed by each runtime linkage mode
    pub linkage: LinkageConfig,

    /// Build variants, in registry order
    pub variants: Vec<VariantConfig>,

    /// External toolchain invocation
    pub toolchain: ToolchainConfig,

    /// Debug symbol collection
    pub symbols: SymbolsConfig,

    /// Artifact assembly rules
    pub assembly: AssemblyConfig,

    /// Build scheduling and output layout
    pub build: BuildConfig,

    /// Remote artifact repositories
    pub repositories: Vec<RepositoryConfig>,

    /// Publication settings
    pub publish: PublishConfig,

    /// Where credentials are read from
    pub credentials: CredentialsConfig,

    /// Detached signature settings
    pub signing: SigningConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library: LibraryConfig::default(),
            targets: vec![
                "arm64-v8a".to_string(),
                "armeabi-v7a".to_string(),
                "x86".to_string(),
                "x86_64".to_string(),
            ],
            flags: FlagsConfig::default(),
            linkage: LinkageConfig::default(),
            variants: vec![
                VariantConfig::new("release").with_flags(["-Oz", "-DNDEBUG"]),
                VariantConfig::new("standalone")
                    .with_parent("release")
                    .with_linkage(Linkage::Static)
                    .with_build_dependency("dev.rikka.ndk.thirdparty:cxx:1.2.0"),
            ],
            toolchain: ToolchainConfig::default(),
            symbols: SymbolsConfig::default(),
            assembly: AssemblyConfig::default(),
            build: BuildConfig::default(),
            repositories: Vec::new(),
            publish: PublishConfig::default(),
            credentials: CredentialsConfig::default(),
            signing: SigningConfig::default(),
        }
    }
}

/// Library identity and descriptive metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Human readable name
    pub name: String,

    /// Publication group
    pub group: String,

    /// Base artifact id
    pub artifact_id: String,

    /// Version shared by every variant unless overridden
    pub version: String,

    /// Short description
    pub description: Option<String>,

    /// Project homepage
    pub url: Option<String>,

    /// Extension of the primary binary bundle
    pub packaging: String,

    /// File name the toolchain produces for every target
    pub binary_name: String,

    /// Directory holding the public interop headers
    pub headers: Option<PathBuf>,

    /// Source directories packed into the sources bundle
    pub sources: Vec<PathBuf>,

    /// Documentation directory packed into the docs bundle
    pub docs: Option<PathBuf>,

    /// Licenses
    pub licenses: Vec<LicenseConfig>,

    /// Authors
    pub developers: Vec<DeveloperConfig>,

    /// Source control
    pub scm: Option<ScmConfig>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            name: "native".to_string(),
            group: "com.example".to_string(),
            artifact_id: "native".to_string(),
            version: "0.1.0".to_string(),
            description: None,
            url: None,
            packaging: "zip".to_string(),
            binary_name: "libnative.so".to_string(),
            headers: Some(PathBuf::from("src/main/jni/include")),
            sources: vec![PathBuf::from("src/main/jni")],
            docs: None,
            licenses: Vec::new(),
            developers: Vec::new(),
            scm: None,
        }
    }
}

/// License entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LicenseConfig {
    /// License name
    pub name: String,
    /// License URL
    pub url: Option<String>,
}

/// Developer entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeveloperConfig {
    /// Developer or organisation name
    pub name: String,
    /// Homepage
    pub url: Option<String>,
    /// Contact email
    pub email: Option<String>,
}

/// Source control information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScmConfig {
    /// Read-only connection string
    pub connection: Option<String>,
    /// Developer connection string
    pub developer_connection: Option<String>,
    /// Browsable URL
    pub url: Option<String>,
}

/// Flags shared by every variant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagsConfig {
    /// Prepended to every resolved flag list
    pub common: Vec<String>,
}

impl Default for FlagsConfig {
    fn default() -> Self {
        let common = [
            "-Wall",
            "-Werror",
            "-Qunused-arguments",
            "-Wno-gnu-string-literal-operator-template",
            "-fno-rtti",
            "-fvisibility=hidden",
            "-fvisibility-inlines-hidden",
            "-fno-exceptions",
            "-fno-stack-protector",
            "-fomit-frame-pointer",
            "-Wno-builtin-macro-redefined",
            "-ffunction-sections",
            "-fdata-sections",
            "-Wno-unused-value",
            "-Wl,--gc-sections",
            "-D__FILE__=__FILE_NAME__",
            "-Wl,--exclude-libs,ALL",
        ];
        Self {
            common: common.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Flags contributed by each linkage mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkageConfig {
    /// Flags for a shared runtime
    pub shared: Vec<String>,
    /// Flags for a static (or absent) runtime
    #[serde(rename = "static")]
    pub static_: Vec<String>,
}

impl LinkageConfig {
    /// Flags for the given linkage mode
    pub fn flags_for(&self, linkage: Linkage) -> &[String] {
        match linkage {
            Linkage::Shared => &self.shared,
            Linkage::Static => &self.static_,
        }
    }
}

impl Default for LinkageConfig {
    fn default() -> Self {
        Self {
            shared: vec!["-DANDROID_STL=c++_shared".to_string()],
            static_: vec!["-DANDROID_STL=none".to_string()],
        }
    }
}

/// A build variant declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariantConfig {
    /// Variant name
    pub name: String,

    /// Variant this one is initialized from
    #[serde(default)]
    pub parent: Option<String>,

    /// Flags appended after the parent's
    #[serde(default)]
    pub flags: Vec<String>,

    /// Runtime linkage override
    #[serde(default)]
    pub linkage: Option<Linkage>,

    /// Restrict the variant to a subset of targets
    #[serde(default)]
    pub targets: Option<Vec<String>>,

    /// Artifact id override
    #[serde(default)]
    pub artifact_id: Option<String>,

    /// Version override
    #[serde(default)]
    pub version: Option<String>,

    /// Whether the variant takes part in publication
    #[serde(default = "default_true")]
    pub publish: bool,

    /// Extra build-time dependencies (`group:artifact:version`) scoped to this variant
    #[serde(default)]
    pub build_dependencies: Vec<String>,
}

impl VariantConfig {
    /// Create a variant with no flags and no parent
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            flags: Vec::new(),
            linkage: None,
            targets: None,
            artifact_id: None,
            version: None,
            publish: true,
            build_dependencies: Vec::new(),
        }
    }

    /// Set the parent variant
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Append flags
    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Set the linkage mode
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = Some(linkage);
        self
    }

    /// Restrict targets
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    /// Add a build-time dependency
    pub fn with_build_dependency(mut self, coordinate: impl Into<String>) -> Self {
        self.build_dependencies.push(coordinate.into());
        self
    }
}

fn default_true() -> bool {
    true
}

/// External toolchain invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Program to run
    pub program: String,

    /// Argument template; resolved flags are appended after it
    pub args: Vec<String>,

    /// Extra environment for the subprocess
    pub env: HashMap<String, String>,

    /// Working directory (defaults to the project root)
    pub working_dir: Option<PathBuf>,

    /// Timeout for one (variant, target) build; 0 disables it
    pub timeout_secs: u64,

    /// Whether every build is expected to leave an unstripped symbol file
    pub produces_symbols: bool,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            program: "./scripts/build-native.sh".to_string(),
            args: vec![
                "--variant".to_string(),
                "{variant}".to_string(),
                "--target".to_string(),
                "{target}".to_string(),
                "--output".to_string(),
                "{output_dir}".to_string(),
            ],
            env: HashMap::new(),
            working_dir: None,
            timeout_secs: 3600,
            produces_symbols: true,
        }
    }
}

/// Debug symbol collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolsConfig {
    /// Glob patterns of symbol files that must not ship
    pub exclude: Vec<String>,
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            exclude: vec!["**/dex_builder".to_string()],
        }
    }
}

/// Artifact assembly rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Fail when the sources bundle cannot be produced
    pub require_sources: bool,

    /// Fail when the documentation bundle cannot be produced
    pub require_docs: bool,
}

/// Build scheduling and output layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Root of every generated file
    pub output_dir: PathBuf,

    /// Maximum concurrent builds (defaults to available parallelism)
    pub concurrency: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("build/gantry"),
            concurrency: None,
        }
    }
}

/// Remote repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Name used for credential lookup and reporting
    pub name: String,

    /// Repository base URL (`https://`, `http://` or `file://`)
    pub url: String,

    /// Environment variable holding the username
    #[serde(default)]
    pub username_env: Option<String>,

    /// Environment variable holding the password or token
    #[serde(default)]
    pub password_env: Option<String>,
}

/// Publication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Timeout for a single upload
    pub timeout_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

/// Credential sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Prefix for derived environment variable names
    pub env_prefix: String,

    /// Optional TOML secrets file
    pub secrets_file: Option<PathBuf>,

    /// Environment variable holding the ASCII-armored signing key
    pub signing_key_env: Option<String>,

    /// Environment variable holding the signing key passphrase
    pub signing_passphrase_env: Option<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_prefix: "GANTRY".to_string(),
            secrets_file: None,
            signing_key_env: None,
            signing_passphrase_env: None,
        }
    }
}

/// Detached signature settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// gpg binary
    pub gpg_path: String,

    /// Refuse to publish unsigned publications
    pub required: bool,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            gpg_path: "gpg".to_string(),
            required: false,
        }
    }
}
