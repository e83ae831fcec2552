//! Default configuration values

use super::types::Config;

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "gantry.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "gantry.yaml";

/// Alternative configuration file name
pub const ALT_CONFIG_FILE: &str = ".gantry.toml";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ALT_CONFIG_FILE,
        ".gantry.yaml",
    ]
}

/// Directory under the user's home holding logs
pub const STATE_DIR: &str = ".gantry";

/// Generate default configuration TOML
pub fn default_config_toml() -> String {
    toml::to_string_pretty(&Config::default())
        .unwrap_or_else(|_| DEFAULT_CONFIG_TEMPLATE.to_string())
}

/// Generate default configuration YAML
pub fn default_config_yaml() -> String {
    serde_yaml::to_string(&Config::default())
        .unwrap_or_else(|_| DEFAULT_CONFIG_TEMPLATE.to_string())
}

/// Annotated configuration template written by `gantry init`
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Gantry configuration

targets = ["arm64-v8a", "armeabi-v7a", "x86", "x86_64"]

[library]
name = "native"
group = "com.example"
artifact_id = "native"
version = "0.1.0"
packaging = "zip"
binary_name = "libnative.so"
headers = "src/main/jni/include"
sources = ["src/main/jni"]

# [[library.licenses]]
# name = "GNU Lesser General Public License v3.0"
# url = "https://www.gnu.org/licenses/lgpl-3.0.txt"

[flags]
common = [
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
]

[linkage]
shared = ["-DANDROID_STL=c++_shared"]
static = ["-DANDROID_STL=none"]

[[variants]]
name = "release"
flags = ["-Oz", "-DNDEBUG"]

[[variants]]
name = "standalone"
parent = "release"
linkage = "static"
build_dependencies = ["dev.rikka.ndk.thirdparty:cxx:1.2.0"]

[toolchain]
program = "./scripts/build-native.sh"
args = ["--variant", "{variant}", "--target", "{target}", "--output", "{output_dir}"]
timeout_secs = 3600
produces_symbols = true

[symbols]
exclude = ["**/dex_builder"]

[build]
output_dir = "build/gantry"

# [[repositories]]
# name = "ossrh"
# url = "https://s01.oss.sonatype.org/service/local/staging/deploy/maven2/"
#
# [[repositories]]
# name = "github"
# url = "https://maven.pkg.github.com/OWNER/REPO"
# username_env = "GITHUB_ACTOR"
# password_env = "GITHUB_TOKEN"

[publish]
timeout_secs = 300

[signing]
gpg_path = "gpg"
required = false
"#;
