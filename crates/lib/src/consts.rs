/// Configuration file looked up in the project root when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "snowprov.toml";

pub const DEFAULT_TRIPLET: &str = "x64-windows";
pub const DEFAULT_BUILD_DIR: &str = "build";
pub const DEFAULT_BUILD_TYPE: &str = "Release";

pub const VCPKG_REPOSITORY: &str = "https://github.com/microsoft/vcpkg.git";
pub const DEFAULT_VCPKG_DIR: &str = "vcpkg";
pub const DEFAULT_CONAN_DIR: &str = ".conan";

/// Variable the Vulkan loader reads to find additional validation layers.
pub const LAYER_PATH_VAR: &str = "VK_ADD_LAYER_PATH";
pub const CONAN_HOME_VAR: &str = "CONAN_HOME";
