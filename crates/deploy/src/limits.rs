pub const MAX_PROJECT_NAME_LEN: usize = 128;
pub const MAX_MODULE_PATH_LEN: usize = 512;
pub const MAX_ENV_VARS: usize = 64;
pub const MAX_ENV_NAME_LEN: usize = 128;
pub const MAX_ENV_VALUE_BYTES: usize = 5 * 1024;
pub const MAX_SERVER_CODE_BYTES: usize = 10 * 1024 * 1024;
