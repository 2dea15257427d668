mod provision;

pub use provision::{cmd_provision, exit_code};
