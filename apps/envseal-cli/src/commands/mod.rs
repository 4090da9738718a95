pub mod integration;
pub mod member;
pub mod principal;
pub mod push;
pub mod secret;
pub mod workspace;

pub use integration::{cmd_integration_add, cmd_integration_list, cmd_integration_set_active};
pub use member::{cmd_member_add, cmd_member_remove};
pub use principal::{cmd_init, cmd_whoami};
pub use push::cmd_push;
pub use secret::{
    cmd_secret_delete, cmd_secret_get, cmd_secret_list, cmd_secret_set, cmd_secret_visibility,
};
pub use workspace::{cmd_workspace_check, cmd_workspace_create, cmd_workspace_keys};
