mod commands;
mod handlers;

pub use commands::{Cli, Commands, TokenAction, TokenCommand, UserAction, UserCommand};
pub use handlers::{
    handle_serve, handle_setup, handle_token_issue, handle_user_add, handle_user_list,
    handle_user_remove,
};
