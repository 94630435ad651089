use clap::Parser;
use inquiry_desk::cli::{
    handle_serve, handle_setup, handle_token_issue, handle_user_add, handle_user_list,
    handle_user_remove, Cli, Commands, TokenAction, UserAction,
};

fn main() {
    let cli = Cli::parse();
    let database = cli.database;

    let result = match cli.command {
        Commands::Serve { port } => handle_serve(database, port),
        Commands::Setup => handle_setup(database),
        Commands::User(user_cmd) => match user_cmd.action {
            UserAction::Add { name, email } => handle_user_add(database, name, email),
            UserAction::List { json } => handle_user_list(database, json),
            UserAction::Remove { email } => handle_user_remove(database, email),
        },
        Commands::Token(token_cmd) => match token_cmd.action {
            TokenAction::Issue { email, ttl_hours } => {
                handle_token_issue(database, email, ttl_hours)
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
