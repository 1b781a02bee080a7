use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};

mod cli_style;
mod sqlite_persistence;
mod user;

use cli_style::get_styles;
use user::{SqliteUserStore, User, UserManager, UserRole};

use rustyline::{
    completion::Completer,
    highlight::Highlighter,
    history::FileHistory,
    validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    #[clap(value_parser = parse_path)]
    pub path: Option<PathBuf>,
}

#[derive(Parser)]
#[command(styles=get_styles(),name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Creates a user with the given username, defaulting to the regular role.
    AddUser {
        username: String,
        role: Option<String>,
    },

    /// Creates a password authentication for the given user.
    /// Fails if the user already has a password set.
    AddLogin { username: String, password: String },

    /// Change the password of a user, fails if no password was set.
    UpdateLogin { username: String, password: String },

    /// Deletes the password authentication for a given user.
    DeleteLogin { username: String },

    /// Shows authentication information of a given user.
    Show { username: String },

    /// Verifies the password of a given user, it doesn't make any
    /// persistent change, nor it creates any token, it just
    /// compares the password hash.
    CheckPassword { username: String, password: String },

    /// Shows all usernames.
    Usernames,

    /// Sets the role of a user, either regular or admin.
    SetRole { username: String, role: String },

    /// Shows the path of the current users db.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

fn find_user(user_manager: &UserManager, username: &str) -> Result<User, CommandExecutionResult> {
    match user_manager.get_user_by_username(username) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(CommandExecutionResult::Error(format!(
            "User '{}' not found",
            username
        ))),
        Err(err) => Err(CommandExecutionResult::Error(format!("{}", err))),
    }
}

fn execute_command(
    line: String,
    user_manager: &UserManager,
    db_path: String,
) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => {
            println!("{} {}", PROMPT, &line);
            match cli.command {
                InnerCommand::AddUser { username, role } => {
                    let role = match role.as_deref() {
                        Some(raw) => match raw.parse::<UserRole>() {
                            Ok(role) => role,
                            Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                        },
                        None => UserRole::Regular,
                    };
                    match user_manager.add_user(&username, role) {
                        Ok(id) => cli_style::print_success(&format!(
                            "Created user '{}' with id {}",
                            username, id
                        )),
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    }
                }
                InnerCommand::AddLogin { username, password } => {
                    let user = match find_user(user_manager, &username) {
                        Ok(user) => user,
                        Err(result) => return result,
                    };
                    if let Err(err) = user_manager.create_password_credentials(user.id, &password) {
                        return CommandExecutionResult::Error(format!("{}", err));
                    }
                }
                InnerCommand::UpdateLogin { username, password } => {
                    let user = match find_user(user_manager, &username) {
                        Ok(user) => user,
                        Err(result) => return result,
                    };
                    if let Err(err) = user_manager.update_password_credentials(user.id, &password) {
                        return CommandExecutionResult::Error(format!("{}", err));
                    }
                }
                InnerCommand::DeleteLogin { username } => {
                    let user = match find_user(user_manager, &username) {
                        Ok(user) => user,
                        Err(result) => return result,
                    };
                    match user_manager.delete_password_credentials(user.id) {
                        Ok(true) => {
                            cli_style::print_success(&format!("Password deleted for '{}'", username))
                        }
                        Ok(false) => println!("User '{}' had no password set.", username),
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    }
                }
                InnerCommand::Show { username } => {
                    let user = match find_user(user_manager, &username) {
                        Ok(user) => user,
                        Err(result) => return result,
                    };

                    println!("User:");
                    println!("{:#?}", user);

                    match user_manager.get_password_credentials(user.id) {
                        Ok(credentials) => {
                            println!("\nPassword Credentials:");
                            println!("{:#?}", credentials);
                        }
                        Err(err) => println!("\nFailed to get credentials: {}", err),
                    }

                    match user_manager.get_tokens(user.id) {
                        Ok(tokens) => {
                            println!("\nAuth Tokens:");
                            for token in tokens.iter() {
                                println!("{:#?}", token);
                            }
                        }
                        Err(err) => println!("\nFailed to get tokens: {}", err),
                    }
                }
                InnerCommand::Usernames => match user_manager.all_usernames() {
                    Ok(usernames) => println!("{:#?}", usernames),
                    Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                },
                InnerCommand::SetRole { username, role } => {
                    let role = match role.parse::<UserRole>() {
                        Ok(role) => role,
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };
                    let user = match find_user(user_manager, &username) {
                        Ok(user) => user,
                        Err(result) => return result,
                    };
                    if let Err(err) = user_manager.set_role(user.id, role) {
                        return CommandExecutionResult::Error(format!("{}", err));
                    }
                    cli_style::print_success(&format!("Role of '{}' set to {}", username, role));
                }
                InnerCommand::Where => {
                    println!("{}", db_path);
                }
                InnerCommand::CheckPassword { username, password } => {
                    let user = match find_user(user_manager, &username) {
                        Ok(user) => user,
                        Err(result) => return result,
                    };
                    let msg = match user_manager.check_password(user.id, &password) {
                        Ok(true) => "The password provided is correct!".to_string(),
                        Ok(false) => "Wrong password.".to_string(),
                        Err(err) => {
                            format!("Could not verify the password, something went wrong: {}", err)
                        }
                    };
                    println!("{}", msg);
                }
                InnerCommand::Exit => return CommandExecutionResult::Exit,
            }
        }

        Err(e) => {
            if let Err(_) = e.print() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct MyHelper {
    commands_names: Vec<String>,
}

impl MyHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        MyHelper { commands_names }
    }
}

impl Completer for MyHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(" ") {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for MyHelper {}
impl Validator for MyHelper {}
impl Helper for MyHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let user_db_path = match cli_args.path {
        Some(path) => path,
        None => SqliteUserStore::infer_path().with_context(|| {
            "Could not infer the users DB file path, please specify it explicitly."
        })?,
    };
    let user_store = SqliteUserStore::new(user_db_path.clone())?;
    let user_manager = UserManager::new(Arc::new(user_store));

    cli_style::print_welcome(&user_db_path.display().to_string());
    InnerCli::command().print_long_help()?;

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<MyHelper, FileHistory>::with_config(config)?;

    let helper = MyHelper::new();
    rl.set_helper(Some(helper));
    let _ = rl.clear_screen();

    loop {
        let readline = rl.readline(PROMPT);

        let _ = rl.clear_screen();
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &user_manager, user_db_path.display().to_string()) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        cli_style::print_error(&err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    cli_style::print_goodbye();
    Ok(())
}
