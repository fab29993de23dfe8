use clap::Parser;
use htstore::{Config, CredentialStore, DEFAULT_BCRYPT_COST, DEFAULT_FILE, WriteOptions};
use snafu::{OptionExt, ResultExt};
use std::io::{self, BufRead, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

/// Manage users in an htpasswd-style credential file.
#[derive(Parser)]
#[command(name = "htstore")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the credential file
    #[arg(short, long, global = true, env = "HTSTORE_FILE", default_value = DEFAULT_FILE)]
    file: PathBuf,

    /// bcrypt cost for new hashes (4-31)
    #[arg(
        long,
        global = true,
        env = "HTSTORE_BCRYPT_COST",
        default_value_t = DEFAULT_BCRYPT_COST
    )]
    cost: u32,

    /// Log what is being changed
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print a user's line
    Find {
        /// Username to look up
        username: String,
    },

    /// List users in the credential file
    List {
        /// Print every line verbatim instead of usernames
        #[arg(long)]
        raw: bool,
    },

    /// Add a user to the credential file
    Add {
        /// Username to add
        username: String,
        /// Overwrite the user if it already exists
        #[arg(long)]
        force: bool,
        /// Hash method tag
        #[arg(long)]
        method: Option<String>,
        /// Read password from stdin instead of prompting
        #[arg(long)]
        password: bool,
    },

    /// Remove a user from the credential file
    Remove {
        /// Username to remove
        username: String,
    },

    /// Change a user's password
    Passwd {
        /// Username to update
        username: String,
        /// Skip verification of the current password
        #[arg(long)]
        force: bool,
        /// Hash method tag
        #[arg(long)]
        method: Option<String>,
        /// Read passwords from stdin (current password first, then the new one)
        #[arg(long)]
        password: bool,
    },

    /// Verify a user's password
    Verify {
        /// Username to verify
        username: String,
        /// Read password from stdin instead of prompting
        #[arg(long)]
        password: bool,
    },

    /// Print a credential line without touching the file
    Line {
        /// Username for the line
        username: String,
        /// Hash method tag
        #[arg(long)]
        method: Option<String>,
        /// Read password from stdin instead of prompting
        #[arg(long)]
        password: bool,
    },
}

type Result<T> = ::std::result::Result<T, snafu::Whatever>;

fn read_password_from_stdin() -> Result<Zeroizing<String>> {
    let mut password = String::new();
    io::stdin()
        .read_to_string(&mut password)
        .whatever_context("Can't read password from stdin")?;
    Ok(Zeroizing::new(password.trim_end().to_string()))
}

/// Reads the current and the new password as two lines of stdin.
fn read_password_pair_from_stdin(
    with_current: bool,
) -> Result<(Option<Zeroizing<String>>, Zeroizing<String>)> {
    let mut lines = io::stdin().lock().lines();
    let mut next_line = |what: &str| -> Result<Zeroizing<String>> {
        let line = lines
            .next()
            .with_whatever_context(|| format!("Missing {what} on stdin"))?
            .whatever_context("Can't read password from stdin")?;
        Ok(Zeroizing::new(line.trim_end().to_string()))
    };

    let current = if with_current {
        Some(next_line("current password")?)
    } else {
        None
    };
    Ok((current, next_line("new password")?))
}

fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    rpassword::prompt_password(prompt)
        .whatever_context("Can't prompt for password")
        .map(Zeroizing::new)
}

fn prompt_password_confirm() -> Result<Zeroizing<String>> {
    loop {
        let password = prompt_password("New password: ")?;
        let confirm = prompt_password("Re-type new password: ")?;

        if *password == *confirm {
            return Ok(password);
        }

        eprintln!("Password verification error: Passwords do not match");
        eprint!("Try again? [Y/n]: ");
        let mut response = String::new();
        io::stdin()
            .read_line(&mut response)
            .whatever_context("Can't read line")?;
        let response = response.trim().to_lowercase();

        snafu::ensure_whatever!(
            response != "n" && response != "no",
            "Password confirmation failed"
        );
    }
}

fn new_password(from_stdin: bool) -> Result<Zeroizing<String>> {
    if from_stdin {
        read_password_from_stdin()
    } else {
        prompt_password_confirm()
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "htstore=info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    tracing::debug!(file = %cli.file.display(), cost = cli.cost, "Opening credential file");
    let store = CredentialStore::new(Config::new(&cli.file).with_bcrypt_cost(cli.cost));

    match cli.command {
        Commands::Find { username } => {
            let user = store
                .find(&username)
                .whatever_context("Can't read credential file")?
                .with_whatever_context(|| format!("User {username} not found"))?;
            println!("{}:{}", user.username, user.password);
            Ok(())
        }

        Commands::List { raw } => {
            if raw {
                let lines = store
                    .find_all_raw()
                    .whatever_context("Can't read credential file")?;
                for line in lines {
                    println!("{line}");
                }
            } else {
                let users = store
                    .find_all()
                    .whatever_context("Can't read credential file")?;
                for user in users {
                    println!("{}", user.username);
                }
            }
            Ok(())
        }

        Commands::Add {
            username,
            force,
            method,
            password: from_stdin,
        } => {
            let password = new_password(from_stdin)?;
            let options = WriteOptions { method, force };

            store
                .add(&username, &password, &options)
                .whatever_context("Can't add user")?;

            println!("Adding password for user {username}");
            Ok(())
        }

        Commands::Remove { username } => {
            let removed = store
                .remove(&username)
                .whatever_context("Can't remove user")?;

            if removed {
                println!("Deleting user {username}");
            } else {
                println!("User {username} not found, nothing to delete");
            }
            Ok(())
        }

        Commands::Passwd {
            username,
            force,
            method,
            password: from_stdin,
        } => {
            let (current, password) = if from_stdin {
                read_password_pair_from_stdin(!force)?
            } else {
                let current = if force {
                    None
                } else {
                    Some(prompt_password("Current password: ")?)
                };
                (current, prompt_password_confirm()?)
            };
            let options = WriteOptions { method, force };

            store
                .change_password(
                    &username,
                    &password,
                    current.as_ref().map(|current| current.as_str()),
                    &options,
                )
                .whatever_context("Can't change password")?;

            println!("Updating password for user {username}");
            Ok(())
        }

        Commands::Verify {
            username,
            password: from_stdin,
        } => {
            let password = if from_stdin {
                read_password_from_stdin()?
            } else {
                prompt_password("Enter password: ")?
            };

            match store.verify_user(&username, &password) {
                Ok(true) => {
                    println!("user {username}: password correct");
                    Ok(())
                }
                Ok(false) => {
                    snafu::whatever!("user {}: password incorrect", username)
                }
                Err(e) => {
                    snafu::whatever!("user {}: {}", username, e)
                }
            }
        }

        Commands::Line {
            username,
            method,
            password: from_stdin,
        } => {
            let password = new_password(from_stdin)?;
            let line = store
                .hashers()
                .line(&username, &password, method.as_deref())
                .whatever_context("Can't hash password")?;
            println!("{line}");
            Ok(())
        }
    }
}

#[snafu::report]
fn main() -> Result<()> {
    run()
}
