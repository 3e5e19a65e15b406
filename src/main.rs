use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sshusers::config::Config;
use sshusers::{Client, CommandRunner, LocalRunner, User};

#[derive(Parser)]
#[command(
    name = "sshusers",
    about = "Manage POSIX user accounts on remote hosts over ssh"
)]
struct Args {
    #[arg(long, help = "Config file path (default: ~/.sshusers/config.toml)")]
    config: Option<PathBuf>,

    #[arg(short = 'H', long, help = "Named host from the config")]
    host: Option<String>,

    #[arg(long, help = "Operate on the local machine instead of ssh")]
    local: bool,

    #[arg(long, help = "Skeleton directory for home creation")]
    skel_dir: Option<String>,

    #[arg(long, help = "JSON output for list/find")]
    json: bool,

    #[arg(short, long, help = "Verbose diagnostics on stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List every account in the remote user database
    List,
    /// Look up one account by name and/or uid
    Find {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        uid: Option<String>,
    },
    /// Create an account (no-op if the identity already exists)
    Add {
        name: String,
        #[arg(long)]
        uid: Option<String>,
        #[arg(long)]
        gid: Option<String>,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long)]
        home: Option<String>,
        #[arg(long)]
        shell: Option<String>,
        #[arg(long, help = "Also create and populate the home directory")]
        create_home: bool,
    },
    /// Delete an account
    Del {
        name: String,
        #[arg(long, help = "Also remove the home directory tree")]
        remove_home: bool,
    },
    /// Create the home directory for an existing account
    CreateHome {
        name: String,
        #[arg(long, help = "Home path override (default: /home/<name>)")]
        home: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("sshusers=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = if let Some(path) = &args.config {
        Config::load_from(path)
            .with_context(|| format!("cannot load config {}", path.display()))?
    } else {
        Config::load()?
    };
    if let Err(errors) = config.validate() {
        for err in &errors {
            eprintln!("config error: {}", err);
        }
        bail!("invalid configuration ({} error(s))", errors.len());
    }

    let (runner, skel): (Box<dyn CommandRunner>, Option<String>) = if args.local {
        (
            Box::new(LocalRunner::new()),
            args.skel_dir
                .clone()
                .or_else(|| config.defaults.skel_dir.clone()),
        )
    } else {
        let (name, host) = config.resolve_host(args.host.as_deref())?;
        tracing::debug!(host = name, destination = %host.destination, "using remote host");
        (
            Box::new(host.runner()),
            config.skel_dir_for(host, args.skel_dir.as_deref()),
        )
    };

    let mut client = Client::new(runner);
    if let Some(skel) = skel {
        client = client.skel_dir(skel);
    }

    run(&mut client, &args)
}

fn run(client: &mut Client<Box<dyn CommandRunner>>, args: &Args) -> Result<()> {
    match &args.command {
        Cmd::List => {
            let users = client.users()?.to_vec();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else {
                for user in &users {
                    print_user(user);
                }
            }
        }
        Cmd::Find { name, uid } => {
            if name.is_none() && uid.is_none() {
                bail!("find needs --name and/or --uid");
            }
            let query = User {
                name: name.clone().unwrap_or_default(),
                uid: uid.clone().unwrap_or_default(),
                ..Default::default()
            };
            match client.find_user(&query)? {
                Some(user) if args.json => println!("{}", serde_json::to_string_pretty(&user)?),
                Some(user) => print_user(&user),
                None => bail!("no user matching {:?}", query.identity()),
            }
        }
        Cmd::Add {
            name,
            uid,
            gid,
            comment,
            home,
            shell,
            create_home,
        } => {
            let desired = User {
                name: name.clone(),
                uid: uid.clone().unwrap_or_default(),
                gid: gid.clone().unwrap_or_default(),
                comment: comment.clone().unwrap_or_default(),
                home: home.clone().unwrap_or_default(),
                shell: shell.clone().unwrap_or_default(),
                ..Default::default()
            };
            let added = client.add_user(&desired, *create_home)?;
            println!("added {} (uid {})", added.name, added.uid);
        }
        Cmd::Del { name, remove_home } => {
            let deleted = client.delete_user(&User::by_name(name), *remove_home)?;
            println!("deleted {} (uid {})", deleted.name, deleted.uid);
        }
        Cmd::CreateHome { name, home } => {
            let Some(mut user) = client.user_by_name(name)? else {
                bail!("no user named {:?}", name);
            };
            if let Some(home) = home {
                user.home = home.clone();
            }
            let user = client.create_home(&user)?;
            println!("created home {} for {}", user.home, user.name);
        }
    }
    Ok(())
}

fn print_user(user: &User) {
    println!(
        "{}:{}:{}:{}:{}:{}",
        user.name, user.uid, user.gid, user.comment, user.home, user.shell
    );
}
