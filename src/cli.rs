// Command line surface. One `Args` struct per subcommand, each with a
// `run` method; `App::run` picks the subcommand and sets up the client.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use crossterm::style::Stylize;
use log::{debug, info};

use crate::api::ApiClient;
use crate::config::Config;
use crate::format::{format_size, sanitize_filename};
use crate::models::RemoteNode;
use crate::resolve::{run_delete, DeleteOutcome, DeleteRequest};
use crate::token::TokenStore;
use crate::ui;

/// Seedr CLI - terminal interface for Seedr.cc
#[derive(Parser)]
#[command(name = "seedr", author, version, about)]
pub struct App {
    /// Token file location, overrides SEEDR_TOKEN_FILE.
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List contents of your Seedr account
    List(ListArgs),
    /// Get a download link for a file, or an archive link for a folder
    Fetch(FetchArgs),
    /// Delete a file, folder, or torrent
    Delete(DeleteArgs),
    /// Add a new torrent, magnet link or local .torrent file
    Add(AddArgs),
    /// Authorize this device and store the token
    Login,
    /// Browse the account interactively
    Ui,
}

impl App {
    pub fn run(&self) -> Result<()> {
        let Some(command) = &self.command else {
            App::command().print_help()?;
            return Ok(());
        };

        match command {
            Commands::List(args) => args.run(&self.connect()?),
            Commands::Fetch(args) => args.run(&self.connect()?),
            // Arguments are checked before any remote call is made.
            Commands::Delete(args) => {
                let request = DeleteRequest::parse(&args.identifier, args.id_if_type.as_deref())?;
                delete(&self.connect()?, &request)
            }
            Commands::Add(args) => args.run(&self.connect()?),
            Commands::Login => {
                let (api, store) = self.client()?;
                login(&api, &store)
            }
            Commands::Ui => ui::main_menu(&self.connect()?),
        }
    }

    fn client(&self) -> Result<(ApiClient, TokenStore)> {
        let mut cfg = Config::from_env()?;
        if let Some(path) = &self.token_file {
            cfg.token_file = path.clone();
        }
        debug!("Use config: {:?}", cfg);

        let store = TokenStore::new(cfg.token_file.clone());
        let api = ApiClient::new(&cfg)?.with_token_store(store.clone());
        Ok((api, store))
    }

    /// Build an authenticated client, running the device flow when no
    /// token is stored and a terminal is attached.
    fn connect(&self) -> Result<ApiClient> {
        let (api, store) = self.client()?;
        match store.load()? {
            Some(token) => api.set_token(token),
            None => {
                if !io::stdin().is_terminal() {
                    bail!("Authentication required. Please run `seedr login` in a terminal first.");
                }
                login(&api, &store)?;
            }
        }
        Ok(api)
    }
}

/// Device-code login: show the code, wait for the user to approve it in
/// a browser, then exchange and store the token.
pub fn login(api: &ApiClient, store: &TokenStore) -> Result<()> {
    let codes = api.get_device_code()?;
    println!("[*] Authentication required.");
    println!("[*] Please go to: {}", codes.verification_url);
    println!("[*] Enter code: {}", codes.user_code.as_str().bold());
    print!("[?] Press Enter after authorizing...");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("read from stdin")?;

    let token = api.authorize_device(&codes.device_code)?;
    store.save(&token)?;
    api.set_token(token);
    info!("Logged in, token stored at {}", store.path().display());
    println!("{}", "Logged in".green().bold());
    Ok(())
}

#[derive(Args)]
pub struct ListArgs {
    /// Maximum recursion depth
    #[arg(short, long, default_value_t = 1)]
    pub depth: usize,
}

impl ListArgs {
    fn run(&self, api: &ApiClient) -> Result<()> {
        let usage = api.get_memory_bandwidth()?;
        println!(
            "{} {} / {}",
            "Storage:".bold(),
            format_size(usage.space_used),
            format_size(usage.space_max)
        );
        println!("{}", "Tree:".bold());

        let nodes = api.list_contents(None)?.nodes();
        let last = nodes.len().saturating_sub(1);
        for (i, node) in nodes.iter().enumerate() {
            print_tree(api, node, "", i == last, 0, self.depth);
        }
        Ok(())
    }
}

pub fn node_display(node: &RemoteNode) -> String {
    let tag = match node {
        RemoteNode::Folder(_) => "[DIR] ".blue().bold(),
        RemoteNode::File(_) => "[FILE]".green().bold(),
        RemoteNode::Torrent(_) => "[TOR] ".yellow().bold(),
    };
    format!(
        "{tag} {:<40} ({}) [ID: {}]",
        node.name(),
        format_size(node.size()),
        node.id()
    )
}

fn print_tree(
    api: &ApiClient,
    node: &RemoteNode,
    prefix: &str,
    is_last: bool,
    depth: usize,
    max_depth: usize,
) {
    let connector = if is_last { "└── " } else { "├── " };
    println!("{prefix}{connector}{}", node_display(node));

    let RemoteNode::Folder(folder) = node else {
        return;
    };
    if depth >= max_depth {
        return;
    }

    let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
    match api.list_contents(Some(folder.id.as_str())) {
        Ok(contents) => {
            let children = contents.nodes();
            let last = children.len().saturating_sub(1);
            for (i, child) in children.iter().enumerate() {
                print_tree(api, child, &child_prefix, i == last, depth + 1, max_depth);
            }
        }
        Err(err) => println!("{child_prefix}└── {}", format!("[Error: {err:#}]").red().bold()),
    }
}

#[derive(Args)]
pub struct FetchArgs {
    /// The ID of the file or folder to fetch
    pub id: String,
}

impl FetchArgs {
    fn run(&self, api: &ApiClient) -> Result<()> {
        println!("[*] Fetching ID: {}", self.id);

        match api.fetch_file(&self.id) {
            Ok(result) => {
                if let Some(url) = result.url.filter(|u| !u.is_empty()) {
                    print_link("File", &result.name, &url, &sanitize_filename(&result.name));
                    return Ok(());
                }
            }
            Err(err) => debug!("Fetch {} as file failed: {err:#}", self.id),
        }

        match self.fetch_archive(api) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(err) => debug!("Fetch {} as folder failed: {err:#}", self.id),
        }

        bail!(
            "Could not fetch item with ID {} (tried as file and folder)",
            self.id
        )
    }

    fn fetch_archive(&self, api: &ApiClient) -> Result<bool> {
        let folder = api.list_contents(Some(self.id.as_str()))?;
        let name = folder
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("folder_{}", self.id));
        println!("[*] ID {} identified as folder: {name}", self.id);

        let archive = api.create_archive(&self.id)?;
        let Some(url) = archive.archive_url.filter(|_| archive.result) else {
            return Ok(false);
        };
        let file_name = format!("{}.zip", sanitize_filename(&name));
        print_link("Folder (Archive)", &format!("{name}.zip"), &url, &file_name);
        Ok(true)
    }
}

fn print_link(kind: &str, name: &str, url: &str, file_name: &str) {
    println!();
    println!("{} {kind}", "Type:".green().bold());
    println!("{} {name}", "Name:".green().bold());
    println!("{}  {url}", "URL:".green().bold());
    println!();
    println!("To download:");
    println!("wget '{url}' -O '{file_name}'");
}

#[derive(Args)]
pub struct DeleteArgs {
    /// A type keyword (file, folder, torrent) followed by the ID, or the ID itself
    pub identifier: String,

    /// The ID when the first argument is a type, otherwise an optional type
    pub id_if_type: Option<String>,
}

fn delete(api: &ApiClient, request: &DeleteRequest) -> Result<()> {
    let mut input = io::stdin().lock();
    let mut out = io::stdout().lock();

    match run_delete(api, request, &mut input, &mut out)? {
        DeleteOutcome::Deleted { kind, id, probed } => {
            let msg = if probed {
                format!("Successfully deleted as {kind} {id}")
            } else {
                format!("Successfully deleted {kind} {id}")
            };
            writeln!(out, "{}", msg.green().bold())?;
        }
        DeleteOutcome::Aborted => writeln!(out, "[*] Aborted.")?,
    }
    Ok(())
}

#[derive(Args)]
pub struct AddArgs {
    /// Magnet link, torrent URL, or path to a .torrent file
    pub torrent: String,
}

impl AddArgs {
    fn run(&self, api: &ApiClient) -> Result<()> {
        println!("[*] Target: {}", self.torrent);
        let path = Path::new(&self.torrent);
        let result = if path.is_file() {
            api.add_torrent_file(path)?
        } else {
            api.add_torrent(&self.torrent)?
        };

        println!();
        match result.title {
            Some(title) => println!("{} {title}", "Successfully added torrent:".green().bold()),
            None => println!("{}", "Successfully added torrent".green().bold()),
        }
        Ok(())
    }
}
