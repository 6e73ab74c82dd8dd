// UI layer: an interactive browser built on `dialoguer` menus.
// Each loop iteration re-lists the current folder, so the screen always
// reflects the remote state after a change.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use crate::api::ApiClient;
use crate::format::format_size;
use crate::models::RemoteNode;
use crate::resolve::{dispatch, DeleteRequest};

/// One row of the main menu.
enum Entry {
    Node(RemoteNode),
    Up,
    Add,
    Refresh,
    Quit,
}

impl Entry {
    fn label(&self) -> String {
        match self {
            Entry::Node(node) => {
                let icon = match node {
                    RemoteNode::Folder(_) => "📁",
                    RemoteNode::File(_) => "📄",
                    RemoteNode::Torrent(_) => "🧲",
                };
                format!(
                    "{icon} {:<40} {:>12}  ID: {}",
                    node.name(),
                    format_size(node.size()),
                    node.id()
                )
            }
            Entry::Up => "..".into(),
            Entry::Add => "+ Add torrent".into(),
            Entry::Refresh => "↻ Refresh".into(),
            Entry::Quit => "Quit".into(),
        }
    }
}

enum Action {
    Open,
    Fetch,
    Delete,
    Back,
}

/// Main interactive loop. Blocks until the user quits or presses Esc.
pub fn main_menu(api: &ApiClient) -> Result<()> {
    // Folders entered so far, as (id, name).
    let mut path: Vec<(String, String)> = Vec::new();
    let mut notice: Option<String> = None;

    loop {
        execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
        match api.get_memory_bandwidth() {
            Ok(usage) => println!(
                "{}",
                format!(
                    "Storage: {} / {}",
                    format_size(usage.space_used),
                    format_size(usage.space_max)
                )
                .bold()
            ),
            Err(err) => debug!("Storage usage unavailable: {err:#}"),
        }
        if let Some(msg) = notice.take() {
            println!("{msg}");
        }

        let folder_id = path.last().map(|(id, _)| id.as_str());
        let mut entries: Vec<Entry> = match with_spinner("Loading...", || api.list_contents(folder_id)) {
            Ok(contents) => contents.nodes().into_iter().map(Entry::Node).collect(),
            Err(err) => {
                println!("{}", format!("Error: {err:#}").red());
                Vec::new()
            }
        };
        if !path.is_empty() {
            entries.push(Entry::Up);
        }
        entries.extend([Entry::Add, Entry::Refresh, Entry::Quit]);

        let location = std::iter::once("/")
            .chain(path.iter().map(|(_, name)| name.as_str()))
            .collect::<Vec<_>>()
            .join("/");
        let labels: Vec<String> = entries.iter().map(Entry::label).collect();
        let Some(selection) = Select::new()
            .with_prompt(location)
            .items(&labels)
            .default(0)
            .interact_opt()?
        else {
            break;
        };

        match &entries[selection] {
            Entry::Node(node) => match choose_action(node)? {
                Action::Open => {
                    path.push((node.id().to_string(), node.name().to_string()));
                }
                Action::Fetch => notice = Some(fetch_link(api, node)),
                Action::Delete => notice = delete_node(api, node)?,
                Action::Back => {}
            },
            Entry::Up => {
                path.pop();
            }
            Entry::Add => notice = add_torrent(api)?,
            Entry::Refresh => {}
            Entry::Quit => break,
        }
    }
    Ok(())
}

fn choose_action(node: &RemoteNode) -> Result<Action> {
    let mut actions = Vec::new();
    if matches!(node, RemoteNode::Folder(_)) {
        actions.push((Action::Open, "Open"));
    }
    actions.push((Action::Fetch, "Fetch link"));
    actions.push((Action::Delete, "Delete"));
    actions.push((Action::Back, "Back"));

    let labels: Vec<&str> = actions.iter().map(|(_, label)| *label).collect();
    let selection = Select::new()
        .with_prompt(node.name())
        .items(&labels)
        .default(0)
        .interact_opt()?;
    Ok(match selection {
        Some(idx) => actions.swap_remove(idx).0,
        None => Action::Back,
    })
}

fn fetch_link(api: &ApiClient, node: &RemoteNode) -> String {
    let id = node.id().as_str();
    let link = match node {
        RemoteNode::File(_) => with_spinner("Fetching link...", || api.fetch_file(id))
            .map(|r| r.url.map(|url| format!("Link: {url}"))),
        RemoteNode::Folder(_) => with_spinner("Creating archive...", || api.create_archive(id))
            .map(|r| r.archive_url.map(|url| format!("Archive Link: {url}"))),
        RemoteNode::Torrent(_) => {
            return "Cannot fetch link for this item type".yellow().to_string();
        }
    };
    match link {
        Ok(Some(msg)) => msg.green().to_string(),
        Ok(None) => "No link returned".yellow().to_string(),
        Err(err) => format!("Error fetching: {err:#}").red().to_string(),
    }
}

/// Delete the selected node by its own kind. The kind is known here, so
/// there is no probing on failure.
fn delete_node(api: &ApiClient, node: &RemoteNode) -> Result<Option<String>> {
    let kind = node.kind();
    let confirmed = Confirm::new()
        .with_prompt(format!("Delete {kind} '{}' (ID: {})?", node.name(), node.id()))
        .default(false)
        .interact()?;
    if !confirmed {
        return Ok(Some("Aborted.".into()));
    }

    let request = DeleteRequest {
        target_id: node.id().to_string(),
        declared: Some(kind),
        keyword_first: true,
    };
    let msg = match with_spinner("Deleting...", || Ok(dispatch(api, &request, None)))? {
        Ok(_) => format!("Deleted: {}", node.name()).green().to_string(),
        Err(err) => format!("Error deleting: {err}").red().to_string(),
    };
    Ok(Some(msg))
}

fn add_torrent(api: &ApiClient) -> Result<Option<String>> {
    let target: String = Input::new()
        .with_prompt("Magnet link or torrent URL (empty to cancel)")
        .allow_empty(true)
        .interact_text()?;
    let target = target.trim();
    if target.is_empty() {
        return Ok(None);
    }

    let msg = match with_spinner("Adding torrent...", || api.add_torrent(target)) {
        Ok(_) => "Torrent added successfully".green().to_string(),
        Err(err) => format!("Error adding torrent: {err:#}").red().to_string(),
    };
    Ok(Some(msg))
}

/// Show a spinner while `f` runs.
fn with_spinner<T>(msg: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = f();
    spinner.finish_and_clear();
    result
}
