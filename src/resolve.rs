// Deleting by bare id.
//
// A delete command names either `<type> <id>` or `<id> [type]`. The id may
// belong to a folder, a file or a torrent, and ids are only unique within
// one kind, so the flow is: parse the arguments, look the id up in the
// account root for a display name and a likely kind, ask for
// confirmation, then delete with the declared kind or probe the kinds in
// a fixed order.

use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::Result;
use log::debug;

use crate::api::Remote;
use crate::error::DeleteError;

/// Kind of a remote node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Folder,
    File,
    Torrent,
}

impl ItemKind {
    /// Order in which unknown ids are probed.
    pub const PROBE_ORDER: [ItemKind; 3] = [ItemKind::Folder, ItemKind::File, ItemKind::Torrent];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Folder => "folder",
            ItemKind::File => "file",
            ItemKind::Torrent => "torrent",
        }
    }

    /// The delete operation for this kind.
    pub fn operation<R: Remote + ?Sized>(self) -> fn(&R, &str) -> Result<()> {
        match self {
            ItemKind::Folder => R::delete_folder,
            ItemKind::File => R::delete_file,
            ItemKind::Torrent => R::delete_torrent,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "folder" => Ok(ItemKind::Folder),
            "file" => Ok(ItemKind::File),
            "torrent" => Ok(ItemKind::Torrent),
            _ => Err(()),
        }
    }
}

/// Parsed arguments of one delete command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub target_id: String,
    pub declared: Option<ItemKind>,
    /// The type keyword came first (`delete folder 42`). Only this form
    /// disables probing when the delete fails.
    pub keyword_first: bool,
}

impl DeleteRequest {
    /// Interpret `delete <identifier> [id_if_type]`. An empty second
    /// argument counts as absent; a second argument that is not a type
    /// keyword is ignored.
    pub fn parse(identifier: &str, id_if_type: Option<&str>) -> Result<Self, DeleteError> {
        let second = id_if_type.filter(|s| !s.is_empty());

        if let Ok(kind) = identifier.parse::<ItemKind>() {
            let target_id = second.ok_or(DeleteError::MissingId { kind })?;
            return Ok(DeleteRequest {
                target_id: target_id.to_string(),
                declared: Some(kind),
                keyword_first: true,
            });
        }

        Ok(DeleteRequest {
            target_id: identifier.to_string(),
            declared: second.and_then(|s| s.parse().ok()),
            keyword_first: false,
        })
    }
}

/// What a lookup in the account root found for an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub kind: Option<ItemKind>,
    pub name: Option<String>,
}

/// Scan the root folders, files and torrents (in that order) for `id`.
/// A failed listing yields an empty resolution.
pub fn find_item<R: Remote + ?Sized>(remote: &R, id: &str) -> Resolution {
    match lookup(remote, id) {
        Ok(found) => found,
        Err(err) => {
            debug!("Lookup of {id} failed, continuing without a name: {err:#}");
            Resolution::default()
        }
    }
}

fn lookup<R: Remote + ?Sized>(remote: &R, id: &str) -> Result<Resolution> {
    let contents = remote.list_root()?;
    let found = contents
        .nodes()
        .into_iter()
        .find(|node| node.id().matches(id))
        .map(|node| Resolution {
            kind: Some(node.kind()),
            name: Some(node.name().to_string()),
        });
    Ok(found.unwrap_or_default())
}

/// Ask before deleting. Only a `y` answer (any case, surrounding
/// whitespace ignored) confirms; end of input declines.
pub fn confirm<I, O>(
    input: &mut I,
    out: &mut O,
    kind: Option<ItemKind>,
    name: Option<&str>,
    id: &str,
) -> std::io::Result<bool>
where
    I: BufRead,
    O: Write,
{
    let display_type = kind.map_or("item", ItemKind::as_str);
    let display_name = name.map(|n| format!(" '{n}'")).unwrap_or_default();

    writeln!(out, "[*] Deleting {display_type}{display_name} (ID: {id})")?;
    write!(out, "[?] Are you sure you want to delete this {display_type}? [y/N] ")?;
    out.flush()?;

    // Raw bytes: an answer that is not UTF-8 is a decline, not an error.
    let mut answer = Vec::new();
    input.read_until(b'\n', &mut answer)?;
    Ok(String::from_utf8_lossy(&answer).trim().to_lowercase() == "y")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// `probed` is set when the kind was found by probing rather than by
    /// the single declared or observed attempt.
    Deleted {
        kind: ItemKind,
        id: String,
        probed: bool,
    },
    Aborted,
}

/// Delete `request.target_id`. The first attempt uses the declared kind,
/// else the `observed` one from a lookup.
///
/// A keyword-first request gets exactly one attempt and its error is
/// returned. Otherwise a failed or missing kind falls back to probing
/// `PROBE_ORDER`, skipping the kind already tried, until one delete
/// succeeds.
pub fn dispatch<R: Remote + ?Sized>(
    remote: &R,
    request: &DeleteRequest,
    observed: Option<ItemKind>,
) -> Result<DeleteOutcome, DeleteError> {
    let id = request.target_id.as_str();
    let kind = request.declared.or(observed);

    if let Some(kind) = kind {
        match kind.operation::<R>()(remote, id) {
            Ok(()) => {
                return Ok(DeleteOutcome::Deleted {
                    kind,
                    id: id.to_string(),
                    probed: false,
                })
            }
            Err(error) if request.keyword_first => {
                return Err(DeleteError::Declared {
                    kind,
                    id: id.to_string(),
                    error,
                })
            }
            Err(err) => debug!("Deleting {id} as {kind} failed, probing: {err:#}"),
        }
    }

    ItemKind::PROBE_ORDER
        .into_iter()
        .filter(|probe| Some(*probe) != kind)
        .find(|probe| probe.operation::<R>()(remote, id).is_ok())
        .map(|kind| DeleteOutcome::Deleted {
            kind,
            id: id.to_string(),
            probed: true,
        })
        .ok_or_else(|| DeleteError::Exhausted { id: id.to_string() })
}

/// The whole delete command: lookup, confirmation, dispatch.
pub fn run_delete<R, I, O>(
    remote: &R,
    request: &DeleteRequest,
    input: &mut I,
    out: &mut O,
) -> Result<DeleteOutcome, DeleteError>
where
    R: Remote + ?Sized,
    I: BufRead,
    O: Write,
{
    let found = find_item(remote, &request.target_id);
    let kind = request.declared.or(found.kind);

    if !confirm(input, out, kind, found.name.as_deref(), &request.target_id)? {
        return Ok(DeleteOutcome::Aborted);
    }

    dispatch(remote, request, found.kind)
}
