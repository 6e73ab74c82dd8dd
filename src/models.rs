// Wire types returned by the Seedr API. Only the fields the client reads
// are declared; serde ignores the rest of each payload.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::resolve::ItemKind;

/// Identifier of a remote node. The API returns ids as JSON integers in
/// some payloads and as strings in others, so we keep the string form and
/// compare on that.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        RemoteId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// String equality against a user supplied id.
    pub fn matches(&self, id: &str) -> bool {
        self.0 == id
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RemoteId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => RemoteId(n.to_string()),
            Raw::Text(s) => RemoteId(s),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Folder {
    pub id: RemoteId,
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct File {
    pub folder_file_id: RemoteId,
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Torrent {
    pub id: RemoteId,
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// Any entry of the storage tree.
#[derive(Debug, Clone)]
pub enum RemoteNode {
    Folder(Folder),
    File(File),
    Torrent(Torrent),
}

impl RemoteNode {
    pub fn kind(&self) -> ItemKind {
        match self {
            RemoteNode::Folder(_) => ItemKind::Folder,
            RemoteNode::File(_) => ItemKind::File,
            RemoteNode::Torrent(_) => ItemKind::Torrent,
        }
    }

    /// The identifier used to address this node. Files use
    /// `folder_file_id`, everything else `id`.
    pub fn id(&self) -> &RemoteId {
        match self {
            RemoteNode::Folder(f) => &f.id,
            RemoteNode::File(f) => &f.folder_file_id,
            RemoteNode::Torrent(t) => &t.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RemoteNode::Folder(f) => &f.name,
            RemoteNode::File(f) => &f.name,
            RemoteNode::Torrent(t) => &t.name,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            RemoteNode::Folder(f) => f.size,
            RemoteNode::File(f) => f.size,
            RemoteNode::Torrent(t) => t.size,
        }
    }
}

/// Result of `list_contents` for one folder (or the account root).
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ListContents {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub files: Vec<File>,
    #[serde(default)]
    pub torrents: Vec<Torrent>,
}

impl ListContents {
    /// Children in display order: folders, then files, then torrents.
    pub fn nodes(&self) -> Vec<RemoteNode> {
        let mut nodes = Vec::with_capacity(self.folders.len() + self.files.len() + self.torrents.len());
        nodes.extend(self.folders.iter().cloned().map(RemoteNode::Folder));
        nodes.extend(self.files.iter().cloned().map(RemoteNode::File));
        nodes.extend(self.torrents.iter().cloned().map(RemoteNode::Torrent));
        nodes
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MemoryBandwidth {
    #[serde(default)]
    pub space_used: u64,
    #[serde(default)]
    pub space_max: u64,
    #[serde(default)]
    pub bandwidth_used: u64,
    #[serde(default)]
    pub bandwidth_max: u64,
}

/// Response of the device-code endpoint, shown to the user during login.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub interval: u64,
}

/// OAuth token as persisted on disk. Tokens obtained through the device
/// flow keep their device code so they can be re-authorized later.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_code: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FetchFileResult {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ArchiveResult {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub archive_id: Option<RemoteId>,
    #[serde(default)]
    pub archive_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AddTorrentResult {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub user_torrent_id: Option<RemoteId>,
    #[serde(default)]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_id_accepts_numbers_and_strings() {
        let ids: Vec<RemoteId> = serde_json::from_str(r#"[123, "abc", "456"]"#).unwrap();
        assert!(ids[0].matches("123"));
        assert!(ids[1].matches("abc"));
        assert!(ids[2].matches("456"));
        assert!(!ids[0].matches("0123"));
    }

    #[test]
    fn list_contents_keeps_node_order() {
        let raw = r#"{
            "name": "",
            "space_max": 2147483648,
            "folders": [{"id": 11, "name": "Movies", "size": 1024, "last_update": "2024-01-01"}],
            "files": [{"folder_file_id": 22, "name": "readme.txt", "size": 12, "hash": "x"}],
            "torrents": [{"id": 33, "name": "ubuntu.iso", "size": 0, "progress": "45"}]
        }"#;
        let contents: ListContents = serde_json::from_str(raw).unwrap();
        let nodes = contents.nodes();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].kind(), ItemKind::Folder);
        assert_eq!(nodes[1].kind(), ItemKind::File);
        assert_eq!(nodes[1].id().as_str(), "22");
        assert_eq!(nodes[2].name(), "ubuntu.iso");
    }

    #[test]
    fn token_skips_missing_optionals() {
        let token = Token {
            access_token: "abc".into(),
            refresh_token: None,
            device_code: Some("dev".into()),
        };
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, r#"{"access_token":"abc","device_code":"dev"}"#);
    }
}
