use std::cell::RefCell;
use std::io::Cursor;

use anyhow::{bail, Result};
use seedr_cli::api::Remote;
use seedr_cli::error::DeleteError;
use seedr_cli::models::{Folder, ListContents, RemoteId};
use seedr_cli::resolve::{dispatch, run_delete, DeleteOutcome, DeleteRequest, ItemKind};

/// Account where only some delete calls work. Every call is recorded.
struct Account {
    root: ListContents,
    deletable: Vec<ItemKind>,
    calls: RefCell<Vec<String>>,
}

impl Account {
    fn new(deletable: &[ItemKind]) -> Self {
        Account {
            root: ListContents::default(),
            deletable: deletable.to_vec(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn try_delete(&self, kind: ItemKind, id: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("{kind}:{id}"));
        if !self.deletable.contains(&kind) {
            bail!("no {kind} with id {id}");
        }
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Remote for Account {
    fn list_root(&self) -> Result<ListContents> {
        Ok(self.root.clone())
    }

    fn delete_folder(&self, id: &str) -> Result<()> {
        self.try_delete(ItemKind::Folder, id)
    }

    fn delete_file(&self, id: &str) -> Result<()> {
        self.try_delete(ItemKind::File, id)
    }

    fn delete_torrent(&self, id: &str) -> Result<()> {
        self.try_delete(ItemKind::Torrent, id)
    }
}

fn delete(account: &Account, identifier: &str, id_if_type: Option<&str>, answer: &str) -> Result<DeleteOutcome, DeleteError> {
    let request = DeleteRequest::parse(identifier, id_if_type)?;
    let mut input = Cursor::new(answer.as_bytes().to_vec());
    let mut out = Vec::new();
    run_delete(account, &request, &mut input, &mut out)
}

#[test]
fn probe_never_reaches_torrent_after_file_succeeds() {
    let account = Account::new(&[ItemKind::File, ItemKind::Torrent]);
    let outcome = delete(&account, "31337", None, "y\n").unwrap();
    assert!(matches!(outcome, DeleteOutcome::Deleted { kind: ItemKind::File, probed: true, .. }));
    assert_eq!(account.calls(), vec!["folder:31337", "file:31337"]);
}

#[test]
fn keyword_without_id_fails_before_any_call() {
    let account = Account::new(&ItemKind::PROBE_ORDER);
    let err = delete(&account, "torrent", None, "y\n").unwrap_err();
    assert!(matches!(err, DeleteError::MissingId { kind: ItemKind::Torrent }));
    assert!(account.calls().is_empty());
}

#[test]
fn abort_makes_no_delete_call() {
    let account = Account::new(&ItemKind::PROBE_ORDER);
    let outcome = delete(&account, "torrent", Some("abc123"), "n\n").unwrap();
    assert_eq!(outcome, DeleteOutcome::Aborted);
    assert!(account.calls().is_empty());
}

#[test]
fn invalid_type_token_behaves_like_no_token() {
    let with_token = Account::new(&[ItemKind::Torrent]);
    let without = Account::new(&[ItemKind::Torrent]);
    let a = delete(&with_token, "8", Some("magnet"), "y\n").unwrap();
    let b = delete(&without, "8", None, "y\n").unwrap();
    assert_eq!(a, b);
    assert_eq!(with_token.calls(), without.calls());
}

#[test]
fn observed_folder_is_deleted_directly() {
    let mut account = Account::new(&[ItemKind::Folder]);
    account.root.folders.push(Folder {
        id: RemoteId::new("4242"),
        name: "Linux ISOs".into(),
        size: 1 << 30,
    });
    let outcome = delete(&account, "4242", None, "y\n").unwrap();
    assert_eq!(
        outcome,
        DeleteOutcome::Deleted {
            kind: ItemKind::Folder,
            id: "4242".into(),
            probed: false
        }
    );
    assert_eq!(account.calls(), vec!["folder:4242"]);
}

#[test]
fn dispatch_without_kind_tries_every_kind_once() {
    let account = Account::new(&[]);
    let request = DeleteRequest::parse("1", None).unwrap();
    let err = dispatch(&account, &request, None).unwrap_err();
    assert!(matches!(err, DeleteError::Exhausted { .. }));
    assert_eq!(account.calls(), vec!["folder:1", "file:1", "torrent:1"]);
}
