// ============================
// codecollab-backend/src/room.rs
// ============================
//! One collaborative session: file tree, participants, active language and
//! selection.
//!
//! Every mutating operation returns a result type that knows its own fan-out
//! policy ([`IntoBroadcast`]), so the gateway never decides who hears what.
use crate::tree::{self, PathTree, TreeError};
use codecollab_common::{
    ConnectionId, FileTree, LanguageId, RoomId, ServerToClient, TreeNode,
};
use thiserror::Error;
use tracing::debug;

/// Errors raised by room operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl RoomError {
    /// Code sent to the originator in an `error` reply
    pub fn error_code(&self) -> &'static str {
        match self {
            RoomError::Tree(TreeError::EmptyPath) => "EMPTY_PATH",
            RoomError::Tree(TreeError::NotFound(_)) => "NOT_FOUND",
            RoomError::InvalidOperation(_) | RoomError::Tree(TreeError::NotAFolder(_)) => {
                "INVALID_OPERATION"
            },
        }
    }
}

/// Which participants of a room receive a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    /// Every participant, originator included
    All,
    /// Every participant except the given one
    AllExcept(ConnectionId),
}

impl FanOut {
    /// Resolve the policy against a participant list, keeping join order
    pub fn recipients(&self, participants: &[ConnectionId]) -> Vec<ConnectionId> {
        match self {
            FanOut::All => participants.to_vec(),
            FanOut::AllExcept(origin) => participants
                .iter()
                .filter(|id| *id != origin)
                .copied()
                .collect(),
        }
    }
}

/// An event together with the policy deciding its audience
#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    pub fan_out: FanOut,
    pub event: ServerToClient,
}

/// Turns an operation result into the broadcast it causes
pub trait IntoBroadcast {
    fn into_broadcast(self, room_id: &RoomId, origin: ConnectionId) -> Broadcast;
}

/// Default state for freshly created rooms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSeed {
    pub tree: PathTree,
    pub language: LanguageId,
    pub selected_file: Option<String>,
}

impl Default for RoomSeed {
    fn default() -> Self {
        let mut styles = FileTree::new();
        styles.insert(
            "main.css".to_string(),
            TreeNode::File("body {\n  font-family: sans-serif;\n}".to_string()),
        );

        let mut files = FileTree::new();
        files.insert(
            "main.js".to_string(),
            TreeNode::File(
                "// Welcome to CodeCollab!\n// Start coding here...\nconsole.log(\"Hello, World!\");"
                    .to_string(),
            ),
        );
        files.insert(
            "index.html".to_string(),
            TreeNode::File(
                "<!DOCTYPE html>\n<html>\n<head>\n  <title>My Project</title>\n</head>\n<body>\n  <h1>Hello, World!</h1>\n</body>\n</html>"
                    .to_string(),
            ),
        );
        files.insert("styles".to_string(), TreeNode::Folder(styles));

        Self {
            tree: PathTree::from_files(files),
            language: "javascript".to_string(),
            selected_file: Some("main.js".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Joined,
    Left,
}

/// Participant list after a join or leave
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub change: MembershipChange,
    pub participants: Vec<ConnectionId>,
}

impl IntoBroadcast for Membership {
    fn into_broadcast(self, room_id: &RoomId, _origin: ConnectionId) -> Broadcast {
        let room_id = room_id.clone();
        let event = match self.change {
            MembershipChange::Joined => ServerToClient::UserJoined {
                room_id,
                users: self.participants,
            },
            MembershipChange::Left => ServerToClient::UserLeft {
                room_id,
                users: self.participants,
            },
        };
        Broadcast {
            fan_out: FanOut::All,
            event,
        }
    }
}

/// What a `leave` did to the room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Participants remain; tell them
    Remaining(Membership),
    /// Last participant left; the registry must drop the room
    Closed,
    /// The connection was not in this room
    NotMember,
}

/// Accepted content change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUpdate {
    pub content: String,
    pub language: LanguageId,
    pub path: Option<String>,
}

impl IntoBroadcast for ContentUpdate {
    fn into_broadcast(self, room_id: &RoomId, _origin: ConnectionId) -> Broadcast {
        Broadcast {
            fan_out: FanOut::All,
            event: ServerToClient::CodeUpdate {
                room_id: room_id.clone(),
                code: self.content,
                language_id: self.language,
                file_path: self.path,
            },
        }
    }
}

/// New active language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageChanged(pub LanguageId);

impl IntoBroadcast for LanguageChanged {
    fn into_broadcast(self, room_id: &RoomId, origin: ConnectionId) -> Broadcast {
        Broadcast {
            fan_out: FanOut::AllExcept(origin),
            event: ServerToClient::LanguageChange {
                room_id: room_id.clone(),
                language_id: self.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeChangeKind {
    FileCreated,
    FolderCreated,
    FileDeleted,
    FolderDeleted,
}

/// Structural change plus the full resulting tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    pub kind: TreeChangeKind,
    pub path: String,
    pub tree: FileTree,
}

impl IntoBroadcast for TreeChange {
    fn into_broadcast(self, room_id: &RoomId, _origin: ConnectionId) -> Broadcast {
        let room_id = room_id.clone();
        let files = self.tree;
        let event = match self.kind {
            TreeChangeKind::FileCreated => ServerToClient::FileCreated {
                room_id,
                file_path: self.path,
                files,
            },
            TreeChangeKind::FolderCreated => ServerToClient::FolderCreated {
                room_id,
                folder_path: self.path,
                files,
            },
            TreeChangeKind::FileDeleted => ServerToClient::FileDeleted {
                room_id,
                file_path: self.path,
                files,
            },
            TreeChangeKind::FolderDeleted => ServerToClient::FolderDeleted {
                room_id,
                folder_path: self.path,
                files,
            },
        };
        Broadcast {
            fan_out: FanOut::All,
            event,
        }
    }
}

/// A participant's selection and the content found there
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub path: String,
    pub content: Option<String>,
}

impl IntoBroadcast for Selection {
    fn into_broadcast(self, room_id: &RoomId, origin: ConnectionId) -> Broadcast {
        Broadcast {
            fan_out: FanOut::AllExcept(origin),
            event: ServerToClient::FileSelected {
                room_id: room_id.clone(),
                file_path: self.path,
                file_content: self.content,
            },
        }
    }
}

/// Cursor hint relayed without touching room state
#[derive(Debug, Clone, PartialEq)]
pub struct CursorHint {
    pub position: serde_json::Value,
    pub participant_id: String,
}

impl IntoBroadcast for CursorHint {
    fn into_broadcast(self, room_id: &RoomId, origin: ConnectionId) -> Broadcast {
        Broadcast {
            fan_out: FanOut::AllExcept(origin),
            event: ServerToClient::CursorUpdate {
                room_id: room_id.clone(),
                position: self.position,
                user_id: self.participant_id,
            },
        }
    }
}

/// State handed to a joining participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub legacy_code: String,
    pub language: LanguageId,
    pub files: FileTree,
    pub selected_file: Option<String>,
}

impl RoomSnapshot {
    pub fn into_message(self, room_id: &RoomId) -> ServerToClient {
        ServerToClient::InitialData {
            room_id: room_id.clone(),
            code: self.legacy_code,
            language_id: self.language,
            files: self.files,
            current_file: self.selected_file,
        }
    }
}

/// A live room. Exists only while it has at least one participant.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    tree: PathTree,
    participants: Vec<ConnectionId>,
    language: LanguageId,
    selected_file: Option<String>,
    legacy_code: String,
}

impl Room {
    /// Create a room from the seed; it has no participants until `join`
    pub fn new(id: RoomId, seed: &RoomSeed) -> Self {
        let mut room = Self {
            id,
            tree: seed.tree.clone(),
            participants: Vec::new(),
            language: seed.language.clone(),
            selected_file: seed.selected_file.as_deref().map(tree::normalize),
            legacy_code: String::new(),
        };
        room.reconcile_selection();
        room
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn tree(&self) -> &PathTree {
        &self.tree
    }

    /// Participants in join order
    pub fn participants(&self) -> &[ConnectionId] {
        &self.participants
    }

    pub fn has_participant(&self, connection: &ConnectionId) -> bool {
        self.participants.contains(connection)
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.selected_file.as_deref()
    }

    pub fn legacy_code(&self) -> &str {
        &self.legacy_code
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            legacy_code: self.legacy_code.clone(),
            language: self.language.clone(),
            files: self.tree.snapshot(),
            selected_file: self.selected_file.clone(),
        }
    }

    /// Add a participant. Re-joining is a no-op on the list.
    pub fn join(&mut self, connection: ConnectionId) -> Membership {
        if !self.has_participant(&connection) {
            self.participants.push(connection);
        }
        Membership {
            change: MembershipChange::Joined,
            participants: self.participants.clone(),
        }
    }

    pub fn leave(&mut self, connection: &ConnectionId) -> LeaveOutcome {
        let before = self.participants.len();
        self.participants.retain(|id| id != connection);

        if self.participants.len() == before {
            LeaveOutcome::NotMember
        } else if self.participants.is_empty() {
            LeaveOutcome::Closed
        } else {
            LeaveOutcome::Remaining(Membership {
                change: MembershipChange::Left,
                participants: self.participants.clone(),
            })
        }
    }

    /// Replace file content, or the legacy buffer when `path` is `None` or
    /// names no segment (clients with no file open send `""`).
    ///
    /// Only existing files can be written here; new files go through
    /// `create_file`. A rejected update changes nothing, language included.
    pub fn update_file(
        &mut self,
        path: Option<&str>,
        content: String,
        language: Option<LanguageId>,
    ) -> Result<ContentUpdate, RoomError> {
        let path = path.filter(|raw| tree::segments(raw).next().is_some());
        let path = match path {
            Some(raw) => {
                let normalized = tree::normalize(raw);
                if !self.tree.is_file(&normalized) {
                    return Err(RoomError::InvalidOperation(format!(
                        "no file at '{normalized}'"
                    )));
                }
                self.tree
                    .set(&normalized, TreeNode::File(content.clone()))?;
                Some(normalized)
            },
            None => {
                self.legacy_code.clone_from(&content);
                None
            },
        };

        if let Some(language) = language {
            self.language = language;
        }

        Ok(ContentUpdate {
            content,
            language: self.language.clone(),
            path,
        })
    }

    pub fn change_language(&mut self, language: LanguageId) -> LanguageChanged {
        self.language.clone_from(&language);
        LanguageChanged(language)
    }

    /// Write a file, overwriting whatever is at `path`
    pub fn create_file(
        &mut self,
        path: &str,
        content: Option<String>,
    ) -> Result<TreeChange, RoomError> {
        self.tree
            .set(path, TreeNode::File(content.unwrap_or_default()))?;
        Ok(self.tree_change(TreeChangeKind::FileCreated, path))
    }

    /// Write an empty folder, overwriting whatever is at `path`
    pub fn create_folder(&mut self, path: &str) -> Result<TreeChange, RoomError> {
        self.tree.set(path, TreeNode::empty_folder())?;
        Ok(self.tree_change(TreeChangeKind::FolderCreated, path))
    }

    /// Delete a file. Deleting a missing path broadcasts the unchanged tree.
    pub fn delete_file(&mut self, path: &str) -> TreeChange {
        if !self.tree.delete(path) {
            debug!(room = %self.id, path, "delete_file: nothing at path");
        }
        self.tree_change(TreeChangeKind::FileDeleted, path)
    }

    /// Delete a folder and clear the selection if it was beneath it
    pub fn delete_folder(&mut self, path: &str) -> TreeChange {
        if !self.tree.delete(path) {
            debug!(room = %self.id, path, "delete_folder: nothing at path");
        }
        if self
            .selected_file
            .as_deref()
            .is_some_and(|selected| tree::is_descendant(selected, path))
        {
            self.selected_file = None;
        }
        self.tree_change(TreeChangeKind::FolderDeleted, path)
    }

    /// Select a file and report its current content.
    ///
    /// A path that is not a file reports `None` content and keeps the previous
    /// selection, so the selection always points at a file.
    pub fn select_file(&mut self, connection: &ConnectionId, path: &str) -> Selection {
        let path = tree::normalize(path);
        let content = self.tree.read_file(&path).ok().map(str::to_string);

        if content.is_some() {
            self.selected_file = Some(path.clone());
        } else {
            debug!(room = %self.id, %connection, path, "select_file: no file at path");
        }

        Selection { path, content }
    }

    fn tree_change(&mut self, kind: TreeChangeKind, path: &str) -> TreeChange {
        self.reconcile_selection();
        TreeChange {
            kind,
            path: tree::normalize(path),
            tree: self.tree.snapshot(),
        }
    }

    /// Clear the selection when it no longer resolves to a file
    fn reconcile_selection(&mut self) {
        if let Some(selected) = &self.selected_file {
            if !self.tree.is_file(selected) {
                debug!(room = %self.id, selected, "clearing stale selection");
                self.selected_file = None;
            }
        }
    }
}
