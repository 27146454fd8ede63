// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between `CodeCollab` clients and the server.
//! This module defines the WebSocket protocol messages and supporting types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Opaque identifier of one live participant channel
pub type ConnectionId = Uuid;

/// Caller-supplied room key
pub type RoomId = String;

/// Language tag such as `javascript` or `python`
pub type LanguageId = String;

/// Children of a folder, keyed by segment name
pub type FileTree = BTreeMap<String, TreeNode>;

/// One node of the shared file tree.
///
/// Serialized untagged: a file is a JSON string, a folder a JSON object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum TreeNode {
    /// Text file content
    File(String),
    /// Named children
    Folder(FileTree),
}

impl TreeNode {
    /// An empty folder
    pub fn empty_folder() -> Self {
        TreeNode::Folder(FileTree::new())
    }

    pub fn is_file(&self) -> bool {
        matches!(self, TreeNode::File(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, TreeNode::Folder(_))
    }

    /// File content, `None` for folders
    pub fn as_file(&self) -> Option<&str> {
        match self {
            TreeNode::File(content) => Some(content),
            TreeNode::Folder(_) => None,
        }
    }
}

/// Messages sent from client to server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "msgType", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientToServer {
    /// Join a room, creating it on first join
    JoinRoom { room_id: RoomId },
    /// Replace the content of a file, or of the legacy buffer when no path is given
    /// # Fields
    /// * `code` - New whole-file content
    /// * `language_id` - Optional new active language
    /// * `file_path` - Target file; `None` addresses the legacy buffer
    CodeChange {
        room_id: RoomId,
        code: String,
        language_id: Option<LanguageId>,
        file_path: Option<String>,
    },
    /// Change the room's active language
    LanguageChange {
        room_id: RoomId,
        language_id: LanguageId,
    },
    /// Create (or overwrite) a file
    CreateFile {
        room_id: RoomId,
        file_path: String,
        content: Option<String>,
    },
    /// Create (or overwrite) a folder
    CreateFolder {
        room_id: RoomId,
        folder_path: String,
    },
    /// Delete a file
    DeleteFile { room_id: RoomId, file_path: String },
    /// Delete a folder and everything beneath it
    DeleteFolder {
        room_id: RoomId,
        folder_path: String,
    },
    /// Point the room's selection at a file
    SelectFile { room_id: RoomId, file_path: String },
    /// Cursor hint relayed to the other participants; never touches room state
    CursorPosition {
        room_id: RoomId,
        #[serde(default)]
        position: serde_json::Value,
        user_id: String,
    },
}

impl ClientToServer {
    /// Room addressed by this message
    pub fn room_id(&self) -> &str {
        match self {
            ClientToServer::JoinRoom { room_id }
            | ClientToServer::CodeChange { room_id, .. }
            | ClientToServer::LanguageChange { room_id, .. }
            | ClientToServer::CreateFile { room_id, .. }
            | ClientToServer::CreateFolder { room_id, .. }
            | ClientToServer::DeleteFile { room_id, .. }
            | ClientToServer::DeleteFolder { room_id, .. }
            | ClientToServer::SelectFile { room_id, .. }
            | ClientToServer::CursorPosition { room_id, .. } => room_id,
        }
    }

    /// Wire name of the message, used for logging and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            ClientToServer::JoinRoom { .. } => "join_room",
            ClientToServer::CodeChange { .. } => "code_change",
            ClientToServer::LanguageChange { .. } => "language_change",
            ClientToServer::CreateFile { .. } => "create_file",
            ClientToServer::CreateFolder { .. } => "create_folder",
            ClientToServer::DeleteFile { .. } => "delete_file",
            ClientToServer::DeleteFolder { .. } => "delete_folder",
            ClientToServer::SelectFile { .. } => "select_file",
            ClientToServer::CursorPosition { .. } => "cursor_position",
        }
    }
}

/// Messages sent from server to client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "msgType", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerToClient {
    /// Full room state, sent only to the joining connection
    InitialData {
        room_id: RoomId,
        /// Legacy single-buffer content
        code: String,
        language_id: LanguageId,
        files: FileTree,
        current_file: Option<String>,
    },
    /// Participant list after a join
    UserJoined {
        room_id: RoomId,
        users: Vec<ConnectionId>,
    },
    /// Participant list after a leave
    UserLeft {
        room_id: RoomId,
        users: Vec<ConnectionId>,
    },
    /// Accepted content change
    CodeUpdate {
        room_id: RoomId,
        code: String,
        language_id: LanguageId,
        file_path: Option<String>,
    },
    /// Active language changed by another participant
    LanguageChange {
        room_id: RoomId,
        language_id: LanguageId,
    },
    FileCreated {
        room_id: RoomId,
        file_path: String,
        files: FileTree,
    },
    FolderCreated {
        room_id: RoomId,
        folder_path: String,
        files: FileTree,
    },
    FileDeleted {
        room_id: RoomId,
        file_path: String,
        files: FileTree,
    },
    FolderDeleted {
        room_id: RoomId,
        folder_path: String,
        files: FileTree,
    },
    /// Another participant selected a file
    FileSelected {
        room_id: RoomId,
        file_path: String,
        file_content: Option<String>,
    },
    /// Cursor hint from another participant
    CursorUpdate {
        room_id: RoomId,
        position: serde_json::Value,
        user_id: String,
    },
    /// Intent rejected; only the originator receives this
    Error {
        /// Error code
        code: String,
        /// Error description
        message: String,
    },
    /// Frame could not be parsed
    MalformedMessage {
        /// Error description
        err_msg: String,
    },
}
