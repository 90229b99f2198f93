use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

/// Server-side metadata of a znode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stat {
    /// Transaction id of the change that created the node
    pub czxid: i64,
    /// Transaction id of the change that last modified the node's data
    pub mzxid: i64,
    pub ctime: i64,
    pub mtime: i64,
    /// Data version
    pub version: i32,
    /// Child list version
    pub cversion: i32,
    /// ACL version
    pub aversion: i32,
    /// Session id of the owner when the node is ephemeral, 0 otherwise
    pub ephemeral_owner: i64,
    pub data_length: i32,
    pub num_children: i32,
    /// Transaction id of the change that last modified the children
    pub pzxid: i64,
}

/// Result codes of the coordination service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    Ok,
    SystemError,
    RuntimeInconsistency,
    DataInconsistency,
    ConnectionLoss,
    MarshallingError,
    Unimplemented,
    OperationTimeout,
    BadArguments,
    UnknownSession,
    NewConfigNoQuorum,
    ReconfigInProgress,
    ApiError,
    NoNode,
    NoAuth,
    BadVersion,
    NoChildrenForEphemerals,
    NodeExists,
    NotEmpty,
    SessionExpired,
    InvalidCallback,
    InvalidAcl,
    AuthFailed,
    SessionMoved,
    NotReadOnly,
    EphemeralOnLocalSession,
    NoWatcher,
    ReconfigDisabled,
    Other(i32),
}

impl ReturnCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            -1 => Self::SystemError,
            -2 => Self::RuntimeInconsistency,
            -3 => Self::DataInconsistency,
            -4 => Self::ConnectionLoss,
            -5 => Self::MarshallingError,
            -6 => Self::Unimplemented,
            -7 => Self::OperationTimeout,
            -8 => Self::BadArguments,
            -12 => Self::UnknownSession,
            -13 => Self::NewConfigNoQuorum,
            -14 => Self::ReconfigInProgress,
            -100 => Self::ApiError,
            -101 => Self::NoNode,
            -102 => Self::NoAuth,
            -103 => Self::BadVersion,
            -108 => Self::NoChildrenForEphemerals,
            -110 => Self::NodeExists,
            -111 => Self::NotEmpty,
            -112 => Self::SessionExpired,
            -113 => Self::InvalidCallback,
            -114 => Self::InvalidAcl,
            -115 => Self::AuthFailed,
            -118 => Self::SessionMoved,
            -119 => Self::NotReadOnly,
            -120 => Self::EphemeralOnLocalSession,
            -121 => Self::NoWatcher,
            -123 => Self::ReconfigDisabled,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::SystemError => -1,
            Self::RuntimeInconsistency => -2,
            Self::DataInconsistency => -3,
            Self::ConnectionLoss => -4,
            Self::MarshallingError => -5,
            Self::Unimplemented => -6,
            Self::OperationTimeout => -7,
            Self::BadArguments => -8,
            Self::UnknownSession => -12,
            Self::NewConfigNoQuorum => -13,
            Self::ReconfigInProgress => -14,
            Self::ApiError => -100,
            Self::NoNode => -101,
            Self::NoAuth => -102,
            Self::BadVersion => -103,
            Self::NoChildrenForEphemerals => -108,
            Self::NodeExists => -110,
            Self::NotEmpty => -111,
            Self::SessionExpired => -112,
            Self::InvalidCallback => -113,
            Self::InvalidAcl => -114,
            Self::AuthFailed => -115,
            Self::SessionMoved => -118,
            Self::NotReadOnly => -119,
            Self::EphemeralOnLocalSession => -120,
            Self::NoWatcher => -121,
            Self::ReconfigDisabled => -123,
            Self::Other(code) => *code,
        }
    }

    /// Failures the connection state machine already accounts for; they are
    /// retried through watches and reconnection, not reported as errors.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionLoss | Self::OperationTimeout | Self::SessionExpired
        )
    }
}

/// Reply of a watched `get_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataReply {
    Ok { data: Option<Bytes>, stat: Stat },
    NoNode,
    Failed(ReturnCode),
}

/// Reply of a watched `get_children`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildrenReply {
    Ok { children: Vec<String>, stat: Stat },
    NoNode,
    Failed(ReturnCode),
}

/// Reply of a watched `exists`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistsReply {
    Ok(Stat),
    NoNode,
    Failed(ReturnCode),
}

impl DataReply {
    pub fn code(&self) -> ReturnCode {
        match self {
            DataReply::Ok { .. } => ReturnCode::Ok,
            DataReply::NoNode => ReturnCode::NoNode,
            DataReply::Failed(code) => *code,
        }
    }
}

impl ChildrenReply {
    pub fn code(&self) -> ReturnCode {
        match self {
            ChildrenReply::Ok { .. } => ReturnCode::Ok,
            ChildrenReply::NoNode => ReturnCode::NoNode,
            ChildrenReply::Failed(code) => *code,
        }
    }
}

impl ExistsReply {
    pub fn code(&self) -> ReturnCode {
        match self {
            ExistsReply::Ok(_) => ReturnCode::Ok,
            ExistsReply::NoNode => ReturnCode::NoNode,
            ExistsReply::Failed(code) => *code,
        }
    }
}
