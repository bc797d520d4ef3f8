#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use maze_nav_grid::{CellSnapshot, MazeSnapshot};
use serde::{Deserialize, Serialize};

const SNAPSHOT_DOMAIN: &str = "maze";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "maze:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Encodes a maze snapshot into a single-line string suitable for
/// clipboard or message transfer.
pub(crate) fn encode(snapshot: &MazeSnapshot) -> String {
    let payload = SerializablePayload {
        allow_diagonal: snapshot.allow_diagonal,
        cells: snapshot.cells.clone(),
    };
    let json = serde_json::to_vec(&payload).expect("maze snapshot serialization never fails");
    let encoded = STANDARD_NO_PAD.encode(json);
    format!(
        "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
        snapshot.width, snapshot.height
    )
}

/// Decodes a maze snapshot from its string representation.
pub(crate) fn decode(value: &str) -> Result<MazeSnapshot, SnapshotTransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SnapshotTransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(SnapshotTransferError::MissingPrefix)?;
    let version = parts.next().ok_or(SnapshotTransferError::MissingVersion)?;
    let dimensions = parts
        .next()
        .ok_or(SnapshotTransferError::MissingDimensions)?;
    let payload = parts.next().ok_or(SnapshotTransferError::MissingPayload)?;

    if domain != SNAPSHOT_DOMAIN {
        return Err(SnapshotTransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != SNAPSHOT_VERSION {
        return Err(SnapshotTransferError::UnsupportedVersion(
            version.to_owned(),
        ));
    }

    let (width, height) = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(SnapshotTransferError::InvalidEncoding)?;
    let decoded: SerializablePayload =
        serde_json::from_slice(&bytes).map_err(SnapshotTransferError::InvalidPayload)?;

    Ok(MazeSnapshot {
        width,
        height,
        allow_diagonal: decoded.allow_diagonal,
        cells: decoded.cells,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializablePayload {
    allow_diagonal: bool,
    cells: Vec<CellSnapshot>,
}

/// Errors that can occur while decoding snapshot transfer strings.
#[derive(Debug)]
pub(crate) enum SnapshotTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded snapshot.
    MissingPrefix,
    /// The encoded snapshot did not contain a version segment.
    MissingVersion,
    /// The encoded snapshot did not include grid dimensions.
    MissingDimensions,
    /// The encoded snapshot did not include the payload segment.
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the encoded snapshot.
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for SnapshotTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "snapshot payload was empty"),
            Self::MissingPrefix => write!(f, "snapshot string is missing the prefix"),
            Self::MissingVersion => write!(f, "snapshot string is missing the version"),
            Self::MissingDimensions => {
                write!(f, "snapshot string is missing the grid dimensions")
            }
            Self::MissingPayload => write!(f, "snapshot string is missing the payload"),
            Self::InvalidPrefix(prefix) => {
                write!(f, "snapshot prefix '{prefix}' is not supported")
            }
            Self::UnsupportedVersion(version) => {
                write!(f, "snapshot version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode snapshot payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse snapshot payload: {error}")
            }
        }
    }
}

impl Error for SnapshotTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), SnapshotTransferError> {
    let (width, height) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| SnapshotTransferError::InvalidDimensions(dimensions.to_owned()))?;

    let width = width
        .trim()
        .parse::<u32>()
        .map_err(|_| SnapshotTransferError::InvalidDimensions(dimensions.to_owned()))?;
    let height = height
        .trim()
        .parse::<u32>()
        .map_err(|_| SnapshotTransferError::InvalidDimensions(dimensions.to_owned()))?;

    if width == 0 || height == 0 {
        return Err(SnapshotTransferError::InvalidDimensions(
            dimensions.to_owned(),
        ));
    }

    Ok((width, height))
}
