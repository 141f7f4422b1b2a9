//! Error types for URDF parsing and the live kinematic model.

use std::path::PathBuf;

/// Errors raised while turning a robot description into a [`RobotModel`].
///
/// All of these are fatal: no model is produced.
///
/// [`RobotModel`]: crate::types::RobotModel
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to read the description file.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed XML content.
    #[error("XML error: {0}")]
    Xml(String),

    /// The document has no `<robot>` root element.
    #[error("missing <robot> root element")]
    NoRobotElement,

    /// A required child element was absent.
    #[error("missing <{element}> in {context}")]
    MissingElement { element: String, context: String },

    /// A required attribute was absent.
    #[error("missing attribute '{attribute}' on <{element}>")]
    MissingAttribute { attribute: String, element: String },

    /// An attribute value could not be interpreted.
    #[error("invalid '{attribute}' on <{element}>: {message}")]
    InvalidAttribute {
        attribute: String,
        element: String,
        message: String,
    },

    /// Joint `type` attribute named something other than
    /// revolute/continuous/prismatic/fixed.
    #[error("unsupported joint type '{0}'")]
    UnsupportedJointType(String),

    /// Two links share a name.
    #[error("duplicate link name: {0}")]
    DuplicateLink(String),

    /// Two joints share a name.
    #[error("duplicate joint name: {0}")]
    DuplicateJoint(String),

    /// A joint's parent or child names a link that was never declared.
    #[error("joint '{joint}' references undeclared link '{link}'")]
    UndeclaredLink { joint: String, link: String },

    /// Every link is some joint's child, so no root exists.
    #[error("no root link found")]
    NoRootLink,

    /// A mimic element names a joint that does not exist.
    #[error("mimic on joint '{joint}' references unknown joint '{driver}'")]
    UnknownMimicDriver { joint: String, driver: String },

    /// The mimic driver graph contains a cycle (self-reference included).
    #[error("mimic reference cycle involving joint '{0}'")]
    MimicCycle(String),
}

/// Errors from name-based lookups on a live [`Robot`].
///
/// [`Robot`]: crate::robot::Robot
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KinematicsError {
    #[error("unknown joint: {0}")]
    UnknownJoint(String),

    #[error("unknown link: {0}")]
    UnknownLink(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
