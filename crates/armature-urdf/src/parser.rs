//! URDF XML parsing into a [`RobotModel`].
//!
//! Only the kinematic subset is read: `robot > link|joint` with `origin`,
//! `axis`, `limit`, and `mimic` sub-elements. Visual, collision, inertial,
//! material, and vendor extension elements are skipped.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::ParseError;
use crate::types::{JointData, JointLimits, JointType, LinkData, Mimic, Origin, RobotModel};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a URDF file from disk into a [`RobotModel`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<RobotModel, ParseError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ParseError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_string(&content)
}

/// Parse a URDF XML string into a [`RobotModel`].
///
/// # Errors
///
/// Fails when the document has no `<robot>` root, a joint references an
/// undeclared link, names collide, a joint type is unsupported, no root
/// link exists, or the mimic reference graph contains a cycle.
pub fn parse_string(xml: &str) -> Result<RobotModel, ParseError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut model: Option<RobotModel> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"robot" => {
                model = Some(parse_robot(&mut reader, e)?);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ParseError::Xml(e.to_string())),
        }
        buf.clear();
    }

    let model = model.ok_or(ParseError::NoRobotElement)?;
    model.validate()?;

    debug!(
        "parsed robot '{}': {} links, {} joints ({} actuated), root '{}'",
        model.name,
        model.links.len(),
        model.joints.len(),
        model.dof(),
        model.root_link
    );
    Ok(model)
}

// ---------------------------------------------------------------------------
// Element parsing
// ---------------------------------------------------------------------------

fn parse_robot<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart,
) -> Result<RobotModel, ParseError> {
    let name = get_attribute(start, "name")?;
    let mut links: Vec<LinkData> = Vec::new();
    let mut joints: Vec<JointData> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let elem = e.name().as_ref().to_vec();
                match elem.as_slice() {
                    b"link" => {
                        let link_name = get_attribute(e, "name")?;
                        skip_element(reader, b"link")?;
                        links.push(LinkData::new(link_name));
                    }
                    b"joint" => joints.push(parse_joint(reader, e)?),
                    _ => skip_element(reader, &elem)?,
                }
            }
            Ok(Event::Empty(ref e)) => {
                if e.name().as_ref() == b"link" {
                    links.push(LinkData::new(get_attribute(e, "name")?));
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"robot" => break,
            Ok(Event::Eof) => return Err(ParseError::Xml("unexpected EOF in robot".into())),
            Ok(_) => {}
            Err(e) => return Err(ParseError::Xml(e.to_string())),
        }
        buf.clear();
    }

    let root_link = find_root_link(&links, &joints)?;

    Ok(RobotModel {
        name,
        links,
        joints,
        root_link,
    })
}

fn parse_joint<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart,
) -> Result<JointData, ParseError> {
    let name = get_attribute(start, "name")?;
    let joint_type = JointType::from_str(&get_attribute(start, "type")?)?;

    let mut parent: Option<String> = None;
    let mut child: Option<String> = None;
    let mut origin = Origin::default();
    let mut axis = [0.0, 0.0, 1.0];
    let mut limits = JointLimits::default();
    let mut mimic: Option<Mimic> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"parent" => parent = Some(get_attribute(e, "link")?),
                b"child" => child = Some(get_attribute(e, "link")?),
                b"origin" => origin = parse_origin(e)?,
                b"axis" => {
                    if let Some(xyz) = get_attribute_opt(e, "xyz") {
                        axis = parse_vec3(&xyz, "xyz", "axis")?;
                    }
                }
                b"limit" => {
                    limits = JointLimits {
                        lower: parse_float_attr(e, "lower"),
                        upper: parse_float_attr(e, "upper"),
                    };
                }
                b"mimic" => {
                    mimic = Some(Mimic {
                        joint: get_attribute(e, "joint")?,
                        multiplier: parse_float_attr(e, "multiplier").unwrap_or(1.0),
                        offset: parse_float_attr(e, "offset").unwrap_or(0.0),
                    });
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"joint" => break,
            Ok(Event::Eof) => return Err(ParseError::Xml("unexpected EOF in joint".into())),
            Ok(_) => {}
            Err(e) => return Err(ParseError::Xml(e.to_string())),
        }
        buf.clear();
    }

    let parent = parent.ok_or_else(|| ParseError::MissingElement {
        element: "parent".into(),
        context: format!("joint '{name}'"),
    })?;
    let child = child.ok_or_else(|| ParseError::MissingElement {
        element: "child".into(),
        context: format!("joint '{name}'"),
    })?;

    Ok(JointData {
        name,
        joint_type,
        parent,
        child,
        origin,
        axis: normalize_axis(axis)?,
        limits,
        mimic,
    })
}

fn parse_origin(e: &BytesStart) -> Result<Origin, ParseError> {
    let xyz = match get_attribute_opt(e, "xyz") {
        Some(s) => parse_vec3(&s, "xyz", "origin")?,
        None => [0.0; 3],
    };
    let rpy = match get_attribute_opt(e, "rpy") {
        Some(s) => parse_vec3(&s, "rpy", "origin")?,
        None => [0.0; 3],
    };
    Ok(Origin { xyz, rpy })
}

/// Root link = the first declared link that is never a joint's child.
fn find_root_link(links: &[LinkData], joints: &[JointData]) -> Result<String, ParseError> {
    let children: HashSet<&str> = joints.iter().map(|j| j.child.as_str()).collect();
    links
        .iter()
        .find(|l| !children.contains(l.name.as_str()))
        .map(|l| l.name.clone())
        .ok_or(ParseError::NoRootLink)
}

fn normalize_axis(axis: [f32; 3]) -> Result<[f32; 3], ParseError> {
    let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    if norm <= f32::EPSILON {
        return Err(ParseError::InvalidAttribute {
            attribute: "xyz".into(),
            element: "axis".into(),
            message: "zero-length axis".into(),
        });
    }
    Ok([axis[0] / norm, axis[1] / norm, axis[2] / norm])
}

// ---------------------------------------------------------------------------
// Attribute helpers
// ---------------------------------------------------------------------------

fn get_attribute(e: &BytesStart, name: &str) -> Result<String, ParseError> {
    get_attribute_opt(e, name).ok_or_else(|| ParseError::MissingAttribute {
        attribute: name.into(),
        element: element_name(e),
    })
}

fn get_attribute_opt(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name.as_bytes())
        .and_then(|a| String::from_utf8(a.value.to_vec()).ok())
}

fn parse_float_attr(e: &BytesStart, name: &str) -> Option<f32> {
    get_attribute_opt(e, name).and_then(|s| s.parse().ok())
}

fn parse_vec3(s: &str, attribute: &str, element: &str) -> Result<[f32; 3], ParseError> {
    let parts: Vec<f32> = s
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| ParseError::InvalidAttribute {
            attribute: attribute.into(),
            element: element.into(),
            message: format!("expected three numbers, got '{s}'"),
        })?;
    if parts.len() != 3 {
        return Err(ParseError::InvalidAttribute {
            attribute: attribute.into(),
            element: element.into(),
            message: format!("expected three numbers, got {}", parts.len()),
        });
    }
    Ok([parts[0], parts[1], parts[2]])
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

/// Skip an element and all of its children.
fn skip_element<R: BufRead>(reader: &mut Reader<R>, name: &[u8]) -> Result<(), ParseError> {
    let mut buf = Vec::new();
    let mut depth = 1usize;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == name => depth += 1,
            Ok(Event::End(ref e)) if e.name().as_ref() == name => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ParseError::Xml(e.to_string())),
        }
        buf.clear();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
