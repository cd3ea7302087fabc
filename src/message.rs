//! Ordered, tag-keyed FIX message container (tag=value, repeating groups).
//!
//! Mirrors a FIX field set as an insertion-ordered map: iteration order is
//! preserved across `set`, but `delete` followed by re-`set` moves a tag to
//! the end. Values are either raw bytes or a list of sub-messages (a group).

use std::collections::HashMap;
use std::fmt;

/// A single field value: a scalar byte string, or a repeating group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(Vec<u8>),
    Group(Vec<Message>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Scalar(v) => Some(v.as_slice()),
            FieldValue::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&[Message]> {
        match self {
            FieldValue::Scalar(_) => None,
            FieldValue::Group(g) => Some(g.as_slice()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(|b| std::str::from_utf8(b).ok())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Scalar(s.as_bytes().to_vec())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Scalar(s.into_bytes())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Scalar(v)
    }
}

impl From<Vec<Message>> for FieldValue {
    fn from(groups: Vec<Message>) -> Self {
        FieldValue::Group(groups)
    }
}

/// Anything that normalizes to a tag id: an integer, or its decimal string form.
pub trait IntoTag {
    fn into_tag(self) -> u32;
}

impl IntoTag for u32 {
    fn into_tag(self) -> u32 {
        self
    }
}

impl IntoTag for &str {
    fn into_tag(self) -> u32 {
        self.parse().expect("tag must be a decimal integer")
    }
}

impl IntoTag for &String {
    fn into_tag(self) -> u32 {
        self.parse().expect("tag must be a decimal integer")
    }
}

/// An insertion-ordered tag -> value map, the building block for both
/// top-level FIX messages and nested repeating-group records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    order: Vec<u32>,
    values: HashMap<u32, FieldValue>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a message pre-seeded with `header_fields`, each mapped to
    /// an empty scalar value, reserving their position for later `set`s.
    pub fn with_header_fields(header_fields: &[u32]) -> Self {
        let mut msg = Self::new();
        for &tag in header_fields {
            msg.set(tag, FieldValue::Scalar(Vec::new()));
        }
        msg
    }

    /// Build a message from an ordered sequence of (tag, value) pairs,
    /// optionally pre-seeded with header fields first (source semantics:
    /// header tags reserve position 0..N, then `pairs` overwrite in place).
    pub fn from_pairs(header_fields: &[u32], pairs: impl IntoIterator<Item = (u32, FieldValue)>) -> Self {
        let mut msg = Self::with_header_fields(header_fields);
        for (tag, value) in pairs {
            msg.set(tag, value);
        }
        msg
    }

    /// Copy another message's fields, in order, into a new message.
    pub fn copy_from(other: &Message) -> Self {
        Self {
            order: other.order.clone(),
            values: other.values.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, tag: impl IntoTag) -> bool {
        self.values.contains_key(&tag.into_tag())
    }

    pub fn get(&self, tag: impl IntoTag) -> Option<&FieldValue> {
        self.values.get(&tag.into_tag())
    }

    pub fn get_str(&self, tag: impl IntoTag) -> Option<&str> {
        self.get(tag).and_then(|v| v.as_str())
    }

    /// Set a tag's value. Re-setting an existing tag keeps its original
    /// position; setting a new tag appends it at the end.
    pub fn set(&mut self, tag: impl IntoTag, value: impl Into<FieldValue>) {
        let tag = tag.into_tag();
        if !self.values.contains_key(&tag) {
            self.order.push(tag);
        }
        self.values.insert(tag, value.into());
    }

    /// Remove a tag. A subsequent `set` of the same tag appends it at the
    /// end rather than restoring its old position.
    pub fn delete(&mut self, tag: impl IntoTag) -> Option<FieldValue> {
        let tag = tag.into_tag();
        if let Some(pos) = self.order.iter().position(|&t| t == tag) {
            self.order.remove(pos);
        }
        self.values.remove(&tag)
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &FieldValue)> {
        self.order.iter().map(move |&tag| (tag, &self.values[&tag]))
    }

    pub fn msg_type(&self) -> Option<&str> {
        self.get_str(35)
    }

    /// Check each `(tag, expected_value)` pair is present and equal; each
    /// tag in `exists` is present; each tag in `not_exists` is absent.
    pub fn verify(
        &self,
        fields: &[(u32, &str)],
        exists: &[u32],
        not_exists: &[u32],
    ) -> Result<(), String> {
        for &(tag, expected) in fields {
            match self.get_str(tag) {
                Some(actual) if actual == expected => {}
                Some(actual) => {
                    return Err(format!("tag {tag}: expected '{expected}', got '{actual}'"))
                }
                None => return Err(format!("tag {tag}: not present")),
            }
        }
        for &tag in exists {
            if !self.contains(tag) {
                return Err(format!("tag {tag}: expected to exist"));
            }
        }
        for &tag in not_exists {
            if self.contains(tag) {
                return Err(format!("tag {tag}: expected to NOT exist"));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .iter()
            .map(|(tag, value)| match value {
                FieldValue::Scalar(v) => format!("{tag}={}", String::from_utf8_lossy(v)),
                FieldValue::Group(groups) => format!("{tag}=<{} groups>", groups.len()),
            })
            .collect();
        write!(f, "{}", rendered.join(", "))
    }
}

/// Recursively flatten a message's fields for logging: each group tag is
/// rendered as `(tag, count)` followed by its members' flattened entries.
pub fn flatten(message: &Message) -> Vec<(u32, String)> {
    let mut out = Vec::new();
    flatten_into(message, &mut out);
    out
}

fn flatten_into(message: &Message, out: &mut Vec<(u32, String)>) {
    for (tag, value) in message.iter() {
        match value {
            FieldValue::Scalar(v) => out.push((tag, String::from_utf8_lossy(v).into_owned())),
            FieldValue::Group(groups) => {
                out.push((tag, groups.len().to_string()));
                for g in groups {
                    flatten_into(g, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_preserved_on_construction() {
        let msg = Message::from_pairs(&[8, 9, 35], [(49, "sender".into()), (56, "target".into())]);
        let tags: Vec<u32> = msg.iter().map(|(t, _)| t).collect();
        assert_eq!(tags, vec![8, 9, 35, 49, 56]);
    }

    #[test]
    fn re_set_keeps_position_delete_then_set_moves_to_end() {
        let mut msg = Message::new();
        msg.set(35u32, "A");
        msg.set(49u32, "sender");
        msg.set(35u32, "0");
        assert_eq!(msg.iter().map(|(t, _)| t).collect::<Vec<_>>(), vec![35, 49]);

        msg.delete(35u32);
        msg.set(35u32, "1");
        assert_eq!(msg.iter().map(|(t, _)| t).collect::<Vec<_>>(), vec![49, 35]);
    }

    #[test]
    fn integer_and_string_keys_are_equivalent() {
        let mut msg = Message::new();
        msg.set(35u32, "A");
        assert_eq!(msg.get_str("35"), Some("A"));
        assert!(msg.contains("35"));
    }

    #[test]
    fn verify_not_exists_means_absent() {
        let mut msg = Message::new();
        msg.set(35u32, "A");
        assert!(msg.verify(&[], &[35], &[112]).is_ok());
        msg.set(112u32, "tr1");
        assert!(msg.verify(&[], &[], &[112]).is_err());
    }

    #[test]
    fn nested_groups_round_trip_through_flatten() {
        let mut inner = Message::new();
        inner.set(201u32, "abc");
        inner.set(202u32, "def");
        let mut outer = Message::new();
        outer.set(101u32, "a");
        outer.set(102u32, "b");
        outer.set(200u32, vec![inner]);

        let mut top = Message::new();
        top.set(100u32, vec![outer]);

        let flat = flatten(&top);
        assert_eq!(flat[0], (100, "1".to_string()));
        assert_eq!(flat[1], (101, "a".to_string()));
        assert_eq!(flat[2], (102, "b".to_string()));
        assert_eq!(flat[3], (200, "1".to_string()));
        assert_eq!(flat[4], (201, "abc".to_string()));
        assert_eq!(flat[5], (202, "def".to_string()));
    }
}
