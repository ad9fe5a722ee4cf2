//! JSON:API envelope shapes returned by the backend.
//!
//! Every list endpoint answers `{data: [...], included: [...]}` and every
//! single-resource endpoint `{data: {...}, included: [...]}`. Attributes are
//! typed per call site; `included` stays loosely typed and is resolved
//! through an [`IncludedIndex`] built once per response.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Relationship `data` member: a single identifier, an array, or null.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    One(ResourceIdentifier),
    Many(Vec<ResourceIdentifier>),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<RelationshipData>,
}

impl Relationship {
    /// The single linked identifier, if the relationship is to-one and set.
    pub fn single(&self) -> Option<&ResourceIdentifier> {
        match &self.data {
            Some(RelationshipData::One(id)) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource<A> {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: A,
    #[serde(default)]
    pub relationships: HashMap<String, Relationship>,
}

impl<A> Resource<A> {
    /// Id of the resource linked through a named to-one relationship.
    pub fn related_id(&self, name: &str) -> Option<&str> {
        self.relationships
            .get(name)
            .and_then(Relationship::single)
            .map(|ident| ident.id.as_str())
    }
}

/// Entry of the `included` side array. Attributes stay untyped here; callers
/// deserialize them per expected kind.
#[derive(Debug, Clone, Deserialize)]
pub struct IncludedResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

impl IncludedResource {
    pub fn attributes_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.attributes.clone())
    }

    pub fn attr_str(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListDocument<A> {
    pub data: Vec<Resource<A>>,
    #[serde(default)]
    pub included: Vec<IncludedResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OneDocument<A> {
    pub data: Resource<A>,
    #[serde(default)]
    pub included: Vec<IncludedResource>,
}

/// Lookup map over an `included` array, keyed by `(type, id)`.
/// Built once per response so relationship resolution is not a linear scan.
pub struct IncludedIndex<'a> {
    by_kind: HashMap<&'a str, HashMap<&'a str, &'a IncludedResource>>,
}

impl<'a> IncludedIndex<'a> {
    pub fn new(included: &'a [IncludedResource]) -> Self {
        let mut by_kind: HashMap<&str, HashMap<&str, &IncludedResource>> = HashMap::new();
        for res in included {
            by_kind
                .entry(res.kind.as_str())
                .or_default()
                .insert(res.id.as_str(), res);
        }
        Self { by_kind }
    }

    pub fn get(&self, kind: &str, id: &str) -> Option<&'a IncludedResource> {
        self.by_kind.get(kind)?.get(id).copied()
    }
}

/// Entries of an `included` array with the given type, in response order.
pub fn of_kind<'a>(
    included: &'a [IncludedResource],
    kind: &'a str,
) -> impl Iterator<Item = &'a IncludedResource> {
    included.iter().filter(move |res| res.kind == kind)
}
