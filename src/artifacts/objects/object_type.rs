use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Commit,
    Tree,
    Blob,
    Tag,
}

static OBJECT_TYPES: phf::Map<&'static str, ObjectType> = phf::phf_map! {
    "commit" => ObjectType::Commit,
    "tree" => ObjectType::Tree,
    "blob" => ObjectType::Blob,
    "tag" => ObjectType::Tag,
};

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Commit => "commit",
            ObjectType::Tree => "tree",
            ObjectType::Blob => "blob",
            ObjectType::Tag => "tag",
        }
    }
}

impl TryFrom<&str> for ObjectType {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        OBJECT_TYPES
            .get(value)
            .copied()
            .ok_or_else(|| Error::parse("object", format!("unknown object type {value:?}")))
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
