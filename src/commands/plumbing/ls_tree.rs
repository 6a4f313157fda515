use crate::areas::repository::Repository;
use crate::artifacts::objects::object::ParsedBody;
use crate::artifacts::objects::object_id::{ObjectId, ObjectIdPrefix};
use crate::artifacts::objects::tree::Tree;
use crate::errors::Error;
use anyhow::Context;
use std::path::Path;

impl Repository {
    /// List a tree-ish: tags are followed to their target, commits to their
    /// tree
    pub fn ls_tree(&self, name: &str, recursive: bool) -> anyhow::Result<()> {
        let tree = self
            .peel_to_tree(name)
            .with_context(|| format!("unable to read tree {name}"))?;

        self.list_tree(tree, None, recursive)?;
        self.writer().flush()?;

        Ok(())
    }

    fn peel_to_tree(&self, name: &str) -> anyhow::Result<Tree> {
        let mut record = self.find_object(name)?;

        for _ in 0..=self.config().max_ref_depth {
            let target: ObjectId = match record.body {
                ParsedBody::Tree(tree) => return Ok(*tree),
                ParsedBody::Commit(commit) => *commit.tree(),
                ParsedBody::Tag(tag) => *tag.object(),
                ParsedBody::Blob(_) => anyhow::bail!("{name} is a blob, not a tree-ish"),
            };

            record = self.database().parse_object(&ObjectIdPrefix::from(target))?;
        }

        Err(Error::CyclicReference {
            name: name.to_string(),
            limit: self.config().max_ref_depth,
        }
        .into())
    }

    fn list_tree(&self, tree: Tree, prefix: Option<&Path>, recursive: bool) -> anyhow::Result<()> {
        for entry in tree.into_entries() {
            let name = entry.name();
            let path = match prefix {
                Some(prefix) => prefix.join(&*name),
                None => Path::new(&*name).to_path_buf(),
            };

            if recursive && entry.is_tree() {
                let subtree = self
                    .database()
                    .parse_object_as_tree(&ObjectIdPrefix::from(entry.oid))?
                    .ok_or_else(|| anyhow::anyhow!("{} is not a tree", entry.oid))?;
                self.list_tree(subtree, Some(&path), recursive)?;
            } else {
                writeln!(
                    self.writer(),
                    "{:0>6} {} {}\t{}",
                    entry.mode(),
                    entry.kind.object_type(),
                    entry.oid,
                    path.display()
                )?;
            }
        }

        Ok(())
    }
}
