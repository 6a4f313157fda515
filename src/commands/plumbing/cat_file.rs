use crate::areas::repository::Repository;
use crate::artifacts::objects::object::ParsedBody;
use crate::errors::Error;
use anyhow::Context;

/// What `cat-file` prints for an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatFileMode {
    /// Body in its canonical text form, blobs byte for byte
    Pretty,
    Type,
    Size,
    /// Nothing; fails when the object is missing
    Exists,
}

impl Repository {
    pub fn cat_file(&self, name: &str, mode: CatFileMode) -> anyhow::Result<()> {
        if mode == CatFileMode::Exists {
            let prefix = self.refs().resolve(name)?;
            if !self.database().contains(&prefix)? {
                return Err(Error::ObjectNotFound(name.to_string()).into());
            }
            return Ok(());
        }

        let record = self
            .find_object(name)
            .with_context(|| format!("unable to read object {name}"))?;

        match mode {
            CatFileMode::Type => writeln!(self.writer(), "{}", record.object_type)?,
            CatFileMode::Size => writeln!(self.writer(), "{}", record.size)?,
            CatFileMode::Pretty => match &record.body {
                ParsedBody::Tree(tree) if !tree.entries().is_empty() => {
                    writeln!(self.writer(), "{}", tree.display())?
                }
                body => self.writer().write_all(&body.serialize())?,
            },
            CatFileMode::Exists => {}
        }

        self.writer().flush()?;

        Ok(())
    }
}
