use crate::areas::repository::Repository;
use anyhow::Context;

impl Repository {
    pub fn rev_parse(&self, name: &str) -> anyhow::Result<()> {
        let oid = self
            .resolve(name)
            .with_context(|| format!("unable to resolve {name}"))?;

        writeln!(self.writer(), "{oid}")?;

        Ok(())
    }
}
