use crate::areas::database::Database;
use crate::areas::refs::Refs;
use crate::artifacts::objects::object::ObjectRecord;
use crate::artifacts::objects::object_id::{ObjectId, ObjectIdPrefix};
use crate::config::Config;
use crate::errors::Result;
use std::cell::{RefCell, RefMut};

pub struct Repository {
    config: Config,
    writer: RefCell<Box<dyn std::io::Write>>,
    database: Database,
    refs: Refs,
}

impl Repository {
    pub fn new(config: Config, writer: Box<dyn std::io::Write>) -> Result<Self> {
        let database = Database::open(&config)?;
        let refs = Refs::new(config.git_dir.clone().into_boxed_path(), config.max_ref_depth);

        Ok(Repository {
            config,
            writer: RefCell::new(writer),
            database,
            refs,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    /// Resolve a ref name or (abbreviated) id to the full id of an existing
    /// object
    pub fn resolve(&self, name: &str) -> Result<ObjectId> {
        let prefix = self.refs.resolve(name)?;
        self.database.expand(&prefix)
    }

    /// Resolve `name` and decode the object it points at
    pub fn find_object(&self, name: &str) -> Result<ObjectRecord> {
        let prefix: ObjectIdPrefix = self.refs.resolve(name)?;
        self.database.parse_object(&prefix)
    }
}
