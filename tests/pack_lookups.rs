use crate::common::command::{committed_repository_dir, config, git, pack_index_path, repack};
use assert_fs::TempDir;
use bitcat::areas::database::Database;
use bitcat::areas::packfile::PackfileStore;
use bitcat::artifacts::objects::object::ObjectRecord;
use bitcat::artifacts::objects::object_id::ObjectIdPrefix;
use bitcat::artifacts::objects::object_type::ObjectType;
use bitcat::errors::Error;
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

/// Every object in every pack rebuilds to bytes that hash back to its id
fn assert_pack_round_trips(dir: &TempDir) -> Result<usize, Box<dyn std::error::Error>> {
    let config = config(dir.path());
    let store = PackfileStore::open(&config.objects_path(), &config)?;
    assert_eq!(store.indices().len(), 1);

    let mut objects = 0;
    for index in store.indices() {
        for entry in index.entries() {
            let framed = store
                .find(&ObjectIdPrefix::from(entry.oid))?
                .expect("indexed object is missing");
            let record = ObjectRecord::parse(&framed)?;

            assert_eq!(record.object_id(), entry.oid);
            objects += 1;
        }
    }

    Ok(objects)
}

#[rstest]
fn offset_deltas_rebuild_every_object(
    committed_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = committed_repository_dir.path();
    git(dir, &["tag", "-a", "v1.0", "-m", "First release"]);
    repack(dir, &[]);

    let index_path = pack_index_path(dir);
    let pack = git(dir, &["verify-pack", "-v", &index_path.to_string_lossy()]);
    assert!(pack.contains("chain length"), "expected deltas in:\n{pack}");

    // 3 commits, 3 blobs of notes.txt, 3 other blobs, 3 root trees, 2 subtrees, 1 tag
    assert_eq!(assert_pack_round_trips(&committed_repository_dir)?, 15);

    Ok(())
}

#[rstest]
fn ref_deltas_rebuild_every_object(
    committed_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = committed_repository_dir.path();
    git(dir, &["config", "repack.useDeltaBaseOffset", "false"]);
    repack(dir, &[]);

    assert_eq!(assert_pack_round_trips(&committed_repository_dir)?, 14);

    Ok(())
}

#[rstest]
fn packed_objects_are_found_by_abbreviated_id(
    committed_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = committed_repository_dir.path();
    repack(dir, &[]);
    let database = Database::open(&config(dir))?;

    for name in ["HEAD", "HEAD^{tree}", "HEAD:notes.txt", "HEAD~1:notes.txt"] {
        let oid = git(dir, &["rev-parse", name]);
        let short = git(dir, &["rev-parse", "--short=7", name]);

        let expanded = database.expand(&ObjectIdPrefix::try_parse(&short)?)?;
        let record = database.parse_object(&ObjectIdPrefix::try_parse(&short)?)?;

        assert_eq!(expanded.to_hex(), oid);
        assert_eq!(record.object_id().to_hex(), oid);
    }

    let notes = database.parse_object(&ObjectIdPrefix::try_parse(&git(
        dir,
        &["rev-parse", "HEAD~2:notes.txt"],
    ))?)?;
    assert_eq!(notes.object_type, ObjectType::Blob);
    assert_eq!(notes.size, git(dir, &["cat-file", "-s", "HEAD~2:notes.txt"]).parse::<u64>()?);

    Ok(())
}

#[rstest]
fn missing_prefixes_are_not_found(
    committed_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = committed_repository_dir.path();
    repack(dir, &[]);
    let database = Database::open(&config(dir))?;
    let head = git(dir, &["rev-parse", "HEAD"]);
    // flip the last digit so the id cannot exist in a repository this small
    let last = if head.ends_with('0') { "1" } else { "0" };
    let missing = format!("{}{last}", &head[..39]);

    let result = database.parse_object(&ObjectIdPrefix::try_parse(&missing)?);

    assert!(matches!(result, Err(Error::ObjectNotFound(_))));

    Ok(())
}

#[rstest]
fn corrupt_index_checksums_are_rejected(
    committed_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = committed_repository_dir.path();
    repack(dir, &[]);
    let index_path = pack_index_path(dir);

    // git writes pack files read-only
    let mut permissions = std::fs::metadata(&index_path)?.permissions();
    permissions.set_readonly(false);
    std::fs::set_permissions(&index_path, permissions)?;

    let mut bytes = std::fs::read(&index_path)?;
    bytes[8 + 256 * 4] ^= 0xff;
    std::fs::write(&index_path, bytes)?;

    let result = Database::open(&config(dir));
    assert!(matches!(result, Err(Error::CorruptIndex { .. })));

    let unchecked = Database::open(&config(dir).with_index_checksum(false));
    assert!(unchecked.is_ok());

    Ok(())
}
