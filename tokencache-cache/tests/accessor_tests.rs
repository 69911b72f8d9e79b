mod support;

use pretty_assertions::assert_eq;
use std::fs;
use tokencache_cache::{CacheError, suffixed_name};
use tokencache_keyring::MemorySecretStore;

// ── Read / Write ────────────────────────────────────────────────

#[test]
fn read_without_file_is_a_miss() {
    support::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("miss"), false)
        .unwrap();

    assert_eq!(acc.read().unwrap(), None);
    assert!(store.is_empty(), "read must not create a key");
}

#[test]
fn empty_file_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("empty"), false)
        .unwrap();
    fs::write(dir.path().join("empty.nocae"), b"").unwrap();

    assert_eq!(acc.read().unwrap(), None);
}

#[test]
fn write_then_read() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("rw"), true)
        .unwrap();

    acc.write(b"{\"AccessToken\":{}}").unwrap();
    assert_eq!(acc.read().unwrap().as_deref(), Some(&b"{\"AccessToken\":{}}"[..]));

    acc.write(b"second").unwrap();
    assert_eq!(acc.read().unwrap().as_deref(), Some(&b"second"[..]));
}

#[test]
fn empty_write_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("noop"), false)
        .unwrap();
    acc.write(b"persisted").unwrap();

    let path = dir.path().join("noop.nocae");
    let before = fs::read(&path).unwrap();
    acc.write(&[]).unwrap();
    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(acc.read().unwrap().as_deref(), Some(&b"persisted"[..]));
}

#[test]
fn empty_write_without_file_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("noop"), false)
        .unwrap();

    acc.write(&[]).unwrap();
    assert!(!dir.path().join("noop.nocae").exists());
    assert!(store.is_empty());
}

#[test]
fn malformed_file_propagates_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("bad"), false)
        .unwrap();

    for contents in [&b"a.b.c"[..], b"a..b.c.!!!", b"\xff\xfe"] {
        fs::write(dir.path().join("bad.nocae"), contents).unwrap();
        assert!(matches!(acc.read(), Err(CacheError::Format(_))));
    }
}

#[test]
fn tampered_file_reads_as_miss_and_next_write_heals() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("tamper"), false)
        .unwrap();
    acc.write(b"original").unwrap();

    let path = dir.path().join("tamper.nocae");
    let compact = fs::read_to_string(&path).unwrap();
    let (rest, tag) = compact.rsplit_once('.').unwrap();
    let flipped = if tag.starts_with('A') { 'B' } else { 'A' };
    fs::write(&path, format!("{rest}.{flipped}{}", &tag[1..])).unwrap();

    assert_eq!(acc.read().unwrap(), None);
    acc.write(b"healed").unwrap();
    assert_eq!(acc.read().unwrap().as_deref(), Some(&b"healed"[..]));
}

// ── Key loss and rotation ───────────────────────────────────────

#[test]
fn key_loss_reads_as_miss_then_write_heals() {
    support::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let name = suffixed_name("lost", false);

    support::factory(&store, dir.path())
        .accessor(&support::options("lost"), false)
        .unwrap()
        .write(b"before")
        .unwrap();

    // a fresh process finds the file but not the key
    store.remove(&name);
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("lost"), false)
        .unwrap();
    assert!(dir.path().join(&name).exists());
    assert_eq!(acc.read().unwrap(), None);
    assert!(store.payload(&name).is_none(), "read must not create a key");

    acc.write(b"after").unwrap();
    assert_eq!(acc.read().unwrap().as_deref(), Some(&b"after"[..]));
}

#[test]
fn revoked_key_reads_as_miss_then_write_heals() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let name = suffixed_name("revoked", true);
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("revoked"), true)
        .unwrap();
    acc.write(b"before").unwrap();

    store.revoke(&name);
    let fresh = support::factory(&store, dir.path())
        .accessor(&support::options("revoked"), true)
        .unwrap();
    assert_eq!(fresh.read().unwrap(), None);

    fresh.write(b"after").unwrap();
    assert_eq!(fresh.read().unwrap().as_deref(), Some(&b"after"[..]));
}

#[test]
fn reader_picks_up_key_rotated_by_another_process() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let name = suffixed_name("rotated", false);

    let first = support::factory(&store, dir.path())
        .accessor(&support::options("rotated"), false)
        .unwrap();
    first.write(b"from first").unwrap();

    // another process loses the key and writes under a new one
    store.remove(&name);
    let second = support::factory(&store, dir.path())
        .accessor(&support::options("rotated"), false)
        .unwrap();
    second.write(b"from second").unwrap();

    // the stale in-memory key fails, the retry finds the new key
    assert_eq!(first.read().unwrap().as_deref(), Some(&b"from second"[..]));
}

// ── Cross-instance and CAE isolation ────────────────────────────

#[test]
fn independent_accessors_share_data() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let a = support::factory(&store, dir.path())
        .accessor(&support::options("shared"), true)
        .unwrap();
    let b = support::factory(&store, dir.path())
        .accessor(&support::options("shared"), true)
        .unwrap();

    a.write(b"written by a").unwrap();
    assert_eq!(b.read().unwrap().as_deref(), Some(&b"written by a"[..]));
    b.write(b"written by b").unwrap();
    assert_eq!(a.read().unwrap().as_deref(), Some(&b"written by b"[..]));
}

#[test]
fn cae_and_nocae_never_mix() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let factory = support::factory(&store, dir.path());
    let cae = factory.accessor(&support::options("split"), true).unwrap();
    let nocae = factory.accessor(&support::options("split"), false).unwrap();

    cae.write(b"cae tokens").unwrap();
    assert_eq!(nocae.read().unwrap(), None);
    nocae.write(b"nocae tokens").unwrap();

    assert_eq!(cae.read().unwrap().as_deref(), Some(&b"cae tokens"[..]));
    assert_eq!(nocae.read().unwrap().as_deref(), Some(&b"nocae tokens"[..]));
    assert!(dir.path().join("split.cae").exists());
    assert!(dir.path().join("split.nocae").exists());
}

// ── Delete ──────────────────────────────────────────────────────

#[test]
fn delete_removes_file_and_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("gone"), false)
        .unwrap();
    acc.write(b"tokens").unwrap();

    acc.delete().unwrap();
    assert!(!dir.path().join("gone.nocae").exists());
    assert!(store.is_empty());
    assert_eq!(acc.read().unwrap(), None);
}

#[test]
fn delete_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("twice"), false)
        .unwrap();

    acc.delete().unwrap();
    acc.write(b"x").unwrap();
    acc.delete().unwrap();
    acc.delete().unwrap();
}

#[test]
fn write_after_delete_recreates_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("again"), true)
        .unwrap();
    acc.write(b"one").unwrap();
    acc.delete().unwrap();

    acc.write(b"two").unwrap();
    assert_eq!(acc.read().unwrap().as_deref(), Some(&b"two"[..]));
}

// ── Filesystem ──────────────────────────────────────────────────

#[test]
fn missing_parent_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("home").join(".cache").join(".IdentityService");
    let store = MemorySecretStore::new();
    let acc = support::factory(&store, &nested)
        .accessor(&support::options("nested"), false)
        .unwrap();

    acc.write(b"first").unwrap();
    fs::remove_dir_all(dir.path().join("home")).unwrap();
    acc.write(b"second").unwrap();
    assert_eq!(acc.read().unwrap().as_deref(), Some(&b"second"[..]));
}

#[cfg(unix)]
#[test]
fn cache_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let store = MemorySecretStore::new();
    let acc = support::factory(&store, dir.path())
        .accessor(&support::options("mode"), false)
        .unwrap();
    acc.write(b"tokens").unwrap();

    let mode = fs::metadata(dir.path().join("mode.nocae")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
