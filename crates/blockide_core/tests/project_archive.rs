use blockide_core::model::asset::{AssetKind, AssetRef};
use blockide_core::model::project::{EntryObject, Picture, Project, Sound};
use blockide_core::project::{ErrorKind, LoadPhase, ProjectError, ProjectSession, PROJECT_MANIFEST};
use blockide_core::ShellConfig;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::path::Path;

const PICTURE_FILE: &str = "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6";
const SOUND_FILE: &str = "f0e1d2c3b4a5f6e7d8c9b0a1f2e3d4c5";

fn session_in(home: &Path) -> ProjectSession {
    let mut session = ProjectSession::new(ShellConfig::with_home(home));
    session.reset_directory().unwrap();
    session
}

fn write_workspace_asset(session: &ProjectSession, asset: AssetRef, data: &[u8]) {
    let path = asset.resolve(&session.asset_root()).unwrap();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, data).unwrap();
}

fn project_with_media(session: &ProjectSession) -> Project {
    write_workspace_asset(
        session,
        AssetRef::new(AssetKind::Image, PICTURE_FILE, "png"),
        b"picture bytes",
    );
    write_workspace_asset(
        session,
        AssetRef::new(AssetKind::Sound, SOUND_FILE, "wav"),
        b"sound bytes",
    );

    let mut object = EntryObject::new("obj1", "Robot");
    object
        .sprite
        .pictures
        .push(Picture::new("pic1", "robot", PICTURE_FILE, "png"));
    let mut sound = Sound::new("snd1", "beep", SOUND_FILE, "wav");
    sound.duration = Some(1.5);
    object.sprite.sounds.push(sound);
    let mut project = Project::new("demo");
    project.objects.push(object);
    project
}

fn write_raw_archive(target: &Path, entries: &[(&str, &[u8])]) {
    let file = fs::File::create(target).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

#[test]
fn saved_project_loads_back_with_its_media() {
    let home = tempfile::tempdir().unwrap();
    let mut session = session_in(home.path());
    let project = project_with_media(&session);
    let archive = home.path().join("demo.ent");

    session.save(&project, &archive).unwrap();
    session.reset_directory().unwrap();
    let loaded = session.load_with_rollback(&archive).unwrap();

    assert_eq!(loaded.project, project);
    let sprite = &loaded.project.objects[0].sprite;
    assert_eq!(
        fs::read(loaded.asset_path(&sprite.pictures[0].asset_ref()).unwrap()).unwrap(),
        b"picture bytes"
    );
    assert_eq!(sprite.sounds[0].duration, Some(1.5));
    assert_eq!(
        fs::read(loaded.asset_path(&sprite.sounds[0].asset_ref()).unwrap()).unwrap(),
        b"sound bytes"
    );
    assert_eq!(session.current_project(), Some(archive.as_path()));
}

#[test]
fn project_saved_inside_workspace_reopens() {
    let home = tempfile::tempdir().unwrap();
    let mut session = session_in(home.path());
    let project = project_with_media(&session);
    let archive = session.workspace_dir().join("mine.ent");

    session.save(&project, &archive).unwrap();
    let loaded = session.load_with_rollback(&archive).unwrap();

    assert_eq!(loaded.project, project);
    assert_eq!(
        session.last_trace(),
        &[
            LoadPhase::BackingUp,
            LoadPhase::Loading,
            LoadPhase::Committed,
            LoadPhase::Idle
        ]
    );
}

#[test]
fn corrupt_manifest_restores_previous_workspace() {
    let home = tempfile::tempdir().unwrap();
    let mut session = session_in(home.path());
    let project = project_with_media(&session);
    let good = home.path().join("good.ent");
    session.save(&project, &good).unwrap();
    session.load_with_rollback(&good).unwrap();
    let marker = session.workspace_dir().join("marker.txt");
    fs::write(&marker, b"keep me").unwrap();

    let bad = home.path().join("bad.ent");
    write_raw_archive(&bad, &[(PROJECT_MANIFEST, &b"{ not json"[..])]);
    let archive_before = fs::read(&bad).unwrap();

    let err = session.load_with_rollback(&bad).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert_eq!(fs::read(&marker).unwrap(), b"keep me");
    assert_eq!(fs::read(&bad).unwrap(), archive_before);
    assert_eq!(session.phase(), LoadPhase::Idle);
    assert!(session.last_trace().contains(&LoadPhase::RollingBack));
    assert!(!session.backup_slot().has_backup());
    assert_eq!(session.current_project(), Some(good.as_path()));
}

#[test]
fn archive_missing_referenced_media_fails_to_load() {
    let home = tempfile::tempdir().unwrap();
    let mut session = session_in(home.path());
    let mut project = Project::new("broken");
    let mut object = EntryObject::new("obj1", "Ghost");
    object
        .sprite
        .pictures
        .push(Picture::new("pic1", "ghost", PICTURE_FILE, "png"));
    project.objects.push(object);

    let archive = home.path().join("broken.ent");
    let manifest = serde_json::to_vec(&project).unwrap();
    write_raw_archive(&archive, &[(PROJECT_MANIFEST, manifest.as_slice())]);

    let err = session.load_with_rollback(&archive).unwrap_err();
    assert!(matches!(err, ProjectError::MissingAsset(_)));
}

#[test]
fn archive_escaping_the_workspace_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let mut session = session_in(home.path());
    let archive = home.path().join("evil.ent");

    // tar::Builder refuses `..` in names, so patch the header bytes directly.
    let file = fs::File::create(&archive).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    let data = b"owned";
    let mut header = tar::Header::new_gnu();
    header.as_old_mut().name[..12].copy_from_slice(b"../escape.tx");
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    builder.append(&header, &data[..]).unwrap();
    builder.into_inner().unwrap().finish().unwrap();

    let err = session.load_with_rollback(&archive).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(!home.path().join("escape.tx").exists());
}

#[test]
fn missing_archive_leaves_workspace_untouched() {
    let home = tempfile::tempdir().unwrap();
    let mut session = session_in(home.path());
    let marker = session.workspace_dir().join("marker.txt");
    fs::write(&marker, b"still here").unwrap();

    let err = session
        .load_with_rollback(&home.path().join("nowhere.ent"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileSystem);
    assert_eq!(fs::read(&marker).unwrap(), b"still here");
}
